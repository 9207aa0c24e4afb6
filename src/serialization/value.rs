use crate::identity::Address;
use crate::record::{Euid, TokenAmount};

/// Typed intermediate tree produced by the schema walk
///
/// Both encoders consume this form, so per-field inclusion decisions are
/// made exactly once, in [`to_value`](crate::serialization::to_value).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    U64(u64),
    U256(TokenAmount),
    Str(String),
    Bytes(Vec<u8>),
    Euid(Euid),
    Address(Address),
    /// Ordered sequence; encoded in the order given
    List(Vec<Value>),
    /// Semantically unordered collection; the DSON encoder sorts entries by
    /// their encoded bytes so logically equal sets encode identically
    Set(Vec<Value>),
    /// String-keyed map; the DSON encoder sorts entries by key
    Map(Vec<(String, Value)>),
    /// Tagged nested object with fields in schema order
    Object {
        tag: &'static str,
        fields: Vec<(&'static str, Value)>,
    },
}
