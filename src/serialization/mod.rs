// Serialization module - dual-format codec for ledger records
//
// Two encodings share one schema-driven traversal:
// - DSON: deterministic canonical bytes, used only for hashing and signing
// - Wire: self-describing JSON, used for node transport

pub mod dson;
mod schema;
mod value;
pub mod wire;

pub use dson::*;
pub use schema::*;
pub use value::*;
pub use wire::*;

use thiserror::Error;

/// Errors raised by the codec; never silently defaulted
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Unknown type tag '{0}'")]
    UnknownType(String),

    #[error("Schema mismatch in '{type_tag}': {detail}")]
    SchemaMismatch { type_tag: String, detail: String },
}

impl CodecError {
    pub(crate) fn mismatch(type_tag: &str, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            type_tag: type_tag.to_string(),
            detail: detail.into(),
        }
    }
}
