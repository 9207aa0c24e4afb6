// atomlink - client-side distributed-ledger engine
//
// The crate splits along two seams: the record model with its dual-format
// codec (canonical DSON bytes for hashing and signing, self-describing JSON
// for the wire), and the node connection driver that multiplexes live
// subscriptions and tracked atom submissions over one RPC session.

pub mod identity;
pub mod node;
pub mod record;
pub mod serialization;
