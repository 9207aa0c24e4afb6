// Node module - live RPC sessions with ledger nodes
// Transport boundary, submission state machine, and the connection driver

mod connection;
mod rpc;
mod submission;

pub use connection::*;
pub use rpc::*;
pub use submission::*;
