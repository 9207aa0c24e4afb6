// RPC transport boundary
//
// The connection core drives a node through this trait: one request/response
// call surface plus a stream of server-pushed events. Implementations own the
// socket and the JSON-RPC framing; the core never sees raw frames.

use async_trait::async_trait;
use serde_json::Value as Json;
use thiserror::Error;
use tokio::sync::mpsc;

pub const METHOD_SUBSCRIBE: &str = "Atoms.subscribe";
pub const METHOD_CANCEL: &str = "Atoms.cancel";
pub const METHOD_SUBMIT: &str = "Atoms.submitAndSubscribe";
pub const METHOD_GET_BY_ID: &str = "Atoms.getById";
pub const METHOD_PING: &str = "Network.ping";

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("RPC call '{method}' failed: {reason}")]
    CallFailed { method: String, reason: String },

    #[error("Transport is closed")]
    Closed,
}

/// Server-pushed events, already lifted out of their JSON-RPC framing
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The underlying connection finished its handshake
    Opened,

    /// The underlying connection went away
    Closed { reason: String },

    /// A non-fatal protocol error reported by the node
    Error { message: String },

    /// A batch of atom notifications for one subscription
    AtomsUpdate {
        subscriber_id: u64,
        atoms: Vec<Json>,
        is_head: bool,
    },

    /// Progress report for one tracked submission
    SubmissionUpdate {
        subscriber_id: u64,
        state: String,
        message: Option<String>,
    },
}

/// A duplex RPC session with one ledger node
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Establish the session and return the server event stream
    async fn open(&self) -> Result<mpsc::Receiver<TransportEvent>, TransportError>;

    /// Issue one request and wait for its response
    async fn call(&self, method: &str, params: Json) -> Result<Json, TransportError>;

    /// Tear the session down; must be safe to call more than once
    async fn close(&self);
}
