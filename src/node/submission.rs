// Atom submission state machine
//
// A tracked submission moves strictly forward: Created, Submitting,
// Submitted, then either Stored or a failure. The connection core enforces
// the ordering; this module owns the vocabulary.

use std::fmt;
use thiserror::Error;

/// Lifecycle stage of one tracked submission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    /// Built locally, not yet handed to the transport
    Created,
    /// The submit call is in flight
    Submitting,
    /// The node acknowledged receipt
    Submitted,
    /// The node durably stored the atom
    Stored,
}

impl SubmissionState {
    fn rank(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Submitting => 1,
            Self::Submitted => 2,
            Self::Stored => 3,
        }
    }

    /// Whether moving to `next` respects the forward-only lifecycle
    ///
    /// Skipping forward is legal: a node may confirm storage before the
    /// submit acknowledgement makes it back.
    pub fn can_transition_to(self, next: SubmissionState) -> bool {
        next.rank() > self.rank()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stored)
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Submitting => "submitting",
            Self::Submitted => "submitted",
            Self::Stored => "stored",
        };
        write!(f, "{name}")
    }
}

/// Rejection categories a node can report for a submitted atom
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionFailure {
    /// The atom conflicts with already-stored state
    Collision,
    /// The atom is structurally valid but not allowed here
    IllegalState,
    /// This node cannot serve the submitting address
    UnsuitablePeer,
    /// The atom failed validation outright
    ValidationError,
}

impl SubmissionFailure {
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Collision => "COLLISION",
            Self::IllegalState => "ILLEGAL_STATE",
            Self::UnsuitablePeer => "UNSUITABLE_PEER",
            Self::ValidationError => "VALIDATION_ERROR",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "COLLISION" => Some(Self::Collision),
            "ILLEGAL_STATE" => Some(Self::IllegalState),
            "UNSUITABLE_PEER" => Some(Self::UnsuitablePeer),
            "VALIDATION_ERROR" => Some(Self::ValidationError),
            _ => None,
        }
    }
}

// Display == wire name; keeps log lines grep-compatible with node output
impl fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// How a tracked submission can end without reaching `Stored`
#[derive(Error, Debug, Clone)]
pub enum SubmissionError {
    #[error("submission timed out waiting for the node")]
    Timeout,

    #[error("connection closed before a terminal state")]
    ConnectionClosed,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("node rejected atom: {failure}: {message}")]
    Rejected {
        failure: SubmissionFailure,
        message: String,
    },
}
