use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Width of the canonical EUID byte encoding
pub const EUID_LENGTH: usize = 16;

#[derive(Error, Debug)]
pub enum EuidError {
    #[error("Malformed identifier: expected {expected} bytes, got {got}")]
    MalformedIdentifier { expected: usize, got: usize },

    #[error("Invalid hex identifier: {0}")]
    InvalidHex(String),
}

/// Fixed-width 128-bit identifier, the primary key for particles and atoms
///
/// The canonical encoding is 16 big-endian bytes; the textual form is
/// lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Euid([u8; EUID_LENGTH]);

impl Euid {
    /// Create an EUID from its canonical byte form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EuidError> {
        let array: [u8; EUID_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| EuidError::MalformedIdentifier {
                    expected: EUID_LENGTH,
                    got: bytes.len(),
                })?;
        Ok(Self(array))
    }

    /// Create an EUID from a big-integer value
    pub fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    /// Content-address some bytes: SHA-256 truncated to the EUID width
    pub fn from_content(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        let mut bytes = [0u8; EUID_LENGTH];
        bytes.copy_from_slice(&digest[..EUID_LENGTH]);
        Self(bytes)
    }

    /// Parse an EUID from its hex textual form
    pub fn from_hex(s: &str) -> Result<Self, EuidError> {
        let bytes = hex::decode(s).map_err(|e| EuidError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Get the canonical byte form
    pub fn as_bytes(&self) -> &[u8; EUID_LENGTH] {
        &self.0
    }

    /// Get the big-integer value
    pub fn to_u128(&self) -> u128 {
        u128::from_be_bytes(self.0)
    }

    /// Get the hex textual form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Euid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Euid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Euid({})", self.to_hex())
    }
}
