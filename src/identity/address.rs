use crate::identity::{KeypairError, PublicKey};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

const ADDRESS_PREFIX: &str = "adr:";

#[derive(Error, Debug)]
pub enum AddressError {
    #[error("Invalid address format: {0}")]
    InvalidFormat(String),

    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(#[from] KeypairError),
}

/// Ledger address in the format: adr:<base58_public_key>
///
/// Addresses key subscriptions on a node connection and identify owners in
/// ownable quarks.
#[derive(Clone, Debug)]
pub struct Address {
    /// The base58-encoded public key
    key_part: String,
}

impl Address {
    /// Derive an address from a public key
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let key_part = bs58::encode(public_key.as_bytes()).into_string();
        Self { key_part }
    }

    /// Parse an address from its textual form
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let key_part = s
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or_else(|| AddressError::InvalidFormat(format!("missing '{ADDRESS_PREFIX}' prefix")))?;

        if key_part.is_empty() {
            return Err(AddressError::InvalidFormat("key part cannot be empty".into()));
        }

        // Validate base58 encoding by attempting to decode
        bs58::decode(key_part)
            .into_vec()
            .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;

        Ok(Self {
            key_part: key_part.to_string(),
        })
    }

    /// Extract the public key behind this address
    pub fn public_key(&self) -> Result<PublicKey, AddressError> {
        let bytes = bs58::decode(&self.key_part)
            .into_vec()
            .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;

        PublicKey::from_bytes(&bytes).map_err(AddressError::InvalidPublicKey)
    }

    /// Get the key part of the address (base58 encoded)
    pub fn key_part(&self) -> &str {
        &self.key_part
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ADDRESS_PREFIX, self.key_part)
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.key_part == other.key_part
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_part.hash(state);
    }
}
