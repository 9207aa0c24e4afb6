use crate::identity::{Address, Keypair, PublicKey};
use ed25519_dalek::{Signature as DalekSignature, Signer as DalekSigner, Verifier};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("Invalid signature length: expected 64, got {0}")]
    InvalidLength(usize),
}

/// Ed25519 signature over an atom's canonical bytes (64 bytes)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    inner: DalekSignature,
    bytes: [u8; 64],
}

impl Signature {
    /// Get the raw bytes of the signature
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Create a signature from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        let bytes_array: [u8; 64] = bytes
            .try_into()
            .map_err(|_| SignatureError::InvalidLength(bytes.len()))?;

        let inner = DalekSignature::from_bytes(&bytes_array);
        Ok(Self {
            inner,
            bytes: bytes_array,
        })
    }

    fn from_inner(inner: DalekSignature) -> Self {
        let bytes = inner.to_bytes();
        Self { inner, bytes }
    }

    pub(crate) fn inner(&self) -> &DalekSignature {
        &self.inner
    }
}

/// Signing boundary: the connection core only ever asks for a signature over
/// canonical bytes and a public signer id, never for key material.
pub trait Signer {
    /// Sign the canonical byte form of a record
    fn sign(&self, canonical_bytes: &[u8]) -> Signature;

    /// The ledger address identifying this signer
    fn signer_id(&self) -> Address;
}

/// Signer backed by an in-memory Ed25519 keypair
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// The public key behind this signer
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }
}

impl Signer for KeypairSigner {
    fn sign(&self, canonical_bytes: &[u8]) -> Signature {
        Signature::from_inner(self.keypair.signing_key().sign(canonical_bytes))
    }

    fn signer_id(&self) -> Address {
        Address::from_public_key(&self.keypair.public_key())
    }
}

/// Verify a signature against a public key and message
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    public_key.inner().verify(message, signature.inner()).is_ok()
}
