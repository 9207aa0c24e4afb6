// Atom - the unit of submission to the ledger
//
// An atom collects particles (deduplicated by euid), signatures keyed by
// signer address, and timestamp metadata. Its canonical encoding is
// independent of particle insertion order, and signing seals the particle
// set.

use crate::identity::{self, Address, PublicKey, Signature, Signer};
use crate::record::{Euid, Particle};
use crate::serialization::{
    dson, wire, CodecError, Encoding, FieldSchema, Registry, Serializable, TypeSchema, Value,
};
use chrono::Utc;
use std::collections::BTreeMap;
use thiserror::Error;

/// Metadata key for the client-side creation timestamp
pub const TIMESTAMP_KEY: &str = "timestamp";

#[derive(Error, Debug)]
pub enum AtomError {
    #[error("Duplicate particle {0}")]
    DuplicateParticle(Euid),

    #[error("Atom is sealed: the particle set cannot change after signing")]
    Sealed,
}

/// An ordered, deduplicated collection of particles plus signatures and
/// timestamp annotations
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Atom {
    particles: Vec<Particle>,
    signatures: BTreeMap<String, Signature>,
    metadata: BTreeMap<String, String>,
}

static ATOM_SCHEMA: TypeSchema = TypeSchema {
    tag: "ledger.atom",
    fields: &[
        FieldSchema::both("particles"),
        FieldSchema::both("metadata"),
        // A signature cannot cover itself, so signatures never enter the
        // canonical byte form
        FieldSchema::wire_only("signatures"),
    ],
};

impl Atom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an atom stamped with the current wall-clock time
    pub fn timestamped_now() -> Self {
        let mut atom = Self::new();
        atom.metadata.insert(
            TIMESTAMP_KEY.to_string(),
            Utc::now().timestamp_millis().to_string(),
        );
        atom
    }

    /// Attach a metadata annotation
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Append a particle, rejecting duplicates by euid
    pub fn push_particle(&mut self, particle: Particle) -> Result<(), AtomError> {
        if self.is_signed() {
            return Err(AtomError::Sealed);
        }
        let euid = particle.euid();
        if self.contains(&euid) {
            return Err(AtomError::DuplicateParticle(euid));
        }
        self.particles.push(particle);
        Ok(())
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn contains(&self, euid: &Euid) -> bool {
        self.particles.iter().any(|p| &p.euid() == euid)
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn signatures(&self) -> &BTreeMap<String, Signature> {
        &self.signatures
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    /// Sign the canonical bytes and attach the signature, sealing the atom
    pub fn sign(&mut self, signer: &dyn Signer) {
        let canonical = self.to_dson_bytes();
        let signature = signer.sign(&canonical);
        self.signatures
            .insert(signer.signer_id().to_string(), signature);
    }

    /// Check the signature attached for the given public key, if any
    pub fn verify_signature(&self, public_key: &PublicKey) -> bool {
        let signer_id = Address::from_public_key(public_key).to_string();
        match self.signatures.get(&signer_id) {
            Some(signature) => identity::verify(public_key, &self.to_dson_bytes(), signature),
            None => false,
        }
    }

    /// Canonical DSON bytes, the input to hashing and signing
    pub fn to_dson_bytes(&self) -> Vec<u8> {
        dson::to_dson_bytes(self)
    }

    /// Content identity of this atom
    pub fn euid(&self) -> Euid {
        Euid::from_content(&self.to_dson_bytes())
    }

    /// Self-describing JSON wire form
    pub fn to_wire(&self) -> serde_json::Value {
        wire::to_wire(self)
    }

    /// Reconstruct an atom from its wire form
    pub fn from_wire(value: &serde_json::Value, registry: &Registry) -> Result<Self, CodecError> {
        let tag = ATOM_SCHEMA.tag;
        let map = wire::expect_object(value, tag)?;

        let mut atom = Atom::new();
        for particle_json in wire::get_array(map, tag, "particles")? {
            let particle = registry.decode_particle(particle_json)?;
            atom.push_particle(particle)
                .map_err(|e| CodecError::mismatch(tag, e.to_string()))?;
        }

        if let Some(entries) = wire::opt_object(map, tag, "metadata")? {
            for (key, entry) in entries {
                let value = entry.as_str().ok_or_else(|| {
                    CodecError::mismatch(tag, format!("metadata '{key}' must be a string"))
                })?;
                atom.metadata.insert(key.clone(), value.to_string());
            }
        }

        if let Some(entries) = wire::opt_object(map, tag, "signatures")? {
            for (signer_id, entry) in entries {
                let encoded = entry.as_str().ok_or_else(|| {
                    CodecError::mismatch(tag, format!("signature '{signer_id}' must be a string"))
                })?;
                let bytes = {
                    use base64::engine::general_purpose::STANDARD as BASE64;
                    use base64::Engine;
                    BASE64.decode(encoded).map_err(|e| {
                        CodecError::mismatch(tag, format!("signature '{signer_id}': {e}"))
                    })?
                };
                let signature = Signature::from_bytes(&bytes).map_err(|e| {
                    CodecError::mismatch(tag, format!("signature '{signer_id}': {e}"))
                })?;
                atom.signatures.insert(signer_id.clone(), signature);
            }
        }

        Ok(atom)
    }
}

impl Serializable for Atom {
    fn schema() -> &'static TypeSchema {
        &ATOM_SCHEMA
    }

    fn field(&self, name: &str, encoding: Encoding) -> Option<Value> {
        match name {
            "particles" => Some(Value::Set(
                self.particles
                    .iter()
                    .map(|p| p.to_value(encoding))
                    .collect(),
            )),
            "metadata" => Some(Value::Map(
                self.metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::Str(v.clone())))
                    .collect(),
            )),
            "signatures" => Some(Value::Map(
                self.signatures
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::Bytes(v.as_bytes().to_vec())))
                    .collect(),
            )),
            _ => None,
        }
    }
}
