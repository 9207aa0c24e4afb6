use crate::record::Particle;
use crate::serialization::{wire, CodecError, Value};
use std::collections::HashMap;

// ============================================================================
// FIELD SCHEMAS
// ============================================================================

/// Which external representation a traversal is producing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Canonical bytes for hashing/signing
    Dson,
    /// JSON form for transport
    Wire,
}

/// Per-field serialization metadata: name plus independent inclusion flags
#[derive(Clone, Copy, Debug)]
pub struct FieldSchema {
    pub name: &'static str,
    pub dson: bool,
    pub wire: bool,
}

impl FieldSchema {
    /// Field included in both encodings
    pub const fn both(name: &'static str) -> Self {
        Self {
            name,
            dson: true,
            wire: true,
        }
    }

    /// Field included only in the canonical byte form
    pub const fn dson_only(name: &'static str) -> Self {
        Self {
            name,
            dson: true,
            wire: false,
        }
    }

    /// Field included only in the wire form
    pub const fn wire_only(name: &'static str) -> Self {
        Self {
            name,
            dson: false,
            wire: true,
        }
    }

    pub fn included(&self, encoding: Encoding) -> bool {
        match encoding {
            Encoding::Dson => self.dson,
            Encoding::Wire => self.wire,
        }
    }
}

/// Static schema table for one serializable type: its wire tag and its
/// fields in canonical declaration order
#[derive(Debug)]
pub struct TypeSchema {
    pub tag: &'static str,
    pub fields: &'static [FieldSchema],
}

impl TypeSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A type the codec can traverse via its schema table
pub trait Serializable {
    /// The static schema for this type
    fn schema() -> &'static TypeSchema
    where
        Self: Sized;

    /// Produce the value of one named field, or None if the field is unset
    fn field(&self, name: &str, encoding: Encoding) -> Option<Value>;
}

/// Walk a type's schema in declared order, including a field only when its
/// flag for the requested encoding is set
pub fn to_value<T: Serializable>(obj: &T, encoding: Encoding) -> Value {
    let schema = T::schema();
    let mut fields = Vec::with_capacity(schema.fields.len());
    for field in schema.fields {
        if field.included(encoding) {
            if let Some(value) = obj.field(field.name, encoding) {
                fields.push((field.name, value));
            }
        }
    }
    Value::Object {
        tag: schema.tag,
        fields,
    }
}

// ============================================================================
// TYPE REGISTRY
// ============================================================================

/// Decoder for one registered particle variant
pub type ParticleDecoder =
    fn(&serde_json::Map<String, serde_json::Value>) -> Result<Particle, CodecError>;

/// Process-wide table mapping wire type tags to particle constructors
///
/// Built once by [`Registry::bootstrap`] before any deserialization and
/// read-only afterwards; callers share it behind an `Arc`.
pub struct Registry {
    particles: HashMap<&'static str, ParticleDecoder>,
}

impl Registry {
    /// Build the registry with every particle variant registered
    pub fn bootstrap() -> Self {
        let mut particles: HashMap<&'static str, ParticleDecoder> = HashMap::new();
        for (tag, decoder) in Particle::registrations() {
            particles.insert(tag, decoder);
        }
        Self { particles }
    }

    /// Whether a tag has a registered constructor
    pub fn is_registered(&self, tag: &str) -> bool {
        self.particles.contains_key(tag)
    }

    /// Decode a particle from its self-describing wire form
    pub fn decode_particle(&self, value: &serde_json::Value) -> Result<Particle, CodecError> {
        let map = value
            .as_object()
            .ok_or_else(|| CodecError::mismatch("particle", "expected a JSON object"))?;
        let tag = wire::embedded_tag(map)?;
        let decoder = self
            .particles
            .get(tag)
            .ok_or_else(|| CodecError::UnknownType(tag.to_string()))?;
        decoder(map)
    }
}
