// Quarks - composable typed facets of a particle
//
// Each quark grants one semantic capability (fungibility, ownership,
// timestamping, identification). Quarks are pure immutable data; behavior is
// limited to field access and serialization metadata.

use crate::identity::Address;
use crate::record::{Euid, TokenAmount};
use crate::serialization::{
    wire, CodecError, Encoding, FieldSchema, Serializable, TypeSchema, Value,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// FUNGIBLE QUARK
// ============================================================================

/// How the fungible units in a particle came to be
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FungibleType {
    Minted,
    Transferred,
    Burned,
}

impl FungibleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minted => "minted",
            Self::Transferred => "transferred",
            Self::Burned => "burned",
        }
    }

    pub fn from_str_tag(s: &str) -> Option<Self> {
        match s {
            "minted" => Some(Self::Minted),
            "transferred" => Some(Self::Transferred),
            "burned" => Some(Self::Burned),
            _ => None,
        }
    }
}

/// Fungibility facet: an amount of divisible units at a logical instant
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FungibleQuark {
    amount: TokenAmount,
    planck: u64,
    nonce: u64,
    fungible_type: FungibleType,
}

static FUNGIBLE_SCHEMA: TypeSchema = TypeSchema {
    tag: "quark.fungible",
    fields: &[
        FieldSchema::both("amount"),
        FieldSchema::both("planck"),
        FieldSchema::both("nonce"),
        FieldSchema::both("type"),
    ],
};

impl FungibleQuark {
    /// Create a fungible quark with a random uniqueness nonce
    pub fn new(amount: TokenAmount, planck: u64, fungible_type: FungibleType) -> Self {
        use rand::Rng;
        Self {
            amount,
            planck,
            nonce: rand::thread_rng().gen(),
            fungible_type,
        }
    }

    /// Create a fungible quark with an explicit nonce
    pub fn with_nonce(
        amount: TokenAmount,
        planck: u64,
        nonce: u64,
        fungible_type: FungibleType,
    ) -> Self {
        Self {
            amount,
            planck,
            nonce,
            fungible_type,
        }
    }

    pub fn amount(&self) -> &TokenAmount {
        &self.amount
    }

    /// Logical time unit this quark belongs to
    pub fn planck(&self) -> u64 {
        self.planck
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn fungible_type(&self) -> FungibleType {
        self.fungible_type
    }

    pub(crate) fn from_wire(value: &serde_json::Value) -> Result<Self, CodecError> {
        let tag = FUNGIBLE_SCHEMA.tag;
        let map = wire::expect_object(value, tag)?;
        let type_str = wire::get_str(map, tag, "type")?;
        let fungible_type = FungibleType::from_str_tag(type_str)
            .ok_or_else(|| CodecError::mismatch(tag, format!("unknown fungible type '{type_str}'")))?;
        Ok(Self {
            amount: wire::get_u256(map, tag, "amount")?,
            planck: wire::get_u64(map, tag, "planck")?,
            nonce: wire::get_u64(map, tag, "nonce")?,
            fungible_type,
        })
    }
}

impl Serializable for FungibleQuark {
    fn schema() -> &'static TypeSchema {
        &FUNGIBLE_SCHEMA
    }

    fn field(&self, name: &str, _encoding: Encoding) -> Option<Value> {
        match name {
            "amount" => Some(Value::U256(self.amount)),
            "planck" => Some(Value::U64(self.planck)),
            "nonce" => Some(Value::U64(self.nonce)),
            "type" => Some(Value::Str(self.fungible_type.as_str().to_string())),
            _ => None,
        }
    }
}

// ============================================================================
// OWNABLE QUARK
// ============================================================================

/// Ownership facet: the address controlling a particle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnableQuark {
    owner: Address,
}

static OWNABLE_SCHEMA: TypeSchema = TypeSchema {
    tag: "quark.ownable",
    fields: &[FieldSchema::both("owner")],
};

impl OwnableQuark {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub(crate) fn from_wire(value: &serde_json::Value) -> Result<Self, CodecError> {
        let tag = OWNABLE_SCHEMA.tag;
        let map = wire::expect_object(value, tag)?;
        Ok(Self {
            owner: wire::get_address(map, tag, "owner")?,
        })
    }
}

impl Serializable for OwnableQuark {
    fn schema() -> &'static TypeSchema {
        &OWNABLE_SCHEMA
    }

    fn field(&self, name: &str, _encoding: Encoding) -> Option<Value> {
        match name {
            "owner" => Some(Value::Address(self.owner.clone())),
            _ => None,
        }
    }
}

// ============================================================================
// CHRONO QUARK
// ============================================================================

/// Timestamping facet: named millisecond timestamps
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChronoQuark {
    timestamps: BTreeMap<String, u64>,
}

static CHRONO_SCHEMA: TypeSchema = TypeSchema {
    tag: "quark.chrono",
    fields: &[FieldSchema::both("timestamps")],
};

impl ChronoQuark {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a chrono quark with a single named timestamp
    pub fn single(name: &str, millis: u64) -> Self {
        let mut timestamps = BTreeMap::new();
        timestamps.insert(name.to_string(), millis);
        Self { timestamps }
    }

    pub fn with_timestamp(mut self, name: &str, millis: u64) -> Self {
        self.timestamps.insert(name.to_string(), millis);
        self
    }

    pub fn timestamps(&self) -> &BTreeMap<String, u64> {
        &self.timestamps
    }

    pub fn timestamp(&self, name: &str) -> Option<u64> {
        self.timestamps.get(name).copied()
    }

    pub(crate) fn from_wire(value: &serde_json::Value) -> Result<Self, CodecError> {
        let tag = CHRONO_SCHEMA.tag;
        let map = wire::expect_object(value, tag)?;
        let entries = wire::get_object(map, tag, "timestamps")?;
        let mut timestamps = BTreeMap::new();
        for (key, entry) in entries {
            let millis = entry.as_u64().ok_or_else(|| {
                CodecError::mismatch(tag, format!("timestamp '{key}' must be an unsigned integer"))
            })?;
            timestamps.insert(key.clone(), millis);
        }
        Ok(Self { timestamps })
    }
}

impl Serializable for ChronoQuark {
    fn schema() -> &'static TypeSchema {
        &CHRONO_SCHEMA
    }

    fn field(&self, name: &str, _encoding: Encoding) -> Option<Value> {
        match name {
            "timestamps" => Some(Value::Map(
                self.timestamps
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::U64(*v)))
                    .collect(),
            )),
            _ => None,
        }
    }
}

// ============================================================================
// IDENTIFIABLE QUARK
// ============================================================================

/// Identification facet: a stable EUID reference
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdentifiableQuark {
    id: Euid,
}

static IDENTIFIABLE_SCHEMA: TypeSchema = TypeSchema {
    tag: "quark.identifiable",
    fields: &[FieldSchema::both("id")],
};

impl IdentifiableQuark {
    pub fn new(id: Euid) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &Euid {
        &self.id
    }

    pub(crate) fn from_wire(value: &serde_json::Value) -> Result<Self, CodecError> {
        let tag = IDENTIFIABLE_SCHEMA.tag;
        let map = wire::expect_object(value, tag)?;
        Ok(Self {
            id: wire::get_euid(map, tag, "id")?,
        })
    }
}

impl Serializable for IdentifiableQuark {
    fn schema() -> &'static TypeSchema {
        &IDENTIFIABLE_SCHEMA
    }

    fn field(&self, name: &str, _encoding: Encoding) -> Option<Value> {
        match name {
            "id" => Some(Value::Euid(self.id)),
            _ => None,
        }
    }
}
