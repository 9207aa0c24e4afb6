// Particles - the atomic, immutable units of ledger state
//
// A particle is a closed polymorphic variant composed of quarks plus scalar
// fields. Its identity is the content hash of its canonical bytes, so a
// particle can never change after construction.

use crate::identity::Address;
use crate::record::{
    ChronoQuark, Euid, FungibleQuark, IdentifiableQuark, OwnableQuark, TokenAmount,
};
use crate::serialization::{
    dson, to_value, wire, CodecError, Encoding, FieldSchema, ParticleDecoder, Serializable,
    TypeSchema, Value,
};

// ============================================================================
// TOKEN DEFINITION
// ============================================================================

/// Declares a new token class on the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenDefinitionParticle {
    token: IdentifiableQuark,
    owner: OwnableQuark,
    symbol: String,
    name: String,
    description: String,
    granularity: TokenAmount,
}

static TOKEN_DEFINITION_SCHEMA: TypeSchema = TypeSchema {
    tag: "particle.token_definition",
    fields: &[
        FieldSchema::both("token"),
        FieldSchema::both("owner"),
        FieldSchema::both("symbol"),
        FieldSchema::both("name"),
        FieldSchema::both("description"),
        FieldSchema::both("granularity"),
    ],
};

impl TokenDefinitionParticle {
    pub fn new(
        token_id: Euid,
        owner: Address,
        symbol: &str,
        name: &str,
        description: &str,
        granularity: TokenAmount,
    ) -> Self {
        Self {
            token: IdentifiableQuark::new(token_id),
            owner: OwnableQuark::new(owner),
            symbol: symbol.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            granularity,
        }
    }

    pub fn token(&self) -> &IdentifiableQuark {
        &self.token
    }

    pub fn owner(&self) -> &OwnableQuark {
        &self.owner
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn granularity(&self) -> &TokenAmount {
        &self.granularity
    }

    fn from_wire(map: &wire::JsonMap) -> Result<Self, CodecError> {
        let tag = TOKEN_DEFINITION_SCHEMA.tag;
        Ok(Self {
            token: IdentifiableQuark::from_wire(wire::get_value(map, tag, "token")?)?,
            owner: OwnableQuark::from_wire(wire::get_value(map, tag, "owner")?)?,
            symbol: wire::get_str(map, tag, "symbol")?.to_string(),
            name: wire::get_str(map, tag, "name")?.to_string(),
            description: wire::get_str(map, tag, "description")?.to_string(),
            granularity: wire::get_u256(map, tag, "granularity")?,
        })
    }
}

impl Serializable for TokenDefinitionParticle {
    fn schema() -> &'static TypeSchema {
        &TOKEN_DEFINITION_SCHEMA
    }

    fn field(&self, name: &str, encoding: Encoding) -> Option<Value> {
        match name {
            "token" => Some(to_value(&self.token, encoding)),
            "owner" => Some(to_value(&self.owner, encoding)),
            "symbol" => Some(Value::Str(self.symbol.clone())),
            "name" => Some(Value::Str(self.name.clone())),
            "description" => Some(Value::Str(self.description.clone())),
            "granularity" => Some(Value::U256(self.granularity)),
            _ => None,
        }
    }
}

// ============================================================================
// TRANSFER
// ============================================================================

/// Moves fungible units of a token to a recipient
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferParticle {
    token: IdentifiableQuark,
    recipient: OwnableQuark,
    fungible: FungibleQuark,
    chrono: ChronoQuark,
}

static TRANSFER_SCHEMA: TypeSchema = TypeSchema {
    tag: "particle.transfer",
    fields: &[
        FieldSchema::both("token"),
        FieldSchema::both("recipient"),
        FieldSchema::both("fungible"),
        FieldSchema::both("chrono"),
    ],
};

impl TransferParticle {
    pub fn new(
        token_id: Euid,
        recipient: Address,
        fungible: FungibleQuark,
        chrono: ChronoQuark,
    ) -> Self {
        Self {
            token: IdentifiableQuark::new(token_id),
            recipient: OwnableQuark::new(recipient),
            fungible,
            chrono,
        }
    }

    pub fn token(&self) -> &IdentifiableQuark {
        &self.token
    }

    pub fn recipient(&self) -> &OwnableQuark {
        &self.recipient
    }

    pub fn fungible(&self) -> &FungibleQuark {
        &self.fungible
    }

    pub fn chrono(&self) -> &ChronoQuark {
        &self.chrono
    }

    fn from_wire(map: &wire::JsonMap) -> Result<Self, CodecError> {
        let tag = TRANSFER_SCHEMA.tag;
        Ok(Self {
            token: IdentifiableQuark::from_wire(wire::get_value(map, tag, "token")?)?,
            recipient: OwnableQuark::from_wire(wire::get_value(map, tag, "recipient")?)?,
            fungible: FungibleQuark::from_wire(wire::get_value(map, tag, "fungible")?)?,
            chrono: ChronoQuark::from_wire(wire::get_value(map, tag, "chrono")?)?,
        })
    }
}

impl Serializable for TransferParticle {
    fn schema() -> &'static TypeSchema {
        &TRANSFER_SCHEMA
    }

    fn field(&self, name: &str, encoding: Encoding) -> Option<Value> {
        match name {
            "token" => Some(to_value(&self.token, encoding)),
            "recipient" => Some(to_value(&self.recipient, encoding)),
            "fungible" => Some(to_value(&self.fungible, encoding)),
            "chrono" => Some(to_value(&self.chrono, encoding)),
            _ => None,
        }
    }
}

// ============================================================================
// OWNERSHIP
// ============================================================================

/// Assigns control of a resource to an address
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnershipParticle {
    resource: IdentifiableQuark,
    owner: OwnableQuark,
    chrono: ChronoQuark,
}

static OWNERSHIP_SCHEMA: TypeSchema = TypeSchema {
    tag: "particle.ownership",
    fields: &[
        FieldSchema::both("resource"),
        FieldSchema::both("owner"),
        FieldSchema::both("chrono"),
    ],
};

impl OwnershipParticle {
    pub fn new(resource_id: Euid, owner: Address, chrono: ChronoQuark) -> Self {
        Self {
            resource: IdentifiableQuark::new(resource_id),
            owner: OwnableQuark::new(owner),
            chrono,
        }
    }

    pub fn resource(&self) -> &IdentifiableQuark {
        &self.resource
    }

    pub fn owner(&self) -> &OwnableQuark {
        &self.owner
    }

    pub fn chrono(&self) -> &ChronoQuark {
        &self.chrono
    }

    fn from_wire(map: &wire::JsonMap) -> Result<Self, CodecError> {
        let tag = OWNERSHIP_SCHEMA.tag;
        Ok(Self {
            resource: IdentifiableQuark::from_wire(wire::get_value(map, tag, "resource")?)?,
            owner: OwnableQuark::from_wire(wire::get_value(map, tag, "owner")?)?,
            chrono: ChronoQuark::from_wire(wire::get_value(map, tag, "chrono")?)?,
        })
    }
}

impl Serializable for OwnershipParticle {
    fn schema() -> &'static TypeSchema {
        &OWNERSHIP_SCHEMA
    }

    fn field(&self, name: &str, encoding: Encoding) -> Option<Value> {
        match name {
            "resource" => Some(to_value(&self.resource, encoding)),
            "owner" => Some(to_value(&self.owner, encoding)),
            "chrono" => Some(to_value(&self.chrono, encoding)),
            _ => None,
        }
    }
}

// ============================================================================
// MESSAGE
// ============================================================================

/// Carries an opaque payload between two addresses
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageParticle {
    from: Address,
    to: Address,
    payload: Vec<u8>,
    chrono: ChronoQuark,
}

static MESSAGE_SCHEMA: TypeSchema = TypeSchema {
    tag: "particle.message",
    fields: &[
        FieldSchema::both("from"),
        FieldSchema::both("to"),
        FieldSchema::both("payload"),
        FieldSchema::both("chrono"),
    ],
};

impl MessageParticle {
    pub fn new(from: Address, to: Address, payload: Vec<u8>, chrono: ChronoQuark) -> Self {
        Self {
            from,
            to,
            payload,
            chrono,
        }
    }

    pub fn from(&self) -> &Address {
        &self.from
    }

    pub fn to(&self) -> &Address {
        &self.to
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn chrono(&self) -> &ChronoQuark {
        &self.chrono
    }

    fn from_wire(map: &wire::JsonMap) -> Result<Self, CodecError> {
        let tag = MESSAGE_SCHEMA.tag;
        Ok(Self {
            from: wire::get_address(map, tag, "from")?,
            to: wire::get_address(map, tag, "to")?,
            payload: wire::get_bytes(map, tag, "payload")?,
            chrono: ChronoQuark::from_wire(wire::get_value(map, tag, "chrono")?)?,
        })
    }
}

impl Serializable for MessageParticle {
    fn schema() -> &'static TypeSchema {
        &MESSAGE_SCHEMA
    }

    fn field(&self, name: &str, encoding: Encoding) -> Option<Value> {
        match name {
            "from" => Some(Value::Address(self.from.clone())),
            "to" => Some(Value::Address(self.to.clone())),
            "payload" => Some(Value::Bytes(self.payload.clone())),
            "chrono" => Some(to_value(&self.chrono, encoding)),
            _ => None,
        }
    }
}

// ============================================================================
// PARTICLE
// ============================================================================

/// The closed set of record-unit variants
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Particle {
    TokenDefinition(TokenDefinitionParticle),
    Transfer(TransferParticle),
    Ownership(OwnershipParticle),
    Message(MessageParticle),
}

impl Particle {
    /// The wire type tag of this variant
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::TokenDefinition(_) => TOKEN_DEFINITION_SCHEMA.tag,
            Self::Transfer(_) => TRANSFER_SCHEMA.tag,
            Self::Ownership(_) => OWNERSHIP_SCHEMA.tag,
            Self::Message(_) => MESSAGE_SCHEMA.tag,
        }
    }

    /// Build the value tree for the requested encoding
    pub fn to_value(&self, encoding: Encoding) -> Value {
        match self {
            Self::TokenDefinition(p) => to_value(p, encoding),
            Self::Transfer(p) => to_value(p, encoding),
            Self::Ownership(p) => to_value(p, encoding),
            Self::Message(p) => to_value(p, encoding),
        }
    }

    /// Canonical DSON bytes of this particle
    pub fn to_dson_bytes(&self) -> Vec<u8> {
        dson::encode(&self.to_value(Encoding::Dson))
    }

    /// Content identity: a pure function of the canonically-included fields
    pub fn euid(&self) -> Euid {
        Euid::from_content(&self.to_dson_bytes())
    }

    /// Tag-to-constructor table consumed by `Registry::bootstrap`
    pub fn registrations() -> Vec<(&'static str, ParticleDecoder)> {
        vec![
            (TOKEN_DEFINITION_SCHEMA.tag, |map| {
                TokenDefinitionParticle::from_wire(map).map(Particle::TokenDefinition)
            }),
            (TRANSFER_SCHEMA.tag, |map| {
                TransferParticle::from_wire(map).map(Particle::Transfer)
            }),
            (OWNERSHIP_SCHEMA.tag, |map| {
                OwnershipParticle::from_wire(map).map(Particle::Ownership)
            }),
            (MESSAGE_SCHEMA.tag, |map| {
                MessageParticle::from_wire(map).map(Particle::Message)
            }),
        ]
    }
}
