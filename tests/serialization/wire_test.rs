// Wire Format Tests
// Self-describing JSON: tagged objects out, registry-driven decoding back

use atomlink::identity::{Address, Keypair, KeypairSigner};
use atomlink::record::{
    Atom, ChronoQuark, Euid, FungibleQuark, FungibleType, MessageParticle, OwnershipParticle,
    Particle, TokenAmount, TokenDefinitionParticle, TransferParticle,
};
use atomlink::serialization::{CodecError, Registry, SERIALIZER_FIELD};
use serde_json::json;

fn address() -> Address {
    Address::from_public_key(&Keypair::generate().public_key())
}

fn sample_atom() -> Atom {
    let owner = address();
    let mut atom = Atom::new().with_metadata("note", "wire test");
    atom.push_particle(Particle::TokenDefinition(TokenDefinitionParticle::new(
        Euid::from_u128(1),
        owner.clone(),
        "JOULE",
        "Joule",
        "Energy credits",
        TokenAmount::from_u64(1),
    )))
    .unwrap();
    atom.push_particle(Particle::Transfer(TransferParticle::new(
        Euid::from_u128(1),
        owner.clone(),
        FungibleQuark::with_nonce(TokenAmount::from_u128(1 << 80), 4, 99, FungibleType::Minted),
        ChronoQuark::single("created", 1_700_000_000_000),
    )))
    .unwrap();
    atom.push_particle(Particle::Message(MessageParticle::new(
        owner.clone(),
        address(),
        vec![0, 1, 2, 255],
        ChronoQuark::single("sent", 1_700_000_000_001),
    )))
    .unwrap();
    atom.push_particle(Particle::Ownership(OwnershipParticle::new(
        Euid::from_u128(7),
        owner,
        ChronoQuark::single("claimed", 1_700_000_000_002),
    )))
    .unwrap();
    atom
}

/// Test: Every wire object carries its embedded type tag
#[test]
fn test_wire_objects_tagged() {
    let wire = sample_atom().to_wire();
    assert_eq!(wire[SERIALIZER_FIELD], json!("ledger.atom"));
    for particle in wire["particles"].as_array().unwrap() {
        let tag = particle[SERIALIZER_FIELD].as_str().unwrap();
        assert!(tag.starts_with("particle."), "unexpected tag '{tag}'");
    }
}

/// Test: A full atom survives the wire roundtrip structurally intact
#[test]
fn test_wire_atom_roundtrip() {
    let registry = Registry::bootstrap();
    let atom = sample_atom();

    let restored = Atom::from_wire(&atom.to_wire(), &registry).unwrap();
    assert_eq!(restored, atom);
    assert_eq!(restored.euid(), atom.euid());
}

/// Test: Signatures survive the wire roundtrip and still verify
#[test]
fn test_wire_roundtrip_keeps_signatures() {
    let registry = Registry::bootstrap();
    let keypair = Keypair::generate();
    let mut atom = sample_atom();
    atom.sign(&KeypairSigner::new(keypair.clone()));

    let restored = Atom::from_wire(&atom.to_wire(), &registry).unwrap();
    assert_eq!(restored.signatures().len(), 1);
    assert!(restored.verify_signature(&keypair.public_key()));
}

/// Test: An unregistered particle tag fails loudly, never silently
#[test]
fn test_wire_unknown_particle_tag() {
    let registry = Registry::bootstrap();
    let wire = json!({
        SERIALIZER_FIELD: "ledger.atom",
        "particles": [{ SERIALIZER_FIELD: "particle.alien", "x": 1 }],
    });

    let err = Atom::from_wire(&wire, &registry).unwrap_err();
    match err {
        CodecError::UnknownType(tag) => assert_eq!(tag, "particle.alien"),
        other => panic!("expected UnknownType, got {other}"),
    }
}

/// Test: A present-but-wrong embedded tag is a schema mismatch
#[test]
fn test_wire_wrong_tag_rejected() {
    let registry = Registry::bootstrap();
    let wire = json!({
        SERIALIZER_FIELD: "particle.transfer",
        "particles": [],
    });

    let err = Atom::from_wire(&wire, &registry).unwrap_err();
    assert!(matches!(err, CodecError::SchemaMismatch { .. }));
}

/// Test: Missing required fields are a schema mismatch naming the field
#[test]
fn test_wire_missing_field_rejected() {
    let registry = Registry::bootstrap();
    let wire = json!({
        SERIALIZER_FIELD: "ledger.atom",
        "particles": [{
            SERIALIZER_FIELD: "particle.message",
            "from": address().to_string(),
            // "to" and the rest are missing
        }],
    });

    let err = Atom::from_wire(&wire, &registry).unwrap_err();
    match err {
        CodecError::SchemaMismatch { detail, .. } => {
            assert!(detail.contains("'to'"), "detail was '{detail}'")
        }
        other => panic!("expected SchemaMismatch, got {other}"),
    }
}

/// Test: Scalar wire conventions hold (amounts as hex, bytes as base64)
#[test]
fn test_wire_scalar_conventions() {
    let owner = address();
    let particle = Particle::Message(MessageParticle::new(
        owner.clone(),
        owner,
        vec![1, 2, 3],
        ChronoQuark::new(),
    ));
    let mut atom = Atom::new();
    atom.push_particle(particle).unwrap();

    let wire = atom.to_wire();
    let message = &wire["particles"][0];
    assert_eq!(message["payload"], json!("AQID"), "base64 of [1,2,3]");

    let amount_wire = sample_atom().to_wire();
    let transfer = amount_wire["particles"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p[SERIALIZER_FIELD] == json!("particle.transfer"))
        .unwrap();
    let amount_hex = transfer["fungible"]["amount"].as_str().unwrap();
    assert_eq!(amount_hex, TokenAmount::from_u128(1 << 80).to_hex());
}
