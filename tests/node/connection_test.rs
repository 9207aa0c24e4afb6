// Node Connection Tests
// Session lifecycle, subscriptions, sync tracking, and atom lookup

use crate::mock::{MockResponse, MockTransport};
use atomlink::identity::{Address, Keypair};
use atomlink::node::{
    ConnectionError, ConnectionState, NodeConnection, NodeConnectionConfig, SubscriptionItem,
    TransportError, TransportEvent, METHOD_CANCEL, METHOD_GET_BY_ID, METHOD_PING,
    METHOD_SUBSCRIBE,
};
use atomlink::record::{Atom, ChronoQuark, Euid, OwnershipParticle, Particle};
use atomlink::serialization::Registry;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};

fn config() -> NodeConnectionConfig {
    NodeConnectionConfig::new()
        .with_connect_timeout(1000)
        .with_submission_timeout(500)
        .with_liveness_interval(60_000)
}

async fn connect(mock: &MockTransport) -> NodeConnection {
    NodeConnection::connect(mock.clone(), Arc::new(Registry::bootstrap()), config())
        .await
        .expect("connect failed")
}

fn some_address() -> Address {
    Address::from_public_key(&Keypair::generate().public_key())
}

fn sample_atom(resource: u128) -> Atom {
    let mut atom = Atom::new();
    atom.push_particle(Particle::Ownership(OwnershipParticle::new(
        Euid::from_u128(resource),
        some_address(),
        ChronoQuark::single("claimed", 1000),
    )))
    .unwrap();
    atom
}

async fn recv(stream: &mut mpsc::Receiver<SubscriptionItem>) -> SubscriptionItem {
    timeout(Duration::from_secs(2), stream.recv())
        .await
        .expect("timed out waiting for a subscription item")
        .expect("subscription stream ended")
}

async fn expect_end(stream: &mut mpsc::Receiver<SubscriptionItem>) {
    let next = timeout(Duration::from_secs(2), stream.recv())
        .await
        .expect("timed out waiting for the stream to end");
    assert!(next.is_none(), "stream did not end");
}

async fn wait_closed(connection: &NodeConnection) {
    let mut states = connection.state_changes();
    timeout(
        Duration::from_secs(2),
        states.wait_for(|s| *s == ConnectionState::Closed),
    )
    .await
    .expect("connection never closed")
    .expect("state watch dropped");
}

/// Test: A fresh connection reports itself open
#[tokio::test]
async fn test_connect_reports_open() {
    let mock = MockTransport::new();
    let connection = connect(&mock).await;
    assert_eq!(connection.state(), ConnectionState::Open);
}

/// Test: A timed-out connect still tears the transport down
#[tokio::test]
async fn test_connect_timeout_closes_transport() {
    let mock = MockTransport::new();
    mock.delay_open(10_000);

    let err = NodeConnection::connect(
        mock.clone(),
        Arc::new(Registry::bootstrap()),
        config().with_connect_timeout(50),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ConnectionError::ConnectTimeout));
    assert_eq!(mock.close_count(), 1, "half-open transport leaked");
}

/// Test: Subscribed atoms arrive in batch order with the head flag
#[tokio::test]
async fn test_subscribe_delivers_atoms_in_order() {
    let mock = MockTransport::new();
    let connection = connect(&mock).await;
    let address = some_address();

    let mut stream = connection.subscribe(address.clone()).await.unwrap();
    let params = mock.wait_for_call(METHOD_SUBSCRIBE, 0).await;
    let subscriber_id = params["subscriberId"].as_u64().unwrap();
    assert_eq!(params["address"], json!(address.to_string()));

    let atoms = [sample_atom(1), sample_atom(2), sample_atom(3)];
    mock.push_event(TransportEvent::AtomsUpdate {
        subscriber_id,
        atoms: atoms.iter().map(Atom::to_wire).collect(),
        is_head: false,
    })
    .await;

    for expected in &atoms {
        let update = recv(&mut stream).await.unwrap();
        assert_eq!(update.atom.euid(), expected.euid());
        assert!(!update.is_head);
    }
    let mut sync = connection.is_synced(address).await.unwrap();
    assert!(!*sync.borrow());

    mock.push_event(TransportEvent::AtomsUpdate {
        subscriber_id,
        atoms: vec![sample_atom(4).to_wire()],
        is_head: true,
    })
    .await;
    let update = recv(&mut stream).await.unwrap();
    assert!(update.is_head);
    timeout(Duration::from_secs(2), sync.wait_for(|synced| *synced))
        .await
        .expect("sync flag never turned true")
        .expect("sync watch dropped");
}

/// Test: One subscription per address
#[tokio::test]
async fn test_subscribe_duplicate_rejected() {
    let mock = MockTransport::new();
    let connection = connect(&mock).await;
    let address = some_address();

    let _stream = connection.subscribe(address.clone()).await.unwrap();
    let err = connection.subscribe(address).await.unwrap_err();
    assert!(matches!(err, ConnectionError::AlreadySubscribed(_)));
}

/// Test: A refused subscribe call ends the stream with one terminal error
/// and frees the address
#[tokio::test]
async fn test_subscribe_rpc_failure() {
    let mock = MockTransport::new();
    mock.script(
        METHOD_SUBSCRIBE,
        MockResponse::Err(TransportError::CallFailed {
            method: METHOD_SUBSCRIBE.to_string(),
            reason: "node refused".to_string(),
        }),
    );
    let connection = connect(&mock).await;
    let address = some_address();

    // The stream is handed out before the node answers; the refusal
    // arrives on it.
    let mut stream = connection.subscribe(address.clone()).await.unwrap();
    let item = recv(&mut stream).await;
    match item {
        Err(ConnectionError::SubscriptionFailed(reason)) => {
            assert!(reason.contains("node refused"), "was '{reason}'")
        }
        other => panic!("expected a subscription failure, got {other:?}"),
    }
    expect_end(&mut stream).await;

    // The address is free again after the failure.
    let _stream = connection.subscribe(address).await.unwrap();
}

/// Test: Unsubscribe cancels at the node and ends the stream
#[tokio::test]
async fn test_unsubscribe_ends_stream() {
    let mock = MockTransport::new();
    let connection = connect(&mock).await;
    let address = some_address();

    let mut stream = connection.subscribe(address.clone()).await.unwrap();
    connection.unsubscribe(address.clone()).await.unwrap();

    let cancel = mock.wait_for_call(METHOD_CANCEL, 0).await;
    assert!(cancel["subscriberId"].is_u64());
    expect_end(&mut stream).await;

    let err = connection.unsubscribe(address).await.unwrap_err();
    assert!(matches!(err, ConnectionError::NotSubscribed(_)));
}

/// Test: A failed cancel leaves the subscription registered for a retry
#[tokio::test]
async fn test_unsubscribe_failure_keeps_subscription() {
    let mock = MockTransport::new();
    mock.script(
        METHOD_CANCEL,
        MockResponse::Err(TransportError::CallFailed {
            method: METHOD_CANCEL.to_string(),
            reason: "node busy".to_string(),
        }),
    );
    let connection = connect(&mock).await;
    let address = some_address();

    let mut stream = connection.subscribe(address.clone()).await.unwrap();
    let err = connection.unsubscribe(address.clone()).await.unwrap_err();
    assert!(matches!(err, ConnectionError::UnsubscriptionFailed(_)));

    // Still subscribed: the address is taken and the stream is alive.
    let dup = connection.subscribe(address.clone()).await.unwrap_err();
    assert!(matches!(dup, ConnectionError::AlreadySubscribed(_)));

    // The retry hits the default (successful) response.
    connection.unsubscribe(address).await.unwrap();
    expect_end(&mut stream).await;
}

/// Test: Unsubscribe-all sweeps every active subscription
#[tokio::test]
async fn test_unsubscribe_all() {
    let mock = MockTransport::new();
    let connection = connect(&mock).await;

    let mut first = connection.subscribe(some_address()).await.unwrap();
    let mut second = connection.subscribe(some_address()).await.unwrap();

    connection.unsubscribe_all().await.unwrap();
    expect_end(&mut first).await;
    expect_end(&mut second).await;
    assert_eq!(mock.calls_to(METHOD_CANCEL), 2);
}

/// Test: An undecodable atom delivers one codec error, then the stream ends
#[tokio::test]
async fn test_undecodable_atom_ends_subscription() {
    let mock = MockTransport::new();
    let connection = connect(&mock).await;
    let address = some_address();

    let mut stream = connection.subscribe(address.clone()).await.unwrap();
    let params = mock.wait_for_call(METHOD_SUBSCRIBE, 0).await;
    let subscriber_id = params["subscriberId"].as_u64().unwrap();

    mock.push_event(TransportEvent::AtomsUpdate {
        subscriber_id,
        atoms: vec![json!({ "serializer": "ledger.atom", "particles": "junk" })],
        is_head: false,
    })
    .await;

    let item = recv(&mut stream).await;
    assert!(matches!(item, Err(ConnectionError::Codec(_))));
    expect_end(&mut stream).await;

    // The dead subscription is cancelled at the node and its address freed.
    mock.wait_for_call(METHOD_CANCEL, 0).await;
    let err = connection.is_synced(address).await.unwrap_err();
    assert!(matches!(err, ConnectionError::NotSubscribed(_)));
}

/// Test: Sync status reflects a head batch even when nobody was watching
/// while it arrived
#[tokio::test]
async fn test_is_synced_current_value_without_prior_watcher() {
    let mock = MockTransport::new();
    let connection = connect(&mock).await;
    let address = some_address();

    let mut stream = connection.subscribe(address.clone()).await.unwrap();
    let params = mock.wait_for_call(METHOD_SUBSCRIBE, 0).await;
    let subscriber_id = params["subscriberId"].as_u64().unwrap();

    mock.push_event(TransportEvent::AtomsUpdate {
        subscriber_id,
        atoms: vec![sample_atom(7).to_wire()],
        is_head: true,
    })
    .await;
    let update = recv(&mut stream).await.unwrap();
    assert!(update.is_head);

    // The receiver is created only now; the stored value must already be
    // true.
    let sync = connection.is_synced(address).await.unwrap();
    assert!(*sync.borrow(), "head batch was lost");
}

/// Test: Sync status is only defined for subscribed addresses
#[tokio::test]
async fn test_is_synced_requires_subscription() {
    let mock = MockTransport::new();
    let connection = connect(&mock).await;

    let err = connection.is_synced(some_address()).await.unwrap_err();
    assert!(matches!(err, ConnectionError::NotSubscribed(_)));
}

/// Test: Atom lookup decodes a found atom, maps null to None, and treats a
/// missing field as an unsupported operation
#[tokio::test]
async fn test_get_atom_by_id() {
    let mock = MockTransport::new();
    let atom = sample_atom(42);
    mock.script(
        METHOD_GET_BY_ID,
        MockResponse::Ok(json!({ "atom": atom.to_wire() })),
    );
    mock.script(METHOD_GET_BY_ID, MockResponse::Ok(json!({ "atom": null })));
    mock.script(METHOD_GET_BY_ID, MockResponse::Ok(json!({})));
    let connection = connect(&mock).await;

    let found = connection.get_atom_by_id(&atom.euid()).await.unwrap();
    assert_eq!(found.unwrap().euid(), atom.euid());

    let missing = connection.get_atom_by_id(&Euid::from_u128(1)).await.unwrap();
    assert!(missing.is_none());

    let err = connection
        .get_atom_by_id(&Euid::from_u128(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectionError::NotImplemented(_)));
}

/// Test: Closing is idempotent and tears the transport down once observed
#[tokio::test]
async fn test_close_idempotent() {
    let mock = MockTransport::new();
    let connection = connect(&mock).await;

    connection.close().await;
    wait_closed(&connection).await;
    connection.close().await;

    assert_eq!(connection.state(), ConnectionState::Closed);
    assert_eq!(mock.close_count(), 1);
}

/// Test: A transport-side close ends the session and later commands fail
#[tokio::test]
async fn test_transport_close_event_ends_session() {
    let mock = MockTransport::new();
    let connection = connect(&mock).await;
    let mut stream = connection.subscribe(some_address()).await.unwrap();

    mock.push_event(TransportEvent::Closed {
        reason: "peer went away".to_string(),
    })
    .await;
    wait_closed(&connection).await;
    let item = recv(&mut stream).await;
    assert!(matches!(item, Err(ConnectionError::Closed)));
    expect_end(&mut stream).await;

    let err = connection.subscribe(some_address()).await.unwrap_err();
    assert!(matches!(err, ConnectionError::Closed));
}

/// Test: A failed liveness probe is logged and the session stays open
#[tokio::test]
async fn test_liveness_probe_failure_is_not_fatal() {
    let mock = MockTransport::new();
    mock.script(METHOD_PING, MockResponse::Err(TransportError::Closed));
    let probing = config().with_liveness_interval(30);
    let connection = NodeConnection::connect(
        mock.clone(),
        Arc::new(Registry::bootstrap()),
        probing,
    )
    .await
    .unwrap();

    mock.wait_for_call(METHOD_PING, 0).await;
    // The cadence survives the failure and the session stays open.
    mock.wait_for_call(METHOD_PING, 1).await;
    assert_eq!(connection.state(), ConnectionState::Open);
    assert_eq!(mock.close_count(), 0);
}

/// Test: A hung ping holds the probe slot instead of piling up tasks
#[tokio::test]
async fn test_liveness_probe_does_not_pile_up() {
    let mock = MockTransport::new();
    mock.script(METHOD_PING, MockResponse::Hang);
    let probing = config().with_liveness_interval(30);
    let connection = NodeConnection::connect(
        mock.clone(),
        Arc::new(Registry::bootstrap()),
        probing,
    )
    .await
    .unwrap();

    mock.wait_for_call(METHOD_PING, 0).await;
    // Several intervals pass while the first probe is stuck.
    sleep(Duration::from_millis(200)).await;
    assert_eq!(mock.calls_to(METHOD_PING), 1, "probes piled up");
    assert_eq!(connection.state(), ConnectionState::Open);
}
