// Node connection - one live RPC session with a ledger node
//
// All connection bookkeeping (subscriptions, tracked submissions, sync
// flags) lives in a single driver task. Handles talk to the driver over a
// command channel, so there is never a second writer to fight over state.
// RPC calls run on their own tasks and report back through internal events;
// the driver itself never awaits the transport.

use crate::node::rpc::{
    RpcTransport, TransportError, TransportEvent, METHOD_CANCEL, METHOD_GET_BY_ID, METHOD_PING,
    METHOD_SUBMIT, METHOD_SUBSCRIBE,
};
use crate::node::submission::{SubmissionError, SubmissionFailure, SubmissionState};
use crate::identity::Address;
use crate::record::{Atom, Euid};
use crate::serialization::Registry;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Connection-level errors surfaced to handle callers
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    #[error("Connection is closed")]
    Closed,

    #[error("Connect timed out")]
    ConnectTimeout,

    #[error("Not connected to node")]
    NotConnected,

    #[error("Already subscribed to {0}")]
    AlreadySubscribed(Address),

    #[error("No subscription for {0}")]
    NotSubscribed(Address),

    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),

    #[error("Unsubscription failed: {0}")]
    UnsubscriptionFailed(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Node does not support this operation: {0}")]
    NotImplemented(String),
}

/// Configuration for a node connection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConnectionConfig {
    /// How long to wait for the transport handshake (milliseconds)
    pub connect_timeout_ms: u64,
    /// How long a tracked submission may wait for a node reply (milliseconds)
    pub submission_timeout_ms: u64,
    /// How often to ping the node for liveness (milliseconds)
    pub liveness_interval_ms: u64,
    /// Buffer size of per-subscription and per-submission channels
    pub channel_capacity: usize,
}

impl Default for NodeConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            submission_timeout_ms: 5000,
            liveness_interval_ms: 10000,
            channel_capacity: 64,
        }
    }
}

impl NodeConnectionConfig {
    /// Create a new config builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, millis: u64) -> Self {
        self.connect_timeout_ms = millis;
        self
    }

    /// Set the submission timeout
    pub fn with_submission_timeout(mut self, millis: u64) -> Self {
        self.submission_timeout_ms = millis;
        self
    }

    /// Set the liveness probe interval
    pub fn with_liveness_interval(mut self, millis: u64) -> Self {
        self.liveness_interval_ms = millis;
        self
    }

    /// Set the channel capacity
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

/// Lifecycle of the session as a whole
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// What the node did with an atom it notified us about
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtomAction {
    Store,
}

/// One atom notification delivered on a subscription stream
#[derive(Clone, Debug)]
pub struct AtomUpdate {
    pub atom: Atom,
    pub action: AtomAction,
    /// Whether the node considers the subscription caught up after this batch
    pub is_head: bool,
}

/// Items on a subscription stream
pub type SubscriptionItem = Result<AtomUpdate, ConnectionError>;

/// Items on a tracked-submission stream
pub type SubmissionItem = Result<SubmissionState, SubmissionError>;

// ============================================================================
// DRIVER PROTOCOL
// ============================================================================

enum Command {
    Subscribe {
        address: Address,
        reply: oneshot::Sender<Result<mpsc::Receiver<SubscriptionItem>, ConnectionError>>,
    },
    Unsubscribe {
        address: Address,
        reply: oneshot::Sender<Result<(), ConnectionError>>,
    },
    IsSynced {
        address: Address,
        reply: oneshot::Sender<Result<watch::Receiver<bool>, ConnectionError>>,
    },
    Submit {
        atom: Atom,
        reply: oneshot::Sender<Result<mpsc::Receiver<SubmissionItem>, ConnectionError>>,
    },
    Addresses {
        reply: oneshot::Sender<Vec<Address>>,
    },
    Close,
}

/// Results reported back to the driver by its spawned RPC tasks
enum InternalEvent {
    SubscribeAck {
        subscriber_id: u64,
        result: Result<(), TransportError>,
    },
    UnsubscribeAck {
        subscriber_id: u64,
        result: Result<(), TransportError>,
        reply: oneshot::Sender<Result<(), ConnectionError>>,
    },
    SubmitAck {
        subscriber_id: u64,
        result: Result<(), TransportError>,
    },
    SubmissionTimeout {
        subscriber_id: u64,
    },
}

struct SubscriptionEntry {
    address: Address,
    sender: mpsc::Sender<SubscriptionItem>,
    sync_tx: watch::Sender<bool>,
}

struct SubmissionEntry {
    sender: mpsc::Sender<SubmissionItem>,
    state: SubmissionState,
    timer: JoinHandle<()>,
}

// ============================================================================
// HANDLE
// ============================================================================

/// Cloneable handle to one live node session
#[derive(Clone)]
pub struct NodeConnection {
    commands: mpsc::Sender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    transport: Arc<dyn RpcTransport>,
    registry: Arc<Registry>,
}

impl std::fmt::Debug for NodeConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeConnection").finish_non_exhaustive()
    }
}

impl NodeConnection {
    /// Open the transport and start the session driver
    pub async fn connect<T: RpcTransport>(
        transport: T,
        registry: Arc<Registry>,
        config: NodeConnectionConfig,
    ) -> Result<Self, ConnectionError> {
        let transport: Arc<dyn RpcTransport> = Arc::new(transport);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let opened = timeout(
            Duration::from_millis(config.connect_timeout_ms),
            transport.open(),
        )
        .await;
        let events = match opened {
            Ok(Ok(events)) => events,
            Ok(Err(e)) => {
                // The caller never sees the transport again; clean up here.
                transport.close().await;
                return Err(ConnectionError::Transport(e));
            }
            Err(_) => {
                transport.close().await;
                return Err(ConnectionError::ConnectTimeout);
            }
        };

        let _ = state_tx.send(ConnectionState::Open);
        info!("node connection open");

        let (command_tx, command_rx) = mpsc::channel(config.channel_capacity);
        let (internal_tx, internal_rx) = mpsc::channel(config.channel_capacity);

        let driver = Driver {
            transport: Arc::clone(&transport),
            registry: Arc::clone(&registry),
            config,
            state_tx,
            internal_tx,
            subscriptions: HashMap::new(),
            by_address: HashMap::new(),
            submissions: HashMap::new(),
            next_subscriber_id: 1,
            probe: None,
        };
        tokio::spawn(driver.run(events, command_rx, internal_rx));

        Ok(Self {
            commands: command_tx,
            state_rx,
            transport,
            registry,
        })
    }

    /// Current lifecycle state of the session
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch lifecycle transitions
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Start streaming atoms relevant to one address
    ///
    /// At most one subscription per address is allowed. The stream is
    /// returned before the node acknowledges; if the subscribe call fails,
    /// the failure arrives as the stream's one terminal error.
    pub async fn subscribe(
        &self,
        address: Address,
    ) -> Result<mpsc::Receiver<SubscriptionItem>, ConnectionError> {
        let (reply, response) = oneshot::channel();
        self.send_command(Command::Subscribe { address, reply }, response)
            .await?
    }

    /// Stop streaming atoms for one address
    ///
    /// Completes once the node acknowledges the cancel. On failure the
    /// subscription stays registered, so the caller may retry.
    pub async fn unsubscribe(&self, address: Address) -> Result<(), ConnectionError> {
        let (reply, response) = oneshot::channel();
        self.send_command(Command::Unsubscribe { address, reply }, response)
            .await?
    }

    /// Stop every active subscription, keeping the connection open
    pub async fn unsubscribe_all(&self) -> Result<(), ConnectionError> {
        let (reply, response) = oneshot::channel();
        let addresses = self.send_command(Command::Addresses { reply }, response).await?;
        let mut first_error = None;
        for address in addresses {
            if let Err(e) = self.unsubscribe(address).await {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Watch whether the subscription for this address has caught up to the
    /// head of the node's ledger view
    pub async fn is_synced(
        &self,
        address: Address,
    ) -> Result<watch::Receiver<bool>, ConnectionError> {
        let (reply, response) = oneshot::channel();
        self.send_command(Command::IsSynced { address, reply }, response)
            .await?
    }

    /// Submit an atom and track it to a terminal state
    ///
    /// The stream yields `Submitted` once the node acknowledges receipt,
    /// then exactly one terminal item: `Stored` or an error.
    pub async fn submit_atom(
        &self,
        atom: Atom,
    ) -> Result<mpsc::Receiver<SubmissionItem>, ConnectionError> {
        let (reply, response) = oneshot::channel();
        self.send_command(Command::Submit { atom, reply }, response)
            .await?
    }

    /// Fetch one atom by its content identity, if the node supports lookup
    ///
    /// This is a plain request/response exchange; it touches no connection
    /// bookkeeping and so bypasses the driver.
    pub async fn get_atom_by_id(&self, id: &Euid) -> Result<Option<Atom>, ConnectionError> {
        if self.state() != ConnectionState::Open {
            return Err(ConnectionError::NotConnected);
        }
        let response = self
            .transport
            .call(METHOD_GET_BY_ID, json!({ "id": id.to_hex() }))
            .await?;
        let body = response
            .as_object()
            .ok_or_else(|| ConnectionError::Codec("lookup response is not an object".into()))?;
        match body.get("atom") {
            None => Err(ConnectionError::NotImplemented(METHOD_GET_BY_ID.to_string())),
            Some(value) if value.is_null() => Ok(None),
            Some(value) => {
                let atom = Atom::from_wire(value, &self.registry)
                    .map_err(|e| ConnectionError::Codec(e.to_string()))?;
                Ok(Some(atom))
            }
        }
    }

    /// Close the session; safe to call more than once
    pub async fn close(&self) {
        // A send error means the driver is already gone, which is the goal.
        let _ = self.commands.send(Command::Close).await;
    }

    async fn send_command<R>(
        &self,
        command: Command,
        response: oneshot::Receiver<R>,
    ) -> Result<R, ConnectionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ConnectionError::Closed)?;
        response.await.map_err(|_| ConnectionError::Closed)
    }
}

// ============================================================================
// DRIVER
// ============================================================================

struct Driver {
    transport: Arc<dyn RpcTransport>,
    registry: Arc<Registry>,
    config: NodeConnectionConfig,
    state_tx: watch::Sender<ConnectionState>,
    internal_tx: mpsc::Sender<InternalEvent>,
    subscriptions: HashMap<u64, SubscriptionEntry>,
    by_address: HashMap<Address, u64>,
    submissions: HashMap<u64, SubmissionEntry>,
    next_subscriber_id: u64,
    probe: Option<JoinHandle<()>>,
}

impl Driver {
    async fn run(
        mut self,
        mut events: mpsc::Receiver<TransportEvent>,
        mut commands: mpsc::Receiver<Command>,
        mut internal: mpsc::Receiver<InternalEvent>,
    ) {
        let mut liveness = interval(Duration::from_millis(self.config.liveness_interval_ms));
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; skip it so
        // the probe cadence starts one interval after connect.
        liveness.tick().await;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Close) | None => {
                        self.shutdown("closed by client").await;
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                },
                event = events.recv() => match event {
                    Some(event) => {
                        if self.handle_transport_event(event).await {
                            break;
                        }
                    }
                    None => {
                        self.shutdown("transport event stream ended").await;
                        break;
                    }
                },
                Some(event) = internal.recv() => {
                    if self.handle_internal(event).await {
                        break;
                    }
                },
                _ = liveness.tick() => self.probe_liveness(),
            }
        }
    }

    // ------------------------------------------------------------------
    // Commands from handles
    // ------------------------------------------------------------------

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Subscribe { address, reply } => self.start_subscription(address, reply),
            Command::Unsubscribe { address, reply } => self.stop_subscription(address, reply),
            Command::IsSynced { address, reply } => {
                let result = match self.by_address.get(&address) {
                    Some(id) => Ok(self.subscriptions[id].sync_tx.subscribe()),
                    None => Err(ConnectionError::NotSubscribed(address)),
                };
                let _ = reply.send(result);
            }
            Command::Submit { atom, reply } => self.start_submission(atom, reply),
            Command::Addresses { reply } => {
                let _ = reply.send(self.by_address.keys().cloned().collect());
            }
            Command::Close => unreachable!("Close is handled in the select loop"),
        }
    }

    fn start_subscription(
        &mut self,
        address: Address,
        reply: oneshot::Sender<Result<mpsc::Receiver<SubscriptionItem>, ConnectionError>>,
    ) {
        if self.by_address.contains_key(&address) {
            let _ = reply.send(Err(ConnectionError::AlreadySubscribed(address)));
            return;
        }

        let subscriber_id = self.allocate_subscriber_id();
        let (sender, receiver) = mpsc::channel(self.config.channel_capacity);
        let (sync_tx, _) = watch::channel(false);
        self.by_address.insert(address.clone(), subscriber_id);
        self.subscriptions.insert(
            subscriber_id,
            SubscriptionEntry {
                address: address.clone(),
                sender,
                sync_tx,
            },
        );
        debug!(subscriber_id, %address, "subscribing");
        // Callers get the stream before the node acknowledges, so they can
        // start buffering; an acknowledgement failure arrives on the stream.
        let _ = reply.send(Ok(receiver));

        let transport = Arc::clone(&self.transport);
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = transport
                .call(
                    METHOD_SUBSCRIBE,
                    json!({
                        "subscriberId": subscriber_id,
                        "address": address.to_string(),
                    }),
                )
                .await
                .map(|_| ());
            let _ = internal
                .send(InternalEvent::SubscribeAck {
                    subscriber_id,
                    result,
                })
                .await;
        });
    }

    fn stop_subscription(
        &mut self,
        address: Address,
        reply: oneshot::Sender<Result<(), ConnectionError>>,
    ) {
        let Some(subscriber_id) = self.by_address.get(&address).copied() else {
            let _ = reply.send(Err(ConnectionError::NotSubscribed(address)));
            return;
        };
        debug!(subscriber_id, %address, "unsubscribing");

        // Bookkeeping stays until the node acknowledges the cancel, so a
        // failed unsubscribe can be retried.
        let transport = Arc::clone(&self.transport);
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = transport
                .call(METHOD_CANCEL, json!({ "subscriberId": subscriber_id }))
                .await
                .map(|_| ());
            let _ = internal
                .send(InternalEvent::UnsubscribeAck {
                    subscriber_id,
                    result,
                    reply,
                })
                .await;
        });
    }

    fn start_submission(
        &mut self,
        atom: Atom,
        reply: oneshot::Sender<Result<mpsc::Receiver<SubmissionItem>, ConnectionError>>,
    ) {
        let subscriber_id = self.allocate_subscriber_id();
        let (sender, receiver) = mpsc::channel(self.config.channel_capacity);

        let timer = {
            let internal = self.internal_tx.clone();
            let millis = self.config.submission_timeout_ms;
            tokio::spawn(async move {
                sleep(Duration::from_millis(millis)).await;
                let _ = internal
                    .send(InternalEvent::SubmissionTimeout { subscriber_id })
                    .await;
            })
        };
        let mut entry = SubmissionEntry {
            sender,
            state: SubmissionState::Created,
            timer,
        };
        debug!(subscriber_id, atom = %atom.euid(), "submitting atom");

        let wire = atom.to_wire();
        let transport = Arc::clone(&self.transport);
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = transport
                .call(
                    METHOD_SUBMIT,
                    json!({
                        "subscriberId": subscriber_id,
                        "atom": wire,
                    }),
                )
                .await
                .map(|_| ());
            let _ = internal
                .send(InternalEvent::SubmitAck {
                    subscriber_id,
                    result,
                })
                .await;
        });

        // The submit call is in flight from here on.
        entry.state = SubmissionState::Submitting;
        self.submissions.insert(subscriber_id, entry);

        let _ = reply.send(Ok(receiver));
    }

    fn allocate_subscriber_id(&mut self) -> u64 {
        let id = self.next_subscriber_id;
        self.next_subscriber_id += 1;
        id
    }

    // ------------------------------------------------------------------
    // Internal events from spawned RPC tasks
    // ------------------------------------------------------------------

    async fn handle_internal(&mut self, event: InternalEvent) -> bool {
        match event {
            InternalEvent::SubscribeAck {
                subscriber_id,
                result,
            } => {
                self.finish_subscribe(subscriber_id, result).await;
                false
            }
            InternalEvent::UnsubscribeAck {
                subscriber_id,
                result,
                reply,
            } => {
                match result {
                    Ok(()) => {
                        // Dropping the entry drops its sender, which ends
                        // the stream.
                        if let Some(entry) = self.subscriptions.remove(&subscriber_id) {
                            self.by_address.remove(&entry.address);
                        }
                        let _ = reply.send(Ok(()));
                    }
                    Err(e) => {
                        let _ = reply
                            .send(Err(ConnectionError::UnsubscriptionFailed(e.to_string())));
                    }
                }
                false
            }
            InternalEvent::SubmitAck {
                subscriber_id,
                result,
            } => {
                match result {
                    Ok(()) => self.advance_submission(subscriber_id, SubmissionState::Submitted).await,
                    Err(e) => {
                        self.fail_submission(subscriber_id, SubmissionError::Transport(e.to_string()))
                            .await
                    }
                }
                false
            }
            InternalEvent::SubmissionTimeout { subscriber_id } => {
                if !self.submissions.contains_key(&subscriber_id) {
                    return false;
                }
                warn!(subscriber_id, "submission timed out, closing connection");
                self.fail_submission(subscriber_id, SubmissionError::Timeout)
                    .await;
                self.shutdown("submission timed out").await;
                true
            }
        }
    }

    async fn finish_subscribe(&mut self, subscriber_id: u64, result: Result<(), TransportError>) {
        match result {
            Ok(()) => {
                debug!(subscriber_id, "subscription acknowledged");
            }
            Err(e) => {
                // The caller already holds the stream; the refusal becomes
                // its one terminal error and the address is freed again.
                let Some(entry) = self.subscriptions.remove(&subscriber_id) else {
                    return;
                };
                self.by_address.remove(&entry.address);
                let _ = entry
                    .sender
                    .send(Err(ConnectionError::SubscriptionFailed(e.to_string())))
                    .await;
            }
        }
    }

    // ------------------------------------------------------------------
    // Transport events
    // ------------------------------------------------------------------

    /// Returns true when the event ended the session
    async fn handle_transport_event(&mut self, event: TransportEvent) -> bool {
        match event {
            TransportEvent::Opened => {
                debug!("transport reported open");
                false
            }
            TransportEvent::Closed { reason } => {
                info!(%reason, "transport closed");
                self.shutdown(&reason).await;
                true
            }
            TransportEvent::Error { message } => {
                warn!(%message, "node reported an error");
                false
            }
            TransportEvent::AtomsUpdate {
                subscriber_id,
                atoms,
                is_head,
            } => {
                self.deliver_atoms(subscriber_id, atoms, is_head).await;
                false
            }
            TransportEvent::SubmissionUpdate {
                subscriber_id,
                state,
                message,
            } => {
                self.apply_submission_update(subscriber_id, &state, message)
                    .await;
                false
            }
        }
    }

    async fn deliver_atoms(&mut self, subscriber_id: u64, atoms: Vec<serde_json::Value>, is_head: bool) {
        let Some(entry) = self.subscriptions.get_mut(&subscriber_id) else {
            debug!(subscriber_id, "atoms update for unknown subscription");
            return;
        };
        let mut cancel = false;
        for value in &atoms {
            match Atom::from_wire(value, &self.registry) {
                Ok(atom) => {
                    // Some nodes annotate each atom with the hash they
                    // computed; a disagreement with our recomputation is
                    // worth a warning but not worth dropping the atom.
                    if let Some(hid) = value.get("hid").and_then(serde_json::Value::as_str) {
                        let recomputed = atom.euid().to_hex();
                        if hid != recomputed {
                            warn!(subscriber_id, node_hid = hid, %recomputed, "atom hash mismatch");
                        }
                    }
                    let update = AtomUpdate {
                        atom,
                        action: AtomAction::Store,
                        is_head,
                    };
                    if entry.sender.send(Ok(update)).await.is_err() {
                        // Receiver dropped: treat as an implicit unsubscribe.
                        cancel = true;
                        break;
                    }
                }
                Err(e) => {
                    warn!(subscriber_id, error = %e, "undecodable atom ends subscription");
                    let _ = entry
                        .sender
                        .send(Err(ConnectionError::Codec(e.to_string())))
                        .await;
                    cancel = true;
                    break;
                }
            }
        }

        if cancel {
            let address = entry.address.clone();
            self.subscriptions.remove(&subscriber_id);
            self.by_address.remove(&address);
            let transport = Arc::clone(&self.transport);
            tokio::spawn(async move {
                let _ = transport
                    .call(METHOD_CANCEL, json!({ "subscriberId": subscriber_id }))
                    .await;
            });
        } else {
            // The head flag describes the subscription after this batch, so
            // it only moves once the whole batch has been forwarded (and a
            // later partial batch can take it away again). send_replace
            // stores the value even while nobody is watching yet.
            entry.sync_tx.send_replace(is_head);
        }
    }

    async fn apply_submission_update(
        &mut self,
        subscriber_id: u64,
        state: &str,
        message: Option<String>,
    ) {
        if !self.submissions.contains_key(&subscriber_id) {
            debug!(subscriber_id, "update for unknown submission");
            return;
        }
        match state {
            "SUBMITTING" => {}
            "SUBMITTED" => {
                self.advance_submission(subscriber_id, SubmissionState::Submitted)
                    .await;
            }
            "STORED" => {
                // The node may confirm storage before the submit response
                // makes it back; receipt is implied either way.
                self.advance_submission(subscriber_id, SubmissionState::Submitted)
                    .await;
                self.advance_submission(subscriber_id, SubmissionState::Stored)
                    .await;
            }
            other => match SubmissionFailure::from_wire_name(other) {
                Some(failure) => {
                    self.fail_submission(
                        subscriber_id,
                        SubmissionError::Rejected {
                            failure,
                            message: message.unwrap_or_default(),
                        },
                    )
                    .await;
                }
                None => {
                    warn!(subscriber_id, state = other, "unknown submission state");
                }
            },
        }
    }

    /// Move a submission forward, emitting the new state; no-op when the
    /// transition is not a legal forward step
    async fn advance_submission(&mut self, subscriber_id: u64, next: SubmissionState) {
        let Some(entry) = self.submissions.get_mut(&subscriber_id) else {
            return;
        };
        if !entry.state.can_transition_to(next) {
            return;
        }
        entry.state = next;
        if next == SubmissionState::Submitted {
            // The node has the atom; the timeout only guards receipt.
            entry.timer.abort();
        }
        let _ = entry.sender.send(Ok(next)).await;
        if next.is_terminal() {
            self.finish_submission(subscriber_id);
        }
    }

    async fn fail_submission(&mut self, subscriber_id: u64, error: SubmissionError) {
        let Some(entry) = self.submissions.remove(&subscriber_id) else {
            return;
        };
        entry.timer.abort();
        let _ = entry.sender.send(Err(error)).await;
    }

    fn finish_submission(&mut self, subscriber_id: u64) {
        if let Some(entry) = self.submissions.remove(&subscriber_id) {
            entry.timer.abort();
        }
    }

    // ------------------------------------------------------------------
    // Liveness and teardown
    // ------------------------------------------------------------------

    fn probe_liveness(&mut self) {
        // One probe in flight at a time; a hung node must not pile up a
        // task per tick.
        if let Some(handle) = &self.probe {
            if !handle.is_finished() {
                warn!("previous liveness probe still outstanding, skipping tick");
                return;
            }
        }
        let transport = Arc::clone(&self.transport);
        self.probe = Some(tokio::spawn(async move {
            // Probe failures are diagnostic; the transport's own close event
            // is what ends the session.
            if let Err(e) = transport.call(METHOD_PING, json!({})).await {
                warn!(error = %e, "liveness probe failed");
            }
        }));
    }

    /// Tear the session down: every stream ends exactly once, pending
    /// submissions fail with `ConnectionClosed`, and the transport closes.
    async fn shutdown(&mut self, reason: &str) {
        if *self.state_tx.borrow() == ConnectionState::Closed {
            return;
        }
        info!(%reason, "closing node connection");
        let _ = self.state_tx.send(ConnectionState::Closed);

        if let Some(handle) = self.probe.take() {
            handle.abort();
        }

        for (_, entry) in self.subscriptions.drain() {
            let _ = entry.sender.send(Err(ConnectionError::Closed)).await;
        }
        self.by_address.clear();

        let pending: Vec<u64> = self.submissions.keys().copied().collect();
        for subscriber_id in pending {
            self.fail_submission(subscriber_id, SubmissionError::ConnectionClosed)
                .await;
        }

        self.transport.close().await;
    }
}
