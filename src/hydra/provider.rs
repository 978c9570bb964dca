//! Hydra provider: the caller-facing client facade.
//!
//! A provider owns one event-loop task holding the state machine. Everything
//! that can mutate machine state (commands, transport events, HTTP commit
//! outcomes) flows through that task's queue, so all transitions are
//! serialized in arrival order and the machine needs no locking.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value as Json;
use tokio::sync::{mpsc, oneshot, watch};

use crate::hydra::connection::{
    self, ConnectionHandle, TransportEvent, TransportEventKind,
};
use crate::hydra::error::{HydraError, Result};
use crate::hydra::http::HttpClient;
use crate::hydra::machine::{
    Action, Command, Event, HeadState, HydraMachine, InitPhase, State, CLOSE_NORMAL,
};
use crate::hydra::message::{
    parse_server_message, HydraCommitTransaction, HydraTransaction,
};

/// Connection settings, passed explicitly at construction time.
#[derive(Debug, Clone)]
pub struct HydraConfig {
    /// HTTP base URL of the Hydra node, e.g. `http://localhost:4001`.
    pub http_url: String,
    /// Explicit WebSocket URL; derived from `http_url` when absent.
    pub ws_url: Option<String>,
    /// Restrict server-sent history to this address.
    pub address: Option<String>,
    /// Replay message history on connect.
    pub history: bool,
    /// Include the UTxO snapshot in the `Greetings` bootstrap.
    pub snapshot_utxo: bool,
}

impl HydraConfig {
    /// Settings for a node at `http_url`, with history and snapshot off.
    pub fn new(http_url: impl Into<String>) -> Self {
        HydraConfig {
            http_url: http_url.into(),
            ws_url: None,
            address: None,
            history: false,
            snapshot_utxo: false,
        }
    }
}

/// Identifier of a registered message listener.
pub type ListenerId = u64;

type Listener = Box<dyn Fn(&Json) + Send>;

#[derive(Default)]
struct ListenerSet {
    next: ListenerId,
    map: BTreeMap<ListenerId, Listener>,
}

/// Messages processed by the provider's event loop.
enum LoopMsg {
    Connect,
    Disconnect,
    Command(Command),
    Commit {
        payload: Json,
        reply: oneshot::Sender<Result<HydraCommitTransaction>>,
    },
    ConnectOutcome {
        epoch: u64,
        result: std::result::Result<ConnectionHandle, String>,
    },
    CommitOutcome {
        epoch: u64,
        result: Result<HydraCommitTransaction>,
    },
    Shutdown,
}

/// Client for administrating and interacting with a Hydra Head.
///
/// Commands are serialized in call order; inbound messages are applied in
/// network arrival order; the current machine state is observable through a
/// [`watch`] channel. Must be created inside a Tokio runtime.
///
/// # Examples
///
/// ```no_run
/// use hydra_client::hydra::{HydraConfig, HydraProvider};
///
/// # async fn example() -> Result<(), hydra_client::hydra::HydraError> {
/// let provider = HydraProvider::new(HydraConfig::new("http://localhost:4001"));
/// provider.connect()?;
/// provider.init()?;
/// # Ok(())
/// # }
/// ```
pub struct HydraProvider {
    loop_tx: mpsc::UnboundedSender<LoopMsg>,
    status_rx: watch::Receiver<State>,
    listeners: Arc<Mutex<ListenerSet>>,
    http: HttpClient,
}

impl HydraProvider {
    /// Spawn the event loop for a node described by `config`.
    pub fn new(config: HydraConfig) -> Self {
        let (loop_tx, loop_rx) = mpsc::unbounded_channel();
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(State::Disconnected);
        let listeners = Arc::new(Mutex::new(ListenerSet::default()));
        let http = HttpClient::new(config.http_url.clone());

        let event_loop = ProviderLoop {
            config,
            machine: HydraMachine::new(),
            http: http.clone(),
            epoch: 0,
            pending_commit: None,
            listeners: Arc::clone(&listeners),
            status_tx,
            loop_tx: loop_tx.clone(),
            transport_tx,
        };
        tokio::spawn(event_loop.run(loop_rx, transport_rx));

        HydraProvider {
            loop_tx,
            status_rx,
            listeners,
            http,
        }
    }

    /// Connect to the node. Progress is observable via [`Self::status`].
    pub fn connect(&self) -> Result<()> {
        self.send(LoopMsg::Connect)
    }

    /// Disconnect gracefully, resetting the machine context.
    pub fn disconnect(&self) -> Result<()> {
        self.send(LoopMsg::Disconnect)
    }

    /// Initialize a new head. Valid in `Idle` and `Final`.
    pub fn init(&self) -> Result<()> {
        self.send(LoopMsg::Command(Command::Init))
    }

    /// Abort an initializing head before it opens.
    pub fn abort(&self) -> Result<()> {
        self.send(LoopMsg::Command(Command::Abort))
    }

    /// Close the open head, starting the contestation window.
    pub fn close(&self) -> Result<()> {
        self.send(LoopMsg::Command(Command::Close))
    }

    /// Contest the closed head's snapshot.
    pub fn contest(&self) -> Result<()> {
        self.send(LoopMsg::Command(Command::Contest))
    }

    /// Post the fanout transaction, settling the head on the base layer.
    pub fn fanout(&self) -> Result<()> {
        self.send(LoopMsg::Command(Command::Fanout))
    }

    /// Submit a transaction through the head.
    ///
    /// Fire-and-forget: the verdict arrives later as a `TxValid`,
    /// `TxInvalid`, or `CommandFailed` message, correlated by transaction id.
    pub fn new_tx(&self, transaction: HydraTransaction) -> Result<()> {
        self.send(LoopMsg::Command(Command::NewTx(transaction)))
    }

    /// Recover a deposit transaction by its id.
    pub fn recover(&self, tx_id: impl Into<String>) -> Result<()> {
        self.send(LoopMsg::Command(Command::Recover {
            recover_tx_id: tx_id.into(),
        }))
    }

    /// Request decommit of a UTxO back to the base layer.
    pub fn decommit(&self, transaction: HydraTransaction) -> Result<()> {
        self.send(LoopMsg::Command(Command::Decommit(transaction)))
    }

    /// Commit a UTxO set into the initializing head.
    ///
    /// Resolves with the signable commit transaction returned by the node.
    /// On HTTP failure the machine re-enters `ReadyToCommit` with the
    /// request retained, so the same payload can simply be resubmitted.
    pub async fn commit(&self, payload: Json) -> Result<HydraCommitTransaction> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LoopMsg::Commit {
            payload,
            reply: reply_tx,
        })?;
        reply_rx.await.map_err(|_| HydraError::ClientClosed)?
    }

    /// Fetch the node's confirmed UTxO snapshot over HTTP.
    pub async fn snapshot_utxo(&self) -> Result<Json> {
        self.http.snapshot_utxo().await
    }

    /// Register a listener invoked for every inbound frame, including frames
    /// whose tag the client does not recognize.
    pub fn on_message(&self, listener: impl Fn(&Json) + Send + 'static) -> ListenerId {
        let mut set = self.listeners.lock().expect("listener set poisoned");
        let id = set.next;
        set.next += 1;
        set.map.insert(id, Box::new(listener));
        id
    }

    /// Remove a previously registered listener. Returns whether it existed.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut set = self.listeners.lock().expect("listener set poisoned");
        set.map.remove(&id).is_some()
    }

    /// Observable machine state; use `wait_for` to await a transition.
    pub fn status(&self) -> watch::Receiver<State> {
        self.status_rx.clone()
    }

    /// Snapshot of the current machine state.
    pub fn state(&self) -> State {
        self.status_rx.borrow().clone()
    }

    fn send(&self, msg: LoopMsg) -> Result<()> {
        self.loop_tx
            .send(msg)
            .map_err(|_| HydraError::ClientClosed)
    }
}

impl Drop for HydraProvider {
    fn drop(&mut self) {
        let _ = self.loop_tx.send(LoopMsg::Shutdown);
    }
}

/// State owned by the event-loop task.
struct ProviderLoop {
    config: HydraConfig,
    machine: HydraMachine,
    http: HttpClient,
    /// Connection generation; events tagged with an older epoch are stale
    /// and discarded, so a torn-down connection causes no late transitions.
    epoch: u64,
    pending_commit: Option<oneshot::Sender<Result<HydraCommitTransaction>>>,
    listeners: Arc<Mutex<ListenerSet>>,
    status_tx: watch::Sender<State>,
    loop_tx: mpsc::UnboundedSender<LoopMsg>,
    transport_tx: mpsc::UnboundedSender<TransportEvent>,
}

impl ProviderLoop {
    async fn run(
        mut self,
        mut loop_rx: mpsc::UnboundedReceiver<LoopMsg>,
        mut transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        loop {
            tokio::select! {
                msg = loop_rx.recv() => {
                    match msg {
                        Some(LoopMsg::Shutdown) | None => break,
                        Some(msg) => self.handle_msg(msg),
                    }
                }
                Some(event) = transport_rx.recv() => {
                    self.handle_transport(event);
                }
            }
        }

        // Teardown: close any live socket; pending commit replies are
        // dropped, which callers observe as ClientClosed.
        if let Some(connection) = self.machine.context().connection.clone() {
            connection.close(CLOSE_NORMAL);
        }
        tracing::debug!("provider event loop stopped");
    }

    fn handle_msg(&mut self, msg: LoopMsg) {
        match msg {
            LoopMsg::Connect => {
                let config = self.config.clone();
                self.dispatch(Event::Connect {
                    base_url: config.http_url,
                    ws_url: config.ws_url,
                    address: config.address,
                    snapshot: config.snapshot_utxo,
                    history: config.history,
                });
            }
            LoopMsg::Disconnect => {
                self.dispatch(Event::Disconnect { code: CLOSE_NORMAL });
            }
            LoopMsg::Command(command) => {
                self.dispatch(Event::Command(command));
            }
            LoopMsg::Commit { payload, reply } => {
                let ready = matches!(
                    self.machine.state(),
                    State::Connected(HeadState::Initializing(InitPhase::ReadyToCommit))
                );
                if !ready {
                    let _ = reply.send(Err(HydraError::InvalidState {
                        command: "Commit".into(),
                        state: self.machine.state().to_string(),
                    }));
                    return;
                }
                self.pending_commit = Some(reply);
                self.dispatch(Event::Command(Command::Commit(payload)));
            }
            LoopMsg::ConnectOutcome { epoch, result } => {
                if epoch != self.epoch {
                    // A disconnect raced the dial; drop the fresh socket.
                    if let Ok(connection) = result {
                        connection.close(CLOSE_NORMAL);
                    }
                    return;
                }
                match result {
                    Ok(connection) => self.dispatch(Event::Ready { connection }),
                    Err(reason) => self.dispatch(Event::Error { reason }),
                }
            }
            LoopMsg::CommitOutcome { epoch, result } => {
                if epoch != self.epoch {
                    return;
                }
                let reply = self.pending_commit.take();
                match result {
                    Ok(tx) => {
                        // Stay in Committing until the node's Committed
                        // message confirms the commit on the head.
                        if let Some(reply) = reply {
                            let _ = reply.send(Ok(tx));
                        }
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        if let Some(reply) = reply {
                            let _ = reply.send(Err(e));
                        }
                        self.dispatch(Event::CommitFailed { reason });
                    }
                }
            }
            LoopMsg::Shutdown => unreachable!("handled in run()"),
        }
    }

    fn handle_transport(&mut self, event: TransportEvent) {
        if event.epoch != self.epoch {
            return;
        }
        match event.kind {
            TransportEventKind::Frame(json) => {
                self.notify_listeners(&json);
                match parse_server_message(&json) {
                    Some(message) => self.dispatch(Event::Message(message)),
                    None => {
                        tracing::debug!(
                            tag = json.get("tag").and_then(Json::as_str).unwrap_or("<none>"),
                            "message matched no guard"
                        );
                    }
                }
            }
            TransportEventKind::Error(reason) => {
                self.dispatch(Event::Error { reason });
            }
            TransportEventKind::Closed { code } => {
                self.dispatch(Event::Disconnect {
                    code: code.unwrap_or(1006),
                });
            }
        }
    }

    /// Run one event through the machine and interpret the resulting
    /// actions. Follow-up events raised by actions are processed in order.
    fn dispatch(&mut self, event: Event) {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            // The context is reset by Disconnect, so the handle is captured
            // before the transition.
            let connection = self.machine.context().connection.clone();
            let actions = self.machine.transition(event);
            self.status_tx.send_replace(self.machine.state().clone());

            for action in actions {
                match action {
                    Action::OpenTransport { url } => {
                        self.epoch += 1;
                        let epoch = self.epoch;
                        let loop_tx = self.loop_tx.clone();
                        let transport_tx = self.transport_tx.clone();
                        tokio::spawn(async move {
                            let result = connection::connect(&url, epoch, transport_tx)
                                .await
                                .map_err(|e| e.to_string());
                            let _ = loop_tx.send(LoopMsg::ConnectOutcome { epoch, result });
                        });
                    }
                    Action::SendFrame(command) => match serde_json::to_string(&command) {
                        Ok(text) => {
                            let sent = connection
                                .as_ref()
                                .is_some_and(|c| c.send_text(text));
                            if !sent {
                                queue.push_back(Event::Error {
                                    reason: "Connection is not open".into(),
                                });
                            }
                        }
                        Err(e) => {
                            queue.push_back(Event::Error {
                                reason: e.to_string(),
                            });
                        }
                    },
                    Action::PostCommit { payload } => {
                        let epoch = self.epoch;
                        let http = self.http.clone();
                        let loop_tx = self.loop_tx.clone();
                        tokio::spawn(async move {
                            let result = http.commit(&payload).await;
                            let _ = loop_tx.send(LoopMsg::CommitOutcome { epoch, result });
                        });
                    }
                    Action::CloseTransport { code } => {
                        if let Some(connection) = &connection {
                            connection.close(code);
                        }
                        // Anything still in flight for this connection is
                        // now stale.
                        self.epoch += 1;
                        self.pending_commit = None;
                    }
                }
            }
        }
    }

    fn notify_listeners(&self, json: &Json) {
        let set = self.listeners.lock().expect("listener set poisoned");
        for listener in set.map.values() {
            listener(json);
        }
    }
}
