//! Hydra Head client state machine.
//!
//! The machine is deliberately pure: [`HydraMachine::transition`] consumes an
//! event, updates state and context, and returns the side effects to perform
//! as [`Action`] values. Executing them (socket sends, HTTP calls) is the
//! provider's job. This keeps every lifecycle rule synchronously testable.
//!
//! Head-status transitions only ever originate from server messages; the
//! machine self-transitions only across the transport states
//! (Disconnected → Connecting → Connected).

use serde_json::Value as Json;
use std::fmt;

use crate::hydra::connection::ConnectionHandle;
use crate::hydra::message::{ClientCommand, HeadStatus, HydraTransaction, ServerMessage};

/// Top-level machine state.
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    /// No transport; the initial state.
    Disconnected,
    /// Transport is being established.
    Connecting,
    /// Transport is up; the head sub-state tracks the protocol lifecycle.
    Connected(HeadState),
}

/// Head lifecycle sub-states while connected.
#[derive(Debug, Clone, PartialEq)]
pub enum HeadState {
    /// No head in progress.
    Idle,
    /// Head announced, participants committing.
    Initializing(InitPhase),
    /// Head open for transactions.
    Open,
    /// Head closed, contestation window running.
    Closed,
    /// Closed head contested with a newer snapshot.
    Contested,
    /// Contestation over; fanout can be posted.
    FanoutPossible,
    /// Head settled (finalized or aborted). `Init` is accepted again here.
    Final,
}

/// Commit progress within [`HeadState::Initializing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPhase {
    /// A commit request can be issued.
    ReadyToCommit,
    /// Commit HTTP round trip in flight or awaiting `Committed`.
    Committing,
    /// Our commit is confirmed by the node.
    Done,
}

impl State {
    /// Whether the transport is established.
    pub fn is_connected(&self) -> bool {
        matches!(self, State::Connected(_))
    }

    /// The head sub-state, when connected.
    pub fn head_state(&self) -> Option<&HeadState> {
        match self {
            State::Connected(head) => Some(head),
            _ => None,
        }
    }
}

impl fmt::Display for State {
    /// Dotted state paths, e.g. `Connected.Initializing.ReadyToCommit`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Disconnected => write!(f, "Disconnected"),
            State::Connecting => write!(f, "Connection.Connecting"),
            State::Connected(head) => match head {
                HeadState::Idle => write!(f, "Connected.Idle"),
                HeadState::Initializing(phase) => {
                    let phase = match phase {
                        InitPhase::ReadyToCommit => "ReadyToCommit",
                        InitPhase::Committing => "Committing",
                        InitPhase::Done => "Done",
                    };
                    write!(f, "Connected.Initializing.{}", phase)
                }
                HeadState::Open => write!(f, "Connected.Open"),
                HeadState::Closed => write!(f, "Connected.Closed"),
                HeadState::Contested => write!(f, "Connected.Contested"),
                HeadState::FanoutPossible => write!(f, "Connected.FanoutPossible"),
                HeadState::Final => write!(f, "Connected.Final"),
            },
        }
    }
}

/// Mutable context owned by the machine.
///
/// Exactly one connection context is live per machine; `Disconnect` resets
/// every field to its initial value.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// HTTP base URL of the node, as given to `Connect`.
    pub base_url: String,
    /// Derived WebSocket URL including query parameters.
    pub head_url: String,
    /// Outbound handle to the transport actor, set once the socket is open.
    pub connection: Option<ConnectionHandle>,
    /// Last transport or commit error, recorded without forcing a transition.
    pub error: Option<String>,
    /// In-flight commit payload; kept on failure so the request is retryable.
    pub request: Option<Json>,
}

/// Imperative commands issued by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Init,
    Abort,
    Close,
    Contest,
    Fanout,
    NewTx(HydraTransaction),
    /// UTxO set to commit; goes over HTTP, not the socket.
    Commit(Json),
    Recover { recover_tx_id: String },
    Decommit(HydraTransaction),
}

/// Events consumed by the machine.
#[derive(Debug, Clone)]
pub enum Event {
    /// Establish a connection to a node.
    Connect {
        base_url: String,
        /// Explicit WebSocket URL, replacing the scheme-substituted base.
        ws_url: Option<String>,
        /// Restrict server-sent history to this address.
        address: Option<String>,
        /// Ask for the UTxO snapshot in `Greetings`.
        snapshot: bool,
        /// Ask for message history replay.
        history: bool,
    },
    /// Transport reports the socket is open.
    Ready { connection: ConnectionHandle },
    /// Inbound protocol message.
    Message(ServerMessage),
    /// Transport or commit error; recorded, never fatal.
    Error { reason: String },
    /// Transport closed (server- or client-initiated).
    Disconnect { code: u16 },
    /// Caller command.
    Command(Command),
    /// The commit HTTP round trip failed; re-arms `ReadyToCommit`.
    CommitFailed { reason: String },
}

/// Side effects requested by a transition, executed by the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Open the WebSocket transport at the given URL.
    OpenTransport { url: String },
    /// Serialize and send a command frame over the socket.
    SendFrame(ClientCommand),
    /// POST the payload to the node's `/commit` endpoint.
    PostCommit { payload: Json },
    /// Close the socket gracefully.
    CloseTransport { code: u16 },
}

/// Normal-closure WebSocket code used for graceful disconnects.
pub const CLOSE_NORMAL: u16 = 1000;

// Guards over inbound messages, in the same shape as the reference protocol:
// the `Greetings` bootstrap and the steady-state tag are matched uniformly,
// so a client reconnecting mid-lifecycle synchronizes without a catch-up
// path.

fn is_initializing(msg: &ServerMessage) -> bool {
    match msg {
        ServerMessage::Greetings { head_status, .. } => *head_status == HeadStatus::Initializing,
        _ => msg.tag() == "HeadIsInitializing",
    }
}

fn is_open(msg: &ServerMessage) -> bool {
    match msg {
        ServerMessage::Greetings { head_status, .. } => *head_status == HeadStatus::Open,
        _ => msg.tag() == "HeadIsOpen",
    }
}

fn is_closed(msg: &ServerMessage) -> bool {
    match msg {
        ServerMessage::Greetings { head_status, .. } => *head_status == HeadStatus::Closed,
        _ => msg.tag() == "HeadIsClosed",
    }
}

fn is_ready_to_fanout(msg: &ServerMessage) -> bool {
    match msg {
        ServerMessage::Greetings { head_status, .. } => *head_status == HeadStatus::FanoutPossible,
        _ => msg.tag() == "ReadyToFanout",
    }
}

fn is_aborted(msg: &ServerMessage) -> bool {
    msg.tag() == "HeadIsAborted"
}

fn is_committed(msg: &ServerMessage) -> bool {
    msg.tag() == "Committed"
}

fn is_contested(msg: &ServerMessage) -> bool {
    msg.tag() == "HeadIsContested"
}

fn is_finalized(msg: &ServerMessage) -> bool {
    msg.tag() == "HeadIsFinalized"
}

/// Build the head WebSocket URL from the connect parameters.
///
/// `http(s)` becomes `ws(s)` by substituting the first `http`, then the
/// history / snapshot-utxo flags and optional address are appended.
fn build_head_url(
    base_url: &str,
    ws_url: Option<&str>,
    history: bool,
    snapshot: bool,
    address: Option<&str>,
) -> String {
    let ws = match ws_url {
        Some(url) => url.to_string(),
        None => base_url.replacen("http", "ws", 1),
    };
    let history = if history { "yes" } else { "no" };
    let snapshot = if snapshot { "yes" } else { "no" };
    let address = address
        .map(|a| format!("&address={}", a))
        .unwrap_or_default();
    format!(
        "{}/?history={}&snapshot-utxo={}{}",
        ws, history, snapshot, address
    )
}

/// The Hydra Head client state machine.
#[derive(Debug, Clone, Default)]
pub struct HydraMachine {
    state: State,
    context: Context,
}

impl Default for State {
    fn default() -> Self {
        State::Disconnected
    }
}

impl HydraMachine {
    /// A machine in the initial `Disconnected` state with empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Current context.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Apply one event, returning the side effects to perform.
    ///
    /// Events that are not meaningful in the current state are ignored, as
    /// are messages matching no guard: the machine never fails on inbound
    /// traffic.
    pub fn transition(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::Connect {
                base_url,
                ws_url,
                address,
                snapshot,
                history,
            } => {
                if self.state != State::Disconnected {
                    return vec![];
                }
                let head_url = build_head_url(
                    &base_url,
                    ws_url.as_deref(),
                    history,
                    snapshot,
                    address.as_deref(),
                );
                self.context.base_url = base_url;
                self.context.head_url = head_url.clone();
                self.state = State::Connecting;
                vec![Action::OpenTransport { url: head_url }]
            }

            Event::Ready { connection } => {
                if self.state != State::Connecting {
                    return vec![];
                }
                self.context.connection = Some(connection);
                self.state = State::Connected(HeadState::Idle);
                vec![]
            }

            Event::Message(msg) => self.on_message(&msg),

            Event::Error { reason } => {
                self.context.error = Some(reason);
                // A failure while connecting loses the transport entirely.
                if self.state == State::Connecting {
                    self.state = State::Disconnected;
                }
                vec![]
            }

            Event::Disconnect { .. } => {
                if self.state == State::Disconnected {
                    return vec![];
                }
                self.state = State::Disconnected;
                self.context = Context::default();
                vec![Action::CloseTransport { code: CLOSE_NORMAL }]
            }

            Event::Command(command) => self.on_command(command),

            Event::CommitFailed { reason } => {
                if let State::Connected(HeadState::Initializing(InitPhase::Committing)) =
                    self.state
                {
                    // Request stays in context: the same payload is
                    // re-submittable once back in ReadyToCommit.
                    self.context.error = Some(reason);
                    self.state =
                        State::Connected(HeadState::Initializing(InitPhase::ReadyToCommit));
                }
                vec![]
            }
        }
    }

    /// Guard cascade for inbound messages.
    ///
    /// The system-wide guards run first in documented priority order, then
    /// the guards specific to the current sub-state. First match wins.
    fn on_message(&mut self, msg: &ServerMessage) -> Vec<Action> {
        let State::Connected(head) = self.state.clone() else {
            return vec![];
        };

        if is_initializing(msg) {
            self.state = State::Connected(HeadState::Initializing(InitPhase::ReadyToCommit));
            return vec![];
        }
        if is_open(msg) {
            self.state = State::Connected(HeadState::Open);
            return vec![];
        }
        if is_closed(msg) {
            self.state = State::Connected(HeadState::Closed);
            return vec![];
        }
        if is_ready_to_fanout(msg) {
            self.state = State::Connected(HeadState::FanoutPossible);
            return vec![];
        }

        match head {
            HeadState::Initializing(phase) => {
                if is_aborted(msg) {
                    self.state = State::Connected(HeadState::Final);
                } else if phase == InitPhase::Committing && is_committed(msg) {
                    self.context.request = None;
                    self.state = State::Connected(HeadState::Initializing(InitPhase::Done));
                }
            }
            HeadState::Closed => {
                if is_contested(msg) {
                    self.state = State::Connected(HeadState::Contested);
                }
            }
            HeadState::FanoutPossible => {
                if is_finalized(msg) {
                    self.state = State::Connected(HeadState::Final);
                }
            }
            _ => {}
        }
        vec![]
    }

    /// Commands valid per sub-state; everything else is dropped.
    fn on_command(&mut self, command: Command) -> Vec<Action> {
        let State::Connected(head) = self.state.clone() else {
            return vec![];
        };

        match (head, command) {
            (HeadState::Idle | HeadState::Final, Command::Init) => {
                vec![Action::SendFrame(ClientCommand::Init)]
            }
            (HeadState::Initializing(_), Command::Abort) => {
                vec![Action::SendFrame(ClientCommand::Abort)]
            }
            (HeadState::Initializing(InitPhase::ReadyToCommit), Command::Commit(payload)) => {
                self.context.request = Some(payload.clone());
                self.state = State::Connected(HeadState::Initializing(InitPhase::Committing));
                vec![Action::PostCommit { payload }]
            }
            (HeadState::Open, Command::Close) => {
                vec![Action::SendFrame(ClientCommand::Close)]
            }
            (HeadState::Open, Command::NewTx(transaction)) => {
                // Fire and forget: success or failure arrives later as
                // TxValid / TxInvalid / CommandFailed messages.
                vec![Action::SendFrame(ClientCommand::NewTx { transaction })]
            }
            (HeadState::Open, Command::Decommit(decommit_tx)) => {
                vec![Action::SendFrame(ClientCommand::Decommit { decommit_tx })]
            }
            (HeadState::Open, Command::Recover { recover_tx_id }) => {
                vec![Action::SendFrame(ClientCommand::Recover { recover_tx_id })]
            }
            (HeadState::Closed, Command::Contest) => {
                vec![Action::SendFrame(ClientCommand::Contest)]
            }
            (HeadState::FanoutPossible, Command::Fanout) => {
                vec![Action::SendFrame(ClientCommand::Fanout)]
            }
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydra::message::parse_server_message;
    use serde_json::json;

    fn msg(raw: serde_json::Value) -> Event {
        Event::Message(parse_server_message(&raw).expect("known tag"))
    }

    fn connect(machine: &mut HydraMachine) -> Vec<Action> {
        machine.transition(Event::Connect {
            base_url: "http://localhost:4001".into(),
            ws_url: None,
            address: None,
            snapshot: false,
            history: false,
        })
    }

    fn ready(machine: &mut HydraMachine) {
        let (connection, _rx) = ConnectionHandle::channel();
        machine.transition(Event::Ready { connection });
    }

    fn open_machine() -> HydraMachine {
        let mut machine = HydraMachine::new();
        connect(&mut machine);
        ready(&mut machine);
        machine.transition(msg(json!({"tag": "Greetings", "headStatus": "Open"})));
        machine
    }

    #[test]
    fn test_connect_builds_head_url() {
        let mut machine = HydraMachine::new();
        let actions = machine.transition(Event::Connect {
            base_url: "http://localhost:4001".into(),
            ws_url: None,
            address: Some("addr_test1xyz".into()),
            snapshot: true,
            history: false,
        });
        assert_eq!(machine.state().to_string(), "Connection.Connecting");
        assert_eq!(
            actions,
            vec![Action::OpenTransport {
                url: "ws://localhost:4001/?history=no&snapshot-utxo=yes&address=addr_test1xyz"
                    .into()
            }]
        );
        assert_eq!(machine.context().base_url, "http://localhost:4001");
    }

    #[test]
    fn test_https_becomes_wss() {
        let url = build_head_url("https://node.example:4001", None, true, false, None);
        assert_eq!(
            url,
            "wss://node.example:4001/?history=yes&snapshot-utxo=no"
        );
    }

    #[test]
    fn test_explicit_ws_url_override() {
        let url = build_head_url(
            "http://node.example:4001",
            Some("ws://other:9000"),
            false,
            false,
            None,
        );
        assert_eq!(url, "ws://other:9000/?history=no&snapshot-utxo=no");
    }

    #[test]
    fn test_ready_reaches_idle() {
        let mut machine = HydraMachine::new();
        connect(&mut machine);
        ready(&mut machine);
        assert_eq!(machine.state().to_string(), "Connected.Idle");
        assert!(machine.context().connection.is_some());
    }

    #[test]
    fn test_error_while_connecting_falls_back() {
        let mut machine = HydraMachine::new();
        connect(&mut machine);
        machine.transition(Event::Error {
            reason: "connection refused".into(),
        });
        assert_eq!(*machine.state(), State::Disconnected);
        assert_eq!(
            machine.context().error.as_deref(),
            Some("connection refused")
        );
    }

    #[test]
    fn test_greetings_synchronizes_status() {
        // Reconnecting clients synchronize from Greetings alone.
        let mut machine = HydraMachine::new();
        connect(&mut machine);
        ready(&mut machine);
        machine.transition(msg(json!({"tag": "Greetings", "headStatus": "FanoutPossible"})));
        assert_eq!(
            *machine.state(),
            State::Connected(HeadState::FanoutPossible)
        );
    }

    #[test]
    fn test_guard_priority_order() {
        // Guards are evaluated top to bottom; the first match wins, so a
        // sequence of status messages always lands on the last one applied.
        let sequences: &[(&[&str], HeadState)] = &[
            (&["HeadIsInitializing"], HeadState::Initializing(InitPhase::ReadyToCommit)),
            (&["HeadIsInitializing", "HeadIsOpen"], HeadState::Open),
            (&["HeadIsOpen", "HeadIsClosed"], HeadState::Closed),
            (
                &["HeadIsOpen", "HeadIsClosed", "ReadyToFanout"],
                HeadState::FanoutPossible,
            ),
        ];
        for (tags, expected) in sequences {
            let mut machine = HydraMachine::new();
            connect(&mut machine);
            ready(&mut machine);
            for tag in *tags {
                machine.transition(msg(json!({"tag": tag})));
            }
            assert_eq!(*machine.state(), State::Connected(expected.clone()));
        }
    }

    #[test]
    fn test_init_only_sends_frame() {
        let mut machine = HydraMachine::new();
        connect(&mut machine);
        ready(&mut machine);
        let actions = machine.transition(Event::Command(Command::Init));
        assert_eq!(actions, vec![Action::SendFrame(ClientCommand::Init)]);
        // No local transition: the server confirms with HeadIsInitializing.
        assert_eq!(*machine.state(), State::Connected(HeadState::Idle));

        machine.transition(msg(json!({"tag": "HeadIsInitializing"})));
        assert_eq!(
            *machine.state(),
            State::Connected(HeadState::Initializing(InitPhase::ReadyToCommit))
        );
    }

    #[test]
    fn test_commit_retry_keeps_request() {
        let mut machine = HydraMachine::new();
        connect(&mut machine);
        ready(&mut machine);
        machine.transition(msg(json!({"tag": "HeadIsInitializing"})));

        let payload = json!({"utxo": {}});
        let actions = machine.transition(Event::Command(Command::Commit(payload.clone())));
        assert_eq!(
            actions,
            vec![Action::PostCommit {
                payload: payload.clone()
            }]
        );
        assert_eq!(
            machine.state().to_string(),
            "Connected.Initializing.Committing"
        );

        // HTTP failure: back to ReadyToCommit, request NOT cleared.
        machine.transition(Event::CommitFailed {
            reason: "503".into(),
        });
        assert_eq!(
            machine.state().to_string(),
            "Connected.Initializing.ReadyToCommit"
        );
        assert_eq!(machine.context().request, Some(payload.clone()));

        // Resubmit the same payload, then the node confirms.
        machine.transition(Event::Command(Command::Commit(payload)));
        machine.transition(msg(json!({"tag": "Committed"})));
        assert_eq!(machine.state().to_string(), "Connected.Initializing.Done");
        assert_eq!(machine.context().request, None);
    }

    #[test]
    fn test_committed_ignored_outside_committing() {
        let mut machine = HydraMachine::new();
        connect(&mut machine);
        ready(&mut machine);
        machine.transition(msg(json!({"tag": "HeadIsInitializing"})));
        // Another participant's commit confirmation while we are not
        // committing must not move us to Done.
        machine.transition(msg(json!({"tag": "Committed"})));
        assert_eq!(
            machine.state().to_string(),
            "Connected.Initializing.ReadyToCommit"
        );
    }

    #[test]
    fn test_abort_reaches_final_and_reinit() {
        let mut machine = HydraMachine::new();
        connect(&mut machine);
        ready(&mut machine);
        machine.transition(msg(json!({"tag": "HeadIsInitializing"})));

        let actions = machine.transition(Event::Command(Command::Abort));
        assert_eq!(actions, vec![Action::SendFrame(ClientCommand::Abort)]);
        machine.transition(msg(json!({"tag": "HeadIsAborted"})));
        assert_eq!(*machine.state(), State::Connected(HeadState::Final));

        // A settled head can be initialized again.
        let actions = machine.transition(Event::Command(Command::Init));
        assert_eq!(actions, vec![Action::SendFrame(ClientCommand::Init)]);
        machine.transition(msg(json!({"tag": "HeadIsInitializing"})));
        assert_eq!(
            *machine.state(),
            State::Connected(HeadState::Initializing(InitPhase::ReadyToCommit))
        );
    }

    #[test]
    fn test_open_close_contest_fanout_cycle() {
        let mut machine = open_machine();
        assert_eq!(*machine.state(), State::Connected(HeadState::Open));

        let tx = HydraTransaction {
            tx_type: "Tx ConwayEra".into(),
            description: "".into(),
            cbor_hex: "84a100".into(),
            tx_id: None,
        };
        let actions = machine.transition(Event::Command(Command::NewTx(tx.clone())));
        assert_eq!(
            actions,
            vec![Action::SendFrame(ClientCommand::NewTx { transaction: tx })]
        );
        // NewTx never changes state.
        assert_eq!(*machine.state(), State::Connected(HeadState::Open));

        let actions = machine.transition(Event::Command(Command::Close));
        assert_eq!(actions, vec![Action::SendFrame(ClientCommand::Close)]);
        machine.transition(msg(json!({"tag": "HeadIsClosed"})));
        assert_eq!(*machine.state(), State::Connected(HeadState::Closed));

        let actions = machine.transition(Event::Command(Command::Contest));
        assert_eq!(actions, vec![Action::SendFrame(ClientCommand::Contest)]);
        machine.transition(msg(json!({"tag": "HeadIsContested"})));
        assert_eq!(*machine.state(), State::Connected(HeadState::Contested));
    }

    #[test]
    fn test_fanout_to_final() {
        let mut machine = open_machine();
        machine.transition(msg(json!({"tag": "HeadIsClosed"})));
        machine.transition(msg(json!({"tag": "ReadyToFanout"})));
        assert_eq!(
            *machine.state(),
            State::Connected(HeadState::FanoutPossible)
        );

        let actions = machine.transition(Event::Command(Command::Fanout));
        assert_eq!(actions, vec![Action::SendFrame(ClientCommand::Fanout)]);
        machine.transition(msg(json!({"tag": "HeadIsFinalized"})));
        assert_eq!(*machine.state(), State::Connected(HeadState::Final));
    }

    #[test]
    fn test_disconnect_resets_everything() {
        let mut machine = open_machine();
        machine.transition(Event::Error {
            reason: "blip".into(),
        });

        let actions = machine.transition(Event::Disconnect { code: 1006 });
        assert_eq!(actions, vec![Action::CloseTransport { code: CLOSE_NORMAL }]);
        assert_eq!(*machine.state(), State::Disconnected);
        assert_eq!(machine.context().base_url, "");
        assert_eq!(machine.context().head_url, "");
        assert!(machine.context().connection.is_none());
        assert!(machine.context().error.is_none());
        assert!(machine.context().request.is_none());
    }

    #[test]
    fn test_error_recorded_without_transition() {
        let mut machine = open_machine();
        machine.transition(Event::Error {
            reason: "socket hiccup".into(),
        });
        assert_eq!(*machine.state(), State::Connected(HeadState::Open));
        assert_eq!(machine.context().error.as_deref(), Some("socket hiccup"));
    }

    #[test]
    fn test_protocol_errors_match_no_guard() {
        let mut machine = open_machine();
        for raw in [
            json!({"tag": "CommandFailed", "clientInput": {"tag": "Close"}}),
            json!({"tag": "InvalidInput", "reason": "parse", "input": "{"}),
            json!({"tag": "PostTxOnChainFailed"}),
            json!({"tag": "TxInvalid"}),
            json!({"tag": "SnapshotConfirmed"}),
            json!({"tag": "Greetings", "headStatus": "Idle"}),
        ] {
            machine.transition(msg(raw));
            assert_eq!(*machine.state(), State::Connected(HeadState::Open));
        }
    }

    #[test]
    fn test_commands_in_wrong_state_are_dropped() {
        let mut machine = HydraMachine::new();
        connect(&mut machine);
        ready(&mut machine);
        // Idle accepts only Init.
        assert!(machine.transition(Event::Command(Command::Close)).is_empty());
        assert!(machine.transition(Event::Command(Command::Fanout)).is_empty());
        assert!(
            machine
                .transition(Event::Command(Command::Commit(json!({}))))
                .is_empty()
        );
        assert_eq!(*machine.state(), State::Connected(HeadState::Idle));
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut machine = HydraMachine::new();
        let actions = connect(&mut machine);
        assert_eq!(machine.state().to_string(), "Connection.Connecting");
        assert!(matches!(actions[0], Action::OpenTransport { .. }));

        ready(&mut machine);
        assert_eq!(machine.state().to_string(), "Connected.Idle");

        machine.transition(msg(json!({"tag": "Greetings", "headStatus": "Open"})));
        assert_eq!(machine.state().to_string(), "Connected.Open");

        let actions = machine.transition(Event::Command(Command::Close));
        assert_eq!(actions, vec![Action::SendFrame(ClientCommand::Close)]);

        machine.transition(msg(json!({"tag": "HeadIsClosed", "snapshotNumber": 1})));
        assert_eq!(machine.state().to_string(), "Connected.Closed");
    }
}
