//! Hydra wire protocol messages.
//!
//! The node speaks JSON over WebSocket, one object per frame, discriminated
//! by a `tag` field. Inbound tags cover the whole head lifecycle plus peer
//! and decommit traffic; outbound frames are the client commands. Fields the
//! node may omit (or that older node versions lack) are defaulted so a frame
//! parses whenever its tag is recognized.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Head lifecycle status as reported in `Greetings.headStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadStatus {
    Idle,
    Initializing,
    Open,
    Closed,
    FanoutPossible,
    Final,
}

/// Transaction envelope used by `NewTx`/`Decommit` and carried in
/// `TxValid`/`TxInvalid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydraTransaction {
    /// Wire transaction type, e.g. "Witnessed Tx ConwayEra".
    #[serde(rename = "type")]
    pub tx_type: String,
    #[serde(default)]
    pub description: String,
    /// Base16-encoded CBOR transaction body.
    pub cbor_hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
}

/// Response body of the HTTP `POST /commit` round trip: a signable
/// transaction locking the requested UTxO set into the head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydraCommitTransaction {
    pub cbor_hex: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tx_id: String,
    #[serde(rename = "type")]
    pub tx_type: String,
}

/// Inbound messages from the Hydra node.
///
/// UTxO sets, party lists, and snapshots stay as raw JSON here; interpreting
/// them is the transaction layer's concern, not the protocol client's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum ServerMessage {
    /// Bootstrap message sent once per connection, describing current status.
    #[serde(rename_all = "camelCase")]
    Greetings {
        head_status: HeadStatus,
        #[serde(default)]
        me: Option<Json>,
        #[serde(default)]
        hydra_head_id: Option<String>,
        #[serde(default)]
        snapshot_utxo: Option<Json>,
        #[serde(default)]
        hydra_node_version: Option<String>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    PeerConnected {
        peer: String,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    PeerDisconnected {
        peer: String,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    PeerHandshakeFailure {
        #[serde(default)]
        remote_host: Option<Json>,
        #[serde(default)]
        our_version: Option<u64>,
        #[serde(default)]
        their_versions: Vec<u64>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    HeadIsInitializing {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        parties: Option<Json>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Committed {
        #[serde(default)]
        parties: Option<Json>,
        #[serde(default)]
        utxo: Option<Json>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    HeadIsOpen {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        utxo: Option<Json>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    HeadIsClosed {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        snapshot_number: Option<u64>,
        /// Instant after which fanout becomes possible.
        #[serde(default)]
        contestation_deadline: Option<String>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    HeadIsContested {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        snapshot_number: Option<u64>,
        #[serde(default)]
        contestation_deadline: Option<String>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ReadyToFanout {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    HeadIsAborted {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        utxo: Option<Json>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    HeadIsFinalized {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        utxo: Option<Json>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TxValid {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        transaction: Option<HydraTransaction>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TxInvalid {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        utxo: Option<Json>,
        #[serde(default)]
        transaction: Option<HydraTransaction>,
        #[serde(default)]
        validation_error: Option<Json>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SnapshotConfirmed {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        snapshot: Option<Json>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    GetUTxOResponse {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        utxo: Option<Json>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    InvalidInput {
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        input: Option<String>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    PostTxOnChainFailed {
        #[serde(default)]
        post_chain_tx: Option<Json>,
        #[serde(default)]
        post_tx_error: Option<Json>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    CommandFailed {
        #[serde(default)]
        client_input: Option<Json>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    IgnoredHeadInitializing {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        contestation_period: Option<u64>,
        #[serde(default)]
        parties: Option<Json>,
        #[serde(default)]
        participants: Option<Json>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    DecommitRequested {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        decommit_tx: Option<HydraTransaction>,
        #[serde(default)]
        utxo_to_decommit: Option<Json>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    DecommitApproved {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        decommit_tx_id: Option<String>,
        #[serde(default)]
        utxo_to_decommit: Option<Json>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    DecommitInvalid {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        decommit_tx: Option<HydraTransaction>,
        #[serde(default)]
        decommit_invalid_reason: Option<Json>,
    },
    #[serde(rename_all = "camelCase")]
    DecommitFinalized {
        #[serde(default)]
        head_id: Option<String>,
        #[serde(default)]
        decommit_tx_id: Option<String>,
        #[serde(default)]
        seq: Option<u64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
}

impl ServerMessage {
    /// The wire `tag` of this message.
    pub fn tag(&self) -> &'static str {
        match self {
            ServerMessage::Greetings { .. } => "Greetings",
            ServerMessage::PeerConnected { .. } => "PeerConnected",
            ServerMessage::PeerDisconnected { .. } => "PeerDisconnected",
            ServerMessage::PeerHandshakeFailure { .. } => "PeerHandshakeFailure",
            ServerMessage::HeadIsInitializing { .. } => "HeadIsInitializing",
            ServerMessage::Committed { .. } => "Committed",
            ServerMessage::HeadIsOpen { .. } => "HeadIsOpen",
            ServerMessage::HeadIsClosed { .. } => "HeadIsClosed",
            ServerMessage::HeadIsContested { .. } => "HeadIsContested",
            ServerMessage::ReadyToFanout { .. } => "ReadyToFanout",
            ServerMessage::HeadIsAborted { .. } => "HeadIsAborted",
            ServerMessage::HeadIsFinalized { .. } => "HeadIsFinalized",
            ServerMessage::TxValid { .. } => "TxValid",
            ServerMessage::TxInvalid { .. } => "TxInvalid",
            ServerMessage::SnapshotConfirmed { .. } => "SnapshotConfirmed",
            ServerMessage::GetUTxOResponse { .. } => "GetUTxOResponse",
            ServerMessage::InvalidInput { .. } => "InvalidInput",
            ServerMessage::PostTxOnChainFailed { .. } => "PostTxOnChainFailed",
            ServerMessage::CommandFailed { .. } => "CommandFailed",
            ServerMessage::IgnoredHeadInitializing { .. } => "IgnoredHeadInitializing",
            ServerMessage::DecommitRequested { .. } => "DecommitRequested",
            ServerMessage::DecommitApproved { .. } => "DecommitApproved",
            ServerMessage::DecommitInvalid { .. } => "DecommitInvalid",
            ServerMessage::DecommitFinalized { .. } => "DecommitFinalized",
        }
    }

    /// The `headStatus` field, present only on `Greetings`.
    pub fn head_status(&self) -> Option<HeadStatus> {
        match self {
            ServerMessage::Greetings { head_status, .. } => Some(*head_status),
            _ => None,
        }
    }
}

/// Parse an inbound frame into a typed message.
///
/// Returns `None` for frames whose tag is not in the known vocabulary (or
/// that are not JSON objects at all); such frames never drive a transition
/// but are still delivered to raw message listeners.
pub fn parse_server_message(raw: &Json) -> Option<ServerMessage> {
    serde_json::from_value(raw.clone()).ok()
}

/// Outbound client commands, serialized as `{"tag": ..., ...fields}`.
///
/// `Commit` is absent by design: committing is an HTTP round trip, not a
/// socket frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum ClientCommand {
    Init,
    Abort,
    Close,
    Contest,
    Fanout,
    NewTx {
        transaction: HydraTransaction,
    },
    #[serde(rename_all = "camelCase")]
    Recover {
        recover_tx_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Decommit {
        decommit_tx: HydraTransaction,
    },
}

impl ClientCommand {
    /// The wire `tag` of this command.
    pub fn tag(&self) -> &'static str {
        match self {
            ClientCommand::Init => "Init",
            ClientCommand::Abort => "Abort",
            ClientCommand::Close => "Close",
            ClientCommand::Contest => "Contest",
            ClientCommand::Fanout => "Fanout",
            ClientCommand::NewTx { .. } => "NewTx",
            ClientCommand::Recover { .. } => "Recover",
            ClientCommand::Decommit { .. } => "Decommit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_frames() {
        let frame = serde_json::to_value(&ClientCommand::Init).unwrap();
        assert_eq!(frame, json!({"tag": "Init"}));

        let frame = serde_json::to_value(&ClientCommand::NewTx {
            transaction: HydraTransaction {
                tx_type: "Witnessed Tx ConwayEra".into(),
                description: "".into(),
                cbor_hex: "84a400".into(),
                tx_id: None,
            },
        })
        .unwrap();
        assert_eq!(frame["tag"], "NewTx");
        assert_eq!(frame["transaction"]["cborHex"], "84a400");
        assert_eq!(frame["transaction"]["type"], "Witnessed Tx ConwayEra");

        let frame = serde_json::to_value(&ClientCommand::Recover {
            recover_tx_id: "abc123".into(),
        })
        .unwrap();
        assert_eq!(frame, json!({"tag": "Recover", "recoverTxId": "abc123"}));
    }

    #[test]
    fn test_parse_greetings() {
        let raw = json!({
            "tag": "Greetings",
            "me": {"vkey": "deadbeef"},
            "headStatus": "Initializing",
            "hydraNodeVersion": "0.19.0",
            "timestamp": "2024-01-01T00:00:00Z"
        });
        let msg = parse_server_message(&raw).unwrap();
        assert_eq!(msg.tag(), "Greetings");
        assert_eq!(msg.head_status(), Some(HeadStatus::Initializing));
    }

    #[test]
    fn test_parse_tag_only_frames() {
        // The machine's guards only need the tag; bare frames must parse.
        for tag in [
            "HeadIsInitializing",
            "HeadIsOpen",
            "HeadIsClosed",
            "HeadIsContested",
            "ReadyToFanout",
            "HeadIsAborted",
            "HeadIsFinalized",
            "Committed",
            "CommandFailed",
            "InvalidInput",
        ] {
            let raw = json!({"tag": tag});
            let msg = parse_server_message(&raw)
                .unwrap_or_else(|| panic!("tag-only {} should parse", tag));
            assert_eq!(msg.tag(), tag);
        }
    }

    #[test]
    fn test_parse_head_is_closed_fields() {
        let raw = json!({
            "tag": "HeadIsClosed",
            "headId": "1",
            "snapshotNumber": 5,
            "contestationDeadline": "2024-01-01T00:10:00Z",
            "seq": 12,
            "timestamp": "2024-01-01T00:00:00Z"
        });
        match parse_server_message(&raw).unwrap() {
            ServerMessage::HeadIsClosed {
                snapshot_number,
                contestation_deadline,
                seq,
                ..
            } => {
                assert_eq!(snapshot_number, Some(5));
                assert_eq!(contestation_deadline.as_deref(), Some("2024-01-01T00:10:00Z"));
                assert_eq!(seq, Some(12));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tag_is_none() {
        let raw = json!({"tag": "SomeFutureMessage", "seq": 1});
        assert!(parse_server_message(&raw).is_none());
        assert!(parse_server_message(&json!("not an object")).is_none());
    }

    #[test]
    fn test_tx_valid_transaction_envelope() {
        let raw = json!({
            "tag": "TxValid",
            "headId": "1",
            "transaction": {
                "type": "Tx ConwayEra",
                "cborHex": "84a100",
                "txId": "ff00"
            }
        });
        match parse_server_message(&raw).unwrap() {
            ServerMessage::TxValid { transaction, .. } => {
                let tx = transaction.unwrap();
                assert_eq!(tx.tx_id.as_deref(), Some("ff00"));
                assert_eq!(tx.cbor_hex, "84a100");
            }
            other => panic!("unexpected message {:?}", other),
        }
    }
}
