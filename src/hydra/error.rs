//! Error types for the Hydra client.

use thiserror::Error;

/// Result type alias for Hydra client operations.
pub type Result<T> = std::result::Result<T, HydraError>;

/// Errors surfaced to callers of the Hydra client.
///
/// Transport hiccups and protocol-level rejections are not errors in this
/// sense: they are recorded in the machine context and delivered as messages,
/// because they are expected, recoverable conditions on a long-lived
/// connection. `HydraError` is reserved for operations with a direct caller
/// (connecting, committing, sending on a dead socket).
#[derive(Error, Debug)]
pub enum HydraError {
    /// A command was issued without an established connection.
    #[error("Not connected to a Hydra node")]
    NotConnected,

    /// A command was issued in a state that does not accept it.
    #[error("Command {command} is not valid in state {state}")]
    InvalidState { command: String, state: String },

    /// WebSocket transport failure.
    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// The node's HTTP side channel rejected a request.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The HTTP request itself failed (connection, TLS, timeout).
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// A payload could not be serialized or a response could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The client was torn down while the operation was in flight.
    #[error("Hydra client closed")]
    ClientClosed,
}
