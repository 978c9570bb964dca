//! Hydra Head protocol client.
//!
//! Layered bottom-up: [`message`] defines the JSON wire vocabulary,
//! [`machine`] is the pure lifecycle state machine, [`connection`] owns the
//! WebSocket, [`http`] carries the commit side channel, and [`provider`]
//! ties them together behind the caller-facing API.

pub mod connection;
pub mod machine;
pub mod message;

mod error;
mod http;
mod provider;

pub use connection::{ConnectionHandle, OutboundFrame, TransportEvent, TransportEventKind};
pub use error::{HydraError, Result};
pub use http::HttpClient;
pub use machine::{Action, Command, Context, Event, HeadState, HydraMachine, InitPhase, State};
pub use message::{
    ClientCommand, HeadStatus, HydraCommitTransaction, HydraTransaction, ServerMessage,
    parse_server_message,
};
pub use provider::{HydraConfig, HydraProvider, ListenerId};
