//! hydra-client - Hydra Head protocol client and streaming CBOR decoder.
//!
//! Client tooling for Cardano's Layer-2 Hydra Heads, plus the binary
//! plumbing needed to inspect on-chain payloads.
//!
//! # Features
//!
//! - Full head lifecycle over a single WebSocket connection:
//!   Init → Commit → Open → Close → Contest → Fanout
//! - Pure, synchronously testable state machine; all side effects
//!   interpreted by the provider's event loop
//! - Commit over the node's HTTP side channel, retryable on failure
//! - Message listeners receiving every inbound frame, known tag or not
//! - Observable connection/head status via a watch channel
//! - Incremental CBOR decoding with byte-span provenance on every node,
//!   suitable for UTxO datums and script references
//!
//! # Quick start
//!
//! ```no_run
//! use hydra_client::hydra::{HydraConfig, HydraProvider};
//!
//! # async fn example() -> Result<(), hydra_client::hydra::HydraError> {
//! let provider = HydraProvider::new(HydraConfig::new("http://localhost:4001"));
//! provider.connect()?;
//!
//! let mut status = provider.status();
//! status.wait_for(|state| state.is_connected()).await.ok();
//! provider.init()?;
//! # Ok(())
//! # }
//! ```
//!
//! Decoding CBOR:
//!
//! ```
//! use hydra_client::cbor::decode;
//!
//! let value = decode(&hex::decode("83010203").unwrap()).unwrap();
//! assert_eq!(value.as_array().unwrap().len(), 3);
//! ```

pub mod cbor;
pub mod hydra;

pub use cbor::{DecodeError, Decoder, Value, decode};
pub use hydra::{HydraConfig, HydraError, HydraProvider};
