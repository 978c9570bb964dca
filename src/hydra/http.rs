//! HTTP side channel to the Hydra node.
//!
//! Most commands ride the WebSocket; committing is the exception, because it
//! must synchronously return a signable transaction bound to the requested
//! UTxO set. The node also serves read-only endpoints used for snapshots.

use serde_json::Value as Json;

use crate::hydra::error::{HydraError, Result};
use crate::hydra::message::HydraCommitTransaction;

/// Thin async client for the node's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client rooted at the node's HTTP base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpClient {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a JSON document from `path`.
    pub async fn get(&self, path: &str) -> Result<Json> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        Self::accept(response).await
    }

    /// POST a JSON `body` to `path`.
    pub async fn post(&self, path: &str, body: &Json) -> Result<Json> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        Self::accept(response).await
    }

    /// POST the commit payload and parse the signable commit transaction.
    pub async fn commit(&self, payload: &Json) -> Result<HydraCommitTransaction> {
        let json = self.post("/commit", payload).await?;
        Ok(serde_json::from_value(json)?)
    }

    /// Fetch the node's view of the confirmed UTxO snapshot.
    pub async fn snapshot_utxo(&self) -> Result<Json> {
        self.get("/snapshot/utxo").await
    }

    /// The node answers 200 or 202; anything else is a rejection whose body
    /// is preserved for the caller.
    async fn accept(response: reqwest::Response) -> Result<Json> {
        let status = response.status();
        if status.as_u16() == 200 || status.as_u16() == 202 {
            Ok(response.json().await?)
        } else {
            Err(HydraError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
