//! Peer transport
//!
//! Outbound calls to other nodes go through [`PeerTransport`] so the
//! directory and the dispatcher can be exercised without sockets.

use async_trait::async_trait;
use reqwest::Client;
use shared::replication::{PingResponse, SyncRequest, SyncResponse};
use std::time::Duration;
use thiserror::Error;

use crate::core::Config;

/// Failure of one outbound call
///
/// A timeout is reported like any other transport failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("peer answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether the peer answered at all
    pub fn peer_responded(&self) -> bool {
        matches!(self, Self::Status { .. } | Self::Decode(_))
    }
}

#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// `GET {peer}/api/health/ping`, bounded by the probe timeout
    async fn ping(&self, peer: &str) -> Result<PingResponse, TransportError>;

    /// `POST {peer}/api/replication/sync`, bounded by the replication timeout
    async fn push(&self, peer: &str, batch: &SyncRequest) -> Result<SyncResponse, TransportError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    probe_timeout: Duration,
    replication_timeout: Duration,
}

impl HttpTransport {
    pub fn new(probe_timeout: Duration, replication_timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(probe_timeout.min(replication_timeout))
            .build()?;
        Ok(Self {
            client,
            probe_timeout,
            replication_timeout,
        })
    }

    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        Self::new(config.probe_timeout(), config.replication_timeout())
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response.json::<T>().await.map_err(map_reqwest_error)
    }
}

fn endpoint(peer: &str, path: &str) -> String {
    format!("{}{}", peer.trim_end_matches('/'), path)
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else {
        TransportError::Connect(err.to_string())
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn ping(&self, peer: &str) -> Result<PingResponse, TransportError> {
        let response = self
            .client
            .get(endpoint(peer, "/api/health/ping"))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::decode(response).await
    }

    async fn push(&self, peer: &str, batch: &SyncRequest) -> Result<SyncResponse, TransportError> {
        let response = self
            .client
            .post(endpoint(peer, "/api/replication/sync"))
            .timeout(self.replication_timeout)
            .json(batch)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::decode(response).await
    }
}
