//! Upstream search transport
//!
//! [`SearchTransport`] is the seam between the dispatcher and the network;
//! [`HttpTransport`] is the reqwest-backed production implementation.
//! No retry, no backoff: one attempt per request.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::request::RequestDescriptor;

const USER_AGENT: &str = concat!("halexp-tester/", env!("CARGO_PKG_VERSION"));

/// Transport errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Response body is not JSON: {0}")]
    Decode(String),
}

/// Issues one search request and returns the decoded JSON body
#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Value, TransportError>;
}

/// HTTP transport over a shared reqwest client
#[derive(Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport; `timeout` of `None` leaves requests unbounded
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Value, TransportError> {
        tracing::debug!(url = %request.url, "Querying search instance");

        let response = self
            .http_client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TransportError::Status(status.as_u16(), error_text));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}
