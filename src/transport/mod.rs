//! HTTP transport seam
//!
//! The request pipeline only talks to a [`Transport`]; [`HttpTransport`] is
//! the reqwest-backed implementation used in production.

mod http;

pub use self::http::HttpTransport;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::error::TransportFault;
use crate::json::ParseOutcome;

/// A fully built outbound request. Transports only ever see it by reference.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// Absolute URL (base joined with the relative target)
    pub url: Url,
    /// HTTP method
    pub method: Method,
    /// Request headers
    pub headers: HeaderMap,
    /// JSON body, if any
    pub body: Option<Value>,
    /// Per-call timeout, enforced by the transport
    pub timeout: Duration,
}

/// A 2xx response
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    /// HTTP status
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Body, parsed as JSON when possible
    pub body: ParseOutcome,
}

impl ResponseEnvelope {
    /// Deserialize a JSON body into `T`
    #[must_use]
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        self.body.decode()
    }
}

/// Outcome of one dispatched call
pub type CallOutcome = std::result::Result<ResponseEnvelope, TransportFault>;

/// Performs the network I/O for a [`RequestDescriptor`]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request once. Non-2xx answers are
    /// [`FaultKind::ErrorResponse`](crate::error::FaultKind::ErrorResponse) faults.
    async fn send(&self, request: &RequestDescriptor) -> CallOutcome;
}
