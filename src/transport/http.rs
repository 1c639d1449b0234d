//! reqwest transport
//!
//! Maps reqwest failures onto [`FaultKind`](crate::error::FaultKind):
//! builder errors are setup faults, elapsed deadlines are timeouts, and
//! everything else that prevents a response is "no response".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{CallOutcome, RequestDescriptor, ResponseEnvelope, Transport};
use crate::error::TransportFault;
use crate::json::{ParseOutcome, safe_parse};
use crate::{Error, Result};

/// HTTP transport backed by a pooled [`reqwest::Client`]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the default connection pool settings
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Transport(TransportFault::setup(e.to_string())))?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> CallOutcome {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .timeout(request.timeout);

        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(classify)?;

        debug!(url = %request.url, status = %status, bytes = text.len(), "Response received");

        let body = if text.is_empty() {
            ParseOutcome::Unparsed(text)
        } else {
            safe_parse(&text)
        };

        if status.is_success() {
            Ok(ResponseEnvelope {
                status: status.as_u16(),
                headers,
                body,
            })
        } else {
            Err(TransportFault::error_response(status.as_u16(), body))
        }
    }
}

fn classify(err: reqwest::Error) -> TransportFault {
    if err.is_timeout() {
        TransportFault::timeout(err.to_string())
    } else if err.is_builder() {
        TransportFault::setup(err.to_string())
    } else {
        TransportFault::no_response(err.to_string())
    }
}
