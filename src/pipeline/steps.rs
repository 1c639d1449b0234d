//! Request and response steps
//!
//! A step receives the in-flight descriptor (or the call outcome) and hands
//! back a possibly modified one. The pipeline applies steps strictly in the
//! order they were registered; nothing is registered globally.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use super::{CallInfo, CallState};
use crate::error::TransportFault;
use crate::json::ParseOutcome;
use crate::storage::KeyValueStore;
use crate::transport::{CallOutcome, RequestDescriptor};

/// Store key holding the bearer credential
pub const CREDENTIAL_KEY: &str = "auth";

/// Header carrying the per-call trace id
pub const TRACE_HEADER: &str = "x-trace-id";

/// Runs before dispatch
pub trait RequestStep: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Transform the descriptor. An error aborts the call as a setup fault.
    fn apply(&self, request: RequestDescriptor) -> Result<RequestDescriptor, TransportFault>;
}

/// Runs after the transport settles, on success and on failure alike
pub trait ResponseStep: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Transform the outcome
    fn apply(&self, call: &CallInfo, outcome: CallOutcome) -> CallOutcome;
}

/// Generate a trace id: `"wk-<uuid-v4>"`
#[must_use]
pub fn generate_trace_id() -> String {
    format!("wk-{}", Uuid::new_v4())
}

/// Sets `X-Trace-Id` unless the caller already supplied one
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceIdStep;

impl RequestStep for TraceIdStep {
    fn name(&self) -> &'static str {
        "trace-id"
    }

    fn apply(&self, mut request: RequestDescriptor) -> Result<RequestDescriptor, TransportFault> {
        if !request.headers.contains_key(TRACE_HEADER) {
            let value = HeaderValue::from_str(&generate_trace_id())
                .map_err(|e| TransportFault::setup(format!("Invalid trace id: {e}")))?;
            request.headers.insert(HeaderName::from_static(TRACE_HEADER), value);
        }
        Ok(request)
    }
}

/// Attaches `Authorization: Bearer <credential>` when the store holds one.
///
/// An absent or empty credential leaves the header out entirely.
/// The credential itself is never logged.
pub struct BearerCredentialStep {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl BearerCredentialStep {
    /// Read the credential from [`CREDENTIAL_KEY`]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, CREDENTIAL_KEY)
    }

    /// Read the credential from a custom key
    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    fn credential(&self) -> Option<String> {
        let text = match self.store.get(&self.key)? {
            ParseOutcome::Unparsed(raw) | ParseOutcome::Parsed(Value::String(raw)) => raw,
            ParseOutcome::Parsed(Value::Null) => return None,
            ParseOutcome::Parsed(other) => other.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }
}

impl RequestStep for BearerCredentialStep {
    fn name(&self) -> &'static str {
        "bearer-credential"
    }

    fn apply(&self, mut request: RequestDescriptor) -> Result<RequestDescriptor, TransportFault> {
        if let Some(token) = self.credential() {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                TransportFault::setup("Stored credential is not a valid header value")
            })?;
            value.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, value);
        }
        Ok(request)
    }
}

/// Logs the outbound call
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRequestStep;

impl RequestStep for LogRequestStep {
    fn name(&self) -> &'static str {
        "log-request"
    }

    fn apply(&self, request: RequestDescriptor) -> Result<RequestDescriptor, TransportFault> {
        let trace_id = request
            .headers
            .get(TRACE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        info!(
            state = %CallState::Building,
            trace_id = %trace_id,
            method = %request.method,
            url = %request.url,
            "Dispatching request"
        );
        Ok(request)
    }
}

/// Logs the settled call; failures at `error` level with their classification
#[derive(Debug, Default, Clone, Copy)]
pub struct LogResponseStep;

impl ResponseStep for LogResponseStep {
    fn name(&self) -> &'static str {
        "log-response"
    }

    fn apply(&self, call: &CallInfo, outcome: CallOutcome) -> CallOutcome {
        let trace_id = call.trace_id.as_deref().unwrap_or("-");
        match &outcome {
            Ok(response) => info!(
                state = %CallState::Succeeded,
                trace_id = %trace_id,
                status = response.status,
                method = %call.method,
                url = %call.url,
                "Request succeeded"
            ),
            Err(fault) => error!(
                state = %CallState::Failed,
                trace_id = %trace_id,
                kind = %fault.kind,
                status = ?fault.status,
                method = %call.method,
                url = %call.url,
                error = %fault.message,
                "Request failed"
            ),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use reqwest::Method;
    use reqwest::header::HeaderMap;
    use std::time::Duration;

    fn descriptor() -> RequestDescriptor {
        RequestDescriptor {
            url: "http://localhost/api/v1/users".parse().unwrap(),
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn bearer_step_sets_header_from_store() {
        let store = Arc::new(Store::session());
        store.set(CREDENTIAL_KEY, "tok-123");
        let step = BearerCredentialStep::new(store);

        let request = step.apply(descriptor()).unwrap();
        let header = request.headers.get(AUTHORIZATION).unwrap();
        assert_eq!(header.to_str().unwrap(), "Bearer tok-123");
        assert!(header.is_sensitive());
    }

    #[test]
    fn bearer_step_omits_header_without_credential() {
        let step = BearerCredentialStep::new(Arc::new(Store::session()));
        let request = step.apply(descriptor()).unwrap();
        assert!(!request.headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn bearer_step_treats_empty_credential_as_absent() {
        let store = Arc::new(Store::session());
        store.set(CREDENTIAL_KEY, "");
        let request = BearerCredentialStep::new(store).apply(descriptor()).unwrap();
        assert!(!request.headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn bearer_step_uses_json_encoded_credentials_verbatim() {
        let store = Arc::new(Store::session());
        store.set_value(CREDENTIAL_KEY, &12345);
        let request = BearerCredentialStep::new(store.clone()).apply(descriptor()).unwrap();
        assert_eq!(request.headers[AUTHORIZATION], "Bearer 12345");

        store.set(CREDENTIAL_KEY, r#""quoted-token""#);
        let request = BearerCredentialStep::new(store).apply(descriptor()).unwrap();
        assert_eq!(request.headers[AUTHORIZATION], "Bearer quoted-token");
    }

    #[test]
    fn bearer_step_rejects_unprintable_credential() {
        let store = Arc::new(Store::session());
        store.set(CREDENTIAL_KEY, "line\nbreak");
        let fault = BearerCredentialStep::new(store).apply(descriptor()).unwrap_err();
        assert_eq!(fault.kind, crate::error::FaultKind::Setup);
        assert!(!fault.message.contains("line"));
    }

    #[test]
    fn trace_step_generates_or_keeps_id() {
        let request = TraceIdStep.apply(descriptor()).unwrap();
        let id = request.headers[TRACE_HEADER].to_str().unwrap();
        assert!(id.starts_with("wk-"), "{id}");

        let mut preset = descriptor();
        preset.headers.insert(
            HeaderName::from_static(TRACE_HEADER),
            HeaderValue::from_static("upstream-1"),
        );
        let request = TraceIdStep.apply(preset).unwrap();
        assert_eq!(request.headers[TRACE_HEADER], "upstream-1");
    }

    #[test]
    fn trace_ids_are_unique() {
        assert_ne!(generate_trace_id(), generate_trace_id());
    }

    #[test]
    fn log_steps_pass_values_through() {
        let request = LogRequestStep.apply(descriptor()).unwrap();
        assert_eq!(request.url.path(), "/api/v1/users");

        let call = CallInfo {
            method: Method::GET,
            url: "http://localhost/x".to_string(),
            trace_id: None,
        };
        let fault = TransportFault::no_response("refused");
        let outcome = LogResponseStep.apply(&call, Err(fault.clone()));
        assert_eq!(outcome.unwrap_err(), fault);
    }
}
