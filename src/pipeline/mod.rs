//! Request pipeline
//!
//! Single choke point for calls to one backend. Each call goes through
//!
//! ```text
//! Building ──request steps──▶ Dispatched ──transport──▶ Succeeded | Failed
//!                                                         │
//!                                              response steps (in order)
//! ```
//!
//! The pipeline makes exactly one attempt per call. It owns no mutable
//! state, so concurrent calls on a shared `&Pipeline` never interfere.
//! Every transport fault is logged by the response steps and then handed
//! back to the caller as [`Error::Transport`].

pub mod steps;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::debug;
use url::Url;

pub use steps::{
    BearerCredentialStep, CREDENTIAL_KEY, LogRequestStep, LogResponseStep, RequestStep,
    ResponseStep, TRACE_HEADER, TraceIdStep,
};

use crate::config::AppConfig;
use crate::error::TransportFault;
use crate::storage::KeyValueStore;
use crate::transport::{CallOutcome, RequestDescriptor, ResponseEnvelope, Transport};
use crate::{Error, Result};

/// Timeout applied when neither the builder nor the call sets one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle of a single call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Descriptor is being assembled and decorated
    Building,
    /// Handed to the transport
    Dispatched,
    /// 2xx response received
    Succeeded,
    /// Transport fault of any kind
    Failed,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Building => "building",
            Self::Dispatched => "dispatched",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What response steps know about the call they are observing
#[derive(Debug, Clone)]
pub struct CallInfo {
    /// HTTP method
    pub method: Method,
    /// Resolved URL, or the raw target when it could not be resolved
    pub url: String,
    /// Trace id attached to the request, if any
    pub trace_id: Option<String>,
}

impl CallInfo {
    fn from_descriptor(request: &RequestDescriptor) -> Self {
        Self {
            method: request.method.clone(),
            url: request.url.to_string(),
            trace_id: request
                .headers
                .get(TRACE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

/// Per-call overrides merged over the pipeline defaults
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Method (default `GET`)
    pub method: Option<Method>,
    /// Extra headers; replace defaults with the same name
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
    /// Timeout override
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Empty options (plain `GET` with defaults)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a JSON body
    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Override the timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The request pipeline. See the module docs.
pub struct Pipeline {
    base: Url,
    default_headers: HeaderMap,
    timeout: Duration,
    transport: Arc<dyn Transport>,
    request_steps: Vec<Arc<dyn RequestStep>>,
    response_steps: Vec<Arc<dyn ResponseStep>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("base", &self.base.as_str())
            .field("timeout", &self.timeout)
            .field(
                "request_steps",
                &self.request_steps.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field(
                "response_steps",
                &self.response_steps.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Start configuring a pipeline against `base_url`.
    ///
    /// Fails with [`Error::Config`] when the base is empty or not an
    /// absolute URL: an unconfigured pipeline must never send anything.
    pub fn builder(base_url: &str) -> Result<PipelineBuilder> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(Error::Config(
                "Request pipeline base URL is not configured".to_string(),
            ));
        }

        let mut base = Url::parse(trimmed)
            .map_err(|e| Error::Config(format!("Invalid pipeline base URL '{trimmed}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Pipeline base URL '{trimmed}' cannot be used as a base"
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(PipelineBuilder {
            base,
            default_headers,
            timeout: DEFAULT_TIMEOUT,
            request_steps: Vec::new(),
            response_steps: Vec::new(),
        })
    }

    /// Pipeline with the standard steps (trace id, bearer credential, logging)
    pub fn standard(
        base_url: &str,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        Ok(Self::builder(base_url)?.standard_steps(store).build(transport))
    }

    /// Standard pipeline against the configured API base with the configured timeout
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let base = config.api_base_url()?;
        Ok(Self::builder(base.as_str())?
            .timeout(config.request_timeout)
            .standard_steps(store)
            .build(transport))
    }

    /// Base every target is resolved against
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Issue one call.
    ///
    /// Returns the response envelope for 2xx answers and
    /// [`Error::Transport`] for every other outcome, after the response
    /// steps have observed it.
    pub async fn request(&self, target: &str, options: RequestOptions) -> Result<ResponseEnvelope> {
        let method = options.method.clone().unwrap_or(Method::GET);

        let (call, outcome) = match self.prepare(target, options) {
            Ok(request) => {
                let call = CallInfo::from_descriptor(&request);
                debug!(state = %CallState::Dispatched, method = %call.method, url = %call.url, "Handing request to transport");
                let outcome = self.transport.send(&request).await;
                (call, outcome)
            }
            Err(fault) => {
                let call = CallInfo {
                    method,
                    url: target.to_string(),
                    trace_id: None,
                };
                (call, Err(fault))
            }
        };

        let outcome = self
            .response_steps
            .iter()
            .fold(outcome, |outcome, step| step.apply(&call, outcome));

        outcome.map_err(Error::Transport)
    }

    /// `GET target`
    pub async fn get(&self, target: &str) -> Result<ResponseEnvelope> {
        self.request(target, RequestOptions::new()).await
    }

    /// `POST target` with a JSON body
    pub async fn post(&self, target: &str, body: Value) -> Result<ResponseEnvelope> {
        self.request(target, RequestOptions::new().method(Method::POST).body(body))
            .await
    }

    /// `PUT target` with a JSON body
    pub async fn put(&self, target: &str, body: Value) -> Result<ResponseEnvelope> {
        self.request(target, RequestOptions::new().method(Method::PUT).body(body))
            .await
    }

    /// `PATCH target` with a JSON body
    pub async fn patch(&self, target: &str, body: Value) -> Result<ResponseEnvelope> {
        self.request(target, RequestOptions::new().method(Method::PATCH).body(body))
            .await
    }

    /// `DELETE target`
    pub async fn delete(&self, target: &str) -> Result<ResponseEnvelope> {
        self.request(target, RequestOptions::new().method(Method::DELETE))
            .await
    }

    fn prepare(
        &self,
        target: &str,
        options: RequestOptions,
    ) -> std::result::Result<RequestDescriptor, TransportFault> {
        let mut request = self.describe(target, options)?;
        for step in &self.request_steps {
            request = step.apply(request)?;
        }
        Ok(request)
    }

    fn describe(
        &self,
        target: &str,
        options: RequestOptions,
    ) -> std::result::Result<RequestDescriptor, TransportFault> {
        let url = self.resolve(target)?;

        let mut headers = self.default_headers.clone();
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportFault::setup(format!("Invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportFault::setup(format!("Invalid value for header '{name}': {e}")))?;
            headers.insert(name, value);
        }

        Ok(RequestDescriptor {
            url,
            method: options.method.unwrap_or(Method::GET),
            headers,
            body: options.body,
            timeout: options.timeout.unwrap_or(self.timeout),
        })
    }

    /// Join `target` onto the base; targets may not leave the base URL
    fn resolve(&self, target: &str) -> std::result::Result<Url, TransportFault> {
        let url = self
            .base
            .join(target.trim_start_matches('/'))
            .map_err(|e| TransportFault::setup(format!("Invalid target '{target}': {e}")))?;

        if url.origin() != self.base.origin() || !url.path().starts_with(self.base.path()) {
            return Err(TransportFault::setup(format!(
                "Target '{target}' resolves outside {}",
                self.base
            )));
        }
        Ok(url)
    }
}

/// Builder for [`Pipeline`]; steps run in the order they are added.
pub struct PipelineBuilder {
    base: Url,
    default_headers: HeaderMap,
    timeout: Duration,
    request_steps: Vec<Arc<dyn RequestStep>>,
    response_steps: Vec<Arc<dyn ResponseStep>>,
}

impl PipelineBuilder {
    /// Default per-call timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add or replace a default header
    #[must_use]
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    /// Append a request step
    #[must_use]
    pub fn request_step(mut self, step: Arc<dyn RequestStep>) -> Self {
        self.request_steps.push(step);
        self
    }

    /// Append a response step
    #[must_use]
    pub fn response_step(mut self, step: Arc<dyn ResponseStep>) -> Self {
        self.response_steps.push(step);
        self
    }

    /// Append trace id, bearer credential and request logging, plus response logging
    #[must_use]
    pub fn standard_steps(self, store: Arc<dyn KeyValueStore>) -> Self {
        self.request_step(Arc::new(TraceIdStep))
            .request_step(Arc::new(BearerCredentialStep::new(store)))
            .request_step(Arc::new(LogRequestStep))
            .response_step(Arc::new(LogResponseStep))
    }

    /// Finalise with the transport that performs the I/O
    #[must_use]
    pub fn build(self, transport: Arc<dyn Transport>) -> Pipeline {
        Pipeline {
            base: self.base,
            default_headers: self.default_headers,
            timeout: self.timeout,
            transport,
            request_steps: self.request_steps,
            response_steps: self.response_steps,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;
    use crate::json::ParseOutcome;
    use crate::storage::Store;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use reqwest::header::AUTHORIZATION;
    use serde_json::json;

    /// Records every descriptor and answers with a canned outcome.
    struct RecordingTransport {
        seen: Mutex<Vec<RequestDescriptor>>,
        reply: CallOutcome,
    }

    impl RecordingTransport {
        fn ok(body: Value) -> Arc<Self> {
            Self::with(Ok(ResponseEnvelope {
                status: 200,
                headers: HeaderMap::new(),
                body: ParseOutcome::Parsed(body),
            }))
        }

        fn with(reply: CallOutcome) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                reply,
            })
        }

        fn last(&self) -> RequestDescriptor {
            self.seen.lock().last().cloned().expect("no request recorded")
        }

        fn calls(&self) -> usize {
            self.seen.lock().len()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, request: &RequestDescriptor) -> CallOutcome {
            self.seen.lock().push(request.clone());
            self.reply.clone()
        }
    }

    /// Response step that counts invocations and tags successes.
    struct CountingStep(Mutex<Vec<bool>>);

    impl ResponseStep for CountingStep {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn apply(&self, _call: &CallInfo, outcome: CallOutcome) -> CallOutcome {
            self.0.lock().push(outcome.is_ok());
            outcome
        }
    }

    fn pipeline(store: Arc<Store>, transport: Arc<RecordingTransport>) -> Pipeline {
        Pipeline::standard("https://api.example.com/api/v1", store, transport).unwrap()
    }

    // ── configure ─────────────────────────────────────────────────────

    #[test]
    fn builder_rejects_missing_base() {
        assert!(matches!(Pipeline::builder(""), Err(Error::Config(_))));
        assert!(matches!(Pipeline::builder("   "), Err(Error::Config(_))));
        assert!(matches!(Pipeline::builder("/relative/only"), Err(Error::Config(_))));
        assert!(matches!(Pipeline::builder("data:text/plain,hi"), Err(Error::Config(_))));
    }

    #[test]
    fn builder_normalizes_trailing_slash() {
        let p = Pipeline::builder("https://api.example.com/api/v1")
            .unwrap()
            .build(RecordingTransport::ok(json!({})));
        assert_eq!(p.base_url().as_str(), "https://api.example.com/api/v1/");
    }

    #[test]
    fn from_config_uses_api_base_and_timeout() {
        let config = AppConfig {
            backend_url: "http://backend.test".to_string(),
            request_timeout: Duration::from_secs(3),
            ..AppConfig::default()
        };
        let p = Pipeline::from_config(
            &config,
            Arc::new(Store::session()),
            RecordingTransport::ok(json!({})),
        )
        .unwrap();
        assert_eq!(p.base_url().as_str(), "http://backend.test/api/v1/");
        assert_eq!(p.timeout, Duration::from_secs(3));
    }

    // ── request building ──────────────────────────────────────────────

    #[tokio::test]
    async fn defaults_are_applied() {
        let transport = RecordingTransport::ok(json!({"ok": true}));
        let p = pipeline(Arc::new(Store::session()), transport.clone());

        let response = p.get("/users/7").await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, ParseOutcome::Parsed(json!({"ok": true})));

        let sent = transport.last();
        assert_eq!(sent.url.as_str(), "https://api.example.com/api/v1/users/7");
        assert_eq!(sent.method, Method::GET);
        assert_eq!(sent.headers[CONTENT_TYPE], "application/json");
        assert_eq!(sent.headers[ACCEPT], "application/json");
        assert_eq!(sent.timeout, DEFAULT_TIMEOUT);
        assert!(sent.headers.contains_key(TRACE_HEADER));
    }

    #[tokio::test]
    async fn options_override_defaults() {
        let transport = RecordingTransport::ok(json!({}));
        let p = pipeline(Arc::new(Store::session()), transport.clone());

        let options = RequestOptions::new()
            .method(Method::POST)
            .header("Content-Type", "application/merge-patch+json")
            .header("X-Client", "cli")
            .body(json!({"name": "ada"}))
            .timeout(Duration::from_millis(250));
        p.request("items?draft=true", options).await.unwrap();

        let sent = transport.last();
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.url.query(), Some("draft=true"));
        assert_eq!(sent.headers[CONTENT_TYPE], "application/merge-patch+json");
        assert_eq!(sent.headers.get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(sent.headers["x-client"], "cli");
        assert_eq!(sent.body, Some(json!({"name": "ada"})));
        assert_eq!(sent.timeout, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn helpers_set_method_and_body() {
        let transport = RecordingTransport::ok(json!({}));
        let p = pipeline(Arc::new(Store::session()), transport.clone());

        p.put("items/1", json!({"a": 1})).await.unwrap();
        assert_eq!(transport.last().method, Method::PUT);
        p.patch("items/1", json!({"a": 2})).await.unwrap();
        assert_eq!(transport.last().body, Some(json!({"a": 2})));
        p.delete("items/1").await.unwrap();
        assert_eq!(transport.last().method, Method::DELETE);
        assert_eq!(transport.last().body, None);
        p.post("items", json!([])).await.unwrap();
        assert_eq!(transport.last().method, Method::POST);
    }

    // ── credential ────────────────────────────────────────────────────

    #[tokio::test]
    async fn credential_present_sets_bearer_header() {
        let store = Arc::new(Store::session());
        store.set(CREDENTIAL_KEY, "secret-token");
        let transport = RecordingTransport::ok(json!({}));
        let p = pipeline(store, transport.clone());

        p.get("me").await.unwrap();
        assert_eq!(transport.last().headers[AUTHORIZATION], "Bearer secret-token");
    }

    #[tokio::test]
    async fn credential_absent_omits_header() {
        let transport = RecordingTransport::ok(json!({}));
        let p = pipeline(Arc::new(Store::session()), transport.clone());

        p.get("me").await.unwrap();
        assert!(transport.last().headers.get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn credential_is_read_per_call() {
        let store = Arc::new(Store::session());
        let transport = RecordingTransport::ok(json!({}));
        let p = pipeline(store.clone(), transport.clone());

        p.get("me").await.unwrap();
        assert!(transport.last().headers.get(AUTHORIZATION).is_none());

        store.set(CREDENTIAL_KEY, "fresh");
        p.get("me").await.unwrap();
        assert_eq!(transport.last().headers[AUTHORIZATION], "Bearer fresh");

        store.remove(CREDENTIAL_KEY);
        p.get("me").await.unwrap();
        assert!(transport.last().headers.get(AUTHORIZATION).is_none());
    }

    // ── faults ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn error_response_reaches_caller_with_status_and_body() {
        let body = ParseOutcome::Parsed(json!({"error": "forbidden"}));
        let transport = RecordingTransport::with(Err(TransportFault::error_response(403, body.clone())));
        let counter = Arc::new(CountingStep(Mutex::new(Vec::new())));
        let p = Pipeline::builder("https://api.example.com")
            .unwrap()
            .standard_steps(Arc::new(Store::session()))
            .response_step(counter.clone())
            .build(transport);

        let err = p.get("admin").await.unwrap_err();
        let fault = err.as_transport().expect("transport fault");
        assert_eq!(fault.kind, FaultKind::ErrorResponse);
        assert_eq!(fault.status, Some(403));
        assert_eq!(fault.body, Some(body));
        assert_eq!(*counter.0.lock(), vec![false]);
    }

    #[tokio::test]
    async fn no_response_is_reraised() {
        let transport = RecordingTransport::with(Err(TransportFault::no_response("connection refused")));
        let p = pipeline(Arc::new(Store::session()), transport);

        let err = p.get("health").await.unwrap_err();
        assert_eq!(err.as_transport().map(|f| f.kind), Some(FaultKind::NoResponse));
    }

    #[tokio::test]
    async fn setup_faults_never_reach_transport() {
        let transport = RecordingTransport::ok(json!({}));
        let counter = Arc::new(CountingStep(Mutex::new(Vec::new())));
        let p = Pipeline::builder("https://api.example.com/api/v1/")
            .unwrap()
            .response_step(counter.clone())
            .build(transport.clone());

        for (target, options) in [
            ("ok", RequestOptions::new().header("bad header", "x")),
            ("ok", RequestOptions::new().header("x-fine", "bad\nvalue")),
            ("https://evil.example.net/steal", RequestOptions::new()),
            ("../../admin", RequestOptions::new()),
        ] {
            let err = p.request(target, options).await.unwrap_err();
            assert_eq!(
                err.as_transport().map(|f| f.kind),
                Some(FaultKind::Setup),
                "target {target}"
            );
        }
        assert_eq!(transport.calls(), 0);
        assert_eq!(counter.0.lock().len(), 4);
    }

    #[tokio::test]
    async fn response_steps_run_in_order() {
        struct Tag(&'static str, Arc<Mutex<Vec<&'static str>>>);
        impl ResponseStep for Tag {
            fn name(&self) -> &'static str {
                self.0
            }
            fn apply(&self, _call: &CallInfo, outcome: CallOutcome) -> CallOutcome {
                self.1.lock().push(self.0);
                outcome
            }
        }

        let order = Arc::new(Mutex::new(Vec::new()));
        let p = Pipeline::builder("https://api.example.com")
            .unwrap()
            .response_step(Arc::new(Tag("first", order.clone())))
            .response_step(Arc::new(Tag("second", order.clone())))
            .build(RecordingTransport::ok(json!({})));

        p.get("x").await.unwrap();
        assert_eq!(*order.lock(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn concurrent_calls_get_distinct_trace_ids() {
        let transport = RecordingTransport::ok(json!({}));
        let p = pipeline(Arc::new(Store::session()), transport.clone());

        let (a, b, c) = tokio::join!(p.get("a"), p.get("b"), p.get("c"));
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        let mut ids: Vec<String> = transport
            .seen
            .lock()
            .iter()
            .map(|r| r.headers[TRACE_HEADER].to_str().unwrap().to_string())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn debug_lists_step_names() {
        let p = pipeline(Arc::new(Store::session()), RecordingTransport::ok(json!({})));
        let debug = format!("{p:?}");
        assert!(debug.contains("bearer-credential"));
        assert!(debug.contains("log-response"));
    }
}
