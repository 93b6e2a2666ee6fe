//! W3C Trace Context propagation for calls to the remote API.
//!
//! Every outgoing request carries a `traceparent` (when a span context is
//! active) and an `x-request-id`. The request id is fixed when the logical
//! request is built, so a retried attempt reuses the id of the original.
//!
//! See: https://www.w3.org/TR/trace-context/

use opentelemetry::trace::TraceContextExt;
use reqwest::Method;
use reqwest::header::HeaderMap;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Header name for W3C traceparent
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Header name for W3C tracestate
pub const TRACESTATE_HEADER: &str = "tracestate";

/// Header name for request correlation ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Fresh correlation id for one logical request.
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Write `traceparent`/`tracestate` for the current span, if it has a
/// valid OpenTelemetry context. Leaves `headers` untouched otherwise.
pub fn inject_trace_context(headers: &mut HeaderMap) {
    let context = Span::current().context();
    let span = context.span();
    let sc = span.span_context();
    if !sc.is_valid() {
        return;
    }

    // version-trace_id-span_id-trace_flags
    let traceparent = format!(
        "00-{}-{}-{:02x}",
        sc.trace_id(),
        sc.span_id(),
        sc.trace_flags().to_u8()
    );
    if let Ok(value) = traceparent.parse() {
        headers.insert(TRACEPARENT_HEADER, value);
    }

    let tracestate = sc.trace_state().header();
    if tracestate.is_empty() {
        return;
    }
    if let Ok(value) = tracestate.parse() {
        headers.insert(TRACESTATE_HEADER, value);
    }
}

/// [`inject_trace_context`] plus the `x-request-id` correlation header.
pub fn inject_trace_headers(headers: &mut HeaderMap, request_id: Option<&str>) {
    inject_trace_context(headers);

    if let Some(id) = request_id {
        if let Ok(value) = id.parse() {
            headers.insert(REQUEST_ID_HEADER, value);
        }
    }
}

/// Correlation id previously attached with [`inject_trace_headers`].
pub fn extract_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)?
        .to_str()
        .ok()
        .map(str::to_owned)
}

/// A `reqwest::RequestBuilder` that gets trace and request id headers
/// added at send time.
pub struct TracedRequest {
    request: reqwest::RequestBuilder,
    request_id: Option<String>,
}

impl TracedRequest {
    pub fn new(request: reqwest::RequestBuilder) -> Self {
        Self {
            request,
            request_id: None,
        }
    }

    /// Correlation id to send instead of a freshly generated one.
    pub fn request_id(self, request_id: &str) -> Self {
        Self {
            request_id: Some(request_id.to_string()),
            ..self
        }
    }

    pub fn json<T: serde::Serialize + ?Sized>(self, json: &T) -> Self {
        Self {
            request: self.request.json(json),
            ..self
        }
    }

    pub fn bearer_auth<T: std::fmt::Display>(self, token: T) -> Self {
        Self {
            request: self.request.bearer_auth(token),
            ..self
        }
    }

    /// Send the request with trace context and request id headers injected.
    pub async fn send(self) -> Result<reqwest::Response, reqwest::Error> {
        let request_id = self.request_id.unwrap_or_else(new_request_id);
        let mut headers = HeaderMap::new();
        inject_trace_headers(&mut headers, Some(&request_id));

        self.request.headers(headers).send().await
    }
}

/// Build [`TracedRequest`]s straight from a client.
pub trait TracedClientExt {
    fn traced_request(&self, method: Method, url: &str) -> TracedRequest;

    fn traced_get(&self, url: &str) -> TracedRequest {
        self.traced_request(Method::GET, url)
    }

    fn traced_post(&self, url: &str) -> TracedRequest {
        self.traced_request(Method::POST, url)
    }
}

impl TracedClientExt for reqwest::Client {
    fn traced_request(&self, method: Method, url: &str) -> TracedRequest {
        TracedRequest::new(self.request(method, url))
    }
}
