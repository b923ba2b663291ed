//! Client-side tracing for outgoing HTTP requests.
//!
//! [`TracedClient`] wraps an [`HttpClient`] and turns every request into a
//! client span named `HTTP <METHOD>`:
//!
//! 1. The parent is the [`SpanContext`] stored in the request's extensions,
//!    if any; otherwise the span starts a new trace.
//! 2. `traceparent` and `tracestate` for the new span are injected into the
//!    request headers.
//! 3. The response status is recorded as `http.status_code`. Codes of 400
//!    and above mark the span as failed.
//! 4. Transport errors are recorded as `HttpError` exceptions, with their
//!    source chain in `exception.cause`, and returned unchanged.
//!
//! The span ends once on every path, including when the caller drops the
//! future. While the tracer is uninitialized requests are sent untraced.
use crate::{Bytes, HeaderInjector, HttpClient, HttpError, Request, Response};
use async_trait::async_trait;
use http::StatusCode;
use spanwire::propagation::TextMapPropagator;
use spanwire::trace::{SpanContext, SpanKind, Status};
use spanwire::{spanwire_debug, KeyValue};
use spanwire_sdk::propagation::TraceContextPropagator;
use spanwire_sdk::trace::{Span, Tracer};

const HTTP_METHOD: &str = "http.method";
const HTTP_URL: &str = "http.url";
const HTTP_SCHEME: &str = "http.scheme";
const HTTP_HOST: &str = "http.host";
const HTTP_PATH: &str = "http.path";
const HTTP_STATUS_CODE: &str = "http.status_code";
const EXCEPTION_CAUSE: &str = "exception.cause";
const TRANSPORT_ERROR_TYPE: &str = "HttpError";

/// An [`HttpClient`] that traces each request it sends.
///
/// # Example
///
/// ```no_run
/// # async fn demo(inner: impl spanwire_http::HttpClient, tracer: spanwire_sdk::trace::Tracer, parent: spanwire::trace::SpanContext) -> Result<(), spanwire_http::HttpError> {
/// use spanwire_http::instrumentation::TracedClient;
/// use spanwire_http::{Bytes, HttpClient, Request};
///
/// let client = TracedClient::new(inner, tracer);
/// let mut request = Request::get("https://inventory.internal/items/42").body(Bytes::new())?;
/// // Optional: make the request span a child of `parent`.
/// request.extensions_mut().insert(parent);
/// let response = client.send_bytes(request).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct TracedClient<C> {
    inner: C,
    tracer: Tracer,
    propagator: TraceContextPropagator,
}

impl<C: HttpClient> TracedClient<C> {
    /// Wrap `inner`, reporting spans through `tracer`.
    pub fn new(inner: C, tracer: Tracer) -> Self {
        TracedClient {
            inner,
            tracer,
            propagator: TraceContextPropagator::new(),
        }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn start_span(&self, request: &Request<Bytes>) -> Option<Span> {
        let uri = request.uri();
        let attributes = vec![
            KeyValue::new(HTTP_METHOD, request.method().as_str().to_string()),
            KeyValue::new(HTTP_URL, uri.to_string()),
            KeyValue::new(HTTP_SCHEME, uri.scheme_str().unwrap_or_default().to_string()),
            KeyValue::new(HTTP_HOST, uri.host().unwrap_or_default().to_string()),
            KeyValue::new(HTTP_PATH, uri.path().to_string()),
        ];
        let parent = request.extensions().get::<SpanContext>();

        match self.tracer.start_span(
            format!("HTTP {}", request.method()),
            SpanKind::Client,
            attributes,
            parent,
        ) {
            Ok(span) => Some(span),
            Err(err) => {
                spanwire_debug!(name: "TracedClient.Untraced", reason = err.to_string());
                None
            }
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for TracedClient<C> {
    async fn send_bytes(&self, mut request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
        let Some(mut span) = self.start_span(&request) else {
            return self.inner.send_bytes(request).await;
        };
        self.propagator
            .inject(span.span_context(), &mut HeaderInjector(request.headers_mut()));

        match self.inner.send_bytes(request).await {
            Ok(response) => {
                record_status(&mut span, response.status());
                span.end();
                Ok(response)
            }
            Err(err) => {
                record_transport_error(&mut span, &err);
                span.end();
                Err(err)
            }
        }
    }
}

/// The concrete type behind `HttpError` is erased, so the exception type is
/// fixed and the source chain carries the detail.
fn record_transport_error(span: &mut Span, err: &HttpError) {
    let mut causes = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    let attributes = if causes.is_empty() {
        Vec::new()
    } else {
        vec![KeyValue::new(EXCEPTION_CAUSE, causes.join(": "))]
    };
    span.record_exception_with(TRANSPORT_ERROR_TYPE, err.to_string(), None, attributes);
    span.set_status(Status::error(err.to_string()));
}

fn record_status(span: &mut Span, status: StatusCode) {
    span.set_attribute(KeyValue::new(HTTP_STATUS_CODE, i64::from(status.as_u16())));
    if status.as_u16() >= 400 {
        span.set_status(Status::error(format!("HTTP {}", status.as_u16())));
    } else {
        span.set_status(Status::Ok);
    }
}
