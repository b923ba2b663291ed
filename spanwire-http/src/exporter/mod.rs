//! OTLP/JSON span exporter over HTTP.
//!
//! Each batch handed over by the batch processor becomes one `POST` to the
//! configured endpoint, with `Content-Type: application/json` and the
//! configured headers (typically authentication). Failures are reported to
//! the processor, which logs them and drops the batch.
use crate::{Bytes, HttpClient, HttpError};
use futures_util::future::BoxFuture;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, Request, Uri};
use spanwire::spanwire_debug;
use spanwire_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use spanwire_sdk::export::ExportError;
use spanwire_sdk::trace::TracerConfig;
use spanwire_sdk::Resource;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

mod transform;

/// Errors from building or running an [`HttpSpanExporter`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpExportError {
    /// No client was given and no default client feature is enabled.
    #[error("no http client configured")]
    NoHttpClient,

    /// No endpoint was given.
    #[error("no export endpoint configured")]
    MissingEndpoint,

    /// The endpoint is not an absolute http(s) URI.
    #[error("invalid export endpoint {0:?}")]
    InvalidEndpoint(String),

    /// A configured header has an invalid name or value.
    #[error("invalid export header {0:?}")]
    InvalidHeader(String),

    /// The batch could not be encoded.
    #[error("failed to encode spans: {0}")]
    Encode(#[from] serde_json::Error),

    /// The request could not be built or sent.
    #[error("request failed: {0}")]
    RequestFailed(#[source] HttpError),

    /// The collector answered with a non-success status.
    #[error("collector responded with status {0}")]
    Status(u16),

    /// The exporter was shut down.
    #[error("exporter is shut down")]
    Shutdown,
}

impl ExportError for HttpExportError {
    fn exporter_name(&self) -> &'static str {
        "http-json"
    }
}

/// Posts finished spans as OTLP/JSON.
///
/// # Example
///
/// ```no_run
/// # fn demo(client: impl spanwire_http::HttpClient + 'static) -> Result<(), Box<dyn std::error::Error>> {
/// use spanwire_http::exporter::HttpSpanExporter;
/// use spanwire_sdk::trace::{Tracer, TracerConfig};
///
/// let config = TracerConfig::builder("checkout")
///     .with_endpoint("https://collector.internal:4318/v1/traces")
///     .with_header("authorization", "Bearer s3cr3t")
///     .build();
/// let exporter = HttpSpanExporter::builder()
///     .with_config(&config)
///     .with_http_client(client)
///     .build()?;
///
/// let tracer = Tracer::new();
/// tracer.initialize(config, exporter)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpSpanExporter {
    client: Option<Arc<dyn HttpClient>>,
    endpoint: Uri,
    headers: HeaderMap,
    resource: Resource,
}

impl HttpSpanExporter {
    /// Start configuring an exporter.
    pub fn builder() -> HttpSpanExporterBuilder {
        HttpSpanExporterBuilder::default()
    }

    /// The URI batches are posted to.
    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    fn build_request(&self, batch: Vec<SpanData>) -> Result<Request<Bytes>, HttpExportError> {
        let payload = transform::ExportTraceServiceRequest::new(&self.resource, batch);
        let body = serde_json::to_vec(&payload)?;

        let mut request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from(body))
            .map_err(|err| HttpExportError::RequestFailed(Box::new(err)))?;
        for (name, value) in &self.headers {
            request.headers_mut().insert(name.clone(), value.clone());
        }
        Ok(request)
    }
}

impl SpanExporter for HttpSpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let Some(client) = self.client.clone() else {
            return Box::pin(std::future::ready(Err(HttpExportError::Shutdown.into())));
        };
        let batch_size = batch.len();
        let request = match self.build_request(batch) {
            Ok(request) => request,
            Err(err) => return Box::pin(std::future::ready(Err(err.into()))),
        };

        spanwire_debug!(name: "HttpSpanExporter.Export", batch_size = batch_size);
        Box::pin(send(client, request))
    }

    fn shutdown(&mut self) {
        self.client.take();
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.resource = resource.clone();
    }
}

async fn send(client: Arc<dyn HttpClient>, request: Request<Bytes>) -> ExportResult {
    let response = client
        .send_bytes(request)
        .await
        .map_err(HttpExportError::RequestFailed)?;
    if !response.status().is_success() {
        return Err(HttpExportError::Status(response.status().as_u16()).into());
    }
    Ok(())
}

/// Builder for [`HttpSpanExporter`].
#[derive(Debug, Default)]
pub struct HttpSpanExporterBuilder {
    client: Option<Arc<dyn HttpClient>>,
    endpoint: Option<String>,
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl HttpSpanExporterBuilder {
    /// Assign client implementation
    pub fn with_http_client<T: HttpClient + 'static>(mut self, client: T) -> Self {
        self.client = Some(Arc::new(client));
        self
    }

    /// Set the URI batches are posted to.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add headers sent with every request.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Request timeout for the default blocking client.
    ///
    /// A client passed to [`with_http_client`](Self::with_http_client) keeps
    /// its own timeout settings.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Take the endpoint, headers and export timeout from a tracer
    /// configuration.
    pub fn with_config(mut self, config: &TracerConfig) -> Self {
        if let Some(endpoint) = config.endpoint() {
            self.endpoint = Some(endpoint.to_string());
        }
        self.timeout = Some(config.batch_config().max_export_timeout());
        self.with_headers(config.headers().iter().cloned())
    }

    /// Build the exporter.
    pub fn build(self) -> Result<HttpSpanExporter, HttpExportError> {
        let raw = self.endpoint.ok_or(HttpExportError::MissingEndpoint)?;
        let endpoint = raw
            .parse::<Uri>()
            .map_err(|_| HttpExportError::InvalidEndpoint(raw.clone()))?;
        if !matches!(endpoint.scheme_str(), Some("http" | "https")) || endpoint.host().is_none() {
            return Err(HttpExportError::InvalidEndpoint(raw));
        }

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| HttpExportError::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(&value).map_err(|_| HttpExportError::InvalidHeader(name))?;
            headers.insert(header_name, header_value);
        }

        let client = match self.client {
            Some(client) => client,
            None => default_client(self.timeout)?,
        };

        Ok(HttpSpanExporter {
            client: Some(client),
            endpoint,
            headers,
            resource: Resource::empty(),
        })
    }
}

/// The blocking client runs inside the export future and cannot be
/// abandoned by the batch processor, so it carries the export timeout itself.
#[cfg(feature = "reqwest-blocking")]
fn default_client(timeout: Option<Duration>) -> Result<Arc<dyn HttpClient>, HttpExportError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout.unwrap_or(DEFAULT_EXPORT_TIMEOUT))
        .build()
        .map_err(|err| HttpExportError::RequestFailed(Box::new(err)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "reqwest-blocking"))]
fn default_client(_timeout: Option<Duration>) -> Result<Arc<dyn HttpClient>, HttpExportError> {
    Err(HttpExportError::NoHttpClient)
}

#[cfg(feature = "reqwest-blocking")]
const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(5);
