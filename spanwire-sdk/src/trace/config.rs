//! Tracer configuration.
//!
//! A [`TracerConfig`] is built once, checked by [`TracerConfig::validate`]
//! when the tracer is initialized, and never changes afterwards.
//!
//! Values come from the builder, from environment variables via
//! [`TracerConfig::from_env`], or both: setters called after `from_env`
//! override what the environment provided.
//!
//! | variable | setting |
//! |---|---|
//! | `OTEL_SERVICE_NAME` | service name |
//! | `OTEL_RESOURCE_ATTRIBUTES` | extra resource attributes, `k=v,k2=v2` |
//! | `OTEL_TRACES_SAMPLER_ARG` | sampling ratio |
//! | `OTEL_EXPORTER_OTLP_TRACES_ENDPOINT` | export endpoint |
//! | `OTEL_EXPORTER_OTLP_TRACES_HEADERS` | export headers, `k=v,k2=v2`, percent-encoded |
//! | `SPANWIRE_ENVIRONMENT` | `deployment.environment` |
//! | `SPANWIRE_SERVICE_VERSION` | `service.version` |
//! | `SPANWIRE_DEBUG` | debug flag, `true`/`1` |
use crate::error::{TraceError, TraceResult};
use crate::resource::{
    parse_key_value_list, EnvResourceDetector, Resource, ResourceDetector, DEPLOYMENT_ENVIRONMENT,
    SERVICE_VERSION,
};
use crate::trace::{BatchConfig, IdGenerator, RandomIdGenerator};
use spanwire::{spanwire_warn, KeyValue};
use std::env;
use std::sync::Arc;
use url::Url;

const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
const OTEL_TRACES_SAMPLER_ARG: &str = "OTEL_TRACES_SAMPLER_ARG";
const OTEL_EXPORTER_OTLP_TRACES_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_TRACES_ENDPOINT";
const OTEL_EXPORTER_OTLP_TRACES_HEADERS: &str = "OTEL_EXPORTER_OTLP_TRACES_HEADERS";
const SPANWIRE_ENVIRONMENT: &str = "SPANWIRE_ENVIRONMENT";
const SPANWIRE_SERVICE_VERSION: &str = "SPANWIRE_SERVICE_VERSION";
const SPANWIRE_DEBUG: &str = "SPANWIRE_DEBUG";

const DEFAULT_SERVICE_NAME: &str = "unknown_service";

/// Immutable tracer settings.
#[derive(Clone, Debug)]
pub struct TracerConfig {
    service_name: String,
    resource_attributes: Vec<KeyValue>,
    sampling_ratio: f64,
    endpoint: Option<String>,
    headers: Vec<(String, String)>,
    environment: Option<String>,
    service_version: Option<String>,
    debug: bool,
    batch: BatchConfig,
    id_generator: Arc<dyn IdGenerator>,
}

impl TracerConfig {
    /// Start a configuration for `service_name` with every other setting at
    /// its default: ratio `1.0`, no endpoint, no headers, debug off, and
    /// [`BatchConfig::default`].
    pub fn builder(service_name: impl Into<String>) -> TracerConfigBuilder {
        TracerConfigBuilder {
            config: TracerConfig {
                service_name: service_name.into(),
                resource_attributes: Vec::new(),
                sampling_ratio: 1.0,
                endpoint: None,
                headers: Vec::new(),
                environment: None,
                service_version: None,
                debug: false,
                batch: BatchConfig::default(),
                id_generator: Arc::new(RandomIdGenerator::default()),
            },
        }
    }

    /// A builder seeded from the environment variables listed in the
    /// [module documentation](self). Unparsable values are logged and skipped.
    ///
    /// Without `OTEL_SERVICE_NAME` the service name is `unknown_service`.
    pub fn from_env() -> TracerConfigBuilder {
        let service_name = env::var(OTEL_SERVICE_NAME)
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
        let mut builder = TracerConfig::builder(service_name)
            .with_resource_attributes(EnvResourceDetector::new().detect());

        if let Ok(raw) = env::var(OTEL_TRACES_SAMPLER_ARG) {
            match raw.trim().parse::<f64>() {
                Ok(ratio) => builder = builder.with_sampling_ratio(ratio),
                Err(_) => {
                    spanwire_warn!(
                        name: "TracerConfig.InvalidEnvValue",
                        variable = OTEL_TRACES_SAMPLER_ARG,
                        value = raw.as_str(),
                    );
                }
            }
        }
        if let Some(endpoint) = non_empty_var(OTEL_EXPORTER_OTLP_TRACES_ENDPOINT) {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(headers) = non_empty_var(OTEL_EXPORTER_OTLP_TRACES_HEADERS) {
            builder = builder.with_headers(parse_key_value_list(&headers));
        }
        if let Some(environment) = non_empty_var(SPANWIRE_ENVIRONMENT) {
            builder = builder.with_environment(environment);
        }
        if let Some(version) = non_empty_var(SPANWIRE_SERVICE_VERSION) {
            builder = builder.with_service_version(version);
        }
        if let Some(raw) = non_empty_var(SPANWIRE_DEBUG) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => builder = builder.with_debug(true),
                "false" | "0" => builder = builder.with_debug(false),
                _ => {
                    spanwire_warn!(
                        name: "TracerConfig.InvalidEnvValue",
                        variable = SPANWIRE_DEBUG,
                        value = raw.as_str(),
                    );
                }
            }
        }
        builder
    }

    /// Check the settings the tracer cannot run without.
    ///
    /// * the service name is not blank
    /// * the sampling ratio is a finite number in `[0, 1]`
    /// * the endpoint, if any, is an `http` or `https` URL
    /// * queue and batch sizes are non-zero
    pub fn validate(&self) -> TraceResult<()> {
        if self.service_name.trim().is_empty() {
            return Err(TraceError::InvalidConfig(
                "service name must not be empty".into(),
            ));
        }
        if !self.sampling_ratio.is_finite() || !(0.0..=1.0).contains(&self.sampling_ratio) {
            return Err(TraceError::InvalidConfig(format!(
                "sampling ratio must be within [0, 1], got {}",
                self.sampling_ratio
            )));
        }
        if self.endpoint.is_some() {
            self.endpoint_url()?;
        }
        if self.batch.max_queue_size() == 0 || self.batch.max_export_batch_size() == 0 {
            return Err(TraceError::InvalidConfig(
                "batch queue and batch sizes must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Build the resource describing this service.
    pub(crate) fn build_resource(&self) -> Resource {
        let mut builder = Resource::builder()
            .with_attributes(self.resource_attributes.iter().cloned())
            .with_service_name(self.service_name.clone());
        if let Some(environment) = &self.environment {
            builder = builder.with_attribute(KeyValue::new(DEPLOYMENT_ENVIRONMENT, environment.clone()));
        }
        if let Some(version) = &self.service_version {
            builder = builder.with_attribute(KeyValue::new(SERVICE_VERSION, version.clone()));
        }
        builder.build()
    }

    /// The service name.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Extra resource attributes.
    pub fn resource_attributes(&self) -> &[KeyValue] {
        &self.resource_attributes
    }

    /// Fraction of root traces to sample.
    pub fn sampling_ratio(&self) -> f64 {
        self.sampling_ratio
    }

    /// The raw export endpoint, if configured.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// The export endpoint parsed as a URL.
    ///
    /// Returns `Ok(None)` when no endpoint is configured.
    pub fn endpoint_url(&self) -> TraceResult<Option<Url>> {
        let Some(raw) = self.endpoint.as_deref() else {
            return Ok(None);
        };
        let url = Url::parse(raw).map_err(|err| {
            TraceError::InvalidConfig(format!("invalid export endpoint {raw:?}: {err}"))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(Some(url)),
            scheme => Err(TraceError::InvalidConfig(format!(
                "export endpoint must use http or https, got {scheme:?}"
            ))),
        }
    }

    /// Headers sent with every export request, typically authentication.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The `deployment.environment` tag.
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// The `service.version` tag.
    pub fn service_version(&self) -> Option<&str> {
        self.service_version.as_deref()
    }

    /// Whether errors captured by the error hook are also printed.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Batch processor settings.
    pub fn batch_config(&self) -> &BatchConfig {
        &self.batch
    }

    pub(crate) fn id_generator(&self) -> Arc<dyn IdGenerator> {
        self.id_generator.clone()
    }
}

/// Builder for [`TracerConfig`].
#[derive(Debug)]
pub struct TracerConfigBuilder {
    config: TracerConfig,
}

impl TracerConfigBuilder {
    /// Replace the service name.
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.config.service_name = service_name.into();
        self
    }

    /// Add resource attributes. Later keys override earlier ones.
    pub fn with_resource_attributes<T: IntoIterator<Item = KeyValue>>(mut self, attributes: T) -> Self {
        self.config.resource_attributes.extend(attributes);
        self
    }

    /// Fraction of root traces to sample, in `[0, 1]`.
    pub fn with_sampling_ratio(mut self, ratio: f64) -> Self {
        self.config.sampling_ratio = ratio;
        self
    }

    /// Where the HTTP exporter sends batches.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    /// Add one export header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.push((name.into(), value.into()));
        self
    }

    /// Add several export headers.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config
            .headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set `deployment.environment`.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.config.environment = Some(environment.into());
        self
    }

    /// Set `service.version`.
    pub fn with_service_version(mut self, version: impl Into<String>) -> Self {
        self.config.service_version = Some(version.into());
        self
    }

    /// Also print errors captured by the error hook.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Batch processor settings.
    pub fn with_batch_config(mut self, batch: BatchConfig) -> Self {
        self.config.batch = batch;
        self
    }

    /// Replace the id generator.
    pub fn with_id_generator<T: IdGenerator + 'static>(mut self, id_generator: T) -> Self {
        self.config.id_generator = Arc::new(id_generator);
        self
    }

    /// Finish the configuration. Validation happens at `Tracer::initialize`.
    pub fn build(self) -> TracerConfig {
        self.config
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
