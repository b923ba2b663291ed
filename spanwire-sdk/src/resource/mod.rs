//! Representations of entities producing telemetry.
//!
//! A [`Resource`] is an immutable set of attributes describing the process
//! that emits spans: at minimum `service.name`, plus the runtime's own
//! `telemetry.sdk.*` attributes and whatever the deployment adds. Every
//! exported span carries the resource of the tracer that produced it.
//!
//! Later attributes override earlier ones with the same key, so a resource is
//! assembled from the least to the most specific source:
//!
//! 1. [`TelemetryResourceDetector`]: `telemetry.sdk.name`, `.language`, `.version`
//! 2. [`EnvResourceDetector`]: `OTEL_RESOURCE_ATTRIBUTES`
//! 3. explicitly supplied attributes (service name, environment, version)
mod env;

pub use env::{EnvResourceDetector, TelemetryResourceDetector};
pub(crate) use env::parse_key_value_list;

use spanwire::{Key, KeyValue, Value};
use std::collections::{hash_map, HashMap};
use std::sync::Arc;

/// `service.name` resource attribute key.
pub const SERVICE_NAME: &str = "service.name";
/// `service.version` resource attribute key.
pub const SERVICE_VERSION: &str = "service.version";
/// `deployment.environment` resource attribute key.
pub const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";

/// An immutable representation of the entity producing telemetry as attributes.
/// Cloning is cheap: the attributes are shared.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    attrs: Arc<HashMap<Key, Value>>,
}

impl Default for Resource {
    fn default() -> Self {
        Resource::builder().build()
    }
}

impl Resource {
    /// Builder seeded with the runtime's `telemetry.sdk.*` attributes.
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder::default().with_detector(&TelemetryResourceDetector)
    }

    /// Builder with no attributes at all.
    pub fn builder_empty() -> ResourceBuilder {
        ResourceBuilder::default()
    }

    /// A resource with no attributes.
    pub fn empty() -> Self {
        Resource {
            attrs: Arc::new(HashMap::new()),
        }
    }

    /// Returns the number of attributes for this resource
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Returns `true` if the resource contains no attributes.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Gets an iterator over the attributes of this resource.
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.attrs.iter())
    }

    /// Retrieve the value from resource associate with given key.
    pub fn get(&self, key: &Key) -> Option<Value> {
        self.attrs.get(key).cloned()
    }

    /// The `service.name` attribute rendered as a string, if set.
    pub fn service_name(&self) -> Option<String> {
        self.attrs
            .get(&Key::from_static_str(SERVICE_NAME))
            .map(|v| v.as_str().into_owned())
    }
}

/// An iterator over the entries of a `Resource`.
#[derive(Debug)]
pub struct Iter<'a>(hash_map::Iter<'a, Key, Value>);

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Key, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl<'a> IntoIterator for &'a Resource {
    type Item = (&'a Key, &'a Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        Iter(self.attrs.iter())
    }
}

/// Source of resource attributes.
pub trait ResourceDetector {
    /// Detect attributes. Missing or unreadable sources yield nothing rather
    /// than an error.
    fn detect(&self) -> Vec<KeyValue>;
}

/// Builder for [`Resource`].
#[derive(Debug, Default)]
pub struct ResourceBuilder {
    attrs: HashMap<Key, Value>,
}

impl ResourceBuilder {
    /// Add the attributes found by `detector`.
    pub fn with_detector(self, detector: &dyn ResourceDetector) -> Self {
        self.with_attributes(detector.detect())
    }

    /// Add a single attribute, replacing any earlier value for the key.
    pub fn with_attribute(mut self, kv: KeyValue) -> Self {
        self.attrs.insert(kv.key, kv.value);
        self
    }

    /// Add several attributes, replacing earlier values for the same keys.
    pub fn with_attributes<T: IntoIterator<Item = KeyValue>>(mut self, kvs: T) -> Self {
        self.attrs
            .extend(kvs.into_iter().map(|kv| (kv.key, kv.value)));
        self
    }

    /// Set `service.name`.
    pub fn with_service_name(self, name: impl Into<Value>) -> Self {
        self.with_attribute(KeyValue::new(SERVICE_NAME, name.into()))
    }

    /// Create a [Resource] with the options provided to the [ResourceBuilder].
    pub fn build(self) -> Resource {
        Resource {
            attrs: Arc::new(self.attrs),
        }
    }
}
