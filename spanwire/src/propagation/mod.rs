//! Carrier traits for cross-process span context propagation.
//!
//! A propagator writes a [`SpanContext`] into an outgoing message and reads
//! one back out of an incoming message. The message itself is abstracted as
//! an [`Injector`] (write side) or an [`Extractor`] (read side), so the same
//! propagator works with HTTP header maps, plain `HashMap`s or anything else
//! that stores string key/value pairs.
//!
//! Header names are case-insensitive: carriers are expected to normalize keys.
use crate::trace::SpanContext;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Debug;

/// Injector provides an interface for adding fields to an outgoing carrier.
pub trait Injector {
    /// Add a key and value to the underlying data.
    fn set(&mut self, key: &str, value: String);
}

/// Extractor provides an interface for reading fields from an incoming carrier.
pub trait Extractor {
    /// Get a value from a key from the underlying data.
    fn get(&self, key: &str) -> Option<Cow<'_, str>>;

    /// Collect all the keys from the underlying data.
    fn keys(&self) -> Vec<Cow<'_, str>>;
}

impl<S: std::hash::BuildHasher> Injector for HashMap<String, String, S> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_lowercase(), value);
    }
}

impl<S: std::hash::BuildHasher> Extractor for HashMap<String, String, S> {
    fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(&key.to_lowercase())
            .map(|v| Cow::Borrowed(v.as_str()))
    }

    fn keys(&self) -> Vec<Cow<'_, str>> {
        self.keys().map(|k| Cow::Borrowed(k.as_str())).collect()
    }
}

/// Reads and writes a [`SpanContext`] as string key/value pairs.
pub trait TextMapPropagator: Debug {
    /// Write `span_context` into the carrier. Invalid contexts are not written.
    fn inject(&self, span_context: &SpanContext, injector: &mut dyn Injector);

    /// Read a span context from the carrier.
    ///
    /// Returns `None` when the carrier holds no context or a malformed one.
    fn extract(&self, extractor: &dyn Extractor) -> Option<SpanContext>;

    /// The header names this propagator reads and writes.
    fn fields(&self) -> &'static [&'static str];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_map_keys_are_case_insensitive() {
        let mut carrier: HashMap<String, String> = HashMap::new();
        Injector::set(&mut carrier, "TraceParent", "value".to_string());

        assert_eq!(
            Extractor::get(&carrier, "traceparent"),
            Some(Cow::Borrowed("value"))
        );
        assert_eq!(
            Extractor::get(&carrier, "TRACEPARENT"),
            Some(Cow::Borrowed("value"))
        );
        assert_eq!(Extractor::get(&carrier, "tracestate"), None);
    }

    #[test]
    fn hash_map_keys_are_listed() {
        let mut carrier: HashMap<String, String> = HashMap::new();
        Injector::set(&mut carrier, "a", "1".to_string());
        Injector::set(&mut carrier, "B", "2".to_string());

        let mut keys = Extractor::keys(&carrier);
        keys.sort();
        assert_eq!(keys, vec![Cow::Borrowed("a"), Cow::Borrowed("b")]);
    }
}
