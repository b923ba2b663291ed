//! Resource detectors backed by the environment and the runtime itself.
use super::ResourceDetector;
use percent_encoding::percent_decode_str;
use spanwire::KeyValue;
use std::env;

const OTEL_RESOURCE_ATTRIBUTES: &str = "OTEL_RESOURCE_ATTRIBUTES";

/// Reads `key1=value1,key2=value2` pairs from `OTEL_RESOURCE_ATTRIBUTES`.
///
/// Values are percent-decoded. Entries without `=` are skipped.
#[derive(Debug, Default)]
pub struct EnvResourceDetector {
    _private: (),
}

impl EnvResourceDetector {
    /// Create `EnvResourceDetector` instance.
    pub fn new() -> Self {
        EnvResourceDetector { _private: () }
    }
}

impl ResourceDetector for EnvResourceDetector {
    fn detect(&self) -> Vec<KeyValue> {
        match env::var(OTEL_RESOURCE_ATTRIBUTES) {
            Ok(s) if !s.is_empty() => parse_key_value_list(&s)
                .into_iter()
                .map(|(k, v)| KeyValue::new(k, v))
                .collect(),
            Ok(_) | Err(_) => Vec::new(),
        }
    }
}

/// The attributes identifying this runtime: `telemetry.sdk.name`,
/// `telemetry.sdk.language` and `telemetry.sdk.version`.
#[derive(Debug)]
pub struct TelemetryResourceDetector;

impl ResourceDetector for TelemetryResourceDetector {
    fn detect(&self) -> Vec<KeyValue> {
        vec![
            KeyValue::new("telemetry.sdk.name", "spanwire"),
            KeyValue::new("telemetry.sdk.language", "rust"),
            KeyValue::new("telemetry.sdk.version", env!("CARGO_PKG_VERSION")),
        ]
    }
}

/// Split a `k=v,k2=v2` list into trimmed, percent-decoded pairs.
///
/// Used for both resource attributes and exporter headers, which share the
/// format.
pub(crate) fn parse_key_value_list(s: &str) -> Vec<(String, String)> {
    s.split_terminator(',')
        .filter_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            let value = percent_decode_str(value.trim())
                .decode_utf8()
                .ok()?
                .into_owned();
            Some((key.to_owned(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use spanwire::{Key, Value};

    #[test]
    fn detects_attributes_from_env() {
        temp_env::with_var(
            OTEL_RESOURCE_ATTRIBUTES,
            Some("key=value, k = v , a= x, a=z,base64=SGVsbG8sIFdvcmxkIQ=="),
            || {
                let resource = Resource::builder_empty()
                    .with_detector(&EnvResourceDetector::new())
                    .build();
                assert_eq!(resource.get(&Key::new("key")), Some(Value::from("value")));
                assert_eq!(resource.get(&Key::new("k")), Some(Value::from("v")));
                assert_eq!(resource.get(&Key::new("a")), Some(Value::from("z")));
                assert_eq!(
                    resource.get(&Key::new("base64")),
                    Some(Value::from("SGVsbG8sIFdvcmxkIQ=="))
                );
            },
        );
    }

    #[test]
    fn empty_env_yields_nothing() {
        temp_env::with_var(OTEL_RESOURCE_ATTRIBUTES, Some(""), || {
            assert!(EnvResourceDetector::new().detect().is_empty());
        });
        temp_env::with_var_unset(OTEL_RESOURCE_ATTRIBUTES, || {
            assert!(EnvResourceDetector::new().detect().is_empty());
        });
    }

    #[rustfmt::skip]
    #[test]
    fn parses_key_value_lists() {
        let cases: Vec<(&str, Vec<(&str, &str)>)> = vec![
            ("", vec![]),
            ("a=b", vec![("a", "b")]),
            ("a=b,c=d", vec![("a", "b"), ("c", "d")]),
            ("missing,a=b", vec![("a", "b")]),
            ("=orphan,a=b", vec![("a", "b")]),
            ("authorization=Bearer%20token", vec![("authorization", "Bearer token")]),
            ("x-api-key = abc ", vec![("x-api-key", "abc")]),
            ("a=b=c", vec![("a", "b=c")]),
        ];

        for (input, expected) in cases {
            let expected: Vec<(String, String)> = expected
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            assert_eq!(parse_key_value_list(input), expected, "input: {input:?}");
        }
    }
}
