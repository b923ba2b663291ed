//! OTLP/JSON shapes for exported spans.
//!
//! Field names follow the protobuf JSON mapping: camelCase keys, lowercase
//! hex ids, 64-bit integers and nanosecond timestamps as strings.
use serde::Serialize;
use spanwire::trace::{Event, SpanKind, Status};
use spanwire::{Array, KeyValue, Value};
use spanwire_sdk::export::trace::SpanData;
use spanwire_sdk::Resource;
use std::time::{SystemTime, UNIX_EPOCH};

const SCOPE_NAME: &str = "spanwire";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExportTraceServiceRequest {
    resource_spans: Vec<ResourceSpans>,
}

impl ExportTraceServiceRequest {
    pub(crate) fn new(resource: &Resource, batch: Vec<SpanData>) -> Self {
        ExportTraceServiceRequest {
            resource_spans: vec![ResourceSpans {
                resource: JsonResource {
                    attributes: resource
                        .iter()
                        .map(|(key, value)| JsonKeyValue {
                            key: key.as_str().to_string(),
                            value: value.clone().into(),
                        })
                        .collect(),
                },
                scope_spans: vec![ScopeSpans {
                    scope: Scope {
                        name: SCOPE_NAME,
                        version: env!("CARGO_PKG_VERSION"),
                    },
                    spans: batch.into_iter().map(JsonSpan::from).collect(),
                }],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceSpans {
    resource: JsonResource,
    scope_spans: Vec<ScopeSpans>,
}

#[derive(Debug, Serialize)]
struct JsonResource {
    attributes: Vec<JsonKeyValue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScopeSpans {
    scope: Scope,
    spans: Vec<JsonSpan>,
}

#[derive(Debug, Serialize)]
struct Scope {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSpan {
    trace_id: String,
    span_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    trace_state: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    parent_span_id: String,
    flags: u32,
    name: String,
    kind: u8,
    start_time_unix_nano: String,
    end_time_unix_nano: String,
    attributes: Vec<JsonKeyValue>,
    events: Vec<JsonEvent>,
    status: JsonStatus,
}

impl From<SpanData> for JsonSpan {
    fn from(span: SpanData) -> Self {
        let parent_span_id = if span.parent_span_id == spanwire::trace::SpanId::INVALID {
            String::new()
        } else {
            span.parent_span_id.to_string()
        };
        JsonSpan {
            trace_id: span.span_context.trace_id().to_string(),
            span_id: span.span_context.span_id().to_string(),
            trace_state: span.span_context.trace_state().header().to_string(),
            parent_span_id,
            flags: u32::from(span.span_context.trace_flags().to_u8()),
            name: span.name.into_owned(),
            kind: span_kind(&span.span_kind),
            start_time_unix_nano: to_nanos(span.start_time),
            end_time_unix_nano: to_nanos(span.end_time),
            attributes: attributes(span.attributes),
            events: span.events.into_iter().map(JsonEvent::from).collect(),
            status: span.status.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonEvent {
    time_unix_nano: String,
    name: String,
    attributes: Vec<JsonKeyValue>,
}

impl From<Event> for JsonEvent {
    fn from(event: Event) -> Self {
        JsonEvent {
            time_unix_nano: to_nanos(event.timestamp),
            name: event.name.into_owned(),
            attributes: attributes(event.attributes),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonStatus {
    #[serde(skip_serializing_if = "String::is_empty")]
    message: String,
    code: u8,
}

impl From<Status> for JsonStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Unset => JsonStatus {
                message: String::new(),
                code: 0,
            },
            Status::Ok => JsonStatus {
                message: String::new(),
                code: 1,
            },
            Status::Error { description } => JsonStatus {
                message: description.into_owned(),
                code: 2,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonKeyValue {
    key: String,
    value: AnyValue,
}

#[derive(Debug, PartialEq, Serialize)]
enum AnyValue {
    #[serde(rename = "stringValue")]
    String(String),
    #[serde(rename = "boolValue")]
    Bool(bool),
    #[serde(rename = "intValue")]
    Int(String),
    #[serde(rename = "doubleValue")]
    Double(f64),
    #[serde(rename = "arrayValue")]
    Array(ArrayValue),
}

#[derive(Debug, PartialEq, Serialize)]
struct ArrayValue {
    values: Vec<AnyValue>,
}

impl From<Value> for AnyValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(val) => AnyValue::Bool(val),
            Value::I64(val) => AnyValue::Int(val.to_string()),
            Value::F64(val) => AnyValue::Double(val),
            Value::String(val) => AnyValue::String(val.as_str().to_string()),
            Value::Array(array) => AnyValue::Array(ArrayValue {
                values: match array {
                    Array::Bool(vals) => vals.into_iter().map(AnyValue::Bool).collect(),
                    Array::I64(vals) => vals
                        .into_iter()
                        .map(|val| AnyValue::Int(val.to_string()))
                        .collect(),
                    Array::F64(vals) => vals.into_iter().map(AnyValue::Double).collect(),
                    Array::String(vals) => vals
                        .into_iter()
                        .map(|val| AnyValue::String(val.as_str().to_string()))
                        .collect(),
                    other => vec![AnyValue::String(Value::Array(other).as_str().into_owned())],
                },
            }),
            other => AnyValue::String(other.as_str().into_owned()),
        }
    }
}

fn attributes(kvs: Vec<KeyValue>) -> Vec<JsonKeyValue> {
    kvs.into_iter()
        .map(|kv| JsonKeyValue {
            key: kv.key.as_str().to_string(),
            value: kv.value.into(),
        })
        .collect()
}

fn span_kind(kind: &SpanKind) -> u8 {
    match kind {
        SpanKind::Internal => 1,
        SpanKind::Server => 2,
        SpanKind::Client => 3,
        SpanKind::Producer => 4,
        SpanKind::Consumer => 5,
    }
}

fn to_nanos(time: SystemTime) -> String {
    time.duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or(0)
        .to_string()
}
