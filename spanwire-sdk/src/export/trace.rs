//! Trace exporters
use crate::error::TraceError;
use crate::Resource;
use futures_util::future::BoxFuture;
use spanwire::trace::{Event, SpanContext, SpanId, SpanKind, Status};
use spanwire::KeyValue;
use std::borrow::Cow;
use std::fmt::Debug;
use std::time::SystemTime;

/// Describes the result of an export.
pub type ExportResult = Result<(), TraceError>;

/// `SpanExporter` is the sink at the end of the batch pipeline.
///
/// Implementations encode a batch and transmit it somewhere. They are driven
/// from the batch processor's background thread, one call at a time: `export`
/// is never called again before the previous future resolves.
///
/// Failures are reported through the returned future. The processor logs them
/// and drops the batch; retrying is up to the exporter.
pub trait SpanExporter: Send + Sync + Debug {
    /// Exports a batch of ended spans.
    ///
    /// The returned future is bounded by the processor's export timeout; a
    /// future that never resolves is abandoned once the timeout elapses.
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult>;

    /// Shuts down the exporter. Called once, after the final flush.
    ///
    /// After the call to `shutdown`, subsequent calls to `export` should
    /// return an error.
    fn shutdown(&mut self) {}

    /// Set the resource for the exporter.
    ///
    /// Called once by `Tracer::initialize` before any span is exported.
    fn set_resource(&mut self, _resource: &Resource) {}
}

/// `SpanData` contains everything recorded on a span once it has ended.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanData {
    /// Exportable `SpanContext`
    pub span_context: SpanContext,
    /// Span parent id, [`SpanId::INVALID`] for root spans
    pub parent_span_id: SpanId,
    /// Span kind
    pub span_kind: SpanKind,
    /// Span name
    pub name: Cow<'static, str>,
    /// Span start time
    pub start_time: SystemTime,
    /// Span end time
    pub end_time: SystemTime,
    /// Span attributes, unique by key, in first-write order
    pub attributes: Vec<KeyValue>,
    /// Span events in the order they were added
    pub events: Vec<Event>,
    /// Span status
    pub status: Status,
    /// Resource of the tracer that produced this span.
    pub resource: Resource,
}
