//! In-memory trace exporter and span fixtures for tests.

/// The `in_memory_exporter` module provides in-memory trace functionalities.
pub mod in_memory_exporter;
pub use in_memory_exporter::{InMemorySpanExporter, InMemorySpanExporterBuilder};

use crate::export::trace::SpanData;
use crate::Resource;
use spanwire::trace::{SpanContext, SpanId, SpanKind, Status, TraceFlags, TraceId, TraceState};

/// A sampled, ended span with fixed ids, ready to hand to a processor.
pub fn new_test_export_span_data() -> SpanData {
    let now = spanwire::time::now();
    SpanData {
        span_context: SpanContext::new(
            TraceId::from_u128(0x4bf92f3577b34da6a3ce929d0e0e4736),
            SpanId::from_u64(0x00f067aa0ba902b7),
            TraceFlags::SAMPLED,
            false,
            TraceState::NONE,
        ),
        parent_span_id: SpanId::INVALID,
        span_kind: SpanKind::Internal,
        name: "spanwire".into(),
        start_time: now,
        end_time: now,
        attributes: Vec::new(),
        events: Vec::new(),
        status: Status::Unset,
        resource: Resource::empty(),
    }
}
