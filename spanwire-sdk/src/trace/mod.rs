//! # Trace SDK
//!
//! The tracing SDK consist of a few main structs:
//!
//! * The [`Tracer`] handle, which owns the pipeline and starts spans.
//! * The [`Span`] struct with is a mutable object storing information about the
//!   current operation execution.
//! * The [`BatchSpanProcessor`], which queues ended spans and hands them to a
//!   [`SpanExporter`] on a background thread.
//!
//! [`SpanExporter`]: crate::export::trace::SpanExporter
mod config;
mod id_generator;
mod sampler;
mod span;
mod span_processor;
mod tracer;

pub use config::{TracerConfig, TracerConfigBuilder};
#[cfg(any(test, feature = "testing"))]
pub use id_generator::IncrementIdGenerator;
pub use id_generator::{IdGenerator, RandomIdGenerator};
pub use sampler::{should_sample, Sampler, SamplingDecision};
pub use span::{Span, EXCEPTION_EVENT_NAME};
pub use span_processor::{BatchConfig, BatchConfigBuilder, BatchSpanProcessor};
pub use tracer::{SpanBuilder, Tracer};

pub(crate) use span::{panic_message, short_type_name};
