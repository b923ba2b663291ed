//! # spanwire SDK
//!
//! The runtime half of spanwire: it decides which spans to keep, collects
//! what they record, and ships them out of the process.
//!
//! * [`trace::Tracer`] is an explicit, cloneable handle that starts spans.
//!   There is no global tracer.
//! * [`trace::Sampler`] makes a deterministic head-sampling decision from the
//!   trace id.
//! * [`trace::BatchSpanProcessor`] queues ended spans and exports them from a
//!   background thread through a [`export::trace::SpanExporter`].
//! * [`propagation::TraceContextPropagator`] reads and writes W3C
//!   `traceparent` / `tracestate` headers.
//! * [`error_hook::ErrorHook`] turns panics and escaped errors into error
//!   spans.
//!
//! ## Getting started
//!
//! ```
//! use futures_util::future::BoxFuture;
//! use spanwire::propagation::TextMapPropagator;
//! use spanwire::trace::SpanKind;
//! use spanwire::KeyValue;
//! use spanwire_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
//! use spanwire_sdk::propagation::TraceContextPropagator;
//! use spanwire_sdk::trace::{Tracer, TracerConfig};
//! use std::collections::HashMap;
//!
//! #[derive(Debug)]
//! struct StdoutExporter;
//!
//! impl SpanExporter for StdoutExporter {
//!     fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
//!         for span in batch {
//!             println!("{} {}", span.span_context.trace_id(), span.name);
//!         }
//!         Box::pin(std::future::ready(Ok(())))
//!     }
//! }
//!
//! let tracer = Tracer::new();
//! tracer
//!     .initialize(TracerConfig::builder("checkout").build(), StdoutExporter)
//!     .unwrap();
//!
//! let mut span = tracer
//!     .start_span("charge card", SpanKind::Client, vec![KeyValue::new("amount", 42_i64)], None)
//!     .unwrap();
//!
//! let mut headers = HashMap::new();
//! TraceContextPropagator::new().inject(span.span_context(), &mut headers);
//! assert!(headers.contains_key("traceparent"));
//!
//! span.end();
//! tracer.shutdown().unwrap();
//! ```
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![allow(clippy::needless_doctest_main)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod error;
pub mod error_hook;
pub mod export;
pub mod propagation;
pub mod resource;
#[cfg(any(test, feature = "testing"))]
#[doc(hidden)]
pub mod testing;
pub mod trace;

pub use error::{TraceError, TraceResult, UsageError};
pub use resource::Resource;
