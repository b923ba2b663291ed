//! API types for the spanwire tracing runtime.
//!
//! This crate holds everything that is shared between code producing spans
//! and code shipping them:
//!
//! - [`KeyValue`], [`Key`] and [`Value`]: the attribute codec. Values are a
//!   closed set of scalar types and homogeneous arrays; anything else is
//!   coerced into its string form at the call boundary.
//! - [`trace`]: trace and span identifiers, [`trace::SpanContext`],
//!   [`trace::Status`], [`trace::SpanKind`] and span events.
//! - [`propagation`]: the [`propagation::Injector`] and
//!   [`propagation::Extractor`] carrier traits used by the W3C trace context
//!   propagator.
//!
//! Span creation, sampling and export live in the `spanwire-sdk` crate.
//!
//! # Example
//!
//! ```
//! use spanwire::{KeyValue, Value};
//!
//! let attrs = [
//!     KeyValue::new("http.method", "GET"),
//!     KeyValue::new("retries", 3_i64),
//!     KeyValue::new("ratio", 0.25),
//!     KeyValue::new("tags", vec!["a", "b"]),
//! ];
//! assert_eq!(attrs[1].value, Value::I64(3));
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
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]
#![cfg_attr(test, deny(warnings))]

mod common;
mod internal_logging;

pub use common::{Array, Key, KeyValue, StringValue, Value};

pub mod propagation;

pub mod trace;

#[doc(hidden)]
pub mod time {
    use std::time::SystemTime;

    #[doc(hidden)]
    pub fn now() -> SystemTime {
        SystemTime::now()
    }
}

#[doc(hidden)]
#[cfg(feature = "internal-logs")]
pub mod _private {
    pub use tracing::{debug, error, info, warn};
}
