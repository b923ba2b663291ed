//! Trace identifiers and the data a span carries.
//!
//! A trace is a tree of spans sharing one [`TraceId`]. Every span is
//! identified by a [`SpanId`] and described by its [`SpanContext`], which is
//! the part that crosses process boundaries.
//!
//! The types here are plain data. Starting, ending and exporting spans is the
//! job of `spanwire-sdk`.
use crate::KeyValue;
use std::borrow::Cow;
use std::time::SystemTime;

mod ids;
mod span_context;

pub use ids::{SpanId, TraceFlags, TraceId};
pub use span_context::{SpanContext, TraceState};

/// `SpanKind` describes the relationship between the span, its parents, and
/// its children in a trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// The span covers the server side handling of a remote request.
    Server,
    /// The span describes a request to some remote service.
    Client,
    /// The span describes the initiator of an asynchronous request.
    Producer,
    /// The span describes a child of an asynchronous producer request.
    Consumer,
    /// Default value. The span represents an internal operation within an
    /// application.
    #[default]
    Internal,
}

impl SpanKind {
    /// Lower-case name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Server => "server",
            SpanKind::Client => "client",
            SpanKind::Producer => "producer",
            SpanKind::Consumer => "consumer",
            SpanKind::Internal => "internal",
        }
    }
}

/// The outcome of the operation a span represents.
///
/// Setting a status replaces the previous one: the last call wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Status {
    /// Nothing was recorded.
    #[default]
    Unset,

    /// The operation failed.
    Error {
        /// Short human readable description of the failure.
        description: Cow<'static, str>,
    },

    /// The operation completed successfully.
    Ok,
}

impl Status {
    /// Create a new error status with a given description.
    ///
    /// # Examples
    ///
    /// ```
    /// use spanwire::trace::Status;
    ///
    /// let status = Status::error("HTTP 503");
    /// assert!(status.is_error());
    /// ```
    pub fn error(description: impl Into<Cow<'static, str>>) -> Self {
        Status::Error {
            description: description.into(),
        }
    }

    /// Returns `true` for [`Status::Error`].
    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error { .. })
    }

    /// Lower-case name used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Status::Unset => "unset",
            Status::Ok => "ok",
            Status::Error { .. } => "error",
        }
    }
}

/// A timestamped annotation inside a span.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Event {
    /// The name of this event.
    pub name: Cow<'static, str>,

    /// The time at which this event occurred.
    pub timestamp: SystemTime,

    /// Attributes that describe this event.
    pub attributes: Vec<KeyValue>,
}

impl Event {
    /// Create a new `Event`.
    pub fn new<T: Into<Cow<'static, str>>>(
        name: T,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    ) -> Self {
        Event {
            name: name.into(),
            timestamp,
            attributes,
        }
    }

    /// Create a new `Event` with the given name, stamped now, without
    /// attributes.
    pub fn with_name<T: Into<Cow<'static, str>>>(name: T) -> Self {
        Event::new(name, crate::time::now(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_keeps_description() {
        let status = Status::error(format!("HTTP {}", 404));
        assert_eq!(
            status,
            Status::Error {
                description: "HTTP 404".into()
            }
        );
        assert_eq!(status.code(), "error");
        assert!(!Status::Ok.is_error());
        assert_eq!(Status::default(), Status::Unset);
    }

    #[test]
    fn span_kind_defaults_to_internal() {
        assert_eq!(SpanKind::default(), SpanKind::Internal);
        assert_eq!(SpanKind::Client.as_str(), "client");
    }

    #[test]
    fn event_with_name_has_no_attributes() {
        let event = Event::with_name("cache.miss");
        assert_eq!(event.name, "cache.miss");
        assert!(event.attributes.is_empty());
    }
}
