use super::{SpanId, TraceFlags, TraceId};
use std::fmt;

/// Vendor-specific trace state, carried as the raw `tracestate` header value.
///
/// The runtime never interprets or rewrites it: whatever arrived on the
/// incoming request is attached to child spans and sent on outgoing ones.
/// An empty header is the same as no header.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct TraceState(Option<String>);

impl TraceState {
    /// No trace state.
    pub const NONE: TraceState = TraceState(None);

    /// Wrap a raw `tracestate` header value. Blank values yield [`TraceState::NONE`].
    ///
    /// ```
    /// use spanwire::trace::TraceState;
    ///
    /// assert_eq!(TraceState::from_header("vendor=abc").header(), "vendor=abc");
    /// assert!(TraceState::from_header("  ").is_empty());
    /// ```
    pub fn from_header(header: impl Into<String>) -> Self {
        let header = header.into();
        if header.trim().is_empty() {
            TraceState::NONE
        } else {
            TraceState(Some(header))
        }
    }

    /// The header value, or `""` when there is none.
    pub fn header(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }

    /// Returns `true` if there is nothing to propagate.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Display for TraceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Immutable portion of a span which can be serialized and propagated.
///
/// This representation conforms to the [W3C TraceContext specification].
///
/// [W3C TraceContext specification]: https://www.w3.org/TR/trace-context
#[derive(Clone, Debug, PartialEq, Hash, Eq)]
pub struct SpanContext {
    trace_id: TraceId,
    span_id: SpanId,
    trace_flags: TraceFlags,
    is_remote: bool,
    trace_state: TraceState,
}

impl SpanContext {
    /// An invalid span context
    pub const NONE: SpanContext = SpanContext {
        trace_id: TraceId::INVALID,
        span_id: SpanId::INVALID,
        trace_flags: TraceFlags::NOT_SAMPLED,
        is_remote: false,
        trace_state: TraceState::NONE,
    };

    /// Create an invalid empty span context
    pub fn empty_context() -> Self {
        SpanContext::NONE
    }

    /// Construct a new `SpanContext`
    pub fn new(
        trace_id: TraceId,
        span_id: SpanId,
        trace_flags: TraceFlags,
        is_remote: bool,
        trace_state: TraceState,
    ) -> Self {
        SpanContext {
            trace_id,
            span_id,
            trace_flags,
            is_remote,
            trace_state,
        }
    }

    /// The [`TraceId`] for this span context.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The [`SpanId`] for this span context.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// Returns details about the trace.
    pub fn trace_flags(&self) -> TraceFlags {
        self.trace_flags
    }

    /// Returns `true` if the span context has a valid (non-zero) `trace_id` and a
    /// valid (non-zero) `span_id`.
    pub fn is_valid(&self) -> bool {
        self.trace_id != TraceId::INVALID && self.span_id != SpanId::INVALID
    }

    /// Returns `true` if the span context was propagated from a remote parent.
    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    /// Returns `true` if the `sampled` trace flag is set.
    pub fn is_sampled(&self) -> bool {
        self.trace_flags.is_sampled()
    }

    /// A reference to the span context's [`TraceState`].
    pub fn trace_state(&self) -> &TraceState {
        &self.trace_state
    }
}
