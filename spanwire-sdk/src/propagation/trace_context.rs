//! # W3C Trace Context Propagator
//!
use spanwire::propagation::{Extractor, Injector, TextMapPropagator};
use spanwire::spanwire_debug;
use spanwire::trace::{SpanContext, SpanId, TraceFlags, TraceId, TraceState};

const SUPPORTED_VERSION: u8 = 0;
const TRACEPARENT_HEADER: &str = "traceparent";
const TRACESTATE_HEADER: &str = "tracestate";
const TRACE_CONTEXT_HEADER_FIELDS: &[&str] = &[TRACEPARENT_HEADER, TRACESTATE_HEADER];

/// Propagates `SpanContext`s in [W3C TraceContext] format under `traceparent` and `tracestate` header.
///
/// The `traceparent` header identifies the incoming request in a tracing
/// system in a common format, understood by all vendors:
///
/// `traceparent: 00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01`
///
/// It has four fields: version, trace-id, parent-id and trace-flags. Only
/// version `00` is accepted, every field must be lowercase hex of the exact
/// width, and both ids must be non-zero. Anything else is treated as if no
/// header had been sent.
///
/// The `tracestate` header carries vendor-specific data. It is passed along
/// untouched.
///
/// `tracestate: vendorname1=opaqueValue1,vendorname2=opaqueValue2`
///
/// # Example
///
/// ```
/// use spanwire::propagation::TextMapPropagator;
/// use spanwire_sdk::propagation::TraceContextPropagator;
/// use std::collections::HashMap;
///
/// let propagator = TraceContextPropagator::new();
/// let mut headers = HashMap::new();
/// headers.insert(
///     "traceparent".to_string(),
///     "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".to_string(),
/// );
///
/// let parent = propagator.extract(&headers).unwrap();
/// assert!(parent.is_remote());
/// assert!(parent.is_sampled());
/// ```
///
/// [W3C TraceContext]: https://www.w3.org/TR/trace-context/
#[derive(Clone, Debug, Default)]
pub struct TraceContextPropagator {
    _private: (),
}

impl TraceContextPropagator {
    /// Create a new `TraceContextPropagator`.
    pub fn new() -> Self {
        TraceContextPropagator { _private: () }
    }

    /// Extract span context from w3c trace-context header.
    fn extract_span_context(&self, extractor: &dyn Extractor) -> Result<SpanContext, &'static str> {
        let header = extractor.get(TRACEPARENT_HEADER).ok_or("missing header")?;
        let parts = header.trim().split('-').collect::<Vec<&str>>();
        if parts.len() != 4 {
            return Err("expected four fields");
        }

        if parts[0] != "00" {
            return Err("unsupported version");
        }
        if !is_lower_hex(parts[1], 32) {
            return Err("malformed trace id");
        }
        if !is_lower_hex(parts[2], 16) {
            return Err("malformed span id");
        }
        if !is_lower_hex(parts[3], 2) {
            return Err("malformed trace flags");
        }

        let trace_id = TraceId::from_hex(parts[1]).map_err(|_| "malformed trace id")?;
        let span_id = SpanId::from_hex(parts[2]).map_err(|_| "malformed span id")?;
        let opts = u8::from_str_radix(parts[3], 16).map_err(|_| "malformed trace flags")?;

        // Ensure opts are valid for version 0
        if opts > 2 {
            return Err("unknown trace flags for version 00");
        }

        // Build trace flags clearing all flags other than the trace-context
        // supported sampling bit.
        let trace_flags = TraceFlags::new(opts) & TraceFlags::SAMPLED;

        let trace_state = extractor
            .get(TRACESTATE_HEADER)
            .map(|state| TraceState::from_header(state.into_owned()))
            .unwrap_or(TraceState::NONE);

        let span_context = SpanContext::new(trace_id, span_id, trace_flags, true, trace_state);
        if !span_context.is_valid() {
            return Err("zero trace id or span id");
        }

        Ok(span_context)
    }
}

fn is_lower_hex(field: &str, width: usize) -> bool {
    field.len() == width && field.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl TextMapPropagator for TraceContextPropagator {
    /// Properly encodes the values of the `SpanContext` and injects them
    /// into the `Injector`.
    fn inject(&self, span_context: &SpanContext, injector: &mut dyn Injector) {
        if !span_context.is_valid() {
            return;
        }
        let header_value = format!(
            "{:02x}-{}-{}-{:02x}",
            SUPPORTED_VERSION,
            span_context.trace_id(),
            span_context.span_id(),
            (span_context.trace_flags() & TraceFlags::SAMPLED).to_u8()
        );
        injector.set(TRACEPARENT_HEADER, header_value);
        if !span_context.trace_state().is_empty() {
            injector.set(
                TRACESTATE_HEADER,
                span_context.trace_state().header().to_string(),
            );
        }
    }

    /// Retrieves encoded `SpanContext`s using the `Extractor`. Returns `None`
    /// when no header is present or it fails validation.
    fn extract(&self, extractor: &dyn Extractor) -> Option<SpanContext> {
        match self.extract_span_context(extractor) {
            Ok(span_context) => Some(span_context),
            Err(reason) => {
                if extractor.get(TRACEPARENT_HEADER).is_some() {
                    spanwire_debug!(name: "TraceContextPropagator.InvalidTraceparent", reason = reason);
                }
                None
            }
        }
    }

    fn fields(&self) -> &'static [&'static str] {
        TRACE_CONTEXT_HEADER_FIELDS
    }
}
