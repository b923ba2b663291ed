//! Head sampling.
//!
//! The decision is made once, when a root span starts, and travels with the
//! trace in the `sampled` trace flag. It is a pure function of the trace id,
//! so every process that sees the same trace id and ratio agrees on it.
use spanwire::trace::{SpanContext, TraceId};

/// The result of sampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplingDecision {
    /// The span is non-recording and not exported.
    Drop,
    /// The span is recorded and exported.
    RecordAndSample,
}

/// Policy deciding whether a new span is sampled.
#[derive(Clone, Debug, PartialEq)]
pub enum Sampler {
    /// Always sample the trace
    AlwaysOn,
    /// Never sample the trace
    AlwaysOff,
    /// Respects the parent span's sampling decision or delegates a delegate sampler for root spans.
    ParentBased(Box<Sampler>),
    /// Sample a given fraction of traces. Fractions >= 1 will always sample.
    /// Fractions < 0 are treated as zero.
    TraceIdRatioBased(f64),
}

impl Sampler {
    /// Decide for a span with the given parent and trace id.
    ///
    /// Only a *valid* parent counts: an invalid context is the same as none.
    pub fn should_sample(&self, parent: Option<&SpanContext>, trace_id: TraceId) -> SamplingDecision {
        match self {
            Sampler::AlwaysOn => SamplingDecision::RecordAndSample,
            Sampler::AlwaysOff => SamplingDecision::Drop,
            Sampler::ParentBased(delegate) => match parent.filter(|cx| cx.is_valid()) {
                Some(cx) if cx.is_sampled() => SamplingDecision::RecordAndSample,
                Some(_) => SamplingDecision::Drop,
                None => delegate.should_sample(None, trace_id),
            },
            Sampler::TraceIdRatioBased(ratio) => {
                if should_sample(trace_id, *ratio) {
                    SamplingDecision::RecordAndSample
                } else {
                    SamplingDecision::Drop
                }
            }
        }
    }
}

/// Deterministic ratio sampling on a trace id.
///
/// The low 8 bytes of the id, read big-endian and shifted right by one, are
/// compared against `ratio * 2^63`. A ratio of `1.0` or more always samples,
/// `0.0` or less never does.
///
/// ```
/// use spanwire::trace::TraceId;
/// use spanwire_sdk::trace::should_sample;
///
/// let id = TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap();
/// assert!(should_sample(id, 1.0));
/// assert!(!should_sample(id, 0.0));
/// ```
pub fn should_sample(trace_id: TraceId, ratio: f64) -> bool {
    if ratio >= 1.0 {
        return true;
    }
    let upper_bound = (ratio.max(0.0) * (1u64 << 63) as f64) as u64;
    let bytes = trace_id.to_bytes();
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[8..]);
    let rnd_from_trace_id = u64::from_be_bytes(low) >> 1;

    rnd_from_trace_id < upper_bound
}
