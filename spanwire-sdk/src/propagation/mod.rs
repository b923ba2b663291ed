//! Propagators
mod trace_context;

pub use trace_context::TraceContextPropagator;
