//! Telemetry Export
pub mod trace;

pub use crate::error::ExportError;
