//! In-memory exporters for testing purpose.

/// Structs used for testing
pub mod trace;
