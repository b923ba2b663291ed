//! Errors surfaced by the tracing runtime.
use std::sync::PoisonError;
use std::time::Duration;
use thiserror::Error;

/// Describe the result of operations in tracing API.
pub type TraceResult<T> = Result<T, TraceError>;

/// Errors returned by the tracer, the batch processor and exporters.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    /// The tracer was used in the wrong lifecycle state.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// The tracer configuration failed validation.
    #[error("invalid tracer configuration: {0}")]
    InvalidConfig(String),

    /// Export failed with the error returned by the exporter
    #[error("exporter {name} failed: {0}", name = .0.exporter_name())]
    ExportFailed(Box<dyn ExportError>),

    /// Export failed to finish within the configured timeout and was abandoned.
    #[error("exporting timed out after {} ms", .0.as_millis())]
    ExportTimedOut(Duration),

    /// The batch processor has already been shut down.
    #[error("batch span processor already shut down")]
    Closed,

    /// Other errors propagated from trace SDK that weren't covered above
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Calling a tracer operation in a lifecycle state that does not allow it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum UsageError {
    /// The tracer has not been initialized, or has been shut down.
    #[error("tracer is not initialized")]
    Uninitialized,

    /// `initialize` was called on a tracer that is already running.
    #[error("tracer is already initialized")]
    AlreadyInitialized,
}

/// Trait for errors returned by exporters
pub trait ExportError: std::error::Error + Send + Sync + 'static {
    /// The name of exporter that returned this error
    fn exporter_name(&self) -> &'static str;
}

impl<T> From<T> for TraceError
where
    T: ExportError,
{
    fn from(err: T) -> Self {
        TraceError::ExportFailed(Box::new(err))
    }
}

impl From<String> for TraceError {
    fn from(err_msg: String) -> Self {
        TraceError::Other(Box::new(Custom(err_msg)))
    }
}

impl From<&'static str> for TraceError {
    fn from(err_msg: &'static str) -> Self {
        TraceError::Other(Box::new(Custom(err_msg.into())))
    }
}

impl<T> From<PoisonError<T>> for TraceError {
    fn from(err: PoisonError<T>) -> Self {
        TraceError::Other(Box::new(Custom(err.to_string())))
    }
}

/// Wrap type for string
#[derive(Error, Debug)]
#[error("{0}")]
struct Custom(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Error, Debug)]
    #[error("connection refused")]
    struct SinkDown;

    impl ExportError for SinkDown {
        fn exporter_name(&self) -> &'static str {
            "test-sink"
        }
    }

    #[test]
    fn export_errors_name_their_exporter() {
        let err = TraceError::from(SinkDown);
        assert!(matches!(err, TraceError::ExportFailed(_)));
        assert_eq!(err.to_string(), "exporter test-sink failed: connection refused");
    }

    #[test]
    fn usage_errors_are_transparent() {
        let err = TraceError::from(UsageError::Uninitialized);
        assert_eq!(err.to_string(), "tracer is not initialized");
        assert!(matches!(
            err,
            TraceError::Usage(UsageError::Uninitialized)
        ));
    }

    #[test]
    fn strings_become_other() {
        assert_eq!(TraceError::from("boom").to_string(), "boom");
        assert_eq!(
            TraceError::ExportTimedOut(Duration::from_millis(50)).to_string(),
            "exporting timed out after 50 ms"
        );
    }
}
