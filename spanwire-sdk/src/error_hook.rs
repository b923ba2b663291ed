//! # Error Hook
//!
//! Turns failures that reach the top of the application into error spans.
//!
//! Two kinds of failure are covered. Panics are caught by a process-wide hook
//! installed with [`ErrorHook::install_panic_hook`]. Errors that escaped a
//! detached task, and would otherwise only be printed or lost, are handed
//! over explicitly with [`ErrorHook::report_error`].
//!
//! While the tracer is uninitialized the hook stays out of the way: panics go
//! to the previously installed hook and reported errors to stderr, and no span
//! is created. In debug mode both are traced *and* forwarded.
use crate::trace::{panic_message, short_type_name, Tracer};
use spanwire::trace::{SpanKind, Status};
use spanwire::{spanwire_debug, KeyValue};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::panic::{self, PanicHookInfo};
use std::thread;

/// Name of the span created for a panic.
pub const UNCAUGHT_PANIC_SPAN_NAME: &str = "uncaught_panic";
/// Name of the span created by [`ErrorHook::report_error`].
pub const UNHANDLED_ERROR_SPAN_NAME: &str = "unhandled_error";

const ERROR_TYPE: &str = "error.type";
const ERROR_LIBRARY: &str = "error.library";
const ERROR_CONTEXT: &str = "error.context";

/// Reports top-level failures through a [`Tracer`].
///
/// # Example
///
/// ```no_run
/// use spanwire_sdk::error_hook::ErrorHook;
/// use spanwire_sdk::trace::Tracer;
///
/// let tracer = Tracer::new();
/// // tracer.initialize(...)
/// let hook = ErrorHook::new(tracer);
/// hook.install_panic_hook();
///
/// let err = std::io::Error::other("connection reset");
/// hook.report_error(&err, "worker-pool", "background sync");
/// ```
#[derive(Clone, Debug)]
pub struct ErrorHook {
    tracer: Tracer,
}

impl ErrorHook {
    /// Create a hook reporting through `tracer`.
    pub fn new(tracer: Tracer) -> Self {
        ErrorHook { tracer }
    }

    /// Install a panic hook that records every panic as an
    /// `uncaught_panic` span.
    ///
    /// The hook chains to whatever hook was installed before, so the usual
    /// panic message still appears when the tracer is uninitialized or in
    /// debug mode.
    pub fn install_panic_hook(&self) {
        let previous = panic::take_hook();
        let hook = self.clone();
        panic::set_hook(Box::new(move |info| {
            if hook.on_panic(info) {
                previous(info);
            }
        }));
    }

    /// Record an error that escaped to the top of a task as an
    /// `unhandled_error` span.
    ///
    /// `library` names the component the error came from and `context`
    /// describes what was running.
    pub fn report_error<E>(&self, err: &E, library: &str, context: &str)
    where
        E: Error + ?Sized,
    {
        let traced = self.trace_failure(
            UNHANDLED_ERROR_SPAN_NAME,
            short_type_name::<E>(),
            err.to_string(),
            library,
            context,
        );
        if self.forwards(traced) {
            eprintln!("unhandled error in {library} ({context}): {err}");
        }
    }

    /// Returns `true` if the previous hook should run too.
    fn on_panic(&self, info: &PanicHookInfo<'_>) -> bool {
        let message = panic_message(info.payload());
        let library = info.location().map_or("unknown", |location| location.file());
        let context = match info.location() {
            Some(location) => format!(
                "thread '{}' at {}:{}:{}",
                thread::current().name().unwrap_or("<unnamed>"),
                location.file(),
                location.line(),
                location.column()
            ),
            None => format!(
                "thread '{}'",
                thread::current().name().unwrap_or("<unnamed>")
            ),
        };

        let traced =
            self.trace_failure(UNCAUGHT_PANIC_SPAN_NAME, "panic", message, library, &context);
        self.forwards(traced)
    }

    /// Untraced failures always go to the default presenter, traced ones
    /// only in debug mode.
    fn forwards(&self, traced: bool) -> bool {
        !traced || self.tracer.is_debug()
    }

    /// Returns `false` when nothing was traced.
    fn trace_failure(
        &self,
        span_name: &'static str,
        error_type: &str,
        message: String,
        library: &str,
        context: &str,
    ) -> bool {
        let attributes = vec![
            KeyValue::new(ERROR_TYPE, error_type.to_string()),
            KeyValue::new(ERROR_LIBRARY, library.to_string()),
            KeyValue::new(ERROR_CONTEXT, context.to_string()),
        ];
        let mut span = match self
            .tracer
            .start_span(span_name, SpanKind::Internal, attributes, None)
        {
            Ok(span) => span,
            Err(err) => {
                spanwire_debug!(name: "ErrorHook.NotTraced", reason = err.to_string());
                return false;
            }
        };

        span.record_exception_with(error_type, message.clone(), captured_backtrace(), Vec::new());
        span.set_status(Status::error(message));
        span.end();
        true
    }
}

fn captured_backtrace() -> Option<String> {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}
