//! The panic hook is process-wide, so this file holds a single test.
use futures_util::future::{self, BoxFuture};
use spanwire::trace::Status;
use spanwire::{Key, Value};
use spanwire_sdk::error_hook::{ErrorHook, UNCAUGHT_PANIC_SPAN_NAME};
use spanwire_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use spanwire_sdk::trace::{Tracer, TracerConfig, EXCEPTION_EVENT_NAME};
use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Clone, Debug, Default)]
struct CollectingExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl SpanExporter for CollectingExporter {
    fn export(&mut self, mut batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        self.spans.lock().unwrap().append(&mut batch);
        Box::pin(future::ready(Ok(())))
    }
}

fn panic_in_thread(name: &str) {
    let result = thread::Builder::new()
        .name(name.to_string())
        .spawn(|| {
            let items: Vec<u32> = Vec::new();
            if items.is_empty() {
                panic!("worker ran out of items");
            }
        })
        .unwrap()
        .join();
    assert!(result.is_err());
}

fn attribute(span: &SpanData, key: &'static str) -> Option<Value> {
    let key = Key::from_static_str(key);
    span.attributes
        .iter()
        .find(|kv| kv.key == key)
        .map(|kv| kv.value.clone())
}

#[test]
fn panics_become_error_spans_and_reach_previous_hook_per_mode() {
    let previous_calls = Arc::new(AtomicUsize::new(0));
    let counter = previous_calls.clone();
    panic::set_hook(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let exporter = CollectingExporter::default();
    let tracer = Tracer::new();
    ErrorHook::new(tracer.clone()).install_panic_hook();

    // Uninitialized: only the previous hook sees the panic.
    panic_in_thread("before-init");
    assert_eq!(previous_calls.load(Ordering::SeqCst), 1);

    // Traced, not forwarded.
    tracer
        .initialize(TracerConfig::builder("hooked").build(), exporter.clone())
        .unwrap();
    panic_in_thread("worker-1");
    tracer.shutdown().unwrap();
    assert_eq!(previous_calls.load(Ordering::SeqCst), 1);
    assert_eq!(exporter.spans.lock().unwrap().len(), 1);

    // Debug mode: traced and forwarded.
    tracer
        .initialize(
            TracerConfig::builder("hooked").with_debug(true).build(),
            exporter.clone(),
        )
        .unwrap();
    panic_in_thread("worker-2");
    tracer.shutdown().unwrap();
    assert_eq!(previous_calls.load(Ordering::SeqCst), 2);

    let spans = exporter.spans.lock().unwrap().clone();
    assert_eq!(spans.len(), 2);
    assert!(spans[1]
        .attributes
        .iter()
        .any(|kv| kv.value.as_str().starts_with("thread 'worker-2' at ")));
    let span = &spans[0];
    assert_eq!(span.name, UNCAUGHT_PANIC_SPAN_NAME);
    assert_eq!(span.status, Status::error("worker ran out of items"));
    assert_eq!(attribute(span, "error.type"), Some(Value::from("panic")));
    assert!(attribute(span, "error.library")
        .map(|library| library.as_str().ends_with("panic_hook.rs"))
        .unwrap_or(false));
    assert!(attribute(span, "error.context")
        .map(|context| context.as_str().starts_with("thread 'worker-1' at "))
        .unwrap_or(false));
    assert_eq!(span.events[0].name, EXCEPTION_EVENT_NAME);
}
