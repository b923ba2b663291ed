//! # Tracer
//!
//! The [`Tracer`] is an explicit, cloneable handle. There is no process-wide
//! tracer: code that creates spans is handed a `Tracer`, and every clone
//! shares the same state.
//!
//! A tracer starts uninitialized. [`Tracer::initialize`] validates a
//! [`TracerConfig`], builds the resource and the sampler, and starts the
//! batch processor in front of the given exporter. [`Tracer::shutdown`]
//! flushes and returns the tracer to the uninitialized state, from which it
//! can be initialized again.
use crate::error::{TraceError, TraceResult, UsageError};
use crate::export::trace::SpanExporter;
use crate::resource::Resource;
use crate::trace::span::{panic_message, short_type_name, SpanFields};
use crate::trace::{
    BatchSpanProcessor, IdGenerator, Sampler, SamplingDecision, Span, TracerConfig,
};
use spanwire::trace::{SpanContext, SpanId, SpanKind, Status, TraceFlags, TraceState};
use futures_util::FutureExt;
use spanwire::{spanwire_info, KeyValue};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

/// Everything an initialized tracer owns. Spans keep it alive until they end.
#[derive(Debug)]
pub(crate) struct Pipeline {
    pub(crate) config: TracerConfig,
    pub(crate) sampler: Sampler,
    pub(crate) id_generator: Arc<dyn IdGenerator>,
    pub(crate) processor: BatchSpanProcessor,
    pub(crate) resource: Resource,
}

/// Handle used to create spans.
///
/// # Example
///
/// ```
/// use futures_util::future::BoxFuture;
/// use spanwire::trace::SpanKind;
/// use spanwire::KeyValue;
/// use spanwire_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
/// use spanwire_sdk::trace::{Tracer, TracerConfig};
///
/// #[derive(Debug)]
/// struct NoopExporter;
///
/// impl SpanExporter for NoopExporter {
///     fn export(&mut self, _batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
///         Box::pin(std::future::ready(Ok(())))
///     }
/// }
///
/// let tracer = Tracer::new();
/// tracer
///     .initialize(TracerConfig::builder("checkout").build(), NoopExporter)
///     .unwrap();
///
/// let total = tracer
///     .in_span("compute", SpanKind::Internal, vec![], |span| {
///         span.set_attribute(KeyValue::new("items", 3_i64));
///         Ok::<_, std::num::ParseIntError>("42".parse::<i64>()? * 3)
///     })
///     .unwrap();
/// assert_eq!(total, Ok(126));
///
/// tracer.shutdown().unwrap();
/// ```
#[derive(Clone, Default)]
pub struct Tracer {
    inner: Arc<RwLock<Option<Arc<Pipeline>>>>,
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let service_name = self
            .pipeline()
            .ok()
            .map(|pipeline| pipeline.config.service_name().to_string());
        f.debug_struct("Tracer")
            .field("service_name", &service_name)
            .finish()
    }
}

impl Tracer {
    /// Create an uninitialized tracer.
    pub fn new() -> Self {
        Tracer::default()
    }

    /// Validate `config` and start exporting to `exporter`.
    ///
    /// # Errors
    ///
    /// * [`UsageError::AlreadyInitialized`] if the tracer is running
    /// * [`TraceError::InvalidConfig`] if `config` fails validation
    pub fn initialize<E>(&self, config: TracerConfig, mut exporter: E) -> TraceResult<()>
    where
        E: SpanExporter + 'static,
    {
        let mut guard = self.inner.write()?;
        if guard.is_some() {
            return Err(UsageError::AlreadyInitialized.into());
        }
        config.validate()?;

        let resource = config.build_resource();
        exporter.set_resource(&resource);
        let processor = BatchSpanProcessor::new(exporter, config.batch_config().clone())?;

        spanwire_info!(
            name: "Tracer.Initialized",
            service_name = config.service_name(),
            sampling_ratio = config.sampling_ratio(),
        );
        *guard = Some(Arc::new(Pipeline {
            sampler: Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                config.sampling_ratio(),
            ))),
            id_generator: config.id_generator(),
            processor,
            resource,
            config,
        }));
        Ok(())
    }

    /// Returns `true` between `initialize` and `shutdown`.
    pub fn is_initialized(&self) -> bool {
        self.pipeline().is_ok()
    }

    /// The configured debug flag. `false` when uninitialized.
    pub fn is_debug(&self) -> bool {
        self.pipeline()
            .map(|pipeline| pipeline.config.debug())
            .unwrap_or(false)
    }

    /// The resource attached to exported spans, if initialized.
    pub fn resource(&self) -> Option<Resource> {
        self.pipeline().ok().map(|pipeline| pipeline.resource.clone())
    }

    /// Spans dropped because the export queue was full. `0` when
    /// uninitialized.
    pub fn dropped_span_count(&self) -> usize {
        self.pipeline()
            .map(|pipeline| pipeline.processor.dropped_span_count())
            .unwrap_or(0)
    }

    /// Start a span.
    ///
    /// With a valid `parent` the span joins the parent's trace and inherits
    /// its sampled flag and trace state. Otherwise it starts a new trace and
    /// the sampler decides.
    ///
    /// # Errors
    ///
    /// [`UsageError::Uninitialized`] if the tracer is not initialized.
    pub fn start_span<T>(
        &self,
        name: T,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
        parent: Option<&SpanContext>,
    ) -> TraceResult<Span>
    where
        T: Into<Cow<'static, str>>,
    {
        let mut builder = self
            .span_builder(name)
            .with_kind(kind)
            .with_attributes(attributes);
        if let Some(parent) = parent {
            builder = builder.with_parent(parent.clone());
        }
        builder.start(self)
    }

    /// Create a [`SpanBuilder`] for finer control over the new span.
    pub fn span_builder<T>(&self, name: T) -> SpanBuilder
    where
        T: Into<Cow<'static, str>>,
    {
        SpanBuilder::from_name(name)
    }

    /// Run `f` inside a new root span.
    ///
    /// * `Ok`: the span status is set to ok.
    /// * `Err`: the error is recorded as an exception and the status is set
    ///   to error. The error is returned unchanged.
    /// * panic: the panic is recorded, the status is set to error, and the
    ///   panic resumes once the span has ended.
    ///
    /// The span is ended exactly once on every path.
    ///
    /// # Errors
    ///
    /// The outer result fails only if the span could not be started.
    pub fn in_span<T, E, F, N>(
        &self,
        name: N,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
        f: F,
    ) -> TraceResult<Result<T, E>>
    where
        N: Into<Cow<'static, str>>,
        F: FnOnce(&mut Span) -> Result<T, E>,
        E: fmt::Display,
    {
        self.span_builder(name)
            .with_kind(kind)
            .with_attributes(attributes)
            .in_span(self, f)
    }

    /// Async counterpart of [`Tracer::in_span`].
    ///
    /// `f` receives the new span's context, to parent child spans or to
    /// propagate. A panic while creating or polling the future is recorded
    /// like in `in_span` and resumed. If the returned future is dropped
    /// before it completes, the span still ends once, with its status left
    /// unset.
    pub async fn in_span_async<T, E, F, Fut, N>(
        &self,
        name: N,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
        f: F,
    ) -> TraceResult<Result<T, E>>
    where
        N: Into<Cow<'static, str>>,
        F: FnOnce(SpanContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.span_builder(name)
            .with_kind(kind)
            .with_attributes(attributes)
            .in_span_async(self, f)
            .await
    }

    /// Export every ended span now and wait for the exporter.
    pub fn flush(&self) -> TraceResult<()> {
        self.pipeline()?.processor.force_flush()
    }

    /// Flush, stop the batch processor and return to the uninitialized state.
    ///
    /// Spans still open keep their handle but are discarded when they end.
    pub fn shutdown(&self) -> TraceResult<()> {
        let pipeline = self
            .inner
            .write()?
            .take()
            .ok_or(TraceError::Usage(UsageError::Uninitialized))?;
        let result = pipeline.processor.shutdown();
        spanwire_info!(
            name: "Tracer.Shutdown",
            service_name = pipeline.config.service_name(),
            dropped_span_count = pipeline.processor.dropped_span_count(),
        );
        result
    }

    pub(crate) fn pipeline(&self) -> TraceResult<Arc<Pipeline>> {
        self.inner
            .read()?
            .as_ref()
            .cloned()
            .ok_or(TraceError::Usage(UsageError::Uninitialized))
    }
}

/// `SpanBuilder` allows span attributes to be configured before the span
/// has started.
#[derive(Clone, Debug, Default)]
pub struct SpanBuilder {
    name: Cow<'static, str>,
    kind: SpanKind,
    attributes: Vec<KeyValue>,
    parent: Option<SpanContext>,
    start_time: Option<SystemTime>,
}

impl SpanBuilder {
    /// Create a new span builder from a span name
    pub fn from_name<T: Into<Cow<'static, str>>>(name: T) -> Self {
        SpanBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Assign span kind
    pub fn with_kind(self, kind: SpanKind) -> Self {
        SpanBuilder { kind, ..self }
    }

    /// Assign span attributes
    pub fn with_attributes<I>(self, attributes: I) -> Self
    where
        I: IntoIterator<Item = KeyValue>,
    {
        SpanBuilder {
            attributes: attributes.into_iter().collect(),
            ..self
        }
    }

    /// Assign the parent context. Invalid contexts are ignored.
    pub fn with_parent(self, parent: SpanContext) -> Self {
        SpanBuilder {
            parent: Some(parent),
            ..self
        }
    }

    /// Assign span start time
    pub fn with_start_time<T: Into<SystemTime>>(self, start_time: T) -> Self {
        SpanBuilder {
            start_time: Some(start_time.into()),
            ..self
        }
    }

    /// Builds a span with the given tracer from this configuration.
    pub fn start(self, tracer: &Tracer) -> TraceResult<Span> {
        let pipeline = tracer.pipeline()?;
        let parent = self.parent.filter(SpanContext::is_valid);

        let trace_id = match &parent {
            Some(parent) => parent.trace_id(),
            None => pipeline.id_generator.new_trace_id(),
        };
        let span_id = pipeline.id_generator.new_span_id();
        let sampled = pipeline.sampler.should_sample(parent.as_ref(), trace_id)
            == SamplingDecision::RecordAndSample;

        let (parent_span_id, trace_flags, trace_state) = match &parent {
            Some(parent) => (
                parent.span_id(),
                parent.trace_flags().with_sampled(sampled),
                parent.trace_state().clone(),
            ),
            None => (
                SpanId::INVALID,
                TraceFlags::default().with_sampled(sampled),
                TraceState::NONE,
            ),
        };
        let span_context = SpanContext::new(trace_id, span_id, trace_flags, false, trace_state);

        let data = sampled.then(|| {
            let start_time = self.start_time.unwrap_or_else(spanwire::time::now);
            SpanFields {
                parent_span_id,
                span_kind: self.kind,
                name: self.name,
                start_time,
                end_time: start_time,
                attributes: Vec::with_capacity(self.attributes.len()),
                events: Vec::new(),
                status: Status::Unset,
            }
        });

        let mut span = Span::new(span_context, data, pipeline);
        span.set_attributes(self.attributes);
        Ok(span)
    }

    /// Start the span and run `f` in it. See [`Tracer::in_span`].
    pub fn in_span<T, E, F>(self, tracer: &Tracer, f: F) -> TraceResult<Result<T, E>>
    where
        F: FnOnce(&mut Span) -> Result<T, E>,
        E: fmt::Display,
    {
        let mut span = self.start(tracer)?;
        match panic::catch_unwind(AssertUnwindSafe(|| f(&mut span))) {
            Ok(result) => {
                finish(&mut span, &result);
                Ok(result)
            }
            Err(payload) => {
                record_panic(&mut span, payload.as_ref());
                panic::resume_unwind(payload)
            }
        }
    }

    /// Start the span and await `f` in it. See [`Tracer::in_span_async`].
    pub async fn in_span_async<T, E, F, Fut>(
        self,
        tracer: &Tracer,
        f: F,
    ) -> TraceResult<Result<T, E>>
    where
        F: FnOnce(SpanContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut span = self.start(tracer)?;
        let cx = span.span_context().clone();
        match AssertUnwindSafe(async move { f(cx).await })
            .catch_unwind()
            .await
        {
            Ok(result) => {
                finish(&mut span, &result);
                Ok(result)
            }
            Err(payload) => {
                record_panic(&mut span, payload.as_ref());
                panic::resume_unwind(payload)
            }
        }
    }
}

fn record_panic(span: &mut Span, payload: &(dyn Any + Send)) {
    let message = panic_message(payload);
    span.record_exception_with("panic", message.clone(), None, Vec::new());
    span.set_status(Status::error(message));
    span.end();
}

fn finish<T, E: fmt::Display>(span: &mut Span, result: &Result<T, E>) {
    match result {
        Ok(_) => span.set_status(Status::Ok),
        Err(err) => {
            let message = err.to_string();
            span.record_exception_with(short_type_name::<E>(), message.clone(), None, Vec::new());
            span.set_status(Status::error(message));
        }
    }
    span.end();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::trace::SpanData;
    use crate::testing::trace::InMemorySpanExporter;
    use crate::trace::{BatchConfigBuilder, IncrementIdGenerator, EXCEPTION_EVENT_NAME};
    use futures_util::future;
    use futures_util::FutureExt;
    use spanwire::trace::TraceId;
    use spanwire::{Key, Value};
    use std::time::Duration;

    fn config(ratio: f64) -> TracerConfig {
        TracerConfig::builder("tracer-tests")
            .with_sampling_ratio(ratio)
            .with_batch_config(
                BatchConfigBuilder::default()
                    .with_max_queue_size(2048)
                    .with_max_export_batch_size(512)
                    .with_scheduled_delay(Duration::from_secs(60))
                    .build(),
            )
            .build()
    }

    fn init(ratio: f64) -> (Tracer, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let tracer = Tracer::new();
        tracer.initialize(config(ratio), exporter.clone()).unwrap();
        (tracer, exporter)
    }

    fn finished(tracer: &Tracer, exporter: &InMemorySpanExporter) -> Vec<SpanData> {
        tracer.flush().unwrap();
        exporter.get_finished_spans().unwrap()
    }

    fn remote_parent(sampled: bool) -> SpanContext {
        SpanContext::new(
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(),
            SpanId::from_hex("00f067aa0ba902b7").unwrap(),
            TraceFlags::default().with_sampled(sampled),
            true,
            TraceState::from_header("congo=t61rcWkgMzE"),
        )
    }

    #[test]
    fn uninitialized_tracer_rejects_spans() {
        let tracer = Tracer::new();
        assert!(!tracer.is_initialized());
        assert!(matches!(
            tracer.start_span("op", SpanKind::Internal, vec![], None),
            Err(TraceError::Usage(UsageError::Uninitialized))
        ));
        assert!(matches!(
            tracer.flush(),
            Err(TraceError::Usage(UsageError::Uninitialized))
        ));
        assert!(matches!(
            tracer.shutdown(),
            Err(TraceError::Usage(UsageError::Uninitialized))
        ));
        assert_eq!(tracer.dropped_span_count(), 0);
        assert!(tracer.resource().is_none());
    }

    #[test]
    fn initialize_twice_is_a_usage_error() {
        let (tracer, _exporter) = init(1.0);
        let second = tracer.initialize(config(1.0), InMemorySpanExporter::default());
        assert!(matches!(
            second,
            Err(TraceError::Usage(UsageError::AlreadyInitialized))
        ));
        tracer.shutdown().unwrap();
    }

    #[test]
    fn invalid_config_leaves_tracer_uninitialized() {
        let tracer = Tracer::new();
        let result = tracer.initialize(config(1.5), InMemorySpanExporter::default());
        assert!(matches!(result, Err(TraceError::InvalidConfig(_))));
        assert!(!tracer.is_initialized());
    }

    #[test]
    fn root_and_child_spans_share_a_trace() {
        let (tracer, exporter) = init(1.0);
        let mut root = tracer
            .start_span("root", SpanKind::Server, vec![], None)
            .unwrap();
        let root_cx = root.span_context().clone();
        assert!(root_cx.is_valid());
        assert!(root_cx.is_sampled());
        assert!(!root_cx.is_remote());

        let mut child = tracer
            .start_span("child", SpanKind::Internal, vec![], Some(&root_cx))
            .unwrap();
        assert_eq!(child.span_context().trace_id(), root_cx.trace_id());
        assert_ne!(child.span_context().span_id(), root_cx.span_id());
        child.end();
        root.end();

        let spans = finished(&tracer, &exporter);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "child");
        assert_eq!(spans[0].parent_span_id, root_cx.span_id());
        assert_eq!(spans[1].parent_span_id, SpanId::INVALID);
        assert_eq!(spans[1].span_kind, SpanKind::Server);
    }

    #[test]
    fn sampled_remote_parent_overrides_ratio() {
        let (tracer, exporter) = init(0.0);
        let parent = remote_parent(true);
        let span = tracer
            .start_span("handler", SpanKind::Server, vec![], Some(&parent))
            .unwrap();

        assert!(span.is_recording());
        assert_eq!(span.span_context().trace_id(), parent.trace_id());
        assert_eq!(span.span_context().trace_state(), parent.trace_state());
        drop(span);

        let spans = finished(&tracer, &exporter);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].parent_span_id, parent.span_id());
    }

    #[test]
    fn unsampled_parent_yields_non_recording_child() {
        let (tracer, exporter) = init(1.0);
        let parent = remote_parent(false);
        let mut span = tracer
            .start_span("handler", SpanKind::Server, vec![], Some(&parent))
            .unwrap();

        assert!(!span.is_recording());
        assert!(span.span_context().is_valid());
        assert!(!span.span_context().is_sampled());
        span.set_attribute(KeyValue::new("ignored", true));
        span.end();

        assert!(finished(&tracer, &exporter).is_empty());
    }

    #[test]
    fn ratio_zero_records_nothing() {
        let (tracer, exporter) = init(0.0);
        for _ in 0..50 {
            let span = tracer
                .start_span("op", SpanKind::Internal, vec![], None)
                .unwrap();
            assert!(!span.is_recording());
        }
        assert!(finished(&tracer, &exporter).is_empty());
    }

    #[test]
    fn in_span_ok_sets_status_ok() {
        let (tracer, exporter) = init(1.0);
        let result = tracer
            .in_span("work", SpanKind::Internal, vec![], |span| {
                span.set_attribute(KeyValue::new("step", 1_i64));
                Ok::<_, std::io::Error>(7)
            })
            .unwrap();
        assert_eq!(result.unwrap(), 7);

        let spans = finished(&tracer, &exporter);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].status, Status::Ok);
        assert_eq!(spans[0].attributes, vec![KeyValue::new("step", 1_i64)]);
    }

    #[test]
    fn in_span_err_records_and_returns_original_error() {
        let (tracer, exporter) = init(1.0);
        let result = tracer
            .in_span("parse", SpanKind::Internal, vec![], |_span| "x".parse::<i32>())
            .unwrap();
        let err = result.unwrap_err();
        assert_eq!(err, "x".parse::<i32>().unwrap_err());

        let spans = finished(&tracer, &exporter);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].status, Status::error(err.to_string()));
        assert_eq!(spans[0].events.len(), 1);
        assert_eq!(spans[0].events[0].name, EXCEPTION_EVENT_NAME);
        assert_eq!(
            spans[0].events[0].attributes[0],
            KeyValue::new("exception.type", "ParseIntError")
        );
    }

    #[test]
    fn in_span_panic_is_recorded_then_resumed() {
        let (tracer, exporter) = init(1.0);
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            tracer.in_span("explode", SpanKind::Internal, vec![], |_span| {
                if tracer.is_initialized() {
                    panic!("kaboom");
                }
                Ok::<(), std::io::Error>(())
            })
        }));
        assert!(caught.is_err());

        let spans = finished(&tracer, &exporter);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].status, Status::error("kaboom"));
        assert_eq!(
            spans[0].events[0].attributes[1],
            KeyValue::new("exception.message", "kaboom")
        );
    }

    #[test]
    fn in_span_async_completes() {
        let (tracer, exporter) = init(1.0);
        let result = futures_executor::block_on(tracer.in_span_async(
            "fetch",
            SpanKind::Client,
            vec![],
            |cx| async move {
                assert!(cx.is_valid());
                Err::<(), _>(std::io::Error::other("refused"))
            },
        ))
        .unwrap();
        assert_eq!(result.unwrap_err().to_string(), "refused");

        let spans = finished(&tracer, &exporter);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].status, Status::error("refused"));
    }

    #[test]
    fn in_span_async_panic_is_recorded_then_resumed() {
        let (tracer, exporter) = init(1.0);
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            futures_executor::block_on(tracer.in_span_async(
                "explode-later",
                SpanKind::Internal,
                vec![],
                |_cx| async {
                    future::ready(()).await;
                    if tracer.is_initialized() {
                        panic!("kaboom while polling");
                    }
                    Ok::<(), std::io::Error>(())
                },
            ))
        }));
        assert!(caught.is_err());

        let spans = finished(&tracer, &exporter);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].status, Status::error("kaboom while polling"));
        assert_eq!(spans[0].events.len(), 1);
        assert_eq!(spans[0].events[0].name, EXCEPTION_EVENT_NAME);
        assert_eq!(
            spans[0].events[0].attributes[0],
            KeyValue::new("exception.type", "panic")
        );
    }

    #[test]
    fn dropped_async_span_still_ends_once() {
        let (tracer, exporter) = init(1.0);
        let pending = tracer.in_span_async("abandoned", SpanKind::Internal, vec![], |_cx| {
            future::pending::<Result<(), std::io::Error>>()
        });
        assert!(pending.now_or_never().is_none());

        let spans = finished(&tracer, &exporter);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "abandoned");
        assert_eq!(spans[0].status, Status::Unset);
    }

    #[test]
    fn shutdown_then_reinitialize() {
        let (tracer, exporter) = init(1.0);
        let mut open = tracer
            .start_span("open", SpanKind::Internal, vec![], None)
            .unwrap();
        tracer
            .start_span("ended", SpanKind::Internal, vec![], None)
            .unwrap()
            .end();

        tracer.shutdown().unwrap();
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
        assert!(matches!(
            tracer.start_span("late", SpanKind::Internal, vec![], None),
            Err(TraceError::Usage(UsageError::Uninitialized))
        ));

        // Ended after shutdown: discarded.
        open.end();

        let second = InMemorySpanExporter::default();
        tracer.initialize(config(1.0), second.clone()).unwrap();
        tracer
            .start_span("again", SpanKind::Internal, vec![], None)
            .unwrap()
            .end();
        let spans = finished(&tracer, &second);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "again");
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
    }

    #[test]
    fn spans_carry_the_resource() {
        let exporter = InMemorySpanExporter::default();
        let tracer = Tracer::new();
        let config = TracerConfig::builder("billing")
            .with_environment("production")
            .with_service_version("2.0.1")
            .build();
        tracer.initialize(config, exporter.clone()).unwrap();
        tracer
            .start_span("op", SpanKind::Internal, vec![], None)
            .unwrap()
            .end();

        let spans = finished(&tracer, &exporter);
        let resource = &spans[0].resource;
        assert_eq!(resource.service_name().as_deref(), Some("billing"));
        assert_eq!(
            resource.get(&Key::new("deployment.environment")),
            Some(Value::from("production"))
        );
        assert_eq!(
            exporter.resource().and_then(|r| r.service_name()).as_deref(),
            Some("billing")
        );
    }

    #[test]
    fn builder_controls_ids_and_start_time() {
        let exporter = InMemorySpanExporter::default();
        let tracer = Tracer::new();
        let config = TracerConfig::builder("ids")
            .with_id_generator(IncrementIdGenerator::new())
            .build();
        tracer.initialize(config, exporter.clone()).unwrap();

        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        let span = tracer
            .span_builder("op")
            .with_start_time(start)
            .with_attributes([KeyValue::new("k", 1_i64), KeyValue::new("k", 2_i64)])
            .start(&tracer)
            .unwrap();
        assert_eq!(span.span_context().trace_id(), TraceId::from_u128(1));
        assert_eq!(span.span_context().span_id(), SpanId::from_u64(2));
        drop(span);

        let spans = finished(&tracer, &exporter);
        assert_eq!(spans[0].start_time, start);
        assert_eq!(spans[0].attributes, vec![KeyValue::new("k", 2_i64)]);
    }
}
