//! # Batch span processor
//!
//! Ended spans are handed to the [`BatchSpanProcessor`], which buffers them
//! and exports them in bounded batches from a dedicated background thread.
//!
//! ```ascii
//!   +-----+--------------+   +------------------------+   +-------------------+
//!   |     |              |   |                        |   |                   |
//!   |     | Span.end()   +---> BatchSpanProcessor     +---> SpanExporter      |
//!   |     |              |   |  (dedicated thread)    |   |  (export sink)    |
//!   +-----+--------------+   +------------------------+   +-------------------+
//! ```
//!
//! Producers and the worker thread share no locked state. Spans travel over a
//! bounded span channel; flush requests and shutdown travel over a separate
//! control channel. The only shared values are atomic counters.
//!
//! ## Admission
//!
//! A span counts against `max_queue_size` from the moment it is admitted
//! until the exporter has resolved the batch containing it. When that count
//! is at the limit, newly ended spans are dropped (drop-newest) and counted in
//! [`BatchSpanProcessor::dropped_span_count`]. Only the first drop is logged.
//!
//! ## Flushing
//!
//! The worker exports when `scheduled_delay` has elapsed since the previous
//! export, when the queued count reaches `max_export_batch_size`, and on
//! [`BatchSpanProcessor::force_flush`] and [`BatchSpanProcessor::shutdown`].
//! Every export call is bounded by `max_export_timeout`. Failed or timed out
//! batches are logged and dropped, never retried.
//!
//! The worker can only abandon an export future that yields. An exporter
//! that blocks inside `poll` holds the worker until it returns, so callers
//! of `force_flush` and `shutdown` also bound their own wait: one export
//! timeout per queued batch plus one for the export already running. When
//! that runs out they get [`TraceError::ExportTimedOut`] and the worker is
//! left to finish on its own.
use crate::error::{TraceError, TraceResult};
use crate::export::trace::{ExportResult, SpanData, SpanExporter};
use futures_executor::block_on;
use futures_util::future::{self, Either};
use futures_util::pin_mut;
use spanwire::{spanwire_debug, spanwire_error, spanwire_warn};
use std::cmp::min;
use std::env;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Delay interval between two consecutive exports.
pub(crate) const OTEL_BSP_SCHEDULE_DELAY: &str = "OTEL_BSP_SCHEDULE_DELAY";
/// Default delay interval between two consecutive exports.
pub(crate) const OTEL_BSP_SCHEDULE_DELAY_DEFAULT: u64 = 5_000;
/// Maximum queue size
pub(crate) const OTEL_BSP_MAX_QUEUE_SIZE: &str = "OTEL_BSP_MAX_QUEUE_SIZE";
/// Default maximum queue size
pub(crate) const OTEL_BSP_MAX_QUEUE_SIZE_DEFAULT: usize = 2_048;
/// Maximum batch size, must be less than or equal to OTEL_BSP_MAX_QUEUE_SIZE
pub(crate) const OTEL_BSP_MAX_EXPORT_BATCH_SIZE: &str = "OTEL_BSP_MAX_EXPORT_BATCH_SIZE";
/// Default maximum batch size
pub(crate) const OTEL_BSP_MAX_EXPORT_BATCH_SIZE_DEFAULT: usize = 512;
/// Maximum allowed time to export data.
pub(crate) const OTEL_BSP_EXPORT_TIMEOUT: &str = "OTEL_BSP_EXPORT_TIMEOUT";
/// Default maximum allowed time to export data.
pub(crate) const OTEL_BSP_EXPORT_TIMEOUT_DEFAULT: u64 = 5_000;

/// Capacity of the control channel. Export notifications are coalesced, so at
/// most one of them is ever in flight.
const CONTROL_CHANNEL_CAPACITY: usize = 64;

/// Messages sent from producers to the worker thread.
#[derive(Debug)]
enum BatchMessage {
    /// The queue reached a full batch. The flag is cleared by the worker so
    /// the next full batch can notify again.
    ExportSpan(Arc<AtomicBool>),
    /// Export everything queued and report the outcome.
    ForceFlush(SyncSender<ExportResult>),
    /// Export everything queued, shut the exporter down and stop.
    Shutdown(SyncSender<ExportResult>),
}

/// Buffers ended spans and exports them in batches from a background thread.
///
/// # Example
///
/// ```
/// use futures_util::future::BoxFuture;
/// use spanwire_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
/// use spanwire_sdk::trace::{BatchConfigBuilder, BatchSpanProcessor};
/// use std::time::Duration;
///
/// #[derive(Debug)]
/// struct StdoutExporter;
///
/// impl SpanExporter for StdoutExporter {
///     fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
///         for span in batch {
///             println!("{} {}", span.span_context.trace_id(), span.name);
///         }
///         Box::pin(std::future::ready(Ok(())))
///     }
/// }
///
/// let exporter = StdoutExporter;
/// let config = BatchConfigBuilder::default()
///     .with_max_queue_size(4096)
///     .with_scheduled_delay(Duration::from_millis(100))
///     .build();
/// let processor = BatchSpanProcessor::new(exporter, config).unwrap();
///
/// processor.shutdown().unwrap();
/// ```
#[derive(Debug)]
pub struct BatchSpanProcessor {
    span_sender: SyncSender<SpanData>,
    message_sender: SyncSender<BatchMessage>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    is_shutdown: AtomicBool,
    queued_count: Arc<AtomicUsize>,
    dropped_span_count: AtomicUsize,
    export_span_message_sent: Arc<AtomicBool>,
    max_queue_size: usize,
    max_export_batch_size: usize,
    max_export_timeout: Duration,
}

impl BatchSpanProcessor {
    /// Start the worker thread and return the processor feeding it.
    ///
    /// Fails only if the operating system refuses to spawn the thread.
    pub fn new<E>(exporter: E, config: BatchConfig) -> TraceResult<Self>
    where
        E: SpanExporter + 'static,
    {
        let (span_sender, span_receiver) = sync_channel::<SpanData>(config.max_queue_size);
        let (message_sender, message_receiver) =
            sync_channel::<BatchMessage>(CONTROL_CHANNEL_CAPACITY);
        let queued_count = Arc::new(AtomicUsize::new(0));

        let mut worker = Worker {
            exporter,
            spans: span_receiver,
            queued_count: queued_count.clone(),
            max_export_batch_size: config.max_export_batch_size,
            max_export_timeout: config.max_export_timeout,
        };
        let scheduled_delay = config.scheduled_delay;

        let handle = thread::Builder::new()
            .name("BatchSpanProcessorThread".to_string())
            .spawn(move || {
                spanwire_debug!(
                    name: "BatchSpanProcessor.ThreadStarted",
                    interval_in_millisecs = scheduled_delay.as_millis() as u64,
                    max_export_batch_size = worker.max_export_batch_size,
                );
                let mut last_export_time = Instant::now();

                loop {
                    let remaining_time = scheduled_delay.saturating_sub(last_export_time.elapsed());
                    match message_receiver.recv_timeout(remaining_time) {
                        Ok(BatchMessage::ExportSpan(export_span_message_sent)) => {
                            export_span_message_sent.store(false, Ordering::Release);
                            let _ = worker.export_queued();
                            last_export_time = Instant::now();
                        }
                        Ok(BatchMessage::ForceFlush(sender)) => {
                            spanwire_debug!(name: "BatchSpanProcessor.ExportingDueToForceFlush");
                            let result = worker.export_queued();
                            let _ = sender.send(result);
                            last_export_time = Instant::now();
                        }
                        Ok(BatchMessage::Shutdown(sender)) => {
                            spanwire_debug!(name: "BatchSpanProcessor.ExportingDueToShutdown");
                            let result = worker.export_queued();
                            worker.exporter.shutdown();
                            let _ = sender.send(result);
                            break;
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            let _ = worker.export_queued();
                            last_export_time = Instant::now();
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            spanwire_debug!(name: "BatchSpanProcessor.ControlChannelDisconnected");
                            break;
                        }
                    }
                }
                spanwire_debug!(name: "BatchSpanProcessor.ThreadStopped");
            })
            .map_err(|err| TraceError::Other(Box::new(err)))?;

        Ok(BatchSpanProcessor {
            span_sender,
            message_sender,
            handle: Mutex::new(Some(handle)),
            is_shutdown: AtomicBool::new(false),
            queued_count,
            dropped_span_count: AtomicUsize::new(0),
            export_span_message_sent: Arc::new(AtomicBool::new(false)),
            max_queue_size: config.max_queue_size,
            max_export_batch_size: config.max_export_batch_size,
            max_export_timeout: config.max_export_timeout,
        })
    }

    /// Hand an ended span to the processor. Never blocks.
    ///
    /// Unsampled spans are ignored. After shutdown, spans are discarded.
    pub fn on_end(&self, span: SpanData) {
        if self.is_shutdown.load(Ordering::Relaxed) || !span.span_context.is_sampled() {
            return;
        }

        let admitted = self
            .queued_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |queued| {
                (queued < self.max_queue_size).then_some(queued + 1)
            });
        let queued = match admitted {
            Ok(previous) => previous + 1,
            Err(_) => {
                self.record_dropped_span();
                return;
            }
        };

        match self.span_sender.try_send(span) {
            Ok(()) => {
                if queued >= self.max_export_batch_size
                    && !self.export_span_message_sent.swap(true, Ordering::AcqRel)
                {
                    let message = BatchMessage::ExportSpan(self.export_span_message_sent.clone());
                    if self.message_sender.try_send(message).is_err() {
                        self.export_span_message_sent
                            .store(false, Ordering::Release);
                    }
                }
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.queued_count.fetch_sub(1, Ordering::AcqRel);
                self.record_dropped_span();
            }
        }
    }

    /// Export everything queued now and wait for the exporter to resolve.
    ///
    /// Returns the last export error, if any batch failed or timed out, and
    /// [`TraceError::ExportTimedOut`] if the worker does not answer in time.
    pub fn force_flush(&self) -> TraceResult<()> {
        if self.is_shutdown.load(Ordering::Relaxed) {
            return Err(TraceError::Closed);
        }
        let (sender, receiver) = sync_channel(1);
        self.send_control(BatchMessage::ForceFlush(sender))?;

        let budget = self.wait_budget();
        match receiver.recv_timeout(budget) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                spanwire_warn!(
                    name: "BatchSpanProcessor.ForceFlushTimedOut",
                    waited_ms = budget.as_millis() as u64,
                );
                Err(TraceError::ExportTimedOut(self.max_export_timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(TraceError::Closed),
        }
    }

    /// Flush, shut the exporter down and join the worker thread.
    ///
    /// If the worker is stuck in a blocking export past the wait budget, the
    /// thread is left detached and [`TraceError::ExportTimedOut`] is returned.
    /// A second call returns [`TraceError::Closed`].
    pub fn shutdown(&self) -> TraceResult<()> {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            return Err(TraceError::Closed);
        }

        let dropped_spans = self.dropped_span_count.load(Ordering::Relaxed);
        if dropped_spans > 0 {
            spanwire_warn!(
                name: "BatchSpanProcessor.SpansDropped",
                dropped_span_count = dropped_spans,
                max_queue_size = self.max_queue_size,
            );
        }

        let (sender, receiver) = sync_channel(1);
        self.send_control(BatchMessage::Shutdown(sender))?;

        let budget = self.wait_budget();
        let result = match receiver.recv_timeout(budget) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                // Joining would block on the exporter; the thread stays detached.
                spanwire_warn!(
                    name: "BatchSpanProcessor.ShutdownTimedOut",
                    waited_ms = budget.as_millis() as u64,
                );
                return Err(TraceError::ExportTimedOut(self.max_export_timeout));
            }
            Err(RecvTimeoutError::Disconnected) => Err(TraceError::Closed),
        };

        if let Some(handle) = self.handle.lock()?.take() {
            if handle.join().is_err() {
                spanwire_error!(name: "BatchSpanProcessor.ThreadPanicked");
            }
        }
        result
    }

    /// Spans admitted but not yet resolved by the exporter.
    pub fn queued_span_count(&self) -> usize {
        self.queued_count.load(Ordering::Acquire)
    }

    /// Spans rejected because the queue was full.
    pub fn dropped_span_count(&self) -> usize {
        self.dropped_span_count.load(Ordering::Relaxed)
    }

    fn send_control(&self, message: BatchMessage) -> TraceResult<()> {
        match self.message_sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                spanwire_warn!(
                    name: "BatchSpanProcessor.ControlChannelFull",
                    capacity = CONTROL_CHANNEL_CAPACITY,
                );
                Err(TraceError::ExportTimedOut(self.max_export_timeout))
            }
            Err(TrySendError::Disconnected(_)) => Err(TraceError::Closed),
        }
    }

    fn wait_budget(&self) -> Duration {
        let batches = self
            .queued_span_count()
            .div_ceil(self.max_export_batch_size.max(1))
            + 1;
        self.max_export_timeout
            .saturating_mul(u32::try_from(batches).unwrap_or(u32::MAX))
    }

    fn record_dropped_span(&self) {
        if self.dropped_span_count.fetch_add(1, Ordering::Relaxed) == 0 {
            spanwire_warn!(
                name: "BatchSpanProcessor.SpanDroppingStarted",
                message = "Queue is full, dropping newly ended spans. Only the first drop is logged; the total is reported at shutdown.",
                max_queue_size = self.max_queue_size,
            );
        }
    }
}

impl Drop for BatchSpanProcessor {
    fn drop(&mut self) {
        if !self.is_shutdown.load(Ordering::Relaxed) {
            let _ = self.shutdown();
        }
    }
}

/// State owned by the worker thread.
struct Worker<E> {
    exporter: E,
    spans: Receiver<SpanData>,
    queued_count: Arc<AtomicUsize>,
    max_export_batch_size: usize,
    max_export_timeout: Duration,
}

impl<E: SpanExporter> Worker<E> {
    /// Drain what is queued right now in batches of at most
    /// `max_export_batch_size`. Spans arriving meanwhile wait for the next
    /// trigger, so a busy producer cannot keep the worker here forever.
    fn export_queued(&mut self) -> ExportResult {
        let mut remaining = self.queued_count.load(Ordering::Acquire);
        let mut result = Ok(());

        while remaining > 0 {
            let batch: Vec<SpanData> = self
                .spans
                .try_iter()
                .take(min(remaining, self.max_export_batch_size))
                .collect();
            if batch.is_empty() {
                break;
            }
            let count = batch.len();
            remaining = remaining.saturating_sub(count);

            let outcome = self.export_with_timeout(batch);
            self.queued_count.fetch_sub(count, Ordering::AcqRel);
            if let Err(err) = outcome {
                spanwire_error!(
                    name: "BatchSpanProcessor.ExportError",
                    error = format!("{err}"),
                    dropped_batch_size = count,
                );
                result = Err(err);
            }
        }
        result
    }

    fn export_with_timeout(&mut self, batch: Vec<SpanData>) -> ExportResult {
        let export = self.exporter.export(batch);
        let timeout = futures_timer::Delay::new(self.max_export_timeout);

        pin_mut!(export);
        pin_mut!(timeout);

        match block_on(future::select(export, timeout)) {
            Either::Left((export_res, _)) => export_res,
            Either::Right((_, _)) => Err(TraceError::ExportTimedOut(self.max_export_timeout)),
        }
    }
}

/// Batch span processor configuration.
/// Use [`BatchConfigBuilder`] to configure your own instance of [`BatchConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// The maximum number of spans admitted but not yet exported. If the
    /// queue gets full it drops the spans. The default value of is 2048.
    pub(crate) max_queue_size: usize,

    /// The delay interval between two consecutive exports. The default value
    /// is 5 seconds.
    pub(crate) scheduled_delay: Duration,

    /// The maximum number of spans to process in a single batch. If there are
    /// more than one batch worth of spans then it processes multiple batches
    /// of spans one batch after the other without any delay. The default value
    /// is 512.
    pub(crate) max_export_batch_size: usize,

    /// The maximum duration to export a batch of data. The default value is
    /// 5 seconds.
    pub(crate) max_export_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfigBuilder::default().build()
    }
}

impl BatchConfig {
    /// Maximum number of queued spans.
    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    /// Maximum number of spans per export call.
    pub fn max_export_batch_size(&self) -> usize {
        self.max_export_batch_size
    }

    /// Interval between scheduled exports.
    pub fn scheduled_delay(&self) -> Duration {
        self.scheduled_delay
    }

    /// Upper bound on a single export call.
    pub fn max_export_timeout(&self) -> Duration {
        self.max_export_timeout
    }
}

/// A builder for creating [`BatchConfig`] instances.
#[derive(Debug)]
pub struct BatchConfigBuilder {
    max_queue_size: usize,
    scheduled_delay: Duration,
    max_export_batch_size: usize,
    max_export_timeout: Duration,
}

impl Default for BatchConfigBuilder {
    /// Create a new [`BatchConfigBuilder`] initialized with default batch config values.
    /// The values are overridden by environment variables if set.
    /// The supported environment variables are:
    /// * `OTEL_BSP_MAX_QUEUE_SIZE`
    /// * `OTEL_BSP_SCHEDULE_DELAY`
    /// * `OTEL_BSP_MAX_EXPORT_BATCH_SIZE`
    /// * `OTEL_BSP_EXPORT_TIMEOUT`
    fn default() -> Self {
        BatchConfigBuilder {
            max_queue_size: OTEL_BSP_MAX_QUEUE_SIZE_DEFAULT,
            scheduled_delay: Duration::from_millis(OTEL_BSP_SCHEDULE_DELAY_DEFAULT),
            max_export_batch_size: OTEL_BSP_MAX_EXPORT_BATCH_SIZE_DEFAULT,
            max_export_timeout: Duration::from_millis(OTEL_BSP_EXPORT_TIMEOUT_DEFAULT),
        }
        .init_from_env_vars()
    }
}

impl BatchConfigBuilder {
    /// Set max_queue_size for [`BatchConfigBuilder`].
    /// It's the maximum number of spans waiting for export.
    /// If the queue gets full it will drop newly ended spans.
    /// The default value of is 2048.
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Set max_export_batch_size for [`BatchConfigBuilder`].
    /// It's the maximum number of spans to process in a single batch.
    /// The default value is 512.
    pub fn with_max_export_batch_size(mut self, max_export_batch_size: usize) -> Self {
        self.max_export_batch_size = max_export_batch_size;
        self
    }

    /// Set scheduled_delay_duration for [`BatchConfigBuilder`].
    /// It's the delay interval between two consecutive exports.
    /// The default value is 5000 milliseconds.
    pub fn with_scheduled_delay(mut self, scheduled_delay: Duration) -> Self {
        self.scheduled_delay = scheduled_delay;
        self
    }

    /// Set max_export_timeout for [`BatchConfigBuilder`].
    /// It's the maximum duration to export a batch of data.
    /// The default value is 5000 milliseconds.
    pub fn with_max_export_timeout(mut self, max_export_timeout: Duration) -> Self {
        self.max_export_timeout = max_export_timeout;
        self
    }

    /// Builds a `BatchConfig` enforcing the following invariants:
    /// * `max_export_batch_size` must be less than or equal to `max_queue_size`.
    pub fn build(self) -> BatchConfig {
        let max_export_batch_size = min(self.max_export_batch_size, self.max_queue_size);

        BatchConfig {
            max_queue_size: self.max_queue_size,
            scheduled_delay: self.scheduled_delay,
            max_export_timeout: self.max_export_timeout,
            max_export_batch_size,
        }
    }

    fn init_from_env_vars(mut self) -> Self {
        if let Some(max_queue_size) = parse_env::<usize>(OTEL_BSP_MAX_QUEUE_SIZE) {
            self.max_queue_size = max_queue_size;
        }

        if let Some(scheduled_delay) = parse_env::<u64>(OTEL_BSP_SCHEDULE_DELAY) {
            self.scheduled_delay = Duration::from_millis(scheduled_delay);
        }

        if let Some(max_export_batch_size) = parse_env::<usize>(OTEL_BSP_MAX_EXPORT_BATCH_SIZE) {
            self.max_export_batch_size = max_export_batch_size;
        }

        // max export batch size must be less or equal to max queue size.
        // we set max export batch size to max queue size if it's larger than max queue size.
        if self.max_export_batch_size > self.max_queue_size {
            self.max_export_batch_size = self.max_queue_size;
        }

        if let Some(max_export_timeout) = parse_env::<u64>(OTEL_BSP_EXPORT_TIMEOUT) {
            self.max_export_timeout = Duration::from_millis(max_export_timeout);
        }

        self
    }
}

/// Read and parse an environment variable. Unparsable values are logged and
/// ignored.
fn parse_env<T: FromStr>(name: &'static str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match T::from_str(raw.trim()) {
        Ok(value) => Some(value),
        Err(_) => {
            spanwire_warn!(
                name: "BatchConfig.InvalidEnvValue",
                variable = name,
                value = raw.as_str(),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use crate::testing::trace::{new_test_export_span_data, InMemorySpanExporter};
    use futures_util::future::BoxFuture;
    use std::sync::mpsc;

    fn config(queue: usize, batch: usize, delay: Duration, timeout: Duration) -> BatchConfig {
        BatchConfig {
            max_queue_size: queue,
            scheduled_delay: delay,
            max_export_batch_size: batch,
            max_export_timeout: timeout,
        }
    }

    /// Exporter whose first export blocks until the test releases it.
    #[derive(Debug)]
    struct GatedExporter {
        gate: Arc<Mutex<mpsc::Receiver<()>>>,
        inner: InMemorySpanExporter,
    }

    impl SpanExporter for GatedExporter {
        fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
            if let Ok(gate) = self.gate.lock() {
                let _ = gate.recv();
            }
            self.inner.export(batch)
        }
    }

    /// Exporter that sleeps on the worker thread instead of yielding.
    #[derive(Debug)]
    struct SleepingExporter(Duration);

    impl SpanExporter for SleepingExporter {
        fn export(&mut self, _batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
            let nap = self.0;
            Box::pin(async move {
                thread::sleep(nap);
                Ok(())
            })
        }
    }

    /// Exporter whose exports never resolve.
    #[derive(Debug)]
    struct PendingExporter;

    impl SpanExporter for PendingExporter {
        fn export(&mut self, _batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
            Box::pin(future::pending())
        }
    }

    #[test]
    fn test_default_const_values() {
        assert_eq!(OTEL_BSP_MAX_QUEUE_SIZE, "OTEL_BSP_MAX_QUEUE_SIZE");
        assert_eq!(OTEL_BSP_MAX_QUEUE_SIZE_DEFAULT, 2048);
        assert_eq!(OTEL_BSP_SCHEDULE_DELAY, "OTEL_BSP_SCHEDULE_DELAY");
        assert_eq!(OTEL_BSP_SCHEDULE_DELAY_DEFAULT, 5000);
        assert_eq!(
            OTEL_BSP_MAX_EXPORT_BATCH_SIZE,
            "OTEL_BSP_MAX_EXPORT_BATCH_SIZE"
        );
        assert_eq!(OTEL_BSP_MAX_EXPORT_BATCH_SIZE_DEFAULT, 512);
        assert_eq!(OTEL_BSP_EXPORT_TIMEOUT, "OTEL_BSP_EXPORT_TIMEOUT");
        assert_eq!(OTEL_BSP_EXPORT_TIMEOUT_DEFAULT, 5000);
    }

    #[test]
    fn default_batch_config_without_env() {
        let env_vars = vec![
            OTEL_BSP_SCHEDULE_DELAY,
            OTEL_BSP_EXPORT_TIMEOUT,
            OTEL_BSP_MAX_QUEUE_SIZE,
            OTEL_BSP_MAX_EXPORT_BATCH_SIZE,
        ];

        let config = temp_env::with_vars_unset(env_vars, BatchConfig::default);

        assert_eq!(config.max_queue_size, 2048);
        assert_eq!(config.scheduled_delay, Duration::from_millis(5000));
        assert_eq!(config.max_export_batch_size, 512);
        assert_eq!(config.max_export_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn batch_config_configurable_by_env_vars() {
        let env_vars = vec![
            (OTEL_BSP_SCHEDULE_DELAY, Some("2000")),
            (OTEL_BSP_EXPORT_TIMEOUT, Some("60000")),
            (OTEL_BSP_MAX_QUEUE_SIZE, Some("4096")),
        ];

        let config = temp_env::with_vars(env_vars, BatchConfig::default);

        assert_eq!(config.scheduled_delay, Duration::from_millis(2000));
        assert_eq!(config.max_export_timeout, Duration::from_millis(60000));
        assert_eq!(config.max_queue_size, 4096);
        assert_eq!(config.max_export_batch_size, 512);
    }

    #[test]
    fn batch_config_max_export_batch_size_clamped_to_queue_size() {
        let env_vars = vec![
            (OTEL_BSP_MAX_QUEUE_SIZE, Some("256")),
            (OTEL_BSP_MAX_EXPORT_BATCH_SIZE, Some("1024")),
        ];

        let config = temp_env::with_vars(env_vars, BatchConfig::default);

        assert_eq!(config.max_queue_size, 256);
        assert_eq!(config.max_export_batch_size, 256);

        let built = temp_env::with_vars_unset(
            vec![OTEL_BSP_MAX_QUEUE_SIZE, OTEL_BSP_MAX_EXPORT_BATCH_SIZE],
            || {
                BatchConfigBuilder::default()
                    .with_max_queue_size(10)
                    .with_max_export_batch_size(20)
                    .build()
            },
        );
        assert_eq!(built.max_export_batch_size, 10);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let env_vars = vec![
            (OTEL_BSP_SCHEDULE_DELAY, Some("soon")),
            (OTEL_BSP_MAX_QUEUE_SIZE, Some("-1")),
            (OTEL_BSP_MAX_EXPORT_BATCH_SIZE, None),
            (OTEL_BSP_EXPORT_TIMEOUT, None),
        ];

        let config = temp_env::with_vars(env_vars, BatchConfig::default);

        assert_eq!(config.scheduled_delay, Duration::from_millis(5000));
        assert_eq!(config.max_queue_size, 2048);
    }

    #[test]
    fn force_flush_exports_everything_queued() {
        let exporter = InMemorySpanExporter::default();
        let processor = BatchSpanProcessor::new(
            exporter.clone(),
            config(100, 10, Duration::from_secs(60), Duration::from_secs(5)),
        )
        .unwrap();

        for _ in 0..25 {
            processor.on_end(new_test_export_span_data());
        }
        processor.force_flush().unwrap();

        assert_eq!(exporter.get_finished_spans().unwrap().len(), 25);
        assert_eq!(processor.queued_span_count(), 0);
        assert_eq!(processor.dropped_span_count(), 0);
        processor.shutdown().unwrap();
    }

    #[test]
    fn full_batch_triggers_export_without_flush() {
        let exporter = InMemorySpanExporter::default();
        let processor = BatchSpanProcessor::new(
            exporter.clone(),
            config(100, 5, Duration::from_secs(60), Duration::from_secs(5)),
        )
        .unwrap();

        for _ in 0..5 {
            processor.on_end(new_test_export_span_data());
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        while exporter.get_finished_spans().unwrap().len() < 5 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 5);
        processor.shutdown().unwrap();
    }

    #[test]
    fn scheduled_delay_triggers_export() {
        let exporter = InMemorySpanExporter::default();
        let processor = BatchSpanProcessor::new(
            exporter.clone(),
            config(100, 50, Duration::from_millis(20), Duration::from_secs(5)),
        )
        .unwrap();

        processor.on_end(new_test_export_span_data());

        let deadline = Instant::now() + Duration::from_secs(5);
        while exporter.get_finished_spans().unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
        processor.shutdown().unwrap();
    }

    #[test]
    fn overflow_drops_newest_and_counts() {
        let (release, gate) = mpsc::channel();
        let exporter = InMemorySpanExporter::default();
        let processor = BatchSpanProcessor::new(
            GatedExporter {
                gate: Arc::new(Mutex::new(gate)),
                inner: exporter.clone(),
            },
            config(5, 5, Duration::from_secs(60), Duration::from_secs(5)),
        )
        .unwrap();

        for _ in 0..8 {
            processor.on_end(new_test_export_span_data());
        }

        assert_eq!(processor.queued_span_count(), 5);
        assert_eq!(processor.dropped_span_count(), 3);

        // Unblock every export, including the one the full batch triggered.
        drop(release);
        processor.shutdown().unwrap();

        assert_eq!(exporter.get_finished_spans().unwrap().len(), 5);
        assert_eq!(processor.queued_span_count(), 0);
        assert_eq!(processor.dropped_span_count(), 3);
    }

    #[test]
    fn export_timeout_drops_batch_and_releases_queue() {
        let processor = BatchSpanProcessor::new(
            PendingExporter,
            config(10, 10, Duration::from_secs(60), Duration::from_millis(50)),
        )
        .unwrap();

        processor.on_end(new_test_export_span_data());
        processor.on_end(new_test_export_span_data());

        let result = processor.force_flush();
        assert!(matches!(result, Err(TraceError::ExportTimedOut(_))));
        assert_eq!(processor.queued_span_count(), 0);
        let _ = processor.shutdown();
    }

    #[test]
    fn blocking_exporter_cannot_hold_callers_past_timeout() {
        let timeout = Duration::from_millis(50);
        let processor = BatchSpanProcessor::new(
            SleepingExporter(Duration::from_millis(1500)),
            config(10, 10, Duration::from_secs(60), timeout),
        )
        .unwrap();
        processor.on_end(new_test_export_span_data());

        let started = Instant::now();
        let result = processor.force_flush();
        let waited = started.elapsed();
        assert!(matches!(result, Err(TraceError::ExportTimedOut(t)) if t == timeout));
        assert!(waited < Duration::from_secs(1), "flush waited {waited:?}");

        let started = Instant::now();
        let result = processor.shutdown();
        let waited = started.elapsed();
        assert!(matches!(result, Err(TraceError::ExportTimedOut(t)) if t == timeout));
        assert!(waited < Duration::from_secs(1), "shutdown waited {waited:?}");
        assert!(matches!(processor.shutdown(), Err(TraceError::Closed)));
    }

    #[test]
    fn unsampled_spans_are_not_queued() {
        let exporter = InMemorySpanExporter::default();
        let processor = BatchSpanProcessor::new(
            exporter.clone(),
            config(10, 10, Duration::from_secs(60), Duration::from_secs(5)),
        )
        .unwrap();

        let mut unsampled = new_test_export_span_data();
        unsampled.span_context = spanwire::trace::SpanContext::empty_context();
        processor.on_end(unsampled);
        processor.force_flush().unwrap();

        assert!(exporter.get_finished_spans().unwrap().is_empty());
        processor.shutdown().unwrap();
    }

    #[test]
    fn operations_after_shutdown_are_closed() {
        let exporter = InMemorySpanExporter::default();
        let processor = BatchSpanProcessor::new(
            exporter.clone(),
            config(10, 10, Duration::from_secs(60), Duration::from_secs(5)),
        )
        .unwrap();

        processor.on_end(new_test_export_span_data());
        processor.shutdown().unwrap();
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);

        processor.on_end(new_test_export_span_data());
        assert!(matches!(processor.force_flush(), Err(TraceError::Closed)));
        assert!(matches!(processor.shutdown(), Err(TraceError::Closed)));
        assert_eq!(processor.queued_span_count(), 0);
    }

    #[test]
    fn exporter_receives_spans_with_their_resource() {
        let exporter = InMemorySpanExporter::default();
        let processor = BatchSpanProcessor::new(
            exporter.clone(),
            config(10, 10, Duration::from_secs(60), Duration::from_secs(5)),
        )
        .unwrap();

        let mut span = new_test_export_span_data();
        span.resource = Resource::builder().with_service_name("checkout").build();
        processor.on_end(span);
        processor.force_flush().unwrap();

        let exported = exporter.get_finished_spans().unwrap();
        assert_eq!(exported[0].resource.service_name().as_deref(), Some("checkout"));
        processor.shutdown().unwrap();
    }
}
