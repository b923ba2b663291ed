//! # Span
//!
//! `Span`s represent a single operation within a trace. `Span`s can be nested to form a trace
//! tree. Each trace contains a root span, which typically describes the end-to-end latency and,
//! optionally, one or more sub-spans for its sub-operations.
//!
//! The `Span`'s start and end timestamps reflect the elapsed real time of the operation. A `Span`'s
//! start time is set to the current time on span creation. After the `Span` is created, it
//! is possible to change its name, set its attributes, and add events and a status.
//! These cannot be changed after the `Span`'s end time has been set.
//!
//! A span has exactly one owner. Ending it, explicitly or by dropping it, hands
//! the recorded data to the tracer's batch processor exactly once.
use crate::export::trace::SpanData;
use crate::trace::tracer::Pipeline;
use spanwire::trace::{Event, SpanContext, SpanId, SpanKind, Status};
use spanwire::KeyValue;
use std::any::Any;
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;

/// Name of the event added by [`Span::record_exception`].
pub const EXCEPTION_EVENT_NAME: &str = "exception";

/// Single operation within a trace.
pub struct Span {
    span_context: SpanContext,
    data: Option<SpanFields>,
    pipeline: Arc<Pipeline>,
}

/// What a recording span has collected so far. `None` once the span ended or
/// when it was never sampled.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SpanFields {
    pub(crate) parent_span_id: SpanId,
    pub(crate) span_kind: SpanKind,
    pub(crate) name: Cow<'static, str>,
    pub(crate) start_time: SystemTime,
    pub(crate) end_time: SystemTime,
    pub(crate) attributes: Vec<KeyValue>,
    pub(crate) events: Vec<Event>,
    pub(crate) status: Status,
}

impl Span {
    pub(crate) fn new(
        span_context: SpanContext,
        data: Option<SpanFields>,
        pipeline: Arc<Pipeline>,
    ) -> Self {
        Span {
            span_context,
            data,
            pipeline,
        }
    }

    /// Operate on a mutable reference to span data
    fn with_data<T, F>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce(&mut SpanFields) -> T,
    {
        self.data.as_mut().map(f)
    }

    /// Returns the `SpanContext` for the given `Span`.
    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    /// Returns `true` if this span is recording information.
    ///
    /// Spans that were not sampled, and spans that have ended, are not.
    pub fn is_recording(&self) -> bool {
        self.data.is_some()
    }

    /// Set an attribute. A key that is already present keeps its position and
    /// takes the new value.
    pub fn set_attribute(&mut self, attribute: KeyValue) {
        self.with_data(|data| upsert_attribute(&mut data.attributes, attribute));
    }

    /// Set several attributes, in order.
    pub fn set_attributes(&mut self, attributes: impl IntoIterator<Item = KeyValue>) {
        self.with_data(|data| {
            for attribute in attributes {
                upsert_attribute(&mut data.attributes, attribute);
            }
        });
    }

    /// Record an event stamped with the current time.
    pub fn add_event<T>(&mut self, name: T, attributes: Vec<KeyValue>)
    where
        T: Into<Cow<'static, str>>,
    {
        self.add_event_with_timestamp(name, spanwire::time::now(), attributes)
    }

    /// Records events at a specific time in the context of a given `Span`.
    pub fn add_event_with_timestamp<T>(
        &mut self,
        name: T,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    ) where
        T: Into<Cow<'static, str>>,
    {
        self.with_data(|data| data.events.push(Event::new(name, timestamp, attributes)));
    }

    /// Record an error as an `exception` event.
    ///
    /// The exception type is the error's type name without its module path,
    /// and the message is its `Display` output.
    ///
    /// ```
    /// # fn demo(span: &mut spanwire_sdk::trace::Span) {
    /// if let Err(err) = "x".parse::<i32>() {
    ///     span.record_exception(&err); // exception.type = "ParseIntError"
    /// }
    /// # }
    /// ```
    pub fn record_exception<E: Error + ?Sized>(&mut self, err: &E) {
        self.record_exception_with(short_type_name::<E>(), err.to_string(), None, Vec::new());
    }

    /// Record an `exception` event from its parts.
    ///
    /// The event carries `exception.type`, `exception.message`,
    /// `exception.stacktrace` when given, then `attributes`.
    pub fn record_exception_with(
        &mut self,
        exception_type: impl Into<String>,
        message: impl Into<String>,
        stacktrace: Option<String>,
        attributes: Vec<KeyValue>,
    ) {
        if !self.is_recording() {
            return;
        }
        let mut event_attributes = Vec::with_capacity(3 + attributes.len());
        event_attributes.push(KeyValue::new("exception.type", exception_type.into()));
        event_attributes.push(KeyValue::new("exception.message", message.into()));
        if let Some(stacktrace) = stacktrace {
            event_attributes.push(KeyValue::new("exception.stacktrace", stacktrace));
        }
        event_attributes.extend(attributes);
        self.add_event(EXCEPTION_EVENT_NAME, event_attributes);
    }

    /// Sets the status of this `Span`. The last call wins.
    pub fn set_status(&mut self, status: Status) {
        self.with_data(|data| data.status = status);
    }

    /// Updates the span's name.
    pub fn update_name<T>(&mut self, new_name: T)
    where
        T: Into<Cow<'static, str>>,
    {
        self.with_data(|data| data.name = new_name.into());
    }

    /// End the span now. Later calls do nothing.
    pub fn end(&mut self) {
        self.end_with_timestamp(spanwire::time::now());
    }

    /// Finishes the span with given timestamp.
    pub fn end_with_timestamp(&mut self, timestamp: SystemTime) {
        let Some(mut data) = self.data.take() else {
            return;
        };
        data.end_time = timestamp;
        let span_data = build_export_data(data, self.span_context.clone(), &self.pipeline);
        self.pipeline.processor.on_end(span_data);
    }

    #[cfg(test)]
    pub(crate) fn fields(&self) -> Option<&SpanFields> {
        self.data.as_ref()
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("span_context", &self.span_context)
            .field("data", &self.data)
            .finish()
    }
}

impl Drop for Span {
    /// Report span on inner drop. A span dropped during a panic is marked as
    /// failed first.
    fn drop(&mut self) {
        if thread::panicking() {
            self.with_data(|data| {
                if !data.status.is_error() {
                    data.status = Status::error("panicked");
                }
            });
        }
        self.end();
    }
}

fn upsert_attribute(attributes: &mut Vec<KeyValue>, attribute: KeyValue) {
    match attributes.iter_mut().find(|kv| kv.key == attribute.key) {
        Some(existing) => existing.value = attribute.value,
        None => attributes.push(attribute),
    }
}

fn build_export_data(data: SpanFields, span_context: SpanContext, pipeline: &Pipeline) -> SpanData {
    SpanData {
        span_context,
        parent_span_id: data.parent_span_id,
        span_kind: data.span_kind,
        name: data.name,
        start_time: data.start_time,
        end_time: data.end_time,
        attributes: data.attributes,
        events: data.events,
        status: data.status,
        resource: pipeline.resource.clone(),
    }
}

/// The unqualified name of `T`, used as `exception.type`.
///
/// Generic parameters and module paths are stripped and boxes are looked
/// through. Trait objects have no concrete name and report `Error`.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let mut name = std::any::type_name::<T>();
    while let Some(inner) = name
        .strip_prefix("alloc::boxed::Box<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        name = inner;
    }
    if name.starts_with("dyn ") {
        return "Error";
    }
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
