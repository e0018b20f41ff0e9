//! Capture spans and events emitted during a test for later assertions.
//!
//! [`capture`] installs a [`RecordingLayer`] for the duration of a closure
//! and hands back a [`Recording`] with lookup helpers keyed on span names
//! and event messages.

mod visitor;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use ::tracing::span::{Attributes, Id, Record};
use ::tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::{LookupSpan, Registry};

use self::visitor::FieldRecorder;

/// Field name `tracing` assigns to an event's message.
const MESSAGE_FIELD: &str = "message";

/// Closed span with its name and every field recorded against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanRecord {
    /// Span name from the `#[instrument(name = ...)]` attribute.
    pub name: String,
    /// Fields recorded at creation or later through `Span::record`.
    pub fields: HashMap<String, String>,
}

impl SpanRecord {
    /// Returns the rendered value of `field`, if it was recorded.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Emitted event with its level, target and fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Event level.
    pub level: Level,
    /// Module path or explicit target of the event.
    pub target: String,
    /// Structured fields, including `message`.
    pub fields: HashMap<String, String>,
}

impl EventRecord {
    /// Returns the event message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.field(MESSAGE_FIELD)
    }

    /// Returns the rendered value of `field`, if it was recorded.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Parses `field` as a floating-point number.
    #[must_use]
    pub fn number(&self, field: &str) -> Option<f64> {
        self.field(field).and_then(|raw| raw.parse().ok())
    }
}

#[derive(Default)]
struct Store {
    spans: Vec<SpanRecord>,
    events: Vec<EventRecord>,
}

/// Layer that copies closed spans and events into shared storage.
#[derive(Clone, Default)]
pub struct RecordingLayer {
    store: Arc<Mutex<Store>>,
}

impl RecordingLayer {
    /// Returns everything recorded so far.
    ///
    /// # Examples
    /// ```
    /// use gcnlink_test_support::tracing::RecordingLayer;
    ///
    /// let layer = RecordingLayer::default();
    /// assert!(layer.recording().spans.is_empty());
    /// ```
    #[must_use]
    pub fn recording(&self) -> Recording {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        Recording {
            spans: store.spans.clone(),
            events: store.events.clone(),
        }
    }

    fn with_store(&self, update: impl FnOnce(&mut Store)) {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut *store);
    }
}

/// Snapshot of the spans and events captured by a [`RecordingLayer`].
#[derive(Debug, Clone, Default)]
pub struct Recording {
    /// Closed spans in completion order.
    pub spans: Vec<SpanRecord>,
    /// Events in emission order.
    pub events: Vec<EventRecord>,
}

impl Recording {
    /// Returns the first closed span called `name`.
    #[must_use]
    pub fn span(&self, name: &str) -> Option<&SpanRecord> {
        self.spans.iter().find(|span| span.name == name)
    }

    /// Returns every event whose message equals `message`.
    pub fn events_with_message<'a>(
        &'a self,
        message: &'a str,
    ) -> impl Iterator<Item = &'a EventRecord> + 'a {
        self.events
            .iter()
            .filter(move |event| event.message() == Some(message))
    }
}

/// Runs `body` with a [`RecordingLayer`] as the thread's default subscriber.
///
/// # Examples
/// ```
/// use gcnlink_test_support::tracing::capture;
///
/// let (value, recording) = capture(|| {
///     tracing::info_span!("work").in_scope(|| tracing::info!(answer = 42, "done"));
///     7
/// });
/// assert_eq!(value, 7);
/// assert!(recording.span("work").is_some());
/// let done = recording.events_with_message("done").next().expect("event recorded");
/// assert_eq!(done.number("answer"), Some(42.0));
/// ```
pub fn capture<T>(body: impl FnOnce() -> T) -> (T, Recording) {
    let layer = RecordingLayer::default();
    let subscriber = Registry::default().with(layer.clone());
    let value = ::tracing::subscriber::with_default(subscriber, body);
    (value, layer.recording())
}

struct PendingSpan(SpanRecord);

impl<S> Layer<S> for RecordingLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut record = SpanRecord {
            name: attrs.metadata().name().to_owned(),
            fields: HashMap::new(),
        };
        attrs.record(&mut FieldRecorder::new(&mut record.fields));
        span.extensions_mut().insert(PendingSpan(record));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        if let Some(PendingSpan(record)) = span.extensions_mut().get_mut::<PendingSpan>() {
            values.record(&mut FieldRecorder::new(&mut record.fields));
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let closed = ctx
            .span(&id)
            .and_then(|span| span.extensions_mut().remove::<PendingSpan>());
        if let Some(PendingSpan(record)) = closed {
            self.with_store(|store| store.spans.push(record));
        }
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldRecorder::new(&mut fields));
        let record = EventRecord {
            level: *event.metadata().level(),
            target: event.metadata().target().to_owned(),
            fields,
        };
        self.with_store(|store| store.events.push(record));
    }
}
