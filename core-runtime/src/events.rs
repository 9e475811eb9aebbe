//! # Event Bus System
//!
//! Typed publish/subscribe bus that decouples the playback core from its
//! observers (analytics, notification generation, recently-played tracking).
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: a closed [`EventType`] tag set plus free-form JSON properties
//! - **EventBus**: the fan-out point; every mutating player operation publishes here
//! - **Subscriptions**: callbacks registered for one type or for all types (`*`)
//! - **EventStream**: channel-backed subscriber for consumers living on another task
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  publish   ┌───────────┐  callback   ┌────────────────────┐
//! │ Session Manager  ├───────────>│           ├────────────>│ RecentlyPlayed     │
//! └──────────────────┘            │ EventBus  │             └────────────────────┘
//!                                 │           │  callback   ┌────────────────────┐
//!                                 │           ├────────────>│ NotificationCenter │
//!                                 │           │             └────────────────────┘
//!                                 │           │  channel    ┌────────────────────┐
//!                                 │           ├────────────>│ EventStream (async)│
//!                                 └───────────┘             └────────────────────┘
//! ```
//!
//! ## Delivery Guarantees
//!
//! `publish` runs every matching subscriber synchronously, on the caller's
//! thread, before it returns: first the subscribers registered for the exact
//! event type, then the wildcard subscribers, each group in registration order.
//! There is no queue. Subscribers must therefore be cheap; anything that
//! needs I/O should hand the event to an [`EventStream`] and return.
//!
//! A panicking subscriber is caught and logged. It never prevents the
//! remaining subscribers from running and never reaches the publisher.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, EventType, into_properties};
//! use serde_json::json;
//!
//! let bus = EventBus::new();
//! let subscription = bus.subscribe_to_type(EventType::TrackPlay, |event| {
//!     println!("now playing {:?}", event.str_property("track_id"));
//! });
//!
//! bus.publish(
//!     EventType::TrackPlay,
//!     into_properties(json!({ "track_id": "t-1", "source": "direct" })),
//! );
//!
//! subscription.unsubscribe();
//! ```

use bridge_traits::time::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Free-form event payload.
pub type Properties = serde_json::Map<String, Value>;

/// Callback invoked for every matching event.
pub type EventCallback = Arc<dyn Fn(&AnalyticsEvent) + Send + Sync>;

/// Converts a JSON object into [`Properties`].
///
/// Non-object values produce an empty map.
pub fn into_properties(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        _ => Properties::new(),
    }
}

// ============================================================================
// Event Types
// ============================================================================

/// Closed set of event tags published by the player core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A track started playing or resumed
    TrackPlay,
    /// Playback was paused
    TrackPause,
    /// The user seeked within the current track
    TrackSeek,
    /// Playback moved to another track before the current one finished
    TrackSkip,
    /// The current track played to its end
    TrackComplete,
    /// A track was added to the local library
    TrackUploaded,
    /// A track was removed from the local library
    TrackRemoved,
    /// The play-next queue was rewritten by the host
    QueueUpdated,
    /// Anything else; the `action` property names it
    CustomEvent,
}

impl EventType {
    pub const ALL: [EventType; 9] = [
        EventType::TrackPlay,
        EventType::TrackPause,
        EventType::TrackSeek,
        EventType::TrackSkip,
        EventType::TrackComplete,
        EventType::TrackUploaded,
        EventType::TrackRemoved,
        EventType::QueueUpdated,
        EventType::CustomEvent,
    ];

    /// Wire name of the tag
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::TrackPlay => "track_play",
            EventType::TrackPause => "track_pause",
            EventType::TrackSeek => "track_seek",
            EventType::TrackSkip => "track_skip",
            EventType::TrackComplete => "track_complete",
            EventType::TrackUploaded => "track_uploaded",
            EventType::TrackRemoved => "track_removed",
            EventType::QueueUpdated => "queue_updated",
            EventType::CustomEvent => "custom_event",
        }
    }

    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &'static str {
        match self {
            EventType::TrackPlay => "Playback started",
            EventType::TrackPause => "Playback paused",
            EventType::TrackSeek => "Playback position changed",
            EventType::TrackSkip => "Track skipped",
            EventType::TrackComplete => "Track completed",
            EventType::TrackUploaded => "Track added to library",
            EventType::TrackRemoved => "Track removed from library",
            EventType::QueueUpdated => "Queue updated",
            EventType::CustomEvent => "Player action",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| crate::Error::Config(format!("Unknown event type: {}", s)))
    }
}

/// Which events a subscriber wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFilter {
    /// Every event (`*`)
    All,
    /// Only events with this exact tag
    Type(EventType),
}

impl EventFilter {
    pub fn matches(&self, event_type: EventType) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Type(t) => *t == event_type,
        }
    }
}

impl From<EventType> for EventFilter {
    fn from(event_type: EventType) -> Self {
        EventFilter::Type(event_type)
    }
}

impl FromStr for EventFilter {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            Ok(EventFilter::All)
        } else {
            s.parse().map(EventFilter::Type)
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
}

/// Immutable record delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub properties: Properties,
    /// Attribution context active on the bus when the event was published
    pub user_id: Option<String>,
}

impl AnalyticsEvent {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// String property, `None` if missing or not a string
    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Returns the `action` property of a `custom_event`.
    pub fn action(&self) -> Option<&str> {
        self.str_property("action")
    }

    pub fn description(&self) -> &'static str {
        self.event_type.description()
    }

    pub fn severity(&self) -> EventSeverity {
        match self.event_type {
            EventType::TrackSeek | EventType::CustomEvent => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Fallible subscriber.
///
/// Errors returned from [`EventSink::handle`] are logged by the bus and
/// otherwise ignored.
pub trait EventSink: Send + Sync {
    /// Name used in log records when the sink fails
    fn name(&self) -> &str {
        "event-sink"
    }

    fn handle(&self, event: &AnalyticsEvent) -> anyhow::Result<()>;
}

/// Sink that writes every event to the `analytics` tracing target.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn handle(&self, event: &AnalyticsEvent) -> anyhow::Result<()> {
        let properties = serde_json::to_string(&event.properties)?;
        info!(
            target: "analytics",
            event_type = %event.event_type,
            user_id = event.user_id.as_deref().unwrap_or("anonymous"),
            properties = %properties,
            "{}",
            event.description()
        );
        Ok(())
    }
}

// ============================================================================
// Event Bus
// ============================================================================

struct Registered {
    id: u64,
    callback: EventCallback,
}

#[derive(Default)]
struct Registry {
    typed: HashMap<EventType, Vec<Registered>>,
    wildcard: Vec<Registered>,
}

impl Registry {
    fn len(&self) -> usize {
        self.wildcard.len() + self.typed.values().map(Vec::len).sum::<usize>()
    }
}

struct Inner {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
    user_id: RwLock<Option<String>>,
    debug_mode: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Callbacks run outside the lock, so poisoning only follows a panic
        // inside the bus itself; the registry is still consistent then.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: u64, filter: EventFilter) -> bool {
        let mut registry = self.registry();
        let list = match filter {
            EventFilter::All => &mut registry.wildcard,
            EventFilter::Type(t) => match registry.typed.get_mut(&t) {
                Some(list) => list,
                None => return false,
            },
        };
        let before = list.len();
        list.retain(|r| r.id != id);
        before != list.len()
    }
}

/// Central event bus for publishing and subscribing to player events.
///
/// Cloning is cheap and every clone shares the same subscriber lists and
/// attribution context.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Creates a bus stamping events with the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a bus stamping events with the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::default()),
                next_id: AtomicU64::new(1),
                user_id: RwLock::new(None),
                debug_mode: AtomicBool::new(false),
                clock,
            }),
        }
    }

    /// Sets the user id attached to every subsequently published event.
    pub fn set_user_id(&self, user_id: Option<String>) {
        let mut guard = self
            .inner
            .user_id
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = user_id;
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner
            .user_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Toggles logging of every publish call at `debug` level.
    pub fn set_debug_mode(&self, enabled: bool) {
        self.inner.debug_mode.store(enabled, Ordering::Relaxed);
    }

    pub fn is_debug_mode(&self) -> bool {
        self.inner.debug_mode.load(Ordering::Relaxed)
    }

    /// Registers a callback for every event regardless of type.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&AnalyticsEvent) + Send + Sync + 'static,
    {
        self.subscribe_to_type(EventFilter::All, callback)
    }

    /// Registers a callback for one event type, or for all with [`EventFilter::All`].
    pub fn subscribe_to_type<F>(&self, filter: impl Into<EventFilter>, callback: F) -> Subscription
    where
        F: Fn(&AnalyticsEvent) + Send + Sync + 'static,
    {
        let filter = filter.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Registered {
            id,
            callback: Arc::new(callback),
        };

        {
            let mut registry = self.inner.registry();
            match filter {
                EventFilter::All => registry.wildcard.push(entry),
                EventFilter::Type(t) => registry.typed.entry(t).or_default().push(entry),
            }
        }

        debug!(subscription_id = id, filter = ?filter, "Subscriber registered");

        Subscription {
            id,
            filter,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Registers a fallible sink; its errors are logged and swallowed.
    pub fn subscribe_sink(
        &self,
        filter: impl Into<EventFilter>,
        sink: Arc<dyn EventSink>,
    ) -> Subscription {
        self.subscribe_to_type(filter, move |event| {
            if let Err(e) = sink.handle(event) {
                warn!(
                    sink = sink.name(),
                    event_type = %event.event_type,
                    error = %e,
                    "Event sink failed"
                );
            }
        })
    }

    /// Registers a channel-backed subscriber.
    ///
    /// Events are pushed onto an unbounded channel from the publishing
    /// thread and can be consumed from any task.
    pub fn stream(&self, filter: impl Into<EventFilter>) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe_to_type(filter, move |event| {
            // Receiver gone means the stream was dropped; nothing to do.
            let _ = tx.send(event.clone());
        });
        EventStream {
            receiver: rx,
            subscription: Some(subscription),
        }
    }

    /// Publishes an event to all matching subscribers.
    ///
    /// Builds the record (timestamp from the bus clock, user id from the
    /// attribution context), then invokes the exact-type subscribers followed
    /// by the wildcard subscribers. Returns the number of subscribers that
    /// completed without panicking.
    pub fn publish(&self, event_type: EventType, properties: Properties) -> usize {
        let event = AnalyticsEvent {
            event_type,
            timestamp: self.inner.clock.now(),
            properties,
            user_id: self.user_id(),
        };

        // Snapshot so callbacks may subscribe or unsubscribe re-entrantly.
        let targets: Vec<EventCallback> = {
            let registry = self.inner.registry();
            registry
                .typed
                .get(&event_type)
                .into_iter()
                .flatten()
                .chain(registry.wildcard.iter())
                .map(|r| Arc::clone(&r.callback))
                .collect()
        };

        if self.is_debug_mode() {
            let keys: Vec<&str> = event.properties.keys().map(String::as_str).collect();
            debug!(
                event_type = %event_type,
                subscribers = targets.len(),
                properties = ?keys,
                "Publishing event"
            );
        }

        let mut delivered = 0;
        for callback in targets {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(&event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    error!(
                        event_type = %event_type,
                        panic = %panic_message(payload.as_ref()),
                        "Event subscriber panicked"
                    );
                }
            }
        }

        delivered
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .field("debug_mode", &self.is_debug_mode())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ============================================================================
// Subscription handles
// ============================================================================

/// Handle returned by the `subscribe*` methods.
///
/// Dropping the handle leaves the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    filter: EventFilter,
    bus: Weak<Inner>,
}

impl Subscription {
    /// Removes the callback. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.bus.upgrade() {
            Some(inner) => inner.remove(self.id, self.filter),
            None => false,
        }
    }

    pub fn filter(&self) -> EventFilter {
        self.filter
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .finish()
    }
}

/// Channel-backed subscriber created by [`EventBus::stream`].
///
/// Dropping the stream unsubscribes it.
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<AnalyticsEvent>,
    subscription: Option<Subscription>,
}

impl EventStream {
    /// Waits for the next event. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<AnalyticsEvent> {
        self.receiver.recv().await
    }

    /// Returns the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<AnalyticsEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("subscription", &self.subscription)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
