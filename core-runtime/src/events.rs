//! # Event Bus System
//!
//! Typed publish/subscribe channel between the host and the providers, built on
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! ```text
//! ┌──────────────┐  streaming_started   ┌───────────┐   subscribe   ┌────────────────┐
//! │ Host player  ├─────────────────────>│           ├──────────────>│ Qobuz telemetry│
//! └──────────────┘  streaming_ended     │ EventBus  │               └────────────────┘
//!                                       │ (broadcast│
//! ┌──────────────┐  signed_in / error   │  channel) │   subscribe   ┌────────────────┐
//! │ Session mgr  ├─────────────────────>│           ├──────────────>│ Host UI, logs  │
//! └──────────────┘                      └───────────┘               └────────────────┘
//! ```
//!
//! The host publishes [`PlaybackEvent`]s when a provider stream starts or ends;
//! providers publish [`AuthEvent`]s when their session changes. Every
//! subscriber receives every event; [`EventStream`] adds a filter predicate so a
//! provider only wakes up for its own messages.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut stream = EventStream::new(bus.subscribe())
//!     .filter(|event| matches!(event, CoreEvent::Playback(p) if p.provider() == "qobuz"));
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::StreamingEnded {
//!     provider: "qobuz".to_string(),
//!     track_id: "1234".to_string(),
//!     seconds: 42,
//!     details: serde_json::Value::Null,
//! }))
//! .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.name(), "streaming_ended");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal.
//! - **`RecvError::Closed`**: every sender was dropped; subscribers should exit.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Auth(AuthEvent),
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Host message name (`streaming_started`, `signed_in`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            CoreEvent::Auth(e) => e.name(),
            CoreEvent::Playback(e) => e.name(),
        }
    }

    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(AuthEvent::SignedIn { .. }) => "Provider session established",
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => "Provider authentication failed",
            CoreEvent::Playback(PlaybackEvent::StreamingStarted { .. }) => "Streaming started",
            CoreEvent::Playback(PlaybackEvent::StreamingEnded { .. }) => "Streaming ended",
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::SignedIn { .. }) => EventSeverity::Info,
            CoreEvent::Playback(_) => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Session lifecycle of a provider account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// Login succeeded and a token is cached.
    SignedIn {
        /// Provider instance id (e.g. "qobuz").
        provider: String,
        /// Remote account display name or login.
        user: String,
    },
    /// Login failed; the operation that triggered it yields no data.
    AuthError {
        provider: String,
        message: String,
    },
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::SignedIn { .. } => "signed_in",
            AuthEvent::AuthError { .. } => "auth_error",
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            AuthEvent::SignedIn { provider, .. } | AuthEvent::AuthError { provider, .. } => {
                provider
            }
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Streaming lifecycle notifications published by the host player.
///
/// `details` is the opaque bag returned with the stream details of the track;
/// providers read whatever they recorded there (format identifiers, session
/// hints) when reporting telemetry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    StreamingStarted {
        provider: String,
        track_id: String,
        #[serde(default)]
        details: Value,
    },
    StreamingEnded {
        provider: String,
        track_id: String,
        /// Elapsed playback time in seconds.
        seconds: u64,
        #[serde(default)]
        details: Value,
    },
}

impl PlaybackEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackEvent::StreamingStarted { .. } => "streaming_started",
            PlaybackEvent::StreamingEnded { .. } => "streaming_ended",
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            PlaybackEvent::StreamingStarted { provider, .. }
            | PlaybackEvent::StreamingEnded { provider, .. } => provider,
        }
    }

    pub fn track_id(&self) -> &str {
        match self {
            PlaybackEvent::StreamingStarted { track_id, .. }
            | PlaybackEvent::StreamingEnded { track_id, .. } => track_id,
        }
    }

    pub fn details(&self) -> &Value {
        match self {
            PlaybackEvent::StreamingStarted { details, .. }
            | PlaybackEvent::StreamingEnded { details, .. } => details,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every `subscribe()` creates an
/// independent receiver that only sees events emitted after it was created.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers, or an error when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once all senders are gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv); `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
