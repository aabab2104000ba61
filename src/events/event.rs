//! # Broker lifecycle events.
//!
//! The [`EventKind`] enum classifies everything a broker session reports back
//! to the manager, across three categories:
//! - **Lifecycle events**: connection flow (up, reconnecting, down, disconnected)
//! - **Acknowledgement events**: outcome of a correlated request (subscription
//!   confirmations and guaranteed-publish acknowledgements)
//! - **Data events**: inbound messages
//!
//! Subscriber health events (`SubscriberOverflow`, `SubscriberPanicked`) are
//! published by the manager itself.
//!
//! The [`Event`] struct carries the optional metadata: correlation token,
//! topic, reason and (for data events) the inbound message itself.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use topicvisor::{CorrelationToken, Event, EventKind};
//!
//! let token = CorrelationToken::new();
//! let ev = Event::new(EventKind::SubscriptionError)
//!     .with_token(token)
//!     .with_topic("orders/*")
//!     .with_reason("permission denied");
//!
//! assert_eq!(ev.kind, EventKind::SubscriptionError);
//! assert_eq!(ev.token, Some(token));
//! assert_eq!(ev.reason.as_deref(), Some("permission denied"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::broker::InboundMessage;

use super::token::CorrelationToken;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of broker session events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Connection lifecycle ===
    /// Session established for the first time.
    SessionUp,

    /// Session lost and the broker gave up reconnecting.
    ///
    /// Sets:
    /// - `reason`: broker supplied diagnostic
    DownPermanent,

    /// Initial connect attempt failed.
    ///
    /// Sets:
    /// - `reason`: broker supplied diagnostic
    ConnectFailed,

    /// Session disconnected (requested or not).
    Disconnected,

    /// Connection dropped; the broker is retrying.
    Reconnecting,

    /// Connection restored after `Reconnecting`.
    Reconnected,

    /// Session handle released by the manager.
    ///
    /// Published by the manager itself (never by the broker) once per disposal.
    ///
    /// Sets:
    /// - `reason`: what triggered the disposal
    SessionDisposed,

    // === Subscriber health ===
    /// Subscriber queue full or closed; the event was dropped for it.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    /// Subscriber panicked while handling an event.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    // === Correlated acknowledgements ===
    /// Subscribe or unsubscribe confirmed.
    ///
    /// Sets:
    /// - `token`: correlation token of the request
    /// - `topic`: broker-side pattern
    SubscriptionOk,

    /// Subscribe or unsubscribe refused.
    ///
    /// Sets:
    /// - `token`: correlation token of the request
    /// - `topic`: broker-side pattern
    /// - `reason`: broker supplied diagnostic
    SubscriptionError,

    /// Guaranteed message accepted by the broker.
    ///
    /// Sets:
    /// - `token`: correlation key of the published message
    Acknowledged,

    /// Guaranteed message refused by the broker.
    ///
    /// Sets:
    /// - `token`: correlation key of the published message
    /// - `reason`: broker supplied diagnostic
    Rejected,

    // === Data ===
    /// Inbound message.
    ///
    /// Sets:
    /// - `message`: the received message
    Message,
}

impl EventKind {
    /// Connection-state classification: `Some(true)` for established,
    /// `Some(false)` for lost, `None` for events that say nothing about the link.
    pub fn connectivity(self) -> Option<bool> {
        match self {
            EventKind::SessionUp | EventKind::Reconnected => Some(true),
            EventKind::DownPermanent
            | EventKind::ConnectFailed
            | EventKind::Disconnected
            | EventKind::Reconnecting
            | EventKind::SessionDisposed => Some(false),
            _ => None,
        }
    }

    /// True for events the subscriber set publishes about its own subscribers.
    pub fn is_subscriber_health(self) -> bool {
        matches!(
            self,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }

    /// True for events after which the broker session is unusable.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EventKind::DownPermanent | EventKind::ConnectFailed | EventKind::Disconnected
        )
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::SessionUp => "session_up",
            EventKind::DownPermanent => "down_permanent",
            EventKind::ConnectFailed => "connect_failed",
            EventKind::Disconnected => "disconnected",
            EventKind::Reconnecting => "reconnecting",
            EventKind::Reconnected => "reconnected",
            EventKind::SessionDisposed => "session_disposed",
            EventKind::SubscriberOverflow => "subscriber_overflow",
            EventKind::SubscriberPanicked => "subscriber_panicked",
            EventKind::SubscriptionOk => "subscription_ok",
            EventKind::SubscriptionError => "subscription_error",
            EventKind::Acknowledged => "acknowledged",
            EventKind::Rejected => "rejected",
            EventKind::Message => "message",
        }
    }
}

/// Broker event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Correlation token of the request this event answers.
    pub token: Option<CorrelationToken>,
    /// Topic or pattern the event refers to.
    pub topic: Option<Arc<str>>,
    /// Human-readable reason (errors, broker diagnostics).
    pub reason: Option<Arc<str>>,
    /// Inbound message (only for [`EventKind::Message`]).
    pub message: Option<Arc<InboundMessage>>,
    /// Subscriber name (only for subscriber health events).
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            token: None,
            topic: None,
            reason: None,
            message: None,
            subscriber: None,
        }
    }

    /// Creates a message event.
    pub fn message(message: InboundMessage) -> Self {
        let topic: Arc<str> = Arc::from(message.destination.name());
        let mut ev = Event::new(EventKind::Message);
        ev.topic = Some(topic);
        ev.message = Some(Arc::new(message));
        ev
    }

    /// Creates a subscriber overflow event.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Attaches a correlation token.
    #[inline]
    pub fn with_token(mut self, token: CorrelationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Attaches a topic or pattern.
    #[inline]
    pub fn with_topic(mut self, topic: impl Into<Arc<str>>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns the reason or a placeholder for logs and error values.
    pub fn reason_or_unknown(&self) -> String {
        self.reason
            .as_deref()
            .map(str::to_owned)
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Destination;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::SessionUp);
        let b = Event::new(EventKind::SessionUp);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_message_event_sets_topic() {
        let ev = Event::message(InboundMessage::new(Destination::Topic("a/b".into()), None));
        assert_eq!(ev.kind, EventKind::Message);
        assert_eq!(ev.topic.as_deref(), Some("a/b"));
        assert!(ev.message.is_some());
    }

    #[test]
    fn test_connectivity_classification() {
        assert_eq!(EventKind::SessionUp.connectivity(), Some(true));
        assert_eq!(EventKind::Reconnected.connectivity(), Some(true));
        assert_eq!(EventKind::Reconnecting.connectivity(), Some(false));
        assert_eq!(EventKind::Message.connectivity(), None);
        assert_eq!(EventKind::SubscriberOverflow.connectivity(), None);

        assert!(EventKind::DownPermanent.is_terminal());
        assert!(!EventKind::Reconnecting.is_terminal());
    }

    #[test]
    fn test_subscriber_events_carry_name() {
        let ev = Event::subscriber_panicked("audit", "boom".into());
        assert_eq!(ev.subscriber, Some("audit"));
        assert_eq!(ev.reason_or_unknown(), "boom");
        assert_eq!(Event::new(EventKind::Rejected).reason_or_unknown(), "unknown");
    }
}
