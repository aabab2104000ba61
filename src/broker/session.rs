//! # Broker session capability.
//!
//! The vendor session is an external collaborator. The manager consumes it
//! only through [`BrokerSession`] (control calls) and [`EventSink`] (the
//! session's way of reporting asynchronous outcomes).
//!
//! ## Contract
//! ```text
//! SessionManager ── connect/subscribe/send ──► BrokerSession
//!        ▲                                          │
//!        └───── event pump ◄── EventSink::emit ◄────┘
//! ```
//! - Control calls are side-effecting and return immediately; completion is
//!   reported later through the sink (`SessionUp`, `SubscriptionOk`, ...).
//! - Events answering a correlated request carry that request's token.
//! - A returned `Err` means the call was not issued at all.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::SessionConfig;
use crate::error::BrokerError;
use crate::events::{CorrelationToken, Event};

use super::message::{InboundMessage, OutboundMessage};

/// Control surface of a live broker session.
pub trait BrokerSession: Send + Sync + 'static {
    /// Starts connecting. Outcome: `SessionUp` or `ConnectFailed`.
    fn connect(&self) -> Result<(), BrokerError>;

    /// Starts a graceful disconnect. Outcome: `Disconnected`.
    fn disconnect(&self) -> Result<(), BrokerError>;

    /// Releases session resources. Called exactly once, after which no other call is made.
    fn dispose(&self);

    /// Adds a topic subscription. Outcome: `SubscriptionOk` / `SubscriptionError` carrying `token`.
    fn subscribe(
        &self,
        pattern: &str,
        request_confirmation: bool,
        token: CorrelationToken,
        timeout: Option<Duration>,
    ) -> Result<(), BrokerError>;

    /// Removes a topic subscription. Outcome: `SubscriptionOk` / `SubscriptionError` carrying `token`.
    fn unsubscribe(
        &self,
        pattern: &str,
        request_confirmation: bool,
        token: CorrelationToken,
        timeout: Option<Duration>,
    ) -> Result<(), BrokerError>;

    /// Sends a message. Guaranteed messages are later answered by
    /// `Acknowledged` / `Rejected` carrying the message's correlation key.
    fn send(&self, message: OutboundMessage) -> Result<(), BrokerError>;
}

/// Creates broker sessions bound to an [`EventSink`].
pub trait SessionFactory: Send + Sync + 'static {
    fn create(
        &self,
        config: &SessionConfig,
        sink: EventSink,
    ) -> Result<Arc<dyn BrokerSession>, BrokerError>;
}

impl<F> SessionFactory for F
where
    F: Fn(&SessionConfig, EventSink) -> Result<Arc<dyn BrokerSession>, BrokerError>
        + Send
        + Sync
        + 'static,
{
    fn create(
        &self,
        config: &SessionConfig,
        sink: EventSink,
    ) -> Result<Arc<dyn BrokerSession>, BrokerError> {
        self(config, sink)
    }
}

/// Event channel handed to one broker session.
///
/// Each session gets its own sink, so events emitted by a disposed session
/// never reach its successor. Emitting is non-blocking and safe from any thread.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSink {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emits an event. Returns `false` once the session has been disposed.
    pub fn emit(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Emits an inbound message.
    pub fn message(&self, message: InboundMessage) -> bool {
        self.emit(Event::message(message))
    }

    /// True once the manager stopped listening.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
