//! # Topic observation handle.
//!
//! [`Observation`] is the caller side of one attach: a stream of
//! [`MessageEnvelope`]s that ends when the session is disposed, and ends after
//! a single `Err` when the subscription is rejected. Dropping it detaches.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

use crate::error::SessionError;
use crate::topic::TopicPattern;

use super::router::{Delivery, MessageEnvelope};

type SubscribedCallback = Arc<dyn Fn() + Send + Sync>;

/// Options of [`SessionManager::observe`](crate::SessionManager::observe).
#[derive(Clone, Default)]
pub struct ObserveOptions {
    /// Called once the broker subscription for this attach is in place.
    pub on_subscribed: Option<SubscribedCallback>,
    /// Broker-side subscribe timeout; overrides [`Config::subscribe_timeout`](crate::Config::subscribe_timeout).
    pub subscribe_timeout: Option<Duration>,
}

impl ObserveOptions {
    pub fn on_subscribed(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_subscribed = Some(Arc::new(f));
        self
    }

    pub fn subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.subscribe_timeout = Some(timeout);
        self
    }

    pub(crate) fn notify_subscribed(&self) {
        if let Some(f) = &self.on_subscribed {
            f();
        }
    }
}

impl fmt::Debug for ObserveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserveOptions")
            .field("on_subscribed", &self.on_subscribed.is_some())
            .field("subscribe_timeout", &self.subscribe_timeout)
            .finish()
    }
}

/// Stream of envelopes for one observed pattern.
///
/// Yields:
/// - `Ok(envelope)` per matching inbound message,
/// - at most one `Err(SubscriptionRejected | Broker)`, after which it ends,
/// - `None` once the session is disposed or the attach failed.
#[must_use = "an observation detaches as soon as it is dropped"]
pub struct Observation {
    pattern: TopicPattern,
    rx: mpsc::UnboundedReceiver<Delivery>,
    _detach: DropGuard,
}

impl Observation {
    pub(crate) fn new(
        pattern: TopicPattern,
        rx: mpsc::UnboundedReceiver<Delivery>,
        detach: DropGuard,
    ) -> Self {
        Self {
            pattern,
            rx,
            _detach: detach,
        }
    }

    /// Pattern this observation was created with.
    pub fn pattern(&self) -> &TopicPattern {
        &self.pattern
    }

    /// Detaches explicitly (same as dropping).
    pub fn detach(self) {}
}

impl Stream for Observation {
    type Item = Result<MessageEnvelope, SessionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl fmt::Debug for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observation")
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}
