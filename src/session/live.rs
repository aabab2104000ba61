//! # Per-session state.
//!
//! Everything that lives exactly as long as one broker session: the broker
//! handle, its subscription counter, serial lane, correlator and router.
//! A reconnect at the broker level keeps the same `Live`; a new `connect()`
//! after disposal builds a fresh one.
//!
//! ## Disposal
//! ```text
//! dispose() ─► counter.destroy() ─► lane.destroy() ─► correlator.abandon_all()
//!          ─► router.complete_all() ─► disposed.cancel() ─► broker.dispose()
//! ```
//! Runs once; later calls are no-ops.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;

use crate::broker::BrokerSession;
use crate::error::SessionError;
use crate::events::{CorrelationToken, EventKind};
use crate::topic::SubscriptionCounter;

use super::correlator::{Correlator, Expect, Settlement};
use super::lane::SerialLane;
use super::router::Router;

/// Broker-side subscription call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SubscriptionOp {
    Subscribe,
    Unsubscribe,
}

impl SubscriptionOp {
    fn as_label(self) -> &'static str {
        match self {
            SubscriptionOp::Subscribe => "subscribe",
            SubscriptionOp::Unsubscribe => "unsubscribe",
        }
    }
}

pub(crate) struct Live {
    pub id: u64,
    pub broker: Arc<dyn BrokerSession>,
    pub counter: SubscriptionCounter,
    pub correlator: Correlator,
    pub router: Router,
    lane: SerialLane,
    disposed: CancellationToken,
    disposing: AtomicBool,
}

impl Live {
    pub fn new(id: u64, broker: Arc<dyn BrokerSession>) -> Self {
        Self {
            id,
            broker,
            counter: SubscriptionCounter::new(),
            correlator: Correlator::new(),
            router: Router::new(),
            lane: SerialLane::new(),
            disposed: CancellationToken::new(),
            disposing: AtomicBool::new(false),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.is_cancelled()
    }

    /// Resolves once the session has been disposed.
    pub fn disposed(&self) -> WaitForCancellationFuture<'_> {
        self.disposed.cancelled()
    }

    /// Tears the session down. Returns `false` if it was already torn down.
    pub fn dispose(&self) -> bool {
        if self.disposing.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.counter.destroy();
        self.lane.destroy();
        self.correlator.abandon_all();
        self.router.complete_all();
        self.disposed.cancel();
        self.broker.dispose();
        true
    }

    /// Queues a subscribe/unsubscribe on the serial lane.
    ///
    /// The call is queued immediately; the returned future only reports the outcome.
    pub fn schedule(
        self: &Arc<Self>,
        op: SubscriptionOp,
        pattern: String,
        confirm: bool,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<(), SessionError>> + Send + use<> {
        let live = Arc::clone(self);
        let queued = self
            .lane
            .schedule(async move { live.run(op, &pattern, confirm, timeout).await });
        async move { queued.await? }
    }

    async fn run(
        &self,
        op: SubscriptionOp,
        pattern: &str,
        confirm: bool,
        timeout: Option<Duration>,
    ) -> Result<(), SessionError> {
        if self.is_disposed() {
            return Err(SessionError::SessionTerminated);
        }

        let token = CorrelationToken::new();
        let ack = if confirm {
            Some(self.correlator.expect(
                EventKind::SubscriptionOk,
                Expect::token(token).reject_on(EventKind::SubscriptionError),
            )?)
        } else {
            None
        };

        debug!(session = self.id, op = op.as_label(), pattern, %token, "broker call");
        let issued = match op {
            SubscriptionOp::Subscribe => self.broker.subscribe(pattern, confirm, token, timeout),
            SubscriptionOp::Unsubscribe => {
                self.broker.unsubscribe(pattern, confirm, token, timeout)
            }
        };
        issued.map_err(|e| SessionError::broker(op.as_label(), e))?;

        let Some(ack) = ack else {
            return Ok(());
        };
        match ack.await? {
            Settlement::Resolved(_) => Ok(()),
            Settlement::Rejected(ev) => Err(SessionError::SubscriptionRejected {
                topic: pattern.to_string(),
                reason: ev.reason_or_unknown(),
            }),
        }
    }
}
