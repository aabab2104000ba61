//! # Attach / detach flow of one observation.
//!
//! ```text
//! observe(pattern) ──► spawn attach task ──► Observation (DropGuard on detach token)
//!
//! attach task:
//!   wait for established session ─► register route ─► counter.increment(normalized)
//!     (the count change and the lane enqueue happen under the counter lock)
//!     ├─ count == 1 → lane: subscribe ─► await SubscriptionOk / SubscriptionError
//!     │                 ├─ ok    → on_subscribed()
//!     │                 └─ error → Err to this observation only, stream ends
//!     └─ count  > 1 → on_subscribed()
//!   wait for detach or disposal
//!   detach: remove route ─► counter.decrement ─► 0 and not errored → lane: unsubscribe
//!   disposal: nothing (the session is gone, streams complete)
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::topic::TopicPattern;

use super::live::{Live, SubscriptionOp};
use super::manager::SessionManager;
use super::observation::{ObserveOptions, Observation};
use super::router::Delivery;

impl SessionManager {
    /// Observes messages on `pattern`.
    ///
    /// The broker subscription is shared by every observation whose pattern
    /// normalizes to the same wire form; it is added with the first and removed
    /// with the last. Observations created before `connect()` wait for the session.
    ///
    /// Fails only on an unparsable pattern; broker refusals arrive on the stream.
    pub fn observe(
        self: &Arc<Self>,
        pattern: &str,
        opts: ObserveOptions,
    ) -> Result<Observation, SessionError> {
        let pattern = TopicPattern::parse(pattern)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let detach = CancellationToken::new();

        let attach = Attach {
            manager: Arc::clone(self),
            pattern: pattern.clone(),
            opts,
            detach: detach.clone(),
        };
        tokio::spawn(attach.run(tx));

        Ok(Observation::new(pattern, rx, detach.drop_guard()))
    }
}

struct Attach {
    manager: Arc<SessionManager>,
    pattern: TopicPattern,
    opts: ObserveOptions,
    detach: CancellationToken,
}

impl Attach {
    async fn run(self, tx: mpsc::UnboundedSender<Delivery>) {
        let live = tokio::select! {
            _ = self.detach.cancelled() => return,
            live = self.manager.established() => match live {
                Some(live) => live,
                None => return,
            },
        };

        let key = self.pattern.normalized().to_string();
        let route = live.router.register(self.pattern.clone(), tx);
        let (count, subscribed) = live.counter.increment_with(&key, |count| {
            let op = (count == 1).then(|| self.schedule(&live, SubscriptionOp::Subscribe, &key));
            (count, op)
        });
        debug!(session = live.id, pattern = %self.pattern, count, "observer attached");

        let mut errored = false;
        if let Some(subscribed) = subscribed {
            tokio::select! {
                res = subscribed => match res {
                    Ok(()) => self.opts.notify_subscribed(),
                    Err(e) if e.is_termination() => return,
                    Err(e) => {
                        warn!(
                            session = live.id,
                            pattern = %self.pattern,
                            error = %e,
                            "subscribe failed"
                        );
                        live.router.fail(route, e);
                        errored = true;
                    }
                },
                // the unsubscribe below queues behind the pending subscribe
                _ = self.detach.cancelled() => {}
                _ = live.disposed() => return,
            }
        } else {
            self.opts.notify_subscribed();
        }

        if !errored {
            tokio::select! {
                _ = self.detach.cancelled() => {}
                _ = live.disposed() => return,
            }
        }

        live.router.remove(route);
        if live.is_disposed() {
            return;
        }
        let (remaining, unsubscribed) = live.counter.decrement_with(&key, |remaining| {
            let op = (remaining == 0 && !errored)
                .then(|| self.schedule(&live, SubscriptionOp::Unsubscribe, &key));
            (remaining, op)
        });
        debug!(session = live.id, pattern = %self.pattern, remaining, "observer detached");

        let Some(unsubscribed) = unsubscribed else {
            return;
        };
        if let Err(e) = unsubscribed.await {
            if !e.is_termination() {
                warn!(session = live.id, pattern = %key, error = %e, "unsubscribe failed");
            }
        }
    }

    fn schedule(
        &self,
        live: &Arc<Live>,
        op: SubscriptionOp,
        key: &str,
    ) -> impl Future<Output = Result<(), SessionError>> + Send + use<> {
        let timeout = self
            .opts
            .subscribe_timeout
            .or_else(|| self.manager.cfg.default_subscribe_timeout());
        live.schedule(op, key.to_string(), self.manager.cfg.request_confirmation, timeout)
    }
}
