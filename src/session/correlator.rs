//! # Event correlator.
//!
//! The broker multiplexes every acknowledgement over one event stream. The
//! correlator keeps a registry of pending waiters and settles each one with
//! the first event that answers it.
//!
//! ## Flow
//! ```text
//! expect(kind, Expect{token, reject_on}) ──► PendingEvent   (register BEFORE the broker call)
//! broker call ...
//! event pump ──► dispatch(&Event)
//!                  ├─ token waiter: same token && kind == expected  → Resolved
//!                  │                same token && kind == reject_on → Rejected
//!                  └─ tokenless waiter: any event of either kind     → Resolved / Rejected
//! abandon_all() ──► every PendingEvent yields SessionTerminated
//! ```
//!
//! ## Rules
//! - A waiter settles at most once; everything else is ignored.
//! - Two pending waiters never share a token (duplicates are refused).
//! - After `abandon_all()` no new waiter is accepted.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

use crate::error::SessionError;
use crate::events::{CorrelationToken, Event, EventKind};

/// Matching options for [`Correlator::expect`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Expect {
    /// Event kind that rejects the wait.
    pub reject_on: Option<EventKind>,
    /// Only events carrying this token are considered.
    pub token: Option<CorrelationToken>,
}

impl Expect {
    pub fn token(token: CorrelationToken) -> Self {
        Self {
            token: Some(token),
            ..Self::default()
        }
    }

    pub fn reject_on(mut self, kind: EventKind) -> Self {
        self.reject_on = Some(kind);
        self
    }
}

/// How a wait was settled.
#[derive(Clone, Debug)]
pub enum Settlement {
    /// The expected event arrived.
    Resolved(Event),
    /// The rejecting event arrived.
    Rejected(Event),
}

struct Waiter {
    expect: EventKind,
    reject_on: Option<EventKind>,
    tx: oneshot::Sender<Settlement>,
}

impl Waiter {
    fn settlement(&self, ev: &Event) -> Option<Settlement> {
        if ev.kind == self.expect {
            Some(Settlement::Resolved(ev.clone()))
        } else if Some(ev.kind) == self.reject_on {
            Some(Settlement::Rejected(ev.clone()))
        } else {
            None
        }
    }
}

#[derive(Default)]
struct Inner {
    by_token: HashMap<CorrelationToken, Waiter>,
    tokenless: Vec<Waiter>,
    closed: bool,
}

/// Registry of waiters for correlated broker events.
#[derive(Default)]
pub struct Correlator {
    inner: Mutex<Inner>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for `kind`.
    ///
    /// Register before issuing the broker call so an immediate answer is not missed.
    pub fn expect(&self, kind: EventKind, opts: Expect) -> Result<PendingEvent, SessionError> {
        let (tx, rx) = oneshot::channel();
        let waiter = Waiter {
            expect: kind,
            reject_on: opts.reject_on,
            tx,
        };

        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(SessionError::SessionTerminated);
        }
        match opts.token {
            Some(token) => {
                if inner.by_token.get(&token).is_some_and(|w| !w.tx.is_closed()) {
                    return Err(SessionError::Broker {
                        op: "correlate",
                        reason: format!("correlation token {token} already pending"),
                    });
                }
                inner.by_token.insert(token, waiter);
            }
            None => inner.tokenless.push(waiter),
        }
        Ok(PendingEvent { rx })
    }

    /// Offers an event to pending waiters. Returns the number of waiters settled.
    pub fn dispatch(&self, ev: &Event) -> usize {
        let mut inner = self.inner.lock();
        let mut settled = 0;

        if let Some(token) = ev.token {
            let outcome = inner.by_token.get(&token).and_then(|w| w.settlement(ev));
            if let Some(outcome) = outcome {
                if let Some(waiter) = inner.by_token.remove(&token) {
                    if waiter.tx.send(outcome).is_ok() {
                        settled += 1;
                    }
                }
            } else if matches!(
                ev.kind,
                EventKind::SubscriptionOk
                    | EventKind::SubscriptionError
                    | EventKind::Acknowledged
                    | EventKind::Rejected
            ) && !inner.by_token.contains_key(&token)
            {
                trace!(%token, kind = ev.kind.as_label(), "no pending waiter for token");
            }
        }

        let mut i = 0;
        while i < inner.tokenless.len() {
            let w = &inner.tokenless[i];
            if w.tx.is_closed() {
                inner.tokenless.swap_remove(i);
                continue;
            }
            match w.settlement(ev) {
                Some(outcome) => {
                    let waiter = inner.tokenless.swap_remove(i);
                    if waiter.tx.send(outcome).is_ok() {
                        settled += 1;
                    }
                }
                None => i += 1,
            }
        }

        inner.by_token.retain(|_, w| !w.tx.is_closed());
        settled
    }

    /// Drops every waiter; each resolves with [`SessionError::SessionTerminated`].
    pub fn abandon_all(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.by_token.clear();
        inner.tokenless.clear();
    }

    /// Number of waiters still pending.
    pub fn pending(&self) -> usize {
        let inner = self.inner.lock();
        inner.by_token.len() + inner.tokenless.len()
    }
}

/// Future of one registered wait.
///
/// Yields `SessionTerminated` when the correlator is abandoned first.
#[must_use = "a pending event does nothing unless awaited"]
pub struct PendingEvent {
    rx: oneshot::Receiver<Settlement>,
}

impl Future for PendingEvent {
    type Output = Result<Settlement, SessionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.map_err(|_| SessionError::SessionTerminated))
    }
}
