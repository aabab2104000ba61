//! # Session manager: lifecycle, event pump and connection state.
//!
//! [`SessionManager`] owns at most one live broker session at a time and
//! drives it through its lifecycle.
//!
//! ## Architecture
//! ```text
//! connect(cfg) ──► single-flight attempt ──► factory.create(cfg, sink) ──► broker.connect()
//!                                                   │
//!          broker events ──► EventSink ──► pump ────┤
//!                                                   ├─► Message   → router.route()  → observations
//!                                                   ├─► lifecycle → phase / current / connected
//!                                                   ├─► any       → correlator.dispatch()
//!                                                   ├─► lifecycle → Bus → events() / subscribers
//!                                                   └─► terminal  → dispose()
//! ```
//!
//! ## Phases
//! ```text
//! Disconnected ─► Connecting ─► Connected ⇄ Reconnecting
//!       ▲                          │
//!       └────── Disconnecting ◄────┘   (disconnect())
//!       └──────────────────────────────  (connect failed / down / disconnected)
//! ```
//!
//! ## Rules
//! - Concurrent `connect()` calls share one attempt; an established session short-circuits.
//! - A session is disposed exactly once; afterwards the broker receives no call but `dispose()`.
//! - `connection_state()` only ever changes value; repeated states are swallowed.
//! - Events from a disposed session never reach its successor (one sink per session).

use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::broker::{EventSink, SessionFactory};
use crate::config::{Config, SessionConfig};
use crate::error::SessionError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::SubscriberSet;

use super::builder::SessionManagerBuilder;
use super::correlator::{Expect, Settlement};
use super::live::Live;

type ConnectAttempt = Shared<BoxFuture<'static, Result<(), SessionError>>>;

/// Lifecycle phase of the managed session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No session.
    Disconnected,
    /// Session created, waiting for `SessionUp`.
    Connecting,
    /// Session established.
    Connected,
    /// Link lost; the broker is retrying.
    Reconnecting,
    /// `disconnect()` issued, waiting for `Disconnected`.
    Disconnecting,
}

impl Phase {
    pub fn as_label(self) -> &'static str {
        match self {
            Phase::Disconnected => "disconnected",
            Phase::Connecting => "connecting",
            Phase::Connected => "connected",
            Phase::Reconnecting => "reconnecting",
            Phase::Disconnecting => "disconnecting",
        }
    }
}

struct State {
    phase: Phase,
    live: Option<Arc<Live>>,
    connecting: Option<ConnectAttempt>,
}

/// Manages one broker session and multiplexes observations over it.
pub struct SessionManager {
    pub(super) cfg: Config,
    factory: Arc<dyn SessionFactory>,
    session_config: Option<SessionConfig>,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    state: Mutex<State>,
    /// Established session, observed by attaches waiting to subscribe.
    current: watch::Sender<Option<Arc<Live>>>,
    connected: watch::Sender<bool>,
    next_id: AtomicU64,
}

impl SessionManager {
    /// Returns a builder for a manager creating sessions through `factory`.
    pub fn builder(factory: impl SessionFactory) -> SessionManagerBuilder {
        SessionManagerBuilder::new(Arc::new(factory))
    }

    pub(super) fn new_internal(
        cfg: Config,
        factory: Arc<dyn SessionFactory>,
        session_config: Option<SessionConfig>,
        bus: Bus,
        subs: Arc<SubscriberSet>,
    ) -> Self {
        Self {
            cfg,
            factory,
            session_config,
            bus,
            subs,
            state: Mutex::new(State {
                phase: Phase::Disconnected,
                live: None,
                connecting: None,
            }),
            current: watch::Sender::new(None),
            connected: watch::Sender::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    /// Forwards bus events to the subscriber set (fire-and-forget).
    ///
    /// Holds the set weakly: dropping the manager drops the set, its workers
    /// and their bus handles, which closes the bus and ends this task.
    pub(super) fn subscriber_listener(&self) {
        if self.subs.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let set = Arc::downgrade(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => match set.upgrade() {
                        Some(set) => set.emit(&ev),
                        None => break,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    /// Connection state stream.
    ///
    /// The receiver starts with the latest value and is notified only when it changes.
    pub fn connection_state(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Lifecycle events reported by the broker, plus manager-published ones.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Connects with the session configuration given to the builder.
    ///
    /// Fails with [`SessionError::Configuration`] when none was given.
    pub async fn connect_with_defaults(self: &Arc<Self>) -> Result<(), SessionError> {
        let config = self.session_config.clone().unwrap_or_default();
        self.connect(config).await
    }

    /// Establishes the broker session.
    ///
    /// Concurrent callers share one attempt. Resolves immediately when a session
    /// is already established.
    pub async fn connect(self: &Arc<Self>, config: SessionConfig) -> Result<(), SessionError> {
        config.validate()?;

        let attempt = {
            let mut st = self.state.lock();
            match &st.connecting {
                Some(attempt) => attempt.clone(),
                None if st.live.is_some() && st.phase != Phase::Disconnecting => return Ok(()),
                None => {
                    let attempt = Arc::clone(self).establish(config).boxed().shared();
                    st.connecting = Some(attempt.clone());
                    st.phase = Phase::Connecting;
                    attempt
                }
            }
        };
        attempt.await
    }

    async fn establish(self: Arc<Self>, config: SessionConfig) -> Result<(), SessionError> {
        let result = self.try_establish(&config).await;

        let mut st = self.state.lock();
        st.connecting = None;
        if let Err(e) = &result {
            if st.live.is_none() {
                st.phase = Phase::Disconnected;
            }
            warn!(url = %config.url, error = %e, "connect failed");
        }
        result
    }

    async fn try_establish(self: &Arc<Self>, config: &SessionConfig) -> Result<(), SessionError> {
        let (sink, events) = EventSink::channel();
        let broker = self
            .factory
            .create(config, sink)
            .map_err(|e| SessionError::broker("create", e))?;
        let live = Arc::new(Live::new(self.next_id.fetch_add(1, Ordering::Relaxed), broker));

        let up = live.correlator.expect(
            EventKind::SessionUp,
            Expect::default().reject_on(EventKind::ConnectFailed),
        )?;
        self.state.lock().live = Some(Arc::clone(&live));
        tokio::spawn(Self::pump(Arc::downgrade(self), Arc::clone(&live), events));

        debug!(session = live.id, url = %config.url, vpn = %config.vpn_name, "connecting");
        if let Err(e) = live.broker.connect() {
            self.dispose(&live, "connect call failed");
            return Err(SessionError::broker("connect", e));
        }

        match up.await? {
            Settlement::Resolved(_) => {
                info!(session = live.id, url = %config.url, "session established");
                Ok(())
            }
            Settlement::Rejected(ev) => {
                self.dispose(&live, "connect failed");
                Err(SessionError::ConnectFailed {
                    reason: ev.reason_or_unknown(),
                })
            }
        }
    }

    /// Gracefully disconnects and disposes the session. No session → `Ok`.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        let live = {
            let mut st = self.state.lock();
            let Some(live) = st.live.clone() else {
                return Ok(());
            };
            st.phase = Phase::Disconnecting;
            live
        };

        let Ok(down) = live
            .correlator
            .expect(EventKind::Disconnected, Expect::default())
        else {
            return Ok(());
        };

        debug!(session = live.id, "disconnecting");
        if let Err(e) = live.broker.disconnect() {
            self.dispose(&live, "disconnect call failed");
            return Err(SessionError::broker("disconnect", e));
        }

        // settled by `Disconnected`, or abandoned when the session died meanwhile
        let _ = down.await;
        self.dispose(&live, "disconnected");
        Ok(())
    }

    /// Resolves with the established session, waiting for one if needed.
    pub(super) async fn established(&self) -> Option<Arc<Live>> {
        let mut rx = self.current.subscribe();
        let current = rx
            .wait_for(|c| c.as_ref().is_some_and(|l| !l.is_disposed()))
            .await
            .ok()?;
        current.as_ref().cloned()
    }

    /// Established session, if any.
    pub(super) fn current(&self) -> Option<Arc<Live>> {
        self.current
            .borrow()
            .as_ref()
            .filter(|l| !l.is_disposed())
            .cloned()
    }

    async fn pump(
        manager: Weak<Self>,
        live: Arc<Live>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        loop {
            let ev = tokio::select! {
                biased;
                _ = live.disposed() => break,
                ev = events.recv() => match ev {
                    Some(ev) => ev,
                    None => break,
                },
            };
            let Some(manager) = manager.upgrade() else {
                live.dispose();
                break;
            };
            manager.handle_event(&live, ev);
        }
        debug!(session = live.id, "event pump stopped");
    }

    fn handle_event(&self, live: &Arc<Live>, ev: Event) {
        if ev.kind == EventKind::Message {
            if let Some(message) = &ev.message {
                live.router.route(message);
            }
            return;
        }

        if self.track_phase(live, ev.kind) {
            match ev.kind {
                EventKind::SessionUp | EventKind::Reconnected => {
                    if ev.kind == EventKind::Reconnected {
                        info!(session = live.id, "session reconnected");
                    }
                    self.current.send_replace(Some(Arc::clone(live)));
                }
                EventKind::Reconnecting => {
                    warn!(session = live.id, "connection lost, broker reconnecting");
                }
                _ => {}
            }
            if let Some(up) = ev.kind.connectivity() {
                self.set_connected(up);
            }
        }
        live.correlator.dispatch(&ev);

        let kind = ev.kind;
        let reason = ev.reason.clone();
        self.bus.publish(ev);

        if kind.is_terminal() {
            let reason = reason.as_deref().unwrap_or(kind.as_label()).to_string();
            self.dispose(live, &reason);
        }
    }

    fn is_current(st: &State, live: &Arc<Live>) -> bool {
        st.live.as_ref().is_some_and(|l| Arc::ptr_eq(l, live))
    }

    /// Applies `kind` to the phase. Returns `false` when the event must not
    /// touch the connection state: a stale session, or a link change while disconnecting.
    fn track_phase(&self, live: &Arc<Live>, kind: EventKind) -> bool {
        let mut st = self.state.lock();
        if !Self::is_current(&st, live) {
            return false;
        }
        let next = match kind {
            EventKind::SessionUp | EventKind::Reconnected => Phase::Connected,
            EventKind::Reconnecting => Phase::Reconnecting,
            _ => return true,
        };
        if st.phase == Phase::Disconnecting {
            return false;
        }
        st.phase = next;
        true
    }

    fn set_connected(&self, value: bool) {
        self.connected.send_if_modified(|state| {
            if *state == value {
                return false;
            }
            *state = value;
            true
        });
    }

    /// Disposes `live` once; later calls are no-ops.
    pub(super) fn dispose(&self, live: &Arc<Live>, reason: &str) {
        if !live.dispose() {
            return;
        }

        let was_current = {
            let mut st = self.state.lock();
            let current = Self::is_current(&st, live);
            if current {
                st.live = None;
                st.phase = Phase::Disconnected;
            }
            current
        };
        self.current.send_if_modified(|c| {
            if c.as_ref().is_some_and(|l| Arc::ptr_eq(l, live)) {
                *c = None;
                return true;
            }
            false
        });
        if was_current {
            self.set_connected(false);
        }

        info!(session = live.id, reason, "session disposed");
        self.bus
            .publish(Event::new(EventKind::SessionDisposed).with_reason(reason));
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(live) = self.state.get_mut().live.take() {
            live.dispose();
        }
    }
}
