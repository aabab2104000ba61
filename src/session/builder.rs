use std::sync::Arc;

use crate::{
    broker::SessionFactory,
    config::{Config, SessionConfig},
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

use super::manager::SessionManager;

/// Builder for a [`SessionManager`].
pub struct SessionManagerBuilder {
    cfg: Config,
    factory: Arc<dyn SessionFactory>,
    session_config: Option<SessionConfig>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SessionManagerBuilder {
    /// Creates a builder with default [`Config`].
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            cfg: Config::default(),
            factory,
            session_config: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the runtime configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the connection properties used by [`SessionManager::connect_with_defaults`].
    pub fn with_session_config(mut self, session: SessionConfig) -> Self {
        self.session_config = Some(session);
        self
    }

    /// Sets lifecycle event subscribers.
    ///
    /// Subscribers receive every event published on the bus through dedicated
    /// workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the manager and starts the subscriber workers.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Arc<SessionManager> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));

        let manager = Arc::new(SessionManager::new_internal(
            self.cfg,
            self.factory,
            self.session_config,
            bus,
            subs,
        ));
        manager.subscriber_listener();
        manager
    }
}
