//! # Message router.
//!
//! Holds one route per attached observation. Every inbound message is tested
//! against every route's pattern; each match gets its own freshly built
//! [`MessageEnvelope`].
//!
//! ## Rules
//! - Delivery happens inline in the event pump, in inbound order.
//! - A route only ever receives messages matching its pattern.
//! - `complete_all()` drops every route sender; observation streams end without error.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::broker::{Destination, Headers, InboundMessage, decode_headers};
use crate::error::SessionError;
use crate::topic::{Params, TopicPattern};

/// Item type of an observation stream.
pub(crate) type Delivery = Result<MessageEnvelope, SessionError>;

/// A delivered message plus what the manager derived from it.
#[derive(Clone, Debug)]
pub struct MessageEnvelope {
    /// The message as received.
    pub message: Arc<InboundMessage>,
    /// Named-segment captures of the observed pattern.
    pub params: Params,
    /// Decoded user properties.
    pub headers: Headers,
}

impl MessageEnvelope {
    pub fn destination(&self) -> &Destination {
        &self.message.destination
    }

    pub fn payload(&self) -> Option<&Bytes> {
        self.message.payload.as_ref()
    }

    /// Named-segment value, if captured.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Identifier of one route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RouteId(u64);

struct Route {
    pattern: TopicPattern,
    tx: mpsc::UnboundedSender<Delivery>,
}

/// Routes inbound messages to observations.
#[derive(Default)]
pub(crate) struct Router {
    routes: Mutex<HashMap<RouteId, Route>>,
    next: AtomicU64,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, pattern: TopicPattern, tx: mpsc::UnboundedSender<Delivery>) -> RouteId {
        let id = RouteId(self.next.fetch_add(1, Ordering::Relaxed));
        self.routes.lock().insert(id, Route { pattern, tx });
        id
    }

    pub fn remove(&self, id: RouteId) -> bool {
        self.routes.lock().remove(&id).is_some()
    }

    /// Sends `err` to one route and removes it.
    pub fn fail(&self, id: RouteId, err: SessionError) {
        if let Some(route) = self.routes.lock().remove(&id) {
            let _ = route.tx.send(Err(err));
        }
    }

    /// Delivers `message` to every matching route. Returns the number of deliveries.
    pub fn route(&self, message: &Arc<InboundMessage>) -> usize {
        let destination = message.destination.name();
        let routes = self.routes.lock();
        let mut delivered = 0;
        for route in routes.values() {
            let Some(params) = route.pattern.captures(destination) else {
                continue;
            };
            let envelope = MessageEnvelope {
                message: Arc::clone(message),
                params,
                headers: decode_headers(&message.user_properties),
            };
            if route.tx.send(Ok(envelope)).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Drops every route; their streams complete.
    pub fn complete_all(&self) {
        self.routes.lock().clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.routes.lock().len()
    }
}
