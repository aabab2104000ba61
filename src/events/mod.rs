//! Broker events: types, correlation tokens and the broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and metadata
//! - [`CorrelationToken`] request/acknowledgement link
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: broker sessions (through [`EventSink`](crate::EventSink)),
//!   the session manager (`SessionDisposed`).
//! - **Consumers**: the manager's event pump, `SessionManager::events()` receivers,
//!   and the [`SubscriberSet`](crate::SubscriberSet).

mod bus;
mod event;
mod token;

pub use bus::Bus;
pub use event::{Event, EventKind};
pub use token::CorrelationToken;
