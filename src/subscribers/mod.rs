//! # Lifecycle event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used by [`SessionManager`](crate::SessionManager) to hand lifecycle
//! events to host code (logging, metrics, alerting) without blocking the
//! event pump.
//!
//! ## Architecture
//! ```text
//! event pump ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit(&Event)
//!                                                          │
//!                                                ┌─────────┼──────────┐
//!                                                ▼         ▼          ▼
//!                                            LogWriter  Metrics    Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use topicvisor::{Subscribe, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct Alerts;
//!
//! #[async_trait]
//! impl Subscribe for Alerts {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::DownPermanent {
//!             // page someone
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
