//! # topicvisor
//!
//! **Topicvisor** keeps a single broker session and multiplexes any number of
//! topic observations over it.
//!
//! It reference-counts broker subscriptions per normalized pattern, serializes
//! every subscribe/unsubscribe call, correlates asynchronous broker answers
//! with the requests that caused them, and routes inbound messages to every
//! matching observer with named-segment captures and decoded headers.
//!
//! The broker itself is an external collaborator reached through the
//! [`BrokerSession`] and [`SessionFactory`] traits.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   observe("chat/:room")   observe("chat/*")   publish("chat/lobby", ..)
//!            │                     │                     │
//!            ▼                     ▼                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SessionManager                                                   │
//! │  - SubscriptionCounter (refcount per normalized pattern)          │
//! │  - SerialLane (one subscribe/unsubscribe in flight)               │
//! │  - Correlator (waiters keyed by correlation token)                │
//! │  - Router (pattern → observation streams)                         │
//! │  - connection_state (watch<bool>), Bus (lifecycle events)         │
//! └──────┬───────────────────────────────────────────────▲────────────┘
//!        │ connect / subscribe / unsubscribe / send      │ EventSink
//!        ▼                                               │
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  BrokerSession (vendor session, created by a SessionFactory)      │
//! └───────────────────────────────────────────────────────────────────┘
//!
//! EventSink ──► event pump ──┬─► Message    → Router → Observation streams
//!                            ├─► any        → Correlator.dispatch
//!                            ├─► lifecycle  → Bus → events() / SubscriberSet
//!                            └─► terminal   → dispose
//! ```
//!
//! ### Observation lifecycle
//! ```text
//! observe(p) ─► wait for session ─► count(p)++ ─► 1? lane: subscribe ─► SubscriptionOk
//!                                                      │                 └► SubscriptionError → Err, end
//! drop(Observation) ─► count(p)-- ─► 0? lane: unsubscribe
//! session disposed ─► every Observation ends (no error)
//! ```
//!
//! ## Features
//! | Area               | Description                                                   | Key types / traits                          |
//! |--------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Sessions**       | Connect, disconnect, connection state, lifecycle phase.       | [`SessionManager`], [`Phase`]               |
//! | **Observations**   | Reference-counted topic subscriptions as streams.             | [`Observation`], [`MessageEnvelope`]        |
//! | **Publishing**     | Direct and guaranteed sends to topics and queues.             | [`PublishOptions`], [`DeliveryMode`]        |
//! | **Topics**         | Pattern parsing, wildcard matching, named captures.           | [`TopicPattern`], [`matches`]               |
//! | **Broker surface** | Traits the vendor session is adapted to.                      | [`BrokerSession`], [`SessionFactory`]       |
//! | **Subscriber API** | Hook into lifecycle events (logging, metrics, alerting).      | [`Subscribe`]                               |
//! | **Errors**         | Typed errors for callers and broker adapters.                 | [`SessionError`], [`BrokerError`]           |
//! | **Configuration**  | Runtime settings and connection properties.                   | [`Config`], [`SessionConfig`]               |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a subscriber rendering lifecycle events through `tracing`.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use topicvisor::{
//!     BrokerError, BrokerSession, EventSink, ObserveOptions, PublishOptions, SessionConfig,
//!     SessionManager,
//! };
//!
//! fn vendor_session(
//!     _cfg: &SessionConfig,
//!     _sink: EventSink,
//! ) -> Result<Arc<dyn BrokerSession>, BrokerError> {
//!     // adapt the vendor client here
//!     Err(BrokerError::Creation("no broker in this example".into()))
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = SessionManager::builder(vendor_session).build();
//!     manager
//!         .connect(SessionConfig::new("tcp://localhost:55555", "default"))
//!         .await?;
//!
//!     let mut rooms = manager.observe("chat/:room/messages", ObserveOptions::default())?;
//!     manager
//!         .publish("chat/lobby/messages", Some("hi".into()), PublishOptions::new())
//!         .await?;
//!
//!     if let Some(Ok(envelope)) = rooms.next().await {
//!         println!("room={:?}", envelope.param("room"));
//!     }
//!
//!     manager.disconnect().await?;
//!     Ok(())
//! }
//! ```
mod broker;
mod config;
mod error;
mod events;
mod session;
mod subscribers;
mod topic;

// ---- Public re-exports ----

pub use broker::{
    BrokerSession, DeliveryMode, Destination, EventSink, Field, FieldType, FieldValue,
    HeaderValue, Headers, InboundMessage, OutboundMessage, SessionFactory, UserProperties,
    decode_headers, encode_headers,
};
pub use config::{Config, SessionConfig};
pub use error::{BrokerError, SessionError};
pub use events::{Bus, CorrelationToken, Event, EventKind};
pub use session::{
    Correlator, Expect, MessageEnvelope, Observation, ObserveOptions, PendingEvent, Phase,
    PublishOptions, SerialLane, SessionManager, SessionManagerBuilder, Settlement,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use topic::{Params, SubscriptionCounter, TopicPattern, matches};

// Optional: expose a tracing-backed lifecycle logger.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
