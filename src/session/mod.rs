//! Session management: lifecycle, serialized subscriptions, correlation and routing.
//!
//! - `manager`: [`SessionManager`], connect/disconnect, event pump, disposal;
//! - `attach`: the per-observation subscribe/unsubscribe flow;
//! - `publish`: [`PublishOptions`], direct and guaranteed sends;
//! - `lane`: [`SerialLane`], one broker subscription call at a time;
//! - `correlator`: [`Correlator`], waiters settled by broker events;
//! - `router`: inbound message fan-out to observations.

mod attach;
mod builder;
mod correlator;
mod lane;
mod live;
mod manager;
mod observation;
mod publish;
mod router;

pub use builder::SessionManagerBuilder;
pub use correlator::{Correlator, Expect, PendingEvent, Settlement};
pub use lane::SerialLane;
pub use manager::{Phase, SessionManager};
pub use observation::{Observation, ObserveOptions};
pub use publish::PublishOptions;
pub use router::MessageEnvelope;
