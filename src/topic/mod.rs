//! Topic patterns and subscription bookkeeping.
//!
//! - `pattern`: [`TopicPattern`] parsing, normalization, matching, captures;
//! - `counter`: [`SubscriptionCounter`] reference counts per normalized pattern.

mod counter;
mod pattern;

pub use counter::SubscriptionCounter;
pub use pattern::{Params, TopicPattern, matches};
