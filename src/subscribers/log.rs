//! # LogWriter: lifecycle events as `tracing` records.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  topicvisor: session up
//! WARN  topicvisor: reconnecting
//! INFO  topicvisor: subscription ok topic="orders/*"
//! WARN  topicvisor: rejected reason="spool over quota"
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that renders every lifecycle event through `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let topic = e.topic.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::SessionUp => info!(seq = e.seq, "session up"),
            EventKind::Reconnected => info!(seq = e.seq, "reconnected"),
            EventKind::Reconnecting => warn!(seq = e.seq, "reconnecting"),
            EventKind::Disconnected => info!(seq = e.seq, "disconnected"),
            EventKind::DownPermanent => warn!(seq = e.seq, reason, "session down"),
            EventKind::ConnectFailed => warn!(seq = e.seq, reason, "connect failed"),
            EventKind::SessionDisposed => debug!(seq = e.seq, reason, "session disposed"),
            EventKind::SubscriptionOk => info!(seq = e.seq, topic, "subscription ok"),
            EventKind::SubscriptionError => {
                warn!(seq = e.seq, topic, reason, "subscription error")
            }
            EventKind::Acknowledged => debug!(seq = e.seq, "acknowledged"),
            EventKind::Rejected => warn!(seq = e.seq, reason, "rejected"),
            EventKind::Message => debug!(seq = e.seq, topic, "message"),
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => warn!(
                seq = e.seq,
                subscriber = e.subscriber.unwrap_or("unknown"),
                reason,
                "{}",
                e.kind.as_label()
            ),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
