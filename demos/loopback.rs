//! # Example: loopback broker
//!
//! Runs the session manager against an in-memory broker that acknowledges
//! everything and echoes every sent message back to its own subscriptions.
//!
//! Demonstrates:
//! - adapting a broker through [`BrokerSession`] and a factory closure,
//! - named-segment observations sharing one broker subscription,
//! - guaranteed publishing with headers,
//! - lifecycle logging through `LogWriter` and `tracing-subscriber`.
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example loopback --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use topicvisor::{
    BrokerError, BrokerSession, CorrelationToken, Event, EventKind, EventSink, InboundMessage,
    LogWriter, ObserveOptions, OutboundMessage, PublishOptions, SessionConfig, SessionManager,
    Subscribe, TopicPattern,
};

/// Broker that answers every request itself.
struct Loopback {
    sink: EventSink,
    subscriptions: Mutex<Vec<TopicPattern>>,
}

impl Loopback {
    fn confirm(&self, pattern: &str, token: CorrelationToken) {
        self.sink.emit(
            Event::new(EventKind::SubscriptionOk)
                .with_token(token)
                .with_topic(pattern),
        );
    }
}

impl BrokerSession for Loopback {
    fn connect(&self) -> Result<(), BrokerError> {
        self.sink.emit(Event::new(EventKind::SessionUp));
        Ok(())
    }

    fn disconnect(&self) -> Result<(), BrokerError> {
        self.sink.emit(Event::new(EventKind::Disconnected));
        Ok(())
    }

    fn dispose(&self) {
        self.subscriptions.lock().clear();
    }

    fn subscribe(
        &self,
        pattern: &str,
        _request_confirmation: bool,
        token: CorrelationToken,
        _timeout: Option<Duration>,
    ) -> Result<(), BrokerError> {
        let parsed = TopicPattern::parse(pattern)
            .map_err(|e| BrokerError::Refused(e.as_message()))?;
        self.subscriptions.lock().push(parsed);
        self.confirm(pattern, token);
        Ok(())
    }

    fn unsubscribe(
        &self,
        pattern: &str,
        _request_confirmation: bool,
        token: CorrelationToken,
        _timeout: Option<Duration>,
    ) -> Result<(), BrokerError> {
        self.subscriptions.lock().retain(|p| p.as_str() != pattern);
        self.confirm(pattern, token);
        Ok(())
    }

    fn send(&self, message: OutboundMessage) -> Result<(), BrokerError> {
        if let Some(key) = message.correlation_key {
            self.sink
                .emit(Event::new(EventKind::Acknowledged).with_token(key));
        }
        let name = message.destination.name().to_string();
        if self.subscriptions.lock().iter().any(|p| p.matches(&name)) {
            self.sink.message(InboundMessage::from(message));
        }
        Ok(())
    }
}

fn loopback(_cfg: &SessionConfig, sink: EventSink) -> Result<Arc<dyn BrokerSession>, BrokerError> {
    Ok(Arc::new(Loopback {
        sink,
        subscriptions: Mutex::new(Vec::new()),
    }))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let manager = SessionManager::builder(loopback)
        .with_subscribers(subs)
        .with_session_config(SessionConfig::new("tcp://loopback:55555", "demo"))
        .build();

    manager.connect_with_defaults().await?;

    let mut by_room = manager.observe(
        "chat/:room/messages",
        ObserveOptions::default().on_subscribed(|| info!("room observer subscribed")),
    )?;
    let mut all = manager.observe("chat/*/messages", ObserveOptions::default())?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    for room in ["lobby", "ops"] {
        manager
            .publish(
                &format!("chat/{room}/messages"),
                Some(format!("hello {room}").into()),
                PublishOptions::new()
                    .guaranteed()
                    .header("sender", "demo")
                    .header("sequence", 1i64),
            )
            .await?;
    }

    for _ in 0..2 {
        if let Some(Ok(env)) = by_room.next().await {
            info!(
                room = env.param("room").unwrap_or("?"),
                headers = ?env.headers,
                "room message"
            );
        }
        if let Some(Ok(env)) = all.next().await {
            info!(topic = env.destination().name(), "firehose message");
        }
    }

    drop(by_room);
    drop(all);
    tokio::time::sleep(Duration::from_millis(50)).await;

    manager.disconnect().await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
