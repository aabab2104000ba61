#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use topicvisor::{
    BrokerError, BrokerSession, CorrelationToken, Destination, Event, EventKind, EventSink,
    InboundMessage, OutboundMessage, SessionConfig, SessionFactory, SessionManager,
    UserProperties,
};

/// What the scripted session does when `connect()` is called.
#[derive(Clone, Debug, Default)]
pub enum ConnectReply {
    #[default]
    Up,
    Fail(String),
    Silent,
}

/// What the scripted session does with a guaranteed message.
#[derive(Clone, Debug, Default)]
pub enum PublishReply {
    #[default]
    Ack,
    Reject(String),
    Silent,
}

#[derive(Clone, Debug)]
pub enum Call {
    Connect,
    Disconnect,
    Dispose,
    Subscribe {
        pattern: String,
        token: CorrelationToken,
        timeout: Option<Duration>,
    },
    Unsubscribe {
        pattern: String,
        token: CorrelationToken,
    },
    Send(OutboundMessage),
}

impl Call {
    pub fn is_subscription(&self) -> bool {
        matches!(self, Call::Subscribe { .. } | Call::Unsubscribe { .. })
    }
}

/// In-memory broker: records every call and answers according to its script.
pub struct MockBroker {
    pub connect_reply: Mutex<ConnectReply>,
    pub publish_reply: Mutex<PublishReply>,
    /// Answer (un)subscribe calls immediately.
    pub auto_ack: Mutex<bool>,
    /// Patterns refused with `SubscriptionError`.
    pub refused: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
    sinks: Mutex<Vec<EventSink>>,
}

impl MockBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connect_reply: Mutex::new(ConnectReply::Up),
            publish_reply: Mutex::new(PublishReply::Ack),
            auto_ack: Mutex::new(true),
            refused: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            sinks: Mutex::new(Vec::new()),
        })
    }

    pub fn manual_acks(self: &Arc<Self>) -> Arc<Self> {
        *self.auto_ack.lock() = false;
        Arc::clone(self)
    }

    pub fn refuse(&self, pattern: &str) {
        self.refused.lock().insert(pattern.to_string());
    }

    pub fn manager(self: &Arc<Self>) -> Arc<SessionManager> {
        SessionManager::builder(MockFactory(Arc::clone(self))).build()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn subscription_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(Call::is_subscription)
            .collect()
    }

    pub fn subscribes(&self) -> usize {
        self.count(|c| matches!(c, Call::Subscribe { .. }))
    }

    pub fn unsubscribes(&self) -> usize {
        self.count(|c| matches!(c, Call::Unsubscribe { .. }))
    }

    pub fn disposes(&self) -> usize {
        self.count(|c| matches!(c, Call::Dispose))
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| f(c)).count()
    }

    /// Sink handed to the `index`-th created session.
    pub fn sink(&self, index: usize) -> EventSink {
        self.sinks.lock()[index].clone()
    }

    pub fn sessions_created(&self) -> usize {
        self.sinks.lock().len()
    }

    /// Emits on the most recently created session.
    pub fn emit(&self, event: Event) -> bool {
        match self.sinks.lock().last() {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }

    pub fn deliver(&self, topic: &str, payload: &'static [u8]) -> bool {
        self.deliver_with(topic, payload, UserProperties::new())
    }

    pub fn deliver_with(&self, topic: &str, payload: &'static [u8], props: UserProperties) -> bool {
        let mut msg = InboundMessage::new(
            Destination::Topic(topic.to_string()),
            Some(Bytes::from_static(payload)),
        );
        msg.user_properties = props;
        match self.sinks.lock().last() {
            Some(sink) => sink.message(msg),
            None => false,
        }
    }

    /// Confirms the `index`-th subscription call.
    pub fn ack(&self, index: usize) {
        let call = self.subscription_calls()[index].clone();
        let (Call::Subscribe { token, pattern, .. } | Call::Unsubscribe { token, pattern }) = call
        else {
            unreachable!()
        };
        self.emit(
            Event::new(EventKind::SubscriptionOk)
                .with_token(token)
                .with_topic(pattern),
        );
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn answer_subscription(&self, sink: &EventSink, pattern: &str, token: CorrelationToken) {
        if !*self.auto_ack.lock() {
            return;
        }
        let ev = if self.refused.lock().contains(pattern) {
            Event::new(EventKind::SubscriptionError).with_reason("permission denied")
        } else {
            Event::new(EventKind::SubscriptionOk)
        };
        sink.emit(ev.with_token(token).with_topic(pattern));
    }
}

pub struct MockFactory(pub Arc<MockBroker>);

impl SessionFactory for MockFactory {
    fn create(
        &self,
        _config: &SessionConfig,
        sink: EventSink,
    ) -> Result<Arc<dyn BrokerSession>, BrokerError> {
        self.0.sinks.lock().push(sink.clone());
        Ok(Arc::new(MockSession {
            broker: Arc::clone(&self.0),
            sink,
        }))
    }
}

struct MockSession {
    broker: Arc<MockBroker>,
    sink: EventSink,
}

impl BrokerSession for MockSession {
    fn connect(&self) -> Result<(), BrokerError> {
        self.broker.record(Call::Connect);
        match self.broker.connect_reply.lock().clone() {
            ConnectReply::Up => {
                self.sink.emit(Event::new(EventKind::SessionUp));
            }
            ConnectReply::Fail(reason) => {
                self.sink
                    .emit(Event::new(EventKind::ConnectFailed).with_reason(reason));
            }
            ConnectReply::Silent => {}
        }
        Ok(())
    }

    fn disconnect(&self) -> Result<(), BrokerError> {
        self.broker.record(Call::Disconnect);
        self.sink.emit(Event::new(EventKind::Disconnected));
        Ok(())
    }

    fn dispose(&self) {
        self.broker.record(Call::Dispose);
    }

    fn subscribe(
        &self,
        pattern: &str,
        _request_confirmation: bool,
        token: CorrelationToken,
        timeout: Option<Duration>,
    ) -> Result<(), BrokerError> {
        self.broker.record(Call::Subscribe {
            pattern: pattern.to_string(),
            token,
            timeout,
        });
        self.broker.answer_subscription(&self.sink, pattern, token);
        Ok(())
    }

    fn unsubscribe(
        &self,
        pattern: &str,
        _request_confirmation: bool,
        token: CorrelationToken,
        _timeout: Option<Duration>,
    ) -> Result<(), BrokerError> {
        self.broker.record(Call::Unsubscribe {
            pattern: pattern.to_string(),
            token,
        });
        self.broker.answer_subscription(&self.sink, pattern, token);
        Ok(())
    }

    fn send(&self, message: OutboundMessage) -> Result<(), BrokerError> {
        let key = message.correlation_key;
        let guaranteed = message.delivery_mode.is_guaranteed();
        self.broker.record(Call::Send(message));

        let Some(key) = key.filter(|_| guaranteed) else {
            return Ok(());
        };
        match self.broker.publish_reply.lock().clone() {
            PublishReply::Ack => {
                self.sink
                    .emit(Event::new(EventKind::Acknowledged).with_token(key));
            }
            PublishReply::Reject(reason) => {
                self.sink.emit(
                    Event::new(EventKind::Rejected)
                        .with_token(key)
                        .with_reason(reason),
                );
            }
            PublishReply::Silent => {}
        }
        Ok(())
    }
}

pub fn session_config() -> SessionConfig {
    SessionConfig::new("tcp://broker.test:55555", "default")
}

/// Lets every spawned task run until idle (paused clock).
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}
