//! # Publishing to topics and queues.
//!
//! - Direct mode: done once the broker `send` returns.
//! - Guaranteed mode: a correlation key is attached (generated unless given),
//!   an `Acknowledged` / `Rejected` waiter is registered before sending, and the
//!   publish settles with the broker's answer.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::broker::{DeliveryMode, Destination, HeaderValue, OutboundMessage, encode_headers};
use crate::error::SessionError;
use crate::events::{CorrelationToken, EventKind};

use super::correlator::{Expect, Settlement};
use super::manager::SessionManager;

type Intercept = Box<dyn FnOnce(&mut OutboundMessage) + Send>;

/// Options of [`SessionManager::publish`] and [`SessionManager::enqueue`].
#[derive(Default)]
pub struct PublishOptions {
    pub delivery_mode: DeliveryMode,
    pub correlation_id: Option<String>,
    /// Key matched against `Acknowledged` / `Rejected`; generated for guaranteed sends when unset.
    pub correlation_key: Option<CorrelationToken>,
    pub priority: Option<u8>,
    pub time_to_live: Option<Duration>,
    pub dmq_eligible: bool,
    /// User headers; `None` values are left out of the message.
    pub headers: BTreeMap<String, Option<HeaderValue>>,
    /// Last look at the outbound message before it is sent.
    pub intercept: Option<Intercept>,
}

impl PublishOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.delivery_mode = mode;
        self
    }

    /// Shorthand for [`DeliveryMode::Persistent`].
    pub fn guaranteed(self) -> Self {
        self.delivery_mode(DeliveryMode::Persistent)
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn correlation_key(mut self, key: CorrelationToken) -> Self {
        self.correlation_key = Some(key);
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    pub fn dmq_eligible(mut self, eligible: bool) -> Self {
        self.dmq_eligible = eligible;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name.into(), Some(value.into()));
        self
    }

    pub fn headers<I, K>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<HeaderValue>)>,
        K: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    pub fn intercept(mut self, f: impl FnOnce(&mut OutboundMessage) + Send + 'static) -> Self {
        self.intercept = Some(Box::new(f));
        self
    }

    fn into_message(self, destination: Destination, payload: Option<Bytes>) -> OutboundMessage {
        let mut msg = OutboundMessage::new(destination);
        msg.payload = payload;
        msg.delivery_mode = self.delivery_mode;
        msg.correlation_id = self.correlation_id;
        msg.correlation_key = self.correlation_key;
        msg.priority = self.priority;
        msg.time_to_live = self.time_to_live;
        msg.dmq_eligible = self.dmq_eligible;
        msg.user_properties = encode_headers(self.headers);

        if let Some(intercept) = self.intercept {
            intercept(&mut msg);
        }
        if msg.delivery_mode.is_guaranteed() && msg.correlation_key.is_none() {
            msg.correlation_key = Some(CorrelationToken::new());
        }
        msg
    }
}

impl fmt::Debug for PublishOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishOptions")
            .field("delivery_mode", &self.delivery_mode)
            .field("correlation_id", &self.correlation_id)
            .field("correlation_key", &self.correlation_key)
            .field("priority", &self.priority)
            .field("time_to_live", &self.time_to_live)
            .field("dmq_eligible", &self.dmq_eligible)
            .field("headers", &self.headers)
            .field("intercept", &self.intercept.is_some())
            .finish()
    }
}

impl SessionManager {
    /// Publishes to a topic.
    pub async fn publish(
        &self,
        topic: &str,
        payload: Option<Bytes>,
        opts: PublishOptions,
    ) -> Result<(), SessionError> {
        self.send_to(Destination::Topic(topic.to_string()), payload, opts)
            .await
    }

    /// Publishes to a queue.
    pub async fn enqueue(
        &self,
        queue: &str,
        payload: Option<Bytes>,
        opts: PublishOptions,
    ) -> Result<(), SessionError> {
        self.send_to(Destination::Queue(queue.to_string()), payload, opts)
            .await
    }

    async fn send_to(
        &self,
        destination: Destination,
        payload: Option<Bytes>,
        opts: PublishOptions,
    ) -> Result<(), SessionError> {
        let live = self.current().ok_or(SessionError::NotConnected)?;
        let msg = opts.into_message(destination, payload);
        let name = msg.destination.name().to_string();

        let key = msg
            .correlation_key
            .filter(|_| msg.delivery_mode.is_guaranteed());
        let Some(key) = key else {
            return live
                .broker
                .send(msg)
                .map_err(|e| SessionError::broker("send", e));
        };

        let ack = live.correlator.expect(
            EventKind::Acknowledged,
            Expect::token(key).reject_on(EventKind::Rejected),
        )?;
        live.broker
            .send(msg)
            .map_err(|e| SessionError::broker("send", e))?;
        debug!(session = live.id, destination = %name, %key, "awaiting acknowledgement");

        match ack.await? {
            Settlement::Resolved(_) => Ok(()),
            Settlement::Rejected(ev) => Err(SessionError::PublishRejected {
                destination: name,
                reason: ev.reason_or_unknown(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{Field, FieldType};

    #[test]
    fn test_guaranteed_message_gets_generated_key() {
        let msg = PublishOptions::new()
            .guaranteed()
            .into_message(Destination::Queue("q".into()), None);
        assert!(msg.correlation_key.is_some());

        let direct = PublishOptions::new().into_message(Destination::Topic("t".into()), None);
        assert!(direct.correlation_key.is_none());
    }

    #[test]
    fn test_caller_key_is_kept() {
        let key = CorrelationToken::new();
        let msg = PublishOptions::new()
            .guaranteed()
            .correlation_key(key)
            .into_message(Destination::Topic("t".into()), None);
        assert_eq!(msg.correlation_key, Some(key));
    }

    #[test]
    fn test_headers_encoded_and_none_dropped() {
        let msg = PublishOptions::new()
            .header("s", "text")
            .header("n", 5i64)
            .headers([("gone", None), ("typed", Some(Field::uint16(9).into()))])
            .into_message(Destination::Topic("t".into()), None);

        let props = &msg.user_properties;
        assert_eq!(props.len(), 3);
        assert_eq!(props["s"].field_type(), FieldType::String);
        assert_eq!(props["n"].field_type(), FieldType::Int64);
        assert_eq!(props["typed"].field_type(), FieldType::Uint16);
        assert!(!props.contains_key("gone"));
    }

    #[test]
    fn test_intercept_sees_final_message() {
        let msg = PublishOptions::new()
            .priority(3)
            .intercept(|m| {
                assert_eq!(m.priority, Some(3));
                m.dmq_eligible = true;
            })
            .into_message(Destination::Topic("t".into()), Some(Bytes::from_static(b"x")));
        assert!(msg.dmq_eligible);
    }
}
