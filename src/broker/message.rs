//! Messages exchanged with the broker session.

use std::time::Duration;

use bytes::Bytes;

use crate::events::CorrelationToken;

use super::headers::UserProperties;

/// Where a message goes (or came from).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Topic, matched against subscription patterns.
    Topic(String),
    /// Durable queue.
    Queue(String),
}

impl Destination {
    /// Destination name without its kind.
    pub fn name(&self) -> &str {
        match self {
            Destination::Topic(name) | Destination::Queue(name) => name,
        }
    }

    pub fn is_queue(&self) -> bool {
        matches!(self, Destination::Queue(_))
    }
}

/// Delivery mode of an outbound message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Fire-and-forget.
    #[default]
    Direct,
    /// Guaranteed, spooled by the broker.
    Persistent,
    /// Guaranteed, not spooled to disk.
    NonPersistent,
}

impl DeliveryMode {
    /// True when completion is confirmed by an acknowledgement event.
    pub fn is_guaranteed(self) -> bool {
        !matches!(self, DeliveryMode::Direct)
    }
}

/// Message handed to [`BrokerSession::send`](super::BrokerSession::send).
#[derive(Clone, Debug)]
pub struct OutboundMessage {
    pub destination: Destination,
    pub payload: Option<Bytes>,
    pub delivery_mode: DeliveryMode,
    pub correlation_id: Option<String>,
    /// Token echoed back on `Acknowledged` / `Rejected`.
    pub correlation_key: Option<CorrelationToken>,
    pub priority: Option<u8>,
    pub time_to_live: Option<Duration>,
    pub dmq_eligible: bool,
    pub user_properties: UserProperties,
}

impl OutboundMessage {
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            payload: None,
            delivery_mode: DeliveryMode::Direct,
            correlation_id: None,
            correlation_key: None,
            priority: None,
            time_to_live: None,
            dmq_eligible: false,
            user_properties: UserProperties::new(),
        }
    }
}

/// Message received from the broker.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    pub destination: Destination,
    pub payload: Option<Bytes>,
    pub correlation_id: Option<String>,
    pub redelivered: bool,
    pub user_properties: UserProperties,
}

impl InboundMessage {
    pub fn new(destination: Destination, payload: Option<Bytes>) -> Self {
        Self {
            destination,
            payload,
            correlation_id: None,
            redelivered: false,
            user_properties: UserProperties::new(),
        }
    }
}

impl From<OutboundMessage> for InboundMessage {
    /// What a loopback broker would deliver for a sent message.
    fn from(msg: OutboundMessage) -> Self {
        Self {
            destination: msg.destination,
            payload: msg.payload,
            correlation_id: msg.correlation_id,
            redelivered: false,
            user_properties: msg.user_properties,
        }
    }
}
