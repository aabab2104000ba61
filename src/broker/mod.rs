//! Broker collaborator surface: session traits, messages and headers.
//!
//! - `session`: [`BrokerSession`], [`SessionFactory`], [`EventSink`];
//! - `message`: [`OutboundMessage`], [`InboundMessage`], [`Destination`], [`DeliveryMode`];
//! - `headers`: typed user properties and their caller-facing form.

mod headers;
mod message;
mod session;

pub use headers::{
    Field, FieldType, FieldValue, HeaderValue, Headers, UserProperties, decode_headers,
    encode_headers,
};
pub use message::{DeliveryMode, Destination, InboundMessage, OutboundMessage};
pub use session::{BrokerSession, EventSink, SessionFactory};
