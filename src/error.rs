//! Error types used by the session manager and broker collaborators.
//!
//! This module defines two error enums:
//!
//! - [`SessionError`] — errors surfaced to callers of the manager.
//! - [`BrokerError`] — errors returned synchronously by a broker session call.
//!
//! Both provide `as_label` for logs/metrics. [`SessionError::is_termination`]
//! separates "the whole session died" from failures of a single operation.

use thiserror::Error;

/// # Errors surfaced by the session manager.
///
/// Errors local to one operation (one subscribe attempt, one publish) are
/// delivered to that operation's caller only. Whole-session death is reported
/// as [`SessionError::SessionTerminated`], which observation streams turn into
/// plain completion.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `connect` was called without a required configuration value.
    #[error("missing required configuration: {field}")]
    Configuration {
        /// Name of the missing field.
        field: &'static str,
    },

    /// No established session.
    #[error("not connected")]
    NotConnected,

    /// The broker refused the initial connection.
    #[error("connect failed: {reason}")]
    ConnectFailed {
        /// Broker diagnostic.
        reason: String,
    },

    /// The broker declined a subscribe or unsubscribe.
    #[error("subscription to '{topic}' rejected: {reason}")]
    SubscriptionRejected {
        /// Broker-side pattern.
        topic: String,
        /// Broker diagnostic.
        reason: String,
    },

    /// The broker rejected a guaranteed-delivery message.
    #[error("publish to '{destination}' rejected: {reason}")]
    PublishRejected {
        /// Destination name.
        destination: String,
        /// Broker diagnostic.
        reason: String,
    },

    /// The session was disposed before the operation settled.
    #[error("session terminated")]
    SessionTerminated,

    /// The topic pattern could not be parsed.
    #[error("invalid topic pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern as given.
        pattern: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A broker call failed synchronously.
    #[error("broker {op} failed: {reason}")]
    Broker {
        /// Broker operation (`connect`, `subscribe`, `send`, ...).
        op: &'static str,
        /// Broker diagnostic.
        reason: String,
    },
}

impl SessionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use topicvisor::SessionError;
    ///
    /// assert_eq!(SessionError::NotConnected.as_label(), "session_not_connected");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionError::Configuration { .. } => "session_configuration",
            SessionError::NotConnected => "session_not_connected",
            SessionError::ConnectFailed { .. } => "session_connect_failed",
            SessionError::SubscriptionRejected { .. } => "subscription_rejected",
            SessionError::PublishRejected { .. } => "publish_rejected",
            SessionError::SessionTerminated => "session_terminated",
            SessionError::InvalidPattern { .. } => "invalid_pattern",
            SessionError::Broker { .. } => "broker_call_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SessionError::Configuration { field } => format!("missing: {field}"),
            SessionError::NotConnected => "no established session".to_string(),
            SessionError::ConnectFailed { reason } => format!("connect: {reason}"),
            SessionError::SubscriptionRejected { topic, reason } => {
                format!("topic={topic} reason={reason}")
            }
            SessionError::PublishRejected {
                destination,
                reason,
            } => format!("destination={destination} reason={reason}"),
            SessionError::SessionTerminated => "session disposed".to_string(),
            SessionError::InvalidPattern { pattern, reason } => {
                format!("pattern={pattern} reason={reason}")
            }
            SessionError::Broker { op, reason } => format!("{op}: {reason}"),
        }
    }

    /// True when the error only says the session is gone.
    ///
    /// # Example
    /// ```
    /// use topicvisor::SessionError;
    ///
    /// assert!(SessionError::SessionTerminated.is_termination());
    /// assert!(!SessionError::NotConnected.is_termination());
    /// ```
    pub fn is_termination(&self) -> bool {
        matches!(self, SessionError::SessionTerminated)
    }

    pub(crate) fn broker(op: &'static str, err: BrokerError) -> Self {
        SessionError::Broker {
            op,
            reason: err.to_string(),
        }
    }
}

/// # Errors returned by broker session calls.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The session is not in a state that accepts the call.
    #[error("invalid session state: {0}")]
    InvalidState(String),

    /// The call itself was refused.
    #[error("operation refused: {0}")]
    Refused(String),

    /// The session could not be created.
    #[error("session creation failed: {0}")]
    Creation(String),
}

impl BrokerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::InvalidState(_) => "broker_invalid_state",
            BrokerError::Refused(_) => "broker_refused",
            BrokerError::Creation(_) => "broker_creation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_error_wraps_into_session_error() {
        let err = SessionError::broker("subscribe", BrokerError::Refused("quota".into()));
        assert_eq!(err.as_label(), "broker_call_failed");
        assert_eq!(err.to_string(), "broker subscribe failed: operation refused: quota");
    }

    #[test]
    fn test_subscription_rejected_message() {
        let err = SessionError::SubscriptionRejected {
            topic: "a/*".into(),
            reason: "denied".into(),
        };
        assert_eq!(err.as_message(), "topic=a/* reason=denied");
        assert!(!err.is_termination());
    }
}
