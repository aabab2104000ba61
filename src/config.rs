//! # Runtime and connection configuration.
//!
//! - [`Config`]: settings of the manager itself (bus capacity, subscribe defaults).
//! - [`SessionConfig`]: connection properties handed to the [`SessionFactory`](crate::SessionFactory).
//!
//! ## Sentinel values
//! - `subscribe_timeout = 0s` → no timeout passed to the broker (broker default applies)
//! - `connect_retries = -1` / `reconnect_retries = -1` → retry forever (broker semantics)

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Configuration of the session manager runtime.
///
/// ## Field semantics
/// - `bus_capacity`: Lifecycle event bus ring buffer size (min 1; clamped by Bus)
/// - `subscribe_timeout`: Default broker-side subscribe timeout (`0s` = none)
/// - `request_confirmation`: Ask the broker to confirm (un)subscribe calls
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the lifecycle event bus.
    ///
    /// Slow `events()` receivers that lag behind more than `bus_capacity`
    /// events observe `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Default subscribe timeout, used when an observation does not set one.
    ///
    /// Passed through to the broker untouched; the manager never times out itself.
    pub subscribe_timeout: Duration,

    /// Whether (un)subscribe calls ask for a confirmation event.
    ///
    /// Without confirmation the broker never emits `SubscriptionOk`, so the
    /// manager treats the call as done once it returns.
    pub request_confirmation: bool,
}

impl Config {
    /// Returns the default subscribe timeout as an `Option`.
    #[inline]
    pub fn default_subscribe_timeout(&self) -> Option<Duration> {
        if self.subscribe_timeout == Duration::ZERO {
            None
        } else {
            Some(self.subscribe_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `subscribe_timeout = 0s` (broker default)
    /// - `request_confirmation = true`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            subscribe_timeout: Duration::ZERO,
            request_confirmation: true,
        }
    }
}

/// Connection properties of one broker session.
///
/// Deserializable so hosts can keep it next to their own settings; loading
/// it from disk is left to the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Broker URL, e.g. `ws://broker:8008`. Required.
    pub url: String,
    /// Message VPN name. Required.
    pub vpn_name: String,
    pub user_name: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Client name; empty lets the broker generate one.
    pub client_name: String,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Initial connect retries (`-1` = forever).
    pub connect_retries: i32,
    /// Reconnect retries after an established session drops (`-1` = forever).
    pub reconnect_retries: i32,
    /// Delay between reconnect attempts in milliseconds.
    pub reconnect_retry_wait_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            vpn_name: String::new(),
            user_name: String::new(),
            password: String::new(),
            client_name: String::new(),
            connect_timeout_ms: 10_000,
            connect_retries: 20,
            reconnect_retries: 20,
            reconnect_retry_wait_ms: 3_000,
        }
    }
}

impl SessionConfig {
    pub fn new(url: impl Into<String>, vpn_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            vpn_name: vpn_name.into(),
            ..Self::default()
        }
    }

    /// Checks that required fields are present.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.url.trim().is_empty() {
            return Err(SessionError::Configuration { field: "url" });
        }
        if self.vpn_name.trim().is_empty() {
            return Err(SessionError::Configuration { field: "vpnName" });
        }
        Ok(())
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[inline]
    pub fn reconnect_retry_wait(&self) -> Duration {
        Duration::from_millis(self.reconnect_retry_wait_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_subscribe_timeout_means_none() {
        let cfg = Config::default();
        assert_eq!(cfg.default_subscribe_timeout(), None);

        let cfg = Config {
            subscribe_timeout: Duration::from_secs(3),
            ..Config::default()
        };
        assert_eq!(cfg.default_subscribe_timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_bus_capacity_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn test_validate_reports_missing_field() {
        assert_eq!(
            SessionConfig::default().validate(),
            Err(SessionError::Configuration { field: "url" })
        );
        assert_eq!(
            SessionConfig::new("ws://localhost:8008", " ").validate(),
            Err(SessionError::Configuration { field: "vpnName" })
        );
        assert!(SessionConfig::new("ws://localhost:8008", "default").validate().is_ok());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let cfg: SessionConfig = serde_json::from_str(
            r#"{ "url": "ws://broker:8008", "vpnName": "prod", "reconnectRetries": -1 }"#,
        )
        .unwrap();
        assert_eq!(cfg.url, "ws://broker:8008");
        assert_eq!(cfg.vpn_name, "prod");
        assert_eq!(cfg.reconnect_retries, -1);
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(10));
        assert!(cfg.password.is_empty());
    }

    #[test]
    fn test_password_is_not_serialized() {
        let mut cfg = SessionConfig::new("ws://broker:8008", "prod");
        cfg.password = "secret".into();
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("secret"));
    }
}
