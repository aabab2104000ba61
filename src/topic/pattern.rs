//! # Topic patterns and matching.
//!
//! A pattern is split on `/` into segments:
//!
//! | segment  | matches                                   | captured |
//! |----------|-------------------------------------------|----------|
//! | `lit`    | exactly `lit` (case-sensitive)            | no       |
//! | `*`      | exactly one segment                       | no       |
//! | `:name`  | exactly one segment                       | `name`   |
//! | `>`      | one or more trailing segments (last only) | no       |
//!
//! Without `>`, destination and pattern must have the same number of segments.
//!
//! The **normalized** form rewrites named segments to `*`; it is what the
//! broker sees and what identifies a subscription.
//!
//! ## Example
//! ```rust
//! use topicvisor::TopicPattern;
//!
//! let p = TopicPattern::parse("chat/:room/messages").unwrap();
//! assert_eq!(p.normalized(), "chat/*/messages");
//! assert!(p.matches("chat/lobby/messages"));
//!
//! let params = p.captures("chat/lobby/messages").unwrap();
//! assert_eq!(params["room"], "lobby");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::error::SessionError;

pub(crate) const SEPARATOR: char = '/';
const SINGLE: &str = "*";
const MULTI: &str = ">";
const NAMED_PREFIX: char = ':';

/// Named-segment captures: parameter name → matched value.
pub type Params = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Segment {
    Literal(String),
    Single,
    Named(String),
    Multi,
}

impl Segment {
    fn parse(raw: &str, is_last: bool, pattern: &str) -> Result<Self, SessionError> {
        match raw {
            "" => Err(invalid(pattern, "empty segment")),
            SINGLE => Ok(Segment::Single),
            MULTI if is_last => Ok(Segment::Multi),
            MULTI => Err(invalid(pattern, "'>' must be the last segment")),
            s if s.len() > 1 && s.starts_with(NAMED_PREFIX) => {
                Ok(Segment::Named(s[1..].to_string()))
            }
            s => Ok(Segment::Literal(s.to_string())),
        }
    }

    fn wire(&self) -> &str {
        match self {
            Segment::Literal(s) => s,
            Segment::Single | Segment::Named(_) => SINGLE,
            Segment::Multi => MULTI,
        }
    }
}

fn invalid(pattern: &str, reason: &'static str) -> SessionError {
    SessionError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    }
}

/// Parsed subscription pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TopicPattern {
    raw: String,
    normalized: String,
    segments: Vec<Segment>,
}

impl TopicPattern {
    /// Parses a pattern.
    ///
    /// Fails on an empty pattern, an empty segment, or a `>` that is not last.
    pub fn parse(pattern: &str) -> Result<Self, SessionError> {
        if pattern.is_empty() {
            return Err(invalid(pattern, "empty pattern"));
        }

        let raw: Vec<&str> = pattern.split(SEPARATOR).collect();
        let last = raw.len() - 1;
        let segments = raw
            .iter()
            .enumerate()
            .map(|(i, s)| Segment::parse(s, i == last, pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let normalized = segments
            .iter()
            .map(Segment::wire)
            .collect::<Vec<_>>()
            .join("/");

        Ok(Self {
            raw: pattern.to_string(),
            normalized,
            segments,
        })
    }

    /// Pattern as written by the caller.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Broker wire form (named segments rewritten to `*`).
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// True when the pattern has at least one named segment.
    pub fn has_params(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Named(_)))
    }

    /// Tests a concrete destination against this pattern.
    pub fn matches(&self, destination: &str) -> bool {
        self.walk(destination, |_, _| {})
    }

    /// Returns named-segment captures, or `None` when the destination does not match.
    pub fn captures(&self, destination: &str) -> Option<Params> {
        let mut params = Params::new();
        self.walk(destination, |name, value| {
            params.insert(name.to_string(), value.to_string());
        })
        .then_some(params)
    }

    fn walk<'a>(&'a self, destination: &'a str, mut bind: impl FnMut(&'a str, &'a str)) -> bool {
        let mut parts = destination.split(SEPARATOR);
        for segment in &self.segments {
            match segment {
                Segment::Multi => return parts.next().is_some(),
                Segment::Single => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
                Segment::Named(name) => match parts.next() {
                    Some(value) => bind(name.as_str(), value),
                    None => return false,
                },
                Segment::Literal(lit) => match parts.next() {
                    Some(part) if part == lit.as_str() => {}
                    _ => return false,
                },
            }
        }
        parts.next().is_none()
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Tests a concrete destination against a pattern string.
///
/// An unparsable pattern matches nothing.
pub fn matches(destination: &str, pattern: &str) -> bool {
    TopicPattern::parse(pattern)
        .map(|p| p.matches(destination))
        .unwrap_or(false)
}
