use std::fmt;

use uuid::Uuid;

/// Opaque value linking a broker request to its asynchronous confirmation.
///
/// Backed by a random UUID (v4); a fresh token is generated per subscribe,
/// unsubscribe and guaranteed publish and is never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationToken(Uuid);

impl CorrelationToken {
    /// Generates a new random token.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for CorrelationToken {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
