//! Identifiers for the two sides of the bridge.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder used when the originating client of a notification could not
/// be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Opaque client session id assigned by the client transport at handshake.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The sentinel id for an unidentified client.
    pub fn unknown() -> Self {
        Self(UNKNOWN_CLIENT.to_owned())
    }

    /// Build an id from an optional transport-provided value.  Missing or
    /// blank values collapse to [`ClientId::unknown`].
    pub fn from_origin(origin: Option<&str>) -> Self {
        match origin.map(str::trim) {
            Some(id) if !id.is_empty() => Self::new(id),
            _ => Self::unknown(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_CLIENT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Numeric id of a human operator on the bot channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(pub i64);

impl OperatorId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OperatorId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_origin_is_unknown() {
        assert!(ClientId::from_origin(None).is_unknown());
        assert!(ClientId::from_origin(Some("")).is_unknown());
        assert!(ClientId::from_origin(Some("   ")).is_unknown());
        assert!(!ClientId::from_origin(Some("abc")).is_unknown());
    }

    #[test]
    fn literal_unknown_string_is_the_sentinel() {
        assert!(ClientId::new("unknown").is_unknown());
        assert_eq!(ClientId::unknown().as_str(), UNKNOWN_CLIENT);
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&ClientId::new("c-1")).unwrap();
        assert_eq!(json, "\"c-1\"");
        let op: OperatorId = serde_json::from_str("42").unwrap();
        assert_eq!(op, OperatorId(42));
        assert_eq!(op.to_string(), "42");
    }
}
