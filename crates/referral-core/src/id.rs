//! Validated user identifiers.
//!
//! A [`UserId`] is an opaque, externally supplied token. The only structure
//! the engine imposes is that it is non-empty, not purely whitespace, and free
//! of control characters.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Stable user identifier. Ordering is plain lexicographic string order, which
/// is the tie-break used by every ranking in the crate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validates and wraps an identifier.
    pub fn new(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CoreError::InvalidIdentifier {
                value: raw,
                reason: "identifier is empty".into(),
            });
        }
        if raw.chars().any(char::is_control) {
            return Err(CoreError::InvalidIdentifier {
                value: raw,
                reason: "identifier contains control characters".into(),
            });
        }
        Ok(UserId(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Lets maps keyed by `UserId` be queried with a plain `&str`.
impl Borrow<str> for UserId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserId::new(value)
    }
}

impl TryFrom<&str> for UserId {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        UserId::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_tokens() {
        let id = UserId::new("alice").unwrap();
        assert_eq!(id.as_str(), "alice");
        assert_eq!(format!("{}", id), "alice");
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert!(matches!(
            UserId::new(""),
            Err(CoreError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            UserId::new("   "),
            Err(CoreError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn rejects_control_characters() {
        let err = UserId::new("bob\n").unwrap_err();
        assert!(err.to_string().contains("control characters"));
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut ids = vec![
            UserId::new("carol").unwrap(),
            UserId::new("alice").unwrap(),
            UserId::new("bob").unwrap(),
        ];
        ids.sort();
        let names: Vec<&str> = ids.iter().map(UserId::as_str).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn serde_roundtrip_validates() {
        let id = UserId::new("dave").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"dave\"");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let bad: Result<UserId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }
}
