//! Common data types for Social API components.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a user (database `BIGSERIAL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Unique identifier for a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&UserId(42)).unwrap();
        assert_eq!(json, "42");

        let id: UserId = serde_json::from_str("7").unwrap();
        assert_eq!(id, UserId(7));
    }

    #[test]
    fn test_user_id_from_str() {
        assert_eq!("123".parse::<UserId>().unwrap(), UserId(123));
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(UserId(9).to_string(), "9");
        assert_eq!(PostId(10).to_string(), "10");
    }
}
