//! Token claims.
//!
//! [`Claims`] is what a validated token asserts; [`ClaimSet`] is what a
//! caller asks to be signed, with unset fields filled from configuration at
//! generation time. The `sub` field is redacted in Debug output.

use common::types::UserId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Claims carried by a signed identity token.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the identity id.
    pub sub: UserId,

    /// Issuer.
    pub iss: String,

    /// Audience.
    pub aud: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Not-before timestamp (Unix epoch seconds).
    pub nbf: i64,

    /// Caller-supplied fields, serialized alongside the registered claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Custom Debug implementation that redacts the `sub` field.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Claims requested from `generate_token`.
///
/// `None` fields take the configured issuer, audience and lifetime.
#[derive(Debug, Clone)]
pub struct ClaimSet {
    pub sub: UserId,
    pub iss: Option<String>,
    pub aud: Option<String>,
    pub exp: Option<i64>,
    pub extra: Map<String, Value>,
}

impl ClaimSet {
    pub fn for_subject(sub: UserId) -> Self {
        Self {
            sub,
            iss: None,
            aud: None,
            exp: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn issuer(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    #[must_use]
    pub fn audience(mut self, aud: impl Into<String>) -> Self {
        self.aud = Some(aud.into());
        self
    }

    /// Absolute expiry in Unix epoch seconds.
    #[must_use]
    pub fn expires_at(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Add a caller-defined claim. Registered claim names are ignored.
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if !is_registered_claim(&name) {
            self.extra.insert(name, value.into());
        }
        self
    }
}

fn is_registered_claim(name: &str) -> bool {
    matches!(name, "sub" | "iss" | "aud" | "exp" | "iat" | "nbf")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample_claims() -> Claims {
        let mut extra = Map::new();
        extra.insert("scope".to_string(), Value::from("posts"));
        Claims {
            sub: UserId(4242),
            iss: "social-api".to_string(),
            aud: "social-api".to_string(),
            exp: 1_900_000_000,
            iat: 1_800_000_000,
            nbf: 1_800_000_000,
            extra,
        }
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let debug_str = format!("{:?}", sample_claims());

        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("4242"));
        assert!(debug_str.contains("social-api"));
    }

    #[test]
    fn test_extra_claims_flatten() {
        let json = serde_json::to_value(sample_claims()).unwrap();

        assert_eq!(json["sub"], 4242);
        assert_eq!(json["scope"], "posts");
        assert!(json.get("extra").is_none());

        let decoded: Claims = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, sample_claims());
    }

    #[test]
    fn test_claim_set_builder() {
        let set = ClaimSet::for_subject(UserId(1))
            .issuer("other")
            .audience("mobile")
            .expires_at(123)
            .with_claim("device", "ios");

        assert_eq!(set.sub, UserId(1));
        assert_eq!(set.iss.as_deref(), Some("other"));
        assert_eq!(set.aud.as_deref(), Some("mobile"));
        assert_eq!(set.exp, Some(123));
        assert_eq!(set.extra.get("device"), Some(&Value::from("ios")));
    }

    #[test]
    fn test_with_claim_ignores_registered_names() {
        let set = ClaimSet::for_subject(UserId(1)).with_claim("exp", 0);
        assert!(set.extra.is_empty());
        assert_eq!(set.exp, None);
    }
}
