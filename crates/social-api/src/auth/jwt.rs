//! HMAC-signed identity tokens.
//!
//! Issues and validates compact JWTs signed with HS256 using the configured
//! secret. The authenticator holds no mutable state and is shared freely
//! across requests.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only HS256 is accepted; any other `alg` is malformed
//! - Checks run in a fixed order: signature, expiry, issuer, audience
//! - `exp` must be strictly in the future, no leeway

use crate::auth::claims::{ClaimSet, Claims};
use chrono::Utc;
use common::config::TokenConfig;
use common::jwt::check_token_shape;
use common::secret::ExposeSecret;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Why a token was not accepted (or could not be produced).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature does not match")]
    SignatureMismatch,

    #[error("token has expired")]
    Expired,

    #[error("token issuer does not match")]
    IssuerMismatch,

    #[error("token audience does not match")]
    AudienceMismatch,

    #[error("token is malformed")]
    Malformed,

    #[error("token could not be signed: {0}")]
    Encoding(String),
}

impl TokenError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::SignatureMismatch => "signature_mismatch",
            TokenError::Expired => "expired",
            TokenError::IssuerMismatch => "issuer_mismatch",
            TokenError::AudienceMismatch => "audience_mismatch",
            TokenError::Malformed => "malformed",
            TokenError::Encoding(_) => "encoding",
        }
    }
}

/// Signs and validates identity tokens.
pub struct TokenAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl TokenAuthenticator {
    /// Build an authenticator from configuration.
    ///
    /// Secret length is enforced when the configuration is loaded.
    pub fn new(config: &TokenConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();

        // Signature and algorithm only; the registered claims are checked by
        // hand below so failures surface in a fixed order.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: config.ttl,
        }
    }

    /// Default token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `claims`, filling unset issuer, audience and expiry from
    /// configuration. `iat` and `nbf` are always the current time.
    pub fn generate_token(&self, claims: ClaimSet) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);

        let claims = Claims {
            sub: claims.sub,
            iss: claims.iss.unwrap_or_else(|| self.issuer.clone()),
            aud: claims.aud.unwrap_or_else(|| self.audience.clone()),
            exp: claims.exp.unwrap_or_else(|| now.saturating_add(ttl)),
            iat: now,
            nbf: now,
            extra: claims.extra,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(target: "social.auth.jwt", error = %e, "Failed to sign token");
            TokenError::Encoding(e.to_string())
        })
    }

    /// Validate `token` and return its claims.
    ///
    /// # Errors
    ///
    /// - `Malformed` - oversized, not a compact JWT, wrong algorithm or
    ///   undecodable claims
    /// - `SignatureMismatch` - not signed with the configured secret
    /// - `Expired` - `exp` is not strictly in the future
    /// - `IssuerMismatch` / `AudienceMismatch` - claim differs from configuration
    #[instrument(skip_all)]
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        // Size and shape checks (includes the 8KB limit)
        let alg = check_token_shape(token).map_err(|e| {
            tracing::debug!(target: "social.auth.jwt", error = ?e, "Token failed shape check");
            TokenError::Malformed
        })?;

        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                let mapped = match e.kind() {
                    ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
                    _ => TokenError::Malformed,
                };
                tracing::debug!(
                    target: "social.auth.jwt",
                    alg = %alg,
                    error = %e,
                    "Token verification failed"
                );
                mapped
            })?;

        let claims = token_data.claims;

        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        if claims.iss != self.issuer {
            return Err(TokenError::IssuerMismatch);
        }

        if claims.aud != self.audience {
            return Err(TokenError::AudienceMismatch);
        }

        tracing::debug!(target: "social.auth.jwt", "Token validated successfully");
        Ok(claims)
    }
}
