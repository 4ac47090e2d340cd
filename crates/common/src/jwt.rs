//! JWT utilities shared across Social API crates.
//!
//! This module provides the structural checks that run before any
//! cryptographic work is done on a bearer token:
//! - Size limits for DoS prevention
//! - Compact-serialization shape checks (three base64url segments)
//! - Header decoding for algorithm inspection
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Shape checks never verify signatures; callers MUST still verify
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{check_token_shape, MAX_JWT_SIZE_BYTES};
//!
//! check_token_shape(token)?;
//! let data = jsonwebtoken::decode::<Claims>(token, &key, &validation)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any parsing or HMAC
/// computation.
///
/// - Typical identity tokens are 200-400 bytes
/// - Checked BEFORE base64 decode and signature verification
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Minimum HMAC secret length in bytes.
///
/// HS256 keys shorter than the hash output (32 bytes) weaken the MAC.
pub const MIN_HMAC_SECRET_BYTES: usize = 32;

// =============================================================================
// Error Types
// =============================================================================

/// Structural problems with a compact JWT.
///
/// Error messages are intentionally generic. Detailed information is logged
/// at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtShapeError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token is not `header.payload.signature` with a decodable header.
    #[error("The access token is invalid or expired")]
    MalformedToken,
}

// =============================================================================
// Functions
// =============================================================================

/// Check that `token` looks like a compact JWT without verifying it.
///
/// Returns the `alg` value from the header so callers can log it.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - Wrong segment count, empty segments, bad base64 or a
///   header that is not a JSON object with a string `alg`
pub fn check_token_shape(token: &str) -> Result<String, JwtShapeError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtShapeError::TokenTooLarge);
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtShapeError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtShapeError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtShapeError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtShapeError::MalformedToken
    })?;

    header
        .get("alg")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtShapeError::MalformedToken)
}
