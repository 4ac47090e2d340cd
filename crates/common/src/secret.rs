//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports [`secrecy`] types. `SecretString` implements `Debug` with
//! redaction, so any struct deriving `Debug` that holds one is safe to log
//! through `{:?}` or `tracing`. Values are zeroized on drop.
//!
//! Use `SecretString` for:
//! - the token signing secret (`AUTH_TOKEN_SECRET`)
//! - the basic-auth password (`AUTH_BASIC_PASS`)
//! - connection URLs that can embed credentials (`DATABASE_URL`, `REDIS_URL`)
//! - user passwords received in request bodies
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Login {
//!     email: String,
//!     password: SecretString,
//! }
//!
//! let login = Login {
//!     email: "ana@example.com".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{login:?}").contains("hunter2"));
//! assert_eq!(login.password.expose_secret(), "hunter2");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
