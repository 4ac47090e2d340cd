//! Authorization engine: ownership first, then role precedence.
//!
//! A request on a resource is allowed when the caller owns it. Otherwise the
//! required role is resolved from the [`RoleDirectory`] (fresh on every call)
//! and the caller is allowed iff their role level is at least the required
//! level. Owners never trigger a directory lookup.

use crate::deadline::Deadline;
use crate::errors::ApiError;
use crate::models::{Role, User};
use crate::observability::metrics;
use crate::repositories::StoreError;
use common::types::UserId;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Authorization could not reach a decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// The required role is not defined. A configuration defect, not a denial.
    #[error("required role '{0}' is not defined")]
    Lookup(String),

    /// The role directory failed or the deadline expired.
    #[error("role directory unavailable: {0}")]
    Directory(String),
}

/// Read-only role lookup by name.
#[async_trait::async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn get_by_name(&self, name: &str) -> Result<Role, StoreError>;
}

/// Ownership and role-precedence decisions.
pub struct AuthorizationEngine {
    directory: Arc<dyn RoleDirectory>,
}

impl AuthorizationEngine {
    pub fn new(directory: Arc<dyn RoleDirectory>) -> Self {
        Self { directory }
    }

    /// Decide whether `identity` may act on a resource owned by
    /// `resource_owner`, given the role required of non-owners.
    #[instrument(skip_all, fields(user_id = %identity.id, owner_id = %resource_owner, role = %required_role))]
    pub async fn authorize(
        &self,
        identity: &User,
        resource_owner: UserId,
        required_role: &str,
        deadline: Deadline,
    ) -> Result<bool, AuthzError> {
        if identity.id == resource_owner {
            metrics::record_authz_decision("owner");
            return Ok(true);
        }

        let lookup = deadline
            .run(self.directory.get_by_name(required_role))
            .await
            .map_err(|_| {
                metrics::record_authz_decision("error");
                AuthzError::Directory("deadline exceeded".to_string())
            })?;

        let required = lookup.map_err(|e| {
            metrics::record_authz_decision("error");
            match e {
                StoreError::NotFound(_) => AuthzError::Lookup(required_role.to_string()),
                StoreError::Transient(reason) | StoreError::Conflict(reason) => {
                    AuthzError::Directory(reason)
                }
            }
        })?;

        let allowed = identity.role.level >= required.level;
        metrics::record_authz_decision(if allowed { "role" } else { "denied" });

        tracing::debug!(
            target: "social.authz",
            caller_level = identity.role.level,
            required_level = required.level,
            allowed,
            "Role precedence evaluated"
        );

        Ok(allowed)
    }
}

/// Run [`AuthorizationEngine::authorize`] as a gate: a `false` decision
/// becomes `Forbidden` so the protected action never executes.
pub async fn require_access(
    engine: &AuthorizationEngine,
    identity: &User,
    resource_owner: UserId,
    required_role: &str,
    deadline: Deadline,
) -> Result<(), ApiError> {
    if engine
        .authorize(identity, resource_owner, required_role, deadline)
        .await?
    {
        Ok(())
    } else {
        tracing::info!(
            target: "social.authz",
            user_id = %identity.id,
            role = %required_role,
            "Access denied"
        );
        Err(ApiError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ))
    }
}

/// Mock role directory for testing.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Role directory backed by a fixed map.
    pub struct StaticRoleDirectory {
        roles: HashMap<String, Role>,
        call_count: AtomicUsize,
        return_error: bool,
        delay: Option<Duration>,
    }

    impl StaticRoleDirectory {
        /// Directory with the given roles.
        pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
            Self {
                roles: roles.into_iter().map(|r| (r.name.clone(), r)).collect(),
                call_count: AtomicUsize::new(0),
                return_error: false,
                delay: None,
            }
        }

        /// The standard user < moderator < admin hierarchy.
        pub fn standard() -> Self {
            Self::new(standard_roles())
        }

        /// Directory whose every lookup fails.
        pub fn failing() -> Self {
            Self {
                return_error: true,
                ..Self::new(Vec::new())
            }
        }

        /// Delay each lookup (paired with a short deadline).
        #[must_use]
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Get the number of lookups made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl RoleDirectory for StaticRoleDirectory {
        async fn get_by_name(&self, name: &str) -> Result<Role, StoreError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if self.return_error {
                return Err(StoreError::Transient(
                    "Mock role directory error".to_string(),
                ));
            }

            self.roles
                .get(name)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("role '{}'", name)))
        }
    }

    /// `user` (1), `moderator` (2), `admin` (3).
    pub fn standard_roles() -> Vec<Role> {
        vec![
            Role {
                id: 1,
                name: "user".to_string(),
                level: 1,
                description: "A user can create posts and comments".to_string(),
            },
            Role {
                id: 2,
                name: "moderator".to_string(),
                level: 2,
                description: "A moderator can update other users posts".to_string(),
            },
            Role {
                id: 3,
                name: "admin".to_string(),
                level: 3,
                description: "An admin can update and delete other users posts".to_string(),
            },
        ]
    }
}
