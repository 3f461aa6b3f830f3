//! Per-user role cache.
//!
//! Role lookups race the profile query against a timeout. A successful
//! lookup refreshes the cache; a failed or slow one falls back to the last
//! cached role, then to the configured default. Signing out drops the entry.

use gongbu_core::model::UserRole;
use gongbu_core::store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct RoleCache {
    store: Arc<dyn Store>,
    timeout: Duration,
    default_role: UserRole,
    roles: RwLock<HashMap<String, UserRole>>,
}

impl RoleCache {
    pub fn new(store: Arc<dyn Store>, timeout: Duration, default_role: UserRole) -> Self {
        Self {
            store,
            timeout,
            default_role,
            roles: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(store: Arc<dyn Store>, auth: &gongbu_config::AuthConfig) -> Self {
        Self::new(store, Duration::from_secs(auth.role_timeout_secs), auth.default_role)
    }

    /// Resolve a user's role. Never fails.
    pub async fn role_for(&self, user_id: &str) -> UserRole {
        match tokio::time::timeout(self.timeout, self.store.profile(user_id)).await {
            Ok(Ok(Some(profile))) => {
                self.roles.write().await.insert(user_id.to_string(), profile.role);
                profile.role
            }
            Ok(Ok(None)) => {
                debug!(user = %user_id, "No profile, using default role");
                // A deleted profile must not keep its old role as a fallback.
                self.roles.write().await.remove(user_id);
                self.default_role
            }
            Ok(Err(e)) => {
                warn!(user = %user_id, error = %e, "Role lookup failed");
                self.fallback(user_id).await
            }
            Err(_) => {
                warn!(user = %user_id, timeout_secs = self.timeout.as_secs(), "Role lookup timed out");
                self.fallback(user_id).await
            }
        }
    }

    async fn fallback(&self, user_id: &str) -> UserRole {
        self.cached(user_id).await.unwrap_or(self.default_role)
    }

    /// Last successfully fetched role, if any.
    pub async fn cached(&self, user_id: &str) -> Option<UserRole> {
        self.roles.read().await.get(user_id).copied()
    }

    /// Drop the cached role; called on sign-out.
    pub async fn invalidate(&self, user_id: &str) -> bool {
        self.roles.write().await.remove(user_id).is_some()
    }

    pub async fn clear(&self) {
        self.roles.write().await.clear();
    }
}
