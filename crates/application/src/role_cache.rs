//! Read-through cache of role snapshots keyed by service.
//!
//! Every read is validated against the authoritative version passed in by the
//! caller, so there is no background expiry and no explicit invalidation.
//! Snapshots are immutable; recomputing one twice under a race only wastes
//! work.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use warden_core::AppResult;
use warden_domain::Role;

/// Immutable, version-stamped role list for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSnapshot {
    /// Service the snapshot was computed for.
    pub service_name: String,
    /// Version counter value observed when the snapshot was computed.
    pub role_version: i64,
    /// Roles applicable to the service, ordered by identifier.
    pub roles: Vec<Role>,
}

/// Process-wide role snapshot cache.
#[derive(Debug, Default)]
pub struct RoleCache {
    entries: RwLock<HashMap<String, Arc<RoleSnapshot>>>,
}

impl RoleCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the snapshot for `current_version`, recomputing on a mismatch.
    ///
    /// `caller_last_known_version` is informational only; the cache never uses
    /// it for invalidation. Returns `None` without caching when the store has
    /// no version yet.
    pub async fn get_latest<F, Fut>(
        &self,
        service_name: &str,
        caller_last_known_version: Option<i64>,
        current_version: Option<i64>,
        load_roles: F,
    ) -> AppResult<Option<Arc<RoleSnapshot>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Vec<Role>>>,
    {
        let Some(current_version) = current_version else {
            return Ok(None);
        };

        if let Some(snapshot) = self.entries.read().await.get(service_name)
            && snapshot.role_version == current_version
        {
            debug!(
                service = service_name,
                version = current_version,
                ?caller_last_known_version,
                "role cache hit"
            );
            return Ok(Some(snapshot.clone()));
        }

        let snapshot = Arc::new(RoleSnapshot {
            service_name: service_name.to_owned(),
            role_version: current_version,
            roles: load_roles().await?,
        });

        let mut entries = self.entries.write().await;
        let keep_existing = entries
            .get(service_name)
            .is_some_and(|existing| existing.role_version > current_version);
        if keep_existing {
            return Ok(Some(snapshot));
        }

        debug!(
            service = service_name,
            version = current_version,
            role_count = snapshot.roles.len(),
            "role cache refreshed"
        );
        entries.insert(service_name.to_owned(), snapshot.clone());

        Ok(Some(snapshot))
    }

    #[cfg(test)]
    async fn cached(&self, service_name: &str) -> Option<Arc<RoleSnapshot>> {
        self.entries.read().await.get(service_name).cloned()
    }
}
