//! Role query facade.
//!
//! Composes the record store, reference guards, reverse-index maintenance,
//! version notifier and snapshot cache into the operations exposed to the
//! REST layer and to policy-enforcement agents.

use std::sync::Arc;

use tracing::warn;
use warden_core::{AppError, AppResult, UserSession};

use crate::role_cache::RoleCache;
use crate::role_store_ports::{GlobalStateStore, RoleTransaction, RoleTransactionManager};
use crate::role_version_notifier::RoleVersionNotifier;

mod config;
mod download;
mod mutations;
mod queries;

pub use config::{DEFAULT_SERVICE_TYPES_FOR_ALL_ROLES, RoleStoreConfig};

/// Application service for role administration and role downloads.
#[derive(Clone)]
pub struct RoleStoreService {
    transactions: Arc<dyn RoleTransactionManager>,
    version_notifier: RoleVersionNotifier,
    role_cache: Arc<RoleCache>,
    config: RoleStoreConfig,
}

impl RoleStoreService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        transactions: Arc<dyn RoleTransactionManager>,
        global_state: Arc<dyn GlobalStateStore>,
        config: RoleStoreConfig,
    ) -> Self {
        Self {
            transactions,
            version_notifier: RoleVersionNotifier::new(
                global_state,
                config.supports_roles_download_by_service,
            ),
            role_cache: Arc::new(RoleCache::new()),
            config,
        }
    }

    /// Fails with `Forbidden` unless the session may list every role.
    pub fn require_role_reader(actor: &UserSession) -> AppResult<()> {
        if actor.can_read_all_roles() {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "'{}' is not allowed to list roles",
            actor.actor_name()
        )))
    }

    fn require_role_admin(actor: &UserSession) -> AppResult<()> {
        if actor.is_admin() {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "'{}' is not allowed to manage roles",
            actor.actor_name()
        )))
    }
}

async fn finish<T>(transaction: Box<dyn RoleTransaction>, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            transaction.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = transaction.rollback().await {
                warn!(%rollback_error, "failed to roll back role store transaction");
            }
            Err(error)
        }
    }
}

async fn finish_read<T>(
    transaction: Box<dyn RoleTransaction>,
    result: AppResult<T>,
) -> AppResult<T> {
    if let Err(rollback_error) = transaction.rollback().await {
        warn!(%rollback_error, "failed to release read-only role store transaction");
    }
    result
}
