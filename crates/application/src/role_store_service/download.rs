use std::sync::Arc;

use tracing::debug;
use warden_core::AppResult;
use warden_domain::Role;

use crate::role_cache::RoleSnapshot;

use super::{RoleStoreService, finish_read};

impl RoleStoreService {
    /// Returns the role snapshot a policy-enforcement agent should apply.
    ///
    /// The version is read before the roles are loaded, so a snapshot is
    /// never stamped newer than the data it holds. Returns `None` when no
    /// role version has been committed yet.
    pub async fn get_roles_download(
        &self,
        service_name: &str,
        last_known_role_version: Option<i64>,
    ) -> AppResult<Option<Arc<RoleSnapshot>>> {
        let current_version = self.version_notifier.current_version(service_name).await?;
        debug!(
            service = service_name,
            ?current_version,
            ?last_known_role_version,
            "serving role download"
        );

        self.role_cache
            .get_latest(
                service_name,
                last_known_role_version,
                current_version,
                || self.load_download_roles(service_name),
            )
            .await
    }

    async fn load_download_roles(&self, service_name: &str) -> AppResult<Vec<Role>> {
        let mut transaction = self.transactions.begin().await?;
        let result = async {
            match transaction.find_service_by_name(service_name).await? {
                Some(service) => self.roles_for_service(transaction.as_mut(), &service).await,
                None => Ok(Vec::new()),
            }
        }
        .await;
        finish_read(transaction, result).await
    }
}
