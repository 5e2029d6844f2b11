use std::collections::BTreeSet;

use tracing::debug;
use warden_core::{AppError, AppResult, UserSession};
use warden_domain::{Role, RoleId};

use crate::role_ref_updater::{find_role_ids_for_group, find_role_ids_for_user};
use crate::role_search::{RoleList, RoleSearchFilter};
use crate::role_store_ports::{RoleTransaction, ServiceRecord, ServiceRef};

use super::mutations::role_name_not_found;
use super::{RoleStoreService, finish_read};

impl RoleStoreService {
    /// Returns a role by identifier, or `None` when it does not exist.
    pub async fn get_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let mut transaction = self.transactions.begin().await?;
        let result = transaction.find_role_by_id(role_id).await;
        finish_read(transaction, result).await
    }

    /// Returns a role by name. A missing role is `NotFound`.
    pub async fn get_role_by_name(&self, role_name: &str) -> AppResult<Role> {
        let mut transaction = self.transactions.begin().await?;
        let result = transaction.find_role_by_name(role_name).await;
        finish_read(transaction, result)
            .await?
            .ok_or_else(|| role_name_not_found(role_name))
    }

    /// Returns whether a role with this identifier exists.
    pub async fn role_exists(&self, role_id: RoleId) -> AppResult<bool> {
        Ok(self.get_role(role_id).await?.is_some())
    }

    /// Returns whether a role with this name exists.
    pub async fn role_exists_by_name(&self, role_name: &str) -> AppResult<bool> {
        let mut transaction = self.transactions.begin().await?;
        let result = transaction.find_role_by_name(role_name).await;
        Ok(finish_read(transaction, result).await?.is_some())
    }

    /// Lists every role matching the filter, ordered by identifier.
    pub async fn list_roles(&self, filter: &RoleSearchFilter) -> AppResult<Vec<Role>> {
        let mut transaction = self.transactions.begin().await?;
        let result = transaction.list_roles().await;
        let roles = finish_read(transaction, result).await?;
        Ok(filter.apply(roles))
    }

    /// Lists all role names.
    pub async fn list_role_names(&self, actor: &UserSession) -> AppResult<Vec<String>> {
        Self::require_role_reader(actor)?;

        let mut transaction = self.transactions.begin().await?;
        let result = transaction.list_role_names().await;
        finish_read(transaction, result).await
    }

    /// Filters, sorts and paginates roles.
    pub async fn search_roles(&self, filter: &RoleSearchFilter) -> AppResult<RoleList> {
        let mut roles = self.list_roles(filter).await?;
        filter.sort(&mut roles);
        Ok(RoleList::paginate(roles, filter))
    }

    /// Returns the roles visible to a session.
    ///
    /// Administrators and auditors go through the full search. Any other
    /// session sees only the roles naming its login directly.
    pub async fn get_roles_for_principal(
        &self,
        session: &UserSession,
        filter: &RoleSearchFilter,
    ) -> AppResult<RoleList> {
        if session.can_read_all_roles() {
            return self.search_roles(filter).await;
        }
        let Some(login) = session.login_id() else {
            return Err(AppError::Forbidden(
                "a login is required to list roles".to_owned(),
            ));
        };

        let mut transaction = self.transactions.begin().await?;
        let result = async {
            if transaction.find_user(login).await?.is_none() {
                debug!(login, "user not found, no roles visible");
                return Ok(Vec::new());
            }

            let role_ids = find_role_ids_for_user(transaction.as_mut(), login).await?;
            load_roles(transaction.as_mut(), role_ids).await
        }
        .await;
        let roles = finish_read(transaction, result).await?;

        Ok(RoleList::paginate(filter.apply(roles), filter))
    }

    /// Returns the union of roles naming the user or any of the groups.
    pub async fn get_roles_for_user_and_groups(
        &self,
        user_name: Option<&str>,
        group_names: &[String],
    ) -> AppResult<Vec<Role>> {
        let mut transaction = self.transactions.begin().await?;
        let result =
            roles_for_user_and_groups(transaction.as_mut(), user_name, group_names).await;
        finish_read(transaction, result).await
    }

    /// Returns the roles for a login, resolving its group memberships first.
    pub async fn get_roles_for_login(
        &self,
        actor: &UserSession,
        login: &str,
    ) -> AppResult<Vec<Role>> {
        Self::require_role_reader(actor)?;

        let mut transaction = self.transactions.begin().await?;
        let result = async {
            let groups = transaction.list_groups_for_user(login).await?;
            roles_for_user_and_groups(transaction.as_mut(), Some(login), &groups).await
        }
        .await;
        finish_read(transaction, result).await
    }

    /// Returns the roles applicable to a service.
    ///
    /// An unknown service yields an empty list. Services whose type is on the
    /// all-roles list receive every role.
    pub async fn get_roles_for_service(
        &self,
        actor: &UserSession,
        service: &ServiceRef,
    ) -> AppResult<Vec<Role>> {
        Self::require_role_reader(actor)?;

        let mut transaction = self.transactions.begin().await?;
        let result = async {
            let record = match service {
                ServiceRef::Name(name) => transaction.find_service_by_name(name).await?,
                ServiceRef::Id(service_id) => transaction.find_service_by_id(*service_id).await?,
            };

            match record {
                Some(record) => self.roles_for_service(transaction.as_mut(), &record).await,
                None => {
                    debug!(?service, "service not found, no roles returned");
                    Ok(Vec::new())
                }
            }
        }
        .await;
        finish_read(transaction, result).await
    }

    /// Returns the current role version observed by the service.
    pub async fn get_role_version(&self, service_name: &str) -> AppResult<Option<i64>> {
        self.version_notifier.current_version(service_name).await
    }

    pub(super) async fn roles_for_service(
        &self,
        transaction: &mut dyn RoleTransaction,
        service: &ServiceRecord,
    ) -> AppResult<Vec<Role>> {
        if self.config.returns_all_roles_for(&service.service_type) {
            return transaction.list_roles().await;
        }

        transaction.list_roles_for_service(service.id).await
    }
}

async fn roles_for_user_and_groups(
    transaction: &mut dyn RoleTransaction,
    user_name: Option<&str>,
    group_names: &[String],
) -> AppResult<Vec<Role>> {
    let mut role_ids = BTreeSet::new();

    if let Some(user_name) = user_name {
        role_ids.extend(find_role_ids_for_user(&mut *transaction, user_name).await?);
    }
    for group_name in group_names {
        role_ids.extend(find_role_ids_for_group(&mut *transaction, group_name).await?);
    }

    load_roles(transaction, role_ids).await
}

async fn load_roles(
    transaction: &mut dyn RoleTransaction,
    role_ids: impl IntoIterator<Item = RoleId>,
) -> AppResult<Vec<Role>> {
    let mut roles = Vec::new();
    for role_id in role_ids {
        if let Some(role) = transaction.find_role_by_id(role_id).await? {
            roles.push(role);
        }
    }

    Ok(roles)
}
