use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use warden_application::{
    GlobalStateStore, PrincipalRecord, RoleAuditRecord, RoleTransaction, RoleTransactionManager,
    ServiceRecord,
};
use warden_core::AppResult;
use warden_domain::{PrincipalKind, Role, RoleId};

mod transaction;

#[cfg(test)]
mod tests;

use transaction::InMemoryRoleTransaction;

/// In-memory role store used by tests and the `memory` API backend.
///
/// A transaction holds the state lock for its whole lifetime and works on a
/// copy that replaces the shared state only on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRoleStore {
    state: Arc<Mutex<RoleStoreState>>,
    versions: Arc<Mutex<VersionState>>,
}

#[derive(Debug, Clone, Default)]
struct RoleStoreState {
    roles: BTreeMap<RoleId, Role>,
    last_role_id: i64,
    users: BTreeMap<String, PrincipalRecord>,
    groups: BTreeMap<String, PrincipalRecord>,
    group_memberships: BTreeMap<String, BTreeSet<String>>,
    last_principal_id: i64,
    services: BTreeMap<String, ServiceRecord>,
    last_service_id: i64,
    references: BTreeMap<(RoleId, PrincipalKind), BTreeMap<String, i64>>,
    policy_role_refs: Vec<(i64, String)>,
    zone_role_refs: Vec<String>,
    audit_filter_roles: Vec<(String, String)>,
    grant_mappings: Vec<(String, String)>,
    audit_log: Vec<RoleAuditRecord>,
}

impl RoleStoreState {
    fn next_principal_id(&mut self) -> i64 {
        self.last_principal_id += 1;
        self.last_principal_id
    }
}

#[derive(Debug, Default)]
struct VersionState {
    app_data: BTreeMap<String, i64>,
    service_roles: BTreeMap<String, i64>,
}

impl InMemoryRoleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a directory user.
    pub async fn add_user(&self, name: &str) -> PrincipalRecord {
        let mut state = self.state.lock().await;
        let id = state.next_principal_id();
        let record = PrincipalRecord {
            id,
            name: name.to_owned(),
        };
        state.users.insert(name.to_owned(), record.clone());
        record
    }

    /// Registers a directory group.
    pub async fn add_group(&self, name: &str) -> PrincipalRecord {
        let mut state = self.state.lock().await;
        let id = state.next_principal_id();
        let record = PrincipalRecord {
            id,
            name: name.to_owned(),
        };
        state.groups.insert(name.to_owned(), record.clone());
        record
    }

    /// Adds a user to a group.
    pub async fn add_user_to_group(&self, user_name: &str, group_name: &str) {
        self.state
            .lock()
            .await
            .group_memberships
            .entry(user_name.to_owned())
            .or_default()
            .insert(group_name.to_owned());
    }

    /// Registers a service and its version-info row, starting at role version 1.
    pub async fn add_service(&self, name: &str, service_type: &str) -> ServiceRecord {
        let record = {
            let mut state = self.state.lock().await;
            state.last_service_id += 1;
            let record = ServiceRecord {
                id: state.last_service_id,
                name: name.to_owned(),
                service_type: service_type.to_owned(),
            };
            state.services.insert(name.to_owned(), record.clone());
            record
        };

        self.versions
            .lock()
            .await
            .service_roles
            .insert(name.to_owned(), 1);
        record
    }

    /// Records that a policy of the service references the role name.
    pub async fn add_policy_reference(&self, service_id: i64, role_name: &str) {
        self.state
            .lock()
            .await
            .policy_role_refs
            .push((service_id, role_name.to_owned()));
    }

    /// Records that a security zone references the role name.
    pub async fn add_zone_reference(&self, role_name: &str) {
        self.state
            .lock()
            .await
            .zone_role_refs
            .push(role_name.to_owned());
    }

    /// Adds the role name to a service's audit filter.
    pub async fn add_audit_filter_role(&self, service_name: &str, role_name: &str) {
        self.state
            .lock()
            .await
            .audit_filter_roles
            .push((service_name.to_owned(), role_name.to_owned()));
    }

    /// Maps an external grant principal onto the role name.
    pub async fn add_grant_mapping(&self, external_name: &str, role_name: &str) {
        self.state
            .lock()
            .await
            .grant_mappings
            .push((external_name.to_owned(), role_name.to_owned()));
    }

    /// Returns the committed audit records in write order.
    pub async fn audit_log(&self) -> Vec<RoleAuditRecord> {
        self.state.lock().await.audit_log.clone()
    }

    /// Returns the number of audit filter entries naming the role.
    pub async fn audit_filter_count(&self, role_name: &str) -> usize {
        self.state
            .lock()
            .await
            .audit_filter_roles
            .iter()
            .filter(|(_, name)| name == role_name)
            .count()
    }

    /// Returns the number of external grant mappings naming the role.
    pub async fn grant_mapping_count(&self, role_name: &str) -> usize {
        self.state
            .lock()
            .await
            .grant_mappings
            .iter()
            .filter(|(_, name)| name == role_name)
            .count()
    }

    /// Returns the committed reverse-index names for one role and kind.
    pub async fn reference_names(&self, role_id: RoleId, kind: PrincipalKind) -> Vec<String> {
        self.state
            .lock()
            .await
            .references
            .get(&(role_id, kind))
            .map(|names| names.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns whether a directory user exists.
    pub async fn has_user(&self, name: &str) -> bool {
        self.state.lock().await.users.contains_key(name)
    }
}

#[async_trait]
impl RoleTransactionManager for InMemoryRoleStore {
    async fn begin(&self) -> AppResult<Box<dyn RoleTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(InMemoryRoleTransaction::new(guard)))
    }
}

#[async_trait]
impl GlobalStateStore for InMemoryRoleStore {
    async fn app_data_version(&self, state_name: &str) -> AppResult<Option<i64>> {
        Ok(self.versions.lock().await.app_data.get(state_name).copied())
    }

    async fn on_app_data_change(&self, state_name: &str) -> AppResult<i64> {
        let mut versions = self.versions.lock().await;
        let version = versions
            .app_data
            .entry(state_name.to_owned())
            .and_modify(|version| *version += 1)
            .or_insert(1);
        Ok(*version)
    }

    async fn service_role_version(&self, service_name: &str) -> AppResult<Option<i64>> {
        Ok(self
            .versions
            .lock()
            .await
            .service_roles
            .get(service_name)
            .copied())
    }

    async fn on_service_role_change(&self) -> AppResult<()> {
        for version in self.versions.lock().await.service_roles.values_mut() {
            *version += 1;
        }
        Ok(())
    }
}
