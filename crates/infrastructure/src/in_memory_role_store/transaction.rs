use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use warden_application::{
    CommitAction, CommitHooks, PrincipalDirectory, PrincipalRecord, RoleAuditRecord,
    RoleAuditSink, RoleDependents, RoleRecordStore, RoleReferenceIndex, RoleTransaction,
    ServiceDirectory, ServiceRecord,
};
use warden_core::{AppError, AppResult};
use warden_domain::{PrincipalKind, Role, RoleId, RoleInput};

use super::RoleStoreState;

pub(super) struct InMemoryRoleTransaction {
    guard: OwnedMutexGuard<RoleStoreState>,
    working: RoleStoreState,
    hooks: CommitHooks,
}

impl InMemoryRoleTransaction {
    pub(super) fn new(guard: OwnedMutexGuard<RoleStoreState>) -> Self {
        let working = RoleStoreState::clone(&guard);
        Self {
            guard,
            working,
            hooks: CommitHooks::new(),
        }
    }

    fn role_mut(&mut self, role_id: RoleId) -> AppResult<&mut Role> {
        self.working
            .roles
            .get_mut(&role_id)
            .ok_or_else(|| AppError::NotFound(format!("role with id {role_id} does not exist")))
    }

    fn name_taken_by_other(&self, name: &str, role_id: Option<RoleId>) -> bool {
        self.working
            .roles
            .values()
            .any(|role| role.name == name && Some(role.id) != role_id)
    }
}

#[async_trait]
impl RoleRecordStore for InMemoryRoleTransaction {
    async fn find_role_by_id(&mut self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.working.roles.get(&role_id).cloned())
    }

    async fn find_role_by_name(&mut self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .working
            .roles
            .values()
            .find(|role| role.name == name)
            .cloned())
    }

    async fn list_roles(&mut self) -> AppResult<Vec<Role>> {
        Ok(self.working.roles.values().cloned().collect())
    }

    async fn list_role_names(&mut self) -> AppResult<Vec<String>> {
        let mut names = self
            .working
            .roles
            .values()
            .map(|role| role.name.clone())
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    async fn list_roles_for_service(&mut self, service_id: i64) -> AppResult<Vec<Role>> {
        let policy_role_refs = &self.working.policy_role_refs;
        Ok(self
            .working
            .roles
            .values()
            .filter(|role| {
                policy_role_refs
                    .iter()
                    .any(|(ref_service_id, name)| *ref_service_id == service_id && *name == role.name)
            })
            .cloned()
            .collect())
    }

    async fn insert_role(&mut self, input: &RoleInput, actor: &str) -> AppResult<Role> {
        if self.name_taken_by_other(&input.name, None) {
            return Err(AppError::DuplicateName(format!(
                "role with name '{}' already exists",
                input.name
            )));
        }

        self.working.last_role_id += 1;
        let now = Utc::now();
        let role = Role {
            id: RoleId::new(self.working.last_role_id),
            name: input.name.clone(),
            description: input.description.clone(),
            members: input.members.clone(),
            options: input.options.clone(),
            created_by: actor.to_owned(),
            updated_by: actor.to_owned(),
            created_at: now,
            updated_at: now,
            policy_version: 1,
            role_version: 1,
        };
        self.working.roles.insert(role.id, role.clone());

        Ok(role)
    }

    async fn update_role(
        &mut self,
        role_id: RoleId,
        input: &RoleInput,
        actor: &str,
    ) -> AppResult<Role> {
        if self.name_taken_by_other(&input.name, Some(role_id)) {
            return Err(AppError::DuplicateName(format!(
                "role with name '{}' already exists",
                input.name
            )));
        }

        let role = self.role_mut(role_id)?;
        role.name = input.name.clone();
        role.description = input.description.clone();
        role.members = input.members.clone();
        role.options = input.options.clone();
        role.updated_by = actor.to_owned();
        role.updated_at = Utc::now();

        Ok(role.clone())
    }

    async fn delete_role(&mut self, role_id: RoleId) -> AppResult<()> {
        self.working
            .roles
            .remove(&role_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("role with id {role_id} does not exist")))
    }

    async fn bump_policy_version(&mut self, role_id: RoleId) -> AppResult<()> {
        self.role_mut(role_id)?.policy_version += 1;
        Ok(())
    }

    async fn bump_role_version(&mut self, role_id: RoleId) -> AppResult<()> {
        self.role_mut(role_id)?.role_version += 1;
        Ok(())
    }
}

#[async_trait]
impl RoleReferenceIndex for InMemoryRoleTransaction {
    async fn list_references(
        &mut self,
        role_id: RoleId,
        kind: PrincipalKind,
    ) -> AppResult<Vec<String>> {
        Ok(self
            .working
            .references
            .get(&(role_id, kind))
            .map(|names| names.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_reference(
        &mut self,
        role_id: RoleId,
        kind: PrincipalKind,
        principal: &PrincipalRecord,
    ) -> AppResult<()> {
        self.working
            .references
            .entry((role_id, kind))
            .or_default()
            .insert(principal.name.clone(), principal.id);
        Ok(())
    }

    async fn remove_reference(
        &mut self,
        role_id: RoleId,
        kind: PrincipalKind,
        principal_name: &str,
    ) -> AppResult<()> {
        if let Some(names) = self.working.references.get_mut(&(role_id, kind)) {
            names.remove(principal_name);
        }
        Ok(())
    }

    async fn remove_all_references(&mut self, role_id: RoleId) -> AppResult<()> {
        self.working
            .references
            .retain(|(stored_role_id, _), _| *stored_role_id != role_id);
        Ok(())
    }

    async fn find_role_ids_for_principal(
        &mut self,
        kind: PrincipalKind,
        principal_name: &str,
    ) -> AppResult<Vec<RoleId>> {
        Ok(self
            .working
            .references
            .iter()
            .filter(|((_, stored_kind), names)| {
                *stored_kind == kind && names.contains_key(principal_name)
            })
            .map(|((role_id, _), _)| *role_id)
            .collect())
    }
}

#[async_trait]
impl RoleDependents for InMemoryRoleTransaction {
    async fn count_policy_refs_by_role_name(&mut self, role_name: &str) -> AppResult<i64> {
        Ok(count_i64(
            self.working
                .policy_role_refs
                .iter()
                .filter(|(_, name)| name == role_name)
                .count(),
        ))
    }

    async fn count_role_refs_by_role_name(&mut self, role_name: &str) -> AppResult<i64> {
        Ok(count_i64(
            self.working
                .references
                .iter()
                .filter(|((_, kind), names)| {
                    *kind == PrincipalKind::Role && names.contains_key(role_name)
                })
                .count(),
        ))
    }

    async fn count_zone_refs_by_role_name(&mut self, role_name: &str) -> AppResult<i64> {
        Ok(count_i64(
            self.working
                .zone_role_refs
                .iter()
                .filter(|name| *name == role_name)
                .count(),
        ))
    }

    async fn remove_role_from_audit_filters(&mut self, role_name: &str) -> AppResult<u64> {
        let before = self.working.audit_filter_roles.len();
        self.working
            .audit_filter_roles
            .retain(|(_, name)| name != role_name);
        Ok(removed_u64(before, self.working.audit_filter_roles.len()))
    }

    async fn remove_role_from_grant_mappings(&mut self, role_name: &str) -> AppResult<u64> {
        let before = self.working.grant_mappings.len();
        self.working.grant_mappings.retain(|(_, name)| name != role_name);
        Ok(removed_u64(before, self.working.grant_mappings.len()))
    }
}

#[async_trait]
impl PrincipalDirectory for InMemoryRoleTransaction {
    async fn find_user(&mut self, name: &str) -> AppResult<Option<PrincipalRecord>> {
        Ok(self.working.users.get(name).cloned())
    }

    async fn find_group(&mut self, name: &str) -> AppResult<Option<PrincipalRecord>> {
        Ok(self.working.groups.get(name).cloned())
    }

    async fn provision_user(&mut self, name: &str) -> AppResult<PrincipalRecord> {
        if let Some(existing) = self.working.users.get(name) {
            return Ok(existing.clone());
        }

        let record = PrincipalRecord {
            id: self.working.next_principal_id(),
            name: name.to_owned(),
        };
        self.working.users.insert(name.to_owned(), record.clone());
        Ok(record)
    }

    async fn provision_group(&mut self, name: &str) -> AppResult<PrincipalRecord> {
        if let Some(existing) = self.working.groups.get(name) {
            return Ok(existing.clone());
        }

        let record = PrincipalRecord {
            id: self.working.next_principal_id(),
            name: name.to_owned(),
        };
        self.working.groups.insert(name.to_owned(), record.clone());
        Ok(record)
    }

    async fn list_groups_for_user(&mut self, name: &str) -> AppResult<Vec<String>> {
        Ok(self
            .working
            .group_memberships
            .get(name)
            .map(|groups| groups.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ServiceDirectory for InMemoryRoleTransaction {
    async fn find_service_by_name(&mut self, name: &str) -> AppResult<Option<ServiceRecord>> {
        Ok(self.working.services.get(name).cloned())
    }

    async fn find_service_by_id(&mut self, service_id: i64) -> AppResult<Option<ServiceRecord>> {
        Ok(self
            .working
            .services
            .values()
            .find(|service| service.id == service_id)
            .cloned())
    }
}

#[async_trait]
impl RoleAuditSink for InMemoryRoleTransaction {
    async fn append_role_audit(&mut self, record: RoleAuditRecord) -> AppResult<()> {
        self.working.audit_log.push(record);
        Ok(())
    }
}

#[async_trait]
impl RoleTransaction for InMemoryRoleTransaction {
    fn run_on_commit(&mut self, action: Arc<dyn CommitAction>) {
        self.hooks.register(action);
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self {
            mut guard,
            working,
            hooks,
        } = *self;
        *guard = working;
        drop(guard);

        hooks.run_all().await;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

fn count_i64(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

fn removed_u64(before: usize, after: usize) -> u64 {
    u64::try_from(before.saturating_sub(after)).unwrap_or(u64::MAX)
}
