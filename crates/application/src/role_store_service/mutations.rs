use tracing::{debug, info};
use warden_core::{AppError, AppResult, UserSession};
use warden_domain::{AuditAction, Role, RoleId, RoleInput};

use crate::role_reference_guard::{GuardedOperation, ensure_role_not_referenced};
use crate::role_ref_updater::{
    cleanup_ref_tables, find_containing_role_ids, rebuild_reference_rows,
};
use crate::role_store_ports::{RoleAuditRecord, RoleTransaction};

use super::{RoleStoreService, finish};

impl RoleStoreService {
    /// Creates a role, indexes its members and schedules one version bump.
    pub async fn create_role(
        &self,
        actor: &UserSession,
        input: RoleInput,
        create_missing_principals: bool,
    ) -> AppResult<Role> {
        Self::require_role_admin(actor)?;
        let input = input.validated()?;

        let mut transaction = self.transactions.begin().await?;
        let result = self
            .create_role_in(
                transaction.as_mut(),
                actor,
                &input,
                create_missing_principals,
            )
            .await;
        let role = finish(transaction, result).await?;

        info!(role = %role.name, role_id = %role.id, actor = actor.actor_name(), "created role");
        Ok(role)
    }

    /// Updates a role, guarding renames against live references.
    pub async fn update_role(
        &self,
        actor: &UserSession,
        role_id: RoleId,
        input: RoleInput,
        create_missing_principals: bool,
    ) -> AppResult<Role> {
        Self::require_role_admin(actor)?;
        let input = input.validated()?;

        let mut transaction = self.transactions.begin().await?;
        let result = self
            .update_role_in(
                transaction.as_mut(),
                actor,
                role_id,
                &input,
                create_missing_principals,
            )
            .await;
        let role = finish(transaction, result).await?;

        info!(role = %role.name, role_id = %role.id, actor = actor.actor_name(), "updated role");
        Ok(role)
    }

    /// Deletes a role by identifier.
    pub async fn delete_role(&self, actor: &UserSession, role_id: RoleId) -> AppResult<()> {
        Self::require_role_admin(actor)?;

        let mut transaction = self.transactions.begin().await?;
        let result = async {
            let role = transaction
                .find_role_by_id(role_id)
                .await?
                .ok_or_else(|| role_id_not_found(role_id))?;
            self.delete_role_in(transaction.as_mut(), actor, role).await
        }
        .await;
        let role = finish(transaction, result).await?;

        info!(role = %role.name, role_id = %role.id, actor = actor.actor_name(), "deleted role");
        Ok(())
    }

    /// Deletes a role by name.
    pub async fn delete_role_by_name(&self, actor: &UserSession, role_name: &str) -> AppResult<()> {
        Self::require_role_admin(actor)?;

        let mut transaction = self.transactions.begin().await?;
        let result = async {
            let role = transaction
                .find_role_by_name(role_name)
                .await?
                .ok_or_else(|| role_name_not_found(role_name))?;
            self.delete_role_in(transaction.as_mut(), actor, role).await
        }
        .await;
        let role = finish(transaction, result).await?;

        info!(role = %role.name, role_id = %role.id, actor = actor.actor_name(), "deleted role");
        Ok(())
    }

    async fn create_role_in(
        &self,
        transaction: &mut dyn RoleTransaction,
        actor: &UserSession,
        input: &RoleInput,
        create_missing_principals: bool,
    ) -> AppResult<Role> {
        if transaction.find_role_by_name(&input.name).await?.is_some() {
            return Err(duplicate_name(&input.name));
        }

        self.version_notifier.schedule_version_bump(&mut *transaction);

        let role = transaction.insert_role(input, actor.actor_name()).await?;
        rebuild_reference_rows(&mut *transaction, &role, create_missing_principals).await?;

        transaction
            .append_role_audit(RoleAuditRecord::new(
                AuditAction::RoleCreated,
                actor.actor_name(),
                None,
                Some(role.clone()),
            ))
            .await?;

        Ok(role)
    }

    async fn update_role_in(
        &self,
        transaction: &mut dyn RoleTransaction,
        actor: &UserSession,
        role_id: RoleId,
        input: &RoleInput,
        create_missing_principals: bool,
    ) -> AppResult<Role> {
        let existing = transaction
            .find_role_by_id(role_id)
            .await?
            .ok_or_else(|| role_id_not_found(role_id))?;

        if existing.name != input.name {
            ensure_role_not_referenced(
                &mut *transaction,
                &existing.name,
                GuardedOperation::Rename,
            )
            .await?;

            if transaction.find_role_by_name(&input.name).await?.is_some() {
                return Err(duplicate_name(&input.name));
            }
        }

        self.version_notifier.schedule_version_bump(&mut *transaction);

        let updated = transaction
            .update_role(role_id, input, actor.actor_name())
            .await?;
        rebuild_reference_rows(&mut *transaction, &updated, create_missing_principals).await?;

        let mut stale_role_ids = vec![role_id];
        stale_role_ids.extend(find_containing_role_ids(&mut *transaction, &updated.name).await?);
        for stale_role_id in stale_role_ids {
            transaction.bump_policy_version(stale_role_id).await?;
            if self.config.supports_roles_download_by_service {
                transaction.bump_role_version(stale_role_id).await?;
            }
        }

        let updated = transaction
            .find_role_by_id(role_id)
            .await?
            .ok_or_else(|| role_id_not_found(role_id))?;

        transaction
            .append_role_audit(RoleAuditRecord::new(
                AuditAction::RoleUpdated,
                actor.actor_name(),
                Some(existing),
                Some(updated.clone()),
            ))
            .await?;

        Ok(updated)
    }

    async fn delete_role_in(
        &self,
        transaction: &mut dyn RoleTransaction,
        actor: &UserSession,
        role: Role,
    ) -> AppResult<Role> {
        ensure_role_not_referenced(&mut *transaction, &role.name, GuardedOperation::Delete).await?;

        self.version_notifier.schedule_version_bump(&mut *transaction);

        cleanup_ref_tables(&mut *transaction, role.id).await?;
        let audit_filters = transaction
            .remove_role_from_audit_filters(&role.name)
            .await?;
        let grant_mappings = transaction
            .remove_role_from_grant_mappings(&role.name)
            .await?;
        debug!(
            role = %role.name,
            audit_filters,
            grant_mappings,
            "removed role from dependent configuration"
        );

        transaction.delete_role(role.id).await?;
        transaction
            .append_role_audit(RoleAuditRecord::new(
                AuditAction::RoleDeleted,
                actor.actor_name(),
                Some(role.clone()),
                None,
            ))
            .await?;

        Ok(role)
    }
}

pub(super) fn role_id_not_found(role_id: RoleId) -> AppError {
    AppError::NotFound(format!("role with id {role_id} does not exist"))
}

pub(super) fn role_name_not_found(role_name: &str) -> AppError {
    AppError::NotFound(format!("role with name '{role_name}' does not exist"))
}

fn duplicate_name(role_name: &str) -> AppError {
    AppError::DuplicateName(format!("role with name '{role_name}' already exists"))
}
