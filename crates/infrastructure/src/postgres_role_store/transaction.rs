use std::sync::Arc;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};

use warden_application::{CommitAction, CommitHooks, RoleRecordStore, RoleTransaction};
use warden_core::{AppError, AppResult};
use warden_domain::{Role, RoleId, RoleInput};

use super::{ROLE_RETURNING, ROLE_SELECT, RoleRow, map_role_conflict};

pub(super) struct PostgresRoleTransaction {
    pub(super) transaction: Transaction<'static, Postgres>,
    hooks: CommitHooks,
}

impl PostgresRoleTransaction {
    pub(super) fn new(transaction: Transaction<'static, Postgres>) -> Self {
        Self {
            transaction,
            hooks: CommitHooks::new(),
        }
    }

    async fn bump_role_counter(&mut self, role_id: RoleId, column: &str) -> AppResult<()> {
        let sql = format!("UPDATE roles SET {column} = {column} + 1 WHERE id = $1");
        let result = sqlx::query(&sql)
            .bind(role_id.value())
            .execute(&mut *self.transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to bump {column}: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "role with id {role_id} does not exist"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl RoleRecordStore for PostgresRoleTransaction {
    async fn find_role_by_id(&mut self, role_id: RoleId) -> AppResult<Option<Role>> {
        let sql = format!("{ROLE_SELECT} WHERE id = $1");
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(role_id.value())
            .fetch_optional(&mut *self.transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to find role: {error}")))?;

        Ok(row.map(Role::from))
    }

    async fn find_role_by_name(&mut self, name: &str) -> AppResult<Option<Role>> {
        let sql = format!("{ROLE_SELECT} WHERE name = $1");
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(name)
            .fetch_optional(&mut *self.transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to find role: {error}")))?;

        Ok(row.map(Role::from))
    }

    async fn list_roles(&mut self) -> AppResult<Vec<Role>> {
        let sql = format!("{ROLE_SELECT} ORDER BY id");
        let rows = sqlx::query_as::<_, RoleRow>(&sql)
            .fetch_all(&mut *self.transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn list_role_names(&mut self) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT name
            FROM roles
            ORDER BY name
            "#,
        )
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list role names: {error}")))
    }

    async fn list_roles_for_service(&mut self, service_id: i64) -> AppResult<Vec<Role>> {
        let sql = format!(
            "{ROLE_SELECT} WHERE name IN (SELECT role_name FROM policy_role_refs WHERE service_id = $1) ORDER BY id"
        );
        let rows = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(service_id)
            .fetch_all(&mut *self.transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list roles for service: {error}"))
            })?;

        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn insert_role(&mut self, input: &RoleInput, actor: &str) -> AppResult<Role> {
        let sql = format!(
            r#"
            INSERT INTO roles (name, description, members, options, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $5)
            {ROLE_RETURNING}
            "#
        );
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(input.name.as_str())
            .bind(input.description.as_str())
            .bind(Json(&input.members))
            .bind(Json(&input.options))
            .bind(actor)
            .fetch_one(&mut *self.transaction)
            .await
            .map_err(|error| map_role_conflict(error, input.name.as_str()))?;

        Ok(Role::from(row))
    }

    async fn update_role(
        &mut self,
        role_id: RoleId,
        input: &RoleInput,
        actor: &str,
    ) -> AppResult<Role> {
        let sql = format!(
            r#"
            UPDATE roles
            SET name = $2,
                description = $3,
                members = $4,
                options = $5,
                updated_by = $6,
                updated_at = now()
            WHERE id = $1
            {ROLE_RETURNING}
            "#
        );
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(role_id.value())
            .bind(input.name.as_str())
            .bind(input.description.as_str())
            .bind(Json(&input.members))
            .bind(Json(&input.options))
            .bind(actor)
            .fetch_optional(&mut *self.transaction)
            .await
            .map_err(|error| map_role_conflict(error, input.name.as_str()))?;

        row.map(Role::from)
            .ok_or_else(|| AppError::NotFound(format!("role with id {role_id} does not exist")))
    }

    async fn delete_role(&mut self, role_id: RoleId) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.value())
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "role with id {role_id} does not exist"
            )));
        }

        Ok(())
    }

    async fn bump_policy_version(&mut self, role_id: RoleId) -> AppResult<()> {
        self.bump_role_counter(role_id, "policy_version").await
    }

    async fn bump_role_version(&mut self, role_id: RoleId) -> AppResult<()> {
        self.bump_role_counter(role_id, "role_version").await
    }
}

#[async_trait]
impl RoleTransaction for PostgresRoleTransaction {
    fn run_on_commit(&mut self, action: Arc<dyn CommitAction>) {
        self.hooks.register(action);
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self { transaction, hooks } = *self;
        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        hooks.run_all().await;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.transaction.rollback().await.map_err(|error| {
            AppError::Internal(format!("failed to roll back transaction: {error}"))
        })
    }
}
