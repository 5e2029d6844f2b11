use async_trait::async_trait;
use sqlx::FromRow;
use sqlx::types::Json;

use warden_application::{
    PrincipalDirectory, PrincipalRecord, RoleAuditRecord, RoleAuditSink, ServiceDirectory,
    ServiceRecord,
};
use warden_core::{AppError, AppResult};

use super::transaction::PostgresRoleTransaction;

#[derive(Debug, FromRow)]
struct PrincipalRow {
    id: i64,
    name: String,
}

impl From<PrincipalRow> for PrincipalRecord {
    fn from(row: PrincipalRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(Debug, FromRow)]
struct ServiceRow {
    id: i64,
    name: String,
    service_type: String,
}

impl From<ServiceRow> for ServiceRecord {
    fn from(row: ServiceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            service_type: row.service_type,
        }
    }
}

#[async_trait]
impl PrincipalDirectory for PostgresRoleTransaction {
    async fn find_user(&mut self, name: &str) -> AppResult<Option<PrincipalRecord>> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, name
            FROM principal_users
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user: {error}")))?;

        Ok(row.map(PrincipalRecord::from))
    }

    async fn find_group(&mut self, name: &str) -> AppResult<Option<PrincipalRecord>> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            SELECT id, name
            FROM principal_groups
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find group: {error}")))?;

        Ok(row.map(PrincipalRecord::from))
    }

    async fn provision_user(&mut self, name: &str) -> AppResult<PrincipalRecord> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            INSERT INTO principal_users (name, is_placeholder)
            VALUES ($1, true)
            ON CONFLICT (name) DO UPDATE
            SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to provision user: {error}")))?;

        Ok(PrincipalRecord::from(row))
    }

    async fn provision_group(&mut self, name: &str) -> AppResult<PrincipalRecord> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            r#"
            INSERT INTO principal_groups (name, is_placeholder)
            VALUES ($1, true)
            ON CONFLICT (name) DO UPDATE
            SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to provision group: {error}")))?;

        Ok(PrincipalRecord::from(row))
    }

    async fn list_groups_for_user(&mut self, name: &str) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT groups.name
            FROM principal_groups AS groups
            INNER JOIN principal_group_users AS memberships
                ON memberships.group_id = groups.id
            INNER JOIN principal_users AS users
                ON users.id = memberships.user_id
            WHERE users.name = $1
            ORDER BY groups.name
            "#,
        )
        .bind(name)
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list groups for user: {error}")))
    }
}

#[async_trait]
impl ServiceDirectory for PostgresRoleTransaction {
    async fn find_service_by_name(&mut self, name: &str) -> AppResult<Option<ServiceRecord>> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT id, name, service_type
            FROM services
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find service: {error}")))?;

        Ok(row.map(ServiceRecord::from))
    }

    async fn find_service_by_id(&mut self, service_id: i64) -> AppResult<Option<ServiceRecord>> {
        let row = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT id, name, service_type
            FROM services
            WHERE id = $1
            "#,
        )
        .bind(service_id)
        .fetch_optional(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find service: {error}")))?;

        Ok(row.map(ServiceRecord::from))
    }
}

#[async_trait]
impl RoleAuditSink for PostgresRoleTransaction {
    async fn append_role_audit(&mut self, record: RoleAuditRecord) -> AppResult<()> {
        let role_id = record.role().map(|role| role.id.value());
        let role_name = record.role().map(|role| role.name.clone());

        sqlx::query(
            r#"
            INSERT INTO role_audit_log (
                event_id,
                action,
                actor,
                role_id,
                role_name,
                before_state,
                after_state,
                recorded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.event_id)
        .bind(record.action.as_str())
        .bind(record.actor.as_str())
        .bind(role_id)
        .bind(role_name)
        .bind(record.before.as_ref().map(Json))
        .bind(record.after.as_ref().map(Json))
        .bind(record.recorded_at)
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append role audit: {error}")))?;

        Ok(())
    }
}
