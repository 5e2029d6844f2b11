use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use warden_application::{GlobalStateStore, RoleTransaction, RoleTransactionManager};
use warden_core::{AppError, AppResult};
use warden_domain::{Role, RoleId, RoleMember, RoleOptions};

mod directories;
mod references;
mod transaction;


use transaction::PostgresRoleTransaction;

/// PostgreSQL-backed role store.
#[derive(Clone)]
pub struct PostgresRoleStore {
    pool: PgPool,
}

impl PostgresRoleStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ROLE_SELECT: &str = r#"
    SELECT
        id,
        name,
        description,
        members,
        options,
        created_by,
        updated_by,
        created_at,
        updated_at,
        policy_version,
        role_version
    FROM roles
"#;

const ROLE_RETURNING: &str = r#"
    RETURNING
        id,
        name,
        description,
        members,
        options,
        created_by,
        updated_by,
        created_at,
        updated_at,
        policy_version,
        role_version
"#;

#[derive(Debug, FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    description: String,
    members: Json<Vec<RoleMember>>,
    options: Json<RoleOptions>,
    created_by: String,
    updated_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    policy_version: i64,
    role_version: i64,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: RoleId::new(row.id),
            name: row.name,
            description: row.description,
            members: row.members.0,
            options: row.options.0,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            policy_version: row.policy_version,
            role_version: row.role_version,
        }
    }
}

fn map_role_conflict(error: sqlx::Error, role_name: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::DuplicateName(format!("role with name '{role_name}' already exists"));
    }

    AppError::Internal(format!("failed to persist role: {error}"))
}

#[async_trait]
impl RoleTransactionManager for PostgresRoleStore {
    async fn begin(&self) -> AppResult<Box<dyn RoleTransaction>> {
        let transaction =
            self.pool.begin().await.map_err(|error| {
                AppError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        Ok(Box::new(PostgresRoleTransaction::new(transaction)))
    }
}

#[async_trait]
impl GlobalStateStore for PostgresRoleStore {
    async fn app_data_version(&self, state_name: &str) -> AppResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT version
            FROM global_state
            WHERE state_name = $1
            "#,
        )
        .bind(state_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read global state: {error}")))
    }

    async fn on_app_data_change(&self, state_name: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO global_state (state_name, version)
            VALUES ($1, 1)
            ON CONFLICT (state_name) DO UPDATE
            SET version = global_state.version + 1,
                updated_at = now()
            RETURNING version
            "#,
        )
        .bind(state_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to advance global state: {error}")))
    }

    async fn service_role_version(&self, service_name: &str) -> AppResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT info.role_version
            FROM service_version_info AS info
            INNER JOIN services
                ON services.id = info.service_id
            WHERE services.name = $1
            "#,
        )
        .bind(service_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to read service role version: {error}"))
        })
    }

    async fn on_service_role_change(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE service_version_info
            SET role_version = role_version + 1,
                role_update_time = now()
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to advance service role versions: {error}"))
        })?;

        Ok(())
    }
}
