use async_trait::async_trait;

use warden_application::{PrincipalRecord, RoleDependents, RoleReferenceIndex};
use warden_core::{AppError, AppResult};
use warden_domain::{PrincipalKind, RoleId};

use super::transaction::PostgresRoleTransaction;

struct ReferenceTable {
    table: &'static str,
    id_column: &'static str,
    name_column: &'static str,
}

fn reference_table(kind: PrincipalKind) -> ReferenceTable {
    match kind {
        PrincipalKind::User => ReferenceTable {
            table: "role_ref_users",
            id_column: "user_id",
            name_column: "user_name",
        },
        PrincipalKind::Group => ReferenceTable {
            table: "role_ref_groups",
            id_column: "group_id",
            name_column: "group_name",
        },
        PrincipalKind::Role => ReferenceTable {
            table: "role_ref_roles",
            id_column: "sub_role_id",
            name_column: "sub_role_name",
        },
    }
}

#[async_trait]
impl RoleReferenceIndex for PostgresRoleTransaction {
    async fn list_references(
        &mut self,
        role_id: RoleId,
        kind: PrincipalKind,
    ) -> AppResult<Vec<String>> {
        let ReferenceTable {
            table, name_column, ..
        } = reference_table(kind);
        let sql = format!("SELECT {name_column} FROM {table} WHERE role_id = $1 ORDER BY {name_column}");

        sqlx::query_scalar::<_, String>(&sql)
            .bind(role_id.value())
            .fetch_all(&mut *self.transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list {} references: {error}", kind.as_str()))
            })
    }

    async fn add_reference(
        &mut self,
        role_id: RoleId,
        kind: PrincipalKind,
        principal: &PrincipalRecord,
    ) -> AppResult<()> {
        let ReferenceTable {
            table,
            id_column,
            name_column,
        } = reference_table(kind);
        let sql = format!(
            "INSERT INTO {table} (role_id, {id_column}, {name_column}) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING"
        );

        sqlx::query(&sql)
            .bind(role_id.value())
            .bind(principal.id)
            .bind(principal.name.as_str())
            .execute(&mut *self.transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to add {} reference: {error}", kind.as_str()))
            })?;

        Ok(())
    }

    async fn remove_reference(
        &mut self,
        role_id: RoleId,
        kind: PrincipalKind,
        principal_name: &str,
    ) -> AppResult<()> {
        let ReferenceTable {
            table, name_column, ..
        } = reference_table(kind);
        let sql = format!("DELETE FROM {table} WHERE role_id = $1 AND {name_column} = $2");

        sqlx::query(&sql)
            .bind(role_id.value())
            .bind(principal_name)
            .execute(&mut *self.transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to remove {} reference: {error}",
                    kind.as_str()
                ))
            })?;

        Ok(())
    }

    async fn remove_all_references(&mut self, role_id: RoleId) -> AppResult<()> {
        for kind in PrincipalKind::all().iter().copied() {
            let table = reference_table(kind).table;
            let sql = format!("DELETE FROM {table} WHERE role_id = $1");

            sqlx::query(&sql)
                .bind(role_id.value())
                .execute(&mut *self.transaction)
                .await
                .map_err(|error| {
                    AppError::Internal(format!(
                        "failed to clean up {} references: {error}",
                        kind.as_str()
                    ))
                })?;
        }

        Ok(())
    }

    async fn find_role_ids_for_principal(
        &mut self,
        kind: PrincipalKind,
        principal_name: &str,
    ) -> AppResult<Vec<RoleId>> {
        let ReferenceTable {
            table, name_column, ..
        } = reference_table(kind);
        let sql = format!(
            "SELECT DISTINCT role_id FROM {table} WHERE {name_column} = $1 ORDER BY role_id"
        );

        let role_ids = sqlx::query_scalar::<_, i64>(&sql)
            .bind(principal_name)
            .fetch_all(&mut *self.transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to find roles for {}: {error}",
                    kind.as_str()
                ))
            })?;

        Ok(role_ids.into_iter().map(RoleId::new).collect())
    }
}

#[async_trait]
impl RoleDependents for PostgresRoleTransaction {
    async fn count_policy_refs_by_role_name(&mut self, role_name: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM policy_role_refs
            WHERE role_name = $1
            "#,
        )
        .bind(role_name)
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count policy references: {error}")))
    }

    async fn count_role_refs_by_role_name(&mut self, role_name: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT role_id)
            FROM role_ref_roles
            WHERE sub_role_name = $1
            "#,
        )
        .bind(role_name)
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count role references: {error}")))
    }

    async fn count_zone_refs_by_role_name(&mut self, role_name: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM security_zone_role_refs
            WHERE role_name = $1
            "#,
        )
        .bind(role_name)
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count zone references: {error}")))
    }

    async fn remove_role_from_audit_filters(&mut self, role_name: &str) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM service_audit_filter_roles
            WHERE role_name = $1
            "#,
        )
        .bind(role_name)
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to remove role from audit filters: {error}"))
        })?;

        Ok(result.rows_affected())
    }

    async fn remove_role_from_grant_mappings(&mut self, role_name: &str) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM external_grant_principals
            WHERE role_name = $1
            "#,
        )
        .bind(role_name)
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to remove role from grant mappings: {error}"))
        })?;

        Ok(result.rows_affected())
    }
}
