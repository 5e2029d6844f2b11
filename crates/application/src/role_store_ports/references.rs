use async_trait::async_trait;
use warden_core::AppResult;
use warden_domain::{PrincipalKind, RoleId};

use super::directories::PrincipalRecord;

/// Reverse-index rows mapping a role to the principals it lists.
///
/// Rows are derived from the role's member list and never edited by callers.
#[async_trait]
pub trait RoleReferenceIndex: Send {
    /// Lists principal names indexed for a role and member kind.
    async fn list_references(
        &mut self,
        role_id: RoleId,
        kind: PrincipalKind,
    ) -> AppResult<Vec<String>>;

    /// Inserts one reverse-index row.
    async fn add_reference(
        &mut self,
        role_id: RoleId,
        kind: PrincipalKind,
        principal: &PrincipalRecord,
    ) -> AppResult<()>;

    /// Removes one reverse-index row.
    async fn remove_reference(
        &mut self,
        role_id: RoleId,
        kind: PrincipalKind,
        principal_name: &str,
    ) -> AppResult<()>;

    /// Removes every reverse-index row owned by a role.
    async fn remove_all_references(&mut self, role_id: RoleId) -> AppResult<()>;

    /// Lists roles whose reverse index contains the principal.
    async fn find_role_ids_for_principal(
        &mut self,
        kind: PrincipalKind,
        principal_name: &str,
    ) -> AppResult<Vec<RoleId>>;
}

/// Read and cleanup queries against entities that depend on a role by name.
#[async_trait]
pub trait RoleDependents: Send {
    /// Counts policies referencing the role name.
    async fn count_policy_refs_by_role_name(&mut self, role_name: &str) -> AppResult<i64>;

    /// Counts other roles listing the role name as a member.
    async fn count_role_refs_by_role_name(&mut self, role_name: &str) -> AppResult<i64>;

    /// Counts security zones listing the role name as administrator or auditor.
    async fn count_zone_refs_by_role_name(&mut self, role_name: &str) -> AppResult<i64>;

    /// Removes the role name from service audit filter configuration.
    async fn remove_role_from_audit_filters(&mut self, role_name: &str) -> AppResult<u64>;

    /// Removes the role name from external grant mappings.
    async fn remove_role_from_grant_mappings(&mut self, role_name: &str) -> AppResult<u64>;
}
