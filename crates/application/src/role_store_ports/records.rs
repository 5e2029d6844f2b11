use async_trait::async_trait;
use warden_core::AppResult;
use warden_domain::{Role, RoleId, RoleInput};

/// Persistence port for role rows inside one transaction.
#[async_trait]
pub trait RoleRecordStore: Send {
    /// Finds a role by identifier.
    async fn find_role_by_id(&mut self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Finds a role by its unique name.
    async fn find_role_by_name(&mut self, name: &str) -> AppResult<Option<Role>>;

    /// Lists every role ordered by identifier.
    async fn list_roles(&mut self) -> AppResult<Vec<Role>>;

    /// Lists every role name in ascending order.
    async fn list_role_names(&mut self) -> AppResult<Vec<String>>;

    /// Lists roles referenced by policies of one service, ordered by identifier.
    async fn list_roles_for_service(&mut self, service_id: i64) -> AppResult<Vec<Role>>;

    /// Inserts a role and returns it with generated fields populated.
    ///
    /// Fails with `DuplicateName` when the name is already taken.
    async fn insert_role(&mut self, input: &RoleInput, actor: &str) -> AppResult<Role>;

    /// Replaces the mutable content of an existing role.
    ///
    /// Fails with `NotFound` when the role is missing and `DuplicateName` when
    /// the new name is taken by another role.
    async fn update_role(
        &mut self,
        role_id: RoleId,
        input: &RoleInput,
        actor: &str,
    ) -> AppResult<Role>;

    /// Deletes a role row.
    async fn delete_role(&mut self, role_id: RoleId) -> AppResult<()>;

    /// Increments the policy version field of a role.
    async fn bump_policy_version(&mut self, role_id: RoleId) -> AppResult<()>;

    /// Increments the role version field of a role.
    async fn bump_role_version(&mut self, role_id: RoleId) -> AppResult<()>;
}
