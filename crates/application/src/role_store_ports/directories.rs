use async_trait::async_trait;
use warden_core::AppResult;

/// Directory record of a user, group or role principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalRecord {
    /// Stable principal identifier.
    pub id: i64,
    /// Principal name.
    pub name: String,
}

/// Registered service with its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Stable service identifier.
    pub id: i64,
    /// Unique service name.
    pub name: String,
    /// Declared service type name.
    pub service_type: String,
}

/// Service lookup by name or identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceRef {
    /// Lookup by unique name.
    Name(String),
    /// Lookup by identifier.
    Id(i64),
}

/// User and group directory port.
#[async_trait]
pub trait PrincipalDirectory: Send {
    /// Finds a user by name.
    async fn find_user(&mut self, name: &str) -> AppResult<Option<PrincipalRecord>>;

    /// Finds a group by name.
    async fn find_group(&mut self, name: &str) -> AppResult<Option<PrincipalRecord>>;

    /// Provisions a placeholder user and returns it.
    async fn provision_user(&mut self, name: &str) -> AppResult<PrincipalRecord>;

    /// Provisions a placeholder group and returns it.
    async fn provision_group(&mut self, name: &str) -> AppResult<PrincipalRecord>;

    /// Lists group names the user belongs to.
    async fn list_groups_for_user(&mut self, name: &str) -> AppResult<Vec<String>>;
}

/// Service directory port.
#[async_trait]
pub trait ServiceDirectory: Send {
    /// Finds a service by name.
    async fn find_service_by_name(&mut self, name: &str) -> AppResult<Option<ServiceRecord>>;

    /// Finds a service by identifier.
    async fn find_service_by_id(&mut self, service_id: i64) -> AppResult<Option<ServiceRecord>>;
}
