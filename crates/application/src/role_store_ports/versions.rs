use async_trait::async_trait;
use warden_core::AppResult;

/// Global state name tracking committed role changes.
pub const ROLE_STATE_NAME: &str = "role";

/// Durable named version counters.
///
/// Accessed outside mutating transactions; increments run from commit actions.
#[async_trait]
pub trait GlobalStateStore: Send + Sync {
    /// Returns the stored counter, or `None` when the state was never changed.
    async fn app_data_version(&self, state_name: &str) -> AppResult<Option<i64>>;

    /// Increments the counter, creating it at 1 on first use.
    async fn on_app_data_change(&self, state_name: &str) -> AppResult<i64>;

    /// Returns the role version stored for one service.
    async fn service_role_version(&self, service_name: &str) -> AppResult<Option<i64>>;

    /// Increments the role version of every registered service.
    async fn on_service_role_change(&self) -> AppResult<()>;
}
