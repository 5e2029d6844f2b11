use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};
use warden_core::{AppError, AppResult};

use crate::role_store_ports::{CommitAction, GlobalStateStore, ROLE_STATE_NAME, RoleTransaction};

/// Schedules and reads the role version counters.
#[derive(Clone)]
pub struct RoleVersionNotifier {
    global_state: Arc<dyn GlobalStateStore>,
    service_scoped: bool,
}

impl RoleVersionNotifier {
    /// Creates a notifier over the durable global state store.
    #[must_use]
    pub fn new(global_state: Arc<dyn GlobalStateStore>, service_scoped: bool) -> Self {
        Self {
            global_state,
            service_scoped,
        }
    }

    /// Registers one version bump on the transaction's commit.
    ///
    /// Call once per top-level mutation, not once per touched row.
    pub fn schedule_version_bump<T>(&self, transaction: &mut T)
    where
        T: RoleTransaction + ?Sized,
    {
        transaction.run_on_commit(Arc::new(RoleVersionUpdater {
            global_state: self.global_state.clone(),
            state_name: ROLE_STATE_NAME,
            service_scoped: self.service_scoped,
        }));
    }

    /// Returns the latest committed role version visible to the service.
    pub async fn current_version(&self, service_name: &str) -> AppResult<Option<i64>> {
        if self.service_scoped {
            self.global_state.service_role_version(service_name).await
        } else {
            self.global_state.app_data_version(ROLE_STATE_NAME).await
        }
    }
}

struct RoleVersionUpdater {
    global_state: Arc<dyn GlobalStateStore>,
    state_name: &'static str,
    service_scoped: bool,
}

impl RoleVersionUpdater {
    async fn bump(&self) -> AppResult<i64> {
        let version = self.global_state.on_app_data_change(self.state_name).await?;
        if self.service_scoped {
            self.global_state.on_service_role_change().await?;
        }

        Ok(version)
    }
}

#[async_trait]
impl CommitAction for RoleVersionUpdater {
    async fn run(&self) {
        match self.bump().await {
            Ok(version) => debug!(state = self.state_name, version, "advanced global state"),
            Err(source) => {
                let error = AppError::VersionBumpFailed(format!(
                    "cannot update global state version for state '{}': {source}",
                    self.state_name
                ));
                error!(%error, "role changes stay invisible to pollers until the next mutation");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use warden_core::{AppError, AppResult};

    use crate::role_store_ports::{CommitHooks, GlobalStateStore, ROLE_STATE_NAME};

    use super::{RoleVersionNotifier, RoleVersionUpdater};

    #[derive(Default)]
    struct FakeGlobalState {
        versions: Mutex<HashMap<String, i64>>,
        service_versions: Mutex<HashMap<String, i64>>,
        fail_increments: bool,
    }

    #[async_trait]
    impl GlobalStateStore for FakeGlobalState {
        async fn app_data_version(&self, state_name: &str) -> AppResult<Option<i64>> {
            Ok(self.versions.lock().await.get(state_name).copied())
        }

        async fn on_app_data_change(&self, state_name: &str) -> AppResult<i64> {
            if self.fail_increments {
                return Err(AppError::Internal("global state row is locked".to_owned()));
            }

            let mut versions = self.versions.lock().await;
            let version = versions.entry(state_name.to_owned()).or_insert(0);
            *version += 1;
            Ok(*version)
        }

        async fn service_role_version(&self, service_name: &str) -> AppResult<Option<i64>> {
            Ok(self.service_versions.lock().await.get(service_name).copied())
        }

        async fn on_service_role_change(&self) -> AppResult<()> {
            for version in self.service_versions.lock().await.values_mut() {
                *version += 1;
            }
            Ok(())
        }
    }

    fn updater(global_state: Arc<FakeGlobalState>, service_scoped: bool) -> RoleVersionUpdater {
        RoleVersionUpdater {
            global_state,
            state_name: ROLE_STATE_NAME,
            service_scoped,
        }
    }

    #[tokio::test]
    async fn counter_starts_absent_and_initializes_at_one() {
        let global_state = Arc::new(FakeGlobalState::default());
        let notifier = RoleVersionNotifier::new(global_state.clone(), false);
        assert_eq!(notifier.current_version("solr1").await.ok().flatten(), None);

        let mut hooks = CommitHooks::new();
        hooks.register(Arc::new(updater(global_state, false)));
        hooks.run_all().await;

        assert_eq!(notifier.current_version("solr1").await.ok().flatten(), Some(1));
    }

    #[tokio::test]
    async fn failed_bump_is_swallowed() {
        let global_state = Arc::new(FakeGlobalState {
            fail_increments: true,
            ..FakeGlobalState::default()
        });

        let mut hooks = CommitHooks::new();
        hooks.register(Arc::new(updater(global_state.clone(), false)));
        hooks.run_all().await;

        assert_eq!(
            global_state
                .app_data_version(ROLE_STATE_NAME)
                .await
                .ok()
                .flatten(),
            None
        );
    }

    #[tokio::test]
    async fn service_scoped_mode_reads_service_versions() {
        let global_state = Arc::new(FakeGlobalState::default());
        global_state
            .service_versions
            .lock()
            .await
            .insert("solr1".to_owned(), 4);
        let notifier = RoleVersionNotifier::new(global_state.clone(), true);

        let mut hooks = CommitHooks::new();
        hooks.register(Arc::new(updater(global_state, true)));
        hooks.run_all().await;

        assert_eq!(notifier.current_version("solr1").await.ok().flatten(), Some(5));
        assert_eq!(notifier.current_version("hive1").await.ok().flatten(), None);
    }
}
