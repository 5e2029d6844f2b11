use std::sync::Arc;

use async_trait::async_trait;
use warden_core::AppResult;

use super::audit::RoleAuditSink;
use super::directories::{PrincipalDirectory, ServiceDirectory};
use super::records::RoleRecordStore;
use super::references::{RoleDependents, RoleReferenceIndex};

/// Deferred side effect executed after a unit of work commits.
#[async_trait]
pub trait CommitAction: Send + Sync {
    /// Runs the action. Failures are handled by the action itself.
    async fn run(&self);
}

/// Ordered list of actions waiting for a successful commit.
#[derive(Default)]
pub struct CommitHooks {
    actions: Vec<Arc<dyn CommitAction>>,
}

impl CommitHooks {
    /// Creates an empty hook list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one action.
    pub fn register(&mut self, action: Arc<dyn CommitAction>) {
        self.actions.push(action);
    }

    /// Runs every registered action in registration order.
    ///
    /// Call only after the owning unit of work committed durably.
    pub async fn run_all(self) {
        for action in self.actions {
            action.run().await;
        }
    }
}

/// One unit of work over the role store.
///
/// Dropping a transaction without calling [`RoleTransaction::commit`] discards
/// every write and every registered commit action.
#[async_trait]
pub trait RoleTransaction:
    RoleRecordStore
    + RoleReferenceIndex
    + RoleDependents
    + PrincipalDirectory
    + ServiceDirectory
    + RoleAuditSink
    + Send
{
    /// Registers an action that runs only after this transaction commits.
    fn run_on_commit(&mut self, action: Arc<dyn CommitAction>);

    /// Commits all writes, then runs the registered commit actions.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discards all writes and registered commit actions.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Entry point for opening role store transactions.
#[async_trait]
pub trait RoleTransactionManager: Send + Sync {
    /// Opens a new transaction.
    async fn begin(&self) -> AppResult<Box<dyn RoleTransaction>>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::{CommitAction, CommitHooks};

    struct CountingAction {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl CommitAction for CountingAction {
        async fn run(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn run_all_executes_each_registration() {
        let action = Arc::new(CountingAction {
            runs: AtomicUsize::new(0),
        });
        let mut hooks = CommitHooks::new();
        hooks.register(action.clone());
        hooks.register(action.clone());

        hooks.run_all().await;

        assert_eq!(action.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_hooks_never_run() {
        let action = Arc::new(CountingAction {
            runs: AtomicUsize::new(0),
        });
        let mut hooks = CommitHooks::new();
        hooks.register(action.clone());
        drop(hooks);

        assert_eq!(action.runs.load(Ordering::SeqCst), 0);
    }
}
