use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use warden_core::AppResult;
use warden_domain::{AuditAction, Role};

/// Immutable audit record for one role mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAuditRecord {
    /// Stable event identifier.
    pub event_id: Uuid,
    /// Stable audit action identifier.
    pub action: AuditAction,
    /// Login that performed the mutation.
    pub actor: String,
    /// Role state before the mutation.
    pub before: Option<Role>,
    /// Role state after the mutation.
    pub after: Option<Role>,
    /// Mutation timestamp.
    pub recorded_at: DateTime<Utc>,
}

impl RoleAuditRecord {
    /// Creates a record stamped with a fresh identifier and the current time.
    #[must_use]
    pub fn new(
        action: AuditAction,
        actor: impl Into<String>,
        before: Option<Role>,
        after: Option<Role>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            action,
            actor: actor.into(),
            before,
            after,
            recorded_at: Utc::now(),
        }
    }

    /// Returns the role the record is about.
    #[must_use]
    pub fn role(&self) -> Option<&Role> {
        self.after.as_ref().or(self.before.as_ref())
    }
}

/// Append-only audit port, written inside the mutating transaction.
#[async_trait]
pub trait RoleAuditSink: Send {
    /// Appends one audit record.
    async fn append_role_audit(&mut self, record: RoleAuditRecord) -> AppResult<()>;
}
