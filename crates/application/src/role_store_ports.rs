mod audit;
mod directories;
mod records;
mod references;
mod transaction;
mod versions;

pub use audit::{RoleAuditRecord, RoleAuditSink};
pub use directories::{
    PrincipalDirectory, PrincipalRecord, ServiceDirectory, ServiceRecord, ServiceRef,
};
pub use records::RoleRecordStore;
pub use references::{RoleDependents, RoleReferenceIndex};
pub use transaction::{CommitAction, CommitHooks, RoleTransaction, RoleTransactionManager};
pub use versions::{GlobalStateStore, ROLE_STATE_NAME};
