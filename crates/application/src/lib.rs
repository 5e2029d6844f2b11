//! Application services and ports.

#![forbid(unsafe_code)]

mod role_cache;
mod role_ref_updater;
mod role_reference_guard;
mod role_search;
mod role_store_ports;
mod role_store_service;
mod role_version_notifier;

pub use role_cache::{RoleCache, RoleSnapshot};
pub use role_ref_updater::{
    cleanup_ref_tables, find_containing_role_ids, find_role_ids_for_group, find_role_ids_for_user,
    rebuild_reference_rows,
};
pub use role_reference_guard::{GuardedOperation, ensure_role_not_referenced};
pub use role_search::{
    DEFAULT_PAGE_SIZE, RoleList, RoleSearchFilter, RoleSortField, SortDirection,
};
pub use role_store_ports::{
    CommitAction, CommitHooks, GlobalStateStore, PrincipalDirectory, PrincipalRecord,
    ROLE_STATE_NAME, RoleAuditRecord, RoleAuditSink, RoleDependents, RoleRecordStore,
    RoleReferenceIndex, RoleTransaction, RoleTransactionManager, ServiceDirectory, ServiceRecord,
    ServiceRef,
};
pub use role_store_service::{DEFAULT_SERVICE_TYPES_FOR_ALL_ROLES, RoleStoreConfig, RoleStoreService};
pub use role_version_notifier::RoleVersionNotifier;
