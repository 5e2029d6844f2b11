//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod audit;
mod role;

pub use audit::AuditAction;
pub use role::{
    MemberGrant, PrincipalKind, Role, RoleId, RoleInput, RoleMember, RoleOptions,
};
