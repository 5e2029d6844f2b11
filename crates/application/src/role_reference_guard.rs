//! Rename and delete eligibility checks.
//!
//! A role may only be renamed or deleted while no policy, other role or
//! security zone refers to it by name. Checks run in the fixed order
//! policy, role, zone and stop at the first blocking dependency.

use warden_core::{AppError, AppResult};

use crate::role_store_ports::RoleDependents;

/// Mutation guarded by the reference checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedOperation {
    /// Changing the role name.
    Rename,
    /// Removing the role.
    Delete,
}

impl GuardedOperation {
    fn verb(self) -> &'static str {
        match self {
            Self::Rename => "renamed",
            Self::Delete => "deleted",
        }
    }
}

/// Fails when any dependent still references the role name.
pub async fn ensure_role_not_referenced<T>(
    dependents: &mut T,
    role_name: &str,
    operation: GuardedOperation,
) -> AppResult<()>
where
    T: RoleDependents + ?Sized,
{
    let policy_count = dependents.count_policy_refs_by_role_name(role_name).await?;
    if policy_count > 0 {
        return Err(AppError::ReferencedInPolicy(format!(
            "role '{role_name}' can not be {} as it is referenced in {policy_count} {}",
            operation.verb(),
            plural(policy_count, "policy", "policies"),
        )));
    }

    let role_count = dependents.count_role_refs_by_role_name(role_name).await?;
    if role_count > 0 {
        return Err(AppError::ReferencedInRole(format!(
            "role '{role_name}' can not be {} as it is referenced in {role_count} other {}",
            operation.verb(),
            plural(role_count, "role", "roles"),
        )));
    }

    let zone_count = dependents.count_zone_refs_by_role_name(role_name).await?;
    if zone_count > 0 {
        return Err(AppError::ReferencedInZone(format!(
            "role '{role_name}' can not be {} as it is referenced in {zone_count} security {}",
            operation.verb(),
            plural(zone_count, "zone", "zones"),
        )));
    }

    Ok(())
}

fn plural(count: i64, singular: &'static str, plural: &'static str) -> &'static str {
    if count == 1 { singular } else { plural }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use warden_core::{AppError, AppResult};

    use crate::role_store_ports::RoleDependents;

    use super::{GuardedOperation, ensure_role_not_referenced};

    #[derive(Default)]
    struct FakeDependents {
        policies: i64,
        roles: i64,
        zones: i64,
        queries: Vec<&'static str>,
    }

    #[async_trait]
    impl RoleDependents for FakeDependents {
        async fn count_policy_refs_by_role_name(&mut self, _role_name: &str) -> AppResult<i64> {
            self.queries.push("policy");
            Ok(self.policies)
        }

        async fn count_role_refs_by_role_name(&mut self, _role_name: &str) -> AppResult<i64> {
            self.queries.push("role");
            Ok(self.roles)
        }

        async fn count_zone_refs_by_role_name(&mut self, _role_name: &str) -> AppResult<i64> {
            self.queries.push("zone");
            Ok(self.zones)
        }

        async fn remove_role_from_audit_filters(&mut self, _role_name: &str) -> AppResult<u64> {
            Ok(0)
        }

        async fn remove_role_from_grant_mappings(&mut self, _role_name: &str) -> AppResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn unreferenced_role_passes_all_checks() {
        let mut dependents = FakeDependents::default();

        let result =
            ensure_role_not_referenced(&mut dependents, "ops", GuardedOperation::Delete).await;

        assert!(result.is_ok());
        assert_eq!(dependents.queries, vec!["policy", "role", "zone"]);
    }

    #[tokio::test]
    async fn policy_reference_wins_over_later_dependencies() {
        let mut dependents = FakeDependents {
            policies: 2,
            roles: 1,
            zones: 1,
            ..FakeDependents::default()
        };

        let result =
            ensure_role_not_referenced(&mut dependents, "ops", GuardedOperation::Rename).await;

        match result {
            Err(AppError::ReferencedInPolicy(message)) => {
                assert!(message.contains("can not be renamed"));
                assert!(message.contains("2 policies"));
            }
            other => panic!("unexpected guard result: {other:?}"),
        }
        assert_eq!(dependents.queries, vec!["policy"]);
    }

    #[tokio::test]
    async fn zone_reference_is_reported_last() {
        let mut dependents = FakeDependents {
            zones: 1,
            ..FakeDependents::default()
        };

        let result =
            ensure_role_not_referenced(&mut dependents, "ops", GuardedOperation::Delete).await;

        assert!(matches!(result, Err(AppError::ReferencedInZone(_))));
    }
}
