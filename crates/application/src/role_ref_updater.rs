//! Maintenance of the role reverse index.
//!
//! The member list on the role row is authoritative. Reverse-index rows are
//! rebuilt from it on every create and update and removed on delete.

use std::collections::BTreeSet;

use tracing::debug;
use warden_core::{AppError, AppResult};
use warden_domain::{PrincipalKind, Role, RoleId};

use crate::role_store_ports::{
    PrincipalDirectory, PrincipalRecord, RoleRecordStore, RoleReferenceIndex,
};

/// Diffs the role's members against stored rows and applies the difference.
///
/// New user and group members are provisioned as placeholders when
/// `create_missing_principals` is set; otherwise an unknown member fails with
/// `UnknownPrincipal`. Nested roles must always exist.
pub async fn rebuild_reference_rows<T>(
    store: &mut T,
    role: &Role,
    create_missing_principals: bool,
) -> AppResult<()>
where
    T: RoleReferenceIndex + PrincipalDirectory + RoleRecordStore + ?Sized,
{
    for kind in PrincipalKind::all().iter().copied() {
        let desired = role.member_names(kind);
        let existing = store
            .list_references(role.id, kind)
            .await?
            .into_iter()
            .collect::<BTreeSet<_>>();

        for stale in existing
            .iter()
            .filter(|name| !desired.contains(name.as_str()))
        {
            store.remove_reference(role.id, kind, stale).await?;
        }

        for added in desired
            .iter()
            .filter(|name| !existing.contains(**name))
        {
            let principal =
                resolve_principal(store, role, kind, added, create_missing_principals).await?;
            store.add_reference(role.id, kind, &principal).await?;
        }
    }

    debug!(role = %role.name, "rebuilt role reference rows");
    Ok(())
}

/// Removes every reverse-index row of a role that is being deleted.
pub async fn cleanup_ref_tables<T>(store: &mut T, role_id: RoleId) -> AppResult<()>
where
    T: RoleReferenceIndex + ?Sized,
{
    store.remove_all_references(role_id).await
}

/// Lists roles that name the user directly.
pub async fn find_role_ids_for_user<T>(store: &mut T, user_name: &str) -> AppResult<Vec<RoleId>>
where
    T: RoleReferenceIndex + ?Sized,
{
    store
        .find_role_ids_for_principal(PrincipalKind::User, user_name)
        .await
}

/// Lists roles that name the group directly.
pub async fn find_role_ids_for_group<T>(
    store: &mut T,
    group_name: &str,
) -> AppResult<Vec<RoleId>>
where
    T: RoleReferenceIndex + ?Sized,
{
    store
        .find_role_ids_for_principal(PrincipalKind::Group, group_name)
        .await
}

/// Lists roles that contain the named role, directly or through nested roles.
///
/// The named role itself is never part of the result.
pub async fn find_containing_role_ids<T>(store: &mut T, role_name: &str) -> AppResult<Vec<RoleId>>
where
    T: RoleReferenceIndex + RoleRecordStore + ?Sized,
{
    let mut seen_names = BTreeSet::from([role_name.to_owned()]);
    let mut pending = vec![role_name.to_owned()];
    let mut containing = BTreeSet::new();

    while let Some(name) = pending.pop() {
        for role_id in store
            .find_role_ids_for_principal(PrincipalKind::Role, &name)
            .await?
        {
            if !containing.insert(role_id) {
                continue;
            }
            let Some(parent) = store.find_role_by_id(role_id).await? else {
                continue;
            };
            if parent.name == role_name {
                containing.remove(&role_id);
                continue;
            }
            if seen_names.insert(parent.name.clone()) {
                pending.push(parent.name);
            }
        }
    }

    Ok(containing.into_iter().collect())
}

async fn resolve_principal<T>(
    store: &mut T,
    role: &Role,
    kind: PrincipalKind,
    name: &str,
    create_missing_principals: bool,
) -> AppResult<PrincipalRecord>
where
    T: PrincipalDirectory + RoleRecordStore + ?Sized,
{
    let found = match kind {
        PrincipalKind::User => store.find_user(name).await?,
        PrincipalKind::Group => store.find_group(name).await?,
        PrincipalKind::Role => store.find_role_by_name(name).await?.map(|nested| PrincipalRecord {
            id: nested.id.value(),
            name: nested.name,
        }),
    };

    if let Some(principal) = found {
        return Ok(principal);
    }

    match kind {
        PrincipalKind::User if create_missing_principals => store.provision_user(name).await,
        PrincipalKind::Group if create_missing_principals => store.provision_group(name).await,
        _ => Err(AppError::UnknownPrincipal(format!(
            "{} '{name}' referenced by role '{}' does not exist",
            kind.as_str(),
            role.name
        ))),
    }
}
