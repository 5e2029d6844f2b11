use std::sync::Arc;

use warden_application::{
    GlobalStateStore, ROLE_STATE_NAME, RoleSearchFilter, RoleStoreConfig, RoleStoreService,
    RoleTransactionManager, ServiceRef,
};
use warden_core::{AppError, UserSession};
use warden_domain::{AuditAction, PrincipalKind, Role, RoleInput, RoleMember};

use super::InMemoryRoleStore;

fn service(store: &InMemoryRoleStore, config: RoleStoreConfig) -> RoleStoreService {
    let store = Arc::new(store.clone());
    RoleStoreService::new(store.clone(), store, config)
}

fn admin() -> UserSession {
    UserSession::admin("admin")
}

async fn global_version(store: &InMemoryRoleStore) -> Option<i64> {
    store
        .app_data_version(ROLE_STATE_NAME)
        .await
        .ok()
        .flatten()
}

async fn create(service: &RoleStoreService, input: RoleInput) -> Role {
    match service.create_role(&admin(), input, false).await {
        Ok(role) => role,
        Err(error) => panic!("failed to create role: {error}"),
    }
}

#[tokio::test]
async fn create_then_get_by_name_returns_same_members() {
    let store = InMemoryRoleStore::new();
    store.add_user("alice").await;
    store.add_group("etl-team").await;
    let roles = service(&store, RoleStoreConfig::default());

    let created = create(
        &roles,
        RoleInput::new("etl-writers")
            .with_member(RoleMember::user("alice", false))
            .with_member(RoleMember::group("etl-team", true)),
    )
    .await;

    let fetched = roles.get_role_by_name("etl-writers").await;
    assert!(fetched.is_ok());
    let fetched = fetched.unwrap_or_else(|_| unreachable!());
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.members, created.members);
    assert_eq!(fetched.created_by, "admin");

    let duplicate = roles
        .create_role(&admin(), RoleInput::new("etl-writers"), false)
        .await;
    assert!(matches!(duplicate, Err(AppError::DuplicateName(_))));
}

#[tokio::test]
async fn get_by_id_is_silent_while_get_by_name_fails() {
    let store = InMemoryRoleStore::new();
    let roles = service(&store, RoleStoreConfig::default());

    let by_id = roles.get_role(warden_domain::RoleId::new(42)).await;
    assert!(matches!(by_id, Ok(None)));

    let by_name = roles.get_role_by_name("missing").await;
    assert!(matches!(by_name, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn delete_referenced_by_policy_changes_nothing() {
    let store = InMemoryRoleStore::new();
    store.add_user("alice").await;
    let hive = store.add_service("hive1", "hive").await;
    let roles = service(&store, RoleStoreConfig::default());

    let role = create(
        &roles,
        RoleInput::new("analysts").with_member(RoleMember::user("alice", false)),
    )
    .await;
    store.add_policy_reference(hive.id, "analysts").await;
    let version_before = global_version(&store).await;

    let deleted = roles.delete_role(&admin(), role.id).await;

    assert!(matches!(deleted, Err(AppError::ReferencedInPolicy(_))));
    assert!(matches!(roles.role_exists(role.id).await, Ok(true)));
    assert_eq!(
        store.reference_names(role.id, PrincipalKind::User).await,
        vec!["alice".to_owned()]
    );
    assert_eq!(global_version(&store).await, version_before);
}

#[tokio::test]
async fn rename_is_guarded_by_policy_references() {
    let store = InMemoryRoleStore::new();
    let hive = store.add_service("hive1", "hive").await;
    let roles = service(&store, RoleStoreConfig::default());

    let free = create(&roles, RoleInput::new("free")).await;
    let renamed = roles
        .update_role(&admin(), free.id, RoleInput::new("free-renamed"), false)
        .await;
    assert!(matches!(&renamed, Ok(role) if role.name == "free-renamed"));

    let pinned = create(&roles, RoleInput::new("pinned")).await;
    store.add_policy_reference(hive.id, "pinned").await;
    let blocked = roles
        .update_role(&admin(), pinned.id, RoleInput::new("pinned-renamed"), false)
        .await;
    assert!(matches!(blocked, Err(AppError::ReferencedInPolicy(_))));

    let stored = roles.get_role(pinned.id).await.ok().flatten();
    assert_eq!(stored.map(|role| role.name), Some("pinned".to_owned()));
}

#[tokio::test]
async fn nested_role_reference_blocks_delete() {
    let store = InMemoryRoleStore::new();
    let roles = service(&store, RoleStoreConfig::default());

    let inner = create(&roles, RoleInput::new("inner")).await;
    create(
        &roles,
        RoleInput::new("outer").with_member(RoleMember::role("inner", false)),
    )
    .await;

    let deleted = roles.delete_role_by_name(&admin(), "inner").await;
    assert!(matches!(deleted, Err(AppError::ReferencedInRole(_))));

    let updated = roles
        .update_role(
            &admin(),
            inner.id,
            RoleInput {
                description: "still referenced".to_owned(),
                ..RoleInput::new("inner")
            },
            false,
        )
        .await;
    assert!(matches!(&updated, Ok(role) if role.policy_version == inner.policy_version + 1));
}

#[tokio::test]
async fn version_advances_once_per_committed_mutation() {
    let store = InMemoryRoleStore::new();
    let roles = service(&store, RoleStoreConfig::default());
    assert_eq!(global_version(&store).await, None);

    let role = create(&roles, RoleInput::new("ops")).await;
    assert_eq!(global_version(&store).await, Some(1));

    let updated = roles
        .update_role(&admin(), role.id, RoleInput::new("ops"), false)
        .await;
    assert!(updated.is_ok());
    assert_eq!(global_version(&store).await, Some(2));

    let failed = roles
        .create_role(
            &admin(),
            RoleInput::new("ghosts").with_member(RoleMember::user("nobody", false)),
            false,
        )
        .await;
    assert!(matches!(failed, Err(AppError::UnknownPrincipal(_))));
    assert_eq!(global_version(&store).await, Some(2));
    assert!(matches!(roles.role_exists_by_name("ghosts").await, Ok(false)));

    let deleted = roles.delete_role(&admin(), role.id).await;
    assert!(deleted.is_ok());
    assert_eq!(global_version(&store).await, Some(3));
}

#[tokio::test]
async fn missing_principals_are_provisioned_on_request() {
    let store = InMemoryRoleStore::new();
    let roles = service(&store, RoleStoreConfig::default());

    let created = roles
        .create_role(
            &admin(),
            RoleInput::new("contractors").with_member(RoleMember::user("dana", false)),
            true,
        )
        .await;

    assert!(created.is_ok());
    assert!(store.has_user("dana").await);

    let nested = roles
        .create_role(
            &admin(),
            RoleInput::new("wrapper").with_member(RoleMember::role("missing", false)),
            true,
        )
        .await;
    assert!(matches!(nested, Err(AppError::UnknownPrincipal(_))));
}

#[tokio::test]
async fn mutations_require_admin_session() {
    let store = InMemoryRoleStore::new();
    let roles = service(&store, RoleStoreConfig::default());

    let created = roles
        .create_role(&UserSession::user("alice"), RoleInput::new("ops"), false)
        .await;

    assert!(matches!(created, Err(AppError::Forbidden(_))));
    assert_eq!(global_version(&store).await, None);
}

#[tokio::test]
async fn delete_cleans_dependent_configuration() {
    let store = InMemoryRoleStore::new();
    store.add_group("auditors").await;
    let roles = service(&store, RoleStoreConfig::default());

    let role = create(
        &roles,
        RoleInput::new("readers").with_member(RoleMember::group("auditors", false)),
    )
    .await;
    store.add_audit_filter_role("hive1", "readers").await;
    store.add_grant_mapping("cloud-readers", "readers").await;

    let deleted = roles.delete_role(&admin(), role.id).await;

    assert!(deleted.is_ok());
    assert_eq!(store.audit_filter_count("readers").await, 0);
    assert_eq!(store.grant_mapping_count("readers").await, 0);
    assert!(
        store
            .reference_names(role.id, PrincipalKind::Group)
            .await
            .is_empty()
    );

    let actions = store
        .audit_log()
        .await
        .iter()
        .map(|record| record.action)
        .collect::<Vec<_>>();
    assert_eq!(actions, vec![AuditAction::RoleCreated, AuditAction::RoleDeleted]);
}

#[tokio::test]
async fn download_reuses_snapshot_until_next_commit() {
    let store = InMemoryRoleStore::new();
    store.add_service("hive1", "hive").await;
    let roles = service(&store, RoleStoreConfig::default());

    let none_yet = roles.get_roles_download("hive1", None).await;
    assert!(matches!(none_yet, Ok(None)));

    create(&roles, RoleInput::new("first")).await;
    let first = roles.get_roles_download("hive1", None).await.ok().flatten();
    let second = roles.get_roles_download("hive1", Some(1)).await.ok().flatten();
    match (&first, &second) {
        (Some(first), Some(second)) => {
            assert!(Arc::ptr_eq(first, second));
            assert_eq!(first.role_version, 1);
        }
        other => panic!("expected two snapshots, got {other:?}"),
    }

    create(&roles, RoleInput::new("second")).await;
    let third = roles.get_roles_download("hive1", Some(1)).await.ok().flatten();
    assert_eq!(third.map(|snapshot| snapshot.role_version), Some(2));
}

#[tokio::test]
async fn principal_view_for_plain_users() {
    let store = InMemoryRoleStore::new();
    store.add_user("alice").await;
    store.add_user("bob").await;
    store.add_group("etl-team").await;
    store.add_user_to_group("alice", "etl-team").await;
    let roles = service(&store, RoleStoreConfig::default());

    create(
        &roles,
        RoleInput::new("etl-writers")
            .with_member(RoleMember::user("alice", false))
            .with_member(RoleMember::group("etl-team", false)),
    )
    .await;

    let filter = RoleSearchFilter::default();
    let alice = roles
        .get_roles_for_principal(&UserSession::user("alice"), &filter)
        .await;
    let bob = roles
        .get_roles_for_principal(&UserSession::user("bob"), &filter)
        .await;
    let carol = roles
        .get_roles_for_principal(&UserSession::user("carol"), &filter)
        .await;

    assert!(matches!(&alice, Ok(list) if list.roles.len() == 1 && list.roles[0].name == "etl-writers"));
    assert!(matches!(&bob, Ok(list) if list.roles.is_empty()));
    assert!(matches!(&carol, Ok(list) if list.roles.is_empty()));
}

#[tokio::test]
async fn roles_for_login_include_group_grants() {
    let store = InMemoryRoleStore::new();
    store.add_user("bob").await;
    store.add_group("ops").await;
    store.add_user_to_group("bob", "ops").await;
    let roles = service(&store, RoleStoreConfig::default());

    create(
        &roles,
        RoleInput::new("on-call").with_member(RoleMember::group("ops", false)),
    )
    .await;
    create(
        &roles,
        RoleInput::new("bob-only").with_member(RoleMember::user("bob", false)),
    )
    .await;

    let names = roles
        .get_roles_for_login(&admin(), "bob")
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|role| role.name)
        .collect::<Vec<_>>();

    assert_eq!(names, vec!["on-call".to_owned(), "bob-only".to_owned()]);
}

#[tokio::test]
async fn allow_listed_service_type_receives_every_role() {
    let store = InMemoryRoleStore::new();
    store.add_service("solr1", "solr").await;
    let hive = store.add_service("hive1", "hive").await;
    let roles = service(&store, RoleStoreConfig::default());

    create(&roles, RoleInput::new("hive-readers")).await;
    create(&roles, RoleInput::new("unassociated")).await;
    store.add_policy_reference(hive.id, "hive-readers").await;

    let solr = roles
        .get_roles_for_service(&admin(), &ServiceRef::Name("solr1".to_owned()))
        .await
        .unwrap_or_default();
    let hive_roles = roles
        .get_roles_for_service(&admin(), &ServiceRef::Id(hive.id))
        .await
        .unwrap_or_default();
    let unknown = roles
        .get_roles_for_service(&admin(), &ServiceRef::Name("kafka9".to_owned()))
        .await;

    assert_eq!(solr.len(), 2);
    assert_eq!(hive_roles.len(), 1);
    assert_eq!(hive_roles[0].name, "hive-readers");
    assert!(matches!(unknown, Ok(list) if list.is_empty()));
}

#[tokio::test]
async fn search_paginates_matching_roles() {
    let store = InMemoryRoleStore::new();
    let roles = service(&store, RoleStoreConfig::default());
    for index in 1..=5 {
        create(&roles, RoleInput::new(format!("team-{index}"))).await;
    }

    let page = roles
        .search_roles(&RoleSearchFilter {
            role_name_partial: Some("team".to_owned()),
            start_index: 3,
            page_size: 10,
            ..RoleSearchFilter::default()
        })
        .await;

    assert!(matches!(&page, Ok(list) if list.total_count == 5 && list.result_size == 2));
}

#[tokio::test]
async fn service_scoped_versions_track_each_service() {
    let store = InMemoryRoleStore::new();
    store.add_service("hive1", "hive").await;
    store.add_service("solr1", "solr").await;
    let roles = service(&store, RoleStoreConfig::new("solr", true));

    assert!(matches!(roles.get_role_version("hive1").await, Ok(Some(1))));

    let role = create(&roles, RoleInput::new("scoped")).await;
    assert!(matches!(roles.get_role_version("hive1").await, Ok(Some(2))));
    assert!(matches!(roles.get_role_version("solr1").await, Ok(Some(2))));
    assert!(matches!(roles.get_role_version("kafka9").await, Ok(None)));

    let updated = roles
        .update_role(&admin(), role.id, RoleInput::new("scoped"), false)
        .await;
    assert!(matches!(&updated, Ok(role) if role.role_version == 2));
    assert!(matches!(roles.get_role_version("hive1").await, Ok(Some(3))));
}

#[tokio::test]
async fn update_marks_containing_roles_stale() {
    let store = InMemoryRoleStore::new();
    let roles = service(&store, RoleStoreConfig::new("solr", true));

    let inner = create(&roles, RoleInput::new("inner")).await;
    let middle = create(
        &roles,
        RoleInput::new("middle").with_member(RoleMember::role("inner", false)),
    )
    .await;
    let outer = create(
        &roles,
        RoleInput::new("outer").with_member(RoleMember::role("middle", false)),
    )
    .await;
    let unrelated = create(&roles, RoleInput::new("unrelated")).await;

    let mut changed = RoleInput::new("inner");
    changed.description = "reworded".to_owned();
    let updated = roles.update_role(&admin(), inner.id, changed, false).await;
    assert!(matches!(&updated, Ok(role) if role.policy_version == 2 && role.role_version == 2));

    for role_id in [middle.id, outer.id] {
        let stored = roles.get_role(role_id).await.ok().flatten();
        assert_eq!(
            stored.map(|role| (role.policy_version, role.role_version)),
            Some((2, 2))
        );
    }

    let untouched = roles.get_role(unrelated.id).await.ok().flatten();
    assert_eq!(
        untouched.map(|role| (role.policy_version, role.role_version)),
        Some((1, 1))
    );
}

#[tokio::test]
async fn plain_user_cannot_list_every_role() {
    let store = InMemoryRoleStore::new();
    store.add_user("alice").await;
    store.add_service("hive1", "hive").await;
    let roles = service(&store, RoleStoreConfig::default());

    create(
        &roles,
        RoleInput::new("alice-team").with_member(RoleMember::user("alice", false)),
    )
    .await;
    create(&roles, RoleInput::new("others")).await;
    let alice = UserSession::user("alice");

    let names = roles.list_role_names(&alice).await;
    let for_login = roles.get_roles_for_login(&alice, "bob").await;
    let for_service = roles
        .get_roles_for_service(&alice, &ServiceRef::Name("hive1".to_owned()))
        .await;
    assert!(matches!(names, Err(AppError::Forbidden(_))));
    assert!(matches!(for_login, Err(AppError::Forbidden(_))));
    assert!(matches!(for_service, Err(AppError::Forbidden(_))));

    let visible = roles
        .get_roles_for_principal(&alice, &RoleSearchFilter::default())
        .await;
    assert!(matches!(&visible, Ok(list) if list.total_count == 1 && list.roles[0].name == "alice-team"));

    let all = roles.list_role_names(&admin()).await.unwrap_or_default();
    assert_eq!(all, vec!["alice-team".to_owned(), "others".to_owned()]);
}

#[tokio::test]
async fn store_rejects_duplicate_names_on_write() {
    let store = InMemoryRoleStore::new();
    let Ok(mut transaction) = store.begin().await else {
        panic!("failed to open in-memory transaction");
    };

    let first = transaction.insert_role(&RoleInput::new("ops"), "admin").await;
    let second = transaction.insert_role(&RoleInput::new("ops"), "admin").await;
    assert!(first.is_ok());
    assert!(matches!(second, Err(AppError::DuplicateName(_))));

    let other = transaction
        .insert_role(&RoleInput::new("dev"), "admin")
        .await;
    let Ok(other) = other else {
        panic!("failed to insert second role");
    };
    let renamed = transaction
        .update_role(other.id, &RoleInput::new("ops"), "admin")
        .await;
    assert!(matches!(renamed, Err(AppError::DuplicateName(_))));

    let kept = transaction
        .update_role(other.id, &RoleInput::new("dev"), "admin")
        .await;
    assert!(kept.is_ok());
    assert!(transaction.rollback().await.is_ok());
}
