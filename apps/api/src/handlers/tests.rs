use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use warden_application::{RoleStoreConfig, RoleStoreService};
use warden_core::UserSession;
use warden_domain::RoleMember;
use warden_infrastructure::InMemoryRoleStore;

use crate::dto::{RoleDownloadQuery, RoleMutationQuery, RoleRequest, RoleSearchQuery};
use crate::state::AppState;

use super::{
    create_role_handler, delete_role_handler, download_roles_handler, list_role_names_handler,
    roles_for_service_handler, search_roles_handler,
};

fn app_state(store: &InMemoryRoleStore) -> AppState {
    let store = Arc::new(store.clone());
    AppState {
        role_store_service: RoleStoreService::new(
            store.clone(),
            store,
            RoleStoreConfig::default(),
        ),
    }
}

fn role_request(name: &str, members: Vec<RoleMember>) -> RoleRequest {
    RoleRequest {
        name: name.to_owned(),
        description: String::new(),
        members,
        options: BTreeMap::new(),
    }
}

async fn create_status(state: &AppState, session: UserSession, name: &str) -> StatusCode {
    create_role_handler(
        State(state.clone()),
        Extension(session),
        Query(RoleMutationQuery::default()),
        Json(role_request(name, Vec::new())),
    )
    .await
    .into_response()
    .status()
}

async fn download_status(state: &AppState, last_known_role_version: Option<i64>) -> StatusCode {
    download_roles_handler(
        State(state.clone()),
        Path("hive1".to_owned()),
        Query(RoleDownloadQuery {
            last_known_role_version,
        }),
    )
    .await
    .into_response()
    .status()
}

#[tokio::test]
async fn plain_user_cannot_create_roles() {
    let state = app_state(&InMemoryRoleStore::new());

    let status = create_status(&state, UserSession::user("alice"), "ops").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_role_name_is_conflict() {
    let state = app_state(&InMemoryRoleStore::new());

    let first = create_status(&state, UserSession::admin("admin"), "ops").await;
    let second = create_status(&state, UserSession::admin("admin"), "ops").await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_member_is_bad_request() {
    let state = app_state(&InMemoryRoleStore::new());

    let response = create_role_handler(
        State(state),
        Extension(UserSession::admin("admin")),
        Query(RoleMutationQuery::default()),
        Json(role_request(
            "ghosts",
            vec![RoleMember::user("nobody", false)],
        )),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn download_answers_not_modified_for_current_version() {
    let store = InMemoryRoleStore::new();
    store.add_service("hive1", "hive").await;
    let state = app_state(&store);

    assert_eq!(download_status(&state, None).await, StatusCode::NOT_MODIFIED);

    let created = create_status(&state, UserSession::admin("admin"), "ops").await;
    assert_eq!(created, StatusCode::CREATED);

    assert_eq!(download_status(&state, None).await, StatusCode::OK);
    assert_eq!(download_status(&state, Some(1)).await, StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn delete_of_policy_referenced_role_is_conflict() {
    let store = InMemoryRoleStore::new();
    let hive = store.add_service("hive1", "hive").await;
    let state = app_state(&store);

    let created = create_status(&state, UserSession::admin("admin"), "readers").await;
    assert_eq!(created, StatusCode::CREATED);
    store.add_policy_reference(hive.id, "readers").await;

    let response = delete_role_handler(
        State(state),
        Extension(UserSession::admin("admin")),
        Path(1),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_sort_field_is_bad_request() {
    let state = app_state(&InMemoryRoleStore::new());

    let response = search_roles_handler(
        State(state),
        Extension(UserSession::admin("admin")),
        Query(RoleSearchQuery {
            sort_by: Some("color".to_owned()),
            ..RoleSearchQuery::default()
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn plain_user_listing_is_limited_to_own_roles() {
    let store = InMemoryRoleStore::new();
    store.add_user("alice").await;
    store.add_service("hive1", "hive").await;
    let state = app_state(&store);

    let own = create_role_handler(
        State(state.clone()),
        Extension(UserSession::admin("admin")),
        Query(RoleMutationQuery::default()),
        Json(role_request(
            "alice-team",
            vec![RoleMember::user("alice", false)],
        )),
    )
    .await
    .into_response()
    .status();
    assert_eq!(own, StatusCode::CREATED);
    assert_eq!(
        create_status(&state, UserSession::admin("admin"), "others").await,
        StatusCode::CREATED
    );

    let as_alice = search_roles_handler(
        State(state.clone()),
        Extension(UserSession::user("alice")),
        Query(RoleSearchQuery::default()),
    )
    .await;
    assert!(matches!(&as_alice, Ok(Json(list)) if list.total_count == 1));

    let as_admin = search_roles_handler(
        State(state.clone()),
        Extension(UserSession::admin("admin")),
        Query(RoleSearchQuery::default()),
    )
    .await;
    assert!(matches!(&as_admin, Ok(Json(list)) if list.total_count == 2));

    let names = list_role_names_handler(State(state.clone()), Extension(UserSession::user("alice")))
        .await
        .into_response()
        .status();
    assert_eq!(names, StatusCode::FORBIDDEN);

    let service_roles = roles_for_service_handler(
        State(state),
        Extension(UserSession::user("alice")),
        Path("hive1".to_owned()),
    )
    .await
    .into_response()
    .status();
    assert_eq!(service_roles, StatusCode::FORBIDDEN);
}
