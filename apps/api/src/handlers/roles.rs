use warden_application::{RoleSearchFilter, RoleStoreService, ServiceRef};
use warden_core::AppError;
use warden_domain::RoleId;

use super::*;

pub async fn search_roles_handler(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    Query(query): Query<RoleSearchQuery>,
) -> ApiResult<Json<RoleListResponse>> {
    let filter = RoleSearchFilter::try_from(query)?;
    let roles = state
        .role_store_service
        .get_roles_for_principal(&session, &filter)
        .await?;

    Ok(Json(RoleListResponse::from(roles)))
}

pub async fn list_role_names_handler(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.role_store_service.list_role_names(&session).await?))
}

pub async fn get_role_handler(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    Path(role_id): Path<i64>,
) -> ApiResult<Json<RoleResponse>> {
    RoleStoreService::require_role_reader(&session)?;

    let role = state
        .role_store_service
        .get_role(RoleId::new(role_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("role with id {role_id} does not exist")))?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn get_role_by_name_handler(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    Path(role_name): Path<String>,
) -> ApiResult<Json<RoleResponse>> {
    RoleStoreService::require_role_reader(&session)?;

    let role = state
        .role_store_service
        .get_role_by_name(role_name.as_str())
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    Query(query): Query<RoleMutationQuery>,
    Json(payload): Json<RoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .role_store_service
        .create_role(&session, payload.into(), query.create_missing_principals)
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    Path(role_id): Path<i64>,
    Query(query): Query<RoleMutationQuery>,
    Json(payload): Json<RoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_store_service
        .update_role(
            &session,
            RoleId::new(role_id),
            payload.into(),
            query.create_missing_principals,
        )
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    Path(role_id): Path<i64>,
) -> ApiResult<StatusCode> {
    state
        .role_store_service
        .delete_role(&session, RoleId::new(role_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_role_by_name_handler(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    Path(role_name): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .role_store_service
        .delete_role_by_name(&session, role_name.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn roles_for_user_handler(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    Path(user_name): Path<String>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_store_service
        .get_roles_for_login(&session, user_name.as_str())
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn roles_for_service_handler(
    State(state): State<AppState>,
    Extension(session): Extension<UserSession>,
    Path(service_name): Path<String>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_store_service
        .get_roles_for_service(&session, &ServiceRef::Name(service_name))
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}
