use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::dto::{RoleDownloadQuery, RoleDownloadResponse, RoleVersionResponse};

use super::*;

/// Serves the role snapshot for a service.
///
/// Answers `304 Not Modified` when nothing has been committed yet or when the
/// agent already holds the current version.
pub async fn download_roles_handler(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
    Query(query): Query<RoleDownloadQuery>,
) -> ApiResult<Response> {
    let snapshot = state
        .role_store_service
        .get_roles_download(service_name.as_str(), query.last_known_role_version)
        .await?;

    let Some(snapshot) = snapshot else {
        debug!(service = %service_name, "no role version committed yet");
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    };

    if query.last_known_role_version == Some(snapshot.role_version) {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    Ok(Json(RoleDownloadResponse::from(snapshot.as_ref())).into_response())
}

pub async fn role_version_handler(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> ApiResult<Json<RoleVersionResponse>> {
    let role_version = state
        .role_store_service
        .get_role_version(service_name.as_str())
        .await?;

    Ok(Json(RoleVersionResponse {
        service_name,
        role_version,
    }))
}
