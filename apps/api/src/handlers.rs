use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use warden_core::UserSession;

use crate::dto::{RoleListResponse, RoleMutationQuery, RoleRequest, RoleResponse, RoleSearchQuery};
use crate::error::ApiResult;
use crate::state::AppState;

mod download;
mod health;
mod roles;

#[cfg(test)]
mod tests;

pub use download::{download_roles_handler, role_version_handler};
pub use health::health_handler;
pub use roles::{
    create_role_handler, delete_role_by_name_handler, delete_role_handler,
    get_role_by_name_handler, get_role_handler, list_role_names_handler,
    roles_for_service_handler, roles_for_user_handler, search_roles_handler, update_role_handler,
};
