use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_application::{
    DEFAULT_PAGE_SIZE, RoleList, RoleSearchFilter, RoleSnapshot, RoleSortField, SortDirection,
};
use warden_core::AppError;
use warden_domain::{Role, RoleId, RoleInput, RoleMember};

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Incoming payload for role creation and update.
#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<RoleMember>,
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl From<RoleRequest> for RoleInput {
    fn from(value: RoleRequest) -> Self {
        Self {
            name: value.name,
            description: value.description,
            members: value.members,
            options: value.options,
        }
    }
}

/// Query flags accepted by role mutations.
#[derive(Debug, Default, Deserialize)]
pub struct RoleMutationQuery {
    #[serde(default)]
    pub create_missing_principals: bool,
}

/// API representation of a role.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub members: Vec<RoleMember>,
    pub options: BTreeMap<String, serde_json::Value>,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub policy_version: i64,
    pub role_version: i64,
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            id: value.id.value(),
            name: value.name,
            description: value.description,
            members: value.members,
            options: value.options,
            created_by: value.created_by,
            updated_by: value.updated_by,
            created_at: value.created_at,
            updated_at: value.updated_at,
            policy_version: value.policy_version,
            role_version: value.role_version,
        }
    }
}

/// Search and paging parameters for role listings.
#[derive(Debug, Default, Deserialize)]
pub struct RoleSearchQuery {
    pub role_id: Option<i64>,
    pub role_name: Option<String>,
    pub role_name_partial: Option<String>,
    pub user_name: Option<String>,
    pub group_name: Option<String>,
    pub role_member_name: Option<String>,
    pub created_by: Option<String>,
    pub start_index: Option<usize>,
    pub page_size: Option<usize>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
}

impl TryFrom<RoleSearchQuery> for RoleSearchFilter {
    type Error = AppError;

    fn try_from(value: RoleSearchQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            role_id: value.role_id.map(RoleId::new),
            role_name: value.role_name,
            role_name_partial: value.role_name_partial,
            user_name: value.user_name,
            group_name: value.group_name,
            role_member_name: value.role_member_name,
            created_by: value.created_by,
            start_index: value.start_index.unwrap_or_default(),
            page_size: value.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            sort_by: value
                .sort_by
                .as_deref()
                .map(str::parse::<RoleSortField>)
                .transpose()?
                .unwrap_or_default(),
            sort_type: value
                .sort_type
                .as_deref()
                .map(str::parse::<SortDirection>)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// One page of roles.
#[derive(Debug, Serialize)]
pub struct RoleListResponse {
    pub roles: Vec<RoleResponse>,
    pub start_index: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub result_size: usize,
    pub sort_by: &'static str,
    pub sort_type: &'static str,
}

impl From<RoleList> for RoleListResponse {
    fn from(value: RoleList) -> Self {
        Self {
            roles: value.roles.into_iter().map(RoleResponse::from).collect(),
            start_index: value.start_index,
            page_size: value.page_size,
            total_count: value.total_count,
            result_size: value.result_size,
            sort_by: value.sort_by.as_str(),
            sort_type: value.sort_type.as_str(),
        }
    }
}

/// Query parameters sent by policy-enforcement agents.
#[derive(Debug, Default, Deserialize)]
pub struct RoleDownloadQuery {
    #[serde(rename = "lastKnownRoleVersion")]
    pub last_known_role_version: Option<i64>,
}

/// Role snapshot served to policy-enforcement agents.
#[derive(Debug, Serialize)]
pub struct RoleDownloadResponse {
    pub service_name: String,
    pub role_version: i64,
    pub roles: Vec<RoleResponse>,
}

impl From<&RoleSnapshot> for RoleDownloadResponse {
    fn from(value: &RoleSnapshot) -> Self {
        Self {
            service_name: value.service_name.clone(),
            role_version: value.role_version,
            roles: value
                .roles
                .iter()
                .cloned()
                .map(RoleResponse::from)
                .collect(),
        }
    }
}

/// Current role version of a service.
#[derive(Debug, Serialize)]
pub struct RoleVersionResponse {
    pub service_name: String,
    pub role_version: Option<i64>,
}
