//! Role search filters, ordering and pagination.

use std::str::FromStr;

use warden_core::AppError;
use warden_domain::{PrincipalKind, Role, RoleId};

/// Default page size when callers do not provide one.
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Sortable role fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleSortField {
    /// Role identifier.
    #[default]
    Id,
    /// Role name.
    Name,
    /// Creation timestamp.
    CreateTime,
    /// Last update timestamp.
    UpdateTime,
}

impl RoleSortField {
    /// Returns a stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::CreateTime => "create_time",
            Self::UpdateTime => "update_time",
        }
    }
}

impl FromStr for RoleSortField {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "id" | "roleId" => Ok(Self::Id),
            "name" | "roleName" => Ok(Self::Name),
            "create_time" | "createTime" => Ok(Self::CreateTime),
            "update_time" | "updateTime" => Ok(Self::UpdateTime),
            _ => Err(AppError::Validation(format!(
                "unknown role sort field '{value}'"
            ))),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// Returns a stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(AppError::Validation(format!(
                "unknown sort direction '{value}'"
            ))),
        }
    }
}

/// Role search predicates plus paging and ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSearchFilter {
    /// Exact role identifier.
    pub role_id: Option<RoleId>,
    /// Role name, compared ignoring case.
    pub role_name: Option<String>,
    /// Case-insensitive substring of the role name.
    pub role_name_partial: Option<String>,
    /// Name of a user member.
    pub user_name: Option<String>,
    /// Name of a group member.
    pub group_name: Option<String>,
    /// Name of a nested role member.
    pub role_member_name: Option<String>,
    /// Login that created the role.
    pub created_by: Option<String>,
    /// Zero-based index of the first returned row.
    pub start_index: usize,
    /// Maximum rows returned.
    pub page_size: usize,
    /// Sort field.
    pub sort_by: RoleSortField,
    /// Sort direction.
    pub sort_type: SortDirection,
}

impl Default for RoleSearchFilter {
    fn default() -> Self {
        Self {
            role_id: None,
            role_name: None,
            role_name_partial: None,
            user_name: None,
            group_name: None,
            role_member_name: None,
            created_by: None,
            start_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: RoleSortField::default(),
            sort_type: SortDirection::default(),
        }
    }
}

impl RoleSearchFilter {
    /// Returns whether no predicate is set. Paging fields are ignored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.role_id.is_none()
            && self.role_name.is_none()
            && self.role_name_partial.is_none()
            && self.user_name.is_none()
            && self.group_name.is_none()
            && self.role_member_name.is_none()
            && self.created_by.is_none()
    }

    /// Returns whether the role satisfies every predicate.
    #[must_use]
    pub fn matches(&self, role: &Role) -> bool {
        if self.role_id.is_some_and(|role_id| role_id != role.id) {
            return false;
        }

        if let Some(name) = &self.role_name
            && !role.name.eq_ignore_ascii_case(name)
        {
            return false;
        }

        if let Some(partial) = &self.role_name_partial
            && !role
                .name
                .to_lowercase()
                .contains(partial.to_lowercase().as_str())
        {
            return false;
        }

        let member_predicates = [
            (PrincipalKind::User, &self.user_name),
            (PrincipalKind::Group, &self.group_name),
            (PrincipalKind::Role, &self.role_member_name),
        ];
        for (kind, name) in member_predicates {
            if let Some(name) = name
                && !role.has_member(kind, name)
            {
                return false;
            }
        }

        self.created_by
            .as_ref()
            .is_none_or(|created_by| &role.created_by == created_by)
    }

    /// Retains the roles matching the filter. An empty filter keeps all.
    #[must_use]
    pub fn apply(&self, roles: Vec<Role>) -> Vec<Role> {
        if self.is_empty() {
            return roles;
        }

        roles.into_iter().filter(|role| self.matches(role)).collect()
    }

    /// Orders roles by the filter's sort field and direction.
    pub fn sort(&self, roles: &mut [Role]) {
        roles.sort_by(|left, right| {
            let ordering = match self.sort_by {
                RoleSortField::Id => left.id.cmp(&right.id),
                RoleSortField::Name => left.name.cmp(&right.name),
                RoleSortField::CreateTime => left.created_at.cmp(&right.created_at),
                RoleSortField::UpdateTime => left.updated_at.cmp(&right.updated_at),
            }
            .then_with(|| left.id.cmp(&right.id));

            match self.sort_type {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }
}

/// One page of roles with paging metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleList {
    /// Roles on this page.
    pub roles: Vec<Role>,
    /// Effective start index.
    pub start_index: usize,
    /// Requested page size.
    pub page_size: usize,
    /// Number of roles matching before pagination.
    pub total_count: usize,
    /// Number of roles on this page.
    pub result_size: usize,
    /// Sort field applied.
    pub sort_by: RoleSortField,
    /// Sort direction applied.
    pub sort_type: SortDirection,
}

impl RoleList {
    /// Cuts one page out of the full matching list.
    ///
    /// `to_index = min(start_index + page_size, total_count)`; a start index
    /// past the end yields an empty page rather than failing.
    #[must_use]
    pub fn paginate(roles: Vec<Role>, filter: &RoleSearchFilter) -> Self {
        let total_count = roles.len();
        let start_index = filter.start_index.min(total_count);
        let to_index = start_index
            .saturating_add(filter.page_size)
            .min(total_count);

        let page = roles
            .into_iter()
            .skip(start_index)
            .take(to_index - start_index)
            .collect::<Vec<_>>();

        Self {
            result_size: page.len(),
            roles: page,
            start_index: filter.start_index,
            page_size: filter.page_size,
            total_count,
            sort_by: filter.sort_by,
            sort_type: filter.sort_type,
        }
    }
}
