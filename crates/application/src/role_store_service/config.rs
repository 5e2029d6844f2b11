/// Default service types that receive every role.
pub const DEFAULT_SERVICE_TYPES_FOR_ALL_ROLES: &str = "solr";

/// Deployment-wide role store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleStoreConfig {
    /// Service types whose agents download every role, compared ignoring case.
    pub service_types_for_all_roles: Vec<String>,
    /// Enables per-service role versions instead of the global role counter.
    pub supports_roles_download_by_service: bool,
}

impl RoleStoreConfig {
    /// Creates a configuration from a comma separated service type list.
    #[must_use]
    pub fn new(service_types_for_all_roles: &str, supports_roles_download_by_service: bool) -> Self {
        Self {
            service_types_for_all_roles: service_types_for_all_roles
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
                .collect(),
            supports_roles_download_by_service,
        }
    }

    /// Returns whether agents of this service type receive every role.
    #[must_use]
    pub fn returns_all_roles_for(&self, service_type: &str) -> bool {
        self.service_types_for_all_roles
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(service_type))
    }
}

impl Default for RoleStoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_TYPES_FOR_ALL_ROLES, false)
    }
}
