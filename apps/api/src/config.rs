use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use warden_application::{DEFAULT_SERVICE_TYPES_FOR_ALL_ROLES, RoleStoreConfig};
use warden_core::AppError;

/// Storage backend behind the role store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleStoreBackend {
    /// PostgreSQL via sqlx.
    Postgres,
    /// Process-local state, lost on restart.
    Memory,
}

/// Process configuration read from the environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub backend: RoleStoreBackend,
    pub database_url: Option<String>,
    pub api_host: String,
    pub api_port: u16,
    pub role_store: RoleStoreConfig,
}

impl ApiConfig {
    /// Loads configuration from process environment variables.
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let backend = match lookup("ROLE_STORE_BACKEND")
            .unwrap_or_else(|| "postgres".to_owned())
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" => RoleStoreBackend::Postgres,
            "memory" => RoleStoreBackend::Memory,
            other => {
                return Err(AppError::Validation(format!(
                    "ROLE_STORE_BACKEND must be either 'postgres' or 'memory', got '{other}'"
                )));
            }
        };

        let database_url = lookup("DATABASE_URL").filter(|value| !value.trim().is_empty());
        if backend == RoleStoreBackend::Postgres && database_url.is_none() {
            return Err(AppError::Validation("DATABASE_URL is required".to_owned()));
        }

        let api_host = lookup("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = lookup("API_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let service_types = lookup("ROLE_SERVICE_TYPES_FOR_ALL_ROLES")
            .unwrap_or_else(|| DEFAULT_SERVICE_TYPES_FOR_ALL_ROLES.to_owned());
        let download_by_service = lookup("ROLE_DOWNLOAD_BY_SERVICE")
            .unwrap_or_else(|| "false".to_owned())
            .eq_ignore_ascii_case("true");

        Ok(Self {
            backend,
            database_url,
            api_host,
            api_port,
            role_store: RoleStoreConfig::new(service_types.as_str(), download_by_service),
        })
    }

    /// Returns the socket address the HTTP listener binds to.
    pub fn bind_address(&self) -> Result<SocketAddr, AppError> {
        let ip = IpAddr::from_str(self.api_host.as_str())
            .map_err(|error| AppError::Validation(format!("invalid API_HOST: {error}")))?;

        Ok(SocketAddr::new(ip, self.api_port))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use warden_core::AppError;

    use super::{ApiConfig, RoleStoreBackend};

    fn load(values: &[(&str, &str)]) -> Result<ApiConfig, AppError> {
        let values = values
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect::<HashMap<_, _>>();
        ApiConfig::from_lookup(|name| values.get(name).cloned())
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        assert!(matches!(load(&[]), Err(AppError::Validation(_))));
    }

    #[test]
    fn memory_backend_uses_defaults() {
        let config = load(&[("ROLE_STORE_BACKEND", "memory")]);
        assert!(config.is_ok());
        let config = config.unwrap_or_else(|_| unreachable!());

        assert_eq!(config.backend, RoleStoreBackend::Memory);
        assert_eq!(config.api_port, 3001);
        assert!(config.role_store.returns_all_roles_for("solr"));
        assert!(!config.role_store.supports_roles_download_by_service);
        assert!(config.bind_address().is_ok());
    }

    #[test]
    fn role_store_settings_are_read() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/warden"),
            ("ROLE_SERVICE_TYPES_FOR_ALL_ROLES", "kafka,solr"),
            ("ROLE_DOWNLOAD_BY_SERVICE", "TRUE"),
        ]);
        assert!(config.is_ok());
        let config = config.unwrap_or_else(|_| unreachable!());

        assert!(config.role_store.returns_all_roles_for("kafka"));
        assert!(config.role_store.supports_roles_download_by_service);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let config = load(&[("ROLE_STORE_BACKEND", "redis")]);
        assert!(matches!(config, Err(AppError::Validation(_))));
    }
}
