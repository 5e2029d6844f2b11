use warden_application::RoleStoreService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub role_store_service: RoleStoreService,
}
