//! Warden API composition root.

#![forbid(unsafe_code)]

mod config;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn;
use axum::routing::get;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use warden_application::RoleStoreService;
use warden_core::AppError;
use warden_infrastructure::{InMemoryRoleStore, PostgresRoleStore};

use crate::config::{ApiConfig, RoleStoreBackend};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
    let config = ApiConfig::load()?;

    let role_store_service = match config.backend {
        RoleStoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;

            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to connect to database: {error}"))
                })?;

            sqlx::migrate!("../../crates/infrastructure/migrations")
                .run(&pool)
                .await
                .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

            if migrate_only {
                info!("database migrations applied successfully");
                return Ok(());
            }

            let store = Arc::new(PostgresRoleStore::new(pool));
            RoleStoreService::new(store.clone(), store, config.role_store.clone())
        }
        RoleStoreBackend::Memory => {
            if migrate_only {
                return Err(AppError::Validation(
                    "migrate requires ROLE_STORE_BACKEND=postgres".to_owned(),
                ));
            }

            info!("using in-memory role store; data is lost on restart");
            let store = Arc::new(InMemoryRoleStore::new());
            RoleStoreService::new(store.clone(), store, config.role_store.clone())
        }
    };

    let app = build_router(AppState { role_store_service });

    let address = config.bind_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind {address}: {error}")))?;

    info!(%address, "warden api listening");
    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("server error: {error}")))
}

fn build_router(app_state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/api/roles",
            get(handlers::search_roles_handler).post(handlers::create_role_handler),
        )
        .route("/api/roles/names", get(handlers::list_role_names_handler))
        .route(
            "/api/roles/{role_id}",
            get(handlers::get_role_handler)
                .put(handlers::update_role_handler)
                .delete(handlers::delete_role_handler),
        )
        .route(
            "/api/roles/name/{role_name}",
            get(handlers::get_role_by_name_handler).delete(handlers::delete_role_by_name_handler),
        )
        .route(
            "/api/roles/user/{user_name}",
            get(handlers::roles_for_user_handler),
        )
        .route(
            "/api/roles/service/{service_name}",
            get(handlers::roles_for_service_handler),
        )
        .route_layer(from_fn(middleware::require_session));

    let agent_routes = Router::new()
        .route(
            "/api/roles/download/{service_name}",
            get(handlers::download_roles_handler),
        )
        .route(
            "/api/roles/version/{service_name}",
            get(handlers::role_version_handler),
        );

    Router::new()
        .route("/health", get(handlers::health_handler))
        .merge(admin_routes)
        .merge(agent_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
