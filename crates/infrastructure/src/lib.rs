//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_role_store;
mod postgres_role_store;

pub use in_memory_role_store::InMemoryRoleStore;
pub use postgres_role_store::PostgresRoleStore;
