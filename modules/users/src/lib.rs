//! The `users` resource: REST handlers over a domain service over a SeaORM repository.

// === PUBLIC CONTRACT ===
pub mod contract;
pub use contract::model;

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;

pub use config::UsersConfig;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::domain::service::{Service, UsersService};
use crate::infra::storage::sea_orm_repo::SeaOrmUsersRepository;

/// Wire repository → service → routes on top of an open connection.
pub fn build_router(db: DatabaseConnection, config: UsersConfig) -> axum::Router {
    let repo = SeaOrmUsersRepository::new(db);
    let service: Arc<dyn UsersService> = Arc::new(Service::new(Arc::new(repo)));
    api::rest::routes::register_routes(axum::Router::new(), service, config)
}
