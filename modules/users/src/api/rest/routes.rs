use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use crate::api::rest::handlers;
use crate::config::UsersConfig;
use crate::domain::service::UsersService;

/// Mount the `/users` resource on `router`.
pub fn register_routes(
    router: Router,
    service: Arc<dyn UsersService>,
    config: UsersConfig,
) -> Router {
    router
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .layer(Extension(service))
        .layer(Extension(config))
}
