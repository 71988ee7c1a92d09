use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    response::Response,
    Extension,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::api::rest::dto::{CreateUserReq, ListUsersQuery, UpdateContactReq, UserDto};
use crate::api::rest::error::{map_domain_error, ApiError};
use crate::api::rest::meta::Meta;
use crate::api::rest::response::{created_json, no_content, ok_json, ok_page};
use crate::config::UsersConfig;
use crate::domain::service::UsersService;

type SharedService = Arc<dyn UsersService>;

/// Path ids are parsed here (not by `Path<Uuid>`) so a bad id gets the JSON error envelope.
fn parse_id(path: Result<Path<String>, PathRejection>) -> Result<Uuid, ApiError> {
    let Path(raw) = path.map_err(|e| {
        debug!(error = %e, "Rejected path");
        ApiError::bad_request("invalid UUID")
    })?;
    Uuid::parse_str(&raw).map_err(|_| ApiError::bad_request("invalid UUID"))
}

/// Decode a JSON body whatever the `Content-Type` says.
fn decode_body<T: DeserializeOwned>(body: Result<Bytes, BytesRejection>) -> Result<T, ApiError> {
    let bytes = body.map_err(|e| {
        debug!(error = %e, "Failed to read request body");
        ApiError::bad_request("invalid JSON")
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Query pairs in order of appearance; an undecodable query string reads as empty.
fn list_query(query: Result<Query<Vec<(String, String)>>, QueryRejection>) -> ListUsersQuery {
    match query {
        Ok(Query(pairs)) => ListUsersQuery::from_pairs(pairs),
        Err(e) => {
            debug!(error = %e, "Ignoring undecodable query string");
            ListUsersQuery::default()
        }
    }
}

/// List users with optional name filters and offset/limit paging
pub async fn list_users(
    Extension(svc): Extension<SharedService>,
    Extension(cfg): Extension<UsersConfig>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, ApiError> {
    let query = list_query(query);
    debug!("Listing users with query: {:?}", query);
    let filters = query.filters();

    let total = svc
        .count_users(&filters)
        .await
        .map_err(|e| map_domain_error(&e, "count failed"))?;

    let meta = Meta::new(
        query.offset(),
        query.limit(),
        total,
        cfg.default_page_size,
        cfg.max_page_size,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Invalid paging configuration");
        ApiError::internal("meta error")
    })?;

    let users = svc
        .list_users(&filters, meta.offset(), meta.limit())
        .await
        .map_err(|e| map_domain_error(&e, "fetch failed"))?;

    let data: Vec<UserDto> = users.into_iter().map(UserDto::from).collect();
    Ok(ok_page(data, meta))
}

/// Get a specific user by ID
pub async fn get_user(
    Extension(svc): Extension<SharedService>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(path)?;
    info!("Getting user with id: {}", id);

    let user = svc
        .get_user(id)
        .await
        .map_err(|e| map_domain_error(&e, "failed to fetch user"))?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(ok_json(UserDto::from(user)))
}

/// Create a new user
pub async fn create_user(
    Extension(svc): Extension<SharedService>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let req: CreateUserReq = decode_body(body)?;
    req.validate()?;
    info!("Creating user: {} {}", req.first_name, req.last_name);

    let user = svc
        .create_user(req.into())
        .await
        .map_err(|e| map_domain_error(&e, "could not create user"))?;

    Ok(created_json(UserDto::from(user)))
}

/// Replace the email and phone of an existing user
pub async fn update_user(
    Extension(svc): Extension<SharedService>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(path)?;
    let req: UpdateContactReq = decode_body(body)?;
    req.validate()?;
    info!("Updating contact of user {}", id);

    let user = svc
        .update_contact(id, req.into())
        .await
        .map_err(|e| map_domain_error(&e, "update failed"))?;

    Ok(ok_json(UserDto::from(user)))
}

/// Delete a user by ID; absent ids are not an error
pub async fn delete_user(
    Extension(svc): Extension<SharedService>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(path)?;
    info!("Deleting user: {}", id);

    svc.delete_user(id)
        .await
        .map_err(|e| map_domain_error(&e, "delete failed"))?;

    Ok(no_content())
}
