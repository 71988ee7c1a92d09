use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::rest::meta::Meta;

/// Success envelope. `meta` is only emitted for paged listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self { data, meta: None }
    }

    pub fn page(data: T, meta: Meta) -> Self {
        Self {
            data,
            meta: Some(meta),
        }
    }
}

/// 200 OK + `{data}`
pub fn ok_json<T: Serialize>(value: T) -> Response {
    (StatusCode::OK, Json(Envelope::data(value))).into_response()
}

/// 200 OK + `{data, meta}`
pub fn ok_page<T: Serialize>(value: T, meta: Meta) -> Response {
    (StatusCode::OK, Json(Envelope::page(value, meta))).into_response()
}

/// 201 Created + `{data}`
pub fn created_json<T: Serialize>(value: T) -> Response {
    (StatusCode::CREATED, Json(Envelope::data(value))).into_response()
}

/// 204 No Content
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
