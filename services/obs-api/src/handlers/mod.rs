//! HTTP request handlers for the observations API.

pub mod health;
pub mod observations;
pub mod sources;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use obs_common::ObsError;

/// JSON error body with the error's status code.
pub fn error_response(err: &ObsError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        err.to_json().to_string(),
    )
        .into_response()
}

/// Pretty-printed JSON response.
pub fn pretty_json_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
