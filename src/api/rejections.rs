use std::convert::Infallible;

use serde_json::json;
use tracing::error;
use warp::{body::BodyDeserializeError, http::StatusCode, reject::InvalidQuery, Rejection, Reply};

use crate::error::ApiError;

/// Maps rejections to JSON error replies. Registered once with
/// `recover` on the route tree.
pub async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(error) = rejection.find::<ApiError>() {
        match error {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                serde_json::to_value(errors).unwrap_or_else(|_| json!({"detail": "invalid input"})),
            ),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, json!({ "detail": detail })),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "detail": error.to_string() }),
            ),
            ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, json!({ "detail": detail })),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, json!({ "detail": detail })),
            ApiError::Internal(detail) => {
                error!("internal error: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": "internal server error" }),
                )
            }
        }
    } else if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, json!({ "detail": "not found" }))
    } else if let Some(error) = rejection.find::<BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            json!({ "detail": error.to_string() }),
        )
    } else if rejection.find::<InvalidQuery>().is_some() {
        (
            StatusCode::BAD_REQUEST,
            json!({ "detail": "invalid query string" }),
        )
    } else if rejection
        .find::<warp::reject::MethodNotAllowed>()
        .is_some()
    {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "detail": "method not allowed" }),
        )
    } else {
        error!("unhandled rejection: {rejection:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "detail": "internal server error" }),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
