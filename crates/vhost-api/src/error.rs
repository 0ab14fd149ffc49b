use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("vhost not found")]
    NotFound,
    #[error(transparent)]
    Gateway(#[from] vhost_gateway::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Gateway(vhost_gateway::Error::AlreadyExists) => StatusCode::CONFLICT,
            ApiError::Gateway(vhost_gateway::Error::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let code = match status.as_u16() {
            400 => "bad_request",
            404 => "not_found",
            409 => "already_exists",
            _ => "server_error",
        }
        .to_string();

        (status, Json(ErrorBody { code, message: self.to_string() })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
