use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard response envelope used by every route.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct StdResponse<T, M> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T: Serialize, M: Serialize> IntoResponse for StdResponse<T, M> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found")]
    NotFound,
    #[error("Insufficient wallet balance")]
    InsufficientFunds,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    ForbiddenResource(String),
    #[error("Missing or malformed authorization token")]
    Unauthorized,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ForbiddenResource(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Other(err) => {
                tracing::error!("Internal error: {err:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = StdResponse::<(), String> {
            data: None,
            message: Some(self.to_string()),
        };

        (status, body).into_response()
    }
}
