use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::core::app_error::AppError;

/// The authenticated buyer, as resolved from the bearer token.
///
/// The token is deliberately weak for training purposes: plain base64-encoded
/// JSON claims with no signature, so clients can mint arbitrary identities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub id: i32,
    pub email: String,
    pub basket_id: i32,
    #[serde(default)]
    pub is_deluxe: bool,
}

pub async fn authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let claims = BASE64.decode(token).map_err(|_| AppError::Unauthorized)?;
    let user: AuthContext =
        serde_json::from_slice(&claims).map_err(|_| AppError::Unauthorized)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
