use anyhow::Result;
use axum::Router;
use utoipa_swagger_ui::SwaggerUi;

use crate::core::app_state::AppState;

pub fn create_swagger_ui(openapi: utoipa::openapi::OpenApi) -> Result<Router<AppState>> {
    Ok(Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi)))
}
