use anyhow::Context;
use axum::{extract::State, response::IntoResponse};
use diesel::QueryDsl;
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
    },
    models::ChallengeEntity,
    schema::challenges,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/challenges",
        OpenApiRouter::new().routes(utoipa_axum::routes!(get_challenges)),
    )
}

/// Fetch all training challenges and their solved state.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Challenges"],
    responses(
        (status = 200, description = "List challenges", body = StdResponse<Vec<ChallengeEntity>, String>)
    )
)]
async fn get_challenges(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let challenges: Vec<ChallengeEntity> = challenges::table
        .order_by(challenges::key)
        .get_results(conn)
        .await
        .context("Failed to get challenges")?;

    Ok(StdResponse {
        data: Some(challenges),
        message: Some("Get challenges successfully"),
    })
}
