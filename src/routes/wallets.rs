use anyhow::Context;
use axum::{Extension, extract::State, response::IntoResponse};
use diesel::{OptionalExtension, QueryDsl, QueryResult};
use diesel_async::RunQueryDsl;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthContext},
    },
    schema::wallets,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/wallet",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_balance))
            .route_layer(axum::middleware::from_fn(middleware::authorization)),
    )
}

#[derive(Serialize, ToSchema)]
struct GetBalanceRes {
    balance: f64,
}

/// Fetch the authenticated user's wallet balance.
#[utoipa::path(
    get,
    path = "/balance",
    tags = ["Wallet"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get balance successfully", body = StdResponse<GetBalanceRes, String>)
    )
)]
async fn get_balance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let balance: QueryResult<f64> = wallets::table
        .find(user.id)
        .select(wallets::balance)
        .get_result(conn)
        .await;

    Ok(StdResponse {
        data: Some(GetBalanceRes {
            balance: balance.optional().context("Failed to get balance")?.unwrap_or(0.0),
        }),
        message: Some("Get balance successfully"),
    })
}
