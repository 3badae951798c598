use anyhow::Context;
use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, QueryResult};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    checkout::receipt::redact_email,
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthContext},
    },
    models::OrderEntity,
    schema::orders,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(get_my_orders))
            .route_layer(axum::middleware::from_fn(middleware::authorization)),
    )
}

/// Fetch a specific order belonging to the authenticated user.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = String, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<OrderEntity, String>)
    )
)]
async fn get_order(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    // Orders carry the redacted email, so the lookup does too.
    let order: QueryResult<OrderEntity> = orders::table
        .find(id)
        .filter(orders::email.eq(redact_email(&user.email)))
        .get_result(conn)
        .await;

    match order {
        Ok(order) => Ok(StdResponse {
            data: Some(order),
            message: Some("Get order successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}

/// Fetch all orders belonging to the authenticated user.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Vec<OrderEntity>, String>)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders: Vec<OrderEntity> = orders::table
        .filter(orders::email.eq(redact_email(&user.email)))
        .order_by(orders::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my orders")?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get my orders successfully"),
    })
}
