use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    checkout::{
        CheckoutRequest, ChallengeFlag, CleanupOutcome, OrderDetails,
        hooks,
        stores::BasketStore,
    },
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthContext},
    },
    stores::{PgBasketStore, PgChallengeRegistry, build_pipeline},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/baskets",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_basket))
            .routes(utoipa_axum::routes!(checkout))
            .route_layer(axum::middleware::from_fn(middleware::authorization)),
    )
}

#[derive(Serialize, ToSchema)]
struct BasketItemRes {
    pub product_id: i32,
    pub name: String,
    pub quantity: i32,
    pub price: f64,
}

#[derive(Serialize, ToSchema)]
struct GetBasketRes {
    pub id: i32,
    pub coupon: Option<String>,
    pub items: Vec<BasketItemRes>,
    pub total_price: f64,
}

/// Fetch the authenticated user's basket with its items.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Baskets"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Basket ID to fetch")
    ),
    responses(
        (status = 200, description = "Get basket successfully", body = StdResponse<GetBasketRes, String>),
        (status = 403, description = "Basket belongs to another user")
    )
)]
async fn get_basket(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    if user.basket_id != id {
        // Cross-user basket access is itself a training challenge.
        let registry = PgChallengeRegistry::new(state.db_pool.clone());
        hooks::observe(&registry, [ChallengeFlag::BasketAccess]).await;
        return Err(AppError::ForbiddenResource(
            "Unauthorized access to basket".into(),
        ));
    }

    let basket = PgBasketStore::new(state.db_pool.clone())
        .find_with_items(id)
        .await
        .context("Failed to load basket")?
        .ok_or(AppError::NotFound)?;

    let items: Vec<BasketItemRes> = basket
        .items
        .iter()
        .map(|item| BasketItemRes {
            product_id: item.product_id,
            name: item.name.clone(),
            quantity: item.quantity,
            price: if user.is_deluxe {
                item.deluxe_price
            } else {
                item.price
            },
        })
        .collect();
    let total_price = items
        .iter()
        .map(|item| item.price * f64::from(item.quantity))
        .sum();

    Ok(StdResponse {
        data: Some(GetBasketRes {
            id: basket.id,
            coupon: basket.coupon,
            items,
            total_price,
        }),
        message: Some("Get basket successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct OrderDetailsReq {
    payment_id: Option<String>,
    address_id: Option<String>,
    delivery_method_id: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
struct CheckoutReq {
    order_details: Option<OrderDetailsReq>,
    coupon_data: Option<String>,
    user_id: Option<i32>,
}

#[derive(Serialize, ToSchema)]
struct CheckoutRes {
    order_confirmation: String,
}

/// Place an order from the basket's current items.
#[utoipa::path(
    post,
    path = "/{id}/checkout",
    tags = ["Baskets"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Basket ID to check out")
    ),
    request_body = CheckoutReq,
    responses(
        (status = 200, description = "Order placed successfully", body = StdResponse<CheckoutRes, String>),
        (status = 402, description = "Insufficient wallet balance"),
        (status = 404, description = "Basket does not exist")
    )
)]
async fn checkout(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthContext>,
    Json(body): Json<CheckoutReq>,
) -> Result<impl IntoResponse, AppError> {
    let pipeline = build_pipeline(&state);
    let request = CheckoutRequest {
        basket_id: id,
        order_details: body.order_details.map(|details| OrderDetails {
            payment_id: details.payment_id,
            address_id: details.address_id,
            delivery_method_id: details.delivery_method_id,
        }),
        coupon_data: body.coupon_data,
        user_id: body.user_id,
    };

    let outcome = pipeline.place_order(&user, request).await?;
    if let CleanupOutcome::Partial { detail } = &outcome.cleanup {
        // The order stands; cleanup is eventually consistent.
        tracing::warn!(basket_id = id, detail = %detail, "Basket cleanup incomplete");
    }

    Ok(StdResponse {
        data: Some(CheckoutRes {
            order_confirmation: outcome.order_id,
        }),
        message: Some("Order placed successfully"),
    })
}
