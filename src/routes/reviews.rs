use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthContext},
    },
    reviews::{NewReview, ReviewRecord},
    stores::build_review_board,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/reviews",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_reviews, create_review))
            .routes(utoipa_axum::routes!(like_review))
            .route_layer(axum::middleware::from_fn(middleware::authorization)),
    )
}

#[derive(Serialize, ToSchema)]
struct ReviewRes {
    pub id: i32,
    pub product_id: i32,
    pub author: String,
    pub message: String,
    pub likes_count: i32,
}

impl From<ReviewRecord> for ReviewRes {
    fn from(record: ReviewRecord) -> Self {
        Self {
            id: record.id,
            product_id: record.product_id,
            author: record.author,
            message: record.message,
            likes_count: record.likes_count,
        }
    }
}

/// Fetch all reviews of a product.
#[utoipa::path(
    get,
    path = "/{product_id}",
    tags = ["Reviews"],
    security(("bearerAuth" = [])),
    params(
        ("product_id" = i32, Path, description = "Product ID to list reviews for")
    ),
    responses(
        (status = 200, description = "Get reviews successfully", body = StdResponse<Vec<ReviewRes>, String>)
    )
)]
async fn get_reviews(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let board = build_review_board(&state);
    let reviews = board.for_product(product_id).await?;

    Ok(StdResponse {
        data: Some(reviews.into_iter().map(ReviewRes::from).collect::<Vec<_>>()),
        message: Some("Get reviews successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct CreateReviewReq {
    author: String,
    message: String,
}

/// Create a review for a product. The author is taken from the request body
/// as submitted.
#[utoipa::path(
    post,
    path = "/{product_id}",
    tags = ["Reviews"],
    security(("bearerAuth" = [])),
    params(
        ("product_id" = i32, Path, description = "Product ID to review")
    ),
    request_body = CreateReviewReq,
    responses(
        (status = 200, description = "Review created successfully", body = StdResponse<String, String>)
    )
)]
async fn create_review(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthContext>,
    Json(body): Json<CreateReviewReq>,
) -> Result<impl IntoResponse, AppError> {
    let board = build_review_board(&state);
    board
        .create(
            &user.email,
            NewReview {
                product_id,
                author: body.author,
                message: body.message,
            },
        )
        .await?;

    Ok(StdResponse::<String, _> {
        data: None,
        message: Some("Review created successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct LikeReviewReq {
    id: i32,
}

/// Like a review, once per user.
#[utoipa::path(
    post,
    path = "/like",
    tags = ["Reviews"],
    security(("bearerAuth" = [])),
    request_body = LikeReviewReq,
    responses(
        (status = 200, description = "Review liked successfully", body = StdResponse<ReviewRes, String>),
        (status = 403, description = "Review was already liked"),
        (status = 404, description = "Review does not exist")
    )
)]
async fn like_review(
    State(state): State<AppState>,
    Extension(user): Extension<AuthContext>,
    Json(body): Json<LikeReviewReq>,
) -> Result<impl IntoResponse, AppError> {
    let board = build_review_board(&state);
    let review = board.like(&user.email, body.id).await?;

    Ok(StdResponse {
        data: Some(ReviewRes::from(review)),
        message: Some("Review liked successfully"),
    })
}
