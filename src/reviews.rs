//! Product reviews and their like counters. Liking is a check-then-act
//! sequence on purpose: the like counter bumps first and the liked-by list
//! settles after a fixed delay, so concurrent requests by the same user can
//! all pass the already-liked check.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::checkout::{
    hooks::{self, ChallengeFlag},
    receipt,
    stores::ChallengeRegistry,
};
use crate::core::app_error::AppError;

/// Gap between the counter bump and the liked-by append.
pub const LIKE_SETTLE_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    pub id: i32,
    pub product_id: i32,
    pub author: String,
    pub message: String,
    pub likes_count: i32,
    pub liked_by: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: i32,
    pub author: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("Review with id={0} does not exist")]
    NotFound(i32),
    #[error("Review was already liked")]
    AlreadyLiked,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<ReviewError> for AppError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::NotFound(_) => AppError::NotFound,
            ReviewError::AlreadyLiked => AppError::ForbiddenResource(err.to_string()),
            ReviewError::Store(err) => AppError::Other(err),
        }
    }
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert(&self, review: &NewReview) -> Result<()>;
    async fn find(&self, id: i32) -> Result<Option<ReviewRecord>>;
    async fn for_product(&self, product_id: i32) -> Result<Vec<ReviewRecord>>;
    /// Single-statement counter bump, independent of the liked-by list.
    async fn bump_likes(&self, id: i32) -> Result<()>;
    async fn set_liked_by(&self, id: i32, liked_by: &[String]) -> Result<()>;
}

pub struct ReviewBoard {
    pub reviews: Arc<dyn ReviewStore>,
    pub challenges: Arc<dyn ChallengeRegistry>,
}

impl ReviewBoard {
    /// Creates a review under the author named in the request. The author
    /// field is client-supplied and only observed, never enforced.
    pub async fn create(
        &self,
        authenticated_email: &str,
        review: NewReview,
    ) -> Result<(), ReviewError> {
        if review.author != authenticated_email {
            hooks::observe(self.challenges.as_ref(), [ChallengeFlag::ForgedReview]).await;
        }

        self.reviews
            .insert(&NewReview {
                product_id: review.product_id,
                author: receipt::strip_crlf(&review.author),
                message: receipt::strip_crlf(&review.message),
            })
            .await?;
        Ok(())
    }

    pub async fn for_product(&self, product_id: i32) -> Result<Vec<ReviewRecord>, ReviewError> {
        Ok(self.reviews.for_product(product_id).await?)
    }

    /// Likes a review once per user. The already-liked check reads the
    /// liked-by list as it was before the settle delay, so requests racing
    /// through the window each count.
    #[tracing::instrument(skip(self))]
    pub async fn like(&self, email: &str, review_id: i32) -> Result<ReviewRecord, ReviewError> {
        let email = receipt::strip_crlf(email);

        let review = self
            .reviews
            .find(review_id)
            .await?
            .ok_or(ReviewError::NotFound(review_id))?;
        if review.liked_by.iter().any(|liker| *liker == email) {
            return Err(ReviewError::AlreadyLiked);
        }

        self.reviews.bump_likes(review_id).await?;
        tokio::time::sleep(LIKE_SETTLE_DELAY).await;

        let mut updated = self
            .reviews
            .find(review_id)
            .await?
            .ok_or(ReviewError::NotFound(review_id))?;
        updated.liked_by.push(email.clone());

        let likes_by_user = updated
            .liked_by
            .iter()
            .filter(|liker| **liker == email)
            .count();
        if likes_by_user > 2 {
            hooks::observe(self.challenges.as_ref(), [ChallengeFlag::LikeRace]).await;
        }

        self.reviews.set_liked_by(review_id, &updated.liked_by).await?;
        Ok(updated)
    }
}
