//! Postgres and filesystem implementations of the checkout collaborators.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::RunQueryDsl;

use crate::checkout::{
    CampaignTable, ChallengeFlag, DiscountResolver, OrderPipeline, PipelineSettings,
    stores::{
        BasketLine, BasketSnapshot, BasketStore, ChallengeRegistry, DeliveryCatalog,
        DeliveryMethod, DocumentStore, InventoryStore, OrderRecord, OrderStore, WalletStore,
    },
};
use crate::core::{app_state::AppState, db::DbPool};
use crate::models::{
    BasketEntity, BasketItemEntity, CreateOrderEntity, CreateReviewEntity, ProductEntity,
    ReviewEntity,
};
use crate::reviews::{NewReview, ReviewBoard, ReviewRecord, ReviewStore};
use crate::schema::{
    basket_items, baskets, challenges, delivery_methods, orders, products, quantities, reviews,
    wallets,
};

/// Wires the pipeline to its production collaborators.
pub fn build_pipeline(state: &AppState) -> OrderPipeline {
    OrderPipeline {
        baskets: Arc::new(PgBasketStore::new(state.db_pool.clone())),
        inventory: Arc::new(PgInventoryStore::new(state.db_pool.clone())),
        deliveries: Arc::new(PgDeliveryCatalog::new(state.db_pool.clone())),
        wallets: Arc::new(PgWalletStore::new(state.db_pool.clone())),
        orders: Arc::new(PgOrderStore::new(state.db_pool.clone())),
        documents: Arc::new(FsDocumentStore::new(
            state.config.application.documents_dir.clone(),
        )),
        challenges: Arc::new(PgChallengeRegistry::new(state.db_pool.clone())),
        discounts: DiscountResolver::new(CampaignTable::default()),
        settings: PipelineSettings {
            app_name: state.config.application.name.clone(),
            seasonal_product_id: state.config.application.seasonal_product_id,
            safety_mode: state.config.application.safety_mode,
        },
    }
}

pub struct PgBasketStore {
    pool: DbPool,
}

impl PgBasketStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BasketStore for PgBasketStore {
    async fn find_with_items(&self, id: i32) -> Result<Option<BasketSnapshot>> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let basket: QueryResult<BasketEntity> = baskets::table.find(id).get_result(conn).await;
        let Some(basket) = basket.optional()? else {
            return Ok(None);
        };

        // No deleted_at filter: soft-deleted products still price at
        // checkout.
        let rows: Vec<(BasketItemEntity, ProductEntity)> = basket_items::table
            .inner_join(products::table)
            .filter(basket_items::basket_id.eq(id))
            .select((BasketItemEntity::as_select(), ProductEntity::as_select()))
            .get_results(conn)
            .await
            .context("Failed to get basket items")?;

        Ok(Some(BasketSnapshot {
            id: basket.id,
            user_id: basket.user_id,
            coupon: basket.coupon,
            items: rows
                .into_iter()
                .map(|(item, product)| BasketLine {
                    product_id: product.id,
                    name: product.name,
                    quantity: item.quantity,
                    price: product.price,
                    deluxe_price: product.deluxe_price,
                })
                .collect(),
        }))
    }

    async fn clear_coupon(&self, id: i32) -> Result<()> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        diesel::update(baskets::table.find(id))
            .set(baskets::coupon.eq(None::<String>))
            .execute(conn)
            .await
            .context("Failed to clear basket coupon")?;
        Ok(())
    }

    async fn delete_items(&self, basket_id: i32) -> Result<()> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        diesel::delete(basket_items::table.filter(basket_items::basket_id.eq(basket_id)))
            .execute(conn)
            .await
            .context("Failed to delete basket items")?;
        Ok(())
    }
}

pub struct PgInventoryStore {
    pool: DbPool,
}

impl PgInventoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn deduct(&self, product_id: i32, quantity: i32) -> Result<()> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        // Single-statement adjustment, same as wallet balances. The counter
        // is allowed to go negative.
        diesel::update(quantities::table.find(product_id))
            .set((
                quantities::quantity.eq(quantities::quantity - quantity),
                quantities::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await
            .context("Failed to deduct product stock")?;
        Ok(())
    }
}

pub struct PgDeliveryCatalog {
    pool: DbPool,
}

impl PgDeliveryCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryCatalog for PgDeliveryCatalog {
    async fn find_by_id(&self, id: i32) -> Result<Option<DeliveryMethod>> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let row: QueryResult<(f64, f64, i32)> = delivery_methods::table
            .find(id)
            .select((
                delivery_methods::price,
                delivery_methods::deluxe_price,
                delivery_methods::eta,
            ))
            .get_result(conn)
            .await;

        Ok(row.optional()?.map(|(price, deluxe_price, eta)| DeliveryMethod {
            price,
            deluxe_price,
            eta,
        }))
    }
}

pub struct PgWalletStore {
    pool: DbPool,
}

impl PgWalletStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletStore for PgWalletStore {
    async fn balance(&self, user_id: i32) -> Result<f64> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let balance: QueryResult<f64> = wallets::table
            .find(user_id)
            .select(wallets::balance)
            .get_result(conn)
            .await;

        Ok(balance.optional()?.unwrap_or(0.0))
    }

    async fn increment(&self, user_id: i32, amount: f64) -> Result<()> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        // Single-statement adjustment; stays correct under concurrent orders
        // for the same user.
        diesel::update(wallets::table.find(user_id))
            .set((
                wallets::balance.eq(wallets::balance + amount),
                wallets::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await
            .context("Failed to credit wallet")?;
        Ok(())
    }

    async fn decrement(&self, user_id: i32, amount: f64) -> Result<()> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        diesel::update(wallets::table.find(user_id))
            .set((
                wallets::balance.eq(wallets::balance - amount),
                wallets::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await
            .context("Failed to debit wallet")?;
        Ok(())
    }
}

pub struct PgOrderStore {
    pool: DbPool,
}

impl PgOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, record: &OrderRecord) -> Result<()> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        diesel::insert_into(orders::table)
            .values(CreateOrderEntity {
                id: record.order_id.clone(),
                email: record.email.clone(),
                total_price: record.total_price,
                products: serde_json::to_value(&record.products)
                    .context("Failed to serialize order products")?,
                bonus: record.bonus,
                promotional_amount: record.promotional_amount,
                delivery_price: record.delivery_price,
                eta: record.eta,
                delivered: record.delivered,
                payment_id: record.payment_id.clone(),
                address_id: record.address_id.clone(),
            })
            .execute(conn)
            .await
            .context("Failed to insert order")?;
        Ok(())
    }
}

const DOCUMENT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Writes rendered order documents below a configured directory, one file
/// per order id.
pub struct FsDocumentStore {
    dir: PathBuf,
}

impl FsDocumentStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn write(&self, order_id: &str, document: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.dir.join(format!("order_{order_id}.txt"));
        tokio::time::timeout(DOCUMENT_WRITE_TIMEOUT, tokio::fs::write(&path, document))
            .await
            .context("Timed out writing order document")?
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Wires the review board to its production collaborators.
pub fn build_review_board(state: &AppState) -> ReviewBoard {
    ReviewBoard {
        reviews: Arc::new(PgReviewStore::new(state.db_pool.clone())),
        challenges: Arc::new(PgChallengeRegistry::new(state.db_pool.clone())),
    }
}

pub struct PgReviewStore {
    pool: DbPool,
}

impl PgReviewStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn review_from_entity(entity: ReviewEntity) -> Result<ReviewRecord> {
    Ok(ReviewRecord {
        id: entity.id,
        product_id: entity.product_id,
        author: entity.author,
        message: entity.message,
        likes_count: entity.likes_count,
        liked_by: serde_json::from_value(entity.liked_by)
            .context("Failed to deserialize review likers")?,
    })
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn insert(&self, review: &NewReview) -> Result<()> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        diesel::insert_into(reviews::table)
            .values(CreateReviewEntity {
                product_id: review.product_id,
                author: review.author.clone(),
                message: review.message.clone(),
                likes_count: 0,
                liked_by: serde_json::Value::Array(vec![]),
            })
            .execute(conn)
            .await
            .context("Failed to insert review")?;
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<Option<ReviewRecord>> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let entity: QueryResult<ReviewEntity> = reviews::table.find(id).get_result(conn).await;
        entity.optional()?.map(review_from_entity).transpose()
    }

    async fn for_product(&self, product_id: i32) -> Result<Vec<ReviewRecord>> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let entities: Vec<ReviewEntity> = reviews::table
            .filter(reviews::product_id.eq(product_id))
            .order_by(reviews::id)
            .get_results(conn)
            .await
            .context("Failed to get product reviews")?;

        entities.into_iter().map(review_from_entity).collect()
    }

    async fn bump_likes(&self, id: i32) -> Result<()> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        diesel::update(reviews::table.find(id))
            .set((
                reviews::likes_count.eq(reviews::likes_count + 1),
                reviews::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await
            .context("Failed to bump review likes")?;
        Ok(())
    }

    async fn set_liked_by(&self, id: i32, liked_by: &[String]) -> Result<()> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        diesel::update(reviews::table.find(id))
            .set((
                reviews::liked_by.eq(serde_json::to_value(liked_by)
                    .context("Failed to serialize review likers")?),
                reviews::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await
            .context("Failed to store review likers")?;
        Ok(())
    }
}

pub struct PgChallengeRegistry {
    pool: DbPool,
}

impl PgChallengeRegistry {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChallengeRegistry for PgChallengeRegistry {
    async fn solve(&self, flag: ChallengeFlag) -> Result<()> {
        let conn = &mut self
            .pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        // Idempotent: only the first solve flips the row.
        let updated = diesel::update(
            challenges::table
                .find(flag.key())
                .filter(challenges::solved.eq(false)),
        )
        .set((
            challenges::solved.eq(true),
            challenges::solved_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await
        .context("Failed to mark challenge solved")?;

        if updated > 0 {
            tracing::info!(flag = flag.key(), "Challenge solved");
        }
        Ok(())
    }
}
