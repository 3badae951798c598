//! Collaborator seams the pipeline runs against. Production implementations
//! live in `crate::stores`; tests drive the pipeline through in-memory ones.

use anyhow::Result;
use async_trait::async_trait;

use crate::checkout::{hooks::ChallengeFlag, receipt::ReceiptLine};

/// A basket loaded with its line items, products already joined in.
/// Soft-deleted products are included on purpose: their price is still
/// honored at checkout.
#[derive(Debug, Clone)]
pub struct BasketSnapshot {
    pub id: i32,
    pub user_id: i32,
    pub coupon: Option<String>,
    pub items: Vec<BasketLine>,
}

#[derive(Debug, Clone)]
pub struct BasketLine {
    pub product_id: i32,
    pub name: String,
    pub quantity: i32,
    pub price: f64,
    pub deluxe_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveryMethod {
    pub price: f64,
    pub deluxe_price: f64,
    pub eta: i32,
}

impl Default for DeliveryMethod {
    /// Free shipping in five days when no delivery method was chosen.
    fn default() -> Self {
        Self {
            price: 0.0,
            deluxe_price: 0.0,
            eta: 5,
        }
    }
}

/// The finalized order as handed to the order store. Immutable after
/// insertion except for the delivered toggle, which a separate fulfillment
/// concern owns.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order_id: String,
    pub email: String,
    pub total_price: f64,
    pub products: Vec<ReceiptLine>,
    pub bonus: i64,
    pub promotional_amount: f64,
    pub delivery_price: f64,
    pub eta: i32,
    pub delivered: bool,
    pub payment_id: Option<String>,
    pub address_id: Option<String>,
}

#[async_trait]
pub trait BasketStore: Send + Sync {
    async fn find_with_items(&self, id: i32) -> Result<Option<BasketSnapshot>>;
    async fn clear_coupon(&self, id: i32) -> Result<()>;
    async fn delete_items(&self, basket_id: i32) -> Result<()>;
}

/// Stock counters per product. Checkout deducts the ordered quantity line by
/// line; a failed deduction is logged and never blocks the order, so the
/// counter can lag behind (or run below) reality.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn deduct(&self, product_id: i32, quantity: i32) -> Result<()>;
}

#[async_trait]
pub trait DeliveryCatalog: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<DeliveryMethod>>;
}

/// Balance mutations must be store-level increments/decrements, never a
/// read-modify-write from a cached value, so concurrent orders by the same
/// user cannot lose updates.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn balance(&self, user_id: i32) -> Result<f64>;
    async fn increment(&self, user_id: i32, amount: f64) -> Result<()>;
    async fn decrement(&self, user_id: i32, amount: f64) -> Result<()>;
}

/// Durable storage for rendered order documents. A write failure is fatal
/// for the checkout request.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn write(&self, order_id: &str, document: &str) -> Result<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, record: &OrderRecord) -> Result<()>;
}

/// One-way "solved" markers for training challenges. Solving must be
/// idempotent: the first call wins, later calls are no-ops.
#[async_trait]
pub trait ChallengeRegistry: Send + Sync {
    async fn solve(&self, flag: ChallengeFlag) -> Result<()>;
}
