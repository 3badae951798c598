//! The order pipeline: Loading → Pricing → Settling → Persisting → Cleared.
//! Linear, no retries. Everything before Persisting aborts cleanly; basket
//! cleanup after a successful persist is best-effort only.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::checkout::{
    campaign::DiscountResolver,
    delivery,
    hooks,
    receipt::{self, ReceiptContext},
    stores::{
        BasketStore, ChallengeRegistry, DeliveryCatalog, DocumentStore, InventoryStore,
        OrderRecord, OrderStore, WalletStore,
    },
};
use crate::core::{app_error::AppError, middleware::AuthContext};

/// Payment id selecting settlement against the stored-value wallet.
pub const WALLET_PAYMENT_ID: &str = "wallet";

#[derive(Debug, Clone, Default)]
pub struct OrderDetails {
    pub payment_id: Option<String>,
    pub address_id: Option<String>,
    pub delivery_method_id: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub basket_id: i32,
    pub order_details: Option<OrderDetails>,
    pub coupon_data: Option<String>,
    pub user_id: Option<i32>,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Basket with id={0} does not exist")]
    BasketNotFound(i32),
    #[error("Insufficient wallet balance")]
    InsufficientFunds,
    #[error("Order total must not be negative")]
    NegativeTotal,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::BasketNotFound(_) => AppError::NotFound,
            CheckoutError::InsufficientFunds => AppError::InsufficientFunds,
            CheckoutError::NegativeTotal => AppError::BadRequest(err.to_string()),
            CheckoutError::Store(err) => AppError::Other(err),
        }
    }
}

/// Basket cleanup is not transactional with the order store, so a persisted
/// order can survive a failed cleanup. The outcome says which case occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Cleared,
    Partial { detail: String },
}

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order_id: String,
    pub total_price: f64,
    pub bonus: i64,
    pub cleanup: CleanupOutcome,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub app_name: String,
    pub seasonal_product_id: i32,
    pub safety_mode: bool,
}

pub struct OrderPipeline {
    pub baskets: Arc<dyn BasketStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub deliveries: Arc<dyn DeliveryCatalog>,
    pub wallets: Arc<dyn WalletStore>,
    pub orders: Arc<dyn OrderStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub challenges: Arc<dyn ChallengeRegistry>,
    pub discounts: DiscountResolver,
    pub settings: PipelineSettings,
}

impl OrderPipeline {
    pub async fn place_order(
        &self,
        buyer: &AuthContext,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        self.place_order_at(buyer, request, Utc::now()).await
    }

    /// Runs the full pipeline against an explicit wall clock; discount
    /// windows and the receipt date derive from `now`.
    #[tracing::instrument(skip_all, fields(basket_id = request.basket_id, user_id = buyer.id))]
    pub async fn place_order_at(
        &self,
        buyer: &AuthContext,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        // Loading
        let basket = self
            .baskets
            .find_with_items(request.basket_id)
            .await?
            .ok_or(CheckoutError::BasketNotFound(request.basket_id))?;
        let details = request.order_details.unwrap_or_default();

        // Pricing
        let itemization = receipt::itemize(&basket.items, buyer.is_deluxe);
        // Stock counters drop as each line is priced, before settlement; a
        // failed deduction is logged and never blocks the order.
        for item in &basket.items {
            if let Err(err) = self.inventory.deduct(item.product_id, item.quantity).await {
                tracing::warn!(
                    product_id = item.product_id,
                    "Failed to deduct product stock: {err:#}"
                );
            }
        }
        let discount =
            self.discounts
                .resolve(basket.coupon.as_deref(), request.coupon_data.as_deref(), now);
        let discount_amount = if discount.percent > 0 {
            receipt::round2(itemization.subtotal * f64::from(discount.percent) / 100.0)
        } else {
            0.0
        };
        let delivery_method =
            delivery::resolve_delivery(self.deliveries.as_ref(), details.delivery_method_id)
                .await?;
        let delivery_price = delivery_method.effective_price(buyer.is_deluxe);
        let adjusted_price = itemization.subtotal - discount_amount + delivery_price;

        tracing::debug!(
            subtotal = itemization.subtotal,
            discount_percent = discount.percent,
            delivery_price,
            adjusted_price,
            "Priced basket"
        );

        hooks::observe(
            self.challenges.as_ref(),
            hooks::seasonal_item_flag(&basket.items, self.settings.seasonal_product_id),
        )
        .await;
        hooks::observe(self.challenges.as_ref(), discount.signals.clone()).await;
        if let Some(flag) = hooks::negative_total_flag(adjusted_price) {
            if self.settings.safety_mode {
                return Err(CheckoutError::NegativeTotal);
            }
            hooks::observe(self.challenges.as_ref(), [flag]).await;
        }

        // Settling
        let settle_user = request.user_id.unwrap_or(buyer.id);
        if details.payment_id.as_deref() == Some(WALLET_PAYMENT_ID) {
            let balance = self.wallets.balance(settle_user).await?;
            if balance < adjusted_price {
                return Err(CheckoutError::InsufficientFunds);
            }
            self.wallets.decrement(settle_user, adjusted_price).await?;
        }
        // Bonus points reward the purchase itself, independent of how it was
        // paid.
        self.wallets
            .increment(settle_user, itemization.bonus_total as f64)
            .await?;

        // Persisting
        let order_id = generate_order_id(&buyer.email);
        let document = receipt::render_document(&ReceiptContext {
            app_name: &self.settings.app_name,
            order_id: &order_id,
            email: &buyer.email,
            date: now.date_naive(),
            itemization: &itemization,
            discount_percent: discount.percent,
            discount_amount,
            delivery_price,
            total_price: adjusted_price,
        });
        self.documents.write(&order_id, &document).await?;

        let record = OrderRecord {
            order_id: order_id.clone(),
            email: receipt::redact_email(&buyer.email),
            total_price: adjusted_price,
            products: itemization.lines,
            bonus: itemization.bonus_total,
            promotional_amount: discount_amount,
            delivery_price,
            eta: delivery_method.eta,
            delivered: false,
            payment_id: details.payment_id.as_deref().map(receipt::strip_crlf),
            address_id: details.address_id.as_deref().map(receipt::strip_crlf),
        };
        self.orders.insert(&record).await?;
        tracing::info!(%order_id, total_price = record.total_price, "Order persisted");

        // Cleared
        let cleanup = self.clear_basket(basket.id).await;

        Ok(CheckoutOutcome {
            order_id,
            total_price: record.total_price,
            bonus: record.bonus,
            cleanup,
        })
    }

    /// Best-effort cleanup after a successful persist; never rolls the
    /// order back.
    async fn clear_basket(&self, basket_id: i32) -> CleanupOutcome {
        if let Err(err) = self.baskets.clear_coupon(basket_id).await {
            tracing::warn!(basket_id, "Failed to clear basket coupon: {err:#}");
            return CleanupOutcome::Partial {
                detail: format!("coupon not cleared: {err}"),
            };
        }
        if let Err(err) = self.baskets.delete_items(basket_id).await {
            tracing::warn!(basket_id, "Failed to delete basket items: {err:#}");
            return CleanupOutcome::Partial {
                detail: format!("items not deleted: {err}"),
            };
        }
        CleanupOutcome::Cleared
    }
}

/// Order ids are a truncated hash of the buyer's email plus a random hex
/// suffix; uniqueness is probabilistic, not guaranteed.
fn generate_order_id(email: &str) -> String {
    let digest = sha256::digest(email);
    format!("{}-{}", &digest[..4], random_hex(16))
}

fn random_hex(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
        .collect()
}
