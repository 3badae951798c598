//! End-to-end pipeline tests against in-memory collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, TimeZone, Utc};

use vulnshop_orderservice::checkout::{
    CampaignTable, ChallengeFlag, CheckoutError, CheckoutOutcome, CheckoutRequest, CleanupOutcome,
    DiscountResolver, OrderDetails, OrderPipeline, PipelineSettings,
    stores::{
        BasketLine, BasketSnapshot, BasketStore, ChallengeRegistry, DeliveryCatalog,
        DeliveryMethod, DocumentStore, InventoryStore, OrderRecord, OrderStore, WalletStore,
    },
};
use vulnshop_orderservice::core::middleware::AuthContext;

#[derive(Default)]
struct MemBasketStore {
    baskets: Mutex<HashMap<i32, BasketSnapshot>>,
    fail_delete: AtomicBool,
}

#[async_trait]
impl BasketStore for MemBasketStore {
    async fn find_with_items(&self, id: i32) -> Result<Option<BasketSnapshot>> {
        Ok(self.baskets.lock().unwrap().get(&id).cloned())
    }

    async fn clear_coupon(&self, id: i32) -> Result<()> {
        if let Some(basket) = self.baskets.lock().unwrap().get_mut(&id) {
            basket.coupon = None;
        }
        Ok(())
    }

    async fn delete_items(&self, basket_id: i32) -> Result<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(anyhow!("basket store offline"));
        }
        if let Some(basket) = self.baskets.lock().unwrap().get_mut(&basket_id) {
            basket.items.clear();
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemInventoryStore {
    stock: Mutex<HashMap<i32, i32>>,
    fail: AtomicBool,
}

#[async_trait]
impl InventoryStore for MemInventoryStore {
    async fn deduct(&self, product_id: i32, quantity: i32) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("inventory offline"));
        }
        *self.stock.lock().unwrap().entry(product_id).or_insert(0) -= quantity;
        Ok(())
    }
}

struct MemDeliveryCatalog {
    methods: HashMap<i32, DeliveryMethod>,
}

#[async_trait]
impl DeliveryCatalog for MemDeliveryCatalog {
    async fn find_by_id(&self, id: i32) -> Result<Option<DeliveryMethod>> {
        Ok(self.methods.get(&id).copied())
    }
}

#[derive(Default)]
struct MemWalletStore {
    balances: Mutex<HashMap<i32, f64>>,
}

#[async_trait]
impl WalletStore for MemWalletStore {
    async fn balance(&self, user_id: i32) -> Result<f64> {
        Ok(self.balances.lock().unwrap().get(&user_id).copied().unwrap_or(0.0))
    }

    async fn increment(&self, user_id: i32, amount: f64) -> Result<()> {
        *self.balances.lock().unwrap().entry(user_id).or_insert(0.0) += amount;
        Ok(())
    }

    async fn decrement(&self, user_id: i32, amount: f64) -> Result<()> {
        *self.balances.lock().unwrap().entry(user_id).or_insert(0.0) -= amount;
        Ok(())
    }
}

#[derive(Default)]
struct MemOrderStore {
    orders: Mutex<Vec<OrderRecord>>,
}

#[async_trait]
impl OrderStore for MemOrderStore {
    async fn insert(&self, record: &OrderRecord) -> Result<()> {
        self.orders.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[derive(Default)]
struct MemDocumentStore {
    documents: Mutex<HashMap<String, String>>,
    fail: AtomicBool,
}

#[async_trait]
impl DocumentStore for MemDocumentStore {
    async fn write(&self, order_id: &str, document: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("document storage offline"));
        }
        self.documents
            .lock()
            .unwrap()
            .insert(order_id.to_string(), document.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct MemChallengeRegistry {
    solved: Mutex<HashSet<&'static str>>,
}

#[async_trait]
impl ChallengeRegistry for MemChallengeRegistry {
    async fn solve(&self, flag: ChallengeFlag) -> Result<()> {
        self.solved.lock().unwrap().insert(flag.key());
        Ok(())
    }
}

struct World {
    baskets: Arc<MemBasketStore>,
    inventory: Arc<MemInventoryStore>,
    deliveries: Arc<MemDeliveryCatalog>,
    wallets: Arc<MemWalletStore>,
    orders: Arc<MemOrderStore>,
    documents: Arc<MemDocumentStore>,
    challenges: Arc<MemChallengeRegistry>,
    safety_mode: bool,
}

const SEASONAL_PRODUCT_ID: i32 = 99;

impl World {
    fn new() -> Self {
        Self {
            baskets: Arc::new(MemBasketStore::default()),
            inventory: Arc::new(MemInventoryStore::default()),
            deliveries: Arc::new(MemDeliveryCatalog {
                // id 1: 5.00 standard / 2.00 deluxe, two days
                methods: HashMap::from([(
                    1,
                    DeliveryMethod {
                        price: 5.0,
                        deluxe_price: 2.0,
                        eta: 2,
                    },
                )]),
            }),
            wallets: Arc::new(MemWalletStore::default()),
            orders: Arc::new(MemOrderStore::default()),
            documents: Arc::new(MemDocumentStore::default()),
            challenges: Arc::new(MemChallengeRegistry::default()),
            safety_mode: false,
        }
    }

    fn pipeline(&self) -> OrderPipeline {
        OrderPipeline {
            baskets: self.baskets.clone(),
            inventory: self.inventory.clone(),
            deliveries: self.deliveries.clone(),
            wallets: self.wallets.clone(),
            orders: self.orders.clone(),
            documents: self.documents.clone(),
            challenges: self.challenges.clone(),
            discounts: DiscountResolver::new(CampaignTable::default()),
            settings: PipelineSettings {
                app_name: "Vuln Shop".into(),
                seasonal_product_id: SEASONAL_PRODUCT_ID,
                safety_mode: self.safety_mode,
            },
        }
    }

    fn add_basket(&self, id: i32, user_id: i32, coupon: Option<&str>, items: Vec<BasketLine>) {
        self.baskets.lock_insert(BasketSnapshot {
            id,
            user_id,
            coupon: coupon.map(str::to_string),
            items,
        });
    }

    fn set_balance(&self, user_id: i32, balance: f64) {
        self.wallets.balances.lock().unwrap().insert(user_id, balance);
    }

    fn set_stock(&self, product_id: i32, quantity: i32) {
        self.inventory.stock.lock().unwrap().insert(product_id, quantity);
    }

    fn stock_of(&self, product_id: i32) -> i32 {
        self.inventory
            .stock
            .lock()
            .unwrap()
            .get(&product_id)
            .copied()
            .unwrap_or(0)
    }

    fn balance(&self, user_id: i32) -> f64 {
        self.wallets
            .balances
            .lock()
            .unwrap()
            .get(&user_id)
            .copied()
            .unwrap_or(0.0)
    }

    fn orders(&self) -> Vec<OrderRecord> {
        self.orders.orders.lock().unwrap().clone()
    }

    fn solved(&self, flag: ChallengeFlag) -> bool {
        self.challenges.solved.lock().unwrap().contains(flag.key())
    }

    fn solved_count(&self) -> usize {
        self.challenges.solved.lock().unwrap().len()
    }
}

impl MemBasketStore {
    fn lock_insert(&self, basket: BasketSnapshot) {
        self.baskets.lock().unwrap().insert(basket.id, basket);
    }

    fn items_of(&self, id: i32) -> Vec<BasketLine> {
        self.baskets
            .lock()
            .unwrap()
            .get(&id)
            .map(|basket| basket.items.clone())
            .unwrap_or_default()
    }
}

fn line(product_id: i32, price: f64, quantity: i32) -> BasketLine {
    BasketLine {
        product_id,
        name: format!("Product {product_id}"),
        quantity,
        price,
        deluxe_price: price * 0.8,
    }
}

fn buyer(id: i32, basket_id: i32) -> AuthContext {
    AuthContext {
        id,
        email: "jim@juice.sh".into(),
        basket_id,
        is_deluxe: false,
    }
}

fn request(basket_id: i32, payment_id: Option<&str>, delivery_method_id: Option<i32>) -> CheckoutRequest {
    CheckoutRequest {
        basket_id,
        order_details: Some(OrderDetails {
            payment_id: payment_id.map(str::to_string),
            address_id: Some("addr-1".into()),
            delivery_method_id,
        }),
        coupon_data: None,
        user_id: None,
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
}

fn coupon(tag: &str, percent: u8) -> String {
    BASE64.encode(format!("{tag}-{percent}"))
}

async fn checkout(world: &World, buyer: &AuthContext, request: CheckoutRequest) -> CheckoutOutcome {
    world
        .pipeline()
        .place_order_at(buyer, request, now())
        .await
        .expect("checkout should succeed")
}

#[tokio::test]
async fn card_payment_persists_order_and_clears_basket() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 2)]);

    let outcome = checkout(&world, &buyer(7, 1), request(1, Some("card"), Some(1))).await;

    assert_eq!(outcome.total_price, 25.0);
    assert_eq!(outcome.bonus, 2);
    assert_eq!(outcome.cleanup, CleanupOutcome::Cleared);

    let orders = world.orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.total_price, 25.0);
    assert_eq!(order.promotional_amount, 0.0);
    assert_eq!(order.delivery_price, 5.0);
    assert_eq!(order.eta, 2);
    assert_eq!(order.bonus, 2);
    assert!(!order.delivered);
    assert_eq!(order.payment_id.as_deref(), Some("card"));

    // No debit on card payment, only the bonus credit.
    assert_eq!(world.balance(7), 2.0);
    // Basket items are gone after checkout.
    assert!(world.baskets.items_of(1).is_empty());
}

#[tokio::test]
async fn order_record_redacts_email_and_derives_order_id() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 1)]);

    let outcome = checkout(&world, &buyer(7, 1), request(1, Some("card"), None)).await;

    let order = &world.orders()[0];
    assert_eq!(order.email, "j*m@j**c*.sh");
    assert_eq!(order.order_id, outcome.order_id);

    let (prefix, suffix) = order.order_id.split_once('-').unwrap();
    assert_eq!(prefix.len(), 4);
    assert_eq!(suffix.len(), 16);
    assert!(prefix.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));

    // The receipt document was written under the order id.
    assert!(
        world
            .documents
            .documents
            .lock()
            .unwrap()
            .contains_key(&order.order_id)
    );
}

#[tokio::test]
async fn zero_discount_zero_delivery_total_is_exact_item_sum() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 1.99, 3), line(11, 42.0, 2)]);

    let outcome = checkout(&world, &buyer(7, 1), request(1, Some("card"), None)).await;

    assert_eq!(outcome.total_price, 1.99 * 3.0 + 42.0 * 2.0);
}

#[tokio::test]
async fn discount_applies_to_subtotal_before_delivery() {
    let world = World::new();
    world.add_basket(1, 7, Some(&coupon("JUN24", 50)), vec![line(10, 10.0, 2)]);

    let outcome = checkout(&world, &buyer(7, 1), request(1, Some("card"), Some(1))).await;

    // subtotal 20, minus 10 discount, plus delivery 5 — not 50% of 25.
    assert_eq!(outcome.total_price, 15.0);
    assert_eq!(world.orders()[0].promotional_amount, 10.0);
}

#[tokio::test]
async fn campaign_token_with_exact_timestamp_grants_discount_and_flags_clock() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 2)]);

    let valid_on = CampaignTable::default().get("WMNSDY2019").unwrap().valid_on;
    let mut req = request(1, Some("card"), None);
    req.coupon_data = Some(BASE64.encode(format!("WMNSDY2019-{valid_on}")));

    let outcome = checkout(&world, &buyer(7, 1), req).await;

    assert_eq!(outcome.total_price, 5.0); // 20 - 75%
    assert!(world.solved(ChallengeFlag::ManipulatedClock));
}

#[tokio::test]
async fn campaign_token_with_wrong_timestamp_grants_nothing() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 2)]);

    let valid_on = CampaignTable::default().get("WMNSDY2019").unwrap().valid_on;
    let mut req = request(1, Some("card"), None);
    req.coupon_data = Some(BASE64.encode(format!("WMNSDY2019-{}", valid_on + 1)));

    let outcome = checkout(&world, &buyer(7, 1), req).await;

    assert_eq!(outcome.total_price, 20.0);
    assert_eq!(world.solved_count(), 0);
}

#[tokio::test]
async fn forged_coupon_at_eighty_percent_or_more_is_flagged() {
    let world = World::new();
    world.add_basket(1, 7, Some(&coupon("JUN24", 90)), vec![line(10, 10.0, 2)]);

    let outcome = checkout(&world, &buyer(7, 1), request(1, Some("card"), None)).await;

    assert_eq!(outcome.total_price, 2.0); // 20 - 18
    assert!(world.solved(ChallengeFlag::ForgedCoupon));
}

#[tokio::test]
async fn insufficient_wallet_balance_aborts_settlement_and_persists_nothing() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 2)]);
    world.set_balance(7, 10.0);
    world.set_stock(10, 5);

    let result = world
        .pipeline()
        .place_order_at(&buyer(7, 1), request(1, Some("wallet"), Some(1)), now())
        .await;

    assert!(matches!(result, Err(CheckoutError::InsufficientFunds)));
    assert!(world.orders().is_empty());
    // No debit and no bonus credit: the pipeline aborted during settling.
    assert_eq!(world.balance(7), 10.0);
    // The basket survives untouched.
    assert_eq!(world.baskets.items_of(1).len(), 1);
    // Stock had already dropped during pricing and stays dropped.
    assert_eq!(world.stock_of(10), 3);
}

#[tokio::test]
async fn wallet_payment_debits_total_and_credits_bonus() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 2)]);
    world.set_balance(7, 100.0);

    let outcome = checkout(&world, &buyer(7, 1), request(1, Some("wallet"), Some(1))).await;

    assert_eq!(outcome.total_price, 25.0);
    assert_eq!(world.balance(7), 100.0 - 25.0 + 2.0);
    assert_eq!(world.orders().len(), 1);
}

#[tokio::test]
async fn empty_basket_checks_out_to_a_zero_total_order() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![]);

    let outcome = checkout(&world, &buyer(7, 1), request(1, Some("card"), None)).await;

    assert_eq!(outcome.total_price, 0.0);
    assert_eq!(outcome.bonus, 0);
    let order = &world.orders()[0];
    assert!(order.products.is_empty());
    assert_eq!(order.bonus, 0);
}

#[tokio::test]
async fn checkout_after_basket_was_cleared_yields_an_empty_order() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 2)]);

    let first = checkout(&world, &buyer(7, 1), request(1, Some("card"), None)).await;
    let second = checkout(&world, &buyer(7, 1), request(1, Some("card"), None)).await;

    assert_eq!(first.total_price, 20.0);
    assert_eq!(second.total_price, 0.0);
    assert_eq!(world.orders().len(), 2);
}

#[tokio::test]
async fn missing_basket_fails_with_not_found() {
    let world = World::new();

    let result = world
        .pipeline()
        .place_order_at(&buyer(7, 42), request(42, Some("card"), None), now())
        .await;

    assert!(matches!(result, Err(CheckoutError::BasketNotFound(42))));
    assert!(world.orders().is_empty());
}

#[tokio::test]
async fn negative_total_is_flagged_but_the_order_goes_through() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, -3)]);

    let outcome = checkout(&world, &buyer(7, 1), request(1, Some("card"), None)).await;

    assert_eq!(outcome.total_price, -30.0);
    assert!(world.solved(ChallengeFlag::NegativeTotal));
    assert_eq!(world.orders().len(), 1);
}

#[tokio::test]
async fn safety_mode_rejects_negative_totals() {
    let mut world = World::new();
    world.safety_mode = true;
    world.add_basket(1, 7, None, vec![line(10, 10.0, -3)]);

    let result = world
        .pipeline()
        .place_order_at(&buyer(7, 1), request(1, Some("card"), None), now())
        .await;

    assert!(matches!(result, Err(CheckoutError::NegativeTotal)));
    assert!(world.orders().is_empty());
    assert!(!world.solved(ChallengeFlag::NegativeTotal));
}

#[tokio::test]
async fn checkout_deducts_stock_for_each_ordered_line() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 2), line(11, 3.0, 5)]);
    world.set_stock(10, 8);
    world.set_stock(11, 5);

    checkout(&world, &buyer(7, 1), request(1, Some("card"), None)).await;

    assert_eq!(world.stock_of(10), 6);
    assert_eq!(world.stock_of(11), 0);
}

#[tokio::test]
async fn stock_deduction_failure_never_blocks_the_order() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 2)]);
    world.inventory.fail.store(true, Ordering::SeqCst);

    let outcome = checkout(&world, &buyer(7, 1), request(1, Some("card"), None)).await;

    assert_eq!(outcome.total_price, 20.0);
    assert_eq!(world.orders().len(), 1);
}

#[tokio::test]
async fn seasonal_product_in_basket_is_flagged() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(SEASONAL_PRODUCT_ID, 29.99, 1)]);

    checkout(&world, &buyer(7, 1), request(1, Some("card"), None)).await;

    assert!(world.solved(ChallengeFlag::SeasonalItem));
}

#[tokio::test]
async fn document_write_failure_is_fatal_and_persists_no_order() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 2)]);
    world.documents.fail.store(true, Ordering::SeqCst);

    let result = world
        .pipeline()
        .place_order_at(&buyer(7, 1), request(1, Some("card"), None), now())
        .await;

    assert!(matches!(result, Err(CheckoutError::Store(_))));
    assert!(world.orders().is_empty());
    // The basket was not cleared either.
    assert_eq!(world.baskets.items_of(1).len(), 1);
}

#[tokio::test]
async fn failed_basket_cleanup_yields_a_partial_outcome_with_the_order_intact() {
    let world = World::new();
    // A stale coupon prices to nothing but still needs clearing.
    world.add_basket(1, 7, Some(&coupon("JAN20", 50)), vec![line(10, 10.0, 2)]);
    world.baskets.fail_delete.store(true, Ordering::SeqCst);

    let outcome = checkout(&world, &buyer(7, 1), request(1, Some("card"), None)).await;

    assert!(matches!(outcome.cleanup, CleanupOutcome::Partial { .. }));
    assert_eq!(world.orders().len(), 1);
    // The coupon was cleared before item deletion failed.
    assert!(
        world
            .baskets
            .baskets
            .lock()
            .unwrap()
            .get(&1)
            .unwrap()
            .coupon
            .is_none()
    );
}

#[tokio::test]
async fn malformed_coupon_data_resolves_to_full_price_with_no_side_effects() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 2)]);
    world.add_basket(2, 7, None, vec![line(10, 10.0, 2)]);

    for basket_id in [1, 2] {
        let mut req = request(basket_id, Some("card"), None);
        req.coupon_data = Some("%%%not-base64%%%".into());
        let outcome = checkout(&world, &buyer(7, basket_id), req).await;
        assert_eq!(outcome.total_price, 20.0);
    }
    assert_eq!(world.solved_count(), 0);
}

#[tokio::test]
async fn deluxe_membership_prices_items_and_delivery_at_deluxe_rates() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 2)]);

    let mut deluxe_buyer = buyer(7, 1);
    deluxe_buyer.is_deluxe = true;

    let outcome = checkout(&world, &deluxe_buyer, request(1, Some("card"), Some(1))).await;

    // 2 x 8.00 deluxe price plus 2.00 deluxe delivery.
    assert_eq!(outcome.total_price, 18.0);
    // Bonus follows the deluxe unit price: round(8/10) = 1 per unit.
    assert_eq!(outcome.bonus, 2);
}

#[tokio::test]
async fn crlf_is_stripped_from_payment_and_address_ids() {
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 1)]);

    let mut req = request(1, Some("card\r\nDelivered: true"), None);
    if let Some(details) = req.order_details.as_mut() {
        details.address_id = Some("addr\n1".into());
    }

    checkout(&world, &buyer(7, 1), req).await;

    let order = &world.orders()[0];
    assert_eq!(order.payment_id.as_deref(), Some("cardDelivered: true"));
    assert_eq!(order.address_id.as_deref(), Some("addr1"));
}

#[tokio::test]
async fn settlement_targets_the_request_supplied_user_when_present() {
    // The request-level user id override is part of the training surface.
    let world = World::new();
    world.add_basket(1, 7, None, vec![line(10, 10.0, 2)]);
    world.set_balance(8, 50.0);

    let mut req = request(1, Some("wallet"), None);
    req.user_id = Some(8);

    checkout(&world, &buyer(7, 1), req).await;

    assert_eq!(world.balance(8), 50.0 - 20.0 + 2.0);
    assert_eq!(world.balance(7), 0.0);
}
