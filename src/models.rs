use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// Baskets

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::baskets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BasketEntity {
    pub id: i32,
    pub user_id: i32,
    pub coupon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::basket_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BasketItemEntity {
    pub basket_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Products

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductEntity {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub deluxe_price: f64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

// Delivery methods

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::delivery_methods)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DeliveryMethodEntity {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub deluxe_price: f64,
    pub eta: i32,
}

// Wallets

#[derive(Queryable, Selectable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::wallets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WalletEntity {
    pub user_id: i32,
    pub balance: f64,
    pub updated_at: DateTime<Utc>,
}

// Orders

#[derive(Queryable, Selectable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: String,
    pub email: String,
    pub total_price: f64,
    pub products: Value,
    pub bonus: i64,
    pub promotional_amount: f64,
    pub delivery_price: f64,
    pub eta: i32,
    pub delivered: bool,
    pub payment_id: Option<String>,
    pub address_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct CreateOrderEntity {
    pub id: String,
    pub email: String,
    pub total_price: f64,
    pub products: Value,
    pub bonus: i64,
    pub promotional_amount: f64,
    pub delivery_price: f64,
    pub eta: i32,
    pub delivered: bool,
    pub payment_id: Option<String>,
    pub address_id: Option<String>,
}

// Reviews

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReviewEntity {
    pub id: i32,
    pub product_id: i32,
    pub author: String,
    pub message: String,
    pub likes_count: i32,
    pub liked_by: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::reviews)]
pub struct CreateReviewEntity {
    pub product_id: i32,
    pub author: String,
    pub message: String,
    pub likes_count: i32,
    pub liked_by: Value,
}

// Challenges

#[derive(Queryable, Selectable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::challenges)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChallengeEntity {
    pub key: String,
    pub name: String,
    pub solved: bool,
    pub solved_at: Option<DateTime<Utc>>,
}
