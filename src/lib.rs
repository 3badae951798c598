pub mod checkout;
pub mod core;
pub mod models;
pub mod reviews;
pub mod routes;
pub mod schema;
pub mod stores;
