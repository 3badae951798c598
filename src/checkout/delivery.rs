//! Delivery pricing: catalog lookup with a zero-cost, five-day fallback.

use anyhow::Result;

use crate::checkout::stores::{DeliveryCatalog, DeliveryMethod};

impl DeliveryMethod {
    /// Deluxe members ship at the deluxe rate.
    pub fn effective_price(&self, is_deluxe: bool) -> f64 {
        if is_deluxe { self.deluxe_price } else { self.price }
    }
}

/// Resolves the chosen delivery method; an absent or unknown id falls back
/// to the default method.
pub async fn resolve_delivery(
    catalog: &dyn DeliveryCatalog,
    id: Option<i32>,
) -> Result<DeliveryMethod> {
    match id {
        Some(id) => Ok(catalog.find_by_id(id).await?.unwrap_or_default()),
        None => Ok(DeliveryMethod::default()),
    }
}
