//! Challenge trigger hooks: pure observers over intermediate pipeline values.
//! Detection never alters a pipeline outcome; registry failures are logged
//! and swallowed.

use crate::checkout::stores::{BasketLine, ChallengeRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeFlag {
    /// A persisted coupon resolved to a discount no legitimate channel issues.
    ForgedCoupon,
    /// A campaign discount was honored although its window had closed.
    ManipulatedClock,
    /// The seasonal special product was purchased.
    SeasonalItem,
    /// The order's final total went below zero.
    NegativeTotal,
    /// A basket belonging to another user was accessed.
    BasketAccess,
    /// The same user got more than two likes onto a single review.
    LikeRace,
    /// A review was created under someone else's name.
    ForgedReview,
}

impl ChallengeFlag {
    pub fn key(self) -> &'static str {
        match self {
            ChallengeFlag::ForgedCoupon => "forged_coupon",
            ChallengeFlag::ManipulatedClock => "manipulate_clock",
            ChallengeFlag::SeasonalItem => "seasonal_special",
            ChallengeFlag::NegativeTotal => "negative_order",
            ChallengeFlag::BasketAccess => "basket_access",
            ChallengeFlag::LikeRace => "like_race",
            ChallengeFlag::ForgedReview => "forged_review",
        }
    }
}

pub fn seasonal_item_flag(items: &[BasketLine], seasonal_product_id: i32) -> Option<ChallengeFlag> {
    items
        .iter()
        .any(|item| item.product_id == seasonal_product_id)
        .then_some(ChallengeFlag::SeasonalItem)
}

pub fn negative_total_flag(adjusted_price: f64) -> Option<ChallengeFlag> {
    (adjusted_price < 0.0).then_some(ChallengeFlag::NegativeTotal)
}

/// Marks flags solved through the registry. The pipeline must not fail
/// because scoring did.
pub async fn observe(
    registry: &dyn ChallengeRegistry,
    flags: impl IntoIterator<Item = ChallengeFlag>,
) {
    for flag in flags {
        if let Err(err) = registry.solve(flag).await {
            tracing::warn!(flag = flag.key(), "Failed to mark challenge solved: {err:#}");
        }
    }
}
