//! Discount resolution from persisted basket coupons and client-supplied
//! campaign tokens.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Utc};

use crate::checkout::hooks::ChallengeFlag;

/// A promotional campaign: a discount valid on exactly one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Campaign {
    /// Epoch milliseconds of the campaign day's midnight (CET).
    pub valid_on: i64,
    /// Discount percentage granted by the campaign.
    pub discount: u8,
}

/// Immutable table of known campaigns, injected into the resolver.
#[derive(Debug, Clone)]
pub struct CampaignTable {
    campaigns: HashMap<&'static str, Campaign>,
}

impl Default for CampaignTable {
    fn default() -> Self {
        let mut campaigns = HashMap::new();
        campaigns.insert("WMNSDY2019", campaign(2019, 3, 8, 75));
        campaigns.insert("WMNSDY2020", campaign(2020, 3, 8, 60));
        campaigns.insert("WMNSDY2021", campaign(2021, 3, 8, 60));
        campaigns.insert("WMNSDY2022", campaign(2022, 3, 8, 60));
        campaigns.insert("WMNSDY2023", campaign(2023, 3, 8, 60));
        campaigns.insert("ORANGE2020", campaign(2020, 5, 4, 50));
        campaigns.insert("ORANGE2021", campaign(2021, 5, 4, 40));
        campaigns.insert("ORANGE2022", campaign(2022, 5, 4, 40));
        campaigns.insert("ORANGE2023", campaign(2023, 5, 4, 40));
        Self { campaigns }
    }
}

impl CampaignTable {
    pub fn get(&self, code: &str) -> Option<Campaign> {
        self.campaigns.get(code).copied()
    }
}

fn campaign(year: i32, month: u32, day: u32, discount: u8) -> Campaign {
    // Campaign days start at midnight CET (+01:00).
    let valid_on = FixedOffset::east_opt(3600)
        .expect("static offset")
        .with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("static campaign date")
        .timestamp_millis();
    Campaign { valid_on, discount }
}

/// Outcome of discount resolution: a percentage plus the exploit signals
/// observed while resolving. Signals are never acted on here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDiscount {
    pub percent: u8,
    pub signals: Vec<ChallengeFlag>,
}

impl ResolvedDiscount {
    fn none() -> Self {
        Self {
            percent: 0,
            signals: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiscountResolver {
    campaigns: CampaignTable,
}

impl DiscountResolver {
    pub fn new(campaigns: CampaignTable) -> Self {
        Self { campaigns }
    }

    /// A persisted basket coupon always wins over a submitted campaign token.
    /// Malformed input of either kind resolves to zero discount, never an
    /// error.
    pub fn resolve(
        &self,
        coupon: Option<&str>,
        coupon_data: Option<&str>,
        now: DateTime<Utc>,
    ) -> ResolvedDiscount {
        if let Some(percent) = coupon.and_then(|coupon| discount_from_coupon(coupon, now)) {
            let mut signals = Vec::new();
            // Coupons are never issued at 80% or above through legitimate
            // channels, so one resolving that high must be forged.
            if percent >= 80 {
                signals.push(ChallengeFlag::ForgedCoupon);
            }
            return ResolvedDiscount { percent, signals };
        }

        if let Some(data) = coupon_data {
            if let Some((campaign, claimed)) = self.decode_campaign_token(data) {
                // The documented contract is bit-exact equality with the
                // campaign's valid_on instant, not a range check.
                if claimed == campaign.valid_on {
                    let mut signals = Vec::new();
                    if campaign.valid_on < now.timestamp_millis() {
                        signals.push(ChallengeFlag::ManipulatedClock);
                    }
                    return ResolvedDiscount {
                        percent: campaign.discount,
                        signals,
                    };
                }
            }
        }

        ResolvedDiscount::none()
    }

    /// Decodes a base64 `"<CODE>-<epochMillis>"` token. Any shape violation
    /// yields `None`.
    fn decode_campaign_token(&self, data: &str) -> Option<(Campaign, i64)> {
        let decoded = BASE64.decode(data).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let mut segments = decoded.split('-');
        let code = segments.next()?;
        let claimed: i64 = segments.next()?.parse().ok()?;
        let campaign = self.campaigns.get(code)?;
        Some((campaign, claimed))
    }
}

/// Persisted coupons decode to `MMMYY-<percent>` and are only valid during
/// their month.
fn discount_from_coupon(coupon: &str, now: DateTime<Utc>) -> Option<u8> {
    let decoded = BASE64.decode(coupon).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (validity, percent) = decoded.split_once('-')?;
    let percent: u8 = percent.parse().ok()?;
    if !(1..=99).contains(&percent) {
        return None;
    }
    if validity != current_month_tag(now) {
        return None;
    }
    Some(percent)
}

fn current_month_tag(now: DateTime<Utc>) -> String {
    const MONTHS: [&str; 12] = [
        "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
    ];
    format!("{}{:02}", MONTHS[now.month0() as usize], now.year() % 100)
}
