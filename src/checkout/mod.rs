//! Order placement pipeline: discount resolution, delivery pricing, receipt
//! composition, wallet settlement and the challenge hooks observing it all.

pub mod campaign;
pub mod delivery;
pub mod hooks;
pub mod pipeline;
pub mod receipt;
pub mod stores;

pub use campaign::{CampaignTable, DiscountResolver};
pub use hooks::ChallengeFlag;
pub use pipeline::{
    CheckoutError, CheckoutOutcome, CheckoutRequest, CleanupOutcome, OrderDetails, OrderPipeline,
    PipelineSettings,
};
