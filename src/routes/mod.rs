pub mod baskets;
pub mod challenges;
pub mod orders;
pub mod reviews;
pub mod wallets;
