//! Target-share normalization and the balance verdict.

mod normalize;
mod status;

pub use normalize::normalize_percentages;
pub use status::{balance_status, BalanceStatus, CategoryShare};
