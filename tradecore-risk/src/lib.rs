#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Tradecore-Risk
//!
//! Risk Manager (spec.md §4.8): stateless with respect to market data,
//! stateful with respect to budget and exposure. `can_open_position` is the
//! synchronous pre-submit gate every `OrderManager` variant consults before
//! placing an order (spec.md §9, "async-to-sync boundary" — it reads
//! snapshot state and returns a decision without awaiting anything).
//!
//! Exposure/drawdown/correlation tracking is carried over from the
//! teacher's own `jackbot-risk` crate (`exposure.rs`, `drawdown.rs`,
//! `correlation.rs`, `volatility.rs`), generalised from
//! `InstrumentIndex`-keyed to `Symbol`-keyed since this workspace has no
//! instrument-index registry.

mod budget;
mod correlation;
mod decision;
mod drawdown;
mod exposure;
mod manager;
mod volatility;

pub use budget::{Allocation, BudgetConfig, BudgetSummary, BudgetValidationError};
pub use correlation::CorrelationTracker;
pub use decision::{Decision, RiskDenialReason};
pub use drawdown::DrawdownTracker;
pub use exposure::ExposureTracker;
pub use manager::{LeverageLimits, RiskManager};
pub use volatility::VolatilityScaler;
