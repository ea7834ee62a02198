#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Tradecore-Coordinator
//!
//! The Trading Coordinator mediator (spec.md §4.6): breaks the circular
//! dependency between the live market adapter (which needs "may I
//! subscribe to symbol X?") and the session manager (which owns the
//! answer). Both sides talk only to [`TradingCoordinator`], and it talks to
//! them only over the [`tradecore_bus::EventBus`] — no direct object
//! references cross that boundary.
//!
//! Ported from `examples/original_source/src/trading/trading_coordinator.py`.

mod coordinator;
mod decision;
mod error;
mod rate_limit;

pub use coordinator::{CoordinatorConfig, CoordinatorHealth, TradingCoordinator};
pub use decision::SubscriptionDecision;
pub use error::CoordinatorError;
