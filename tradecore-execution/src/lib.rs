#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Tradecore-Execution
//!
//! Order Manager (spec.md §4.5): one contract, three execution backends
//! (live/paper/backtest), plus [`PositionSync`], the netted per-symbol
//! position book every variant reconciles fills through.
//!
//! Each variant self-subscribes to `signal_generated` on construction and
//! exposes its [`tradecore_bus::SubscriptionId`] via the [`OrderManager`]
//! trait so the Execution Controller can unsubscribe the outgoing variant
//! and subscribe the incoming one on a session mode switch — this crate has
//! no dependency on `tradecore-strategy` or `tradecore-controller`, so the
//! "hot swap" happens entirely through the EventBus, never a direct
//! reference (spec.md §4.3, §4.5, §9).

mod backtest;
mod error;
mod live;
mod order_manager;
mod paper;
mod position_sync;

pub use backtest::BacktestOrderManager;
pub use error::ExecutionError;
pub use live::LiveOrderManager;
pub use order_manager::{OrderManager, OrderManagerConfig};
pub use paper::PaperOrderManager;
pub use position_sync::PositionSync;
