#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Tradecore-Controller
//!
//! The Execution Controller (spec.md §4.3): owns the single
//! [`tradecore_instrument::ExecutionSession`] a process may run at a time,
//! the symbol lease table guarding it, and the background pipeline task
//! that drains a [`DataSource`] into the EventBus. `fsm` pins the legal
//! session-status transition table; [`hooks`] is the seam the composition
//! root uses to wire strategy activation / indicator registration / order
//! manager swaps in without this crate depending on any of those crates
//! directly.
//!
//! Ported from
//! `examples/original_source/src/application/controllers/execution_controller.py`.

mod controller;
mod data_source;
mod error;
mod file_source;
mod fsm;
mod historical_source;
mod hooks;
mod lease;
mod live_source;

pub use controller::ExecutionController;
pub use data_source::{DataSource, MarketBatchEvent};
pub use error::ControllerError;
pub use file_source::FileDataSource;
pub use fsm::{allows_early_stop, is_valid_transition};
pub use historical_source::HistoricalDataSource;
pub use hooks::{NoopHooks, OrderManagerSwap, PreStartHook};
pub use lease::SymbolLeaseTable;
pub use live_source::LiveDataSource;
