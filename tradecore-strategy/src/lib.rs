#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Tradecore-Strategy
//!
//! The Strategy Evaluator (spec.md §4.4): consumes `indicator.updated`,
//! evaluates each loaded [`tradecore_instrument::Strategy`]'s five
//! condition sections against a per-symbol indicator cache, drives the
//! `Idle -> S1 -> Z1 -> Ze1 -> Idle` [`tradecore_instrument::SymbolFsmState`]
//! machine (with Emergency checked ahead of every section on every update),
//! and publishes `signal_generated`.
//!
//! Ported from
//! `examples/original_source/src/engine/strategy_evaluator_4section.py`'s
//! `StrategyEvaluator4Section`.

mod evaluator;
mod manager;
mod state;

pub use evaluator::evaluate_group;
pub use manager::StrategyEvaluator;
pub use state::{IndicatorCache, StrategySymbolKey, SymbolStateTable};
