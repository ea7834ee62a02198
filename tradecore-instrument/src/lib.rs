#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]

//! # Tradecore-Instrument
//!
//! Core data model shared by every other crate in the tradecore workspace:
//! market data (`Tick`, `OrderbookSnapshot`), the indicator variant record,
//! strategy configuration (`Strategy`, `Condition`), order/position/signal
//! records, and the session/symbol-state types that the Execution Controller
//! and Strategy Evaluator own.
//!
//! Nothing in this crate performs I/O or owns a runtime; it only defines the
//! shapes that flow across the EventBus.

/// The [`Symbol`] newtype and associated identifiers.
pub mod symbol;

/// [`Tick`] and [`OrderbookSnapshot`] market data types.
pub mod market_data;

/// [`IndicatorVariant`], [`VariantType`] and the runtime [`StreamingIndicator`] shell.
pub mod variant;

/// [`Strategy`], condition groups and the [`Condition`] DSL.
pub mod strategy;

/// [`SymbolState`] and the per-`(strategy, symbol)` state machine.
pub mod symbol_state;

/// [`ExecutionSession`], [`SessionMode`] and [`SessionStatus`].
pub mod session;

/// [`Order`] and its lifecycle status.
pub mod order;

/// [`Position`] and its lifecycle status.
pub mod position;

/// [`Signal`] published by the Strategy Evaluator.
pub mod signal;

pub use market_data::{OrderLevel, OrderbookSnapshot, Tick};
pub use order::{Order, OrderSide, OrderStatus, OrderType};
pub use position::{Position, PositionSide, PositionStatus};
pub use session::{ExecutionSession, SessionMode, SessionStatus};
pub use signal::{Signal, SignalAction, SignalType};
pub use strategy::{Condition, ConditionGroup, LogicConnector, Operator, Strategy, StrategyDirection};
pub use symbol::{OrderId, PositionId, SessionId, StrategyId, Symbol, VariantId};
pub use symbol_state::{SymbolFsmState, SymbolState};
pub use variant::{
    IndicatorValue, IndicatorVariant, ParameterValue, Parameters, ScalarOrBlob, StreamingIndicatorHandle,
    VariantType,
};
