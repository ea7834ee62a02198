#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Tradecore
//!
//! Composition root for the tradecore real-time crypto trading platform
//! (spec.md §1-§2). Wires the [`tradecore_bus::EventBus`], the Streaming
//! Indicator Engine, the Strategy Evaluator, the Execution Controller, the
//! Order Manager variants, the Trading Coordinator, and the persistence
//! writers behind one [`Engine`] type — the Rust analogue of the teacher's
//! top-level `jackbot`/`barter` crate.
//!
//! Re-exports every collaborator crate's public surface under its own
//! module so a caller can depend on `tradecore` alone for the whole
//! trading core, the way `jackbot`/`barter` re-export their workspace.

mod config;
mod engine;
mod error;

/// Default `tracing` initialisers (spec.md's ambient "Logging" section).
pub mod logging;

pub use config::{
    CoordinatorSettings, EngineConfig, EventBusSettings, IndicatorSettings, OrderManagerSettings, SchedulerConfig,
};
pub use engine::Engine;
pub use error::{CommandResponse, EngineError};

/// EventBus (spec.md §4.1).
pub mod bus {
    pub use tradecore_bus::*;
}

/// Data model shared across every collaborator (spec.md §3).
pub mod instrument {
    pub use tradecore_instrument::*;
}

/// Exchange Adapter Interface (spec.md §6).
pub mod exchange {
    pub use tradecore_exchange::*;
}

/// Time-series Store Interface, Trading Persistence, Indicator Persistence
/// (spec.md §6, §4.7, §4.9).
pub mod persistence {
    pub use tradecore_persistence::*;
}

/// Streaming Indicator Engine (spec.md §4.2).
pub mod indicator {
    pub use tradecore_indicator::*;
}

/// Risk Manager (spec.md §4.8).
pub mod risk {
    pub use tradecore_risk::*;
}

/// Strategy Evaluator (spec.md §4.4).
pub mod strategy {
    pub use tradecore_strategy::*;
}

/// Order Manager variants, Position Sync (spec.md §4.5).
pub mod execution {
    pub use tradecore_execution::*;
}

/// Trading Coordinator mediator (spec.md §4.6).
pub mod coordinator {
    pub use tradecore_coordinator::*;
}

/// Execution Controller: session state machine, data-source pipeline,
/// symbol leasing (spec.md §4.3).
pub mod controller {
    pub use tradecore_controller::*;
}
