use async_trait::async_trait;
use tradecore_instrument::{SessionMode, Symbol};

use crate::error::ControllerError;

/// Invoked once, before a session's data stream begins (spec.md §4.3
/// "Pre-start hook"): activates the strategies and registers the indicator
/// variants the session's symbols need. A trait object rather than a direct
/// dependency on `tradecore-strategy`/`tradecore-indicator` — this crate
/// never depends on either, so the composition root supplies the
/// implementation that actually reaches into the `StrategyEvaluator` and
/// `IndicatorEngine`.
///
/// Ported from `execution_controller.py`'s pre-start callback, which plays
/// the same role against the original's strategy/indicator singletons.
#[async_trait]
pub trait PreStartHook: Send + Sync + std::fmt::Debug {
    async fn prepare(&self, mode: SessionMode, symbols: &[Symbol]) -> Result<(), ControllerError>;
}

/// Swaps the active `OrderManager` variant for a mode change (spec.md §4.3
/// "Backtest order-manager swap"): stop whichever manager is wired up,
/// start the one appropriate to `mode`. A trait object for the same reason
/// as [`PreStartHook`] — this crate has no dependency on
/// `tradecore-execution`, so the manager swap happens behind the
/// composition root, never a direct reference the controller holds.
#[async_trait]
pub trait OrderManagerSwap: Send + Sync + std::fmt::Debug {
    async fn swap_to(&self, mode: SessionMode) -> Result<(), ControllerError>;
}

/// A [`PreStartHook`]/[`OrderManagerSwap`] pair that does nothing — the
/// default when a caller wires up the controller without strategies,
/// indicators, or order managers at all (e.g. a data-collection-only
/// deployment, or a unit test exercising just the state machine).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

#[async_trait]
impl PreStartHook for NoopHooks {
    async fn prepare(&self, _mode: SessionMode, _symbols: &[Symbol]) -> Result<(), ControllerError> {
        Ok(())
    }
}

#[async_trait]
impl OrderManagerSwap for NoopHooks {
    async fn swap_to(&self, _mode: SessionMode) -> Result<(), ControllerError> {
        Ok(())
    }
}
