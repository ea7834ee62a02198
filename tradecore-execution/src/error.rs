use thiserror::Error;

/// Failures surfaced by an `OrderManager` variant (spec.md §4.5, §7).
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("risk manager denied order for {symbol}: {reason:?}")]
    RiskDenied {
        symbol: String,
        reason: tradecore_risk::RiskDenialReason,
    },

    #[error("exchange adapter error: {0}")]
    Exchange(#[from] tradecore_exchange::ExchangeError),

    #[error("no open position for symbol {0}")]
    NoPosition(String),

    #[error("malformed signal_generated payload: {0}")]
    MalformedSignal(String),
}
