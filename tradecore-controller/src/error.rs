use thiserror::Error;
use tradecore_exchange::ExchangeError;
use tradecore_instrument::{SessionId, SessionStatus, Symbol};
use tradecore_persistence::PersistenceError;

/// Error kinds the Execution Controller surfaces to callers (spec.md §7).
/// Control-path errors (`InvalidStateTransition`, `SymbolConflict`,
/// `NoActiveSession`) always leave the session in a consistent state; the
/// controller never mutates `current` before validating a transition.
#[derive(Debug, Error, Clone)]
pub enum ControllerError {
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition { from: SessionStatus, to: SessionStatus },

    #[error("symbol {symbol} already leased by session {active_session}")]
    SymbolConflict { symbol: Symbol, active_session: SessionId },

    #[error("no active session")]
    NoActiveSession,

    #[error("pre-start hook failed: {0}")]
    PreStartHookFailed(String),

    #[error("order manager swap failed: {0}")]
    OrderManagerSwapFailed(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error("data source io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ControllerError {
    fn from(err: std::io::Error) -> Self {
        ControllerError::Io(err.to_string())
    }
}
