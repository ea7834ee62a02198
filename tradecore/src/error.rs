use thiserror::Error;

use tradecore_controller::ControllerError;
use tradecore_coordinator::CoordinatorError;
use tradecore_exchange::ExchangeError;
use tradecore_indicator::IndicatorError;
use tradecore_persistence::PersistenceError;
use tradecore_risk::BudgetValidationError;

/// Aggregates every collaborator error into the one type the composition
/// root's command surface (spec.md §6 "Operator surface") returns,
/// following `barter::error::BarterError`'s shape: one variant per
/// collaborator, each wrapping that collaborator's own error type rather
/// than flattening it into a string.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("execution controller: {0}")]
    Controller(#[from] ControllerError),

    #[error("trading coordinator: {0}")]
    Coordinator(#[from] CoordinatorError),

    #[error("exchange adapter: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("indicator engine: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("persistence: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("risk budget configuration invalid: {0}")]
    Budget(#[from] BudgetValidationError),

    #[error("no strategy registered with id {0}")]
    UnknownStrategy(String),

    #[error("engine background task panicked: {0}")]
    JoinError(String),
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::JoinError(value.to_string())
    }
}

/// `{success, error?, error_type?}` response shape spec.md §6/§7 require
/// every operator command to return.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CommandResponse {
    pub success: bool,
    pub session_id: Option<String>,
    pub error: Option<String>,
    pub error_type: Option<String>,
}

impl CommandResponse {
    pub fn ok(session_id: impl Into<String>) -> Self {
        Self {
            success: true,
            session_id: Some(session_id.into()),
            error: None,
            error_type: None,
        }
    }

    pub fn failed(error: &EngineError) -> Self {
        Self {
            success: false,
            session_id: None,
            error: Some(error.to_string()),
            error_type: Some(error_type_tag(error)),
        }
    }
}

fn error_type_tag(error: &EngineError) -> String {
    match error {
        EngineError::Controller(_) => "InvalidStateTransition".to_string(),
        EngineError::Coordinator(_) => "SubscriberFailure".to_string(),
        EngineError::Exchange(_) => "ExchangeError".to_string(),
        EngineError::Indicator(_) => "ValidationError".to_string(),
        EngineError::Persistence(_) => "PersistenceError".to_string(),
        EngineError::Budget(_) => "ValidationError".to_string(),
        EngineError::UnknownStrategy(_) => "ValidationError".to_string(),
        EngineError::JoinError(_) => "Timeout".to_string(),
    }
}
