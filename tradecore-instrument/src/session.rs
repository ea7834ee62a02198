use crate::symbol::{SessionId, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The data-source / execution backend a session runs against.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionMode {
    Backtest,
    Live,
    Paper,
    DataCollection,
}

/// Lifecycle status of an [`ExecutionSession`].
///
/// Valid transitions are enumerated in spec.md §4.3; see
/// `tradecore-controller::fsm` for the transition table and enforcement.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum SessionStatus {
    Idle,
    Starting,
    Running,
    Paused,
    Stopping,
    Stopped,
    Error,
}

/// A single execution context (backtest/live/paper/data-collection).
///
/// Exactly one may exist per process at any time (spec.md §3). Owned by
/// `tradecore-controller`'s `ExecutionController`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSession {
    pub session_id: SessionId,
    pub mode: SessionMode,
    pub symbols: Vec<Symbol>,
    pub status: SessionStatus,
    pub parameters: BTreeMap<String, serde_json::Value>,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    /// 0.0..=1.0
    pub progress: f64,
    pub metrics: BTreeMap<String, f64>,
    pub error_message: Option<String>,
}

impl ExecutionSession {
    pub fn new(session_id: SessionId, mode: SessionMode, symbols: Vec<Symbol>) -> Self {
        Self {
            session_id,
            mode,
            symbols,
            status: SessionStatus::Idle,
            parameters: BTreeMap::new(),
            start_time: None,
            end_time: None,
            progress: 0.0,
            metrics: BTreeMap::new(),
            error_message: None,
        }
    }
}
