use crate::symbol::{StrategyId, Symbol, VariantId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which of the five strategy sections produced the signal.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum SignalType {
    S1,
    O1,
    Z1,
    Ze1,
    Emergency,
}

/// The action the Order Manager should take in response to a [`Signal`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    LockSymbol,
    Buy,
    Sell,
    Cancel,
    Close,
}

/// Published by the Strategy Evaluator on every section transition
/// (spec.md §4.4). `conditions_met` names the conditions that evaluated
/// true; `indicator_values` is a snapshot of every indicator the symbol
/// currently has state for, for audit/persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub strategy_id: StrategyId,
    pub symbol: Symbol,
    pub signal_type: SignalType,
    pub triggered: bool,
    pub conditions_met: Vec<VariantId>,
    pub indicator_values: BTreeMap<VariantId, f64>,
    pub action: SignalAction,
    pub timestamp_us: i64,
    pub metadata: serde_json::Value,
}
