use crate::symbol::{StrategyId, VariantId};
use serde::{Deserialize, Serialize};

/// Comparison operator for a [`Condition`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
}

impl Operator {
    /// Epsilon used for `==` comparisons, per spec.md §4.4.
    pub const EPSILON: f64 = 1e-9;

    pub fn evaluate(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Operator::Gt => lhs > rhs,
            Operator::Lt => lhs < rhs,
            Operator::Ge => lhs >= rhs,
            Operator::Le => lhs <= rhs,
            Operator::Eq => (lhs - rhs).abs() < Self::EPSILON,
        }
    }
}

/// Logic connector attached to a [`Condition`], combining it with the
/// running evaluation accumulator. `Not` inverts the condition's own result
/// rather than combining two results (spec.md §4.4).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicConnector {
    #[default]
    And,
    Or,
    Not,
}

/// A single comparison against a named indicator's latest value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Condition {
    pub indicator_id: VariantId,
    pub operator: Operator,
    pub value: f64,
    #[serde(default)]
    pub logic: LogicConnector,
}

impl Condition {
    pub fn new(indicator_id: VariantId, operator: Operator, value: f64) -> Self {
        Self {
            indicator_id,
            operator,
            value,
            logic: LogicConnector::default(),
        }
    }

    pub fn with_logic(mut self, logic: LogicConnector) -> Self {
        self.logic = logic;
        self
    }
}

/// An ordered list of [`Condition`]s making up one of the five strategy
/// sections (S1, O1, Z1, ZE1, Emergency).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ConditionGroup {
    pub conditions: Vec<Condition>,
    /// O1-only: seconds since `signal_start_time` after which the group is
    /// considered satisfied regardless of its conditions (spec.md §4.4).
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// Emergency-only: minimum seconds between two emergency triggers for
    /// the same `(strategy, symbol)` (spec.md §3, `emergency_cooldown_until`).
    #[serde(default)]
    pub cooldown_seconds: Option<u64>,
}

impl ConditionGroup {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self {
            conditions,
            timeout_seconds: None,
            cooldown_seconds: None,
        }
    }
}

/// Directional bias a strategy is permitted to trade.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StrategyDirection {
    Long,
    Short,
    Both,
}

/// A trading strategy: five condition groups gating the
/// `IDLE -> S1_ACTIVE -> Z1_ACTIVE -> ZE1_ACTIVE -> IDLE` symbol state
/// machine, with Emergency checked ahead of every other section
/// (spec.md §3, §4.4).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Strategy {
    pub id: StrategyId,
    pub name: String,
    pub direction: StrategyDirection,
    pub enabled: bool,
    /// Signal Detection.
    pub s1: ConditionGroup,
    /// Entry.
    pub z1: ConditionGroup,
    /// Close.
    pub ze1: ConditionGroup,
    /// Cancel.
    pub o1: ConditionGroup,
    pub emergency: ConditionGroup,
}
