use crate::symbol::{Symbol, VariantId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Categorisation used for UI grouping and persistence tagging.
///
/// Carried from the Python original's `VariantType` (see
/// `examples/original_source/.../streaming_indicator_engine/core/types.py`)
/// including its main/secondary chart classification, since downstream
/// persistence still tags rows by this even though no chart renders here.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantType {
    General,
    Risk,
    Price,
    StopLoss,
    TakeProfit,
    CloseOrder,
}

impl VariantType {
    /// Variant types conventionally overlaid on the main price chart.
    pub fn is_main_chart(self) -> bool {
        matches!(
            self,
            VariantType::Price | VariantType::StopLoss | VariantType::TakeProfit | VariantType::CloseOrder
        )
    }

    /// Variant types conventionally overlaid on a secondary chart.
    pub fn is_secondary_chart(self) -> bool {
        matches!(self, VariantType::General | VariantType::Risk)
    }
}

/// A scalar or structured parameter value for an [`IndicatorVariant`].
///
/// Parameters are type-checked against the base type's schema at
/// `create_variant` time (see `tradecore-indicator::registry`); this crate
/// only defines the wire shape.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    Integer(i64),
    Text(String),
    Flag(bool),
}

pub type Parameters = BTreeMap<String, ParameterValue>;

/// Immutable record of a parameterised indicator instance.
///
/// Two variants may share an identical `(base_type, parameters)` pair; in
/// that case the Streaming Indicator Engine may share the underlying
/// calculation (spec.md §3), but each variant still emits
/// `indicator.updated` events under its own `id`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IndicatorVariant {
    pub id: VariantId,
    pub base_type: String,
    pub variant_type: VariantType,
    pub parameters: Parameters,
    pub created_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl IndicatorVariant {
    /// The `(base_type, parameters)` pair used to determine calculation sharing.
    pub fn sharing_key(&self) -> (&str, &Parameters) {
        (self.base_type.as_str(), &self.parameters)
    }
}

/// A single computed indicator value.
///
/// Null values (`value: None`) are permitted and MUST NOT be persisted
/// (spec.md §3) — see `tradecore-persistence::indicator`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IndicatorValue {
    pub timestamp_us: i64,
    pub value: Option<ScalarOrBlob>,
    pub confidence: f64,
    pub metadata: serde_json::Value,
}

impl IndicatorValue {
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }
}

/// An indicator value is either a plain scalar or a structured JSON blob
/// (eg/ MACD's `{macd, signal, histogram}` triple).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ScalarOrBlob {
    Scalar(f64),
    Blob(serde_json::Value),
}

impl ScalarOrBlob {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ScalarOrBlob::Scalar(value) => Some(*value),
            ScalarOrBlob::Blob(_) => None,
        }
    }
}

/// Runtime instance of an [`IndicatorVariant`], bound to a symbol and
/// registered under `(session_id, symbol)` by
/// `tradecore-controller`/`tradecore-indicator`'s session binding path.
///
/// Owned by exactly one Streaming Indicator Engine. The ring buffer itself
/// lives in the engine's arena (keyed by `(symbol, timeframe)`) so that a
/// `StreamingIndicator` never holds a dangling reference if a symbol is
/// unregistered (spec.md §9).
#[derive(Debug, Clone)]
pub struct StreamingIndicatorHandle {
    pub symbol: Symbol,
    pub base_type: String,
    pub variant_id: VariantId,
    pub timeframe: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_type_chart_classification_matches_original() {
        assert!(VariantType::Price.is_main_chart());
        assert!(!VariantType::Price.is_secondary_chart());
        assert!(VariantType::Risk.is_secondary_chart());
        assert!(!VariantType::Risk.is_main_chart());
    }

    #[test]
    fn sharing_key_compares_by_value() {
        let mut params_a = Parameters::new();
        params_a.insert("t1".into(), ParameterValue::Number(30.0));
        let mut params_b = params_a.clone();
        params_b.insert("t1".into(), ParameterValue::Number(30.0));

        let now = chrono::Utc::now();
        let a = IndicatorVariant {
            id: VariantId::new("v1"),
            base_type: "TWPA".into(),
            variant_type: VariantType::Price,
            parameters: params_a,
            created_by: "system".into(),
            created_at: now,
        };
        let b = IndicatorVariant {
            id: VariantId::new("v2"),
            base_type: "TWPA".into(),
            variant_type: VariantType::Price,
            parameters: params_b,
            created_by: "system".into(),
            created_at: now,
        };

        assert_eq!(a.sharing_key(), b.sharing_key());
    }
}
