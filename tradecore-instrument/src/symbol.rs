use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A trading symbol, eg/ `"BTC_USDT"`.
///
/// Cheap to clone (backed by [`SmolStr`], inline for strings up to 23 bytes)
/// since the same symbol is copied into every `Tick`, `OrderbookSnapshot`,
/// `Order`, `Position` and `Signal` that flows across the EventBus.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub struct Symbol(SmolStr);

impl Symbol {
    pub fn new(symbol: impl Into<SmolStr>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl<T> From<T> for Symbol
where
    T: Into<SmolStr>,
{
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// Unique identifier for an [`crate::order::Order`], assigned by the Order Manager.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub struct OrderId(SmolStr);

impl OrderId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }
}

/// Unique identifier for a [`crate::position::Position`].
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub struct PositionId(SmolStr);

impl PositionId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }
}

/// Unique identifier for a [`crate::strategy::Strategy`].
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub struct StrategyId(SmolStr);

impl StrategyId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }
}

/// Unique identifier for an [`crate::variant::IndicatorVariant`].
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub struct VariantId(SmolStr);

impl VariantId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }
}

/// Unique identifier for an [`crate::session::ExecutionSession`], formatted
/// `exec_YYYYMMDD_HHMMSS_<8-hex>` per spec.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub struct SessionId(SmolStr);

impl SessionId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    /// Build a session id from a timestamp and an 8 hex-digit suffix, eg/
    /// `exec_20260728_140501_9f3a1c02`.
    pub fn generate(timestamp: chrono::DateTime<chrono::Utc>, suffix_hex: u32) -> Self {
        Self::new(format!(
            "exec_{}_{:08x}",
            timestamp.format("%Y%m%d_%H%M%S"),
            suffix_hex
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_equality_is_value_based() {
        assert_eq!(Symbol::new("BTC_USDT"), Symbol::from("BTC_USDT"));
    }

    #[test]
    fn session_id_matches_expected_shape() {
        let ts = chrono::DateTime::parse_from_rfc3339("2026-07-28T14:05:01Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let id = SessionId::generate(ts, 0x9f3a1c02);
        assert_eq!(id.to_string(), "exec_20260728_140501_9f3a1c02");
    }
}
