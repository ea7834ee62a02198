use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tradecore_instrument::{OrderId, PositionId, SessionId, StrategyId, Symbol, VariantId};

/// Row shape for the `prices` table (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRow {
    pub session_id: SessionId,
    pub symbol: Symbol,
    pub timestamp_us: i64,
    pub price: Decimal,
    pub volume: Decimal,
    pub quote_volume: Option<Decimal>,
}

/// Row shape for the `orderbooks` table. `bids`/`asks` are stored as JSON,
/// matching the jsonb columns the spec's TSDB schema calls for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderbookRow {
    pub session_id: SessionId,
    pub symbol: Symbol,
    pub timestamp_us: i64,
    pub bids: serde_json::Value,
    pub asks: serde_json::Value,
}

/// Row shape for the `indicators` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub session_id: SessionId,
    pub symbol: Symbol,
    pub indicator_id: VariantId,
    pub indicator_type: String,
    pub timestamp_us: i64,
    pub value: serde_json::Value,
    pub confidence: f64,
    pub metadata: serde_json::Value,
}

/// Row shape for the `strategy_signals` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRow {
    pub strategy_id: StrategyId,
    pub symbol: Symbol,
    pub signal_type: String,
    pub timestamp_us: i64,
    pub triggered: bool,
    pub conditions_met: serde_json::Value,
    pub indicator_values: serde_json::Value,
    pub action: String,
    pub metadata: serde_json::Value,
}

/// Row shape for the `orders` table. Keyed by `order_id`; `order_filled`
/// upserts the row that `order_created` originally inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRow {
    pub order_id: OrderId,
    pub strategy_id: StrategyId,
    pub symbol: Symbol,
    pub side: String,
    pub order_type: String,
    pub timestamp_us: i64,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub filled_quantity: Decimal,
    pub filled_price: Option<Decimal>,
    pub status: String,
    pub commission: Decimal,
    pub metadata: serde_json::Value,
}

/// Row shape for the `positions` table. Keyed by `position_id`;
/// `position_updated` upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRow {
    pub position_id: PositionId,
    pub strategy_id: StrategyId,
    pub symbol: Symbol,
    pub timestamp_us: i64,
    pub side: String,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub status: String,
    pub metadata: serde_json::Value,
}
