use crate::error::PersistenceError;
use crate::rows::{IndicatorRow, OrderRow, OrderbookRow, PositionRow, PriceRow, SignalRow};
use async_trait::async_trait;
use tradecore_instrument::{SessionId, Symbol};

/// The time-series store interface (spec.md §6). A Postgres-wire/ILP TSDB
/// in production; [`crate::InMemoryStore`] and [`crate::NullStore`] satisfy
/// the same contract for tests and data-collection-only deployments.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_price(&self, row: PriceRow) -> Result<(), PersistenceError>;

    /// Bulk path, used when flushing batched ticks (spec.md §4.3 main loop
    /// and §4.9 "the engine uses batch when flushing scheduler outputs").
    async fn insert_prices(&self, rows: Vec<PriceRow>) -> Result<(), PersistenceError>;

    async fn insert_orderbook(&self, row: OrderbookRow) -> Result<(), PersistenceError>;

    async fn insert_indicator(&self, row: IndicatorRow) -> Result<(), PersistenceError>;

    async fn insert_indicators(&self, rows: Vec<IndicatorRow>) -> Result<(), PersistenceError>;

    async fn upsert_signal(&self, row: SignalRow) -> Result<(), PersistenceError>;

    /// Insert on `order_created`, upsert (keyed by `order_id`) on every
    /// subsequent `order_filled`/`order_cancelled` (spec.md §4.7).
    async fn upsert_order(&self, row: OrderRow) -> Result<(), PersistenceError>;

    /// Upsert keyed by `position_id` (spec.md §4.7).
    async fn upsert_position(&self, row: PositionRow) -> Result<(), PersistenceError>;

    /// Historical replay source for `DataSource::Historical` (spec.md §4.3):
    /// every price row recorded for `session_id`/`symbol`, timestamp order.
    async fn query_prices(&self, session_id: &SessionId, symbol: &Symbol) -> Result<Vec<PriceRow>, PersistenceError>;
}
