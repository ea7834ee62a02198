use crate::error::PersistenceError;
use crate::rows::{IndicatorRow, OrderRow, OrderbookRow, PositionRow, PriceRow, SignalRow};
use crate::store::Store;
use async_trait::async_trait;
use tradecore_instrument::{SessionId, Symbol};

/// A `Store` that discards everything. Useful when running with
/// persistence disabled, or in unit tests that only care about the
/// EventBus side-effects of a write.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

#[async_trait]
impl Store for NullStore {
    async fn insert_price(&self, _row: PriceRow) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn insert_prices(&self, _rows: Vec<PriceRow>) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn insert_orderbook(&self, _row: OrderbookRow) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn insert_indicator(&self, _row: IndicatorRow) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn insert_indicators(&self, _rows: Vec<IndicatorRow>) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn upsert_signal(&self, _row: SignalRow) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn upsert_order(&self, _row: OrderRow) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn upsert_position(&self, _row: PositionRow) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn query_prices(&self, _session_id: &SessionId, _symbol: &Symbol) -> Result<Vec<PriceRow>, PersistenceError> {
        Ok(Vec::new())
    }
}
