use crate::error::PersistenceError;
use crate::rows::{IndicatorRow, OrderRow, OrderbookRow, PositionRow, PriceRow, SignalRow};
use crate::store::Store;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tradecore_instrument::{OrderId, PositionId, SessionId, Symbol};

/// Process-local `Store`. Suitable for tests, backtests run in a single
/// process, and small paper-trading deployments that don't need a real
/// TSDB. Ported in structure from the teacher's `InMemoryRepository`
/// (plain `HashMap`s behind a mutex, `Result`-returning methods) but async
/// since a real `Store` implementation performs network I/O.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    prices: Mutex<HashMap<(SessionId, Symbol), Vec<PriceRow>>>,
    orderbooks: Mutex<HashMap<(SessionId, Symbol), Vec<OrderbookRow>>>,
    indicators: Mutex<HashMap<(SessionId, Symbol), Vec<IndicatorRow>>>,
    signals: Mutex<Vec<SignalRow>>,
    orders: Mutex<HashMap<OrderId, OrderRow>>,
    positions: Mutex<HashMap<PositionId, PositionRow>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders_snapshot(&self) -> Vec<OrderRow> {
        self.orders.lock().values().cloned().collect()
    }

    pub fn positions_snapshot(&self) -> Vec<PositionRow> {
        self.positions.lock().values().cloned().collect()
    }

    pub fn signals_snapshot(&self) -> Vec<SignalRow> {
        self.signals.lock().clone()
    }

    pub fn indicators_snapshot(&self) -> Vec<IndicatorRow> {
        self.indicators.lock().values().flatten().cloned().collect()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_price(&self, row: PriceRow) -> Result<(), PersistenceError> {
        let key = (row.session_id.clone(), row.symbol.clone());
        self.prices.lock().entry(key).or_default().push(row);
        Ok(())
    }

    async fn insert_prices(&self, rows: Vec<PriceRow>) -> Result<(), PersistenceError> {
        let mut prices = self.prices.lock();
        for row in rows {
            let key = (row.session_id.clone(), row.symbol.clone());
            prices.entry(key).or_default().push(row);
        }
        Ok(())
    }

    async fn insert_orderbook(&self, row: OrderbookRow) -> Result<(), PersistenceError> {
        let key = (row.session_id.clone(), row.symbol.clone());
        self.orderbooks.lock().entry(key).or_default().push(row);
        Ok(())
    }

    async fn insert_indicator(&self, row: IndicatorRow) -> Result<(), PersistenceError> {
        let key = (row.session_id.clone(), row.symbol.clone());
        self.indicators.lock().entry(key).or_default().push(row);
        Ok(())
    }

    async fn insert_indicators(&self, rows: Vec<IndicatorRow>) -> Result<(), PersistenceError> {
        let mut indicators = self.indicators.lock();
        for row in rows {
            let key = (row.session_id.clone(), row.symbol.clone());
            indicators.entry(key).or_default().push(row);
        }
        Ok(())
    }

    async fn upsert_signal(&self, row: SignalRow) -> Result<(), PersistenceError> {
        self.signals.lock().push(row);
        Ok(())
    }

    async fn upsert_order(&self, row: OrderRow) -> Result<(), PersistenceError> {
        self.orders.lock().insert(row.order_id.clone(), row);
        Ok(())
    }

    async fn upsert_position(&self, row: PositionRow) -> Result<(), PersistenceError> {
        self.positions.lock().insert(row.position_id.clone(), row);
        Ok(())
    }

    async fn query_prices(&self, session_id: &SessionId, symbol: &Symbol) -> Result<Vec<PriceRow>, PersistenceError> {
        Ok(self
            .prices
            .lock()
            .get(&(session_id.clone(), symbol.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn price_row(session: &str, symbol: &str, ts: i64) -> PriceRow {
        PriceRow {
            session_id: SessionId::new(session),
            symbol: Symbol::new(symbol),
            timestamp_us: ts,
            price: dec!(100),
            volume: dec!(1),
            quote_volume: None,
        }
    }

    #[tokio::test]
    async fn query_prices_returns_only_rows_for_the_matching_session_and_symbol() {
        let store = InMemoryStore::new();
        store.insert_price(price_row("s1", "BTC_USDT", 1)).await.unwrap();
        store.insert_price(price_row("s1", "BTC_USDT", 2)).await.unwrap();
        store.insert_price(price_row("s2", "BTC_USDT", 3)).await.unwrap();

        let rows = store
            .query_prices(&SessionId::new("s1"), &Symbol::new("BTC_USDT"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn upsert_order_replaces_the_row_for_the_same_order_id() {
        let store = InMemoryStore::new();
        let mut row = OrderRow {
            order_id: OrderId::new("o1"),
            strategy_id: tradecore_instrument::StrategyId::new("s1"),
            symbol: Symbol::new("BTC_USDT"),
            side: "BUY".into(),
            order_type: "MARKET".into(),
            timestamp_us: 0,
            quantity: dec!(1),
            price: None,
            filled_quantity: dec!(0),
            filled_price: None,
            status: "NEW".into(),
            commission: dec!(0),
            metadata: serde_json::Value::Null,
        };
        store.upsert_order(row.clone()).await.unwrap();
        row.status = "FILLED".into();
        row.filled_quantity = dec!(1);
        store.upsert_order(row).await.unwrap();

        let rows = store.orders_snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "FILLED");
    }
}
