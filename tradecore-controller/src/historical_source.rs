use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tradecore_instrument::{SessionId, Symbol, Tick};
use tradecore_persistence::Store;

use crate::data_source::{DataSource, MarketBatchEvent};
use crate::error::ControllerError;

/// Replays persisted ticks for a backtest (spec.md §4.3 BACKTEST mode).
/// Loads every symbol's rows up front via `Store::query_prices`, merges them
/// into a single timestamp-ordered queue, and drains it in fixed-size
/// batches so the controller's pipeline loop sees roughly the same shape of
/// work regardless of which `DataSource` is plugged in.
///
/// Grounded on `tradecore-persistence`'s `Store::query_prices`, the only
/// query method the store trait exposes that returns historical rows keyed
/// by `(session_id, symbol)` — this is why backtest replay is price-only and
/// has no orderbook counterpart.
pub struct HistoricalDataSource {
    store: Arc<dyn Store>,
    source_session: SessionId,
    symbols: Vec<Symbol>,
    batch_size: usize,
    queue: Mutex<Option<VecDeque<Tick>>>,
    total: AtomicUsize,
    emitted: AtomicUsize,
}

impl std::fmt::Debug for HistoricalDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoricalDataSource")
            .field("source_session", &self.source_session)
            .field("symbols", &self.symbols)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl HistoricalDataSource {
    /// `source_session` is the session whose persisted rows are being
    /// replayed — not necessarily the new session id the replay is run
    /// under, since a backtest commonly replays data captured under a prior
    /// DATA_COLLECTION session.
    pub fn new(store: Arc<dyn Store>, source_session: SessionId, symbols: Vec<Symbol>, batch_size: usize) -> Self {
        Self {
            store,
            source_session,
            symbols,
            batch_size: batch_size.max(1),
            queue: Mutex::new(None),
            total: AtomicUsize::new(0),
            emitted: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DataSource for HistoricalDataSource {
    async fn start_stream(&self) -> Result<(), ControllerError> {
        let mut merged: Vec<Tick> = Vec::new();
        for symbol in &self.symbols {
            let rows = self.store.query_prices(&self.source_session, symbol).await?;
            merged.extend(rows.into_iter().map(|row| {
                let mut tick = Tick::new(row.symbol, row.timestamp_us, row.price, row.volume);
                if let Some(quote_volume) = row.quote_volume {
                    tick = tick.with_quote_volume(quote_volume);
                }
                tick
            }));
        }
        merged.sort_by_key(|tick| tick.timestamp_us);

        self.total.store(merged.len(), Ordering::SeqCst);
        self.emitted.store(0, Ordering::SeqCst);
        *self.queue.lock() = Some(merged.into());
        Ok(())
    }

    async fn next_batch(&self) -> Result<Option<Vec<MarketBatchEvent>>, ControllerError> {
        let mut guard = self.queue.lock();
        let queue = match guard.as_mut() {
            Some(queue) => queue,
            None => return Ok(None),
        };
        if queue.is_empty() {
            return Ok(None);
        }

        let mut batch = Vec::with_capacity(self.batch_size.min(queue.len()));
        for _ in 0..self.batch_size {
            match queue.pop_front() {
                Some(tick) => batch.push(MarketBatchEvent::Price(tick)),
                None => break,
            }
        }
        self.emitted.fetch_add(batch.len(), Ordering::SeqCst);
        Ok(Some(batch))
    }

    async fn stop_stream(&self) -> Result<(), ControllerError> {
        *self.queue.lock() = None;
        Ok(())
    }

    fn progress(&self) -> Option<f64> {
        let total = self.total.load(Ordering::SeqCst);
        if total == 0 {
            return Some(1.0);
        }
        let emitted = self.emitted.load(Ordering::SeqCst);
        Some(emitted as f64 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradecore_persistence::{InMemoryStore, PriceRow};

    #[tokio::test]
    async fn replays_ticks_in_timestamp_order_across_symbols() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let session = SessionId::new("exec_seed");
        store
            .insert_prices(vec![
                PriceRow {
                    session_id: session.clone(),
                    symbol: Symbol::new("ETH_USDT"),
                    timestamp_us: 2_000,
                    price: dec!(10),
                    volume: dec!(1),
                    quote_volume: None,
                },
                PriceRow {
                    session_id: session.clone(),
                    symbol: Symbol::new("BTC_USDT"),
                    timestamp_us: 1_000,
                    price: dec!(100),
                    volume: dec!(1),
                    quote_volume: None,
                },
            ])
            .await
            .unwrap();

        let source = HistoricalDataSource::new(
            store,
            session,
            vec![Symbol::new("BTC_USDT"), Symbol::new("ETH_USDT")],
            10,
        );
        source.start_stream().await.unwrap();

        let batch = source.next_batch().await.unwrap().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].timestamp_us(), 1_000);
        assert_eq!(batch[1].timestamp_us(), 2_000);
        assert_eq!(source.progress(), Some(1.0));
        assert!(source.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn batches_are_capped_at_batch_size_and_progress_advances() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let session = SessionId::new("exec_seed");
        let rows: Vec<PriceRow> = (0..5)
            .map(|i| PriceRow {
                session_id: session.clone(),
                symbol: Symbol::new("BTC_USDT"),
                timestamp_us: i * 1_000,
                price: dec!(100),
                volume: dec!(1),
                quote_volume: None,
            })
            .collect();
        store.insert_prices(rows).await.unwrap();

        let source = HistoricalDataSource::new(store, session, vec![Symbol::new("BTC_USDT")], 2);
        source.start_stream().await.unwrap();

        assert_eq!(source.next_batch().await.unwrap().unwrap().len(), 2);
        assert_eq!(source.progress(), Some(0.4));
        assert_eq!(source.next_batch().await.unwrap().unwrap().len(), 2);
        assert_eq!(source.next_batch().await.unwrap().unwrap().len(), 1);
        assert_eq!(source.progress(), Some(1.0));
        assert!(source.next_batch().await.unwrap().is_none());
    }
}
