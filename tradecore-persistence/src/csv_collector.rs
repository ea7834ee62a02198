use crate::error::PersistenceError;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as AsyncMutex;
use tradecore_instrument::{OrderLevel, SessionId, Symbol};

const PRICES_HEADER: &str = "timestamp,price,volume,quote_volume\n";
const ORDERBOOK_HEADER: &str = "timestamp,bids,asks,best_bid,best_ask,spread\n";

/// Writer for the legacy data-collection CSV layout (spec.md §6,
/// "Persisted layout"): `data/session_<id>/<SYMBOL>/prices.csv` and
/// `orderbook.csv`. One lock per `(session, symbol)` file pair, matching
/// the "per-symbol file locks (data-collection only)" resource policy in
/// spec.md §5 — concurrent writers for the same symbol serialise, writers
/// for different symbols never contend.
#[derive(Debug, Clone)]
pub struct CsvCollector {
    root: PathBuf,
    locks: Arc<Mutex<HashMap<(SessionId, Symbol), Arc<AsyncMutex<()>>>>>,
}

impl CsvCollector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn symbol_dir(&self, session_id: &SessionId, symbol: &Symbol) -> PathBuf {
        self.root
            .join(format!("session_{}", session_id.to_string()))
            .join(symbol.as_str())
    }

    fn lock_for(&self, session_id: &SessionId, symbol: &Symbol) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .entry((session_id.clone(), symbol.clone()))
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    pub async fn write_price_row(
        &self,
        session_id: &SessionId,
        symbol: &Symbol,
        timestamp_us: i64,
        price: Decimal,
        volume: Decimal,
        quote_volume: Option<Decimal>,
    ) -> Result<(), PersistenceError> {
        let lock = self.lock_for(session_id, symbol);
        let _guard = lock.lock().await;

        let dir = self.symbol_dir(session_id, symbol);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PersistenceError::Write(e.to_string()))?;
        let path = dir.join("prices.csv");
        let is_new = !path.exists();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| PersistenceError::Write(e.to_string()))?;

        if is_new {
            file.write_all(PRICES_HEADER.as_bytes())
                .await
                .map_err(|e| PersistenceError::Write(e.to_string()))?;
        }

        let line = format!(
            "{},{},{},{}\n",
            timestamp_us,
            price,
            volume,
            quote_volume.map(|v| v.to_string()).unwrap_or_default()
        );
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| PersistenceError::Write(e.to_string()))
    }

    pub async fn write_orderbook_row(
        &self,
        session_id: &SessionId,
        symbol: &Symbol,
        timestamp_us: i64,
        bids: &[OrderLevel],
        asks: &[OrderLevel],
    ) -> Result<(), PersistenceError> {
        let lock = self.lock_for(session_id, symbol);
        let _guard = lock.lock().await;

        let dir = self.symbol_dir(session_id, symbol);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PersistenceError::Write(e.to_string()))?;
        let path = dir.join("orderbook.csv");
        let is_new = !path.exists();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| PersistenceError::Write(e.to_string()))?;

        if is_new {
            file.write_all(ORDERBOOK_HEADER.as_bytes())
                .await
                .map_err(|e| PersistenceError::Write(e.to_string()))?;
        }

        let top3 = |levels: &[OrderLevel]| -> String {
            levels
                .iter()
                .take(3)
                .map(|l| format!("{}:{}", l.price, l.qty))
                .collect::<Vec<_>>()
                .join(";")
        };
        let best_bid = bids.first().map(|l| l.price.to_string()).unwrap_or_default();
        let best_ask = asks.first().map(|l| l.price.to_string()).unwrap_or_default();
        let spread = match (bids.first(), asks.first()) {
            (Some(bid), Some(ask)) => (ask.price - bid.price).to_string(),
            _ => String::new(),
        };

        let line = format!(
            "{},{},{},{},{},{}\n",
            timestamp_us,
            top3(bids),
            top3(asks),
            best_bid,
            best_ask,
            spread
        );
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| PersistenceError::Write(e.to_string()))
    }
}
