use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use tradecore_instrument::{SessionId, Symbol, Tick};

use crate::data_source::{DataSource, MarketBatchEvent};
use crate::error::ControllerError;

/// Replays a `prices.csv` archive written by `CsvCollector` (spec.md §6,
/// "Persisted layout": `data/session_<id>/<SYMBOL>/prices.csv`), for
/// backtests run against flat-file exports rather than a live store.
///
/// Parses by hand, matching `CsvCollector::write_price_row`'s own
/// hand-formatted `timestamp,price,volume,quote_volume` layout rather than
/// pulling in a CSV parsing crate for a format this workspace already
/// writes manually.
#[derive(Debug)]
pub struct FileDataSource {
    root: PathBuf,
    symbols: Vec<Symbol>,
    batch_size: usize,
    queue: Mutex<Option<VecDeque<Tick>>>,
    total: AtomicUsize,
    emitted: AtomicUsize,
}

impl FileDataSource {
    pub fn new(root: impl Into<PathBuf>, session_id: &SessionId, symbols: Vec<Symbol>, batch_size: usize) -> Self {
        let root = root.into().join(format!("session_{}", session_id));
        Self {
            root,
            symbols,
            batch_size: batch_size.max(1),
            queue: Mutex::new(None),
            total: AtomicUsize::new(0),
            emitted: AtomicUsize::new(0),
        }
    }

    fn parse_file(path: &std::path::Path, symbol: &Symbol, out: &mut Vec<Tick>) -> Result<(), ControllerError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        for line in contents.lines().skip(1) {
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(',');
            let timestamp_us: i64 = fields
                .next()
                .and_then(|f| f.parse().ok())
                .ok_or_else(|| ControllerError::Io(format!("malformed prices.csv line: {line}")))?;
            let price = fields
                .next()
                .and_then(|f| Decimal::from_str(f).ok())
                .ok_or_else(|| ControllerError::Io(format!("malformed prices.csv line: {line}")))?;
            let volume = fields
                .next()
                .and_then(|f| Decimal::from_str(f).ok())
                .ok_or_else(|| ControllerError::Io(format!("malformed prices.csv line: {line}")))?;
            let quote_volume = fields.next().and_then(|f| Decimal::from_str(f).ok());

            let mut tick = Tick::new(symbol.clone(), timestamp_us, price, volume);
            if let Some(quote_volume) = quote_volume {
                tick = tick.with_quote_volume(quote_volume);
            }
            out.push(tick);
        }
        Ok(())
    }
}

#[async_trait]
impl DataSource for FileDataSource {
    async fn start_stream(&self) -> Result<(), ControllerError> {
        let root = self.root.clone();
        let symbols = self.symbols.clone();
        let merged = tokio::task::spawn_blocking(move || -> Result<Vec<Tick>, ControllerError> {
            let mut merged = Vec::new();
            for symbol in &symbols {
                let path = root.join(symbol.as_str()).join("prices.csv");
                FileDataSource::parse_file(&path, symbol, &mut merged)?;
            }
            merged.sort_by_key(|tick| tick.timestamp_us);
            Ok(merged)
        })
        .await
        .map_err(|e| ControllerError::Io(e.to_string()))??;

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
    use std::io::Write;

    fn write_prices_csv(dir: &std::path::Path, symbol: &str, lines: &[&str]) {
        let symbol_dir = dir.join(symbol);
        std::fs::create_dir_all(&symbol_dir).unwrap();
        let mut file = std::fs::File::create(symbol_dir.join("prices.csv")).unwrap();
        writeln!(file, "timestamp,price,volume,quote_volume").unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    #[tokio::test]
    async fn replays_csv_rows_in_timestamp_order() {
        let tmp = std::env::temp_dir().join(format!("tradecore-test-{}", std::process::id()));
        let session = SessionId::new("exec_csv_test");
        let root = tmp.join(format!("session_{session}"));
        write_prices_csv(&root, "BTC_USDT", &["2000,101,1,", "1000,100,2,50"]);

        let source = FileDataSource::new(&tmp, &session, vec![Symbol::new("BTC_USDT")], 10);
        source.start_stream().await.unwrap();

        let batch = source.next_batch().await.unwrap().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].timestamp_us(), 1_000);
        match &batch[0] {
            MarketBatchEvent::Price(tick) => {
                assert_eq!(tick.price, dec!(100));
                assert_eq!(tick.quote_volume, Some(dec!(50)));
            }
            _ => panic!("expected a price event"),
        }
        assert!(source.next_batch().await.unwrap().is_none());

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[tokio::test]
    async fn missing_symbol_file_yields_no_rows_for_that_symbol() {
        let tmp = std::env::temp_dir().join(format!("tradecore-test-missing-{}", std::process::id()));
        let session = SessionId::new("exec_csv_missing");
        let source = FileDataSource::new(&tmp, &session, vec![Symbol::new("BTC_USDT")], 10);
        source.start_stream().await.unwrap();
        assert!(source.next_batch().await.unwrap().is_none());
        assert_eq!(source.progress(), Some(1.0));
        std::fs::remove_dir_all(&tmp).ok();
    }
}
