use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tokio_stream::StreamExt;
use tracing::warn;
use tradecore_exchange::{ExchangeAdapter, MarketEvent};
use tradecore_instrument::Symbol;

use crate::data_source::{DataSource, MarketBatchEvent};
use crate::error::ControllerError;

const DEFAULT_CAPACITY: usize = 1000;
const DROP_WARNING_INTERVAL: Duration = Duration::from_secs(5);

/// A bounded queue that drops the oldest entry on overflow rather than
/// blocking the feeder task, with a 5-second-throttled warning so a
/// persistently overloaded feed doesn't spam the log.
///
/// Ported from `MarketDataProviderAdapter`'s `asyncio.Queue(maxsize=1000)`
/// plus its `_dropped_events` counter and `_last_drop_warning` gate.
struct DropOldestQueue {
    items: Mutex<VecDeque<MarketBatchEvent>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicUsize,
    last_warning: Mutex<Option<Instant>>,
}

impl DropOldestQueue {
    fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
            dropped: AtomicUsize::new(0),
            last_warning: Mutex::new(None),
        }
    }

    async fn push(&self, event: MarketBatchEvent) {
        let mut items = self.items.lock().await;
        if items.len() >= self.capacity {
            items.pop_front();
            self.dropped.fetch_add(1, Ordering::SeqCst);
            drop(items);
            self.maybe_warn().await;
        } else {
            items.push_back(event);
            drop(items);
        }
        self.notify.notify_one();
    }

    async fn maybe_warn(&self) {
        let mut last = self.last_warning.lock().await;
        let now = Instant::now();
        let should_warn = last.map(|t| now.duration_since(t) >= DROP_WARNING_INTERVAL).unwrap_or(true);
        if should_warn {
            warn!(
                total_dropped = self.dropped.load(Ordering::SeqCst),
                "live data source queue full, dropping oldest event"
            );
            *last = Some(now);
        }
    }

    async fn drain(&self, max: usize) -> Vec<MarketBatchEvent> {
        let mut items = self.items.lock().await;
        let n = max.min(items.len());
        items.drain(..n).collect()
    }

    async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

/// Feeds the execution pipeline from a live exchange connection (spec.md
/// §4.3 LIVE/PAPER modes). Spawns one task per symbol that forwards the
/// adapter's per-symbol stream into a single shared [`DropOldestQueue`];
/// `next_batch` drains it, blocking (via `Notify`) only when genuinely
/// empty so the pipeline doesn't busy-poll.
///
/// Progress is always `None` — a live feed has no notion of completion.
pub struct LiveDataSource {
    adapter: Arc<dyn ExchangeAdapter>,
    symbols: Vec<Symbol>,
    queue: Arc<DropOldestQueue>,
    batch_size: usize,
    feeders: Mutex<Vec<tokio::task::JoinHandle<()>>>,
    stopped: Arc<AtomicU64>,
}

impl std::fmt::Debug for LiveDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveDataSource")
            .field("symbols", &self.symbols)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl LiveDataSource {
    pub fn new(adapter: Arc<dyn ExchangeAdapter>, symbols: Vec<Symbol>, batch_size: usize) -> Self {
        Self::with_capacity(adapter, symbols, batch_size, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(
        adapter: Arc<dyn ExchangeAdapter>,
        symbols: Vec<Symbol>,
        batch_size: usize,
        capacity: usize,
    ) -> Self {
        Self {
            adapter,
            symbols,
            queue: Arc::new(DropOldestQueue::new(capacity)),
            batch_size: batch_size.max(1),
            feeders: Mutex::new(Vec::new()),
            stopped: Arc::new(AtomicU64::new(0)),
        }
    }
}

#[async_trait]
impl DataSource for LiveDataSource {
    async fn start_stream(&self) -> Result<(), ControllerError> {
        self.adapter.connect().await?;
        let mut feeders = self.feeders.lock().await;
        for symbol in &self.symbols {
            self.adapter.subscribe_to_symbol(symbol.clone()).await?;
            let mut stream = self.adapter.get_market_data_stream(symbol.clone()).await?;
            let queue = Arc::clone(&self.queue);
            let stopped = Arc::clone(&self.stopped);
            feeders.push(tokio::spawn(async move {
                while stopped.load(Ordering::SeqCst) == 0 {
                    match stream.next().await {
                        Some(MarketEvent::Tick(tick)) => queue.push(MarketBatchEvent::Price(tick)).await,
                        Some(MarketEvent::Orderbook(snapshot)) => {
                            queue.push(MarketBatchEvent::Orderbook(snapshot)).await
                        }
                        None => break,
                    }
                }
            }));
        }
        Ok(())
    }

    async fn next_batch(&self) -> Result<Option<Vec<MarketBatchEvent>>, ControllerError> {
        if self.stopped.load(Ordering::SeqCst) != 0 && self.queue.is_empty().await {
            return Ok(None);
        }
        loop {
            let batch = self.queue.drain(self.batch_size).await;
            if !batch.is_empty() {
                return Ok(Some(batch));
            }
            if self.stopped.load(Ordering::SeqCst) != 0 {
                return Ok(None);
            }
            self.queue.notify.notified().await;
        }
    }

    async fn stop_stream(&self) -> Result<(), ControllerError> {
        self.stopped.store(1, Ordering::SeqCst);
        self.queue.notify.notify_waiters();
        let mut feeders = self.feeders.lock().await;
        for handle in feeders.drain(..) {
            handle.abort();
        }
        self.adapter.disconnect().await?;
        Ok(())
    }

    fn progress(&self) -> Option<f64> {
        None
    }
}
