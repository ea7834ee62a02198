use async_trait::async_trait;
use tradecore_instrument::{OrderbookSnapshot, Tick};

use crate::error::ControllerError;

/// A single market event produced by a data source, tagged with which
/// batch-level topic it belongs on (spec.md §4.3: the controller republishes
/// each event both individually, on its singular topic, and batched).
#[derive(Debug, Clone)]
pub enum MarketBatchEvent {
    Price(Tick),
    Orderbook(OrderbookSnapshot),
}

impl MarketBatchEvent {
    pub fn timestamp_us(&self) -> i64 {
        match self {
            MarketBatchEvent::Price(tick) => tick.timestamp_us,
            MarketBatchEvent::Orderbook(snapshot) => snapshot.timestamp_us,
        }
    }
}

/// Feeds the execution pipeline (spec.md §4.3 "Data source"). Implementors
/// decide where ticks/orderbooks come from — historical replay, a live
/// exchange feed, or a flat-file archive — and the controller drives all
/// three through the same loop: `start_stream`, then repeated `next_batch`
/// until it returns `None`, then `stop_stream`.
///
/// Ported from `execution_controller.py`'s `IExecutionDataSource` interface;
/// `get_next_batch` is renamed `next_batch` for naming consistency with the
/// rest of this crate's verb-first method names.
#[async_trait]
pub trait DataSource: Send + Sync + std::fmt::Debug {
    async fn start_stream(&self) -> Result<(), ControllerError>;

    /// Returns the next batch of events, or `None` once the source is
    /// exhausted (historical/file replay) or has been stopped (live).
    async fn next_batch(&self) -> Result<Option<Vec<MarketBatchEvent>>, ControllerError>;

    async fn stop_stream(&self) -> Result<(), ControllerError>;

    /// Completion fraction in `[0.0, 1.0]`, or `None` when progress isn't
    /// meaningful (e.g. an open-ended live feed).
    fn progress(&self) -> Option<f64>;
}
