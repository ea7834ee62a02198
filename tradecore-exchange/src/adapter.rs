use crate::error::ExchangeError;
use async_trait::async_trait;
use tokio_stream::wrappers::ReceiverStream;
use tradecore_instrument::{Order, OrderId, OrderbookSnapshot, Position, Symbol, Tick};

/// A single normalised market-data event, the unit `get_market_data_stream`
/// yields. Normalised here (rather than carrying exchange-native wire
/// shapes) so every adapter implementation feeds the rest of the system
/// identical `Tick`/`OrderbookSnapshot` records (spec.md §6, "Events
/// normalised into the canonical ... payloads before entering the bus").
#[derive(Debug, Clone)]
pub enum MarketEvent {
    Tick(Tick),
    Orderbook(OrderbookSnapshot),
}

/// Acknowledgement returned by `place_order`. Exchanges differ in how much
/// they know synchronously about a freshly submitted order; `order` carries
/// whatever the adapter already knows (often just `NEW` with no fill yet).
#[derive(Debug, Clone)]
pub struct OrderAck {
    pub order: Order,
}

/// Capability exposed by every market venue connector (spec.md §6,
/// "Exchange adapter"). One adapter instance talks to exactly one venue;
/// the `ExecutionController`'s `DataSource::Live` implementation wraps this
/// trait and republishes its stream onto the EventBus.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    async fn connect(&self) -> Result<(), ExchangeError>;

    async fn disconnect(&self) -> Result<(), ExchangeError>;

    /// Mark `symbol` as wanted on the live feed. No-op for adapters that
    /// stream every symbol unconditionally (e.g. `SimulatedAdapter`).
    async fn subscribe_to_symbol(&self, symbol: Symbol) -> Result<(), ExchangeError>;

    /// A stream of normalised market events for `symbol`. Callers drive it
    /// to completion or drop it to stop receiving updates.
    async fn get_market_data_stream(&self, symbol: Symbol) -> Result<ReceiverStream<MarketEvent>, ExchangeError>;

    async fn place_order(&self, order: Order) -> Result<OrderAck, ExchangeError>;

    async fn cancel_order(&self, order_id: OrderId) -> Result<(), ExchangeError>;

    async fn fetch_positions(&self) -> Result<Vec<Position>, ExchangeError>;
}
