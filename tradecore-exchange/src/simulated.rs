use crate::adapter::{ExchangeAdapter, MarketEvent, OrderAck};
use crate::error::ExchangeError;
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};
use tradecore_instrument::{
    Order, OrderId, OrderStatus, OrderbookSnapshot, Position, Symbol, Tick,
};

/// Deterministic in-process adapter used by tests, paper trading, and any
/// deployment that has no real venue connectivity configured. Feeding it a
/// `Tick`/`OrderbookSnapshot` via [`SimulatedAdapter::push`] is the only way
/// data enters its streams — there's no real transport underneath.
#[derive(Debug)]
pub struct SimulatedAdapter {
    connected: Mutex<bool>,
    subscribed: Mutex<HashSet<Symbol>>,
    senders: Mutex<Vec<(Symbol, mpsc::Sender<MarketEvent>)>>,
    commission_rate: Decimal,
}

impl SimulatedAdapter {
    pub fn new(commission_rate: Decimal) -> Self {
        Self {
            connected: Mutex::new(false),
            subscribed: Mutex::new(HashSet::new()),
            senders: Mutex::new(Vec::new()),
            commission_rate,
        }
    }

    /// Inject a tick into every outstanding stream for its symbol. Channels
    /// whose receiver has been dropped are pruned on the next push.
    pub fn push_tick(&self, tick: Tick) {
        self.broadcast(tick.symbol.clone(), MarketEvent::Tick(tick));
    }

    pub fn push_orderbook(&self, snapshot: OrderbookSnapshot) {
        self.broadcast(snapshot.symbol.clone(), MarketEvent::Orderbook(snapshot));
    }

    fn broadcast(&self, symbol: Symbol, event: MarketEvent) {
        let mut senders = self.senders.lock();
        senders.retain(|(sym, tx)| sym != &symbol || tx.try_send(event.clone()).is_ok());
    }
}

#[async_trait]
impl ExchangeAdapter for SimulatedAdapter {
    async fn connect(&self) -> Result<(), ExchangeError> {
        *self.connected.lock() = true;
        info!("SimulatedAdapter connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ExchangeError> {
        *self.connected.lock() = false;
        self.senders.lock().clear();
        info!("SimulatedAdapter disconnected");
        Ok(())
    }

    async fn subscribe_to_symbol(&self, symbol: Symbol) -> Result<(), ExchangeError> {
        if !*self.connected.lock() {
            return Err(ExchangeError::NotConnected);
        }
        self.subscribed.lock().insert(symbol.clone());
        debug!(%symbol, "SimulatedAdapter subscribed");
        Ok(())
    }

    async fn get_market_data_stream(&self, symbol: Symbol) -> Result<ReceiverStream<MarketEvent>, ExchangeError> {
        if !self.subscribed.lock().contains(&symbol) {
            return Err(ExchangeError::NotSubscribed(symbol.as_str().to_string()));
        }
        let (tx, rx) = mpsc::channel(1000);
        self.senders.lock().push((symbol, tx));
        Ok(ReceiverStream::new(rx))
    }

    async fn place_order(&self, mut order: Order) -> Result<OrderAck, ExchangeError> {
        if !*self.connected.lock() {
            return Err(ExchangeError::NotConnected);
        }
        let fill_price = order.price.unwrap_or_default();
        let commission = fill_price * order.qty * self.commission_rate;
        order.apply_fill(order.qty, fill_price, commission);
        Ok(OrderAck { order })
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<(), ExchangeError> {
        debug!(%order_id, "SimulatedAdapter cancel (no-op, orders fill instantly)");
        Ok(())
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio_stream::StreamExt;
    use tradecore_instrument::{OrderSide, OrderType, StrategyId};

    #[tokio::test]
    async fn push_tick_is_observed_by_an_open_stream() {
        let adapter = SimulatedAdapter::new(dec!(0.0004));
        adapter.connect().await.unwrap();
        let symbol = Symbol::new("BTC_USDT");
        adapter.subscribe_to_symbol(symbol.clone()).await.unwrap();
        let mut stream = adapter.get_market_data_stream(symbol.clone()).await.unwrap();

        adapter.push_tick(Tick::new(symbol.clone(), 1, dec!(100), dec!(1)));

        let event = stream.next().await.unwrap();
        assert!(matches!(event, MarketEvent::Tick(tick) if tick.price == dec!(100)));
    }

    #[tokio::test]
    async fn place_order_fills_instantly_at_the_given_price() {
        let adapter = SimulatedAdapter::new(dec!(0.001));
        adapter.connect().await.unwrap();
        let order = Order::new(
            OrderId::new("o1"),
            StrategyId::new("s1"),
            Symbol::new("BTC_USDT"),
            OrderSide::Buy,
            OrderType::Limit,
            dec!(1),
            Some(dec!(100)),
            0,
        );

        let ack = adapter.place_order(order).await.unwrap();
        assert_eq!(ack.order.status, OrderStatus::Filled);
        assert_eq!(ack.order.filled_qty, dec!(1));
    }
}
