use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use tradecore_bus::{EventBus, HandlerError, SubscriptionId};
use tradecore_instrument::{Order, OrderId, OrderSide, OrderType, Signal, SignalAction, Symbol, Tick};

use crate::order_manager::OrderManager;
use crate::position_sync::PositionSync;

/// Fills instantly at the tick price driving the signal, deterministically
/// and with no latency simulation (spec.md §4.5 "Backtest"). Used only
/// during `BACKTEST` mode sessions; the Execution Controller hot-swaps this
/// in for the Live variant and swaps it back out on stop.
#[derive(Debug)]
pub struct BacktestOrderManager {
    bus: EventBus,
    positions: Arc<PositionSync>,
    default_qty: Decimal,
    last_price: Mutex<HashMap<Symbol, Decimal>>,
    price_subscription: Mutex<Option<SubscriptionId>>,
    signal_subscription: Mutex<Option<SubscriptionId>>,
}

impl BacktestOrderManager {
    pub fn new(bus: EventBus, positions: Arc<PositionSync>, default_qty: Decimal) -> Arc<Self> {
        let manager = Arc::new(Self {
            bus,
            positions,
            default_qty,
            last_price: Mutex::new(HashMap::new()),
            price_subscription: Mutex::new(None),
            signal_subscription: Mutex::new(None),
        });
        manager.clone().attach();
        manager
    }

    fn attach(self: Arc<Self>) {
        let price_tracker = self.clone();
        let price_sub = self.bus.subscribe("market.price_update", move |event| {
            let price_tracker = price_tracker.clone();
            async move {
                let tick: Tick = serde_json::from_value(event.data)
                    .map_err(|e| HandlerError::new(format!("malformed market.price_update payload: {e}")))?;
                price_tracker.last_price.lock().insert(tick.symbol, tick.price);
                Ok(())
            }
        });

        let manager = self.clone();
        let signal_sub = self.bus.subscribe("signal_generated", move |event| {
            let manager = manager.clone();
            async move {
                let signal: Signal = serde_json::from_value(event.data)
                    .map_err(|e| HandlerError::new(format!("malformed signal_generated payload: {e}")))?;
                manager.handle_signal(signal).await;
                Ok(())
            }
        });

        *self.price_subscription.lock() = Some(price_sub);
        *self.signal_subscription.lock() = Some(signal_sub);
    }

    async fn handle_signal(&self, signal: Signal) {
        match signal.action {
            SignalAction::Buy | SignalAction::Sell => self.open(signal).await,
            SignalAction::Close => self.close(signal).await,
            SignalAction::LockSymbol | SignalAction::Cancel => {
                debug!(strategy = %signal.strategy_id, symbol = %signal.symbol, action = ?signal.action, "no order action required");
            }
        }
    }

    async fn open(&self, signal: Signal) {
        let Some(price) = self.last_price.lock().get(&signal.symbol).copied() else {
            warn!(symbol = %signal.symbol, "no driving tick observed yet, dropping backtest order");
            return;
        };
        let side = if matches!(signal.action, SignalAction::Buy) { OrderSide::Buy } else { OrderSide::Sell };
        self.submit_and_fill(signal, side, self.default_qty, price).await;
    }

    async fn close(&self, signal: Signal) {
        let Some(position) = self.positions.position_for(&signal.symbol) else {
            warn!(symbol = %signal.symbol, "CLOSE signal received with no open position");
            return;
        };
        let price = self.last_price.lock().get(&signal.symbol).copied().unwrap_or(position.current_price);
        let side = match position.side {
            tradecore_instrument::PositionSide::Long => OrderSide::Sell,
            tradecore_instrument::PositionSide::Short => OrderSide::Buy,
        };
        self.submit_and_fill(signal, side, position.qty, price).await;
    }

    async fn submit_and_fill(&self, signal: Signal, side: OrderSide, qty: Decimal, price: Decimal) {
        let mut order = Order::new(
            OrderId::new(format!("bt_{}_{}", signal.symbol, signal.timestamp_us)),
            signal.strategy_id.clone(),
            signal.symbol.clone(),
            side,
            OrderType::Market,
            qty,
            Some(price),
            signal.timestamp_us,
        );
        let _ = self.bus.publish("order_created", serde_json::to_value(&order).unwrap()).await;

        order.apply_fill(qty, price, Decimal::ZERO);
        let _ = self.bus.publish("order_filled", serde_json::to_value(&order).unwrap()).await;
        self.positions.reconcile_fill(signal.strategy_id, &order, signal.timestamp_us).await;
    }
}

impl OrderManager for BacktestOrderManager {
    fn subscription(&self) -> SubscriptionId {
        self.signal_subscription.lock().as_ref().copied().expect("subscribed during construction")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradecore_instrument::StrategyId;

    #[tokio::test]
    async fn buy_signal_fills_instantly_at_the_driving_tick_price() {
        let bus = EventBus::new();
        let positions = Arc::new(PositionSync::new(bus.clone()));
        let _manager = BacktestOrderManager::new(bus.clone(), positions.clone(), dec!(2));

        bus.publish(
            "market.price_update",
            serde_json::to_value(&Tick::new(Symbol::new("ETH_USDT"), 0, dec!(50), dec!(1))).unwrap(),
        )
        .await
        .unwrap();

        let signal = Signal {
            strategy_id: StrategyId::new("s1"),
            symbol: Symbol::new("ETH_USDT"),
            signal_type: tradecore_instrument::SignalType::Z1,
            triggered: true,
            conditions_met: vec![],
            indicator_values: Default::default(),
            action: SignalAction::Sell,
            timestamp_us: 1,
            metadata: serde_json::Value::Null,
        };
        bus.publish("signal_generated", serde_json::to_value(&signal).unwrap()).await.unwrap();

        let position = positions.position_for(&Symbol::new("ETH_USDT")).unwrap();
        assert_eq!(position.entry_price, dec!(50));
        assert_eq!(position.qty, dec!(2));
    }
}
