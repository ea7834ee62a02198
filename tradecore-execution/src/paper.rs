use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use tradecore_bus::{EventBus, HandlerError, SubscriptionId};
use tradecore_instrument::{Order, OrderId, OrderSide, OrderType, Signal, SignalAction, Symbol, Tick};

use crate::order_manager::{OrderManager, OrderManagerConfig};
use crate::position_sync::PositionSync;

/// Simulates fills at the current top-of-book with configured slippage and
/// commission (spec.md §4.5 "Paper"). Tracks the latest tick price per
/// symbol itself by subscribing to `market.price_update`, since it has no
/// real exchange connection to ask.
#[derive(Debug)]
pub struct PaperOrderManager {
    bus: EventBus,
    positions: Arc<PositionSync>,
    config: OrderManagerConfig,
    last_price: Mutex<HashMap<Symbol, Decimal>>,
    price_subscription: Mutex<Option<SubscriptionId>>,
    signal_subscription: Mutex<Option<SubscriptionId>>,
}

impl PaperOrderManager {
    pub fn new(bus: EventBus, positions: Arc<PositionSync>, config: OrderManagerConfig) -> Arc<Self> {
        let manager = Arc::new(Self {
            bus,
            positions,
            config,
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

    fn slipped_price(&self, reference: Decimal, side: OrderSide) -> Decimal {
        let slippage = reference * self.config.slippage_bps / Decimal::from(10_000);
        match side {
            OrderSide::Buy => reference + slippage,
            OrderSide::Sell => reference - slippage,
        }
    }

    async fn open(&self, signal: Signal) {
        let Some(reference) = self.last_price.lock().get(&signal.symbol).copied() else {
            warn!(symbol = %signal.symbol, "no tick price observed yet, dropping paper order");
            return;
        };
        let side = if matches!(signal.action, SignalAction::Buy) { OrderSide::Buy } else { OrderSide::Sell };
        let fill_price = self.slipped_price(reference, side);
        self.submit_and_fill(signal, side, self.config.default_qty, fill_price).await;
    }

    async fn close(&self, signal: Signal) {
        let Some(position) = self.positions.position_for(&signal.symbol) else {
            warn!(symbol = %signal.symbol, "CLOSE signal received with no open position");
            return;
        };
        let reference = self.last_price.lock().get(&signal.symbol).copied().unwrap_or(position.current_price);
        let side = match position.side {
            tradecore_instrument::PositionSide::Long => OrderSide::Sell,
            tradecore_instrument::PositionSide::Short => OrderSide::Buy,
        };
        let fill_price = self.slipped_price(reference, side);
        self.submit_and_fill(signal, side, position.qty, fill_price).await;
    }

    async fn submit_and_fill(&self, signal: Signal, side: OrderSide, qty: Decimal, fill_price: Decimal) {
        let commission = fill_price * qty * self.config.commission_rate;
        let mut order = Order::new(
            OrderId::new(format!("paper_{}_{}", signal.symbol, signal.timestamp_us)),
            signal.strategy_id.clone(),
            signal.symbol.clone(),
            side,
            OrderType::Market,
            qty,
            Some(fill_price),
            signal.timestamp_us,
        );
        let _ = self.bus.publish("order_created", serde_json::to_value(&order).unwrap()).await;

        order.apply_fill(qty, fill_price, commission);
        let _ = self.bus.publish("order_filled", serde_json::to_value(&order).unwrap()).await;
        self.positions.reconcile_fill(signal.strategy_id, &order, signal.timestamp_us).await;
    }
}

impl OrderManager for PaperOrderManager {
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
    async fn buy_signal_fills_at_slipped_price_and_opens_a_position() {
        let bus = EventBus::new();
        let positions = Arc::new(PositionSync::new(bus.clone()));
        let manager = PaperOrderManager::new(
            bus.clone(),
            positions.clone(),
            OrderManagerConfig {
                default_qty: dec!(1),
                slippage_bps: dec!(10),
                commission_rate: dec!(0.001),
            },
        );
        let _ = &manager;

        bus.publish(
            "market.price_update",
            serde_json::to_value(&Tick::new(Symbol::new("BTC_USDT"), 0, dec!(100), dec!(1))).unwrap(),
        )
        .await
        .unwrap();

        let signal = Signal {
            strategy_id: StrategyId::new("s1"),
            symbol: Symbol::new("BTC_USDT"),
            signal_type: tradecore_instrument::SignalType::Z1,
            triggered: true,
            conditions_met: vec![],
            indicator_values: Default::default(),
            action: SignalAction::Buy,
            timestamp_us: 1,
            metadata: serde_json::Value::Null,
        };
        bus.publish("signal_generated", serde_json::to_value(&signal).unwrap()).await.unwrap();

        let position = positions.position_for(&Symbol::new("BTC_USDT")).unwrap();
        assert_eq!(position.qty, dec!(1));
        assert!(position.entry_price > dec!(100));
    }
}
