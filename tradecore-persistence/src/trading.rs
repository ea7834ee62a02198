use crate::rows::{OrderRow, PositionRow, SignalRow};
use crate::store::Store;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use tradecore_bus::{EventBus, HandlerError};
use tradecore_instrument::{Order, Position, StrategyId};

/// Wire payload for `position_opened`/`position_updated`/`position_closed`:
/// the domain `Position` doesn't itself carry a strategy id or event
/// timestamp, so the publisher (position sync) bundles them alongside it.
#[derive(Debug, Deserialize)]
struct PositionEvent {
    position: Position,
    strategy_id: StrategyId,
    timestamp_us: i64,
}

/// Subscribes to signal/order/position topics and writes rows into the
/// configured [`Store`] (spec.md §4.7). Mode-agnostic: live, paper and
/// backtest sessions all publish onto the same topics and flow through the
/// same writer. A write failure is logged and does not propagate — it must
/// never take down the producer that published the event.
#[derive(Debug, Clone)]
pub struct TradingPersistence;

impl TradingPersistence {
    /// Register every subscription this service needs on `bus`. The
    /// returned value is a marker only — subscriptions outlive it for the
    /// bus's own lifetime.
    pub fn attach(bus: &EventBus, store: Arc<dyn Store>) -> Self {
        let s = store.clone();
        bus.subscribe("signal_generated", move |event| {
            let store = s.clone();
            async move {
                let signal: tradecore_instrument::Signal = serde_json::from_value(event.data)
                    .map_err(|e| HandlerError::new(format!("malformed signal_generated payload: {e}")))?;
                let row = SignalRow {
                    strategy_id: signal.strategy_id,
                    symbol: signal.symbol,
                    signal_type: format!("{:?}", signal.signal_type).to_uppercase(),
                    timestamp_us: signal.timestamp_us,
                    triggered: signal.triggered,
                    conditions_met: serde_json::to_value(&signal.conditions_met).unwrap_or_default(),
                    indicator_values: serde_json::to_value(&signal.indicator_values).unwrap_or_default(),
                    action: format!("{:?}", signal.action).to_uppercase(),
                    metadata: signal.metadata,
                };
                if let Err(err) = store.upsert_signal(row).await {
                    warn!(error = %err, "failed to persist strategy signal");
                }
                Ok(())
            }
        });

        for topic in ["order_created", "order_filled", "order_cancelled"] {
            let store = store.clone();
            bus.subscribe(topic, move |event| {
                let store = store.clone();
                async move {
                    let order: Order = serde_json::from_value(event.data)
                        .map_err(|e| HandlerError::new(format!("malformed order payload: {e}")))?;
                    let row = OrderRow {
                        order_id: order.order_id,
                        strategy_id: order.strategy_id,
                        symbol: order.symbol,
                        side: format!("{:?}", order.side).to_uppercase(),
                        order_type: format!("{:?}", order.order_type).to_uppercase(),
                        timestamp_us: order.timestamp_us,
                        quantity: order.qty,
                        price: order.price,
                        filled_quantity: order.filled_qty,
                        filled_price: order.filled_price,
                        status: format!("{:?}", order.status).to_uppercase(),
                        commission: order.commission,
                        metadata: order.metadata,
                    };
                    if let Err(err) = store.upsert_order(row).await {
                        warn!(error = %err, "failed to persist order");
                    }
                    Ok(())
                }
            });
        }

        for topic in ["position_opened", "position_updated", "position_closed"] {
            let store = store.clone();
            bus.subscribe(topic, move |event| {
                let store = store.clone();
                async move {
                    let payload: PositionEvent = serde_json::from_value(event.data)
                        .map_err(|e| HandlerError::new(format!("malformed position payload: {e}")))?;
                    let position = payload.position;
                    let row = PositionRow {
                        position_id: position.position_id,
                        strategy_id: payload.strategy_id,
                        symbol: position.symbol,
                        timestamp_us: payload.timestamp_us,
                        side: format!("{:?}", position.side).to_uppercase(),
                        quantity: position.qty,
                        entry_price: position.entry_price,
                        current_price: position.current_price,
                        unrealized_pnl: position.unrealized_pnl,
                        realized_pnl: position.realized_pnl,
                        stop_loss: position.stop_loss,
                        take_profit: position.take_profit,
                        status: format!("{:?}", position.status).to_uppercase(),
                        metadata: serde_json::Value::Null,
                    };
                    if let Err(err) = store.upsert_position(row).await {
                        warn!(error = %err, "failed to persist position");
                    }
                    Ok(())
                }
            });
        }

        TradingPersistence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use rust_decimal_macros::dec;
    use tradecore_instrument::{OrderId, OrderSide, OrderStatus, OrderType, Symbol};

    #[tokio::test]
    async fn order_created_then_order_filled_upsert_the_same_row() {
        let bus = EventBus::new();
        let store = Arc::new(InMemoryStore::new());
        let _persistence = TradingPersistence::attach(&bus, store.clone());

        let mut order = Order::new(
            OrderId::new("o1"),
            StrategyId::new("s1"),
            Symbol::new("BTC_USDT"),
            OrderSide::Buy,
            OrderType::Market,
            dec!(1),
            None,
            1,
        );
        bus.publish("order_created", serde_json::to_value(&order).unwrap())
            .await
            .unwrap();

        order.apply_fill(dec!(1), dec!(100), dec!(0.01));
        bus.publish("order_filled", serde_json::to_value(&order).unwrap())
            .await
            .unwrap();

        let rows = store.orders_snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, format!("{:?}", OrderStatus::Filled).to_uppercase());
    }
}
