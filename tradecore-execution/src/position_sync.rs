use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;
use tradecore_bus::EventBus;
use tradecore_instrument::{Order, OrderSide, Position, PositionId, PositionSide, StrategyId, Symbol};

/// Netted, per-symbol position book shared by every `OrderManager` variant
/// (spec.md §3 "at most one position per symbol at a time (netted)").
/// Reconciles fills into the existing position rather than ever creating a
/// second position for the same symbol, and publishes
/// `position_opened`/`position_updated`/`position_closed` wrapped with the
/// `strategy_id`/`timestamp_us` that `tradecore-persistence::trading`
/// expects alongside the bare `Position`.
#[derive(Debug)]
pub struct PositionSync {
    bus: EventBus,
    positions: Mutex<HashMap<Symbol, Position>>,
}

impl PositionSync {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            positions: Mutex::new(HashMap::new()),
        }
    }

    pub fn position_for(&self, symbol: &Symbol) -> Option<Position> {
        self.positions.lock().get(symbol).cloned()
    }

    /// Net `order`'s fill into the book, publishing exactly one of
    /// `position_opened`, `position_updated`, `position_closed` (a fill
    /// that flips a position publishes both `position_closed` for the old
    /// side and `position_opened` for the new one).
    pub async fn reconcile_fill(&self, strategy_id: StrategyId, order: &Order, now_us: i64) {
        let fill_qty = order.filled_qty;
        let fill_price = order.filled_price.unwrap_or_default();
        if fill_qty == Decimal::ZERO {
            return;
        }
        let fill_side = match order.side {
            OrderSide::Buy => PositionSide::Long,
            OrderSide::Sell => PositionSide::Short,
        };

        let existing = self.positions.lock().remove(&order.symbol);
        match existing {
            None => {
                let position = Position::open(
                    PositionId::new(format!("pos_{}", order.symbol)),
                    order.symbol.clone(),
                    fill_side,
                    fill_qty,
                    fill_price,
                );
                self.positions.lock().insert(order.symbol.clone(), position.clone());
                self.publish("position_opened", &position, &strategy_id, now_us).await;
            }
            Some(mut position) if position.side == fill_side => {
                // Same side: weighted-average the entry price into the existing position.
                let new_qty = position.qty + fill_qty;
                position.entry_price =
                    (position.entry_price * position.qty + fill_price * fill_qty) / new_qty;
                position.qty = new_qty;
                position.mark(fill_price);
                self.positions.lock().insert(order.symbol.clone(), position.clone());
                self.publish("position_updated", &position, &strategy_id, now_us).await;
            }
            Some(mut position) => {
                // Opposite side: reduce, close, or flip.
                if fill_qty < position.qty {
                    let signed_qty = match position.side {
                        PositionSide::Long => fill_qty,
                        PositionSide::Short => -fill_qty,
                    };
                    let realized = (fill_price - position.entry_price) * signed_qty;
                    position.realized_pnl += realized;
                    position.qty -= fill_qty;
                    position.mark(fill_price);
                    self.positions.lock().insert(order.symbol.clone(), position.clone());
                    self.publish("position_updated", &position, &strategy_id, now_us).await;
                } else if fill_qty == position.qty {
                    position.close(fill_price);
                    self.publish("position_closed", &position, &strategy_id, now_us).await;
                } else {
                    position.close(fill_price);
                    self.publish("position_closed", &position, &strategy_id, now_us).await;
                    let remainder = fill_qty - position.qty;
                    let flipped = Position::open(
                        PositionId::new(format!("pos_{}", order.symbol)),
                        order.symbol.clone(),
                        fill_side,
                        remainder,
                        fill_price,
                    );
                    self.positions.lock().insert(order.symbol.clone(), flipped.clone());
                    self.publish("position_opened", &flipped, &strategy_id, now_us).await;
                }
            }
        }
    }

    /// Mark-to-market every open position against the latest tick for its
    /// symbol, publishing `position_updated` when one exists.
    pub async fn mark(&self, symbol: &Symbol, price: Decimal, strategy_id: StrategyId, now_us: i64) {
        let updated = {
            let mut positions = self.positions.lock();
            match positions.get_mut(symbol) {
                Some(position) => {
                    position.mark(price);
                    Some(position.clone())
                }
                None => None,
            }
        };
        if let Some(position) = updated {
            self.publish("position_updated", &position, &strategy_id, now_us).await;
        }
    }

    async fn publish(&self, topic: &str, position: &Position, strategy_id: &StrategyId, timestamp_us: i64) {
        let payload = serde_json::json!({
            "position": position,
            "strategy_id": strategy_id,
            "timestamp_us": timestamp_us,
        });
        if let Err(err) = self.bus.publish(topic, payload).await {
            warn!(%topic, error = %err, "failed to publish position event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradecore_instrument::{OrderId, OrderType};

    fn filled_order(side: OrderSide, qty: Decimal, price: Decimal) -> Order {
        let mut order = Order::new(
            OrderId::new("o1"),
            StrategyId::new("s1"),
            Symbol::new("BTC_USDT"),
            side,
            OrderType::Market,
            qty,
            Some(price),
            0,
        );
        order.apply_fill(qty, price, Decimal::ZERO);
        order
    }

    #[tokio::test]
    async fn first_fill_opens_a_position() {
        let bus = EventBus::new();
        let sync = PositionSync::new(bus);
        let order = filled_order(OrderSide::Buy, dec!(1), dec!(100));
        sync.reconcile_fill(StrategyId::new("s1"), &order, 0).await;

        let position = sync.position_for(&Symbol::new("BTC_USDT")).unwrap();
        assert_eq!(position.qty, dec!(1));
        assert_eq!(position.side, PositionSide::Long);
    }

    #[tokio::test]
    async fn opposite_fill_equal_to_qty_closes_the_position() {
        let bus = EventBus::new();
        let sync = PositionSync::new(bus);
        sync.reconcile_fill(StrategyId::new("s1"), &filled_order(OrderSide::Buy, dec!(1), dec!(100)), 0)
            .await;
        sync.reconcile_fill(StrategyId::new("s1"), &filled_order(OrderSide::Sell, dec!(1), dec!(110)), 1)
            .await;

        assert!(sync.position_for(&Symbol::new("BTC_USDT")).is_none());
    }

    #[tokio::test]
    async fn opposite_fill_larger_than_qty_flips_the_position() {
        let bus = EventBus::new();
        let sync = PositionSync::new(bus);
        sync.reconcile_fill(StrategyId::new("s1"), &filled_order(OrderSide::Buy, dec!(1), dec!(100)), 0)
            .await;
        sync.reconcile_fill(StrategyId::new("s1"), &filled_order(OrderSide::Sell, dec!(3), dec!(110)), 1)
            .await;

        let position = sync.position_for(&Symbol::new("BTC_USDT")).unwrap();
        assert_eq!(position.side, PositionSide::Short);
        assert_eq!(position.qty, dec!(2));
    }

    #[tokio::test]
    async fn same_side_fill_weight_averages_entry_price() {
        let bus = EventBus::new();
        let sync = PositionSync::new(bus);
        sync.reconcile_fill(StrategyId::new("s1"), &filled_order(OrderSide::Buy, dec!(1), dec!(100)), 0)
            .await;
        sync.reconcile_fill(StrategyId::new("s1"), &filled_order(OrderSide::Buy, dec!(1), dec!(200)), 1)
            .await;

        let position = sync.position_for(&Symbol::new("BTC_USDT")).unwrap();
        assert_eq!(position.qty, dec!(2));
        assert_eq!(position.entry_price, dec!(150));
    }
}
