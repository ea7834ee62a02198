use crate::symbol::{OrderId, StrategyId, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
}

/// Lifecycle status of an [`Order`]. `Filled`, `Cancelled` and `Rejected`
/// are absorbing: once reached, no further status transition is valid
/// (spec.md §8).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// An order submitted by the Order Manager, live/paper/backtest alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub strategy_id: StrategyId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub qty: Decimal,
    pub price: Option<Decimal>,
    pub filled_qty: Decimal,
    pub filled_price: Option<Decimal>,
    pub commission: Decimal,
    pub status: OrderStatus,
    pub timestamp_us: i64,
    pub metadata: serde_json::Value,
}

impl Order {
    pub fn new(
        order_id: OrderId,
        strategy_id: StrategyId,
        symbol: Symbol,
        side: OrderSide,
        order_type: OrderType,
        qty: Decimal,
        price: Option<Decimal>,
        timestamp_us: i64,
    ) -> Self {
        Self {
            order_id,
            strategy_id,
            symbol,
            side,
            order_type,
            qty,
            price,
            filled_qty: Decimal::ZERO,
            filled_price: None,
            commission: Decimal::ZERO,
            status: OrderStatus::New,
            timestamp_us,
            metadata: serde_json::Value::Null,
        }
    }

    /// Record a (partial or full) fill. Never allows `filled_qty` to exceed
    /// `qty` (spec.md §3, §8) — callers must clamp upstream; this asserts
    /// the invariant rather than silently correcting it, since a fill
    /// exceeding the order quantity indicates an adapter bug.
    pub fn apply_fill(&mut self, fill_qty: Decimal, fill_price: Decimal, commission: Decimal) {
        assert!(
            self.filled_qty + fill_qty <= self.qty,
            "fill would push filled_qty above order qty"
        );
        self.filled_qty += fill_qty;
        self.filled_price = Some(fill_price);
        self.commission += commission;
        self.status = if self.filled_qty == self.qty {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order::new(
            OrderId::new("o1"),
            StrategyId::new("s1"),
            Symbol::new("BTC_USDT"),
            OrderSide::Buy,
            OrderType::Market,
            dec!(1.0),
            None,
            0,
        )
    }

    #[test]
    fn partial_fill_does_not_reach_terminal_status() {
        let mut order = order();
        order.apply_fill(dec!(0.4), dec!(100), dec!(0.01));
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert!(!order.status.is_terminal());
        assert_eq!(order.filled_qty, dec!(0.4));
    }

    #[test]
    fn full_fill_reaches_filled_and_is_terminal() {
        let mut order = order();
        order.apply_fill(dec!(1.0), dec!(100), dec!(0.01));
        assert_eq!(order.status, OrderStatus::Filled);
        assert!(order.status.is_terminal());
    }

    #[test]
    #[should_panic(expected = "fill would push filled_qty above order qty")]
    fn overfill_panics() {
        let mut order = order();
        order.apply_fill(dec!(2.0), dec!(100), dec!(0));
    }
}
