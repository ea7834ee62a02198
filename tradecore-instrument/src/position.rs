use crate::symbol::{PositionId, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Closed,
    Liquidated,
}

/// A netted position. Per spec.md §3, there is at most one `Position` per
/// symbol at a time — `tradecore-execution::position_sync` enforces this by
/// netting fills into the existing position rather than creating a second
/// one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub position_id: PositionId,
    pub symbol: Symbol,
    pub side: PositionSide,
    pub qty: Decimal,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub status: PositionStatus,
}

impl Position {
    pub fn open(
        position_id: PositionId,
        symbol: Symbol,
        side: PositionSide,
        qty: Decimal,
        entry_price: Decimal,
    ) -> Self {
        Self {
            position_id,
            symbol,
            side,
            qty,
            entry_price,
            current_price: entry_price,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            stop_loss: None,
            take_profit: None,
            status: PositionStatus::Open,
        }
    }

    fn signed_qty(&self) -> Decimal {
        match self.side {
            PositionSide::Long => self.qty,
            PositionSide::Short => -self.qty,
        }
    }

    /// Recompute `unrealized_pnl` given the latest mark price.
    pub fn mark(&mut self, current_price: Decimal) {
        self.current_price = current_price;
        self.unrealized_pnl = (current_price - self.entry_price) * self.signed_qty();
    }

    /// Close the position against `exit_price`, crystallising
    /// `unrealized_pnl` into `realized_pnl`. `total_pnl` across a book is
    /// the sum of every closed position's `realized_pnl` (spec.md §8).
    pub fn close(&mut self, exit_price: Decimal) -> Decimal {
        let realized = (exit_price - self.entry_price) * self.signed_qty();
        self.current_price = exit_price;
        self.realized_pnl += realized;
        self.unrealized_pnl = Decimal::ZERO;
        self.status = PositionStatus::Closed;
        realized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn long_position_pnl_follows_price_direction() {
        let mut position = Position::open(
            PositionId::new("p1"),
            Symbol::new("BTC_USDT"),
            PositionSide::Long,
            dec!(2),
            dec!(100),
        );
        position.mark(dec!(110));
        assert_eq!(position.unrealized_pnl, dec!(20));

        let realized = position.close(dec!(110));
        assert_eq!(realized, dec!(20));
        assert_eq!(position.realized_pnl, dec!(20));
        assert_eq!(position.status, PositionStatus::Closed);
    }

    #[test]
    fn short_position_pnl_is_inverted() {
        let mut position = Position::open(
            PositionId::new("p2"),
            Symbol::new("ETH_USDT"),
            PositionSide::Short,
            dec!(1),
            dec!(100),
        );
        position.mark(dec!(90));
        assert_eq!(position.unrealized_pnl, dec!(10));
    }
}
