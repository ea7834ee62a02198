use crate::symbol::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single trade print.
///
/// Monotonic per-symbol by `timestamp_us`, but not globally monotonic across
/// symbols (spec.md §3) — the Streaming Indicator Engine enforces the
/// per-symbol invariant on ingestion, not this type.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Tick {
    pub symbol: Symbol,
    /// Epoch microseconds.
    pub timestamp_us: i64,
    pub price: Decimal,
    pub volume: Decimal,
    pub quote_volume: Option<Decimal>,
}

impl Tick {
    pub fn new(symbol: Symbol, timestamp_us: i64, price: Decimal, volume: Decimal) -> Self {
        Self {
            symbol,
            timestamp_us,
            price,
            volume,
            quote_volume: None,
        }
    }

    pub fn with_quote_volume(mut self, quote_volume: Decimal) -> Self {
        self.quote_volume = Some(quote_volume);
        self
    }
}

/// A single price/quantity level in an orderbook.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct OrderLevel {
    pub price: Decimal,
    pub qty: Decimal,
}

impl OrderLevel {
    pub fn new(price: Decimal, qty: Decimal) -> Self {
        Self { price, qty }
    }
}

/// Top-N bids and asks at a point in time.
///
/// Spec.md §3 requires the top-3 levels as the guaranteed minimum retained;
/// callers that need fewer than 3 levels of depth may still construct a
/// snapshot with fewer, but the Streaming Indicator Engine's orderbook
/// indicators assume at least the best bid/ask are present.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderbookSnapshot {
    pub symbol: Symbol,
    /// Epoch microseconds.
    pub timestamp_us: i64,
    /// Best bid first.
    pub bids: Vec<OrderLevel>,
    /// Best ask first.
    pub asks: Vec<OrderLevel>,
}

impl OrderbookSnapshot {
    pub fn new(symbol: Symbol, timestamp_us: i64, bids: Vec<OrderLevel>, asks: Vec<OrderLevel>) -> Self {
        Self {
            symbol,
            timestamp_us,
            bids,
            asks,
        }
    }

    pub fn best_bid(&self) -> Option<OrderLevel> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<OrderLevel> {
        self.asks.first().copied()
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / Decimal::from(2)),
            _ => None,
        }
    }

    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    pub fn total_bid_qty(&self) -> Decimal {
        self.bids.iter().map(|level| level.qty).sum()
    }

    pub fn total_ask_qty(&self) -> Decimal {
        self.asks.iter().map(|level| level.qty).sum()
    }

    /// `(bids - asks) / (bids + asks)`, per spec.md §4.2's orderbook algorithm notes.
    /// Returns `None` when there is no depth at all on either side.
    pub fn bid_ask_imbalance(&self) -> Option<Decimal> {
        let bid_qty = self.total_bid_qty();
        let ask_qty = self.total_ask_qty();
        let total = bid_qty + ask_qty;
        if total.is_zero() {
            return None;
        }
        Some((bid_qty - ask_qty) / total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn book() -> OrderbookSnapshot {
        OrderbookSnapshot::new(
            Symbol::new("BTC_USDT"),
            1_000_000,
            vec![
                OrderLevel::new(dec!(100), dec!(2)),
                OrderLevel::new(dec!(99), dec!(1)),
            ],
            vec![
                OrderLevel::new(dec!(101), dec!(1)),
                OrderLevel::new(dec!(102), dec!(1)),
            ],
        )
    }

    #[test]
    fn mid_price_averages_best_levels() {
        assert_eq!(book().mid_price(), Some(dec!(100.5)));
    }

    #[test]
    fn bid_ask_imbalance_matches_formula() {
        // bid_qty=3, ask_qty=2 => (3-2)/5 = 0.2
        assert_eq!(book().bid_ask_imbalance(), Some(dec!(0.2)));
    }

    #[test]
    fn imbalance_is_none_when_book_is_empty() {
        let empty = OrderbookSnapshot::new(Symbol::new("BTC_USDT"), 0, vec![], vec![]);
        assert_eq!(empty.bid_ask_imbalance(), None);
    }
}
