use rust_decimal::Decimal;
use std::collections::HashMap;
use tradecore_instrument::Symbol;

/// Tracks realised/unrealised PnL to compute a per-symbol drawdown
/// percentage. Ported from `jackbot-risk::drawdown::DrawdownTracker`.
#[derive(Debug, Default, Clone)]
pub struct DrawdownTracker {
    peak: HashMap<Symbol, Decimal>,
    current: HashMap<Symbol, Decimal>,
}

impl DrawdownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_pnl(&mut self, symbol: Symbol, pnl: Decimal) {
        let current = self.current.entry(symbol.clone()).or_insert(Decimal::ZERO);
        *current += pnl;
        let peak = self.peak.entry(symbol).or_insert(*current);
        if *current > *peak {
            *peak = *current;
        }
    }

    /// `(peak - current) / peak`, zero if there's no recorded peak yet.
    pub fn drawdown(&self, symbol: &Symbol) -> Decimal {
        let current = *self.current.get(symbol).unwrap_or(&Decimal::ZERO);
        let peak = *self.peak.get(symbol).unwrap_or(&current);
        if peak.is_zero() {
            Decimal::ZERO
        } else {
            (peak - current) / peak
        }
    }

    pub fn exceeds(&self, symbol: &Symbol, limit: Decimal) -> bool {
        self.drawdown(symbol) > limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn drawdown_tracks_retreat_from_peak() {
        let mut tracker = DrawdownTracker::new();
        let symbol = Symbol::new("BTC_USDT");
        tracker.update_pnl(symbol.clone(), dec!(100));
        tracker.update_pnl(symbol.clone(), dec!(-30));
        assert_eq!(tracker.drawdown(&symbol), dec!(0.3));
    }

    #[test]
    fn new_high_resets_peak_and_drawdown() {
        let mut tracker = DrawdownTracker::new();
        let symbol = Symbol::new("BTC_USDT");
        tracker.update_pnl(symbol.clone(), dec!(100));
        tracker.update_pnl(symbol.clone(), dec!(50));
        assert_eq!(tracker.drawdown(&symbol), Decimal::ZERO);
    }
}
