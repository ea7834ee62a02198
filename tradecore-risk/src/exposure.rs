use rust_decimal::Decimal;
use std::collections::HashMap;
use tradecore_instrument::Symbol;

/// Tracks notional exposure per symbol. Ported from the teacher's
/// `jackbot-risk::exposure::ExposureTracker<InstrumentKey>`, specialised to
/// [`Symbol`] since this workspace has no `InstrumentIndex` registry.
#[derive(Debug, Default, Clone)]
pub struct ExposureTracker {
    exposures: HashMap<Symbol, Decimal>,
}

impl ExposureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, symbol: Symbol, notional: Decimal) {
        *self.exposures.entry(symbol).or_insert(Decimal::ZERO) += notional;
    }

    pub fn exposure(&self, symbol: &Symbol) -> Decimal {
        *self.exposures.get(symbol).unwrap_or(&Decimal::ZERO)
    }

    pub fn total_exposure(&self) -> Decimal {
        self.exposures.values().sum()
    }

    pub fn exceeds(&self, symbol: &Symbol, limit: Decimal) -> bool {
        self.exposure(symbol) > limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn update_accumulates_per_symbol() {
        let mut tracker = ExposureTracker::new();
        tracker.update(Symbol::new("BTC_USDT"), dec!(100));
        tracker.update(Symbol::new("BTC_USDT"), dec!(50));
        tracker.update(Symbol::new("ETH_USDT"), dec!(10));
        assert_eq!(tracker.exposure(&Symbol::new("BTC_USDT")), dec!(150));
        assert_eq!(tracker.total_exposure(), dec!(160));
    }

    #[test]
    fn exceeds_compares_against_limit() {
        let mut tracker = ExposureTracker::new();
        tracker.update(Symbol::new("BTC_USDT"), dec!(100));
        assert!(tracker.exceeds(&Symbol::new("BTC_USDT"), dec!(50)));
        assert!(!tracker.exceeds(&Symbol::new("BTC_USDT"), dec!(200)));
    }
}
