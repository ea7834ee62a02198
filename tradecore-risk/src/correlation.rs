use rust_decimal::Decimal;
use std::collections::HashMap;
use tradecore_instrument::Symbol;

/// Manages combined-exposure limits between symbol pairs. Ported from
/// `jackbot-risk::correlation::CorrelationMatrix`, specialised to
/// [`Symbol`] keys.
#[derive(Debug, Default, Clone)]
pub struct CorrelationTracker {
    limits: HashMap<(Symbol, Symbol), Decimal>,
}

impl CorrelationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_limit(&mut self, a: Symbol, b: Symbol, limit: Decimal) {
        self.limits.insert((a, b), limit);
    }

    /// `None` when no limit is configured for the pair; otherwise whether
    /// `combined_exposure` breaches the configured limit.
    pub fn check(&self, a: &Symbol, b: &Symbol, combined_exposure: Decimal) -> Option<bool> {
        self.limits
            .get(&(a.clone(), b.clone()))
            .map(|limit| combined_exposure > *limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn check_flags_breach_only_for_configured_pairs() {
        let mut tracker = CorrelationTracker::new();
        let btc = Symbol::new("BTC_USDT");
        let eth = Symbol::new("ETH_USDT");
        tracker.set_limit(btc.clone(), eth.clone(), dec!(1000));

        assert_eq!(tracker.check(&btc, &eth, dec!(1500)), Some(true));
        assert_eq!(tracker.check(&btc, &eth, dec!(500)), Some(false));
        assert_eq!(tracker.check(&eth, &btc, dec!(1500)), None);
    }
}
