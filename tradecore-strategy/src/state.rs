use std::collections::BTreeMap;
use tradecore_instrument::{StrategyId, Symbol, SymbolState, VariantId};

/// Composite key for per-`(strategy, symbol)` [`SymbolState`] tracking
/// (spec.md §4.4 "Maintain per-(strategy, symbol) SymbolState").
#[derive(Debug, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct StrategySymbolKey {
    pub strategy_id: StrategyId,
    pub symbol: Symbol,
}

impl StrategySymbolKey {
    pub fn new(strategy_id: StrategyId, symbol: Symbol) -> Self {
        Self { strategy_id, symbol }
    }
}

/// Latest known value per indicator, keyed by symbol (spec.md §4.4
/// "Inputs": `indicator_values[symbol][indicator_id]`).
#[derive(Debug, Default)]
pub struct IndicatorCache {
    by_symbol: std::collections::HashMap<Symbol, BTreeMap<VariantId, f64>>,
}

impl IndicatorCache {
    pub fn update(&mut self, symbol: Symbol, indicator_id: VariantId, value: f64) {
        self.by_symbol.entry(symbol).or_default().insert(indicator_id, value);
    }

    pub fn values_for(&self, symbol: &Symbol) -> BTreeMap<VariantId, f64> {
        self.by_symbol.get(symbol).cloned().unwrap_or_default()
    }
}

/// Per-`(strategy, symbol)` FSM states.
#[derive(Debug, Default)]
pub struct SymbolStateTable {
    states: std::collections::HashMap<StrategySymbolKey, SymbolState>,
}

impl SymbolStateTable {
    pub fn get_or_default(&mut self, key: &StrategySymbolKey) -> &mut SymbolState {
        self.states.entry(key.clone()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_cache_scopes_values_per_symbol() {
        let mut cache = IndicatorCache::default();
        cache.update(Symbol::new("BTC_USDT"), VariantId::new("twpa_1"), 100.0);
        cache.update(Symbol::new("ETH_USDT"), VariantId::new("twpa_1"), 50.0);
        assert_eq!(cache.values_for(&Symbol::new("BTC_USDT")).get(&VariantId::new("twpa_1")), Some(&100.0));
        assert_eq!(cache.values_for(&Symbol::new("ETH_USDT")).get(&VariantId::new("twpa_1")), Some(&50.0));
    }
}
