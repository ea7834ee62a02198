use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A budget allocation, either an absolute notional cap or a percentage of
/// `global_cap` (spec.md §4.8, `{key: absolute_or_percent}`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allocation {
    Absolute(Decimal),
    Percent(Decimal),
}

impl Allocation {
    fn resolve(self, global_cap: Decimal) -> Decimal {
        match self {
            Allocation::Absolute(amount) => amount,
            Allocation::Percent(pct) => global_cap * pct / Decimal::ONE_HUNDRED,
        }
    }
}

/// Budget configuration for a [`crate::RiskManager`], typed per SPEC_FULL.md's
/// ambient-configuration section (mirrors `jackbot-strategy::StrategyConfig`'s
/// parameter-bag idiom: a loose key -> allocation map, since the keys are
/// whatever the deployment names its symbols/strategies as).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub global_cap: Decimal,
    pub allocations: BTreeMap<String, Allocation>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            global_cap: Decimal::ZERO,
            allocations: BTreeMap::new(),
        }
    }
}

impl BudgetConfig {
    /// Total allocation must not exceed `global_cap` (spec.md §4.8): a
    /// session whose allocations overcommit the cap must fail startup
    /// rather than silently overspend later.
    pub fn validate(&self) -> Result<(), BudgetValidationError> {
        let total: Decimal = self
            .allocations
            .values()
            .map(|allocation| allocation.resolve(self.global_cap))
            .sum();
        if total > self.global_cap {
            return Err(BudgetValidationError::AllocationsExceedGlobalCap {
                total,
                global_cap: self.global_cap,
            });
        }
        Ok(())
    }

    pub(crate) fn allocation_for(&self, key: &str) -> Decimal {
        self.allocations
            .get(key)
            .map(|allocation| allocation.resolve(self.global_cap))
            .unwrap_or(self.global_cap)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BudgetValidationError {
    #[error("budget allocations total {total} exceed global cap {global_cap}")]
    AllocationsExceedGlobalCap { total: Decimal, global_cap: Decimal },
}

/// Snapshot returned by [`crate::RiskManager::get_budget_summary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub global_cap: Decimal,
    pub used: Decimal,
    pub available: Decimal,
    pub per_key_used: BTreeMap<String, Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percent_allocation_resolves_against_global_cap() {
        let mut allocations = BTreeMap::new();
        allocations.insert("BTC_USDT".to_string(), Allocation::Percent(dec!(50)));
        let config = BudgetConfig {
            global_cap: dec!(10000),
            allocations,
        };
        assert_eq!(config.allocation_for("BTC_USDT"), dec!(5000));
    }

    #[test]
    fn validate_rejects_overcommitted_allocations() {
        let mut allocations = BTreeMap::new();
        allocations.insert("a".to_string(), Allocation::Absolute(dec!(6000)));
        allocations.insert("b".to_string(), Allocation::Absolute(dec!(6000)));
        let config = BudgetConfig {
            global_cap: dec!(10000),
            allocations,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_allocations_within_cap() {
        let mut allocations = BTreeMap::new();
        allocations.insert("a".to_string(), Allocation::Absolute(dec!(4000)));
        let config = BudgetConfig {
            global_cap: dec!(10000),
            allocations,
        };
        assert!(config.validate().is_ok());
    }
}
