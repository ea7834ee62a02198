use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tradecore_instrument::Symbol;

use crate::budget::{BudgetConfig, BudgetSummary, BudgetValidationError};
use crate::decision::{Decision, RiskDenialReason};
use crate::drawdown::DrawdownTracker;
use crate::exposure::ExposureTracker;

/// Per-symbol leverage ceiling, checked alongside the budget in
/// `can_open_position` (spec.md §4.8).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeverageLimits {
    pub default_limit: Decimal,
    pub per_symbol: std::collections::BTreeMap<String, Decimal>,
}

impl LeverageLimits {
    fn limit_for(&self, symbol: &Symbol) -> Decimal {
        self.per_symbol
            .get(symbol.as_str())
            .copied()
            .unwrap_or(self.default_limit)
    }
}

struct Inner {
    budget: BudgetConfig,
    used_total: Decimal,
    used_by_key: std::collections::BTreeMap<String, Decimal>,
    exposure: ExposureTracker,
    drawdown: DrawdownTracker,
}

/// spec.md §4.8: stateless with respect to market data, stateful with
/// respect to budget/exposure. `can_open_position` is the synchronous
/// pre-submit gate `OrderManager`'s Live variant calls before forwarding an
/// order to the exchange (spec.md §4.5); it must never block on I/O, so all
/// state lives behind a [`parking_lot::Mutex`] read synchronously rather
/// than an async lock. Generalises `jackbot-risk`'s exposure/drawdown
/// trackers (see [`crate::exposure`], [`crate::drawdown`],
/// [`crate::correlation`]) under one façade.
pub struct RiskManager {
    leverage: LeverageLimits,
    inner: Mutex<Inner>,
}

impl RiskManager {
    pub fn new(budget: BudgetConfig, leverage: LeverageLimits) -> Result<Self, BudgetValidationError> {
        budget.validate()?;
        Ok(Self {
            leverage,
            inner: Mutex::new(Inner {
                budget,
                used_total: Decimal::ZERO,
                used_by_key: std::collections::BTreeMap::new(),
                exposure: ExposureTracker::new(),
                drawdown: DrawdownTracker::new(),
            }),
        })
    }

    /// Synchronous pre-submit gate. Checks, in order: leverage ceiling,
    /// per-key allocation, global cap. The first violation wins.
    pub fn can_open_position(&self, symbol: &Symbol, notional: Decimal, leverage: Decimal) -> Decision {
        let limit = self.leverage.limit_for(symbol);
        if limit > Decimal::ZERO && leverage > limit {
            return Decision::Denied(RiskDenialReason::LeverageAboveLimit {
                requested: leverage,
                limit,
            });
        }

        let inner = self.inner.lock();
        let key = symbol.as_str();
        let allocation = inner.budget.allocation_for(key);
        let used_for_key = inner.used_by_key.get(key).copied().unwrap_or(Decimal::ZERO);
        if used_for_key + notional > allocation {
            return Decision::Denied(RiskDenialReason::AllocationExceeded {
                key: key.to_string(),
                requested: notional,
                available: allocation - used_for_key,
            });
        }
        if inner.used_total + notional > inner.budget.global_cap {
            return Decision::Denied(RiskDenialReason::GlobalCapExceeded {
                requested: notional,
                available: inner.budget.global_cap - inner.used_total,
            });
        }
        Decision::Approved
    }

    pub fn use_budget(&self, symbol: &Symbol, notional: Decimal) {
        let mut inner = self.inner.lock();
        inner.used_total += notional;
        *inner
            .used_by_key
            .entry(symbol.as_str().to_string())
            .or_insert(Decimal::ZERO) += notional;
        inner.exposure.update(symbol.clone(), notional);
    }

    pub fn release_budget(&self, symbol: &Symbol, notional: Decimal) {
        let mut inner = self.inner.lock();
        inner.used_total -= notional;
        if let Some(used) = inner.used_by_key.get_mut(symbol.as_str()) {
            *used -= notional;
        }
        inner.exposure.update(symbol.clone(), -notional);
    }

    pub fn record_pnl(&self, symbol: Symbol, pnl: Decimal) {
        self.inner.lock().drawdown.update_pnl(symbol, pnl);
    }

    pub fn drawdown(&self, symbol: &Symbol) -> Decimal {
        self.inner.lock().drawdown.drawdown(symbol)
    }

    pub fn get_budget_summary(&self) -> BudgetSummary {
        let inner = self.inner.lock();
        BudgetSummary {
            global_cap: inner.budget.global_cap,
            used: inner.used_total,
            available: inner.budget.global_cap - inner.used_total,
            per_key_used: inner.used_by_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn manager(global_cap: Decimal) -> RiskManager {
        RiskManager::new(
            BudgetConfig {
                global_cap,
                allocations: BTreeMap::new(),
            },
            LeverageLimits {
                default_limit: dec!(10),
                per_symbol: BTreeMap::new(),
            },
        )
        .unwrap()
    }

    #[test]
    fn can_open_position_denies_over_global_cap() {
        let risk = manager(dec!(1000));
        let symbol = Symbol::new("BTC_USDT");
        assert!(risk.can_open_position(&symbol, dec!(500), dec!(2)).is_approved());
        risk.use_budget(&symbol, dec!(500));
        let decision = risk.can_open_position(&symbol, dec!(600), dec!(2));
        assert!(!decision.is_approved());
    }

    #[test]
    fn can_open_position_denies_over_leverage_limit() {
        let risk = manager(dec!(1000));
        let symbol = Symbol::new("BTC_USDT");
        let decision = risk.can_open_position(&symbol, dec!(100), dec!(20));
        assert_eq!(
            decision,
            Decision::Denied(RiskDenialReason::LeverageAboveLimit {
                requested: dec!(20),
                limit: dec!(10),
            })
        );
    }

    #[test]
    fn use_and_release_budget_round_trip_to_zero() {
        let risk = manager(dec!(1000));
        let symbol = Symbol::new("BTC_USDT");
        risk.use_budget(&symbol, dec!(300));
        risk.release_budget(&symbol, dec!(300));
        let summary = risk.get_budget_summary();
        assert_eq!(summary.used, Decimal::ZERO);
        assert_eq!(summary.available, dec!(1000));
    }
}
