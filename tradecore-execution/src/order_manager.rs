use tradecore_bus::SubscriptionId;

/// Sizing rule every `OrderManager` variant uses to turn a `BUY`/`SELL`
/// [`tradecore_instrument::Signal`] into an order quantity. spec.md §4.5
/// doesn't pin a sizing algorithm; a fixed per-symbol notional-to-quantity
/// conversion is the simplest rule that lets all three variants, and the
/// Risk Manager's `notional` check, agree on what "the order" is (see
/// DESIGN.md open-question decision).
#[derive(Debug, Clone, Copy)]
pub struct OrderManagerConfig {
    pub default_qty: rust_decimal::Decimal,
    pub slippage_bps: rust_decimal::Decimal,
    pub commission_rate: rust_decimal::Decimal,
}

impl Default for OrderManagerConfig {
    fn default() -> Self {
        Self {
            default_qty: rust_decimal::Decimal::ONE,
            slippage_bps: rust_decimal::Decimal::ZERO,
            commission_rate: rust_decimal::Decimal::ZERO,
        }
    }
}

/// Shared contract the Live/Paper/Backtest variants all implement
/// (spec.md §4.5, "one interface, three implementations"). Each variant
/// subscribes itself to `signal_generated` on construction; `subscription`
/// exposes the resulting id so the Execution Controller can unsubscribe
/// this instance — without dropping it mid-flight — when hot-swapping the
/// active variant on a session mode change (spec.md §4.3 "Backtest
/// order-manager swap", §4.5 "the controller atomically rebinds it").
pub trait OrderManager: Send + Sync + std::fmt::Debug {
    fn subscription(&self) -> SubscriptionId;
}
