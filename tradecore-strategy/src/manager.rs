use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use tradecore_bus::{EventBus, HandlerError};
use tradecore_instrument::{
    ConditionGroup, Signal, SignalAction, SignalType, Strategy, StrategyDirection, StrategyId, Symbol, SymbolFsmState,
    SymbolState, VariantId,
};

use crate::evaluator::evaluate_group;
use crate::state::{IndicatorCache, StrategySymbolKey, SymbolStateTable};

/// `O1`'s default timeout when a strategy's config doesn't specify one
/// (spec.md §4.4, matching the Python original's 300s/5min default).
const DEFAULT_O1_TIMEOUT_SECONDS: u64 = 300;
/// Emergency's default cooldown when a strategy's config doesn't specify
/// one (the Python original's `cooldownMinutes` default of 60).
const DEFAULT_EMERGENCY_COOLDOWN_SECONDS: u64 = 3600;

#[derive(Debug, Deserialize)]
struct IndicatorUpdate {
    symbol: Symbol,
    indicator_id: VariantId,
    value: Option<serde_json::Value>,
}

/// Maintains per-`(strategy, symbol)` [`SymbolState`] and translates
/// `indicator.updated` events into `signal_generated` events (spec.md
/// §4.4). Ported from
/// `examples/original_source/src/engine/strategy_evaluator_4section.py`'s
/// `StrategyEvaluator4Section`, generalised from a single hard-coded
/// strategy to a registry of [`Strategy`] configs evaluated per update.
///
/// The `order_manager` reference spec.md §4.5 describes is realised here
/// as a bus subscription rather than a direct field: `signal_generated` is
/// always published, and exactly one `OrderManager` variant is subscribed
/// to it at a time (the controller swaps the subscription on mode change,
/// see `tradecore-controller`) — consistent with every other
/// cross-component link in this workspace going through the
/// [`EventBus`] rather than a raw reference.
pub struct StrategyEvaluator {
    bus: EventBus,
    strategies: Mutex<Vec<Strategy>>,
    states: Mutex<SymbolStateTable>,
    indicators: Mutex<IndicatorCache>,
}

impl StrategyEvaluator {
    pub fn new(bus: EventBus) -> Arc<Self> {
        let evaluator = Arc::new(Self {
            bus,
            strategies: Mutex::new(Vec::new()),
            states: Mutex::new(SymbolStateTable::default()),
            indicators: Mutex::new(IndicatorCache::default()),
        });
        evaluator.clone().attach();
        evaluator
    }

    fn attach(self: Arc<Self>) {
        let evaluator = self.clone();
        self.bus.subscribe("indicator.updated", move |event| {
            let evaluator = evaluator.clone();
            async move {
                let update: IndicatorUpdate = serde_json::from_value(event.data)
                    .map_err(|e| HandlerError::new(format!("malformed indicator.updated payload: {e}")))?;
                let Some(serde_json::Value::Number(number)) = update.value else {
                    return Ok(()); // null or non-scalar: nothing to evaluate against
                };
                let Some(value) = number.as_f64() else {
                    return Ok(());
                };
                evaluator.on_indicator_update(update.symbol, update.indicator_id, value).await;
                Ok(())
            }
        });
    }

    pub fn register_strategy(&self, strategy: Strategy) {
        self.strategies.lock().push(strategy);
    }

    pub fn unregister_strategy(&self, id: &StrategyId) {
        self.strategies.lock().retain(|s| &s.id != id);
    }

    /// Every currently registered strategy (enabled or not). Used by the
    /// composition root's pre-start hook to discover which indicator ids a
    /// session's symbols need bound before the data stream begins (spec.md
    /// §4.3 "Pre-start hook").
    pub fn list_strategies(&self) -> Vec<Strategy> {
        self.strategies.lock().clone()
    }

    async fn on_indicator_update(&self, symbol: Symbol, indicator_id: VariantId, value: f64) {
        self.indicators.lock().update(symbol.clone(), indicator_id, value);

        let strategies: Vec<Strategy> = self.strategies.lock().iter().filter(|s| s.enabled).cloned().collect();
        for strategy in strategies {
            self.evaluate_for_symbol(&strategy, &symbol).await;
        }
    }

    async fn evaluate_for_symbol(&self, strategy: &Strategy, symbol: &Symbol) {
        let key = StrategySymbolKey::new(strategy.id.clone(), symbol.clone());
        let indicator_values = self.indicators.lock().values_for(symbol);
        let now = Utc::now();

        let snapshot = self.states.lock().get_or_default(&key).clone();

        if !snapshot.is_emergency_on_cooldown(now) && !strategy.emergency.conditions.is_empty() {
            let (triggered, met) = evaluate_group(&strategy.emergency, &indicator_values);
            if triggered {
                let cooldown = strategy.emergency.cooldown_seconds.unwrap_or(DEFAULT_EMERGENCY_COOLDOWN_SECONDS);
                {
                    let mut states = self.states.lock();
                    let state = states.get_or_default(&key);
                    state.set_emergency_cooldown(now + chrono::Duration::seconds(cooldown as i64));
                    state.reset_to_idle();
                }
                self.publish_signal(strategy, symbol, SignalType::Emergency, met, &indicator_values, SignalAction::Close, now)
                    .await;
                return;
            }
        }

        match snapshot.state {
            SymbolFsmState::Idle => {
                let (triggered, met) = if strategy.s1.conditions.is_empty() {
                    (false, Vec::new())
                } else {
                    evaluate_group(&strategy.s1, &indicator_values)
                };
                if triggered {
                    self.states.lock().get_or_default(&key).enter_s1(now);
                    self.publish_signal(strategy, symbol, SignalType::S1, met, &indicator_values, SignalAction::LockSymbol, now)
                        .await;
                }
            }
            SymbolFsmState::S1Active => {
                let (triggered, met) = if strategy.z1.conditions.is_empty() {
                    (false, Vec::new())
                } else {
                    evaluate_group(&strategy.z1, &indicator_values)
                };
                if triggered {
                    self.states.lock().get_or_default(&key).enter_z1(now);
                    let action = direction_to_entry_action(strategy.direction);
                    self.publish_signal(strategy, symbol, SignalType::Z1, met, &indicator_values, action, now).await;
                } else if self.check_o1(&strategy.o1, &indicator_values, &snapshot, now) {
                    self.states.lock().get_or_default(&key).reset_to_idle();
                    self.publish_signal(strategy, symbol, SignalType::O1, Vec::new(), &indicator_values, SignalAction::Cancel, now)
                        .await;
                }
            }
            SymbolFsmState::Z1Active => {
                let (triggered, met) = if strategy.ze1.conditions.is_empty() {
                    (false, Vec::new())
                } else {
                    evaluate_group(&strategy.ze1, &indicator_values)
                };
                if triggered {
                    self.states.lock().get_or_default(&key).enter_ze1();
                    self.publish_signal(strategy, symbol, SignalType::Ze1, met, &indicator_values, SignalAction::Close, now)
                        .await;
                } else if self.check_o1(&strategy.o1, &indicator_values, &snapshot, now) {
                    self.states.lock().get_or_default(&key).reset_to_idle();
                    self.publish_signal(strategy, symbol, SignalType::O1, Vec::new(), &indicator_values, SignalAction::Cancel, now)
                        .await;
                }
            }
            SymbolFsmState::Ze1Active => {
                if self.check_o1(&strategy.o1, &indicator_values, &snapshot, now) {
                    self.states.lock().get_or_default(&key).reset_to_idle();
                    self.publish_signal(strategy, symbol, SignalType::O1, Vec::new(), &indicator_values, SignalAction::Cancel, now)
                        .await;
                }
            }
        }
    }

    /// O1 fires when either the group's own conditions evaluate true or the
    /// section has been waiting longer than `timeout_seconds` (spec.md
    /// §4.4, "group true OR now - signal_start_time >= timeout_seconds").
    fn check_o1(
        &self,
        group: &ConditionGroup,
        indicator_values: &std::collections::BTreeMap<VariantId, f64>,
        state: &SymbolState,
        now: DateTime<Utc>,
    ) -> bool {
        if let Some(start) = state.signal_start_time {
            let timeout = group.timeout_seconds.unwrap_or(DEFAULT_O1_TIMEOUT_SECONDS);
            if (now - start).num_seconds() >= timeout as i64 {
                return true;
            }
        }
        if group.conditions.is_empty() {
            return false;
        }
        evaluate_group(group, indicator_values).0
    }

    async fn publish_signal(
        &self,
        strategy: &Strategy,
        symbol: &Symbol,
        signal_type: SignalType,
        conditions_met: Vec<VariantId>,
        indicator_values: &std::collections::BTreeMap<VariantId, f64>,
        action: SignalAction,
        now: DateTime<Utc>,
    ) {
        let signal = Signal {
            strategy_id: strategy.id.clone(),
            symbol: symbol.clone(),
            signal_type,
            triggered: true,
            conditions_met,
            indicator_values: indicator_values.clone(),
            action,
            timestamp_us: now.timestamp_micros(),
            metadata: serde_json::Value::Null,
        };
        debug!(strategy = %strategy.id, %symbol, ?signal_type, "publishing signal");
        match serde_json::to_value(&signal) {
            Ok(payload) => {
                if let Err(err) = self.bus.publish("signal_generated", payload).await {
                    warn!(error = %err, "failed to publish signal_generated");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialise signal"),
        }
    }
}

fn direction_to_entry_action(direction: StrategyDirection) -> SignalAction {
    match direction {
        StrategyDirection::Long => SignalAction::Buy,
        StrategyDirection::Short => SignalAction::Sell,
        // Both-direction strategies decide long/short via indicator sign
        // elsewhere; defaulting to Buy keeps Z1 entry deterministic when no
        // such signal is present (see DESIGN.md open-question decision).
        StrategyDirection::Both => SignalAction::Buy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradecore_instrument::{Condition, Operator};

    fn strategy_with_s1(condition: Condition) -> Strategy {
        Strategy {
            id: StrategyId::new("s1"),
            name: "test".into(),
            direction: StrategyDirection::Long,
            enabled: true,
            s1: ConditionGroup::new(vec![condition]),
            z1: ConditionGroup::default(),
            ze1: ConditionGroup::default(),
            o1: ConditionGroup::default(),
            emergency: ConditionGroup::default(),
        }
    }

    #[tokio::test]
    async fn s1_condition_met_publishes_signal_and_transitions_state() {
        let bus = EventBus::new();
        let evaluator = StrategyEvaluator::new(bus.clone());
        let indicator_id = VariantId::new("twpa_1");
        evaluator.register_strategy(strategy_with_s1(Condition::new(indicator_id.clone(), Operator::Gt, 100.0)));

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        bus.subscribe("signal_generated", move |event| {
            let sink = sink.clone();
            async move {
                sink.lock().push(event.data);
                Ok(())
            }
        });

        let symbol = Symbol::new("BTC_USDT");
        bus.publish(
            "indicator.updated",
            serde_json::json!({
                "symbol": symbol,
                "indicator_id": indicator_id,
                "value": 150.0
            }),
        )
        .await
        .unwrap();

        let signals = received.lock();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0]["signal_type"], serde_json::json!("S1"));
    }

    #[tokio::test]
    async fn null_indicator_value_does_not_trigger_evaluation() {
        let bus = EventBus::new();
        let evaluator = StrategyEvaluator::new(bus.clone());
        evaluator.register_strategy(strategy_with_s1(Condition::new(VariantId::new("x"), Operator::Gt, 100.0)));

        let received = Arc::new(Mutex::new(0u32));
        let counter = received.clone();
        bus.subscribe("signal_generated", move |_event| {
            let counter = counter.clone();
            async move {
                *counter.lock() += 1;
                Ok(())
            }
        });

        bus.publish(
            "indicator.updated",
            serde_json::json!({ "symbol": "BTC_USDT", "indicator_id": "x", "value": null }),
        )
        .await
        .unwrap();
        assert_eq!(*received.lock(), 0);
    }
}
