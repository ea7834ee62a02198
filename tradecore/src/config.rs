use serde::{Deserialize, Serialize};
use std::time::Duration;

use tradecore_coordinator::CoordinatorConfig;
use tradecore_indicator::IndicatorEngineConfig;
use tradecore_risk::{BudgetConfig, LeverageLimits};

/// Typed configuration for an [`crate::Engine`], per SPEC_FULL.md's ambient
/// "Configuration" section. Deserialisable so a caller-supplied loader can
/// populate it from whatever format it parses (TOML/JSON/env) — no loader
/// is implemented here, only the shape it would deserialise into, matching
/// `jackbot-strategy::StrategyConfig`'s pattern of a typed struct with
/// `#[serde(default)]` fields rather than a loose dict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub event_bus: EventBusSettings,
    pub scheduler: SchedulerConfig,
    pub risk_budget: BudgetConfig,
    pub leverage: LeverageLimits,
    pub coordinator: CoordinatorSettings,
    pub indicator: IndicatorSettings,
    pub order_manager: OrderManagerSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_bus: EventBusSettings::default(),
            scheduler: SchedulerConfig::default(),
            risk_budget: BudgetConfig::default(),
            leverage: LeverageLimits::default(),
            coordinator: CoordinatorSettings::default(),
            indicator: IndicatorSettings::default(),
            order_manager: OrderManagerSettings::default(),
        }
    }
}

/// Retry/backoff tunables for [`tradecore_bus::EventBus`], serialisable so
/// a deployment can override the spec.md §4.1 defaults (1s/2s/4s, 3 retries)
/// without recompiling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusSettings {
    pub max_retries: u32,
    #[serde(with = "duration_millis")]
    pub retry_backoff_base: Duration,
}

impl Default for EventBusSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff_base: Duration::from_secs(1),
        }
    }
}

impl From<EventBusSettings> for tradecore_bus::EventBusConfig {
    fn from(settings: EventBusSettings) -> Self {
        tradecore_bus::EventBusConfig {
            max_retries: settings.max_retries,
            retry_backoff_base: settings.retry_backoff_base,
        }
    }
}

/// Cadences the scheduler-driven parts of the trading core run on (spec.md
/// §5 "Cancellation & timeouts", §4.2 "Scheduler"). `indicator_tick` feeds
/// [`IndicatorEngineConfig::scheduler_tick`]; `flush_interval` bounds how
/// often buffered data is flushed (500ms default, 1s minimum in
/// data-collection mode, 5min maximum, per spec.md §5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    #[serde(with = "duration_millis")]
    pub indicator_tick: Duration,
    #[serde(with = "duration_millis")]
    pub flush_interval: Duration,
    #[serde(with = "duration_millis")]
    pub stop_drain_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            indicator_tick: Duration::from_millis(250),
            flush_interval: Duration::from_millis(500),
            stop_drain_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorSettings {
    pub rate_limit_per_minute: u32,
    #[serde(with = "duration_millis")]
    pub decision_timeout: Duration,
    #[serde(with = "duration_millis")]
    pub cleanup_interval: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        let defaults = CoordinatorConfig::default();
        Self {
            rate_limit_per_minute: defaults.rate_limit_per_minute,
            decision_timeout: defaults.decision_timeout,
            cleanup_interval: defaults.cleanup_interval,
        }
    }
}

impl From<CoordinatorSettings> for CoordinatorConfig {
    fn from(settings: CoordinatorSettings) -> Self {
        CoordinatorConfig {
            rate_limit_per_minute: settings.rate_limit_per_minute,
            decision_timeout: settings.decision_timeout,
            cleanup_interval: settings.cleanup_interval,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub ring_buffer_capacity: usize,
    #[serde(with = "duration_millis")]
    pub scheduler_tick: Duration,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        let defaults = IndicatorEngineConfig::default();
        Self {
            ring_buffer_capacity: defaults.ring_buffer_capacity,
            scheduler_tick: defaults.scheduler_tick,
        }
    }
}

impl From<IndicatorSettings> for IndicatorEngineConfig {
    fn from(settings: IndicatorSettings) -> Self {
        IndicatorEngineConfig {
            ring_buffer_capacity: settings.ring_buffer_capacity,
            scheduler_tick: settings.scheduler_tick,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderManagerSettings {
    pub default_qty: rust_decimal::Decimal,
    pub slippage_bps: rust_decimal::Decimal,
    pub commission_rate: rust_decimal::Decimal,
}

impl Default for OrderManagerSettings {
    fn default() -> Self {
        Self {
            default_qty: rust_decimal::Decimal::ONE,
            slippage_bps: rust_decimal::Decimal::ZERO,
            commission_rate: rust_decimal::Decimal::ZERO,
        }
    }
}

impl From<OrderManagerSettings> for tradecore_execution::OrderManagerConfig {
    fn from(settings: OrderManagerSettings) -> Self {
        tradecore_execution::OrderManagerConfig {
            default_qty: settings.default_qty,
            slippage_bps: settings.slippage_bps,
            commission_rate: settings.commission_rate,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.event_bus.max_retries, config.event_bus.max_retries);
        assert_eq!(restored.scheduler.flush_interval, config.scheduler.flush_interval);
    }

    #[test]
    fn zero_budget_default_validates() {
        assert!(EngineConfig::default().risk_budget.validate().is_ok());
    }
}
