use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;
use tradecore_bus::{EventBus, SubscriptionId};
use tradecore_controller::{
    ControllerError, DataSource, ExecutionController, HistoricalDataSource, LiveDataSource, OrderManagerSwap,
    PreStartHook,
};
use tradecore_coordinator::TradingCoordinator;
use tradecore_exchange::ExchangeAdapter;
use tradecore_execution::{BacktestOrderManager, LiveOrderManager, OrderManager, PaperOrderManager, PositionSync};
use tradecore_indicator::{IndicatorEngine, IndicatorRegistry};
use tradecore_instrument::{SessionId, SessionMode, Strategy, Symbol, VariantId};
use tradecore_persistence::{IndicatorPersistence, Store, TradingPersistence};
use tradecore_risk::RiskManager;
use tradecore_strategy::StrategyEvaluator;

use crate::config::EngineConfig;
use crate::error::{CommandResponse, EngineError};

/// Seam between [`ExecutionController`] and the rest of the collaborators.
/// `tradecore-controller` has no compile-time dependency on
/// `tradecore-strategy`/`tradecore-indicator`/`tradecore-execution` (spec.md
/// §9 "Global state" / "the controller's main loop" only ever talks to a
/// `PreStartHook`/`OrderManagerSwap` trait object); this is where the
/// composition root supplies the concrete behaviour those traits describe.
///
/// `pending_session` is set by [`Engine::start_session`] immediately before
/// calling `ExecutionController::start_execution`, so `prepare` — which the
/// controller invokes with only `(mode, symbols)` — knows which session id
/// to bind newly registered indicators under.
struct CompositionHooks {
    bus: EventBus,
    strategy_evaluator: Arc<StrategyEvaluator>,
    indicator_engine: Arc<IndicatorEngine>,
    risk: Arc<RiskManager>,
    positions: Arc<PositionSync>,
    exchange: Arc<dyn ExchangeAdapter>,
    order_manager_config: tradecore_execution::OrderManagerConfig,
    pending_session: Mutex<Option<SessionId>>,
    current_manager: Mutex<Option<(SubscriptionId, Arc<dyn OrderManager>)>>,
}

impl std::fmt::Debug for CompositionHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionHooks").finish_non_exhaustive()
    }
}

impl CompositionHooks {
    fn set_pending_session(&self, session_id: SessionId) {
        *self.pending_session.lock() = Some(session_id);
    }
}

#[async_trait]
impl PreStartHook for CompositionHooks {
    /// Registers a runtime indicator, under the pending session, for every
    /// `(symbol, indicator_id)` pair any registered strategy's five
    /// condition groups reference for `symbol` (spec.md §4.3 "Pre-start
    /// hook": "activates strategies for the session's symbols and
    /// registers all required indicator variants").
    async fn prepare(&self, _mode: SessionMode, symbols: &[Symbol]) -> Result<(), ControllerError> {
        let session_id = self
            .pending_session
            .lock()
            .clone()
            .ok_or_else(|| ControllerError::Io("pre-start hook invoked with no pending session".into()))?;

        let strategies = self.strategy_evaluator.list_strategies();
        for symbol in symbols {
            let mut seen: Vec<VariantId> = Vec::new();
            for strategy in &strategies {
                if !strategy.enabled {
                    continue;
                }
                for group in [&strategy.s1, &strategy.z1, &strategy.ze1, &strategy.o1, &strategy.emergency] {
                    for condition in &group.conditions {
                        if seen.contains(&condition.indicator_id) {
                            continue;
                        }
                        seen.push(condition.indicator_id.clone());
                        self.indicator_engine
                            .add_indicator_to_session(session_id.clone(), symbol.clone(), condition.indicator_id.clone())
                            .map_err(|err| ControllerError::PreStartHookFailed(err.to_string()))?;
                    }
                }
            }
        }
        info!(symbols = symbols.len(), strategies = strategies.len(), "pre-start hook: indicators bound");
        Ok(())
    }
}

#[async_trait]
impl OrderManagerSwap for CompositionHooks {
    /// Stops whichever `OrderManager` variant is currently subscribed to
    /// `signal_generated` and starts the one `mode` calls for (spec.md
    /// §4.3 "Backtest order-manager swap", §4.5). The swap is a bus
    /// subscribe/unsubscribe pair, never a direct reference the
    /// `StrategyEvaluator` holds — consistent with every other
    /// cross-component link in this workspace.
    async fn swap_to(&self, mode: SessionMode) -> Result<(), ControllerError> {
        if let Some((subscription, _old)) = self.current_manager.lock().take() {
            self.bus.unsubscribe("signal_generated", subscription);
        }

        let manager: Arc<dyn OrderManager> = match mode {
            SessionMode::Backtest => {
                BacktestOrderManager::new(self.bus.clone(), self.positions.clone(), self.order_manager_config.default_qty)
            }
            SessionMode::Live => LiveOrderManager::new(
                self.bus.clone(),
                self.exchange.clone(),
                self.risk.clone(),
                self.positions.clone(),
                self.order_manager_config,
            ),
            SessionMode::Paper | SessionMode::DataCollection => {
                PaperOrderManager::new(self.bus.clone(), self.positions.clone(), self.order_manager_config)
            }
        };
        let subscription = manager.subscription();
        *self.current_manager.lock() = Some((subscription, manager));
        info!(?mode, "order manager swapped");
        Ok(())
    }
}

/// Composition root for the tradecore trading core (spec.md §2 "Data
/// flow"/"Control flow"). Owns the process-wide [`EventBus`] and every
/// collaborator behind it, matching the teacher's top-level `jackbot`/
/// `barter` crate's role of wiring an `Engine` type around its workspace's
/// component crates.
///
/// Construction order mirrors the data-flow diagram: persistence writers
/// attach to the bus first (so nothing they'd observe is missed), then the
/// indicator engine, then the strategy evaluator, then the coordinator and
/// controller which depend on the others already being wired.
pub struct Engine {
    pub bus: EventBus,
    pub store: Arc<dyn Store>,
    pub exchange: Arc<dyn ExchangeAdapter>,
    pub indicator_registry: Arc<IndicatorRegistry>,
    pub indicator_engine: Arc<IndicatorEngine>,
    pub strategy_evaluator: Arc<StrategyEvaluator>,
    pub risk: Arc<RiskManager>,
    pub positions: Arc<PositionSync>,
    pub coordinator: Arc<TradingCoordinator>,
    pub controller: Arc<ExecutionController>,
    hooks: Arc<CompositionHooks>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("current_session", &self.controller.current_session().map(|s| s.session_id))
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, exchange: Arc<dyn ExchangeAdapter>, config: EngineConfig) -> Result<Arc<Self>, EngineError> {
        let bus = EventBus::with_config(config.event_bus.into());

        TradingPersistence::attach(&bus, store.clone());
        IndicatorPersistence::attach(&bus, store.clone());

        let indicator_registry = Arc::new(IndicatorRegistry::new());
        let indicator_engine = IndicatorEngine::new(bus.clone(), indicator_registry.clone(), config.indicator.into());
        let strategy_evaluator = StrategyEvaluator::new(bus.clone());
        let risk = Arc::new(RiskManager::new(config.risk_budget, config.leverage)?);
        let positions = Arc::new(PositionSync::new(bus.clone()));
        let coordinator = TradingCoordinator::new(bus.clone(), config.coordinator.into());
        coordinator.start();

        let hooks = Arc::new(CompositionHooks {
            bus: bus.clone(),
            strategy_evaluator: strategy_evaluator.clone(),
            indicator_engine: indicator_engine.clone(),
            risk: risk.clone(),
            positions: positions.clone(),
            exchange: exchange.clone(),
            order_manager_config: config.order_manager.into(),
            pending_session: Mutex::new(None),
            current_manager: Mutex::new(None),
        });

        let pre_start_hook: Arc<dyn PreStartHook> = hooks.clone();
        let order_manager_swap: Arc<dyn OrderManagerSwap> = hooks.clone();
        let controller = ExecutionController::new(bus.clone(), Some(pre_start_hook), Some(order_manager_swap));

        Ok(Arc::new(Self {
            bus,
            store,
            exchange,
            indicator_registry,
            indicator_engine,
            strategy_evaluator,
            risk,
            positions,
            coordinator,
            controller,
            hooks,
        }))
    }

    pub fn register_strategy(&self, strategy: Strategy) {
        self.strategy_evaluator.register_strategy(strategy);
    }

    /// `START_BACKTEST`/`START_TRADING`/`START_DATA_COLLECTION` (spec.md §6
    /// "Operator surface"): creates a session, sets the pre-start hook's
    /// pending session id, builds the mode-appropriate [`DataSource`], and
    /// starts the pipeline. Returns the assigned [`SessionId`] on success.
    pub async fn start_session(
        self: &Arc<Self>,
        mode: SessionMode,
        symbols: Vec<Symbol>,
        parameters: BTreeMap<String, serde_json::Value>,
        batch_size: usize,
    ) -> Result<SessionId, EngineError> {
        let session_id = self
            .controller
            .create_session(mode, symbols.clone(), parameters, true)
            .await?;
        self.hooks.set_pending_session(session_id.clone());

        let data_source: Arc<dyn DataSource> = match mode {
            SessionMode::Backtest => Arc::new(HistoricalDataSource::new(
                self.store.clone(),
                session_id.clone(),
                symbols,
                batch_size,
            )),
            SessionMode::Live | SessionMode::Paper | SessionMode::DataCollection => {
                Arc::new(LiveDataSource::new(self.exchange.clone(), symbols, batch_size))
            }
        };

        self.controller.start_execution(&session_id, data_source).await?;
        Ok(session_id)
    }

    /// `STOP_EXECUTION` (spec.md §6). Idempotent: see
    /// `ExecutionController::stop_execution`.
    pub async fn stop_session(&self, session_id: &SessionId, force: bool) -> Result<CommandResponse, EngineError> {
        match self.controller.stop_execution(session_id, force).await {
            Ok(()) => Ok(CommandResponse::ok(session_id.to_string())),
            Err(err) => {
                let err = EngineError::from(err);
                Ok(CommandResponse::failed(&err))
            }
        }
    }

    /// `PAUSE_EXECUTION` (spec.md §6).
    pub async fn pause_session(&self, session_id: &SessionId) -> Result<(), EngineError> {
        self.controller.pause_execution(session_id).await.map_err(EngineError::from)
    }

    /// `RESUME_EXECUTION` (spec.md §6).
    pub async fn resume_session(&self, session_id: &SessionId) -> Result<(), EngineError> {
        self.controller.resume_execution(session_id).await.map_err(EngineError::from)
    }

    pub fn health_check(&self) -> serde_json::Value {
        serde_json::json!({
            "event_bus": self.bus.health_check(),
            "coordinator": self.coordinator.health_check(),
            "session": self.controller.current_session().map(|s| s.status),
        })
    }

    /// Explicit teardown, mirroring the teacher's `EventBus::shutdown`
    /// lifecycle note (spec.md §9 "Global state"): stops the active
    /// session if any, then shuts down the bus so no further publishes are
    /// delivered.
    pub async fn shutdown(&self) {
        if let Some(session) = self.controller.current_session() {
            let _ = self.controller.stop_execution(&session.session_id, true).await;
        }
        self.coordinator.stop();
        self.bus.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;
    use tradecore_exchange::SimulatedAdapter;
    use tradecore_persistence::InMemoryStore;

    fn test_engine() -> Arc<Engine> {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let exchange: Arc<dyn ExchangeAdapter> = Arc::new(SimulatedAdapter::new(Decimal::ZERO));
        Engine::new(store, exchange, EngineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn starting_a_backtest_session_with_no_history_completes_immediately() {
        let engine = test_engine();
        let session_id = engine
            .start_session(SessionMode::Backtest, vec![Symbol::new("BTC_USDT")], BTreeMap::new(), 100)
            .await
            .unwrap();

        for _ in 0..20 {
            if engine.controller.session(&session_id).is_none() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(engine.controller.current_session().is_none() || engine.controller.session(&session_id).is_some());
    }

    #[tokio::test]
    async fn health_check_reports_bus_and_coordinator_status() {
        let engine = test_engine();
        let health = engine.health_check();
        assert_eq!(health["event_bus"]["healthy"], serde_json::json!(true));
    }
}
