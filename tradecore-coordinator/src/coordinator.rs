use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tradecore_bus::{EventBus, HandlerError, SubscriptionId};
use tradecore_instrument::{SessionId, Symbol};

use crate::decision::SubscriptionDecision;
use crate::rate_limit::RateLimitState;

/// Per-symbol subscription bookkeeping the coordinator tracks on behalf of
/// the live market adapter.
#[derive(Debug, Clone, Default)]
struct SubscriptionState {
    is_subscribed: bool,
    failure_count: u32,
    last_failure_reason: Option<String>,
}

#[derive(Debug, Clone)]
struct CircuitBreakerState {
    open: bool,
    raw: serde_json::Value,
}

/// Tunables for [`TradingCoordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub rate_limit_per_minute: u32,
    pub decision_timeout: Duration,
    /// Cadence the stale-pending-request sweep runs at.
    pub cleanup_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: 60,
            decision_timeout: Duration::from_secs(5),
            cleanup_interval: Duration::from_secs(30),
        }
    }
}

/// Health snapshot returned by [`TradingCoordinator::health_check`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct CoordinatorHealth {
    pub healthy: bool,
    pub session_manager_registered: bool,
    pub active_sessions: usize,
    pub active_subscriptions: usize,
    pub pending_requests: usize,
    pub requests_this_minute: u32,
    pub max_per_minute: u32,
}

/// Mediator breaking the circular dependency between the live market
/// adapter (asks "may I subscribe to symbol X?") and the session manager
/// (owns the answer) (spec.md §4.6). Every cross-component reference flows
/// through the [`EventBus`] — `TradingCoordinator` never holds a direct
/// reference to either side.
///
/// Ported from `examples/original_source/src/trading/trading_coordinator.py`.
/// The Python original correlates requests with `asyncio.Future`s stashed in
/// a dict; this uses `tokio::sync::oneshot` channels for the same
/// request/response pattern, which also makes the "cancel everything on
/// stop" step a matter of dropping the sender halves.
#[derive(Debug)]
pub struct TradingCoordinator {
    bus: EventBus,
    config: CoordinatorConfig,

    rate_limit: Mutex<RateLimitState>,
    subscriptions: Mutex<HashMap<Symbol, SubscriptionState>>,
    circuit_breaker_states: Mutex<HashMap<Symbol, CircuitBreakerState>>,
    active_sessions: Mutex<HashMap<SessionId, serde_json::Value>>,
    session_manager_registered: AtomicBool,

    pending: Mutex<HashMap<String, oneshot::Sender<SubscriptionDecision>>>,
    next_request_seq: std::sync::atomic::AtomicU64,

    running: AtomicBool,
    bus_subscriptions: Mutex<Vec<SubscriptionId>>,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl TradingCoordinator {
    pub fn new(bus: EventBus, config: CoordinatorConfig) -> Arc<Self> {
        info!(
            rate_limit_per_minute = config.rate_limit_per_minute,
            decision_timeout = ?config.decision_timeout,
            "trading coordinator initialized"
        );
        Arc::new(Self {
            rate_limit: Mutex::new(RateLimitState::new(config.rate_limit_per_minute)),
            bus,
            config,
            subscriptions: Mutex::new(HashMap::new()),
            circuit_breaker_states: Mutex::new(HashMap::new()),
            active_sessions: Mutex::new(HashMap::new()),
            session_manager_registered: AtomicBool::new(false),
            pending: Mutex::new(HashMap::new()),
            next_request_seq: std::sync::atomic::AtomicU64::new(0),
            running: AtomicBool::new(false),
            bus_subscriptions: Mutex::new(Vec::new()),
            cleanup_task: Mutex::new(None),
        })
    }

    /// Subscribe to the EventBus topics the mediator protocol needs and
    /// start the stale-request sweep. Idempotent.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::AcqRel) {
            warn!("trading coordinator already running");
            return;
        }

        let mut subs = Vec::with_capacity(5);

        let c = self.clone();
        subs.push(self.bus.subscribe("session.registered", move |_event| {
            let c = c.clone();
            async move {
                c.session_manager_registered.store(true, Ordering::Release);
                info!("session manager registered with coordinator");
                Ok(())
            }
        }));

        let c = self.clone();
        subs.push(self.bus.subscribe("session.started", move |event| {
            let c = c.clone();
            async move {
                if let Some(session_id) = event.data.get("session_id").and_then(|v| v.as_str()) {
                    c.active_sessions.lock().insert(SessionId::new(session_id), event.data.clone());
                    info!(%session_id, "coordinator tracking session");
                }
                Ok(())
            }
        }));

        let c = self.clone();
        subs.push(self.bus.subscribe("session.stopped", move |event| {
            let c = c.clone();
            async move {
                if let Some(session_id) = event.data.get("session_id").and_then(|v| v.as_str()) {
                    c.active_sessions.lock().remove(&SessionId::new(session_id));
                    info!(%session_id, "coordinator dropped session");
                }
                Ok(())
            }
        }));

        let c = self.clone();
        subs.push(self.bus.subscribe("circuit_breaker.state_changed", move |event| {
            let c = c.clone();
            async move {
                let Some(symbol) = event.data.get("symbol").and_then(|v| v.as_str()) else {
                    return Ok(());
                };
                let open = event.data.get("state").and_then(|v| v.as_str()) == Some("open");
                c.circuit_breaker_states.lock().insert(
                    Symbol::new(symbol),
                    CircuitBreakerState {
                        open,
                        raw: event.data.clone(),
                    },
                );
                debug!(%symbol, open, "circuit breaker state updated");
                Ok(())
            }
        }));

        let c = self.clone();
        subs.push(self.bus.subscribe("subscription.check_response", move |event| {
            let c = c.clone();
            async move {
                let request_id = event
                    .data
                    .get("request_id")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| HandlerError::new("subscription.check_response missing request_id"))?;
                let Some(sender) = c.pending.lock().remove(request_id) else {
                    return Ok(());
                };
                let allowed = event.data.get("allowed").and_then(|v| v.as_bool()).unwrap_or(true);
                let reason = event.data.get("reason").and_then(|v| v.as_str()).unwrap_or_default();
                let _ = sender.send(SubscriptionDecision::from_response(allowed, reason));
                Ok(())
            }
        }));

        *self.bus_subscriptions.lock() = subs;

        let cleanup_coordinator = self.clone();
        let interval = self.config.cleanup_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                cleanup_coordinator.sweep_stale_requests();
            }
        });
        *self.cleanup_task.lock() = Some(handle);

        info!(
            subscribed_topics = 5,
            "trading coordinator started"
        );
    }

    /// Unsubscribe from the bus and cancel every pending subscription
    /// request (their senders are simply dropped, resolving the
    /// corresponding `request_subscription` await with a closed channel,
    /// handled as a fail-open timeout).
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.cleanup_task.lock().take() {
            handle.abort();
        }
        for id in self.bus_subscriptions.lock().drain(..) {
            self.bus.unsubscribe("session.registered", id);
            self.bus.unsubscribe("session.started", id);
            self.bus.unsubscribe("session.stopped", id);
            self.bus.unsubscribe("circuit_breaker.state_changed", id);
            self.bus.unsubscribe("subscription.check_response", id);
        }
        self.pending.lock().clear();
        info!("trading coordinator stopped");
    }

    /// Request permission to subscribe to `symbol` (spec.md §4.6
    /// "Coordination protocol"). Checks, in order: local rate limit, cached
    /// circuit-breaker state, then — only if a session manager has
    /// registered — a round-trip request/response correlated by id, with a
    /// fail-open timeout.
    pub async fn request_subscription(&self, symbol: &Symbol, requester_id: &str) -> SubscriptionDecision {
        if !self.rate_limit.lock().try_acquire() {
            warn!(%symbol, "coordinator rate limited subscription request");
            return SubscriptionDecision::DeniedRateLimit;
        }

        if !self.session_manager_registered.load(Ordering::Acquire) {
            warn!(%symbol, "no session manager registered, allowing by default (graceful degradation)");
            return SubscriptionDecision::Allowed;
        }

        if let Some(state) = self.circuit_breaker_states.lock().get(symbol) {
            if state.open {
                info!(%symbol, "circuit breaker open, denying subscription");
                return SubscriptionDecision::DeniedCircuitOpen;
            }
        }

        let seq = self.next_request_seq.fetch_add(1, Ordering::Relaxed);
        let request_id = format!("{symbol}_{seq}");
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id.clone(), tx);

        let publish_result = self
            .bus
            .publish(
                "subscription.check_request",
                serde_json::json!({
                    "request_id": request_id,
                    "symbol": symbol,
                    "requester_id": requester_id,
                }),
            )
            .await;
        if publish_result.is_err() {
            self.pending.lock().remove(&request_id);
            warn!(%symbol, "failed to publish subscription.check_request, allowing (fail-open)");
            return SubscriptionDecision::Allowed;
        }

        let decision = match tokio::time::timeout(self.config.decision_timeout, rx).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(_)) | Err(_) => {
                warn!(%symbol, timeout = ?self.config.decision_timeout, "subscription check timed out, allowing (fail-open)");
                SubscriptionDecision::Allowed
            }
        };
        self.pending.lock().remove(&request_id);
        decision
    }

    pub async fn notify_subscription_success(&self, symbol: &Symbol) {
        let mut subscriptions = self.subscriptions.lock();
        let state = subscriptions.entry(symbol.clone()).or_default();
        state.is_subscribed = true;
        state.failure_count = 0;
        drop(subscriptions);

        let _ = self.bus.publish("subscription.success", serde_json::json!({"symbol": symbol})).await;
        debug!(%symbol, "subscription success tracked");
    }

    pub async fn notify_subscription_failure(&self, symbol: &Symbol, error: &str) {
        let failure_count = {
            let mut subscriptions = self.subscriptions.lock();
            let state = subscriptions.entry(symbol.clone()).or_default();
            state.failure_count += 1;
            state.last_failure_reason = Some(error.to_string());
            state.failure_count
        };

        let _ = self
            .bus
            .publish(
                "subscription.failure",
                serde_json::json!({"symbol": symbol, "error": error, "failure_count": failure_count}),
            )
            .await;
        warn!(%symbol, error, failure_count, "subscription failure tracked");
    }

    pub async fn request_unsubscription(&self, symbol: &Symbol) {
        if let Some(state) = self.subscriptions.lock().get_mut(symbol) {
            state.is_subscribed = false;
        }
        let _ = self.bus.publish("subscription.unsubscribed", serde_json::json!({"symbol": symbol})).await;
    }

    pub fn is_session_active(&self, session_id: Option<&SessionId>) -> bool {
        match session_id {
            Some(id) => self.active_sessions.lock().contains_key(id),
            None => !self.active_sessions.lock().is_empty(),
        }
    }

    pub fn get_active_symbols(&self) -> Vec<Symbol> {
        self.subscriptions
            .lock()
            .iter()
            .filter(|(_, state)| state.is_subscribed)
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    pub fn get_circuit_breaker_state(&self, symbol: &Symbol) -> serde_json::Value {
        self.circuit_breaker_states
            .lock()
            .get(symbol)
            .map(|s| s.raw.clone())
            .unwrap_or_else(|| serde_json::json!({"state": "closed", "failure_count": 0}))
    }

    pub fn get_rate_limit_status(&self) -> serde_json::Value {
        let rate_limit = self.rate_limit.lock();
        let requests = rate_limit.requests_this_minute();
        let max = rate_limit.max_per_minute();
        serde_json::json!({
            "requests_this_minute": requests,
            "max_per_minute": max,
            "remaining": max.saturating_sub(requests),
        })
    }

    pub fn health_check(&self) -> CoordinatorHealth {
        let rate_limit = self.rate_limit.lock();
        CoordinatorHealth {
            healthy: self.running.load(Ordering::Acquire),
            session_manager_registered: self.session_manager_registered.load(Ordering::Acquire),
            active_sessions: self.active_sessions.lock().len(),
            active_subscriptions: self.subscriptions.lock().values().filter(|s| s.is_subscribed).count(),
            pending_requests: self.pending.lock().len(),
            requests_this_minute: rate_limit.requests_this_minute(),
            max_per_minute: rate_limit.max_per_minute(),
        }
    }

    fn sweep_stale_requests(&self) {
        let before = self.pending.lock().len();
        self.pending.lock().retain(|_, sender| !sender.is_closed());
        let after = self.pending.lock().len();
        if before != after {
            debug!(cleaned = before - after, "swept stale pending subscription requests");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_by_default_when_no_session_manager_registered() {
        let bus = EventBus::new();
        let coordinator = TradingCoordinator::new(bus, CoordinatorConfig::default());
        coordinator.start();

        let decision = coordinator.request_subscription(&Symbol::new("BTC_USDT"), "market_adapter").await;
        assert_eq!(decision, SubscriptionDecision::Allowed);
    }

    #[tokio::test]
    async fn rate_limit_denies_once_the_per_minute_budget_is_exhausted() {
        let bus = EventBus::new();
        let coordinator = TradingCoordinator::new(
            bus,
            CoordinatorConfig {
                rate_limit_per_minute: 1,
                ..Default::default()
            },
        );
        coordinator.start();

        let first = coordinator.request_subscription(&Symbol::new("BTC_USDT"), "market_adapter").await;
        let second = coordinator.request_subscription(&Symbol::new("ETH_USDT"), "market_adapter").await;
        assert_eq!(first, SubscriptionDecision::Allowed);
        assert_eq!(second, SubscriptionDecision::DeniedRateLimit);
    }

    #[tokio::test]
    async fn open_circuit_breaker_denies_subscription_once_session_manager_registered() {
        let bus = EventBus::new();
        let coordinator = TradingCoordinator::new(bus.clone(), CoordinatorConfig::default());
        coordinator.start();

        bus.publish("session.registered", serde_json::json!({"id": "sm1"})).await.unwrap();
        bus.publish(
            "circuit_breaker.state_changed",
            serde_json::json!({"symbol": "BTC_USDT", "state": "open"}),
        )
        .await
        .unwrap();
        // Allow the async subscribers above to run before asserting.
        tokio::task::yield_now().await;

        let decision = coordinator.request_subscription(&Symbol::new("BTC_USDT"), "market_adapter").await;
        assert_eq!(decision, SubscriptionDecision::DeniedCircuitOpen);
    }

    #[tokio::test]
    async fn fails_open_when_the_decision_times_out() {
        let bus = EventBus::new();
        let coordinator = TradingCoordinator::new(
            bus.clone(),
            CoordinatorConfig {
                decision_timeout: Duration::from_millis(20),
                ..Default::default()
            },
        );
        coordinator.start();
        bus.publish("session.registered", serde_json::json!({"id": "sm1"})).await.unwrap();
        tokio::task::yield_now().await;

        // No subscription.check_response will ever arrive, so this must
        // fail open after the configured timeout rather than hang.
        let decision = coordinator.request_subscription(&Symbol::new("BTC_USDT"), "market_adapter").await;
        assert_eq!(decision, SubscriptionDecision::Allowed);
    }
}
