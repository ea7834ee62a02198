use std::collections::BTreeMap;
use std::hash::Hasher;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use fnv::FnvHasher;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};
use tradecore_bus::EventBus;
use tradecore_instrument::{ExecutionSession, SessionId, SessionMode, SessionStatus, Symbol};

use crate::data_source::DataSource;
use crate::error::ControllerError;
use crate::fsm;
use crate::hooks::{OrderManagerSwap, PreStartHook};
use crate::lease::SymbolLeaseTable;

/// `(mode, sorted upper-cased symbols, hash of `parameters["strategy_config"]`)`.
/// Two `create_session` calls with an equal key describe the same logical
/// activation request (spec.md §4.3 "Idempotency key").
///
/// Ported from `execution_controller.py`'s `_compute_idempotency_key`, which
/// hashes `json.dumps(strategy_config, sort_keys=True)` with sha256; here
/// `fnv` stands in for sha256 since this crate has no other use for a
/// cryptographic hash and `serde_json::Value::Object` is already
/// key-sorted without the `preserve_order` feature, giving the same
/// canonical-string property the Python original relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IdempotencyKey {
    mode: SessionMode,
    symbols: Vec<String>,
    config_hash: u64,
}

enum FinalizeOutcome {
    Completed,
    Stopped,
    Error(String),
}

/// Owns the single execution session a process may run at a time (spec.md
/// §3), the symbol lease table guarding it, and the background pipeline
/// task that drains a [`DataSource`] into the EventBus.
///
/// Ported from `execution_controller.py`'s `ExecutionController` class.
pub struct ExecutionController {
    bus: EventBus,
    current: RwLock<Option<ExecutionSession>>,
    leases: SymbolLeaseTable,
    pre_start_hook: Option<Arc<dyn PreStartHook>>,
    order_manager_swap: Option<Arc<dyn OrderManagerSwap>>,
    pipeline_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    active_data_source: Mutex<Option<Arc<dyn DataSource>>>,
    /// Serialises every path that can finalise a session (manual stop,
    /// natural completion, error) so exactly one of them actually runs the
    /// cleanup and publishes the terminal event, no matter how many race
    /// (spec.md §8 scenario 6).
    stop_lock: tokio::sync::Mutex<()>,
    progress_callbacks: Mutex<Vec<Arc<dyn Fn(SessionId, f64) + Send + Sync>>>,
    last_progress_publish: Mutex<Option<Instant>>,
    paused: AtomicBool,
    session_seq: AtomicU64,
    idempotency: Mutex<Option<(IdempotencyKey, SessionId)>>,
}

impl std::fmt::Debug for ExecutionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionController")
            .field("current", &self.current.read().as_ref().map(|s| &s.session_id))
            .finish_non_exhaustive()
    }
}

impl ExecutionController {
    pub fn new(
        bus: EventBus,
        pre_start_hook: Option<Arc<dyn PreStartHook>>,
        order_manager_swap: Option<Arc<dyn OrderManagerSwap>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            current: RwLock::new(None),
            leases: SymbolLeaseTable::new(),
            pre_start_hook,
            order_manager_swap,
            pipeline_task: Mutex::new(None),
            active_data_source: Mutex::new(None),
            stop_lock: tokio::sync::Mutex::new(()),
            progress_callbacks: Mutex::new(Vec::new()),
            last_progress_publish: Mutex::new(None),
            paused: AtomicBool::new(false),
            session_seq: AtomicU64::new(0),
            idempotency: Mutex::new(None),
        })
    }

    pub fn current_session(&self) -> Option<ExecutionSession> {
        self.current.read().clone()
    }

    pub fn session(&self, session_id: &SessionId) -> Option<ExecutionSession> {
        self.current
            .read()
            .clone()
            .filter(|session| &session.session_id == session_id)
    }

    pub fn add_progress_callback(&self, callback: Arc<dyn Fn(SessionId, f64) + Send + Sync>) {
        self.progress_callbacks.lock().push(callback);
    }

    fn compute_idempotency_key(
        mode: SessionMode,
        symbols: &[Symbol],
        parameters: &BTreeMap<String, serde_json::Value>,
    ) -> IdempotencyKey {
        let mut symbols: Vec<String> = symbols.iter().map(|s| s.as_str().to_uppercase()).collect();
        symbols.sort();

        let strategy_config = parameters.get("strategy_config").cloned().unwrap_or_else(|| serde_json::json!({}));
        let canonical = serde_json::to_string(&strategy_config).unwrap_or_default();
        let mut hasher = FnvHasher::default();
        hasher.write(canonical.as_bytes());

        IdempotencyKey {
            mode,
            symbols,
            config_hash: hasher.finish(),
        }
    }

    /// `exec_YYYYMMDD_HHMMSS_<8-hex>`. The suffix comes from a monotonic
    /// sequence counter mixed with the process id via `fnv`, not `rand` or
    /// `uuid` — the same choice `tradecore-coordinator` makes for request
    /// ids, carried here for the same reason: no cryptographic randomness
    /// is actually required, only a value unlikely to collide within a
    /// process.
    fn next_session_id(&self) -> SessionId {
        let seq = self.session_seq.fetch_add(1, Ordering::Relaxed);
        let mut hasher = FnvHasher::default();
        hasher.write_u64(seq);
        hasher.write_u32(std::process::id());
        let hash = hasher.finish();
        SessionId::generate(Utc::now(), (hash & 0xFFFF_FFFF) as u32)
    }

    fn seed_metrics(session: &mut ExecutionSession) {
        match session.mode {
            SessionMode::DataCollection => {
                session.metrics.insert("rows_collected".into(), 0.0);
            }
            SessionMode::Backtest | SessionMode::Live | SessionMode::Paper => {
                session.metrics.insert("ticks_processed".into(), 0.0);
                session.metrics.insert("signals_generated".into(), 0.0);
                session.metrics.insert("orders_filled".into(), 0.0);
            }
        }
    }

    /// Creates a new session and leases its symbols (spec.md §4.3 "Session
    /// creation"). When `idempotent` is set and an equal idempotency key was
    /// used to create the currently active session, returns that session's
    /// id instead of creating a new one. On a symbol conflict, publishes
    /// `execution.symbol_conflict` and returns
    /// [`ControllerError::SymbolConflict`] without mutating any state.
    pub async fn create_session(
        &self,
        mode: SessionMode,
        symbols: Vec<Symbol>,
        parameters: BTreeMap<String, serde_json::Value>,
        idempotent: bool,
    ) -> Result<SessionId, ControllerError> {
        let key = Self::compute_idempotency_key(mode, &symbols, &parameters);

        if idempotent {
            let cached = self.idempotency.lock().clone();
            if let Some((cached_key, cached_id)) = cached {
                if cached_key == key {
                    let matches_current = self
                        .current
                        .read()
                        .as_ref()
                        .is_some_and(|session| session.session_id == cached_id);
                    if matches_current {
                        debug!(session_id = %cached_id, "create_session: idempotent reuse");
                        return Ok(cached_id);
                    }
                }
            }
        }

        let live_session = self.current.read().as_ref().map(|session| session.session_id.clone());
        let session_id = self.next_session_id();

        if let Err((symbol, owner)) = self.leases.acquire(&session_id, &symbols, live_session.as_ref()) {
            warn!(%symbol, active_session = %owner, "execution.symbol_conflict");
            self.bus
                .publish(
                    "execution.symbol_conflict",
                    serde_json::json!({"symbol": symbol.as_str(), "active_session": owner.to_string()}),
                )
                .await
                .ok();
            return Err(ControllerError::SymbolConflict {
                symbol,
                active_session: owner,
            });
        }

        let mut session = ExecutionSession::new(session_id.clone(), mode, symbols);
        session.parameters = parameters;
        *self.current.write() = Some(session);
        *self.idempotency.lock() = Some((key, session_id.clone()));
        *self.active_data_source.lock() = None;
        self.paused.store(false, Ordering::SeqCst);

        Ok(session_id)
    }

    /// Runs the pre-start hook and order-manager swap, starts `data_source`,
    /// transitions the session to `RUNNING`, and spawns the pipeline task
    /// that drains it (spec.md §4.3 "Pre-start hook", "Backtest order-manager
    /// swap").
    pub async fn start_execution(
        self: &Arc<Self>,
        session_id: &SessionId,
        data_source: Arc<dyn DataSource>,
    ) -> Result<(), ControllerError> {
        let (mode, symbols) = {
            let mut guard = self.current.write();
            let session = guard
                .as_mut()
                .filter(|session| &session.session_id == session_id)
                .ok_or(ControllerError::NoActiveSession)?;
            if !fsm::is_valid_transition(session.status, SessionStatus::Starting) {
                return Err(ControllerError::InvalidStateTransition {
                    from: session.status,
                    to: SessionStatus::Starting,
                });
            }
            session.status = SessionStatus::Starting;
            (session.mode, session.symbols.clone())
        };

        if let Some(hook) = &self.pre_start_hook {
            if let Err(err) = hook.prepare(mode, &symbols).await {
                self.mark_error(session_id, err.to_string());
                return Err(ControllerError::PreStartHookFailed(err.to_string()));
            }
        }
        if let Some(swap) = &self.order_manager_swap {
            if let Err(err) = swap.swap_to(mode).await {
                self.mark_error(session_id, err.to_string());
                return Err(ControllerError::OrderManagerSwapFailed(err.to_string()));
            }
        }

        data_source.start_stream().await.map_err(|err| {
            self.mark_error(session_id, err.to_string());
            err
        })?;

        {
            let mut guard = self.current.write();
            if let Some(session) = guard.as_mut() {
                session.status = SessionStatus::Running;
                session.start_time = Some(Utc::now());
                Self::seed_metrics(session);
            }
        }
        *self.active_data_source.lock() = Some(Arc::clone(&data_source));

        self.bus
            .publish(
                "execution.session_started",
                serde_json::json!({"session_id": session_id.to_string(), "mode": format!("{mode:?}")}),
            )
            .await
            .ok();

        let controller = Arc::clone(self);
        let session_id = session_id.clone();
        let handle = tokio::spawn(async move {
            controller.run_pipeline(session_id, data_source).await;
        });
        *self.pipeline_task.lock() = Some(handle);

        Ok(())
    }

    /// Best-effort: used only when a pre-start failure needs to leave the
    /// session in `ERROR` instead of stuck in `STARTING`. Never overwrites a
    /// session that has already reached a terminal state.
    fn mark_error(&self, session_id: &SessionId, message: String) {
        let mut guard = self.current.write();
        if let Some(session) = guard.as_mut() {
            if &session.session_id == session_id
                && session.status != SessionStatus::Stopped
                && session.status != SessionStatus::Error
            {
                session.status = SessionStatus::Error;
                session.error_message = Some(message);
                session.end_time = Some(Utc::now());
            }
        }
    }

    async fn run_pipeline(self: Arc<Self>, session_id: SessionId, data_source: Arc<dyn DataSource>) {
        loop {
            if self.paused.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }

            match data_source.next_batch().await {
                Ok(Some(batch)) => {
                    self.publish_batch(&session_id, &batch).await;
                    self.maybe_update_progress(&session_id, data_source.progress()).await;
                }
                Ok(None) => {
                    self.finalize(&session_id, FinalizeOutcome::Completed).await;
                    return;
                }
                Err(err) => {
                    self.finalize(&session_id, FinalizeOutcome::Error(err.to_string())).await;
                    return;
                }
            }
        }
    }

    /// Publishes each event on its singular topic, then republishes the
    /// whole batch (grouped by kind) on the corresponding batch topic —
    /// singular publishes drive the hot path (indicators, order managers),
    /// the batch publish serves bulk/observability consumers (spec.md
    /// §4.3, §4.1 canonical topics).
    async fn publish_batch(&self, session_id: &SessionId, batch: &[crate::data_source::MarketBatchEvent]) {
        use crate::data_source::MarketBatchEvent;

        let mut prices = Vec::new();
        let mut orderbooks = Vec::new();

        for event in batch {
            match event {
                MarketBatchEvent::Price(tick) => {
                    let payload = serde_json::json!({
                        "session_id": session_id.to_string(),
                        "symbol": tick.symbol.as_str(),
                        "timestamp_us": tick.timestamp_us,
                        "price": tick.price,
                        "volume": tick.volume,
                        "quote_volume": tick.quote_volume,
                    });
                    self.bus.publish("market.price_update", payload.clone()).await.ok();
                    prices.push(payload);
                }
                MarketBatchEvent::Orderbook(snapshot) => {
                    let payload = serde_json::json!({
                        "session_id": session_id.to_string(),
                        "symbol": snapshot.symbol.as_str(),
                        "timestamp_us": snapshot.timestamp_us,
                        "bids": snapshot.bids.iter().map(|l| serde_json::json!({"price": l.price, "qty": l.qty})).collect::<Vec<_>>(),
                        "asks": snapshot.asks.iter().map(|l| serde_json::json!({"price": l.price, "qty": l.qty})).collect::<Vec<_>>(),
                    });
                    self.bus.publish("market.orderbook_update", payload.clone()).await.ok();
                    orderbooks.push(payload);
                }
            }
        }

        if !prices.is_empty() {
            self.bus
                .publish(
                    "market.price_batch_update",
                    serde_json::json!({"session_id": session_id.to_string(), "events": prices}),
                )
                .await
                .ok();
        }
        if !orderbooks.is_empty() {
            self.bus
                .publish(
                    "market.orderbook_batch_update",
                    serde_json::json!({"session_id": session_id.to_string(), "events": orderbooks}),
                )
                .await
                .ok();
        }
    }

    /// Updates the in-memory progress field on every batch, but only
    /// publishes `execution.progress_update` (and invokes registered
    /// callbacks) at most once every 5 seconds (spec.md §4.3 "update
    /// progress throttled to 5s"). This departs from
    /// `execution_controller.py`'s magnitude-based throttle
    /// (`abs(progress - last) >= 1.0`) in favour of the spec's explicit
    /// time-based wording.
    async fn maybe_update_progress(&self, session_id: &SessionId, progress: Option<f64>) {
        let Some(progress) = progress else { return };

        let should_publish = {
            let mut last = self.last_progress_publish.lock();
            let now = Instant::now();
            let should = last.map(|t| now.duration_since(t) >= Duration::from_secs(5)).unwrap_or(true);
            if should {
                *last = Some(now);
            }
            should
        };

        {
            let mut guard = self.current.write();
            if let Some(session) = guard.as_mut() {
                if &session.session_id == session_id {
                    session.progress = progress;
                }
            }
        }

        if !should_publish {
            return;
        }

        let callbacks = self.progress_callbacks.lock().clone();
        for callback in &callbacks {
            callback(session_id.clone(), progress);
        }

        self.bus
            .publish(
                "execution.progress_update",
                serde_json::json!({"session_id": session_id.to_string(), "progress": progress}),
            )
            .await
            .ok();
    }

    pub async fn pause_execution(&self, session_id: &SessionId) -> Result<(), ControllerError> {
        {
            let mut guard = self.current.write();
            let session = guard
                .as_mut()
                .filter(|session| &session.session_id == session_id)
                .ok_or(ControllerError::NoActiveSession)?;
            if !fsm::is_valid_transition(session.status, SessionStatus::Paused) {
                return Err(ControllerError::InvalidStateTransition {
                    from: session.status,
                    to: SessionStatus::Paused,
                });
            }
            session.status = SessionStatus::Paused;
        }
        self.paused.store(true, Ordering::SeqCst);
        self.bus
            .publish("execution.session_paused", serde_json::json!({"session_id": session_id.to_string()}))
            .await
            .ok();
        Ok(())
    }

    pub async fn resume_execution(&self, session_id: &SessionId) -> Result<(), ControllerError> {
        {
            let mut guard = self.current.write();
            let session = guard
                .as_mut()
                .filter(|session| &session.session_id == session_id)
                .ok_or(ControllerError::NoActiveSession)?;
            if !fsm::is_valid_transition(session.status, SessionStatus::Running) {
                return Err(ControllerError::InvalidStateTransition {
                    from: session.status,
                    to: SessionStatus::Running,
                });
            }
            session.status = SessionStatus::Running;
        }
        self.paused.store(false, Ordering::SeqCst);
        self.bus
            .publish("execution.session_resumed", serde_json::json!({"session_id": session_id.to_string()}))
            .await
            .ok();
        Ok(())
    }

    /// Idempotent: a session already `STOPPED` is a no-op, and concurrent
    /// callers all collapse onto the single [`Self::finalize`] run that
    /// actually does the work (spec.md §8 scenario 6). `force` only matters
    /// when the current status isn't already covered by
    /// [`fsm::allows_early_stop`] or a direct valid transition to
    /// `STOPPING` — it bypasses `InvalidStateTransition` rather than
    /// surfacing it.
    pub async fn stop_execution(&self, session_id: &SessionId, force: bool) -> Result<(), ControllerError> {
        let status = {
            let current = self.current.read();
            match current.as_ref() {
                Some(session) if &session.session_id == session_id => session.status,
                _ => return Ok(()),
            }
        };

        if status == SessionStatus::Stopped {
            debug!(%session_id, "execution.already_stopped");
            return Ok(());
        }

        let can_stop = fsm::allows_early_stop(status) || fsm::is_valid_transition(status, SessionStatus::Stopping);
        if !can_stop && !force {
            return Err(ControllerError::InvalidStateTransition {
                from: status,
                to: SessionStatus::Stopping,
            });
        }

        self.finalize(session_id, FinalizeOutcome::Stopped).await;
        Ok(())
    }

    /// The single collapse point for every terminal path: manual stop,
    /// natural pipeline completion, and pipeline error all call this.
    /// Acquires `stop_lock` so only the first caller for a given session
    /// does any work; later callers observe the session already `STOPPED`
    /// (or `ERROR`) and return immediately.
    async fn finalize(&self, session_id: &SessionId, outcome: FinalizeOutcome) {
        let _guard = self.stop_lock.lock().await;

        let already_terminal = {
            let mut guard = self.current.write();
            match guard.as_mut() {
                Some(session) if &session.session_id == session_id => {
                    if session.status == SessionStatus::Stopped || session.status == SessionStatus::Error {
                        true
                    } else {
                        if session.status != SessionStatus::Stopping {
                            let from = session.status;
                            if !fsm::is_valid_transition(from, SessionStatus::Stopping) && !fsm::allows_early_stop(from)
                            {
                                warn!(%session_id, ?from, "finalize: forcing transition to STOPPING from an unexpected state");
                            }
                            session.status = SessionStatus::Stopping;
                        }
                        false
                    }
                }
                _ => return,
            }
        };

        if already_terminal {
            return;
        }

        self.bus
            .publish("execution.session_stopped", serde_json::json!({"session_id": session_id.to_string()}))
            .await
            .ok();

        if let Some(handle) = self.pipeline_task.lock().take() {
            handle.abort();
        }
        let data_source = self.active_data_source.lock().take();
        if let Some(data_source) = data_source {
            data_source.stop_stream().await.ok();
        }

        self.leases.release_all_for(session_id);
        self.progress_callbacks.lock().clear();
        self.paused.store(false, Ordering::SeqCst);

        {
            let mut guard = self.current.write();
            if let Some(session) = guard.as_mut() {
                if &session.session_id == session_id {
                    session.end_time = Some(Utc::now());
                    match &outcome {
                        FinalizeOutcome::Completed => {
                            session.status = SessionStatus::Stopped;
                            session.progress = 1.0;
                        }
                        FinalizeOutcome::Stopped => {
                            session.status = SessionStatus::Stopped;
                        }
                        FinalizeOutcome::Error(message) => {
                            session.status = SessionStatus::Error;
                            session.error_message = Some(message.clone());
                        }
                    }
                }
            }
        }

        match outcome {
            FinalizeOutcome::Completed | FinalizeOutcome::Stopped => {
                self.bus
                    .publish(
                        "execution.session_completed",
                        serde_json::json!({"session_id": session_id.to_string()}),
                    )
                    .await
                    .ok();
            }
            FinalizeOutcome::Error(message) => {
                self.bus
                    .publish(
                        "execution.session_error",
                        serde_json::json!({"session_id": session_id.to_string(), "error": message}),
                    )
                    .await
                    .ok();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::MarketBatchEvent;
    use crate::hooks::NoopHooks;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;
    use tradecore_instrument::Tick;

    #[derive(Debug)]
    struct FiniteSource {
        ticks: Mutex<Vec<Tick>>,
        started: AtomicBool,
        stopped: AtomicBool,
    }

    impl FiniteSource {
        fn new(ticks: Vec<Tick>) -> Arc<Self> {
            Arc::new(Self {
                ticks: Mutex::new(ticks),
                started: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl DataSource for FiniteSource {
        async fn start_stream(&self) -> Result<(), ControllerError> {
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn next_batch(&self) -> Result<Option<Vec<MarketBatchEvent>>, ControllerError> {
            let mut ticks = self.ticks.lock();
            if ticks.is_empty() {
                return Ok(None);
            }
            let tick = ticks.remove(0);
            Ok(Some(vec![MarketBatchEvent::Price(tick)]))
        }

        async fn stop_stream(&self) -> Result<(), ControllerError> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn progress(&self) -> Option<f64> {
            Some(1.0 - self.ticks.lock().len() as f64 / 10.0)
        }
    }

    #[derive(Debug)]
    struct BlockedSource {
        notify: Arc<Notify>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DataSource for BlockedSource {
        async fn start_stream(&self) -> Result<(), ControllerError> {
            Ok(())
        }
        async fn next_batch(&self) -> Result<Option<Vec<MarketBatchEvent>>, ControllerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.notify.notified().await;
            Ok(None)
        }
        async fn stop_stream(&self) -> Result<(), ControllerError> {
            Ok(())
        }
        fn progress(&self) -> Option<f64> {
            None
        }
    }

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    #[tokio::test]
    async fn create_session_leases_symbols_and_rejects_conflicts() {
        let controller = ExecutionController::new(EventBus::new(), None, None);
        let id_a = controller
            .create_session(SessionMode::Backtest, vec![sym("BTC_USDT")], BTreeMap::new(), false)
            .await
            .unwrap();

        let err = controller
            .create_session(SessionMode::Backtest, vec![sym("BTC_USDT")], BTreeMap::new(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::SymbolConflict { .. }));
        assert_eq!(controller.current_session().unwrap().session_id, id_a);
    }

    #[tokio::test]
    async fn idempotent_create_session_reuses_matching_active_session() {
        let controller = ExecutionController::new(EventBus::new(), None, None);
        let mut params = BTreeMap::new();
        params.insert("strategy_config".to_string(), serde_json::json!({"a": 1}));

        let id_a = controller
            .create_session(SessionMode::Backtest, vec![sym("BTC_USDT")], params.clone(), true)
            .await
            .unwrap();
        let id_b = controller
            .create_session(SessionMode::Backtest, vec![sym("BTC_USDT")], params, true)
            .await
            .unwrap();
        assert_eq!(id_a, id_b);
    }

    #[tokio::test]
    async fn start_execution_runs_pipeline_to_completion_and_publishes_completed() {
        let bus = EventBus::new();
        let completed = Arc::new(AtomicUsize::new(0));
        let completed_clone = completed.clone();
        bus.subscribe("execution.session_completed", move |_event| {
            let completed = completed_clone.clone();
            async move {
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let controller = ExecutionController::new(bus, None, None);
        let session_id = controller
            .create_session(SessionMode::Backtest, vec![sym("BTC_USDT")], BTreeMap::new(), false)
            .await
            .unwrap();

        let source = FiniteSource::new(vec![Tick::new(sym("BTC_USDT"), 1_000, rust_decimal::Decimal::ONE, rust_decimal::Decimal::ONE)]);
        controller.start_execution(&session_id, source).await.unwrap();

        for _ in 0..50 {
            if controller.session(&session_id).unwrap().status == SessionStatus::Stopped {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let session = controller.session(&session_id).unwrap();
        assert_eq!(session.status, SessionStatus::Stopped);
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert!(controller.session(&session_id).is_some());
    }

    #[tokio::test]
    async fn concurrent_stop_execution_finalizes_exactly_once() {
        let bus = EventBus::new();
        let completed = Arc::new(AtomicUsize::new(0));
        let completed_clone = completed.clone();
        bus.subscribe("execution.session_completed", move |_event| {
            let completed = completed_clone.clone();
            async move {
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let controller = ExecutionController::new(bus, None, None);
        let session_id = controller
            .create_session(SessionMode::Live, vec![sym("BTC_USDT")], BTreeMap::new(), false)
            .await
            .unwrap();

        let notify = Arc::new(Notify::new());
        let source: Arc<dyn DataSource> = Arc::new(BlockedSource {
            notify: notify.clone(),
            calls: AtomicUsize::new(0),
        });
        controller.start_execution(&session_id, source).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let controller = Arc::clone(&controller);
            let session_id = session_id.clone();
            handles.push(tokio::spawn(async move {
                controller.stop_execution(&session_id, false).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let session = controller.session(&session_id).unwrap();
        assert_eq!(session.status, SessionStatus::Stopped);
        assert!(controller.leases.is_empty());
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_execution_on_idle_session_is_allowed_via_early_stop_bypass() {
        let controller = ExecutionController::new(EventBus::new(), None, None);
        let session_id = controller
            .create_session(SessionMode::Backtest, vec![sym("BTC_USDT")], BTreeMap::new(), false)
            .await
            .unwrap();

        controller.stop_execution(&session_id, false).await.unwrap();
        assert_eq!(controller.session(&session_id).unwrap().status, SessionStatus::Stopped);
    }

    #[tokio::test]
    async fn pre_start_hook_failure_marks_session_error_and_does_not_start_pipeline() {
        #[derive(Debug)]
        struct FailingHook;
        #[async_trait]
        impl PreStartHook for FailingHook {
            async fn prepare(&self, _mode: SessionMode, _symbols: &[Symbol]) -> Result<(), ControllerError> {
                Err(ControllerError::PreStartHookFailed("boom".into()))
            }
        }

        let controller = ExecutionController::new(EventBus::new(), Some(Arc::new(FailingHook)), None);
        let session_id = controller
            .create_session(SessionMode::Live, vec![sym("BTC_USDT")], BTreeMap::new(), false)
            .await
            .unwrap();

        let source: Arc<dyn DataSource> = FiniteSource::new(vec![]);
        let err = controller.start_execution(&session_id, source).await.unwrap_err();
        assert!(matches!(err, ControllerError::PreStartHookFailed(_)));
        assert_eq!(controller.session(&session_id).unwrap().status, SessionStatus::Error);
    }

    #[tokio::test]
    async fn noop_hooks_allow_start_execution_to_proceed() {
        let controller = ExecutionController::new(EventBus::new(), Some(Arc::new(NoopHooks)), Some(Arc::new(NoopHooks)));
        let session_id = controller
            .create_session(SessionMode::Paper, vec![sym("BTC_USDT")], BTreeMap::new(), false)
            .await
            .unwrap();
        let source: Arc<dyn DataSource> = FiniteSource::new(vec![]);
        controller.start_execution(&session_id, source).await.unwrap();
    }

    #[tokio::test]
    async fn pause_then_resume_round_trips_through_running() {
        let controller = ExecutionController::new(EventBus::new(), None, None);
        let session_id = controller
            .create_session(SessionMode::Live, vec![sym("BTC_USDT")], BTreeMap::new(), false)
            .await
            .unwrap();
        let notify = Arc::new(Notify::new());
        let source: Arc<dyn DataSource> = Arc::new(BlockedSource {
            notify,
            calls: AtomicUsize::new(0),
        });
        controller.start_execution(&session_id, source).await.unwrap();

        controller.pause_execution(&session_id).await.unwrap();
        assert_eq!(controller.session(&session_id).unwrap().status, SessionStatus::Paused);

        controller.resume_execution(&session_id).await.unwrap();
        assert_eq!(controller.session(&session_id).unwrap().status, SessionStatus::Running);

        controller.stop_execution(&session_id, true).await.unwrap();
    }
}
