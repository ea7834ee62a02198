use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tradecore_bus::EventBus;
use tradecore_instrument::{
    OrderbookSnapshot, ParameterValue, Parameters, SessionId, StreamingIndicatorHandle, Symbol, Tick, VariantId,
};

use crate::calculations::{self, PricePoint};
use crate::error::IndicatorError;
use crate::registry::IndicatorRegistry;
use crate::ring_buffer::{RingBuffer, DEFAULT_CAPACITY};
use crate::window::{normalize_to_micros, WindowSpec};

/// Tunables for the Streaming Indicator Engine (spec.md §4.2, §8).
#[derive(Debug, Clone)]
pub struct IndicatorEngineConfig {
    pub ring_buffer_capacity: usize,
    /// Cadence the time-driven scheduler wakes at to re-evaluate indicators
    /// that declare a `refresh_interval_seconds` parameter rather than
    /// recomputing per tick.
    pub scheduler_tick: Duration,
}

impl Default for IndicatorEngineConfig {
    fn default() -> Self {
        Self {
            ring_buffer_capacity: DEFAULT_CAPACITY,
            scheduler_tick: Duration::from_millis(250),
        }
    }
}

fn parameter_f64(parameters: &Parameters, key: &str) -> Option<f64> {
    match parameters.get(key)? {
        ParameterValue::Number(n) => Some(*n),
        ParameterValue::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

struct SymbolBuffers {
    ticks: RingBuffer<PricePoint>,
    orderbook: RingBuffer<OrderbookSnapshot>,
}

impl SymbolBuffers {
    fn new(capacity: usize) -> Self {
        Self {
            ticks: RingBuffer::new(capacity),
            orderbook: RingBuffer::new(capacity),
        }
    }
}

/// Maintains per-symbol tick/orderbook ring buffers and computes registered
/// indicator variants either event-driven (on every inbound tick/orderbook
/// update) or time-driven (on a scheduler cadence), publishing
/// `indicator.updated` for each produced value (spec.md §4.2).
///
/// `_indicators_by_symbol` is the session/symbol binding gate: a symbol
/// with no registered indicators is never touched by `handle_tick`/
/// `handle_orderbook` beyond buffering, so an unregistered symbol's market
/// data is effectively ignored by computation (spec.md §4.2 "Session/symbol
/// binding").
pub struct IndicatorEngine {
    bus: EventBus,
    registry: Arc<IndicatorRegistry>,
    config: IndicatorEngineConfig,
    buffers: Mutex<HashMap<Symbol, SymbolBuffers>>,
    indicators_by_symbol: RwLock<HashMap<Symbol, Vec<StreamingIndicatorHandle>>>,
    session_for_symbol: RwLock<HashMap<Symbol, SessionId>>,
}

impl IndicatorEngine {
    pub fn new(bus: EventBus, registry: Arc<IndicatorRegistry>, config: IndicatorEngineConfig) -> Arc<Self> {
        let engine = Arc::new(Self {
            bus,
            registry,
            config,
            buffers: Mutex::new(HashMap::new()),
            indicators_by_symbol: RwLock::new(HashMap::new()),
            session_for_symbol: RwLock::new(HashMap::new()),
        });
        engine.clone().attach_market_data_handlers();
        engine.clone().spawn_scheduler();
        engine
    }

    fn attach_market_data_handlers(self: Arc<Self>) {
        let engine = self.clone();
        self.bus.subscribe("market.price_update", move |event| {
            let engine = engine.clone();
            async move {
                let tick: Tick = serde_json::from_value(event.data)
                    .map_err(|e| tradecore_bus::HandlerError::new(format!("malformed price_update: {e}")))?;
                engine.handle_tick(tick).await;
                Ok(())
            }
        });

        let engine = self.clone();
        self.bus.subscribe("market.orderbook_update", move |event| {
            let engine = engine.clone();
            async move {
                let book: OrderbookSnapshot = serde_json::from_value(event.data)
                    .map_err(|e| tradecore_bus::HandlerError::new(format!("malformed orderbook_update: {e}")))?;
                engine.handle_orderbook(book).await;
                Ok(())
            }
        });
    }

    fn spawn_scheduler(self: Arc<Self>) {
        let tick = self.config.scheduler_tick;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                interval.tick().await;
                self.run_time_driven_pass().await;
            }
        });
    }

    /// Registers a runtime indicator for `symbol` under `session_id`. This
    /// is the only path that makes `handle_tick`/`handle_orderbook` compute
    /// anything for `symbol` (spec.md §4.2).
    pub fn add_indicator_to_session(
        &self,
        session_id: SessionId,
        symbol: Symbol,
        variant_id: VariantId,
    ) -> Result<(), IndicatorError> {
        let variant = self
            .registry
            .get_variant(&variant_id)
            .ok_or_else(|| IndicatorError::UnknownVariant(variant_id.to_string()))?;
        let handle = StreamingIndicatorHandle {
            symbol: symbol.clone(),
            base_type: variant.base_type,
            variant_id,
            timeframe: "default".to_string(),
        };
        self.indicators_by_symbol.write().entry(symbol.clone()).or_default().push(handle);
        self.session_for_symbol.write().insert(symbol, session_id);
        Ok(())
    }

    /// Unregisters every runtime handle bound to `variant_id`, transitively
    /// matching `IndicatorRegistry::delete_variant`'s contract.
    pub fn remove_variant_everywhere(&self, variant_id: &VariantId) {
        let mut indicators = self.indicators_by_symbol.write();
        for handles in indicators.values_mut() {
            handles.retain(|handle| &handle.variant_id != variant_id);
        }
        indicators.retain(|_, handles| !handles.is_empty());
    }

    pub async fn handle_tick(&self, tick: Tick) {
        let symbol = tick.symbol.clone();
        {
            let mut buffers = self.buffers.lock();
            let entry = buffers
                .entry(symbol.clone())
                .or_insert_with(|| SymbolBuffers::new(self.config.ring_buffer_capacity));
            entry.ticks.push(PricePoint {
                timestamp_us: normalize_to_micros(tick.timestamp_us),
                price: tick.price,
                volume: tick.volume,
            });
        }

        if !self.indicators_by_symbol.read().contains_key(&symbol) {
            return;
        }
        self.recompute_event_driven(&symbol).await;
    }

    pub async fn handle_orderbook(&self, book: OrderbookSnapshot) {
        let symbol = book.symbol.clone();
        {
            let mut buffers = self.buffers.lock();
            let entry = buffers
                .entry(symbol.clone())
                .or_insert_with(|| SymbolBuffers::new(self.config.ring_buffer_capacity));
            entry.orderbook.push(book);
        }

        if !self.indicators_by_symbol.read().contains_key(&symbol) {
            return;
        }
        self.recompute_event_driven(&symbol).await;
    }

    async fn recompute_event_driven(&self, symbol: &Symbol) {
        let handles: Vec<StreamingIndicatorHandle> = self
            .indicators_by_symbol
            .read()
            .get(symbol)
            .cloned()
            .unwrap_or_default();

        let mut shared_cache: HashMap<(String, String), Option<f64>> = HashMap::new();
        for handle in handles {
            let Some(variant) = self.registry.get_variant(&handle.variant_id) else {
                continue;
            };
            if parameter_f64(&variant.parameters, "refresh_interval_seconds").is_some() {
                continue; // time-driven, handled by the scheduler pass
            }
            let cache_key = (handle.base_type.clone(), format!("{:?}", variant.parameters));
            let value = if let Some(cached) = shared_cache.get(&cache_key) {
                *cached
            } else {
                let computed = self.compute(&handle, &variant.parameters);
                shared_cache.insert(cache_key, computed);
                computed
            };
            self.publish_value(&handle, value).await;
        }
    }

    async fn run_time_driven_pass(&self) {
        let symbols: Vec<Symbol> = self.indicators_by_symbol.read().keys().cloned().collect();
        for symbol in symbols {
            let handles: Vec<StreamingIndicatorHandle> = self
                .indicators_by_symbol
                .read()
                .get(&symbol)
                .cloned()
                .unwrap_or_default();
            for handle in handles {
                let Some(variant) = self.registry.get_variant(&handle.variant_id) else {
                    continue;
                };
                if parameter_f64(&variant.parameters, "refresh_interval_seconds").is_none() {
                    continue; // event-driven, already handled on tick arrival
                }
                let value = self.compute(&handle, &variant.parameters);
                self.publish_value(&handle, value).await;
            }
        }
    }

    fn compute(&self, handle: &StreamingIndicatorHandle, parameters: &Parameters) -> Option<f64> {
        let now_us = self.latest_timestamp_us(&handle.symbol);
        let buffers = self.buffers.lock();
        let Some(symbol_buffers) = buffers.get(&handle.symbol) else {
            return None;
        };

        match handle.base_type.as_str() {
            "TWPA" | "VWAP" | "MAX_PRICE" | "MIN_PRICE" => {
                let window = self.window_from(parameters)?;
                let points = self.windowed_points(&symbol_buffers.ticks, window, now_us);
                match handle.base_type.as_str() {
                    "TWPA" => calculations::twpa(&points),
                    "VWAP" => calculations::vwap(&points),
                    "MAX_PRICE" => calculations::max_price(&points),
                    "MIN_PRICE" => calculations::min_price(&points),
                    _ => unreachable!(),
                }
            }
            "VELOCITY" => {
                let current_window = self.window_from(parameters)?;
                let baseline_window = WindowSpec::new(
                    parameter_f64(parameters, "baseline_t1")?,
                    parameter_f64(parameters, "baseline_t2")?,
                );
                let current = self.windowed_points(&symbol_buffers.ticks, current_window, now_us);
                let baseline = self.windowed_points(&symbol_buffers.ticks, baseline_window, now_us);
                let current_avg = calculations::vwap(&current)?;
                let baseline_avg = calculations::vwap(&baseline)?;
                let dt = (current_window.t2_seconds - baseline_window.t2_seconds).abs().max(f64::EPSILON);
                calculations::velocity(current_avg, baseline_avg, dt)
            }
            "VOLUME_SURGE" => {
                let current_window = self.window_from(parameters)?;
                let baseline_window = WindowSpec::new(
                    parameter_f64(parameters, "baseline_t1")?,
                    parameter_f64(parameters, "baseline_t2")?,
                );
                let current = self.windowed_points(&symbol_buffers.ticks, current_window, now_us);
                let baseline = self.windowed_points(&symbol_buffers.ticks, baseline_window, now_us);
                calculations::volume_surge(&current, &baseline)
            }
            "BID_ASK_IMBALANCE" => symbol_buffers.orderbook.iter().next_back().and_then(calculations::bid_ask_imbalance),
            "TOTAL_LIQUIDITY" => symbol_buffers.orderbook.iter().next_back().and_then(calculations::total_liquidity),
            "MID_PRICE_VELOCITY" => {
                let window = self.window_from(parameters)?;
                let (start, end) = window.bounds_us(now_us);
                let books: Vec<OrderbookSnapshot> = symbol_buffers
                    .orderbook
                    .iter()
                    .filter(|book| book.timestamp_us > start && book.timestamp_us <= end)
                    .cloned()
                    .collect();
                calculations::mid_price_velocity(&books)
            }
            unknown => {
                warn!(base_type = unknown, "no calculation registered, emitting null");
                None
            }
        }
    }

    fn window_from(&self, parameters: &Parameters) -> Option<WindowSpec> {
        Some(WindowSpec::new(parameter_f64(parameters, "t1")?, parameter_f64(parameters, "t2")?))
    }

    fn windowed_points(&self, ticks: &RingBuffer<PricePoint>, window: WindowSpec, now_us: i64) -> Vec<PricePoint> {
        ticks
            .iter()
            .filter(|point| window.contains(point.timestamp_us, now_us))
            .copied()
            .collect()
    }

    fn latest_timestamp_us(&self, symbol: &Symbol) -> i64 {
        self.buffers
            .lock()
            .get(symbol)
            .and_then(|buffers| buffers.ticks.iter().next_back().map(|p| p.timestamp_us))
            .unwrap_or_else(|| chrono::Utc::now().timestamp_micros())
    }

    async fn publish_value(&self, handle: &StreamingIndicatorHandle, value: Option<f64>) {
        let session_id = self.session_for_symbol.read().get(&handle.symbol).cloned();
        let Some(session_id) = session_id else {
            debug!(symbol = %handle.symbol, "no session bound, skipping publish");
            return;
        };
        let payload = serde_json::json!({
            "session_id": session_id,
            "symbol": handle.symbol,
            "indicator_id": handle.variant_id,
            "indicator_type": handle.base_type,
            "timestamp_us": chrono::Utc::now().timestamp_micros(),
            "value": value,
            "confidence": if value.is_some() { 1.0 } else { 0.0 },
            "metadata": serde_json::Value::Null,
        });
        if let Err(err) = self.bus.publish("indicator.updated", payload).await {
            warn!(error = %err, indicator = %handle.variant_id, "failed to publish indicator.updated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradecore_instrument::{OrderLevel, VariantType};

    async fn engine_with_registered_twpa() -> (Arc<IndicatorEngine>, Symbol, SessionId) {
        let bus = EventBus::new();
        let registry = Arc::new(IndicatorRegistry::new());
        let engine = IndicatorEngine::new(bus.clone(), registry.clone(), IndicatorEngineConfig::default());

        let mut params = Parameters::new();
        params.insert("t1".into(), ParameterValue::Number(120.0));
        params.insert("t2".into(), ParameterValue::Number(0.0));
        let variant = registry
            .create_variant("TWPA".into(), VariantType::Price, params, "system".into())
            .unwrap();

        let symbol = Symbol::new("BTC_USDT");
        let session_id = SessionId::new("exec_test_00000001");
        engine
            .add_indicator_to_session(session_id.clone(), symbol.clone(), variant.id)
            .unwrap();
        (engine, symbol, session_id)
    }

    #[tokio::test]
    async fn unregistered_symbol_is_buffered_but_not_computed() {
        let bus = EventBus::new();
        let registry = Arc::new(IndicatorRegistry::new());
        let engine = IndicatorEngine::new(bus.clone(), registry, IndicatorEngineConfig::default());
        let symbol = Symbol::new("ETH_USDT");

        let received = Arc::new(Mutex::new(0u32));
        let counter = received.clone();
        bus.subscribe("indicator.updated", move |_event| {
            let counter = counter.clone();
            async move {
                *counter.lock() += 1;
                Ok(())
            }
        });

        engine.handle_tick(Tick::new(symbol.clone(), 0, dec!(100), dec!(1))).await;
        assert_eq!(*received.lock(), 0);
    }

    #[tokio::test]
    async fn registered_symbol_emits_indicator_updated_on_tick() {
        let (engine, symbol, _session_id) = engine_with_registered_twpa().await;

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        engine.bus.subscribe("indicator.updated", move |event| {
            let sink = sink.clone();
            async move {
                sink.lock().push(event.data);
                Ok(())
            }
        });

        engine.handle_tick(Tick::new(symbol.clone(), 1_000_000, dec!(100), dec!(1))).await;
        assert_eq!(received.lock().len(), 1);
    }

    #[tokio::test]
    async fn orderbook_imbalance_uses_latest_snapshot() {
        let bus = EventBus::new();
        let registry = Arc::new(IndicatorRegistry::new());
        let engine = IndicatorEngine::new(bus.clone(), registry.clone(), IndicatorEngineConfig::default());
        let variant = registry
            .create_variant("BID_ASK_IMBALANCE".into(), VariantType::Risk, Parameters::new(), "system".into())
            .unwrap();
        let symbol = Symbol::new("BTC_USDT");
        engine
            .add_indicator_to_session(SessionId::new("exec_test_00000002"), symbol.clone(), variant.id)
            .unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        bus.subscribe("indicator.updated", move |event| {
            let sink = sink.clone();
            async move {
                sink.lock().push(event.data);
                Ok(())
            }
        });

        let book = OrderbookSnapshot::new(
            symbol.clone(),
            1,
            vec![OrderLevel::new(dec!(100), dec!(3))],
            vec![OrderLevel::new(dec!(101), dec!(1))],
        );
        engine.handle_orderbook(book).await;
        let payloads = received.lock();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["value"], serde_json::json!(0.5));
    }
}
