use crate::rows::IndicatorRow;
use crate::store::Store;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use tradecore_bus::{EventBus, HandlerError};
use tradecore_instrument::{SessionId, Symbol, VariantId};

/// Wire payload published on `indicator.updated`. `value: None` means the
/// indicator had nothing to say for this window (missing data, not an
/// error) — spec.md §4.2/§4.9 require these be dropped rather than
/// persisted.
#[derive(Debug, Deserialize)]
struct IndicatorUpdate {
    session_id: SessionId,
    symbol: Symbol,
    indicator_id: VariantId,
    indicator_type: String,
    timestamp_us: i64,
    value: Option<serde_json::Value>,
    confidence: f64,
    metadata: serde_json::Value,
}

/// Writes computed indicator values to the store (spec.md §4.9). The
/// single-value path subscribes to `indicator.updated`; the batch path is
/// called directly by the Streaming Indicator Engine when flushing its
/// scheduler, bypassing the bus for efficiency.
#[derive(Debug, Clone)]
pub struct IndicatorPersistence {
    store: Arc<dyn Store>,
}

impl IndicatorPersistence {
    pub fn attach(bus: &EventBus, store: Arc<dyn Store>) -> Self {
        let persistence = Self { store: store.clone() };
        bus.subscribe("indicator.updated", move |event| {
            let store = store.clone();
            async move {
                let update: IndicatorUpdate = serde_json::from_value(event.data)
                    .map_err(|e| HandlerError::new(format!("malformed indicator.updated payload: {e}")))?;

                let Some(value) = update.value else {
                    return Ok(());
                };

                let row = IndicatorRow {
                    session_id: update.session_id,
                    symbol: update.symbol,
                    indicator_id: update.indicator_id,
                    indicator_type: update.indicator_type,
                    timestamp_us: update.timestamp_us,
                    value,
                    confidence: update.confidence,
                    metadata: update.metadata,
                };
                if let Err(err) = store.insert_indicator(row).await {
                    warn!(error = %err, "failed to persist indicator value");
                }
                Ok(())
            }
        });
        persistence
    }

    /// Bulk-insert a batch of already-materialised rows, dropping any whose
    /// value is null. Used by the scheduler flush path (spec.md §4.9).
    pub async fn write_batch(&self, rows: Vec<IndicatorRow>) {
        if rows.is_empty() {
            return;
        }
        if let Err(err) = self.store.insert_indicators(rows).await {
            warn!(error = %err, "failed to persist indicator batch");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;

    #[tokio::test]
    async fn null_values_are_not_persisted_but_scalar_values_are() {
        let bus = EventBus::new();
        let store = Arc::new(InMemoryStore::new());
        let _persistence = IndicatorPersistence::attach(&bus, store.clone());

        let payload = |value: serde_json::Value| {
            serde_json::json!({
                "session_id": "exec_20260728_000000_00000001",
                "symbol": "BTC_USDT",
                "indicator_id": "rsi_14",
                "indicator_type": "rsi",
                "timestamp_us": 1,
                "value": value,
                "confidence": 0.9,
                "metadata": {}
            })
        };

        bus.publish("indicator.updated", payload(serde_json::Value::Null)).await.unwrap();
        assert!(store.indicators_snapshot().is_empty());

        bus.publish("indicator.updated", payload(serde_json::json!(55.0))).await.unwrap();
        assert_eq!(store.indicators_snapshot().len(), 1);
    }
}
