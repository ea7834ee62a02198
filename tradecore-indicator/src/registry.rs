use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tradecore_instrument::{IndicatorVariant, Parameters, VariantId, VariantType};

use crate::error::IndicatorError;

/// A required/optional parameter a base type expects, used to validate
/// `create_variant`/`update_variant` calls (spec.md §4.2 "validates
/// parameters against the base-type schema").
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(name: &'static str) -> Self {
        Self { name, required: true }
    }

    pub fn optional(name: &'static str) -> Self {
        Self { name, required: false }
    }
}

/// Metadata describing a system (built-in) indicator base type. The
/// calculation itself lives in [`crate::engine`], dispatched by
/// `base_type` string — mirrors the Python original's
/// `indicator_registration` decorator, which attached metadata to a bare
/// function rather than closing over it in a struct field.
#[derive(Debug, Clone)]
pub struct IndicatorDescriptor {
    pub base_type: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub parameters: Vec<ParameterSpec>,
}

#[derive(Debug, Default)]
struct RegistryState {
    descriptors: HashMap<String, IndicatorDescriptor>,
    variants: HashMap<VariantId, IndicatorVariant>,
}

/// Registers indicator base types and owns the `IndicatorVariant` CRUD
/// surface (spec.md §4.2 "Variant registry"). Safe for concurrent
/// create/delete/update; writes take a short-lived write lock.
#[derive(Debug)]
pub struct IndicatorRegistry {
    state: RwLock<RegistryState>,
    next_variant_seq: AtomicU64,
}

impl Default for IndicatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorRegistry {
    pub fn new() -> Self {
        let registry = Self {
            state: RwLock::new(RegistryState::default()),
            next_variant_seq: AtomicU64::new(1),
        };
        registry.register_system_indicators();
        registry
    }

    fn register(&self, descriptor: IndicatorDescriptor) {
        self.state.write().descriptors.insert(descriptor.base_type.clone(), descriptor);
    }

    /// Representative subset of spec.md §4.2's non-exhaustive taxonomy.
    fn register_system_indicators(&self) {
        self.register(IndicatorDescriptor {
            base_type: "TWPA".into(),
            name: "Time-Weighted Price Average".into(),
            description: "Time-weighted average price over a window".into(),
            category: "price".into(),
            parameters: vec![ParameterSpec::required("t1"), ParameterSpec::required("t2")],
        });
        self.register(IndicatorDescriptor {
            base_type: "VWAP".into(),
            name: "Volume-Weighted Average Price".into(),
            description: "Volume-weighted average price over a window".into(),
            category: "price".into(),
            parameters: vec![ParameterSpec::required("t1"), ParameterSpec::required("t2")],
        });
        self.register(IndicatorDescriptor {
            base_type: "MAX_PRICE".into(),
            name: "Window Max Price".into(),
            description: "Maximum trade price over a window".into(),
            category: "price".into(),
            parameters: vec![ParameterSpec::required("t1"), ParameterSpec::required("t2")],
        });
        self.register(IndicatorDescriptor {
            base_type: "MIN_PRICE".into(),
            name: "Window Min Price".into(),
            description: "Minimum trade price over a window".into(),
            category: "price".into(),
            parameters: vec![ParameterSpec::required("t1"), ParameterSpec::required("t2")],
        });
        self.register(IndicatorDescriptor {
            base_type: "VELOCITY".into(),
            name: "Price Velocity".into(),
            description: "Rate of change between a current and baseline window".into(),
            category: "velocity".into(),
            parameters: vec![
                ParameterSpec::required("t1"),
                ParameterSpec::required("t2"),
                ParameterSpec::required("baseline_t1"),
                ParameterSpec::required("baseline_t2"),
            ],
        });
        self.register(IndicatorDescriptor {
            base_type: "VOLUME_SURGE".into(),
            name: "Volume Surge".into(),
            description: "Ratio of current to baseline window volume".into(),
            category: "volume".into(),
            parameters: vec![
                ParameterSpec::required("t1"),
                ParameterSpec::required("t2"),
                ParameterSpec::required("baseline_t1"),
                ParameterSpec::required("baseline_t2"),
            ],
        });
        self.register(IndicatorDescriptor {
            base_type: "BID_ASK_IMBALANCE".into(),
            name: "Bid/Ask Imbalance".into(),
            description: "(bids - asks) / (bids + asks) on the latest orderbook snapshot".into(),
            category: "orderbook".into(),
            parameters: vec![],
        });
        self.register(IndicatorDescriptor {
            base_type: "MID_PRICE_VELOCITY".into(),
            name: "Mid Price Velocity".into(),
            description: "Rate of change of mid price over a window".into(),
            category: "orderbook".into(),
            parameters: vec![ParameterSpec::required("t1"), ParameterSpec::required("t2")],
        });
        self.register(IndicatorDescriptor {
            base_type: "TOTAL_LIQUIDITY".into(),
            name: "Total Liquidity".into(),
            description: "Sum of bid and ask depth on the latest orderbook snapshot".into(),
            category: "orderbook".into(),
            parameters: vec![],
        });
    }

    pub fn get_system_indicators(&self) -> Vec<IndicatorDescriptor> {
        self.state.read().descriptors.values().cloned().collect()
    }

    fn validate_parameters(&self, base_type: &str, parameters: &Parameters) -> Result<(), IndicatorError> {
        let state = self.state.read();
        let descriptor = state
            .descriptors
            .get(base_type)
            .ok_or_else(|| IndicatorError::UnknownIndicator(base_type.to_string()))?;
        for spec in &descriptor.parameters {
            if spec.required && !parameters.contains_key(spec.name) {
                return Err(IndicatorError::InvalidParameter {
                    base_type: base_type.to_string(),
                    reason: format!("missing required parameter '{}'", spec.name),
                });
            }
        }
        Ok(())
    }

    pub fn create_variant(
        &self,
        base_type: String,
        variant_type: VariantType,
        parameters: Parameters,
        created_by: String,
    ) -> Result<IndicatorVariant, IndicatorError> {
        self.validate_parameters(&base_type, &parameters)?;
        let seq = self.next_variant_seq.fetch_add(1, Ordering::Relaxed);
        let variant = IndicatorVariant {
            id: VariantId::new(format!("{}_{seq}", base_type.to_lowercase())),
            base_type,
            variant_type,
            parameters,
            created_by,
            created_at: Utc::now(),
        };
        self.state.write().variants.insert(variant.id.clone(), variant.clone());
        Ok(variant)
    }

    pub fn get_variant(&self, id: &VariantId) -> Option<IndicatorVariant> {
        self.state.read().variants.get(id).cloned()
    }

    pub fn list_variants(&self) -> Vec<IndicatorVariant> {
        self.state.read().variants.values().cloned().collect()
    }

    pub fn update_variant(&self, id: &VariantId, parameters: Parameters) -> Result<IndicatorVariant, IndicatorError> {
        let base_type = {
            let state = self.state.read();
            state
                .variants
                .get(id)
                .ok_or_else(|| IndicatorError::UnknownVariant(id.to_string()))?
                .base_type
                .clone()
        };
        self.validate_parameters(&base_type, &parameters)?;
        let mut state = self.state.write();
        let variant = state
            .variants
            .get_mut(id)
            .ok_or_else(|| IndicatorError::UnknownVariant(id.to_string()))?;
        variant.parameters = parameters;
        Ok(variant.clone())
    }

    /// Removes the variant definition. The engine is responsible for
    /// transitively dropping any runtime `StreamingIndicator` bound to it
    /// (spec.md §4.2) — this registry only owns the definition.
    pub fn delete_variant(&self, id: &VariantId) -> Result<(), IndicatorError> {
        let mut state = self.state.write();
        state
            .variants
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| IndicatorError::UnknownVariant(id.to_string()))
    }

    pub fn copy_variant(&self, id: &VariantId, created_by: String) -> Result<IndicatorVariant, IndicatorError> {
        let source = self
            .get_variant(id)
            .ok_or_else(|| IndicatorError::UnknownVariant(id.to_string()))?;
        self.create_variant(source.base_type, source.variant_type, source.parameters, created_by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradecore_instrument::ParameterValue;

    fn params(t1: f64, t2: f64) -> Parameters {
        let mut map = Parameters::new();
        map.insert("t1".into(), ParameterValue::Number(t1));
        map.insert("t2".into(), ParameterValue::Number(t2));
        map
    }

    #[test]
    fn create_variant_rejects_unknown_base_type() {
        let registry = IndicatorRegistry::new();
        let result = registry.create_variant(
            "NOT_A_REAL_TYPE".into(),
            VariantType::Price,
            Parameters::new(),
            "system".into(),
        );
        assert!(matches!(result, Err(IndicatorError::UnknownIndicator(_))));
    }

    #[test]
    fn create_variant_rejects_missing_required_parameter() {
        let registry = IndicatorRegistry::new();
        let result = registry.create_variant("TWPA".into(), VariantType::Price, Parameters::new(), "system".into());
        assert!(matches!(result, Err(IndicatorError::InvalidParameter { .. })));
    }

    #[test]
    fn copy_variant_creates_a_new_id_with_same_config() {
        let registry = IndicatorRegistry::new();
        let original = registry
            .create_variant("TWPA".into(), VariantType::Price, params(120.0, 30.0), "system".into())
            .unwrap();
        let copy = registry.copy_variant(&original.id, "alice".into()).unwrap();
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.base_type, original.base_type);
        assert_eq!(copy.parameters, original.parameters);
        assert_eq!(copy.created_by, "alice");
    }

    #[test]
    fn delete_variant_removes_it() {
        let registry = IndicatorRegistry::new();
        let variant = registry
            .create_variant("TWPA".into(), VariantType::Price, params(120.0, 30.0), "system".into())
            .unwrap();
        registry.delete_variant(&variant.id).unwrap();
        assert!(registry.get_variant(&variant.id).is_none());
        assert!(matches!(registry.delete_variant(&variant.id), Err(IndicatorError::UnknownVariant(_))));
    }
}
