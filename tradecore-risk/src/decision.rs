use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of [`crate::RiskManager::can_open_position`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Denied(RiskDenialReason),
}

impl Decision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approved)
    }
}

/// Why [`Decision::Denied`] was returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RiskDenialReason {
    GlobalCapExceeded { requested: Decimal, available: Decimal },
    AllocationExceeded { key: String, requested: Decimal, available: Decimal },
    LeverageAboveLimit { requested: Decimal, limit: Decimal },
}
