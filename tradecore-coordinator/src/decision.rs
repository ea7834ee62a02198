use serde::{Deserialize, Serialize};

/// Outcome of [`crate::TradingCoordinator::request_subscription`] (spec.md §4.6).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionDecision {
    Allowed,
    DeniedRateLimit,
    DeniedCircuitOpen,
    DeniedNoSession,
    DeniedQuotaExceeded,
}

impl SubscriptionDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, SubscriptionDecision::Allowed)
    }

    /// Maps a free-text denial reason (as carried in a
    /// `subscription.check_response` payload) onto a decision variant,
    /// matching the substring checks the session manager's response is
    /// expected to satisfy.
    pub fn from_response(allowed: bool, reason: &str) -> Self {
        if allowed {
            return SubscriptionDecision::Allowed;
        }
        let reason = reason.to_ascii_lowercase();
        if reason.contains("rate") {
            SubscriptionDecision::DeniedRateLimit
        } else if reason.contains("circuit") {
            SubscriptionDecision::DeniedCircuitOpen
        } else if reason.contains("quota") {
            SubscriptionDecision::DeniedQuotaExceeded
        } else {
            SubscriptionDecision::DeniedNoSession
        }
    }
}
