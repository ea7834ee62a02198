use smol_str::SmolStr;
use std::fmt;

/// A bus topic. Deliberately an open `SmolStr` newtype rather than a closed
/// enum — components mint their own topic names (e.g. per-session topics
/// such as `session.{id}.progress`), so the set of topics in use can never
/// be exhaustively enumerated at compile time.
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Topic(SmolStr);

impl Topic {
    pub fn new(topic: impl Into<SmolStr>) -> Self {
        Self(topic.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Topic {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Topic {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<SmolStr> for Topic {
    fn from(value: SmolStr) -> Self {
        Self(value)
    }
}

/// Canonical topic names emitted by the built-in tradecore components
/// (spec.md §4.1). Not exhaustive — components are free to publish on
/// topics outside this list (e.g. `session.{id}.*` family names).
pub const CANONICAL_TOPICS: &[&str] = &[
    "market.price_update",
    "market.orderbook_update",
    "market.price_batch_update",
    "market.orderbook_batch_update",
    "indicator.updated",
    "signal_generated",
    "order_created",
    "order_filled",
    "order_cancelled",
    "position_opened",
    "position_updated",
    "position_closed",
    "risk_alert",
    "execution.session_started",
    "execution.session_paused",
    "execution.session_resumed",
    "execution.session_stopped",
    "execution.session_completed",
    "execution.session_error",
    "execution.progress_update",
    "execution.metrics_update",
    "execution.symbol_conflict",
    "subscription.check_request",
    "subscription.check_response",
    "circuit_breaker.state_changed",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_built_from_str_and_string_compare_equal() {
        let from_str: Topic = "order_created".into();
        let from_string: Topic = String::from("order_created").into();
        assert_eq!(from_str, from_string);
        assert_eq!(from_str.as_str(), "order_created");
    }

    #[test]
    fn canonical_topics_are_non_empty_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for topic in CANONICAL_TOPICS {
            assert!(!topic.is_empty());
            assert!(seen.insert(*topic), "duplicate canonical topic: {topic}");
        }
    }
}
