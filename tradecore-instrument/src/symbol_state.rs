use serde::{Deserialize, Serialize};

/// The strictly-ordered states a `(strategy, symbol)` pair moves through.
///
/// Transitions are `IDLE -> S1_ACTIVE -> Z1_ACTIVE -> ZE1_ACTIVE -> IDLE`;
/// Emergency may fire from any state but is rate-limited by
/// `emergency_cooldown_until` (spec.md §3). This enum intentionally has no
/// `O1_ACTIVE`/`EMERGENCY` variants of its own: O1 and Emergency are
/// *actions* that return the symbol to `Idle`, not resting states.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum SymbolFsmState {
    Idle,
    S1Active,
    Z1Active,
    Ze1Active,
}

impl Default for SymbolFsmState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Per-`(strategy, symbol)` state tracked by the Strategy Evaluator.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SymbolState {
    pub state: SymbolFsmState,
    pub signal_start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub order_placed_time: Option<chrono::DateTime<chrono::Utc>>,
    pub position_active: bool,
    pub emergency_cooldown_until: Option<chrono::DateTime<chrono::Utc>>,
}

impl SymbolState {
    pub fn is_emergency_on_cooldown(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.emergency_cooldown_until.is_some_and(|until| now < until)
    }

    /// `IDLE -> S1_ACTIVE`.
    pub fn enter_s1(&mut self, now: chrono::DateTime<chrono::Utc>) {
        debug_assert_eq!(self.state, SymbolFsmState::Idle);
        self.state = SymbolFsmState::S1Active;
        self.signal_start_time = Some(now);
    }

    /// `S1_ACTIVE -> Z1_ACTIVE`.
    pub fn enter_z1(&mut self, now: chrono::DateTime<chrono::Utc>) {
        debug_assert_eq!(self.state, SymbolFsmState::S1Active);
        self.state = SymbolFsmState::Z1Active;
        self.order_placed_time = Some(now);
        self.position_active = true;
    }

    /// `Z1_ACTIVE -> ZE1_ACTIVE`.
    pub fn enter_ze1(&mut self) {
        debug_assert_eq!(self.state, SymbolFsmState::Z1Active);
        self.state = SymbolFsmState::Ze1Active;
    }

    /// O1 cancel or Emergency close: return to `Idle` and clear all
    /// transitional timestamps.
    pub fn reset_to_idle(&mut self) {
        self.state = SymbolFsmState::Idle;
        self.signal_start_time = None;
        self.order_placed_time = None;
        self.position_active = false;
    }

    pub fn set_emergency_cooldown(&mut self, until: chrono::DateTime<chrono::Utc>) {
        self.emergency_cooldown_until = Some(until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn only_the_enumerated_transitions_are_reachable_via_helpers() {
        let now = chrono::Utc::now();
        let mut state = SymbolState::default();
        assert_eq!(state.state, SymbolFsmState::Idle);

        state.enter_s1(now);
        assert_eq!(state.state, SymbolFsmState::S1Active);
        assert_eq!(state.signal_start_time, Some(now));

        state.enter_z1(now + Duration::seconds(1));
        assert_eq!(state.state, SymbolFsmState::Z1Active);
        assert!(state.position_active);

        state.enter_ze1();
        assert_eq!(state.state, SymbolFsmState::Ze1Active);

        state.reset_to_idle();
        assert_eq!(state.state, SymbolFsmState::Idle);
        assert!(!state.position_active);
        assert!(state.signal_start_time.is_none());
    }

    #[test]
    fn emergency_cooldown_blocks_until_expiry() {
        let now = chrono::Utc::now();
        let mut state = SymbolState::default();
        state.set_emergency_cooldown(now + Duration::minutes(60));
        assert!(state.is_emergency_on_cooldown(now));
        assert!(!state.is_emergency_on_cooldown(now + Duration::minutes(61)));
    }
}
