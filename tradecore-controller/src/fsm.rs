use tradecore_instrument::SessionStatus;

/// The strict session state transition table (spec.md §4.3). Any pair not
/// listed here fails with `ControllerError::InvalidStateTransition`.
///
/// Ported from `execution_controller.py`'s `_valid_transitions` dict.
pub fn is_valid_transition(from: SessionStatus, to: SessionStatus) -> bool {
    use SessionStatus::*;
    matches!(
        (from, to),
        (Idle, Starting)
            | (Starting, Running)
            | (Starting, Error)
            | (Running, Paused)
            | (Running, Stopping)
            | (Running, Error)
            | (Paused, Running)
            | (Paused, Stopping)
            | (Stopping, Stopped)
            | (Stopping, Error)
            | (Stopping, Starting)
            | (Stopped, Starting)
            | (Error, Starting)
            | (Error, Stopped)
    )
}

/// `stop_execution`'s escape hatch. Neither `IDLE` nor `STARTING` lists
/// `STOPPING` as a valid target in the table above, but a session that
/// hasn't left either of those states yet still needs to be abortable —
/// there's no running pipeline to cancel, only leases and a pending
/// session to tear down. Grounded on `execution_controller.py`'s
/// `stop_execution`, which force-assigns `STOPPING` from exactly these two
/// states rather than raising `InvalidStateTransition`.
pub fn allows_early_stop(from: SessionStatus) -> bool {
    matches!(from, SessionStatus::Idle | SessionStatus::Starting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionStatus::*;

    const ALL: [SessionStatus; 7] = [Idle, Starting, Running, Paused, Stopping, Stopped, Error];

    #[test]
    fn transition_table_matches_spec_matrix() {
        let expected: &[(SessionStatus, SessionStatus)] = &[
            (Idle, Starting),
            (Starting, Running),
            (Starting, Error),
            (Running, Paused),
            (Running, Stopping),
            (Running, Error),
            (Paused, Running),
            (Paused, Stopping),
            (Stopping, Stopped),
            (Stopping, Error),
            (Stopping, Starting),
            (Stopped, Starting),
            (Error, Starting),
            (Error, Stopped),
        ];

        for &from in &ALL {
            for &to in &ALL {
                let expect = expected.contains(&(from, to));
                assert_eq!(
                    is_valid_transition(from, to),
                    expect,
                    "transition {from:?} -> {to:?} should be {expect}"
                );
            }
        }
    }

    #[test]
    fn no_state_transitions_to_itself() {
        for &state in &ALL {
            assert!(!is_valid_transition(state, state));
        }
    }

    #[test]
    fn early_stop_only_applies_to_idle_and_starting() {
        assert!(allows_early_stop(Idle));
        assert!(allows_early_stop(Starting));
        assert!(!allows_early_stop(Running));
        assert!(!allows_early_stop(Paused));
        assert!(!allows_early_stop(Stopping));
        assert!(!allows_early_stop(Stopped));
        assert!(!allows_early_stop(Error));
    }
}
