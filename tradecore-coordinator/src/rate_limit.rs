use std::time::{Duration, Instant};

/// Fixed-window local rate limiter: resets its counter once a minute has
/// elapsed since the window opened (spec.md §4.6 "local token-bucket rate
/// limit"; the original tracks requests-per-minute with a rolling reset
/// rather than a true token bucket, which this mirrors).
#[derive(Debug)]
pub(crate) struct RateLimitState {
    requests_this_minute: u32,
    window_start: Instant,
    max_per_minute: u32,
}

impl RateLimitState {
    pub(crate) fn new(max_per_minute: u32) -> Self {
        Self {
            requests_this_minute: 0,
            window_start: Instant::now(),
            max_per_minute,
        }
    }

    /// Returns `true` and consumes a slot if under the limit; otherwise
    /// leaves state untouched and returns `false`.
    pub(crate) fn try_acquire(&mut self) -> bool {
        if self.window_start.elapsed() >= Duration::from_secs(60) {
            self.requests_this_minute = 0;
            self.window_start = Instant::now();
        }
        if self.requests_this_minute >= self.max_per_minute {
            return false;
        }
        self.requests_this_minute += 1;
        true
    }

    pub(crate) fn requests_this_minute(&self) -> u32 {
        self.requests_this_minute
    }

    pub(crate) fn max_per_minute(&self) -> u32 {
        self.max_per_minute
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_after_max_requests_and_blocks_further_acquires() {
        let mut state = RateLimitState::new(2);
        assert!(state.try_acquire());
        assert!(state.try_acquire());
        assert!(!state.try_acquire());
    }
}
