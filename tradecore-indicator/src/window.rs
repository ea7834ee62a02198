use tracing::warn;

/// A windowed indicator's lookback spec: `t1` and `t2` seconds back from
/// "now", with `t1 > t2 >= 0` (spec.md §4.2). The window itself is the
/// half-open interval `(now - t1, now - t2]`.
///
/// Construction auto-corrects an inverted `{t1, t2}` pair by swapping and
/// logging a warning rather than erroring — spec.md §8's scenario 4 pins
/// this behaviour exactly (`t1=30, t2=120` must normalise to `t1'=120,
/// t2'=30`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSpec {
    pub t1_seconds: f64,
    pub t2_seconds: f64,
}

impl WindowSpec {
    pub fn new(t1_seconds: f64, t2_seconds: f64) -> Self {
        if t1_seconds < t2_seconds {
            warn!(
                t1 = t1_seconds,
                t2 = t2_seconds,
                "indicator window auto-correct: t1 < t2, swapping"
            );
            Self {
                t1_seconds: t2_seconds,
                t2_seconds: t1_seconds,
            }
        } else {
            Self { t1_seconds, t2_seconds }
        }
    }

    /// `(start_us, end_us)` such that the window is `(start_us, end_us]`
    /// relative to `now_us` (epoch microseconds).
    pub fn bounds_us(&self, now_us: i64) -> (i64, i64) {
        let start = now_us - (self.t1_seconds * 1_000_000.0) as i64;
        let end = now_us - (self.t2_seconds * 1_000_000.0) as i64;
        (start, end)
    }

    /// Whether `timestamp_us` falls within `(now_us - t1, now_us - t2]`.
    pub fn contains(&self, timestamp_us: i64, now_us: i64) -> bool {
        let (start, end) = self.bounds_us(now_us);
        timestamp_us > start && timestamp_us <= end
    }
}

/// Normalises a raw input timestamp to epoch microseconds. Inputs below
/// `1e12` are assumed to already be seconds-scale (ms or s), above are
/// assumed µs already; this mirrors the original's heuristic of comparing
/// magnitude against a fixed threshold rather than carrying a unit tag
/// through the wire format.
pub fn normalize_to_micros(raw: i64) -> i64 {
    if raw.abs() < 1_000_000_000_000 {
        // Treat as milliseconds.
        raw * 1_000
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_window_is_auto_corrected() {
        let window = WindowSpec::new(30.0, 120.0);
        assert_eq!(window.t1_seconds, 120.0);
        assert_eq!(window.t2_seconds, 30.0);
    }

    #[test]
    fn well_formed_window_is_unchanged() {
        let window = WindowSpec::new(120.0, 30.0);
        assert_eq!(window.t1_seconds, 120.0);
        assert_eq!(window.t2_seconds, 30.0);
    }

    #[test]
    fn contains_matches_half_open_interval() {
        let window = WindowSpec::new(120.0, 30.0);
        let now_us = 200_000_000;
        let (start, end) = window.bounds_us(now_us);
        assert!(!window.contains(start, now_us));
        assert!(window.contains(start + 1, now_us));
        assert!(window.contains(end, now_us));
        assert!(!window.contains(end + 1, now_us));
    }
}
