use rust_decimal::Decimal;
use tradecore_instrument::OrderbookSnapshot;

/// A single windowed tick, reduced to the fields the calculations below
/// need. Kept separate from [`tradecore_instrument::Tick`] so the ring
/// buffer can store ticks from either the `market.price_update` or
/// `market.price_batch_update` path uniformly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp_us: i64,
    pub price: Decimal,
    pub volume: Decimal,
}

fn to_f64(value: Decimal) -> Option<f64> {
    value.to_f64()
}

/// Time-weighted price average (spec.md §4.2): segments the window by
/// timestamp gaps and weights each point's price by the time until the
/// next point. `Σ(price_i × Δt_i) / Σ Δt_i`.
pub fn twpa(points: &[PricePoint]) -> Option<f64> {
    if points.len() < 2 {
        return points.first().and_then(|p| to_f64(p.price));
    }
    let mut weighted_sum = 0.0_f64;
    let mut total_dt = 0.0_f64;
    for window in points.windows(2) {
        let (a, b) = (window[0], window[1]);
        let dt = (b.timestamp_us - a.timestamp_us) as f64 / 1_000_000.0;
        if dt <= 0.0 {
            continue;
        }
        let price = to_f64(a.price)?;
        weighted_sum += price * dt;
        total_dt += dt;
    }
    if total_dt <= 0.0 {
        to_f64(points.last()?.price)
    } else {
        Some(weighted_sum / total_dt)
    }
}

/// Volume-weighted average price. `Σ(price_i × volume_i) / Σ volume_i`.
pub fn vwap(points: &[PricePoint]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    let mut weighted_sum = 0.0_f64;
    let mut total_volume = 0.0_f64;
    for point in points {
        let price = to_f64(point.price)?;
        let volume = to_f64(point.volume)?;
        weighted_sum += price * volume;
        total_volume += volume;
    }
    if total_volume <= 0.0 {
        None
    } else {
        Some(weighted_sum / total_volume)
    }
}

pub fn max_price(points: &[PricePoint]) -> Option<f64> {
    points.iter().filter_map(|p| to_f64(p.price)).fold(None, |acc, v| {
        Some(acc.map_or(v, |current: f64| current.max(v)))
    })
}

pub fn min_price(points: &[PricePoint]) -> Option<f64> {
    points.iter().filter_map(|p| to_f64(p.price)).fold(None, |acc, v| {
        Some(acc.map_or(v, |current: f64| current.min(v)))
    })
}

/// Difference of two windowed aggregates (current vs a baseline window)
/// divided by the elapsed time between their reference points.
pub fn velocity(current_aggregate: f64, baseline_aggregate: f64, dt_seconds: f64) -> Option<f64> {
    if dt_seconds <= 0.0 {
        return None;
    }
    Some((current_aggregate - baseline_aggregate) / dt_seconds)
}

/// Ratio of summed volume in the current window to the baseline window.
pub fn volume_surge(current_points: &[PricePoint], baseline_points: &[PricePoint]) -> Option<f64> {
    let current_volume: f64 = current_points.iter().filter_map(|p| to_f64(p.volume)).sum();
    let baseline_volume: f64 = baseline_points.iter().filter_map(|p| to_f64(p.volume)).sum();
    if baseline_volume <= 0.0 {
        None
    } else {
        Some(current_volume / baseline_volume)
    }
}

/// `(bids - asks) / (bids + asks)`; delegates to
/// [`OrderbookSnapshot::bid_ask_imbalance`].
pub fn bid_ask_imbalance(book: &OrderbookSnapshot) -> Option<f64> {
    book.bid_ask_imbalance().and_then(to_f64)
}

pub fn mid_price(book: &OrderbookSnapshot) -> Option<f64> {
    book.mid_price().and_then(to_f64)
}

/// Time-weighted velocity of the mid price across a sequence of orderbook
/// snapshots: difference between the newest and oldest mid price, divided
/// by the elapsed seconds.
pub fn mid_price_velocity(books: &[OrderbookSnapshot]) -> Option<f64> {
    let first = books.first()?;
    let last = books.last()?;
    let dt = (last.timestamp_us - first.timestamp_us) as f64 / 1_000_000.0;
    if dt <= 0.0 {
        return None;
    }
    let mid_first = mid_price(first)?;
    let mid_last = mid_price(last)?;
    Some((mid_last - mid_first) / dt)
}

pub fn total_liquidity(book: &OrderbookSnapshot) -> Option<f64> {
    to_f64(book.total_bid_qty() + book.total_ask_qty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradecore_instrument::{OrderLevel, Symbol};

    fn point(ts: i64, price: Decimal, volume: Decimal) -> PricePoint {
        PricePoint {
            timestamp_us: ts,
            price,
            volume,
        }
    }

    #[test]
    fn vwap_weights_by_volume() {
        let points = vec![point(1, dec!(100), dec!(1)), point(2, dec!(200), dec!(3))];
        // (100*1 + 200*3) / 4 = 175
        assert_eq!(vwap(&points), Some(175.0));
    }

    #[test]
    fn twpa_weights_by_elapsed_time() {
        let points = vec![
            point(0, dec!(100), dec!(1)),
            point(1_000_000, dec!(200), dec!(1)),
        ];
        // single segment: price=100 held for 1s, total_dt=1 => 100
        assert_eq!(twpa(&points), Some(100.0));
    }

    #[test]
    fn max_and_min_price_scan_the_window() {
        let points = vec![point(1, dec!(100), dec!(1)), point(2, dec!(50), dec!(1)), point(3, dec!(150), dec!(1))];
        assert_eq!(max_price(&points), Some(150.0));
        assert_eq!(min_price(&points), Some(50.0));
    }

    #[test]
    fn volume_surge_compares_window_sums() {
        let baseline = vec![point(1, dec!(100), dec!(10))];
        let current = vec![point(2, dec!(100), dec!(25))];
        assert_eq!(volume_surge(&current, &baseline), Some(2.5));
    }

    #[test]
    fn bid_ask_imbalance_delegates_to_orderbook() {
        let book = OrderbookSnapshot::new(
            Symbol::new("BTC_USDT"),
            0,
            vec![OrderLevel::new(dec!(100), dec!(3))],
            vec![OrderLevel::new(dec!(101), dec!(1))],
        );
        assert_eq!(bid_ask_imbalance(&book), Some(0.5));
    }
}
