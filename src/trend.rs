//! Trend and oscillator math
//!
//! The hourly trend is the least-squares slope of price against wall-clock
//! seconds, normalised by the latest price and scaled to percent per hour.
//! Accumulation is online and mean-centred: epoch timestamps are around
//! 1.7e9, and the naive sum-of-squares formula loses every significant
//! digit at that magnitude.

use crate::history::PricePoint;

/// Seconds per hour times percent: converts price/sec slope over last price
/// into %/hour.
pub const TREND_SCALE: f64 = 360_000.0;

/// Least-squares slope of price versus time in price units per second.
///
/// Returns 0 for fewer than two points or when all points share a
/// timestamp.
pub fn slope<'a, I>(window: I) -> f64
where
    I: IntoIterator<Item = &'a PricePoint>,
{
    let mut n = 0.0_f64;
    let mut mean_x = 0.0;
    let mut mean_y = 0.0;
    let mut comoment_xy = 0.0;
    let mut moment_xx = 0.0;

    for point in window {
        n += 1.0;
        let x = point.time.timestamp_millis() as f64 / 1e3;
        let y = point.price;
        let dx = x - mean_x;
        mean_x += dx / n;
        mean_y += (y - mean_y) / n;
        comoment_xy += dx * (y - mean_y);
        moment_xx += dx * (x - mean_x);
    }

    if n < 2.0 || moment_xx == 0.0 {
        return 0.0;
    }
    comoment_xy / moment_xx
}

/// Hourly trend in percent of `last_price`.
pub fn hourly_trend_pct<'a, I>(window: I, last_price: f64) -> f64
where
    I: IntoIterator<Item = &'a PricePoint>,
{
    if last_price == 0.0 {
        return 0.0;
    }
    TREND_SCALE * slope(window) / last_price
}

/// Stochastic %K: where the last price sits in the day's low/high range.
///
/// Returns 0 for a degenerate range (high <= low) rather than dividing by
/// zero on a flat market.
pub fn stochastic_k(last: f64, low: f64, high: f64) -> f64 {
    if high <= low {
        return 0.0;
    }
    100.0 * (last - low) / (high - low)
}
