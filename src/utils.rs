/// Rounds to two decimal places, ties away from zero.
///
/// Every two-decimal figure in this crate goes through here so the rounding
/// rule lives in one place: `round2(0.125) == 0.13`, not the banker's 0.12.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage ratio rounded to two decimals.
///
/// A zero denominator yields the sentinel 0.0 rather than a division fault,
/// so one degenerate filing cannot abort the rest of a series.
pub fn pct(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        round2(numerator / denominator * 100.0)
    }
}
