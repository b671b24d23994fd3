// ── Decibel arithmetic ──
//
// MIMO chains report one level per stream. The combined level is the sum
// of the linear powers, converted back to dBm.

/// Combines per-stream levels in dBm.
///
/// Non-finite readings and exact zeros (unused chains) are skipped.
/// Returns `None` when nothing is left to combine.
pub fn combine(levels: impl IntoIterator<Item = f64>) -> Option<f64> {
    let total: Option<f64> = levels
        .into_iter()
        .filter(|level| level.is_finite() && *level != 0.0)
        .map(|level| 10_f64.powf(level / 10.0))
        .fold(None, |acc, power| Some(acc.unwrap_or(0.0) + power));
    total.map(|power| 10.0 * power.log10())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn equal_streams_gain_three_decibels() {
        let combined = combine([-99.0, -99.0]).unwrap();
        assert!((combined - -95.99).abs() < 0.01, "{combined}");
    }

    #[test]
    fn excluded_readings_are_skipped() {
        let single = combine([-90.0, f64::NEG_INFINITY]).unwrap();
        assert!((single - -90.0).abs() < 1e-9, "{single}");
        let chains = combine([0.0, -71.0, f64::NAN]).unwrap();
        assert!((chains - -71.0).abs() < 1e-9, "{chains}");
        assert_eq!(combine([]), None);
        assert_eq!(combine([0.0]), None);
    }
}
