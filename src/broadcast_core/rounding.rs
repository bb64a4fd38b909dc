//! Chart-value rounding with a 0.30 fractional threshold
//!
//! Snaps aggregated values to whole numbers so near-integer drift does not
//! jitter the rendered chart. This is NOT arithmetic half-up rounding: the
//! fractional magnitude rounds up from 0.30, otherwise it truncates.

/// Round an aggregated chart value to a whole number.
///
/// Non-finite input (NaN, ±infinity) is treated as 0. The sign is applied to
/// the magnitude after snapping, so -1.30 rounds away from zero to -2.0 just
/// as 1.30 rounds to 2.0. Idempotent: integers pass through unchanged.
pub fn round_chart_value(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }

    let sign = if value >= 0.0 { 1.0 } else { -1.0 };
    let magnitude = value.abs();
    let int_part = magnitude.floor();
    let frac_part = magnitude - int_part;

    if frac_part >= 0.30 {
        sign * (int_part + 1.0)
    } else {
        sign * int_part
    }
}
