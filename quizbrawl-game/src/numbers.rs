//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Slack applied before rounding up so that binary floating-point noise
/// (`100.0 * 1.1 == 110.00000000000001`) does not bump a price to the next step.
const CEIL_SLACK: f64 = 1e-9;

/// Round a non-negative amount up to the next multiple of `step`.
///
/// NaN and non-positive inputs collapse to 0. Amounts past the `u64` range,
/// including `+inf`, saturate at the largest multiple of `step`.
#[must_use]
pub fn ceil_to_multiple(value: f64, step: u64) -> u64 {
    if value.is_nan() || value <= 0.0 || step == 0 {
        return 0;
    }
    let ceiling = u64::MAX / step * step;
    if value.is_infinite() {
        return ceiling;
    }
    let step_f = u64_to_f64(step);
    let units = (value / step_f - CEIL_SLACK).ceil().max(0.0);
    cast::<f64, u64>(units)
        .unwrap_or(u64::MAX)
        .checked_mul(step)
        .unwrap_or(ceiling)
}

/// Integer percentage `part / whole`, rounded to nearest; 0 when `whole` is 0.
#[must_use]
pub fn percent(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    let pct = (u64_to_f64(part) / u64_to_f64(whole) * 100.0).round();
    cast::<f64, u32>(pct.clamp(0.0, f64::from(u32::MAX))).unwrap_or(0)
}

/// Round a f64 and clamp it to the u64 range, returning 0 for non-finite values.
#[must_use]
pub fn round_f64_to_u64(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let max = cast::<u64, f64>(u64::MAX).unwrap_or(f64::MAX);
    cast::<f64, u64>(value.min(max).round()).unwrap_or(u64::MAX)
}

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}
