//! Temperature to drive level mapping

/// Linear ramp from `min` at `low` to `max` at `high`
///
/// Outside the thresholds the level saturates. Inside, the ratio is taken
/// first and the product truncated, so `57.5` between `40` and `75` on a
/// `50..=255` actuator gives `50 + floor(205 * 0.5) = 152`.
pub fn compute_level(temp: f64, low: f64, high: f64, min: u8, max: u8) -> u8 {
    if temp <= low {
        return min;
    }
    if temp >= high {
        return max;
    }

    let ratio = (temp - low) / (high - low);
    let span = f64::from(max.saturating_sub(min));
    min.saturating_add((span * ratio).floor() as u8)
}
