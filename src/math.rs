//! Small numeric helpers shared by the data and unmixing layers.

// ---------------------------------------------------------------------------
// Nearest-value lookup
// ---------------------------------------------------------------------------

/// Index of the value in `data` closest to `value`.
///
/// Linear scan; ties keep the first (lowest-index) match. Returns 0 for an
/// empty slice, which mirrors indexing an axis that was never populated.
pub fn nearest_index(value: f64, data: &[f64]) -> usize {
    let mut difference = f64::MAX;
    let mut index = 0;
    for (i, &x) in data.iter().enumerate() {
        let d = (value - x).abs();
        if d < difference {
            difference = d;
            index = i;
        }
    }
    index
}

// ---------------------------------------------------------------------------
// Slice extremes
// ---------------------------------------------------------------------------

/// Maximum of a slice (`-MAX` when empty).
pub fn max_of(input: &[f64]) -> f64 {
    input.iter().fold(-f64::MAX, |acc, &v| if v > acc { v } else { acc })
}

/// Minimum of a slice (`MAX` when empty).
pub fn min_of(input: &[f64]) -> f64 {
    input.iter().fold(f64::MAX, |acc, &v| if v < acc { v } else { acc })
}

// ---------------------------------------------------------------------------
// Trapezoidal integration
// ---------------------------------------------------------------------------

/// Integrate `ys` over the `[min_x, max_x]` interval of `xs` with the
/// trapezoidal rule. The interval bounds snap to the nearest axis samples.
pub fn integrate(min_x: f64, max_x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let i1 = nearest_index(min_x, xs);
    let i2 = nearest_index(max_x, xs);
    let from = i1.min(i2);
    let to = i1.max(i2);
    let mut area = 0.0;
    for i in from..to.saturating_sub(1) {
        area += (xs[i + 1] - xs[i]).abs() * (0.5 * (ys[i] + ys[i + 1])).abs();
    }
    area
}

// ---------------------------------------------------------------------------
// Error-rounded formatting
// ---------------------------------------------------------------------------

/// Format `value` rounded to the first significant figure of `error`,
/// e.g. `round_by_error(0.80349, 0.001)` → `"0.803"`.
///
/// With `error == 0` the value is formatted as-is.
pub fn round_by_error(value: f64, error: f64) -> String {
    if error == 0.0 {
        return value.to_string();
    }
    let error_digits = error.log10().floor();
    let factor = 10f64.powf(error_digits);
    let rounded = (value / factor).round() * factor;
    if error_digits > 0.0 {
        format!("{rounded:.0}")
    } else {
        let prec = (-error_digits) as usize;
        format!("{rounded:.prec$}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_index_finds_closest_value() {
        let axis = [400.0, 410.0, 420.0, 430.0];
        assert_eq!(nearest_index(411.0, &axis), 1);
        assert_eq!(nearest_index(426.0, &axis), 3);
        assert_eq!(nearest_index(-100.0, &axis), 0);
        assert_eq!(nearest_index(900.0, &axis), 3);
    }

    #[test]
    fn nearest_index_ties_keep_first_occurrence() {
        // 405 is equidistant from 400 and 410.
        assert_eq!(nearest_index(405.0, &[400.0, 410.0]), 0);
        // Duplicate values: the lower index wins.
        assert_eq!(nearest_index(410.0, &[400.0, 410.0, 410.0]), 1);
    }

    #[test]
    fn extremes_of_slice() {
        let v = [3.0, -1.0, 7.5, 0.0];
        assert_eq!(max_of(&v), 7.5);
        assert_eq!(min_of(&v), -1.0);
    }

    #[test]
    fn integrates_constant_function() {
        let xs: Vec<f64> = (0..11).map(f64::from).collect();
        let ys = vec![2.0; 11];
        let area = integrate(0.0, 10.0, &xs, &ys);
        assert!((area - 18.0).abs() < 1e-12); // 9 trapezoids of width 1
    }

    #[test]
    fn rounds_value_to_error_precision() {
        assert_eq!(round_by_error(0.80349, 0.001), "0.803");
        assert_eq!(round_by_error(0.1, 0.001), "0.100");
        assert_eq!(round_by_error(123.456, 10.0), "120");
        assert_eq!(round_by_error(5.0, 0.0), "5");
    }
}
