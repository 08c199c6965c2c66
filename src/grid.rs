//! Small numeric grid helpers shared by the planning stages.

/// Generate `n` evenly spaced samples over `[start, end]`, endpoints included.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Piecewise-linear interpolation of `(xp, fp)` onto `x`.
///
/// `xp` must be ascending. Samples outside the curve clamp to the end
/// values, matching the resampling behaviour of the planning pipeline.
pub fn interp(x: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    x.iter().map(|&xi| interp_one(xi, xp, fp)).collect()
}

/// Interpolate a single sample; see [`interp`].
pub fn interp_one(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    if xp.is_empty() {
        return 0.0;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[xp.len() - 1] {
        return fp[fp.len() - 1];
    }
    let hi = xp.partition_point(|&v| v < x);
    let lo = hi - 1;
    let span = xp[hi] - xp[lo];
    if span == 0.0 {
        return fp[lo];
    }
    fp[lo] + (fp[hi] - fp[lo]) * (x - xp[lo]) / span
}

/// Round a radius in metres to the nearest 10 mm.
pub fn round_to_grid(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn linspace_spans_endpoints() {
        let samples = linspace(0.0, 1.0, 5);
        assert_eq!(samples.len(), 5);
        assert_relative_eq!(samples[0], 0.0);
        assert_relative_eq!(samples[2], 0.5);
        assert_relative_eq!(samples[4], 1.0);
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn interp_is_linear_between_knots() {
        let xp = [0.0, 1.0, 2.0];
        let fp = [0.0, 10.0, 0.0];
        assert_relative_eq!(interp_one(0.5, &xp, &fp), 5.0);
        assert_relative_eq!(interp_one(1.5, &xp, &fp), 5.0);
    }

    #[test]
    fn interp_clamps_outside_the_curve() {
        let xp = [1.0, 2.0];
        let fp = [3.0, 7.0];
        assert_relative_eq!(interp_one(0.0, &xp, &fp), 3.0);
        assert_relative_eq!(interp_one(9.0, &xp, &fp), 7.0);
    }

    #[test]
    fn rounding_snaps_to_ten_millimetres() {
        assert_relative_eq!(round_to_grid(0.204), 0.2);
        assert_relative_eq!(round_to_grid(0.205), 0.21);
        assert_relative_eq!(round_to_grid(12.3449), 12.34);
    }
}
