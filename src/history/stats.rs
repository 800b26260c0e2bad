//! Numerics for step-change detection over a short series.
//!
//! Everything here works on `f64` slices of a few dozen points, so the
//! straightforward O(n log n) / O(n²) formulations are fine.

#![allow(clippy::cast_precision_loss)] // Sample counts are tiny
#![allow(clippy::cast_possible_wrap)]

use std::cmp::Ordering;
use std::f64::consts::{PI, SQRT_2};

/// Smooth `values` with a normalized Hann window of `window` points.
///
/// The series is mirrored at both ends so the output keeps the input length.
/// The window is clamped to the series length; windows shorter than 3 points
/// return the input unchanged.
#[must_use]
pub fn hann_smooth(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let window = window.min(n);
    if window < 3 {
        return values.to_vec();
    }

    let span = (window - 1) as f64;
    let weights: Vec<f64> = (0..window)
        .map(|k| 0.5 - 0.5 * (2.0 * PI * k as f64 / span).cos())
        .collect();
    let total: f64 = weights.iter().sum();

    // Mirror without repeating the edge sample.
    let reflect = |index: isize| -> f64 {
        let last = n as isize - 1;
        let mirrored = if index < 0 {
            -index
        } else if index > last {
            2 * last - index
        } else {
            index
        };
        values[mirrored.unsigned_abs()]
    };

    let half = (window - 1) / 2;
    (0..n)
        .map(|j| {
            weights
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let index = (j + half + k) as isize - (window - 1) as isize;
                    w * reflect(index)
                })
                .sum::<f64>()
                / total
        })
        .collect()
}

/// Two-sided Mann-Whitney U test, normal approximation with tie and
/// continuity correction. Returns the p-value.
#[must_use]
pub fn mann_whitney_p(a: &[f64], b: &[f64]) -> f64 {
    let (n1, n2) = (a.len(), b.len());
    if n1 == 0 || n2 == 0 {
        return 1.0;
    }

    let mut pooled: Vec<(f64, bool)> = a
        .iter()
        .map(|&v| (v, true))
        .chain(b.iter().map(|&v| (v, false)))
        .collect();
    pooled.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap_or(Ordering::Equal));

    let n = pooled.len();
    let mut rank_sum_a = 0.0;
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && pooled[j].0 == pooled[i].0 {
            j += 1;
        }
        // Ranks i+1..=j share their average.
        let average_rank = (i + 1 + j) as f64 / 2.0;
        let in_a = pooled[i..j].iter().filter(|(_, from_a)| *from_a).count();
        rank_sum_a += average_rank * in_a as f64;

        let t = (j - i) as f64;
        tie_term += t * t * t - t;
        i = j;
    }

    let (n1, n2, n) = (n1 as f64, n2 as f64, n as f64);
    let u1 = rank_sum_a - n1 * (n1 + 1.0) / 2.0;
    let u = u1.max(n1 * n2 - u1);
    let mean = n1 * n2 / 2.0;
    let variance = n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if variance <= 0.0 {
        return 1.0;
    }

    let z = (u - mean - 0.5) / variance.sqrt();
    erfc(z / SQRT_2).clamp(0.0, 1.0)
}

/// Two-sided Welch t-test (unequal variances). Returns the p-value.
///
/// Both samples need at least two points; otherwise the result is 1.
#[must_use]
pub fn welch_p(a: &[f64], b: &[f64]) -> f64 {
    if a.len() < 2 || b.len() < 2 {
        return 1.0;
    }

    let (mean_a, var_a) = mean_and_variance(a);
    let (mean_b, var_b) = mean_and_variance(b);
    let se_a = var_a / a.len() as f64;
    let se_b = var_b / b.len() as f64;
    let se = se_a + se_b;

    if se <= 0.0 {
        return if mean_a == mean_b { 1.0 } else { 0.0 };
    }

    let t = (mean_a - mean_b) / se.sqrt();
    let df = se * se
        / (se_a * se_a / (a.len() - 1) as f64 + se_b * se_b / (b.len() - 1) as f64);

    student_t_two_sided_p(t, df)
}

/// Index where the series most recently stepped, if it has one.
///
/// Correlates the mean-removed series with a unit step. The last strict
/// local maximum of the correlation's magnitude marks the first sample of
/// the step, whichever direction it went.
#[must_use]
pub fn estimate_step(values: &[f64]) -> Option<usize> {
    let n = values.len();
    if n < 3 {
        return None;
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let total: f64 = centered.iter().sum();

    // response[k] = sum(after k) - sum(before k)
    let mut response = Vec::with_capacity(n + 1);
    let mut prefix = 0.0;
    for k in 0..=n {
        response.push(((total - prefix) - prefix).abs());
        if k < n {
            prefix += centered[k];
        }
    }

    (1..n)
        .rev()
        .find(|&k| response[k - 1] < response[k] && response[k + 1] < response[k])
}

fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance)
}

fn student_t_two_sided_p(t: f64, df: f64) -> f64 {
    if !t.is_finite() || !df.is_finite() || df <= 0.0 {
        return if t.is_infinite() { 0.0 } else { 1.0 };
    }
    regularized_incomplete_beta(df / 2.0, 0.5, df / (df + t * t)).clamp(0.0, 1.0)
}

/// Complementary error function, fractional error below 1.2e-7.
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * poly.exp();
    if x >= 0.0 { r } else { 2.0 - r }
}

/// Lanczos approximation (g = 7, nine coefficients).
fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        return (PI / (PI * x).sin().abs()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let series = COEFFICIENTS
        .iter()
        .enumerate()
        .skip(1)
        .fold(COEFFICIENTS[0], |acc, (i, c)| acc + c / (x + i as f64));
    let t = x + 7.5;
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

/// I_x(a, b) via the continued fraction, evaluated on whichever side
/// converges quickly.
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();

    if x < (a + 1.0) / (a + b + 2.0) {
        ln_front.exp() * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - ln_front.exp() * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITERATIONS: u32 = 300;
    const EPSILON: f64 = 1e-14;
    const TINY: f64 = 1e-300;

    let guard = |v: f64| if v.abs() < TINY { TINY } else { v };

    let (qab, qap, qam) = (a + b, a + 1.0, a - 1.0);
    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m = f64::from(m);
        let m2 = 2.0 * m;

        let even = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / guard(1.0 + even * d);
        c = guard(1.0 + even / c);
        h *= d * c;

        let odd = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / guard(1.0 + odd * d);
        c = guard(1.0 + odd / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f64, expected: f64, tolerance: f64) -> bool {
        (actual - expected).abs() < tolerance
    }

    #[test]
    fn test_erfc_reference_values() {
        assert!(close(erfc(0.0), 1.0, 1e-7));
        assert!(close(erfc(1.0), 0.157_299_207, 1e-6));
        assert!(close(erfc(-1.0), 1.842_700_793, 1e-6));
    }

    #[test]
    fn test_ln_gamma_reference_values() {
        assert!(close(ln_gamma(5.0), 24.0_f64.ln(), 1e-10));
        assert!(close(ln_gamma(0.5), PI.sqrt().ln(), 1e-10));
        assert!(close(ln_gamma(0.25), 1.288_022_524_698_077_5, 1e-9));
    }

    #[test]
    fn test_student_t_critical_value() {
        // t(0.975, 10) = 2.228
        assert!(close(student_t_two_sided_p(2.228, 10.0), 0.05, 1e-3));
        assert!(close(student_t_two_sided_p(0.0, 10.0), 1.0, 1e-12));
    }

    #[test]
    fn test_hann_smooth_preserves_length_and_constants() {
        let flat = vec![7.0; 12];
        let smoothed = hann_smooth(&flat, 9);
        assert_eq!(smoothed.len(), 12);
        assert!(smoothed.iter().all(|v| close(*v, 7.0, 1e-12)));
    }

    #[test]
    fn test_hann_smooth_spreads_spike() {
        let spike = [0.0, 0.0, 0.0, 0.0, 8.0, 0.0, 0.0, 0.0, 0.0];
        let smoothed = hann_smooth(&spike, 5);
        assert!(close(smoothed[3], 2.0, 1e-12));
        assert!(close(smoothed[4], 4.0, 1e-12));
        assert!(close(smoothed[5], 2.0, 1e-12));
        assert!(close(smoothed[0], 0.0, 1e-12));
    }

    #[test]
    fn test_hann_smooth_short_window_is_identity() {
        let values = [1.0, 5.0, 2.0];
        assert_eq!(hann_smooth(&values, 2), values.to_vec());
        assert_eq!(hann_smooth(&[], 9), Vec::<f64>::new());
    }

    #[test]
    fn test_mann_whitney_separated_samples() {
        let p = mann_whitney_p(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        assert!(close(p, 0.080_856, 1e-3), "p = {p}");
    }

    #[test]
    fn test_mann_whitney_identical_samples() {
        assert!(close(mann_whitney_p(&[3.0; 8], &[3.0; 4]), 1.0, 1e-12));
    }

    #[test]
    fn test_welch_equal_samples() {
        let sample = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(close(welch_p(&sample, &sample), 1.0, 1e-12));
    }

    #[test]
    fn test_welch_separated_samples() {
        let a = [10.0, 11.0, 9.0, 10.5, 9.5, 10.0];
        let b = [20.0, 21.0, 19.0, 20.5];
        assert!(welch_p(&a, &b) < 1e-4);
    }

    #[test]
    fn test_welch_zero_variance() {
        assert!(close(welch_p(&[2.0, 2.0], &[2.0, 2.0]), 1.0, 1e-12));
        assert!(close(welch_p(&[2.0, 2.0], &[3.0, 3.0]), 0.0, 1e-12));
    }

    #[test]
    fn test_estimate_step_finds_first_raised_sample() {
        let values = [1.0, 1.0, 1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0, 5.0];
        assert_eq!(estimate_step(&values), Some(5));
    }

    #[test]
    fn test_estimate_step_finds_downward_step() {
        let values = [9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 2.0, 2.0, 2.0];
        assert_eq!(estimate_step(&values), Some(6));
    }

    #[test]
    fn test_estimate_step_flat_series() {
        assert_eq!(estimate_step(&[4.0; 10]), None);
        assert_eq!(estimate_step(&[1.0, 2.0]), None);
    }
}
