//! Descriptive statistics and the two-sample significance test.

use std::fmt;

use serde::{Serialize, Serializer};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Values below this are written in scientific notation.
const SCIENTIFIC_BELOW: f64 = 0.0001;

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1 denominator). `None` below two observations.
pub fn sample_variance(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Some(values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64)
}

/// `100 * (after - before) / before`, or `None` when `before` is zero.
pub fn percent_change(before: f64, after: f64) -> Option<f64> {
    if before == 0.0 {
        return None;
    }
    let pct = (after - before) / before * 100.0;
    pct.is_finite().then_some(pct)
}

/// Rounds to `places` decimals, ties to even.
///
/// Exact binary ties such as 0.125 go to the even digit (0.12). Values that
/// only look like ties in decimal follow the scaled product, which can differ
/// from correctly rounding the exact binary value in the last place.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round_ties_even() / scale
}

/// Outcome of a significance test, or the reason none could be computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PValue {
    Value(f64),
    /// Too few observations or zero pooled variance.
    NotApplicable,
}

impl PValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            PValue::Value(p) => Some(*p),
            PValue::NotApplicable => None,
        }
    }
}

impl fmt::Display for PValue {
    /// `1.2345e-05` below 0.0001, otherwise four fixed decimals, `N/A` when absent.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PValue::NotApplicable => f.write_str("N/A"),
            PValue::Value(p) if *p < SCIENTIFIC_BELOW => f.write_str(&scientific(*p, 4)),
            PValue::Value(p) => write!(f, "{p:.4}"),
        }
    }
}

impl Serialize for PValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Scientific notation with a signed two-digit exponent (`3.1416e+00`).
fn scientific(value: f64, precision: usize) -> String {
    let raw = format!("{value:.precision$e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => raw,
    }
}

/// Student's two-sample t-test assuming equal variances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    pub statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
}

/// Runs the pooled-variance t-test on two independent samples.
///
/// Returns `None` when either sample is empty, the degrees of freedom are
/// below one, or both samples have zero variance.
pub fn student_t_test(a: &[f64], b: &[f64]) -> Option<TTest> {
    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let df = n_a + n_b - 2.0;
    if a.is_empty() || b.is_empty() || df < 1.0 {
        return None;
    }
    let (mean_a, mean_b) = (mean(a)?, mean(b)?);
    // A single observation contributes no spread to the pooled estimate.
    let var_a = sample_variance(a, mean_a).unwrap_or(0.0);
    let var_b = sample_variance(b, mean_b).unwrap_or(0.0);
    let pooled = ((n_a - 1.0) * var_a + (n_b - 1.0) * var_b) / df;
    if pooled <= 0.0 || !pooled.is_finite() {
        return None;
    }

    let statistic = (mean_a - mean_b) / (pooled * (1.0 / n_a + 1.0 / n_b)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    let p_value = (2.0 * dist.cdf(-statistic.abs())).clamp(0.0, 1.0);

    Some(TTest {
        statistic,
        degrees_of_freedom: df,
        p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mean_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn test_sample_variance() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&v).unwrap();
        assert_abs_diff_eq!(sample_variance(&v, m).unwrap(), 32.0 / 7.0, epsilon = 1e-12);
        assert_eq!(sample_variance(&[1.0], 1.0), None);
    }

    #[test]
    fn test_percent_change_with_zero_base() {
        assert_eq!(percent_change(0.0, 10.0), None);
        assert_eq!(percent_change(10.0, 12.0), Some(20.0));
        assert_eq!(percent_change(10.0, 8.0), Some(-20.0));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(-0.126, 2), -0.13);
    }

    #[test]
    fn test_round_to_exact_ties_go_even() {
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(-0.125, 2), -0.12);
        assert_eq!(round_to(2.5, 0), 2.0);
    }

    #[test]
    fn test_t_test_matches_reference_values() {
        // scipy.stats.ttest_ind([1,2,3,4,5], [2,4,6,8,10]) -> t=-1.8974, p=0.0943
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let t = student_t_test(&a, &b).unwrap();
        assert_abs_diff_eq!(t.statistic, -1.897_366_596, epsilon = 1e-6);
        assert_abs_diff_eq!(t.degrees_of_freedom, 8.0);
        assert_abs_diff_eq!(t.p_value, 0.0943, epsilon = 1e-4);
    }

    #[test]
    fn test_t_test_identical_samples() {
        let a = [3.0, 4.0, 5.0];
        let t = student_t_test(&a, &a).unwrap();
        assert_abs_diff_eq!(t.statistic, 0.0);
        assert_abs_diff_eq!(t.p_value, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_t_test_single_observation_sample() {
        // scipy.stats.ttest_ind([4], [1,2,3]) -> t=1.7321, df=2, p=0.2254
        let t = student_t_test(&[4.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_abs_diff_eq!(t.statistic, 3f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(t.degrees_of_freedom, 2.0);
        assert_abs_diff_eq!(t.p_value, 1.0 - 3f64.sqrt() / 5f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_t_test_degenerate_inputs() {
        assert!(student_t_test(&[], &[1.0, 2.0]).is_none());
        assert!(student_t_test(&[1.0], &[2.0]).is_none());
        assert!(student_t_test(&[5.0, 5.0], &[5.0, 5.0, 5.0]).is_none());
    }

    #[test]
    fn test_p_value_formatting() {
        assert_eq!(PValue::Value(0.0943).to_string(), "0.0943");
        assert_eq!(PValue::Value(0.5).to_string(), "0.5000");
        assert_eq!(PValue::Value(0.0001).to_string(), "0.0001");
        assert_eq!(PValue::Value(0.0000123456).to_string(), "1.2346e-05");
        assert_eq!(PValue::Value(0.0).to_string(), "0.0000e+00");
        assert_eq!(PValue::NotApplicable.to_string(), "N/A");
    }

    #[test]
    fn test_p_value_serializes_as_display_string() {
        let json = serde_json::to_string(&PValue::Value(0.25)).unwrap();
        assert_eq!(json, "\"0.2500\"");
    }
}
