//! Statistical helpers.
//!
//! Sample moments and the distribution quantiles used by the regression and
//! comparison code. Quantiles are expressed as inverse survival functions
//! (`isf(p) = inverse_cdf(1 - p)`), the upper-tail form used for critical
//! values throughout.

#![allow(clippy::cast_precision_loss)]

use statrs::distribution::{ContinuousCDF, FisherSnedecor, Normal, StudentsT};

use crate::error::{Result, SnError};

/// Arithmetic mean; zero for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sum of squared deviations from the mean.
#[must_use]
pub fn sum_squares_about_mean(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum()
}

/// Upper-tail quantile of Student's t with `df` degrees of freedom.
pub fn student_t_isf(p: f64, df: usize) -> Result<f64> {
    check_probability(p)?;
    let dist = StudentsT::new(0.0, 1.0, df as f64)
        .map_err(|e| SnError::Quantile(format!("Student t with {df} dof: {e}")))?;
    Ok(dist.inverse_cdf(1.0 - p))
}

/// Upper-tail quantile of the F distribution with `(d1, d2)` degrees of
/// freedom.
pub fn f_isf(p: f64, d1: usize, d2: usize) -> Result<f64> {
    check_probability(p)?;
    let dist = FisherSnedecor::new(d1 as f64, d2 as f64)
        .map_err(|e| SnError::Quantile(format!("F({d1}, {d2}): {e}")))?;
    Ok(dist.inverse_cdf(1.0 - p))
}

/// Quantile of the standard normal distribution.
pub fn normal_quantile(p: f64) -> Result<f64> {
    check_probability(p)?;
    let dist = Normal::new(0.0, 1.0).map_err(|e| SnError::Quantile(e.to_string()))?;
    Ok(dist.inverse_cdf(p))
}

fn check_probability(p: f64) -> Result<()> {
    if p > 0.0 && p < 1.0 {
        Ok(())
    } else {
        Err(SnError::Quantile(format!(
            "probability {p} is outside the open interval (0, 1)"
        )))
    }
}

/// Checks if actual value is within relative tolerance of expected value.
#[inline]
#[must_use]
pub fn within_tolerance(actual: f64, expected: f64, tolerance: f64) -> bool {
    if expected.abs() < f64::EPSILON {
        actual.abs() <= tolerance
    } else {
        (actual - expected).abs() / expected.abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_sum_squares() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!((mean(&v) - 2.5).abs() < f64::EPSILON);
        assert!((sum_squares_about_mean(&v) - 5.0).abs() < 1e-12);
        assert!(mean(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_student_t_isf_matches_table() {
        // Two-sided 95% critical values
        assert!(within_tolerance(student_t_isf(0.025, 10).unwrap(), 2.228, 1e-3));
        assert!(within_tolerance(student_t_isf(0.025, 2).unwrap(), 4.303, 1e-3));
    }

    #[test]
    fn test_f_isf_matches_table() {
        assert!(within_tolerance(f_isf(0.05, 1, 10).unwrap(), 4.965, 1e-3));
        assert!(within_tolerance(f_isf(0.05, 2, 10).unwrap(), 4.103, 1e-3));
        assert!(within_tolerance(f_isf(0.025, 4, 4).unwrap(), 9.605, 1e-3));
    }

    #[test]
    fn test_normal_quantile() {
        assert!(within_tolerance(normal_quantile(0.975).unwrap(), 1.959_96, 1e-5));
    }

    #[test]
    fn test_quantile_rejects_bad_inputs() {
        assert!(student_t_isf(0.025, 0).is_err());
        assert!(f_isf(0.05, 0, 3).is_err());
        assert!(normal_quantile(1.0).is_err());
    }

    #[test]
    fn test_within_tolerance() {
        assert!(within_tolerance(100.5, 100.0, 0.01));
        assert!(!within_tolerance(102.0, 100.0, 0.01));
    }
}
