//! Log-linear S-N regression.
//!
//! Fits `log10(N) = alpha + beta * log10(S)` over non-runout observations and
//! derives the confidence and design-curve quantities of the fatigue analysis
//! (SINTEF report STF18 A81047, Rausand 1981).
//!
//! The line is either estimated by least squares (2 free parameters), has its
//! slope held (1), or is given outright (0). The number of free parameters
//! sets the variance denominator `n - dof` and which interval terms exist.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]

use tracing::debug;

use crate::error::{Result, SnError};
use crate::lookup::ddist;
use crate::stats::{f_isf, mean, normal_quantile, student_t_isf, sum_squares_about_mean};
use crate::types::{ActiveData, Constraint, DesignCurve, Observation, RegressionResult};

/// Reference life for delta-sigma, in cycles.
pub const REFERENCE_LIFE: f64 = 2.0e6;

/// Slopes closer to zero than this cannot place a reference-life stress.
pub const SLOPE_EPSILON: f64 = 1e-12;

/// Default confidence level.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Residual sums at or below this are round-off of an exact line.
pub const RESIDUAL_FLOOR: f64 = 1e-20;

/// Sum of squared residuals of `observations` about a line, flushed to zero
/// at or below [`RESIDUAL_FLOOR`].
#[must_use]
pub fn residual_sum_of_squares(observations: &[Observation], log_intercept: f64, slope: f64) -> f64 {
    let rss: f64 = observations
        .iter()
        .map(|o| (log_intercept + slope * o.log_stress() - o.log_cycles()).powi(2))
        .sum();
    if rss <= RESIDUAL_FLOOR {
        0.0
    } else {
        rss
    }
}

/// Stress range on the line `(alpha - margin, beta)` at [`REFERENCE_LIFE`].
#[must_use]
pub fn delta_sigma(log_intercept: f64, slope: f64, margin: f64) -> f64 {
    10f64.powf((log_intercept - REFERENCE_LIFE.log10() - margin) / -slope)
}

/// Fits the non-runout rows of `data` under `constraint`.
pub fn fit(data: &ActiveData, constraint: Constraint, confidence: f64) -> Result<RegressionResult> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(SnError::InvalidSetting(format!(
            "confidence level must lie strictly between 0 and 1, got {confidence}"
        )));
    }

    let x: Vec<f64> = data.filtered.iter().map(Observation::log_stress).collect();
    let y: Vec<f64> = data.filtered.iter().map(Observation::log_cycles).collect();
    let (alpha, beta) = estimate_line(&x, &y, constraint)?;

    let n = x.len();
    let nf = n as f64;
    let dof = constraint.dof();
    let m = n - dof;

    let rss = residual_sum_of_squares(&data.filtered, alpha, beta);
    let tss = sum_squares_about_mean(&y);
    if tss <= 0.0 {
        return Err(SnError::ConstantCycles);
    }

    // Two points determine the free line exactly.
    let exact = matches!(constraint, Constraint::Free) && n <= 2;
    let (variance, r) = if exact {
        (0.0, 1.0)
    } else {
        (rss / m as f64, (1.0 - rss / tss).max(0.0).sqrt())
    };
    let stdev = variance.sqrt();
    let r_squared = 1.0 - rss / tss;

    let x_mean = mean(&x);
    let sxx = sum_squares_about_mean(&x);
    let q = Quantiles::new(confidence, dof, m)?;

    let s95 = q.t * stdev / nf.sqrt();
    let pre = s95 * (nf + 2.0).sqrt();
    let des3 = if m > 0 { stdev * ddist(m) } else { 0.0 };

    let terms = match constraint {
        Constraint::Free if !exact => {
            let f95 = stdev * (2.0 * q.f / nf).sqrt();
            IntervalTerms {
                f95,
                confidence_b: 2.0 * stdev * (2.0 * q.f / sxx).sqrt(),
                confidence_c: 2.0 * f95,
                slope_ci: q.z * stdev / sxx.sqrt(),
                intercept_ci: q.z * stdev * (1.0 / nf + x_mean.powi(2) / sxx).sqrt(),
            }
        }
        Constraint::FixedSlope(_) => IntervalTerms {
            f95: q.t * stdev * (1.0 / nf).sqrt(),
            confidence_b: 0.0,
            confidence_c: 2.0 * stdev * (2.0 * q.f / nf).sqrt(),
            slope_ci: 0.0,
            intercept_ci: q.t * stdev / nf.sqrt(),
        },
        _ => IntervalTerms::default(),
    };

    let bs540_margin = s95 * (nf + 1.0).sqrt();
    let result = RegressionResult {
        slope: beta,
        intercept: 10f64.powf(alpha),
        log_intercept: alpha,
        points: n,
        dof,
        confidence,
        variance,
        stdev,
        r_squared,
        r,
        delta_sigma: delta_sigma(alpha, beta, 0.0),
        slope_ci: terms.slope_ci,
        intercept_ci: terms.intercept_ci,
        mean_stress: 10f64.powf(x_mean),
        regression_confidence: 2.0 * terms.f95,
        confidence_given_s: 2.0 * pre,
        confidence_b: terms.confidence_b,
        confidence_c: terms.confidence_c,
        s_lower: beta - 0.5 * terms.confidence_b,
        s_upper: beta + 0.5 * terms.confidence_b,
        c_lower: 10f64.powf(alpha - 0.5 * terms.confidence_c),
        c_upper: 10f64.powf(alpha + 0.5 * terms.confidence_c),
        bs540: DesignCurve {
            intercept: 10f64.powf(alpha - bs540_margin),
            delta_sigma: delta_sigma(alpha, beta, bs540_margin),
        },
        ec3: DesignCurve {
            intercept: 10f64.powf(alpha - des3),
            delta_sigma: delta_sigma(alpha, beta, des3),
        },
        header_1: data.header_1.clone(),
        header_2: data.header_2.clone(),
    };
    result.ensure_finite()?;

    debug!(
        points = n,
        dof,
        slope = beta,
        log_intercept = alpha,
        variance,
        r_squared,
        "fitted S-N curve"
    );
    Ok(result)
}

/// Returns `(alpha, beta)` for the constraint.
fn estimate_line(x: &[f64], y: &[f64], constraint: Constraint) -> Result<(f64, f64)> {
    // Fewer than two points leave TSS at zero whatever the constraint.
    let n = x.len();
    if n < 2 {
        return Err(SnError::InsufficientData {
            points: n,
            dof: constraint.dof(),
        });
    }

    let (alpha, beta) = match constraint {
        Constraint::Free => {
            let x_mean = mean(x);
            let y_mean = mean(y);
            let sxx = sum_squares_about_mean(x);
            if sxx <= 0.0 || !sxx.is_finite() {
                return Err(SnError::ConstantStress);
            }
            let sxy: f64 = x
                .iter()
                .zip(y)
                .map(|(xi, yi)| (xi - x_mean) * (yi - y_mean))
                .sum();
            let beta = sxy / sxx;
            (y_mean - beta * x_mean, beta)
        }
        Constraint::FixedSlope(beta) => (mean(y) - beta * mean(x), beta),
        Constraint::FixedLine {
            slope,
            log_intercept,
        } => (log_intercept, slope),
    };

    if !beta.is_finite() {
        return Err(SnError::NonFinite("slope"));
    }
    if !alpha.is_finite() {
        return Err(SnError::NonFinite("log_intercept"));
    }
    if beta.abs() < SLOPE_EPSILON {
        return Err(SnError::DegenerateSlope(beta));
    }
    Ok((alpha, beta))
}

/// Critical values at the configured confidence level. A quantile whose
/// degrees of freedom are zero is undefined and reported as zero, which
/// zeroes every interval term built on it.
struct Quantiles {
    t: f64,
    f: f64,
    z: f64,
}

impl Quantiles {
    fn new(confidence: f64, dof: usize, residual_dof: usize) -> Result<Self> {
        let significance = 1.0 - confidence;
        let t = if residual_dof > 0 {
            student_t_isf(significance / 2.0, residual_dof)?
        } else {
            0.0
        };
        let f = if dof > 0 && residual_dof > 0 {
            f_isf(significance, dof, residual_dof)?
        } else {
            0.0
        };
        let z = normal_quantile(1.0 - significance / 2.0)?;
        Ok(Self { t, f, z })
    }
}

#[derive(Default)]
struct IntervalTerms {
    f95: f64,
    confidence_b: f64,
    confidence_c: f64,
    slope_ci: f64,
    intercept_ci: f64,
}
