//! Two-sample comparison of S-N data sets.
//!
//! Answers whether two data sets can be treated as one population, in three
//! steps (Rausand 1981, section 3.6): equal residual variances, parallel
//! curves, coincident curves. Each step reports `true` when the data sets are
//! statistically indistinguishable in that respect.
//!
//! The comparison always runs on the two individual slots with free fits,
//! whatever the engine's merge flag or user slope.

#![allow(clippy::cast_precision_loss)]

use tracing::debug;

use crate::engine::Engine;
use crate::error::{Result, SnError};
use crate::regression::{self, residual_sum_of_squares};
use crate::stats::f_isf;
use crate::types::{ComparisonResult, Constraint, Observation, RegressionResult, Slot};

/// Compares the data in `slot_a` and `slot_b`.
pub fn compare(engine: &Engine, slot_a: Slot, slot_b: Slot) -> Result<ComparisonResult> {
    if slot_a == slot_b {
        return Err(SnError::SameSlot(slot_a));
    }
    let confidence = engine.settings().confidence;
    let significance = 1.0 - confidence;

    let data_a = engine.active_data(slot_a, true)?;
    let data_b = engine.active_data(slot_b, true)?;
    let fit_a = regression::fit(&data_a, Constraint::Free, confidence)?;
    let fit_b = regression::fit(&data_b, Constraint::Free, confidence)?;
    let joint = regression::fit(&engine.merged_data()?, Constraint::Free, confidence)?;

    let dof_a = residual_dof(&fit_a)?;
    let dof_b = residual_dof(&fit_b)?;
    let dof_total = dof_a + dof_b;

    // Step 1: equal variances, two-sided F test.
    let upper = f_isf(significance / 2.0, dof_a, dof_b)?;
    let lower = 1.0 / f_isf(significance / 2.0, dof_b, dof_a)?;
    let both_exact = fit_a.variance <= 0.0 && fit_b.variance <= 0.0;
    let variance_ratio = if both_exact {
        1.0
    } else {
        fit_a.variance / fit_b.variance
    };
    let variances_equal = (lower..=upper).contains(&variance_ratio);

    // Step 2: parallel curves. Both sets take the joint slope; each keeps an
    // intercept fitted to its own data under that slope.
    let rss = pooled_rss([
        (data_a.filtered.as_slice(), line(&fit_a)),
        (data_b.filtered.as_slice(), line(&fit_b)),
    ]);
    let shared_slope = Constraint::FixedSlope(joint.slope);
    let h1_a = regression::fit(&data_a, shared_slope, confidence)?;
    let h1_b = regression::fit(&data_b, shared_slope, confidence)?;
    let rss_h1 = pooled_rss([
        (data_a.filtered.as_slice(), line(&h1_a)),
        (data_b.filtered.as_slice(), line(&h1_b)),
    ]);
    let parallel_statistic = relative_increase(rss_h1, rss) * dof_total as f64;
    let parallel_critical = f_isf(significance, 1, dof_total - 1)?;
    let curves_parallel = parallel_statistic <= parallel_critical;

    // Step 3: coincident curves. Set b is held to set a's line.
    let h5_b = regression::fit(
        &data_b,
        Constraint::FixedLine {
            slope: fit_a.slope,
            log_intercept: fit_a.log_intercept,
        },
        confidence,
    )?;
    let rss_h5 = pooled_rss([
        (data_a.filtered.as_slice(), line(&fit_a)),
        (data_b.filtered.as_slice(), line(&h5_b)),
    ]);
    let coincident_statistic = relative_increase(rss_h5, rss) * dof_total as f64 / 2.0;
    let coincident_critical = f_isf(significance, 2, dof_total)?;
    let curves_coincident = coincident_statistic <= coincident_critical;

    debug!(
        variance_ratio,
        lower,
        upper,
        parallel_statistic,
        parallel_critical,
        coincident_statistic,
        coincident_critical,
        "compared data sets"
    );

    Ok(ComparisonResult {
        variances_equal,
        curves_parallel,
        curves_coincident,
        variance_ratio,
        variance_bounds: (lower, upper),
        parallel_statistic,
        parallel_critical,
        coincident_statistic,
        coincident_critical,
    })
}

/// A fitted line as `(log_intercept, slope)`.
type Line = (f64, f64);

const fn line(fit: &RegressionResult) -> Line {
    (fit.log_intercept, fit.slope)
}

fn residual_dof(fit: &RegressionResult) -> Result<usize> {
    match fit.points - fit.dof {
        0 => Err(SnError::InsufficientData {
            points: fit.points,
            dof: fit.dof,
        }),
        dof => Ok(dof),
    }
}

/// `Q` of Rausand eq. 3.32: residual sums of both sets about their lines.
fn pooled_rss(sets: [(&[Observation], Line); 2]) -> f64 {
    sets.into_iter()
        .map(|(observations, (alpha, beta))| residual_sum_of_squares(observations, alpha, beta))
        .sum()
}

/// `(hypothesis - base) / base`; an exact base fit makes any increase
/// infinite.
fn relative_increase(hypothesis: f64, base: f64) -> f64 {
    if base > 0.0 {
        (hypothesis - base) / base
    } else if hypothesis > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}
