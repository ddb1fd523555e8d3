//! Common types for sn-fatigue.
//!
//! Defines observations, data sets, fit constraints and the fixed-schema
//! result records produced by regression and comparison.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnError};

/// One of the two data-set slots held by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// Slot 0.
    First,
    /// Slot 1.
    Second,
}

impl Slot {
    /// Both slots in load order.
    pub const ALL: [Self; 2] = [Self::First, Self::Second];

    /// Zero-based slot index.
    pub const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    /// The partner slot.
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

impl TryFrom<usize> for Slot {
    type Error = SnError;

    fn try_from(value: usize) -> Result<Self> {
        match value {
            0 => Ok(Self::First),
            1 => Ok(Self::Second),
            other => Err(SnError::InvalidSetting(format!(
                "dataset id must be 0 or 1, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// A single fatigue test: stress range, cycles reached, and whether the
/// specimen ran out without failing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Stress range, in MPa.
    pub stress: f64,
    /// Cycles reached at failure or at the end of the test.
    pub cycles: f64,
    /// Set when the specimen ran out; runouts are excluded from fits.
    pub runout: bool,
}

impl Observation {
    /// A specimen that failed at `cycles`.
    pub const fn failure(stress: f64, cycles: f64) -> Self {
        Self {
            stress,
            cycles,
            runout: false,
        }
    }

    /// A specimen that survived `cycles` without failing.
    pub const fn runout(stress: f64, cycles: f64) -> Self {
        Self {
            stress,
            cycles,
            runout: true,
        }
    }

    /// `log10` of the stress range (the regressor).
    #[inline]
    pub fn log_stress(&self) -> f64 {
        self.stress.log10()
    }

    /// `log10` of the cycle count (the response).
    #[inline]
    pub fn log_cycles(&self) -> f64 {
        self.cycles.log10()
    }
}

/// A loaded data file. Replaced wholesale on reload, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSet {
    /// Slot the data set was loaded into.
    pub slot: Slot,
    /// Header lines as they appeared in the file, without line terminators.
    pub headers: Vec<String>,
    /// Rows in file order, runouts included.
    pub observations: Vec<Observation>,
    /// File the data came from, if any.
    pub source: Option<PathBuf>,
}

impl DataSet {
    /// A data set built in memory, with no source file.
    pub fn new(slot: Slot, headers: Vec<String>, observations: Vec<Observation>) -> Self {
        Self {
            slot,
            headers,
            observations,
            source: None,
        }
    }

    /// Header line `index`, or an empty string when the file had fewer.
    pub fn header(&self, index: usize) -> &str {
        self.headers.get(index).map_or("", String::as_str)
    }

    /// Number of rows, runouts included.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the data set has no rows.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// `true` at each runout row.
    pub fn runout_mask(&self) -> Vec<bool> {
        self.observations.iter().map(|o| o.runout).collect()
    }

    /// Short label for summaries: the file name, else the first header line.
    pub fn label(&self) -> String {
        self.source
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.header(0).to_string())
    }
}

/// Data selected for one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveData {
    /// Non-runout rows, in load order.
    pub filtered: Vec<Observation>,
    /// All rows, in load order.
    pub full: Vec<Observation>,
    /// `true` where the matching row of `full` is a runout.
    pub runout_mask: Vec<bool>,
    /// First header line of the (first) data set.
    pub header_1: String,
    /// Second header line of the (first) data set.
    pub header_2: String,
}

/// How the regression line is constrained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// Slope and intercept both estimated.
    Free,
    /// Slope held, intercept estimated.
    FixedSlope(f64),
    /// Nothing estimated; residuals are evaluated against this line.
    FixedLine { slope: f64, log_intercept: f64 },
}

impl Constraint {
    /// Number of free parameters.
    pub const fn dof(&self) -> usize {
        match self {
            Self::Free => 2,
            Self::FixedSlope(_) => 1,
            Self::FixedLine { .. } => 0,
        }
    }
}

/// A design curve: mean curve shifted down by a standards-defined margin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DesignCurve {
    /// Delogarithmized intercept of the design curve.
    pub intercept: f64,
    /// Stress range on the design curve at 2e6 cycles.
    pub delta_sigma: f64,
}

/// Outcome of one regression call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionResult {
    /// Fitted or fixed slope (beta).
    pub slope: f64,
    /// `10^alpha`.
    pub intercept: f64,
    /// alpha.
    pub log_intercept: f64,
    /// Non-runout points used in the fit.
    pub points: usize,
    /// Free parameters: 0, 1 or 2.
    pub dof: usize,
    /// Confidence level the interval quantities were computed at.
    pub confidence: f64,
    /// Residual variance, `RSS / (n - dof)`.
    pub variance: f64,
    /// Square root of `variance`.
    pub stdev: f64,
    /// `1 - RSS / TSS`; negative when a fixed line fits worse than the mean.
    pub r_squared: f64,
    /// Correlation-like value, floored at zero before the square root.
    pub r: f64,
    /// Stress range at the reference life of 2e6 cycles.
    pub delta_sigma: f64,
    /// Half-width of the slope interval.
    pub slope_ci: f64,
    /// Half-width of the intercept interval, in log10 space.
    pub intercept_ci: f64,
    /// `10^mean(log S)`, in MPa.
    pub mean_stress: f64,
    /// Width of the log N interval for the regression line.
    pub regression_confidence: f64,
    /// Width of the log N interval for a single new test at a given stress.
    pub confidence_given_s: f64,
    /// Width of the slope interval; zero unless the slope is free.
    pub confidence_b: f64,
    /// Width of the log10 intercept interval.
    pub confidence_c: f64,
    /// Lower slope bound, `slope - confidence_b / 2`.
    pub s_lower: f64,
    /// Upper slope bound, `slope + confidence_b / 2`.
    pub s_upper: f64,
    /// Lower intercept bound, `10^(alpha - confidence_c / 2)`.
    pub c_lower: f64,
    /// Upper intercept bound, `10^(alpha + confidence_c / 2)`.
    pub c_upper: f64,
    /// 95% survival, 97.5% confidence (BS540, NS3472).
    pub bs540: DesignCurve,
    /// 95% survival, 75% confidence (EC3).
    pub ec3: DesignCurve,
    /// First header line of the fitted data.
    pub header_1: String,
    /// Second header line of the fitted data.
    pub header_2: String,
}

impl RegressionResult {
    /// Every floating-point field by name, in report order.
    pub fn numeric_fields(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("r_squared", self.r_squared),
            ("stdev", self.stdev),
            ("slope", self.slope),
            ("intercept", self.intercept),
            ("log_intercept", self.log_intercept),
            ("delta_sigma", self.delta_sigma),
            ("variance", self.variance),
            ("r", self.r),
            ("confidence", self.confidence),
            ("slope_ci", self.slope_ci),
            ("intercept_ci", self.intercept_ci),
            ("mean_stress", self.mean_stress),
            ("regression_confidence", self.regression_confidence),
            ("confidence_given_s", self.confidence_given_s),
            ("confidence_b", self.confidence_b),
            ("confidence_c", self.confidence_c),
            ("s_lower", self.s_lower),
            ("s_upper", self.s_upper),
            ("c_lower", self.c_lower),
            ("c_upper", self.c_upper),
            ("d_intercept_bs540", self.bs540.intercept),
            ("d_delta2e6_bs540", self.bs540.delta_sigma),
            ("d_intercept_ec3", self.ec3.intercept),
            ("d_delta2e6_ec3", self.ec3.delta_sigma),
        ]
    }

    /// Fails on the first NaN or infinite field.
    pub fn ensure_finite(&self) -> Result<()> {
        match self
            .numeric_fields()
            .into_iter()
            .find(|(_, value)| !value.is_finite())
        {
            Some((name, _)) => Err(SnError::NonFinite(name)),
            None => Ok(()),
        }
    }
}

/// Outcome of the three-part comparison of two data sets.
///
/// Each flag is `true` when the data sets are statistically
/// indistinguishable in that respect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// Residual variances agree under a two-sided F test.
    pub variances_equal: bool,
    /// A common slope explains both sets.
    pub curves_parallel: bool,
    /// Set a's line explains set b.
    pub curves_coincident: bool,
    /// `var_a / var_b`.
    pub variance_ratio: f64,
    /// Acceptance region for the variance ratio.
    pub variance_bounds: (f64, f64),
    /// F statistic of the common-slope hypothesis.
    pub parallel_statistic: f64,
    /// Critical value for `parallel_statistic`.
    pub parallel_critical: f64,
    /// F statistic of the common-line hypothesis.
    pub coincident_statistic: f64,
    /// Critical value for `coincident_statistic`.
    pub coincident_critical: f64,
}

impl ComparisonResult {
    /// Whether all three tests accept, i.e. the sets may be merged.
    pub const fn mergeable(&self) -> bool {
        self.variances_equal && self.curves_parallel && self.curves_coincident
    }
}
