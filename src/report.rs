//! Text and payload rendering of fit and comparison results.
//!
//! Three outputs are produced from a [`RegressionResult`]:
//!
//! - short summaries for the terminal ([`format_analysis`],
//!   [`format_comparison`]),
//! - the plain-text analysis report ([`render_report`]),
//! - a flat, pre-formatted [`ReportPayload`] that a document template can
//!   merge field by field.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{ActiveData, ComparisonResult, RegressionResult};

/// Significant figures in terminal summaries.
pub const SUMMARY_DIGITS: usize = 6;

/// Significant figures in the report payload.
pub const PAYLOAD_DIGITS: usize = 4;

/// Decimal separator used when rendering numbers for a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalStyle {
    /// `1.5`
    #[default]
    Point,
    /// `1,5`
    Comma,
}

impl DecimalStyle {
    /// Rewrites a number rendered with a decimal point.
    pub fn apply(self, number: &str) -> String {
        match self {
            Self::Point => number.to_string(),
            Self::Comma => number.replace('.', ","),
        }
    }
}

impl FromStr for DecimalStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "point" | "." => Ok(Self::Point),
            "comma" | "," => Ok(Self::Comma),
            other => Err(format!(
                "unknown decimal style '{other}', expected 'point' or 'comma'"
            )),
        }
    }
}

impl fmt::Display for DecimalStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "point"),
            Self::Comma => write!(f, "comma"),
        }
    }
}

/// Formats `value` to `digits` significant figures the way C's `%g` does:
/// trailing zeros dropped, scientific notation outside `1e-4 <= |v| < 10^digits`.
pub fn format_significant(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let digits = digits.max(1);
    let scientific = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let limit = i32::try_from(digits).unwrap_or(i32::MAX);

    if exponent < -4 || exponent >= limit {
        format!("{}{}", trim_fraction(mantissa), exponent_suffix(exponent))
    } else {
        let decimals = usize::try_from(limit - 1 - exponent).unwrap_or(0);
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

/// `%.{precision}e` with a signed, two-digit exponent.
fn format_exponential(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let scientific = format!("{value:.precision$e}");
    match scientific.split_once('e') {
        Some((mantissa, exponent)) => {
            format!("{mantissa}{}", exponent_suffix(exponent.parse().unwrap_or(0)))
        }
        None => scientific,
    }
}

fn exponent_suffix(exponent: i32) -> String {
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("e{sign}{:02}", exponent.unsigned_abs())
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Terminal summary of one fit.
pub fn format_analysis(label: &str, result: &RegressionResult) -> Vec<String> {
    let g = |value: f64| format_significant(value, SUMMARY_DIGITS);
    vec![
        format!("Data set: {label}"),
        format!("  Points used: {} (free parameters: {})", result.points, result.dof),
        format!("  R^2: {}", g(result.r_squared)),
        format!("  Standard deviation: {}", g(result.stdev)),
        format!("  Slope: {}", g(result.slope)),
        format!("  Intercept: {}", g(result.intercept)),
        format!("  Log intercept: {}", g(result.log_intercept)),
        format!("  Delta sigma (2e6): {}", g(result.delta_sigma)),
        format!("  Design intercept (BS540): {}", g(result.bs540.intercept)),
        format!("  Design delta sigma (BS540): {}", g(result.bs540.delta_sigma)),
        format!("  Design intercept (EC3): {}", g(result.ec3.intercept)),
        format!("  Design delta sigma (EC3): {}", g(result.ec3.delta_sigma)),
    ]
}

/// Terminal summary of a comparison.
pub fn format_comparison(name_a: &str, name_b: &str, result: &ComparisonResult) -> Vec<String> {
    let answer = |flag: bool| if flag { "yes" } else { "no" };
    vec![
        format!("Comparing {name_a} with {name_b}"),
        format!("  Equal variances: {}", answer(result.variances_equal)),
        format!("  Parallel curves: {}", answer(result.curves_parallel)),
        format!("  Coincident curves: {}", answer(result.curves_coincident)),
    ]
}

fn fixed(value: f64, width: usize, precision: usize) -> String {
    format!("{value:>width$.precision$}")
}

fn percent(level: f64) -> String {
    format_significant(level * 100.0, PAYLOAD_DIGITS)
}

/// The full plain-text analysis report for one fit.
pub fn render_report(label: &str, result: &RegressionResult, data: &ActiveData) -> String {
    let b = -result.slope;
    let level = percent(result.confidence);
    let mut lines = vec![
        "Statistical Analysis of Fatigue data.".to_string(),
        String::new(),
        format!("Data set ID: \t{label}"),
        format!("             \t{}", result.header_1),
        format!("             \t{}", result.header_2),
        String::new(),
        "Estimates of Coefficients b and C in S/N-Curve N*S^b=C".to_string(),
        "Regression Model: log(N)=log(C)-b*log(S)".to_string(),
        "Input:".to_string(),
        "  Stress Range     Number of Cycles".to_string(),
    ];

    for observation in &data.full {
        let mut row = format!(
            "\t{:.0}\t\t{:.0}",
            observation.stress, observation.cycles
        );
        if observation.runout {
            row.push_str("\tRun out");
        }
        lines.push(row);
    }

    lines.extend([
        String::new(),
        "Output:".to_string(),
        String::new(),
        "Mean SN Curve.".to_string(),
        format!(
            "N*S^{}={}   log(C) = {}",
            fixed(b, 6, 2),
            format_exponential(result.intercept, 3),
            fixed(result.log_intercept, 5, 3)
        ),
        format!(
            "Stress range at 2E6 cycles :        {} MPa",
            fixed(result.delta_sigma, 5, 1)
        ),
        format!(
            "Standard Deviation Sigma from Input data: {}",
            fixed(result.stdev, 5, 3)
        ),
        format!("Mean Stress : {} MPa", fixed(result.mean_stress, 5, 1)),
        format!("Goodness of Fit  r^2 :   {}", fixed(result.r_squared, 5, 3)),
        format!("{level}% Confidence limits for the coefficients (at mean values):"),
        format!(
            "log(N):\t {level}% Confidence interval for Regression Line:     \t{}",
            fixed(result.regression_confidence, 5, 3)
        ),
        format!(
            "log(N):\t {level}% Confidence interval for given value of S:    \t{}",
            fixed(result.confidence_given_s, 5, 3)
        ),
        format!(
            "b:\t {level}% Confidence interval (for mean value of C):   \t{}",
            fixed(result.confidence_b, 5, 3)
        ),
        format!(
            "log(C):\t {level}% Confidence interval (for mean value of b):   \t{}",
            fixed(result.confidence_c, 5, 3)
        ),
        format!(
            "{} < b < {}",
            fixed(-result.s_upper, 6, 2),
            fixed(-result.s_lower, 6, 2)
        ),
        format!(
            "{} < C < {}",
            format_exponential(result.c_lower, 3),
            format_exponential(result.c_upper, 3)
        ),
        "_".repeat(52),
        "Design SN Curve:".to_string(),
        format!(
            "N*S^{}={}\t (95% Surv.,{}% conf.(BS540, NS3472))",
            fixed(b, 6, 2),
            format_exponential(result.bs540.intercept, 3),
            percent((1.0 + result.confidence) / 2.0)
        ),
        format!(
            "Stress range at 2E6 cycles for design curve: {} MPa",
            fixed(result.bs540.delta_sigma, 5, 1)
        ),
        format!(
            "N*S^{}={}\t (95% Surv.,75% conf.(EC3))",
            fixed(b, 6, 2),
            format_exponential(result.ec3.intercept, 3)
        ),
        format!(
            "Stress range at 2E6 cycles for design curve: {} MPa",
            fixed(result.ec3.delta_sigma, 5, 1)
        ),
    ]);

    let mut report = lines.join("\n");
    report.push('\n');
    report
}

/// One row of the observation table in a [`ReportPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub stress: String,
    pub cycles: String,
    pub runout: bool,
    /// `"Run out"` for runouts, empty otherwise.
    pub marker: &'static str,
}

/// Flat, pre-formatted view of a fit for document templating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPayload {
    pub header_1: String,
    pub header_2: String,
    pub points: usize,
    pub dof: usize,
    pub decimal: DecimalStyle,
    /// Every numeric result field, keyed by name.
    pub fields: BTreeMap<&'static str, String>,
    /// Input rows, echoed at full precision.
    pub rows: Vec<ReportRow>,
}

impl ReportPayload {
    pub fn new(result: &RegressionResult, data: &ActiveData, style: DecimalStyle) -> Self {
        let render = |value: f64| style.apply(&format_significant(value, PAYLOAD_DIGITS));
        let fields = result
            .numeric_fields()
            .into_iter()
            .map(|(name, value)| (name, render(value)))
            .collect();
        let rows = data
            .full
            .iter()
            .map(|o| ReportRow {
                stress: style.apply(&o.stress.to_string()),
                cycles: style.apply(&o.cycles.to_string()),
                runout: o.runout,
                marker: if o.runout { "Run out" } else { "" },
            })
            .collect();

        Self {
            header_1: result.header_1.clone(),
            header_2: result.header_2.clone(),
            points: result.points,
            dof: result.dof,
            decimal: style,
            fields,
            rows,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
