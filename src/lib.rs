//! sn-fatigue: statistical analysis of stress-life (S-N) fatigue test data.
//!
//! Loads delimited stress/cycle files with runout markers, fits the
//! Basquin model `log10 N = alpha + beta * log10 S` with free, fixed-slope or
//! fixed-line constraints, derives confidence intervals and BS540/EC3 design
//! curves, and compares two data sets for equal variance, parallelism and
//! coincidence.

pub mod compare;
pub mod engine;
pub mod error;
pub mod loader;
pub mod lookup;
pub mod regression;
pub mod report;
pub mod settings;
pub mod stats;
pub mod types;
