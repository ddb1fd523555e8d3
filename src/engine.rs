//! Engine state: the two data-set slots, the merge flag and the settings
//! that steer fitting.
//!
//! The engine is the single owner of loaded data. Every mutation goes
//! through `&mut self`, so calls can never overlap on the same slots.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compare;
use crate::error::{Result, SnError};
use crate::loader::{load_dataset, LoadOptions};
use crate::regression::{self, DEFAULT_CONFIDENCE, SLOPE_EPSILON};
use crate::types::{
    ActiveData, ComparisonResult, Constraint, DataSet, Observation, RegressionResult, Slot,
};

/// Settings shared by every fit the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Confidence level for intervals and hypothesis tests.
    pub confidence: f64,
    /// Slope entered by the user. Takes priority over any requested
    /// constraint. Entered as the positive exponent `b` of `N*S^b = C` or as
    /// the negative regression slope; both mean the same line.
    pub user_slope: Option<f64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            user_slope: None,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(SnError::InvalidSetting(format!(
                "confidence level must lie strictly between 0 and 1, got {}",
                self.confidence
            )));
        }
        if let Some(slope) = self.user_slope {
            if !slope.is_finite() || slope.abs() < SLOPE_EPSILON {
                return Err(SnError::InvalidSetting(format!(
                    "user slope must be a finite, non-zero number, got {slope}"
                )));
            }
        }
        Ok(())
    }

    /// The user slope as a regression slope, which is always negative.
    pub fn regression_slope(&self) -> Option<f64> {
        self.user_slope.map(|slope| -slope.abs())
    }
}

/// Holds the loaded data and runs fits and comparisons against it.
#[derive(Debug, Default)]
pub struct Engine {
    slots: [Option<DataSet>; 2],
    merge: bool,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::default()
        })
    }

    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn set_confidence(&mut self, confidence: f64) -> Result<()> {
        let settings = EngineSettings {
            confidence,
            ..self.settings
        };
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn set_user_slope(&mut self, user_slope: Option<f64>) -> Result<()> {
        let settings = EngineSettings {
            user_slope,
            ..self.settings
        };
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// Loads a data file into `slot`. The slot keeps its previous contents
    /// if the file fails to load.
    pub fn load(&mut self, path: &Path, slot: Slot, options: &LoadOptions) -> Result<()> {
        let data = load_dataset(path, slot, options)?;
        self.insert(data);
        Ok(())
    }

    /// Places an already parsed data set in the slot it names.
    pub fn insert(&mut self, data: DataSet) {
        debug!(slot = %data.slot, rows = data.len(), "replacing slot");
        let index = data.slot.index();
        self.slots[index] = Some(data);
    }

    pub fn dataset(&self, slot: Slot) -> Option<&DataSet> {
        self.slots[slot.index()].as_ref()
    }

    pub fn set_merge(&mut self, merge: bool) {
        info!(merge, "merge mode changed");
        self.merge = merge;
    }

    pub const fn is_merged(&self) -> bool {
        self.merge
    }

    /// Data for an operation on `slot`: both slots concatenated while merge
    /// mode is on (unless `ignore_merge`), else just `slot`.
    pub fn active_data(&self, slot: Slot, ignore_merge: bool) -> Result<ActiveData> {
        if self.merge && !ignore_merge {
            return self.merged_data();
        }
        let data = self.dataset(slot).ok_or(SnError::SlotEmpty(slot))?;
        Ok(select(&[data]))
    }

    /// Both slots concatenated, slot 0 first, regardless of the merge flag.
    pub fn merged_data(&self) -> Result<ActiveData> {
        let first = self
            .dataset(Slot::First)
            .ok_or(SnError::MergePartnerEmpty(Slot::First))?;
        let second = self
            .dataset(Slot::Second)
            .ok_or(SnError::MergePartnerEmpty(Slot::Second))?;
        Ok(select(&[first, second]))
    }

    /// The constraint a fit actually runs with: a configured user slope wins
    /// over whatever the caller asked for.
    pub fn resolve_constraint(&self, requested: Constraint) -> Constraint {
        self.settings
            .regression_slope()
            .map_or(requested, Constraint::FixedSlope)
    }

    /// Fits the active data for `slot`.
    pub fn fit(&self, slot: Slot, constraint: Constraint) -> Result<RegressionResult> {
        let data = self.active_data(slot, false)?;
        let constraint = self.resolve_constraint(constraint);
        debug!(slot = %slot, merged = self.merge, ?constraint, "fitting");
        regression::fit(&data, constraint, self.settings.confidence)
    }

    /// Runs the three-part comparison of two slots.
    pub fn compare(&self, slot_a: Slot, slot_b: Slot) -> Result<ComparisonResult> {
        compare::compare(self, slot_a, slot_b)
    }
}

fn select(sets: &[&DataSet]) -> ActiveData {
    let full: Vec<Observation> = sets
        .iter()
        .flat_map(|d| d.observations.iter().copied())
        .collect();
    let filtered = full.iter().copied().filter(|o| !o.runout).collect();
    let runout_mask = full.iter().map(|o| o.runout).collect();
    let headers = sets.first();
    ActiveData {
        filtered,
        full,
        runout_mask,
        header_1: headers.map_or_else(String::new, |d| d.header(0).to_string()),
        header_2: headers.map_or_else(String::new, |d| d.header(1).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn dataset(slot: Slot, rows: &[(f64, f64, bool)]) -> DataSet {
        DataSet::new(
            slot,
            vec![format!("set {slot}"), "second line".to_string()],
            rows.iter()
                .map(|&(stress, cycles, runout)| Observation {
                    stress,
                    cycles,
                    runout,
                })
                .collect(),
        )
    }

    #[test]
    fn test_load_roundtrip_preserves_order() {
        let file = write_file("h1\nh2\n150,400000\n300,90000\n*95,6000000\n210,210000\n");
        let mut engine = Engine::default();
        engine
            .load(file.path(), Slot::First, &LoadOptions::default())
            .unwrap();

        let data = engine.active_data(Slot::First, true).unwrap();
        let values: Vec<(f64, f64)> = data.full.iter().map(|o| (o.stress, o.cycles)).collect();
        assert_eq!(
            values,
            vec![
                (150.0, 400_000.0),
                (300.0, 90_000.0),
                (95.0, 6_000_000.0),
                (210.0, 210_000.0)
            ]
        );
        assert_eq!(data.runout_mask, vec![false, false, true, false]);
        assert_eq!(data.filtered.len(), 3);
        assert_eq!(data.header_1, "h1");
    }

    #[test]
    fn test_failed_load_leaves_slot_untouched() {
        let good = write_file("h1\nh2\n150,400000\n300,90000\n");
        let bad = write_file("h1\nh2\n150,400000\n-95,6000000\n");
        let mut engine = Engine::default();
        engine
            .load(good.path(), Slot::First, &LoadOptions::default())
            .unwrap();
        let before = engine.dataset(Slot::First).cloned();

        let err = engine
            .load(bad.path(), Slot::First, &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, SnError::NegativeValue { .. }));
        assert_eq!(engine.dataset(Slot::First).cloned(), before);
    }

    #[test]
    fn test_merge_concatenates_in_slot_order() {
        let mut engine = Engine::default();
        engine.insert(dataset(
            Slot::First,
            &[(200.0, 1e5, false), (150.0, 4e5, true), (100.0, 2e6, false)],
        ));
        engine.insert(dataset(Slot::Second, &[(180.0, 2e5, false), (90.0, 8e6, true)]));
        engine.set_merge(true);

        let data = engine.active_data(Slot::Second, false).unwrap();
        assert_eq!(data.full.len(), 5);
        let stresses: Vec<f64> = data.full.iter().map(|o| o.stress).collect();
        assert_eq!(stresses, vec![200.0, 150.0, 100.0, 180.0, 90.0]);
        assert_eq!(data.runout_mask, vec![false, true, false, false, true]);
        assert_eq!(data.filtered.len(), 3);
        assert_eq!(data.header_1, "set 0");

        // ignore_merge still yields the single slot.
        let single = engine.active_data(Slot::Second, true).unwrap();
        assert_eq!(single.full.len(), 2);
    }

    #[test]
    fn test_merge_with_empty_partner_fails() {
        let mut engine = Engine::default();
        engine.insert(dataset(Slot::First, &[(200.0, 1e5, false)]));
        engine.set_merge(true);
        assert!(matches!(
            engine.active_data(Slot::First, false),
            Err(SnError::MergePartnerEmpty(Slot::Second))
        ));
    }

    #[test]
    fn test_fit_on_empty_slot_fails() {
        let engine = Engine::default();
        let err = engine.fit(Slot::Second, Constraint::Free).unwrap_err();
        assert!(matches!(err, SnError::SlotEmpty(Slot::Second)));
        assert_eq!(
            err.to_string(),
            "A dataset matching id '1' has not yet been loaded"
        );
    }

    #[test]
    fn test_user_slope_takes_priority() {
        let mut engine = Engine::default();
        engine.insert(dataset(
            Slot::First,
            &[(250.0, 2e5, false), (200.0, 4.1e5, false), (150.0, 1.1e6, false)],
        ));
        engine.set_user_slope(Some(3.0)).unwrap();

        let result = engine.fit(Slot::First, Constraint::Free).unwrap();
        assert_eq!(result.dof, 1);
        assert!((result.slope + 3.0).abs() < f64::EPSILON);

        let line = Constraint::FixedLine {
            slope: -4.0,
            log_intercept: 15.0,
        };
        assert_eq!(
            engine.resolve_constraint(line),
            Constraint::FixedSlope(-3.0)
        );

        engine.set_user_slope(None).unwrap();
        assert_eq!(engine.fit(Slot::First, Constraint::Free).unwrap().dof, 2);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut engine = Engine::default();
        assert!(engine.set_confidence(1.5).is_err());
        assert!(engine.set_user_slope(Some(0.0)).is_err());
        assert!(engine.set_user_slope(Some(f64::NAN)).is_err());
        assert!((engine.settings().confidence - 0.95).abs() < f64::EPSILON);
        assert!(Engine::new(EngineSettings {
            confidence: 0.0,
            user_slope: None
        })
        .is_err());
    }

    #[test]
    fn test_end_to_end_five_rows_with_runout() {
        let file = write_file(
            "Specimen series A\nR = 0.1, constant amplitude\n\
             250,210000\n200,450000\n160,980000\n*110,10000000\n130,2100000\n",
        );
        let mut engine = Engine::default();
        engine
            .load(file.path(), Slot::First, &LoadOptions::default())
            .unwrap();

        let full = engine.active_data(Slot::First, true).unwrap();
        assert_eq!(full.full.len(), 5);
        assert_eq!(full.runout_mask, vec![false, false, false, true, false]);

        let result = engine.fit(Slot::First, Constraint::Free).unwrap();
        assert_eq!(result.dof, 2);
        // The runout row is excluded from the fit.
        assert_eq!(result.points, 4);
        assert!(result.slope < 0.0);
        assert!(result.r_squared > 0.9 && result.r_squared <= 1.0);
        assert!(result.variance > 0.0);
        assert_eq!(result.header_1, "Specimen series A");
        assert_eq!(result.header_2, "R = 0.1, constant amplitude");
        assert_eq!(result.numeric_fields().len(), 24);
        for (name, value) in result.numeric_fields() {
            assert!(value.is_finite(), "{name} is not finite");
        }
    }
}
