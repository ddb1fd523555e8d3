//! YAML configuration for the command-line front end.

use serde::{Deserialize, Serialize};

use crate::engine::EngineSettings;
use crate::loader::LoadOptions;
use crate::regression::DEFAULT_CONFIDENCE;
use crate::report::DecimalStyle;

/// Settings file contents. Every key is optional.
///
/// ```yaml
/// loader:
///   delimiter: ";"
///   runout_marker: "^"
///   header_lines: 2
/// confidence: 0.9
/// slope: 3.0
/// decimal: comma
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub loader: LoadOptions,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Fixed slope applied to every analysis.
    #[serde(default)]
    pub slope: Option<f64>,
    #[serde(default)]
    pub decimal: DecimalStyle,
}

const fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            loader: LoadOptions::default(),
            confidence: default_confidence(),
            slope: None,
            decimal: DecimalStyle::default(),
        }
    }
}

impl Settings {
    pub const fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            confidence: self.confidence,
            user_slope: self.slope,
        }
    }
}

/// Parses a settings file.
pub fn load_settings(content: &str) -> anyhow::Result<Settings> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings = serde_yaml_ng::from_str(content)?;
    settings.engine_settings().validate()?;
    settings.loader.validate()?;
    Ok(settings)
}
