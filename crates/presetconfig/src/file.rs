use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::transition::{TransitionConfig, TransitionFamily};
use crate::ConfigError;

pub const PRESET_FILE_VERSION: u32 = 1;

/// A TOML document of user presets.
///
/// ```toml
/// version = 1
///
/// [[preset]]
/// id = "slow-fade"
/// name = "Slow fade"
/// category = "fade"
/// config = { type = "fade", fadeType = "black", duration = "2s" }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PresetFile {
    pub version: u32,
    #[serde(default, rename = "preset")]
    pub presets: Vec<PresetEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetEntry {
    pub id: String,
    pub name: String,
    pub category: TransitionFamily,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_gpu_supported")]
    pub gpu_supported: bool,
    #[serde(default = "default_rating")]
    pub performance_rating: u8,
    pub config: TransitionConfig,
}

fn default_gpu_supported() -> bool {
    true
}

fn default_rating() -> u8 {
    3
}

impl PresetEntry {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::Invalid("preset id must not be empty".into()));
        }
        if !(1..=5).contains(&self.performance_rating) {
            return Err(ConfigError::Invalid(format!(
                "preset '{}' has performanceRating {}; expected 1-5",
                self.id, self.performance_rating
            )));
        }
        if self.category != self.config.family() {
            return Err(ConfigError::Invalid(format!(
                "preset '{}' is in category '{}' but configures a '{}' transition",
                self.id,
                self.category,
                self.config.family()
            )));
        }
        self.config.validate().map_err(|err| {
            ConfigError::Invalid(format!("preset '{}': {err}", self.id))
        })
    }
}

impl PresetFile {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let file: PresetFile = toml::from_str(input)?;
        file.validate()?;
        Ok(file)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != PRESET_FILE_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported preset file version {} (expected {PRESET_FILE_VERSION})",
                self.version
            )));
        }
        let mut seen = HashSet::new();
        for entry in &self.presets {
            if !seen.insert(entry.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "preset '{}' is defined more than once",
                    entry.id
                )));
            }
            entry.validate()?;
        }
        Ok(())
    }
}
