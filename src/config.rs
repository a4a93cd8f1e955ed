//! Configuration system for the MIDI-to-riff importer

use crate::error::{Result, RiffError};
use crate::pattern::DEFAULT_STEPS_PER_LOOP;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid: GridConfig,
    pub filter: FilterConfig,
    pub quantize: QuantizeConfig,
    pub resolve: ResolveConfig,
    pub pattern: PatternConfig,
}

/// Step grid configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub steps_per_bar: u32,
    pub beats_per_bar: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            steps_per_bar: DEFAULT_STEPS_PER_LOOP,
            beats_per_bar: 4,
        }
    }
}

impl GridConfig {
    /// Steps in one quarter-note beat. Only meaningful after validation.
    pub fn steps_per_beat(&self) -> u32 {
        self.steps_per_bar / self.beats_per_bar
    }
}

/// Channel selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// `None` accepts every channel
    pub channel: Option<u8>,
}

impl FilterConfig {
    pub fn accepts(&self, channel: u8) -> bool {
        self.channel.map_or(true, |c| c == channel)
    }
}

/// What to do with steps that fall outside the bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Pin into `[0, steps_per_bar - 1]`; onsets belonging to the next bar are dropped
    Clamp,
    /// Reduce modulo `steps_per_bar`
    Wrap,
}

/// Quantizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizeConfig {
    pub boundary_policy: BoundaryPolicy,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            boundary_policy: BoundaryPolicy::Clamp,
        }
    }
}

/// Collision resolver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    pub clamp_duration_to_next_onset: bool,
    pub dedupe_same_step_same_pitch: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            clamp_duration_to_next_onset: true,
            dedupe_same_step_same_pitch: true,
        }
    }
}

/// Header fields carried into the output pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub root_pitch: u8,
    pub pattern_id: String,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            root_pitch: 60,
            pattern_id: "riff".to_string(),
        }
    }
}

/// Validate configuration parameters
pub fn validate_config(config: &Config) -> Result<()> {
    let grid = &config.grid;
    if grid.steps_per_bar == 0 {
        return Err(RiffError::InvalidConfigParameter(
            "steps_per_bar must be > 0".to_string(),
        ));
    }
    if grid.beats_per_bar == 0 {
        return Err(RiffError::InvalidConfigParameter(
            "beats_per_bar must be > 0".to_string(),
        ));
    }
    if grid.steps_per_bar % grid.beats_per_bar != 0 {
        return Err(RiffError::StepsNotDivisible {
            steps_per_bar: grid.steps_per_bar,
            beats_per_bar: grid.beats_per_bar,
        });
    }

    if let Some(channel) = config.filter.channel {
        if channel > 15 {
            return Err(RiffError::InvalidConfigParameter(format!(
                "channel {} out of range 0..=15",
                channel
            )));
        }
    }

    if config.pattern.root_pitch > 127 {
        return Err(RiffError::InvalidConfigParameter(format!(
            "root_pitch {} out of range 0..=127",
            config.pattern.root_pitch
        )));
    }
    if config.pattern.pattern_id.trim().is_empty() {
        return Err(RiffError::InvalidConfigParameter(
            "pattern_id must not be empty".to_string(),
        ));
    }

    Ok(())
}

/// Load configuration from JSON file
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Save configuration to JSON file
pub fn save_config<P: AsRef<std::path::Path>>(config: &Config, path: P) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
