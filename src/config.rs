use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{WeaveError, WeaveResult};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
}

/// How lemmas chosen in one regeneration pass are evaluated.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    /// Activate the whole pass, then re-evaluate once.
    #[default]
    Together,
    /// Re-evaluate after every single activation.
    OneAtATime,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Source-lemma budget (sum of SimSL sizes) that closes a block.
    pub block_size_lemmas: usize,
    pub target_ratio: f64,
    /// Below this many Active-or-Known lemmas the diglot level replaces weaving.
    pub low_vocabulary_cutoff: usize,
    pub baseline_threshold: u32,
    pub consolidation_window: u32,
    /// Frequency share above which a lemma gets an adaptive threshold.
    pub high_frequency_cutoff: f64,
    pub max_regen_attempts: u32,
    pub max_lemmas_per_pass: usize,
    pub activation_mode: ActivationMode,
    /// Consecutive saturated batches before a saturation notice.
    pub saturation_window: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            block_size_lemmas: 400,
            target_ratio: 0.98,
            low_vocabulary_cutoff: 50,
            baseline_threshold: 20,
            consolidation_window: 10_000,
            high_frequency_cutoff: 0.005,
            max_regen_attempts: 25,
            max_lemmas_per_pass: 3,
            activation_mode: ActivationMode::Together,
            saturation_window: 5,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> WeaveResult<()> {
        let fail = |msg: String| Err(WeaveError::Configuration(msg));

        if !(0.0..=1.0).contains(&self.target_ratio) || self.target_ratio.is_nan() {
            return fail(format!(
                "target_ratio must be within [0, 1], got {}",
                self.target_ratio
            ));
        }
        if !(self.high_frequency_cutoff > 0.0 && self.high_frequency_cutoff <= 1.0) {
            return fail(format!(
                "high_frequency_cutoff must be within (0, 1], got {}",
                self.high_frequency_cutoff
            ));
        }
        if self.block_size_lemmas == 0 {
            return fail("block_size_lemmas must be positive".to_string());
        }
        if self.baseline_threshold == 0 {
            return fail("baseline_threshold must be at least 1".to_string());
        }
        if self.consolidation_window == 0 {
            return fail("consolidation_window must be positive".to_string());
        }
        if self.max_lemmas_per_pass == 0 {
            return fail("max_lemmas_per_pass must be positive".to_string());
        }
        if self.saturation_window == 0 {
            return fail("saturation_window must be positive".to_string());
        }
        Ok(())
    }
}

pub fn load_config_from_file(file_path: &Path) -> WeaveResult<Config> {
    let contents = fs::read_to_string(file_path).map_err(|e| WeaveError::io(file_path, e))?;
    let config = toml::from_str::<Config>(&contents).map_err(|e| WeaveError::Toml {
        path: file_path.to_path_buf(),
        source: e,
    })?;
    config.engine.validate()?;
    Ok(config)
}
