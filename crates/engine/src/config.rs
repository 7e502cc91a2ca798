//! Engine configuration, loadable from TOML.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embed::EmbeddingConfig;
use crate::forest::TrainingConfig;
use crate::fuzzy::MatcherConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// All engine knobs in one place. Every field has a production default, so
/// a partial TOML file only overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub matcher: MatcherConfig,
    pub training: TrainingConfig,
    pub embedding: EmbeddingConfig,
    /// Category label whose predictions flag a cash withdrawal.
    pub cash_category: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            matcher: MatcherConfig::default(),
            training: TrainingConfig::default(),
            embedding: EmbeddingConfig::default(),
            cash_category: "banque".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
