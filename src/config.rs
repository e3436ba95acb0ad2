//! Binary configuration
//!
//! One TOML file with a `[world]` table for the simulation rules and a
//! `[purgatory]` table for the soul layer. Missing files and missing keys
//! fall back to defaults.

use mudlark_events::WorldConfig;
use mudlark_souls::PurgatoryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MudlarkConfig {
    pub world: WorldConfig,
    pub purgatory: PurgatoryConfig,
}

impl MudlarkConfig {
    /// Load from `path`, or use defaults when it is missing or malformed.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded config");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file, using defaults");
                Self::default()
            }
        }
    }

    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_a_toml_round_trip() {
        let config = MudlarkConfig::default();
        let parsed: MudlarkConfig = toml::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let parsed: MudlarkConfig = toml::from_str("[world]\nseed = 42\n").unwrap();
        assert_eq!(parsed.world.seed, 42);
        assert_eq!(parsed.world.shout_range, WorldConfig::default().shout_range);
        assert_eq!(parsed.purgatory, PurgatoryConfig::default());
    }
}
