//! Aura runtime configuration loader.

use std::path::Path;

use aura_core::AuraConfig;
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Top-level TOML document; tunables live under `[aura]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    aura: AuraConfig,
}

/// Loader for aura configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file.
    ///
    /// Keys missing from the `[aura]` table keep their defaults.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML file
    ///
    /// # Returns
    ///
    /// Returns an AuraConfig.
    pub fn load(path: &Path) -> LoadResult<AuraConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<AuraConfig> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        let config = file.aura;

        if config.update_target_map_interval <= 0 {
            anyhow::bail!("aura.update_target_map_interval must be positive");
        }
        if config.proc_attempt_window <= 0.0 || config.proc_success_window <= 0.0 {
            anyhow::bail!("aura proc windows must be positive");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_keep_defaults() {
        let config = ConfigLoader::parse("[aura]\ncharge_drop_delay = 120\n").expect("config");
        assert_eq!(config.charge_drop_delay, 120);
        assert_eq!(
            config.update_target_map_interval,
            AuraConfig::DEFAULT_UPDATE_TARGET_MAP_INTERVAL
        );
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(ConfigLoader::parse("").expect("config"), AuraConfig::default());
    }

    #[test]
    fn rejects_zero_interval() {
        assert!(ConfigLoader::parse("[aura]\nupdate_target_map_interval = 0\n").is_err());
    }
}
