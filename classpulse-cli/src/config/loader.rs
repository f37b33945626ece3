use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::types::ClasspulseConfig;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "classpulse.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<ClasspulseConfig> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(ClasspulseConfig::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    fn parse(contents: &str) -> Result<ClasspulseConfig> {
        Ok(toml::from_str(contents)?)
    }
}
