//! TaskGauge configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main TaskGauge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Duration history tuning
    pub history: HistoryConfig,

    /// Animation clock tuning
    pub clock: ClockConfig,

    /// Demo workload defaults
    pub demo: DemoConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.history.window == 0 {
            return Err(eyre::eyre!("history.window must be at least 1"));
        }
        if self.clock.ceiling == 0 || self.clock.ceiling > 99 {
            return Err(eyre::eyre!(
                "clock.ceiling must be in 1..=99, got {}",
                self.clock.ceiling
            ));
        }
        if self.clock.min_tick_ms == 0 {
            return Err(eyre::eyre!("clock.min-tick-ms must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .taskgauge.yml
        let local_config = PathBuf::from(".taskgauge.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/taskgauge/taskgauge.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("taskgauge").join("taskgauge.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Duration history tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Observations retained per identity (oldest evicted first)
    pub window: usize,

    /// Floor for recorded durations in milliseconds
    #[serde(rename = "floor-ms")]
    pub floor_ms: u64,
}

impl HistoryConfig {
    /// Minimum duration a recorded observation can carry
    pub fn floor(&self) -> Duration {
        Duration::from_millis(self.floor_ms)
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window: 3,
            floor_ms: 100,
        }
    }
}

/// Animation clock tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Floor for the tick interval in milliseconds
    #[serde(rename = "min-tick-ms")]
    pub min_tick_ms: u64,

    /// Percentage cap while the task is still running
    pub ceiling: u8,
}

impl ClockConfig {
    /// Minimum interval between animation ticks
    pub fn min_tick(&self) -> Duration {
        Duration::from_millis(self.min_tick_ms)
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            min_tick_ms: 10,
            ceiling: 99,
        }
    }
}

/// Demo workload defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Seed estimate in seconds for identities with no history
    #[serde(rename = "seed-secs")]
    pub seed_secs: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self { seed_secs: 7.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.history.window, 3);
        assert_eq!(config.history.floor(), Duration::from_millis(100));
        assert_eq!(config.clock.min_tick(), Duration::from_millis(10));
        assert_eq!(config.clock.ceiling, 99);
        assert_eq!(config.demo.seed_secs, 7.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = "history:\n  window: 5\nclock:\n  min-tick-ms: 25\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.history.window, 5);
        assert_eq!(config.history.floor_ms, 100);
        assert_eq!(config.clock.min_tick_ms, 25);
        assert_eq!(config.clock.ceiling, 99);
    }

    #[test]
    fn test_validate_rejects_degenerate_values() {
        let mut config = Config::default();
        config.history.window = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.clock.ceiling = 100;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.clock.min_tick_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "history:\n  window: 2").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.history.window, 2);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/taskgauge.yml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
