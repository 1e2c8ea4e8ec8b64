//! Configuration system for simtop

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::sim::catalog;

/// Global application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub simulation: SimulationConfig,
    pub thresholds: ThresholdsConfig,
    pub buffers: BuffersConfig,
    pub display: DisplayConfig,
    pub advisory: AdvisoryConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("simtop").join("config.toml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Seed for the simulation RNG. Random when absent.
    pub seed: Option<u64>,
    pub tick_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            seed: None,
            tick_ms: catalog::TICK_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub max_processes: usize,
    pub target_processes: usize,
    pub total_memory_mb: f64,
    pub disk_size_gb: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_processes: catalog::MAX_PROCESSES,
            target_processes: catalog::TARGET_PROCESSES,
            total_memory_mb: catalog::TOTAL_MEMORY_MB,
            disk_size_gb: catalog::DISK_SIZE_GB,
        }
    }
}

/// Warning/critical pair for one monitored dimension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Threshold {
    pub warning: f64,
    pub critical: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Aggregate CPU percent.
    pub cpu: Threshold,
    /// Percent of physical memory in use.
    pub memory: Threshold,
    /// Percent of disk capacity in use.
    pub disk: Threshold,
    /// CPU temperature in Celsius.
    pub thermal: Threshold,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            cpu: Threshold {
                warning: 80.0,
                critical: 95.0,
            },
            memory: Threshold {
                warning: 85.0,
                critical: 95.0,
            },
            disk: Threshold {
                warning: 85.0,
                critical: 95.0,
            },
            thermal: Threshold {
                warning: 80.0,
                critical: 90.0,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuffersConfig {
    pub history: usize,
    pub alerts: usize,
    pub logs: usize,
}

impl Default for BuffersConfig {
    fn default() -> Self {
        Self {
            history: 40,
            alerts: 50,
            logs: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub theme: String,
    pub hostname: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            theme: "tokyo-night".to_string(),
            hostname: "production-server-01".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdvisoryConfig {
    pub enabled: bool,
    /// OpenAI-compatible chat completions endpoint.
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Environment variable holding the bearer token, if any.
    pub api_key_env: Option<String>,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://127.0.0.1:8080/v1/chat/completions".to_string(),
            model: "sysadmin-advisor".to_string(),
            timeout_secs: 20,
            api_key_env: Some("SIMTOP_ADVISORY_KEY".to_string()),
        }
    }
}

/// Write a default configuration file
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Configuration already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    Config::default().save(path)?;
    println!("Created {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.general.seed = Some(42);
        config.thresholds.cpu.warning = 70.0;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\ntick_ms = 500\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.general.tick_ms, 500);
        assert_eq!(loaded.simulation, SimulationConfig::default());
        assert_eq!(loaded.buffers.logs, 100);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        init_config(&path, false).unwrap();
        assert!(init_config(&path, false).is_err());
        assert!(init_config(&path, true).is_ok());
    }
}
