//! Configuration for the debugger and the emulated system

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Physical targets of the hard-wired ST0/ST1/ST2 VDC port writes
pub const DEFAULT_STATUS_PORT_WRITES: [u32; 3] = [0x1FE000, 0x1FE002, 0x1FE003];

/// Default number of branch trace slots
pub const DEFAULT_BRANCH_TRACE_CAPACITY: usize = 64;

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

/// Debugger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Log verbosity
    pub log_level: LogLevel,
    /// Mirror log output into `log_path`
    pub log_to_file: bool,
    /// Log file location
    pub log_path: PathBuf,
    /// Number of slots in the branch trace ring
    pub branch_trace_capacity: usize,
    /// Forward calls into the CD system card BIOS to the log sink
    pub bios_logging: bool,
    /// Physical addresses of hard-wired status-port writes that logical-mode
    /// write breakpoints skip
    pub logical_write_exclusions: Vec<u32>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_to_file: false,
            log_path: PathBuf::from("huprobe.log"),
            branch_trace_capacity: DEFAULT_BRANCH_TRACE_CAPACITY,
            bios_logging: false,
            logical_write_exclusions: DEFAULT_STATUS_PORT_WRITES.to_vec(),
        }
    }
}

/// Emulated system configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// CD-ROM system card present (enables BIOS call forwarding)
    pub cd_system: bool,
    /// SuperGrafx: two VDCs behind the video priority controller
    pub supergrafx: bool,
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: DebugConfig,
    pub system: SystemConfig,
}

impl Config {
    /// Default configuration file location
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("huprobe").join("config.toml"))
            .ok_or_else(|| Error::Config("no configuration directory on this platform".to_string()))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load configuration from a TOML file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&text)?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject values the debugger cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.debug.branch_trace_capacity == 0 {
            return Err(Error::Config("branch_trace_capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.debug.branch_trace_capacity, 64);
        assert_eq!(config.debug.logical_write_exclusions, vec![0x1FE000, 0x1FE002, 0x1FE003]);
        assert!(!config.debug.bios_logging);
        assert!(!config.system.cd_system);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [debug]
            log_level = "trace"
            branch_trace_capacity = 16

            [system]
            cd_system = true
            "#,
        )
        .unwrap();

        assert_eq!(config.debug.log_level, LogLevel::Trace);
        assert_eq!(config.debug.branch_trace_capacity, 16);
        assert_eq!(config.debug.logical_write_exclusions.len(), 3);
        assert!(config.system.cd_system);
        assert!(!config.system.supergrafx);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.debug.logical_write_exclusions.clear();
        config.system.supergrafx = true;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = Config::default();
        config.debug.branch_trace_capacity = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
