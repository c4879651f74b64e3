//! JSON config file adapter.
//!
//! Implements [`ConfigPort`] over a single JSON file.  Missing fields fall
//! back to their defaults; present fields are range-checked by
//! [`validate_config`] on both load and save.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;

/// Config file at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Validate config values are within safe operating ranges.
pub fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    let lines = [
        cfg.power_switch_gpio,
        cfg.reboot_switch_gpio,
        cfg.power_status_gpio,
        cfg.buzzer_gpio,
    ];
    for (i, a) in lines.iter().enumerate() {
        if lines[i + 1..].contains(a) {
            return Err(ConfigError::ValidationFailed(
                "GPIO lines must be pairwise distinct",
            ));
        }
    }
    if !(1..=1000).contains(&cfg.status_poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "status_poll_interval_ms must be 1–1000",
        ));
    }
    if !(100..=10_000).contains(&cfg.power_on_hold_ms) {
        return Err(ConfigError::ValidationFailed(
            "power_on_hold_ms must be 100–10000",
        ));
    }
    if !(100..=10_000).contains(&cfg.power_off_hold_ms) {
        return Err(ConfigError::ValidationFailed(
            "power_off_hold_ms must be 100–10000",
        ));
    }
    if !(100..=10_000).contains(&cfg.reboot_hold_ms) {
        return Err(ConfigError::ValidationFailed(
            "reboot_hold_ms must be 100–10000",
        ));
    }
    if cfg.power_off_hold_ms <= cfg.power_on_hold_ms {
        return Err(ConfigError::ValidationFailed(
            "power_off_hold_ms must be > power_on_hold_ms",
        ));
    }
    if cfg.status_file.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed("status_file must not be empty"));
    }
    if cfg.gpio_root.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed("gpio_root must not be empty"));
    }
    Ok(())
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let text = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound,
            _ => ConfigError::IoError,
        })?;
        let cfg: SystemConfig = serde_json::from_str(&text).map_err(|_| ConfigError::Corrupted)?;
        validate_config(&cfg)?;
        info!("JsonConfigFile: loaded config from {}", self.path.display());
        Ok(cfg)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let json = serde_json::to_string_pretty(config).map_err(|_| ConfigError::IoError)?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|_| {
            let _ = fs::remove_file(&tmp);
            ConfigError::IoError
        })?;
        info!("JsonConfigFile: config saved to {}", self.path.display());
        Ok(())
    }
}
