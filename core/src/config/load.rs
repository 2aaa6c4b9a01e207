use std::path::{Path, PathBuf};

use super::types::{AppConfig, ErrorStrategy};

/// Get the conductor data directory: `$CONDUCTOR_HOME` or ~/.conductor
pub fn get_conductor_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var("CONDUCTOR_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".conductor"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: <data dir>/config.toml
    let home_config = get_conductor_data_dir()?.join("config.toml");

    // Priority 2: ./conductor.toml (current directory)
    let local_config = Path::new("conductor.toml");

    let cfg = if home_config.exists() {
        read_config(&home_config)?
    } else if local_config.exists() {
        read_config(local_config)?
    } else {
        AppConfig::default()
    };

    apply_env_overrides(cfg)
}

/// Load an explicit config file; lookup order is bypassed.
pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    apply_env_overrides(read_config(path)?)
}

fn read_config(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read config {} failed: {e}", path.display()))?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("parse config {} failed: {e}", path.display()))?;
    Ok(cfg)
}

// Environment variable overrides (Priority 0: highest)
fn apply_env_overrides(mut cfg: AppConfig) -> anyhow::Result<AppConfig> {
    if let Ok(v) = std::env::var("CONDUCTOR_ERROR_STRATEGY") {
        if !v.trim().is_empty() {
            cfg.run.error_handling.strategy =
                v.parse::<ErrorStrategy>().map_err(anyhow::Error::msg)?;
        }
    }
    if let Ok(v) = std::env::var("CONDUCTOR_MAX_RETRIES") {
        if !v.trim().is_empty() {
            cfg.run.error_handling.max_retries = v
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid CONDUCTOR_MAX_RETRIES '{v}': {e}"))?;
        }
    }
    if let Ok(v) = std::env::var("CONDUCTOR_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.logging.level = v;
        }
    }
    Ok(cfg)
}
