use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default data directory: ~/.depexec
pub fn get_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".depexec"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: $DEPEXEC_CONFIG
    let explicit = std::env::var("DEPEXEC_CONFIG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);

    // Priority 2: ~/.depexec/config.toml
    let data_dir = get_data_dir()?;
    let home_config = data_dir.join("config.toml");

    // Priority 3: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg = if let Some(path) = explicit {
        load_from_path(&path)?
    } else if home_config.exists() {
        load_from_path(&home_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    if cfg.agent.log_path.trim().is_empty() {
        cfg.agent.log_path = data_dir.join("logs").to_string_lossy().to_string();
    }

    apply_env_overrides(&mut cfg);
    cfg.validate().map_err(|e| anyhow::anyhow!(e))?;

    std::fs::create_dir_all(cfg.depend_log_dir())?;

    Ok(cfg)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read config {} failed: {}", path.display(), e))?;
    let cfg = toml::from_str::<AppConfig>(&s)?;
    Ok(cfg)
}

fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("DEPEXEC_ADMIN_ADDR") {
        if !v.trim().is_empty() {
            cfg.agent.admin_addr = v;
        }
    }
    if let Ok(v) = std::env::var("DEPEXEC_LOG_PATH") {
        if !v.trim().is_empty() {
            cfg.agent.log_path = v;
        }
    }
    if let Ok(v) = std::env::var("DEPEXEC_LOCAL_ADDR") {
        if !v.trim().is_empty() {
            cfg.agent.local_addr = v;
        }
    }
}
