//! Initialize the configuration directory: create ~/.onceover, a template config, and the auth directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config;

static DEFAULT_CONFIG: &str = r#"{
  "timezone": "UTC",
  "groupDumper": ""
}
"#;

/// Ensure the configuration directory has been initialized (config file exists).
pub fn require_initialized(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        anyhow::bail!(
            "configuration not initialized; run `onceover init` first (config file not found: {})",
            config_path.display()
        );
    }
    Ok(())
}

/// Create the config directory and default files if they do not exist.
/// - Creates the config directory (parent of config file path).
/// - Writes a template `config.json` if missing; `groupDumper` is left blank and must be filled in.
/// - Creates the credential directory.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        std::fs::write(config_path, DEFAULT_CONFIG)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    let (cfg, _) = config::load_config(Some(config_path.to_path_buf()))?;
    let auth_dir = config::resolve_auth_dir(&cfg, config_path);
    if !auth_dir.exists() {
        std::fs::create_dir_all(&auth_dir)
            .with_context(|| format!("creating auth directory {}", auth_dir.display()))?;
        log::info!("created auth directory at {}", auth_dir.display());
    } else {
        log::debug!("auth directory already exists at {}, skipping", auth_dir.display());
    }

    Ok(config_dir.to_path_buf())
}
