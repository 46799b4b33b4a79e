use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the configuration file, both in the working directory and in `$HOME`
pub const CONFIG_FILE_NAME: &str = ".ansible-mcp-config.json";

/// Environment variable holding an explicit configuration file path
pub const CONFIG_ENV: &str = "MCP_ANSIBLE_CONFIG";

/// Get the home directory
pub fn home_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .context("Failed to get home directory")
        .map(|bd| bd.home_dir().to_path_buf())
}

/// Resolve the configuration file location
///
/// Precedence: `$MCP_ANSIBLE_CONFIG`, then `./.ansible-mcp-config.json` when it
/// exists, then `~/.ansible-mcp-config.json`.
pub fn config_file() -> Result<PathBuf> {
    let explicit = env::var_os(CONFIG_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    let cwd = env::current_dir().context("Failed to read current directory")?;
    resolve_config_file(explicit, &cwd, &home_dir()?)
}

/// Pure form of [`config_file`] used by tests and by `--config`.
pub fn resolve_config_file(explicit: Option<PathBuf>, cwd: &Path, home: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let local = cwd.join(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(local);
    }

    Ok(home.join(CONFIG_FILE_NAME))
}

/// Expand `~` and make a path absolute relative to the current directory.
///
/// Existing paths are canonicalized; missing ones are joined lexically.
pub fn absolute_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::tilde(raw);
    let path = PathBuf::from(expanded.as_ref());

    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }

    if path.is_absolute() {
        Ok(path)
    } else {
        let cwd = env::current_dir().context("Failed to read current directory")?;
        Ok(cwd.join(path))
    }
}
