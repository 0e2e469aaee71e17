//! Environment Configuration Loader
//!
//! Reads `KEY=VALUE` files into the process environment so every agora
//! component sees the same settings. Lookup order:
//!
//! 1. the file named by `AGORA_ENV_FILE`
//! 2. `/etc/agora/environment`
//! 3. `.env` in the working directory
//!
//! Variables already present in the environment always win.
//!
//! ```rust
//! use agora_core::config::{load_environment, get_config_bool};
//!
//! load_environment();
//! let auto_publish = get_config_bool("AGORA_AUTO_PUBLISH", true);
//! # let _ = auto_publish;
//! ```

use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub const ENV_FILE_VAR: &str = "AGORA_ENV_FILE";

pub const ENV_FILE_PATHS: &[&str] = &["/etc/agora/environment", ".env"];

/// Load the first environment file found. Returns its path.
pub fn load_environment() -> Option<String> {
    if let Ok(custom_path) = std::env::var(ENV_FILE_VAR) {
        if let Some(path) = try_load_env_file(&custom_path) {
            return Some(path);
        }
        warn!("{} points at {} which could not be loaded", ENV_FILE_VAR, custom_path);
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded) = try_load_env_file(path) {
            return Some(loaded);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

fn try_load_env_file(path: &str) -> Option<String> {
    let path_obj = Path::new(path);
    if !path_obj.exists() {
        return None;
    }

    let content = match fs::read_to_string(path_obj) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            return None;
        }
    };

    let mut loaded = 0;
    let mut skipped = 0;
    for (key, value) in content.lines().filter_map(parse_env_line) {
        if std::env::var(&key).is_ok() {
            skipped += 1;
            continue;
        }
        debug!("Loaded: {}={}", key, redact(&key, &value));
        std::env::set_var(&key, &value);
        loaded += 1;
    }

    info!(
        "Loaded {} environment variables from {} ({} already set)",
        loaded, path, skipped
    );
    Some(path.to_string())
}

fn redact<'a>(key: &str, value: &'a str) -> &'a str {
    if key.contains("TOKEN") || key.contains("SECRET") || key.contains("KEY") {
        "***"
    } else {
        value
    }
}

/// Parse `KEY=VALUE`, `KEY="VALUE"` or `KEY='VALUE'`; comments and blanks yield None.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

pub fn get_config(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset and empty values both read as None.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

pub fn get_config_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(default)
}

pub fn get_config_int(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
