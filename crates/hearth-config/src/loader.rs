//! Config file discovery and layered loading.
//!
//! `Config::load()`:
//! 1. Parse the embedded `defaults.toml`
//! 2. Merge `~/.hearth/config.toml`, or `$HEARTH_HOME/config.toml` if the
//!    former is absent
//! 3. Merge the explicitly named file, if any
//! 4. Apply env var fallbacks for fields no file set
//! 5. Deserialize and validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the layered configuration.
///
/// `explicit` is a file named by the operator; unlike the user file it must
/// exist. `home_override` replaces the `~/.hearth` directory.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, or if the
/// merged configuration fails validation.
pub fn load(explicit: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    load_with_env(explicit, home_override, &collect_env_vars())
}

pub(crate) fn load_with_env(
    explicit: Option<&Path>,
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    let user_path = match home_override {
        Some(dir) => Some(dir.join("config.toml")),
        None => user_config_path(env_vars)?,
    };
    if let Some(path) = user_path
        && let Some(overlay) = try_load_file(&path)?
    {
        deep_merge_tracking(&mut merged, &overlay, "", &ConfigLayer::User, &mut field_sources);
        info!(path = %path.display(), "loaded user config");
        loaded_files.push(path.display().to_string());
    }

    if let Some(path) = explicit {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge_tracking(&mut merged, &overlay, "", &ConfigLayer::File, &mut field_sources);
        info!(path = %path.display(), "loaded config file");
        loaded_files.push(path.display().to_string());
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a single file (no layering, no env fallbacks).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;
    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;
    validate::validate(&config)?;
    Ok(config)
}

/// The user config file: `~/.hearth/config.toml` when it exists, else
/// `$HEARTH_HOME/config.toml`.
fn user_config_path(env_vars: &HashMap<String, String>) -> ConfigResult<Option<PathBuf>> {
    let home = home_directory()?;
    let default_path = home.join(".hearth").join("config.toml");
    if default_path.is_file() {
        return Ok(Some(default_path));
    }
    match env_vars.get("HEARTH_HOME") {
        Some(dir) if Path::new(dir).is_dir() => Ok(Some(Path::new(dir).join("config.toml"))),
        Some(dir) => {
            warn!(path = %dir, "HEARTH_HOME is not a directory; ignoring");
            Ok(None)
        },
        None => Ok(None),
    }
}

/// Read and parse a file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if u64::try_from(content.len()).unwrap_or(u64::MAX) > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    toml::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

/// Default data directory for persistent storage.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDir`] if no platform data directory exists.
pub fn default_data_dir() -> ConfigResult<PathBuf> {
    directories::ProjectDirs::from("", "", "hearth")
        .map(|d| d.data_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn test_defaults_deserialize_to_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_user_then_explicit_file() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join("config.toml"),
            "[trust]\nmax_actions_per_window = 3\nauto_approve_threshold = \"medium\"\n",
        )
        .unwrap();
        let explicit = home.path().join("override.toml");
        std::fs::write(&explicit, "[trust]\nauto_approve_threshold = \"high\"\n").unwrap();

        let resolved = load_with_env(Some(&explicit), Some(home.path()), &no_env()).unwrap();
        let trust = &resolved.config.trust;
        assert_eq!(trust.max_actions_per_window, 3);
        assert_eq!(trust.auto_approve_threshold, "high");
        assert_eq!(trust.window_seconds, 60);
        assert_eq!(
            resolved.field_sources.get("trust.auto_approve_threshold"),
            Some(&ConfigLayer::File)
        );
        assert_eq!(resolved.loaded_files.len(), 2);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let missing = home.path().join("nope.toml");
        assert!(matches!(
            load_with_env(Some(&missing), Some(home.path()), &no_env()),
            Err(ConfigError::ReadError { .. })
        ));
    }

    #[test]
    fn test_env_fallback_applies_without_files() {
        let home = tempfile::tempdir().unwrap();
        let env = HashMap::from([("HEARTH_DATA_DIR".to_owned(), "/tmp/hearth-data".to_owned())]);
        let resolved = load_with_env(None, Some(home.path()), &env).unwrap();
        assert_eq!(resolved.config.storage.path.as_deref(), Some("/tmp/hearth-data"));
    }

    #[test]
    fn test_invalid_merged_config_is_rejected() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join("config.toml"), "[trust]\nwindow_seconds = 0\n").unwrap();
        assert!(matches!(
            load_with_env(None, Some(home.path()), &no_env()),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_load_file_single() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.toml");
        std::fs::write(&path, "[assistant]\nundo_window_secs = 30\n").unwrap();
        let config = load_file(&path).unwrap();
        assert_eq!(config.assistant.undo_window_secs, 30);
        assert_eq!(config.assistant.proposal_ttl_secs, 600);
    }
}
