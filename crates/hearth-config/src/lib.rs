#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration for the Hearth assistant engine.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hearth_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("proposals expire after {}s", resolved.config.assistant.proposal_ttl_secs);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit file** passed with `--config`
//! 2. **User** (`~/.hearth/config.toml`, or `$HEARTH_HOME/config.toml`)
//! 3. **Environment variables** (`HEARTH_*`), fallback only
//! 4. **Embedded defaults** (`defaults.toml`)
//!
//! # Design
//!
//! This crate has no dependencies on other hearth crates. Risk levels stay
//! strings here; the engine turns them into domain types when it builds its
//! settings.

/// Environment variable fallbacks.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered merging with source tracking.
pub mod merge;
/// Resolved configuration display.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use merge::ConfigLayer;
pub use show::{ResolvedConfig, ShowFormat};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any file is malformed or the result
    /// fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, None)
    }

    /// Load configuration with an explicit `.hearth` directory.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any file is malformed or the result
    /// fails validation.
    pub fn load_with_home(
        explicit: Option<&std::path::Path>,
        hearth_home: &std::path::Path,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, Some(hearth_home))
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
