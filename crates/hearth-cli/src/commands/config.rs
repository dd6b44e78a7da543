//! Config command - show and validate configuration.

use std::path::Path;

use anyhow::{Result, anyhow};
use hearth_config::{Config, ShowFormat};

use crate::theme::Theme;

/// Print the resolved configuration with source annotations.
pub(crate) fn show_config(
    explicit: Option<&Path>,
    format: &str,
    section: Option<&str>,
) -> Result<()> {
    let resolved = Config::load(explicit)?;
    let show_format = match format {
        "json" => ShowFormat::Json,
        _ => ShowFormat::Toml,
    };
    let rendered = resolved
        .show(show_format, section)
        .map_err(|_| anyhow!("cannot render section {}", section.unwrap_or("<all>")))?;
    println!("{rendered}");
    Ok(())
}

/// Load and validate the configuration, reporting every loaded file.
pub(crate) fn validate_config(explicit: Option<&Path>) -> Result<()> {
    match Config::load(explicit) {
        Ok(resolved) => {
            println!("{}", Theme::success("Configuration is valid"));
            if resolved.loaded_files.is_empty() {
                println!("{}", Theme::dimmed("  (built-in defaults only)"));
            }
            for file in &resolved.loaded_files {
                println!("  {}", Theme::dimmed(file));
            }
            Ok(())
        },
        Err(e) => {
            println!("{}", Theme::error(&e.to_string()));
            Err(e.into())
        },
    }
}
