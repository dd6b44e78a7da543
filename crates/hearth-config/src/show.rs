//! Source-annotated display for `hearth config show`.

use std::fmt::{self, Write as _};

use crate::merge::FieldSources;
use crate::types::Config;

/// A resolved configuration together with source annotations.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Dotted field path to the layer that set it.
    pub field_sources: FieldSources,
    /// Config files that were loaded, in precedence order.
    pub loaded_files: Vec<String>,
}

/// Output format for `config show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML with a source comment on each value.
    Toml,
    /// JSON.
    Json,
}

impl ResolvedConfig {
    /// Render the configuration, optionally limited to one section.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the section is unknown.
    pub fn show(&self, format: ShowFormat, section: Option<&str>) -> Result<String, fmt::Error> {
        let value = self.section_value(section)?;
        match format {
            ShowFormat::Json => serde_json::to_string_pretty(&value).map_err(|_| fmt::Error),
            ShowFormat::Toml => self.show_toml(&value, section),
        }
    }

    fn section_value(&self, section: Option<&str>) -> Result<toml::Value, fmt::Error> {
        let root = toml::Value::try_from(&self.config).map_err(|_| fmt::Error)?;
        match section {
            None => Ok(root),
            Some(name) => root.get(name).cloned().ok_or(fmt::Error),
        }
    }

    fn show_toml(&self, value: &toml::Value, section: Option<&str>) -> Result<String, fmt::Error> {
        let body = toml::to_string_pretty(value).map_err(|_| fmt::Error)?;
        let mut output = String::new();
        output.push_str("# Resolved Hearth configuration\n");
        if !self.loaded_files.is_empty() {
            output.push_str("# Loaded files:\n");
            for (i, path) in self.loaded_files.iter().enumerate() {
                writeln!(output, "#   {}. {path}", i.saturating_add(1))?;
            }
        }
        output.push('\n');

        let mut table_prefix = section.unwrap_or_default().to_owned();
        for line in body.lines() {
            let trimmed = line.trim();
            if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
                table_prefix = match section {
                    Some(s) => format!("{s}.{header}"),
                    None => header.to_owned(),
                };
                writeln!(output, "{line}")?;
                continue;
            }
            match self.annotation(trimmed, &table_prefix) {
                Some(layer) => writeln!(output, "{line}  # [{layer}]")?,
                None => writeln!(output, "{line}")?,
            }
        }
        Ok(output)
    }

    fn annotation(&self, line: &str, prefix: &str) -> Option<String> {
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let key = line.split('=').next()?.trim();
        let path = if prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{prefix}.{key}")
        };
        self.field_sources.get(&path).map(ToString::to_string)
    }
}
