//! Environment variable fallbacks.
//!
//! Env vars only fill fields that no config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "HEARTH_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "HEARTH_LOG_FORMAT",
        field_path: "logging.format",
    },
    EnvMapping {
        var_name: "HEARTH_DATA_DIR",
        field_path: "storage.path",
    },
    EnvMapping {
        var_name: "HEARTH_STORAGE_BACKEND",
        field_path: "storage.backend",
    },
];

/// Snapshot the `HEARTH_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("HEARTH_"))
        .collect()
}

/// Apply env fallbacks to fields no file layer set. Returns how many were
/// applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;
    for mapping in ENV_MAPPINGS {
        let set_by_file = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if set_by_file {
            continue;
        }
        let Some(val) = env_vars.get(mapping.var_name) else {
            continue;
        };
        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_string(merged, mapping.field_path, val);
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }
    count
}

/// Set a string leaf at a dotted path, creating intermediate tables.
fn set_string(root: &mut toml::Value, path: &str, val: &str) {
    let mut current = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), toml::Value::String(val.to_owned()));
            return;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_fills_unset_fields() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"info\"\n").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".into(), ConfigLayer::Defaults);
        let env = HashMap::from([
            ("HEARTH_LOG_LEVEL".to_owned(), "debug".to_owned()),
            ("HEARTH_DATA_DIR".to_owned(), "/var/lib/hearth".to_owned()),
        ]);

        assert_eq!(apply_env_fallbacks(&mut merged, &mut sources, &env), 2);
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(merged["storage"]["path"].as_str(), Some("/var/lib/hearth"));
        assert_eq!(sources.get("storage.path"), Some(&ConfigLayer::Environment));
    }

    #[test]
    fn test_file_values_win_over_env() {
        let mut merged: toml::Value = toml::from_str("[logging]\nlevel = \"warn\"\n").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("logging.level".into(), ConfigLayer::User);
        let env = HashMap::from([("HEARTH_LOG_LEVEL".to_owned(), "trace".to_owned())]);

        assert_eq!(apply_env_fallbacks(&mut merged, &mut sources, &env), 0);
        assert_eq!(merged["logging"]["level"].as_str(), Some("warn"));
    }
}
