//! Command implementations.

pub(crate) mod audit;
pub(crate) mod config;
pub(crate) mod functions;
pub(crate) mod intents;
pub(crate) mod proposals;
pub(crate) mod trust;

use anyhow::{Context as _, Result};
use hearth_household::FunctionIntent;
use serde_json::Value;

/// Parse a function's JSON arguments. Missing means `{}`.
pub(crate) fn parse_arguments(raw: Option<&str>) -> Result<Value> {
    match raw {
        None => Ok(Value::Object(serde_json::Map::new())),
        Some(text) => serde_json::from_str(text).context("arguments are not valid JSON"),
    }
}

/// Parse a JSON intent or array of intents,
/// e.g. `[{"name": "add_shopping_item", "arguments": {"name": "milk"}}]`.
pub(crate) fn parse_intents(raw: &str) -> Result<Vec<FunctionIntent>> {
    let value: Value = serde_json::from_str(raw).context("intents are not valid JSON")?;
    let intents = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(intents)
}
