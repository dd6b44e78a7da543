//! Configuration struct definitions.
//!
//! All sections use `#[serde(default)]`, so a file only needs the keys it
//! changes. Risk levels are kept as strings here and checked by
//! [`validate`](crate::validate); the engine parses them when it builds its
//! settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Risk level names accepted anywhere a risk level is configured.
pub const RISK_LEVEL_NAMES: &[&str] = &["low", "medium", "high", "critical"];

/// Storage backends the CLI knows how to open.
pub const STORAGE_BACKENDS: &[&str] = &["memory", "surrealkv"];

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Proposal and undo timing.
    pub assistant: AssistantSection,
    /// Default trust settings for households without their own row.
    pub trust: TrustSection,
    /// Per-function risk overrides, keyed by function name.
    pub functions: BTreeMap<String, FunctionOverrideSection>,
    /// Where engine state is kept.
    pub storage: StorageSection,
    /// Log output.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// AssistantSection
// ---------------------------------------------------------------------------

/// Proposal and undo timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSection {
    /// Seconds a proposal stays open before it expires.
    pub proposal_ttl_secs: u64,
    /// Seconds after completion during which an action can be undone.
    pub undo_window_secs: u64,
}

impl Default for AssistantSection {
    fn default() -> Self {
        Self {
            proposal_ttl_secs: 600,
            undo_window_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// TrustSection
// ---------------------------------------------------------------------------

/// Trust defaults applied to households that never changed theirs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustSection {
    /// Highest risk level executed without confirmation.
    pub auto_approve_threshold: String,
    /// Executions allowed inside one window.
    pub max_actions_per_window: u32,
    /// Length of the rate window in seconds.
    pub window_seconds: u64,
}

impl Default for TrustSection {
    fn default() -> Self {
        Self {
            auto_approve_threshold: "low".to_owned(),
            max_actions_per_window: 5,
            window_seconds: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// FunctionOverrideSection
// ---------------------------------------------------------------------------

/// Overrides for one catalog function. Unset fields keep the built-in value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionOverrideSection {
    /// Replacement risk level.
    pub risk_level: Option<String>,
    /// Risk level above which the function always needs confirmation.
    pub requires_confirmation_above: Option<String>,
    /// Set to `false` to disable undo for the function. `true` cannot make
    /// an irreversible function reversible.
    pub reversible: Option<bool>,
}

// ---------------------------------------------------------------------------
// StorageSection
// ---------------------------------------------------------------------------

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// `"memory"` or `"surrealkv"`.
    pub backend: String,
    /// Data directory for persistent backends. `None` uses the platform
    /// data directory.
    pub path: Option<String>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: "memory".to_owned(),
            path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level filter (`"trace"` through `"error"`).
    pub level: String,
    /// `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Extra filter directives (e.g. `["hearth_approval=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
