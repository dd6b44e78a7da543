//! Risk classification of catalog functions.
//!
//! The table is built once from the catalog defaults plus configured
//! overrides and never changes afterwards. Lookups of names outside the
//! table fail closed: [`RiskLevel::Critical`], irreversible, and always in
//! need of confirmation.

use std::collections::HashMap;
use std::sync::Arc;

use hearth_core::RiskLevel;
use hearth_household::FunctionName;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Static metadata of one invocable function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfig {
    /// Function name.
    pub name: String,
    /// Risk of running it.
    pub risk_level: RiskLevel,
    /// Whether a captured pre-state allows undo.
    pub is_reversible: bool,
    /// Only risk levels strictly below this can be auto-approved; anything
    /// at or above it goes through a proposal, whatever the household trusts.
    pub requires_confirmation_above: RiskLevel,
}

impl FunctionConfig {
    fn from_catalog(function: FunctionName) -> Self {
        Self {
            name: function.as_str().to_owned(),
            risk_level: function.default_risk_level(),
            is_reversible: function.is_reversible(),
            requires_confirmation_above: RiskLevel::Critical,
        }
    }

    fn unknown(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            risk_level: RiskLevel::Critical,
            is_reversible: false,
            requires_confirmation_above: RiskLevel::Low,
        }
    }

    /// Whether the function's own metadata forces a proposal.
    #[must_use]
    pub fn requires_confirmation(&self) -> bool {
        self.risk_level >= self.requires_confirmation_above
    }
}

/// Configured adjustments to one function's metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionOverride {
    /// Replacement risk level.
    pub risk_level: Option<RiskLevel>,
    /// Replacement confirmation threshold.
    pub requires_confirmation_above: Option<RiskLevel>,
    /// `Some(false)` disables undo. `Some(true)` has no effect on
    /// functions that are irreversible by nature.
    pub reversible: Option<bool>,
}

/// Maps function names to their [`FunctionConfig`].
///
/// Cheap to clone; the table is shared.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    table: Arc<HashMap<String, FunctionConfig>>,
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskClassifier {
    /// Classifier with the built-in catalog metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::with_overrides(&HashMap::new())
    }

    /// Classifier with the built-in catalog metadata adjusted by
    /// `overrides`. Overrides for names outside the catalog are ignored.
    #[must_use]
    pub fn with_overrides(overrides: &HashMap<String, FunctionOverride>) -> Self {
        let mut table: HashMap<String, FunctionConfig> = FunctionName::ALL
            .iter()
            .map(|f| (f.as_str().to_owned(), FunctionConfig::from_catalog(*f)))
            .collect();

        for (name, o) in overrides {
            let Some(config) = table.get_mut(name) else {
                warn!(function = %name, "ignoring override for unknown function");
                continue;
            };
            if let Some(level) = o.risk_level {
                config.risk_level = level;
            }
            if let Some(level) = o.requires_confirmation_above {
                config.requires_confirmation_above = level;
            }
            match o.reversible {
                Some(false) => config.is_reversible = false,
                Some(true) if !config.is_reversible => {
                    warn!(function = %name, "function cannot be made reversible; override ignored");
                },
                _ => {},
            }
        }

        Self {
            table: Arc::new(table),
        }
    }

    /// Look up a function. Unknown names get the most conservative config.
    #[must_use]
    pub fn classify(&self, function_name: &str) -> FunctionConfig {
        self.table
            .get(function_name)
            .cloned()
            .unwrap_or_else(|| FunctionConfig::unknown(function_name))
    }

    /// Every known function, in catalog order.
    #[must_use]
    pub fn functions(&self) -> Vec<FunctionConfig> {
        FunctionName::ALL
            .iter()
            .map(|f| self.classify(f.as_str()))
            .collect()
    }
}
