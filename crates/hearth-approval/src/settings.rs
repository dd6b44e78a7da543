//! Engine settings derived from the loaded configuration.

use std::collections::HashMap;

use hearth_config::Config;
use hearth_core::RiskLevel;

use crate::error::{ApprovalError, ApprovalResult};
use crate::proposal::DEFAULT_PROPOSAL_TTL_SECS;
use crate::risk::FunctionOverride;
use crate::rollback::DEFAULT_UNDO_WINDOW_SECS;
use crate::trust::TrustDefaults;

/// Tunables of an [`AssistantEngine`](crate::AssistantEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Seconds a proposal stays pending.
    pub proposal_ttl_secs: u64,
    /// Seconds after completion an action can be undone.
    pub undo_window_secs: u64,
    /// Trust settings for households without a stored row.
    pub trust_defaults: TrustDefaults,
    /// Per-function metadata overrides.
    pub function_overrides: HashMap<String, FunctionOverride>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            proposal_ttl_secs: DEFAULT_PROPOSAL_TTL_SECS,
            undo_window_secs: DEFAULT_UNDO_WINDOW_SECS,
            trust_defaults: TrustDefaults::default(),
            function_overrides: HashMap::new(),
        }
    }
}

fn parse_risk(field: &str, value: &str) -> ApprovalResult<RiskLevel> {
    value.parse().map_err(|e| ApprovalError::InvalidArguments {
        message: format!("{field}: {e}"),
    })
}

impl EngineSettings {
    /// Build settings from a validated [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidArguments`] if a risk level name does
    /// not parse. [`Config`] validation rejects these earlier, so this only
    /// happens for configs built by hand.
    pub fn from_config(config: &Config) -> ApprovalResult<Self> {
        let trust_defaults = TrustDefaults {
            auto_approve_threshold: parse_risk(
                "trust.auto_approve_threshold",
                &config.trust.auto_approve_threshold,
            )?,
            max_actions_per_window: config.trust.max_actions_per_window,
            window_seconds: config.trust.window_seconds,
        };

        let mut function_overrides = HashMap::with_capacity(config.functions.len());
        for (name, section) in &config.functions {
            let risk_level = section
                .risk_level
                .as_deref()
                .map(|v| parse_risk(&format!("functions.{name}.risk_level"), v))
                .transpose()?;
            let requires_confirmation_above = section
                .requires_confirmation_above
                .as_deref()
                .map(|v| parse_risk(&format!("functions.{name}.requires_confirmation_above"), v))
                .transpose()?;
            function_overrides.insert(
                name.clone(),
                FunctionOverride {
                    risk_level,
                    requires_confirmation_above,
                    reversible: section.reversible,
                },
            );
        }

        Ok(Self {
            proposal_ttl_secs: config.assistant.proposal_ttl_secs,
            undo_window_secs: config.assistant.undo_window_secs,
            trust_defaults,
            function_overrides,
        })
    }
}
