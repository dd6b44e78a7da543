//! Prelude module - commonly used types for convenient import.
//!
//! Use `use hearth_approval::prelude::*;` to import all essential types.

// Engine
pub use crate::{AssistantEngine, EngineSettings, Evaluation, IntentOutcome, ProposalDecision};

// Errors
pub use crate::{ApprovalError, ApprovalResult};

// Proposals and execution
pub use crate::{
    AiProposal, ExecutionOutcome, ProposalExecutionResult, ProposalStatus, ProposedAction,
    RollbackResult,
};

// Risk and trust
pub use crate::{DecisionReason, FunctionConfig, RiskClassifier, TrustDecision, TrustSettingsUpdate};
