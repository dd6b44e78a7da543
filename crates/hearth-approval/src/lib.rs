//! Hearth Approval - the assistant's proposal and trust engine.
//!
//! Turns structured intents from the assistant into household changes,
//! either directly or through a human decision, and keeps every change
//! auditable and, for a while, undoable.
//!
//! # Components
//!
//! - **Risk Classifier**: [`RiskClassifier`] maps a function name to its
//!   [`FunctionConfig`]; unknown names fail closed
//! - **Trust Evaluator**: [`TrustEvaluator`] decides auto-approval from the
//!   household's threshold and rate window ([`TrustStore`] keeps the window)
//! - **Proposal Store**: [`ProposalStore`] holds pending [`AiProposal`]s with
//!   expiry and partial approval
//! - **Proposal Executor**: [`ProposalExecutor`] runs actions in order with a
//!   pre-state capture and an audit entry each
//! - **Rollback Engine**: [`RollbackEngine`] restores a captured pre-state
//! - **Engine**: [`AssistantEngine`] wires all of the above
//!
//! # Approval Flow
//!
//! 1. An intent is validated and classified
//! 2. Trust either reserves a slot in the rate window, or denies
//! 3. Approved intents run at once; denied ones become a PENDING proposal
//! 4. A member approves (all or some actions) or rejects before expiry
//! 5. The approved actions run sequentially, stopping at the first failure
//! 6. Each succeeded reversible action can be undone inside the undo window
//!
//! # Example
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use hearth_approval::{AssistantEngine, IntentOutcome, ProposalDecision};
//! use hearth_core::{HouseholdId, SessionId};
//! use hearth_household::FunctionIntent;
//! use serde_json::json;
//!
//! let engine = AssistantEngine::builder().build().unwrap();
//! let household = HouseholdId::new();
//! let session = SessionId::new();
//!
//! // Low risk: runs immediately.
//! let add = FunctionIntent::new("add_shopping_item", json!({"name": "milk"}));
//! let outcome = engine.handle_intent(household, session, &add, None).await.unwrap();
//! assert!(matches!(outcome, IntentOutcome::Executed { .. }));
//!
//! // High risk: needs a decision.
//! let clear = FunctionIntent::new("clear_shopping_list", json!({}));
//! let IntentOutcome::Proposed { proposal, .. } =
//!     engine.handle_intent(household, session, &clear, None).await.unwrap()
//! else {
//!     unreachable!()
//! };
//! engine
//!     .resolve_proposal(
//!         household,
//!         &proposal.id,
//!         ProposalDecision::Approve { selected: None },
//!         None,
//!     )
//!     .await
//!     .unwrap();
//! let result = engine.execute_proposal(household, &proposal.id, None).await.unwrap();
//! assert_eq!(result.succeeded(), 1);
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod engine;
/// Error types and results for the engine.
pub mod error;
pub mod executor;
pub mod proposal;
pub mod risk;
pub mod rollback;
pub mod settings;
pub mod trust;

pub use engine::{
    AssistantEngine, AssistantEngineBuilder, Evaluation, IntentOutcome, ProposalDecision,
};
pub use error::{ApprovalError, ApprovalResult};
pub use executor::{
    ExecutedAction, ExecutionOrigin, ExecutionOutcome, ProposalExecutionResult, ProposalExecutor,
};
pub use proposal::{
    AiProposal, DEFAULT_PROPOSAL_TTL_SECS, ProposalStatus, ProposalStore, ProposedAction,
};
pub use risk::{FunctionConfig, FunctionOverride, RiskClassifier};
pub use rollback::{DEFAULT_UNDO_WINDOW_SECS, RollbackEngine, RollbackResult};
pub use settings::EngineSettings;
pub use trust::{
    DecisionReason, HouseholdAiTrust, KvTrustStore, TrustDecision, TrustDefaults,
    TrustEvaluator, TrustSettingsUpdate, TrustStore,
};
