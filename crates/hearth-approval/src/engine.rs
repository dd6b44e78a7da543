//! The assistant engine facade.
//!
//! [`AssistantEngine`] owns one instance of every component and exposes the
//! operations an upstream request handler needs. All collaborators are
//! injected through [`AssistantEngineBuilder`]; nothing is global.

use std::fmt;
use std::sync::Arc;

use hearth_audit::{AuditEntry, AuditEntryId, AuditLog, AuditStorage, KvAuditStorage};
use hearth_core::{
    ActionId, Clock, HouseholdId, ProposalId, SessionId, SystemClock, Timestamp, UserId,
};
use hearth_household::{FunctionCall, FunctionIntent, HouseholdData, KvHouseholdData};
use hearth_storage::{KvStore, MemoryKvStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApprovalError, ApprovalResult};
use crate::executor::{ExecutionOrigin, ProposalExecutionResult, ProposalExecutor};
use crate::proposal::{AiProposal, ProposalStore, ProposedAction};
use crate::risk::{FunctionConfig, RiskClassifier};
use crate::rollback::{RollbackEngine, RollbackResult};
use crate::settings::EngineSettings;
use crate::trust::{
    DecisionReason, HouseholdAiTrust, KvTrustStore, TrustEvaluator, TrustSettingsUpdate,
    TrustStore,
};

/// Answer to "can this intent run right now?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Whether the intent would be executed without confirmation.
    pub auto_execute: bool,
    /// Why.
    pub reason: DecisionReason,
    /// Classification of the intent's function.
    pub function: FunctionConfig,
}

/// A member's decision on a pending proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ProposalDecision {
    /// Approve all actions, or only `selected`.
    Approve {
        /// Subset to keep. `None` approves everything.
        selected: Option<Vec<ActionId>>,
    },
    /// Discard the proposal.
    Reject,
}

/// What [`AssistantEngine::handle_intent`] did with an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntentOutcome {
    /// Trust allowed it and it ran.
    Executed {
        /// Execution result of the single action.
        result: ProposalExecutionResult,
    },
    /// It needs a human decision.
    Proposed {
        /// The new pending proposal.
        proposal: AiProposal,
        /// Why it was not auto-approved.
        reason: DecisionReason,
    },
}

/// Builder for [`AssistantEngine`].
///
/// Every collaborator is optional. Missing ones fall back to in-memory
/// storage and the system clock, all sharing the same [`KvStore`].
#[derive(Default)]
pub struct AssistantEngineBuilder {
    store: Option<Arc<dyn KvStore>>,
    household: Option<Arc<dyn HouseholdData>>,
    clock: Option<Arc<dyn Clock>>,
    audit_storage: Option<Arc<dyn AuditStorage>>,
    trust_store: Option<Arc<dyn TrustStore>>,
    settings: EngineSettings,
}

impl fmt::Debug for AssistantEngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantEngineBuilder")
            .field("has_store", &self.store.is_some())
            .field("has_household", &self.household.is_some())
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AssistantEngineBuilder {
    /// Backing store for proposals, trust rows, audit entries and (unless
    /// [`household`](Self::household) is set) household data.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Household data layer.
    #[must_use]
    pub fn household(mut self, household: Arc<dyn HouseholdData>) -> Self {
        self.household = Some(household);
        self
    }

    /// Clock for expiry, undo windows and rate windows.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Audit storage.
    #[must_use]
    pub fn audit_storage(mut self, storage: Arc<dyn AuditStorage>) -> Self {
        self.audit_storage = Some(storage);
        self
    }

    /// Trust storage.
    #[must_use]
    pub fn trust_store(mut self, store: Arc<dyn TrustStore>) -> Self {
        self.trust_store = Some(store);
        self
    }

    /// Timing, trust defaults and function overrides.
    #[must_use]
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Wire the components.
    ///
    /// # Errors
    ///
    /// Returns an error if a store namespace is rejected or a setting is
    /// out of range.
    pub fn build(self) -> ApprovalResult<AssistantEngine> {
        let settings = self.settings;
        if settings.proposal_ttl_secs == 0 || settings.undo_window_secs == 0 {
            return Err(ApprovalError::invalid_state(
                "proposal TTL and undo window must be at least one second",
            ));
        }
        if settings.trust_defaults.max_actions_per_window == 0
            || settings.trust_defaults.window_seconds == 0
        {
            return Err(ApprovalError::invalid_state(
                "trust window capacity and length must be at least 1",
            ));
        }

        let store: Arc<dyn KvStore> = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryKvStore::new()));
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let household: Arc<dyn HouseholdData> = self.household.unwrap_or_else(|| {
            Arc::new(KvHouseholdData::new(Arc::clone(&store), Arc::clone(&clock)))
        });
        let audit_storage: Arc<dyn AuditStorage> = match self.audit_storage {
            Some(storage) => storage,
            None => Arc::new(KvAuditStorage::new(Arc::clone(&store))?),
        };
        let trust_store: Arc<dyn TrustStore> = match self.trust_store {
            Some(trust) => trust,
            None => Arc::new(KvTrustStore::new(Arc::clone(&store))?),
        };

        let classifier = RiskClassifier::with_overrides(&settings.function_overrides);
        let audit = AuditLog::new(audit_storage, Arc::clone(&clock));
        let trust = TrustEvaluator::new(classifier.clone(), trust_store, settings.trust_defaults);
        let proposals = ProposalStore::new(store, Arc::clone(&clock), settings.proposal_ttl_secs)?;
        let executor = ProposalExecutor::new(
            Arc::clone(&household),
            audit.clone(),
            trust.clone(),
            Arc::clone(&clock),
        );
        let rollback = RollbackEngine::new(
            household,
            audit.clone(),
            Arc::clone(&clock),
            settings.undo_window_secs,
        );

        debug!(
            proposal_ttl_secs = settings.proposal_ttl_secs,
            undo_window_secs = settings.undo_window_secs,
            overrides = settings.function_overrides.len(),
            "assistant engine built"
        );
        Ok(AssistantEngine {
            classifier,
            trust,
            proposals,
            executor,
            rollback,
            audit,
            clock,
            settings,
        })
    }
}

/// Entry point for the proposal and trust engine.
#[derive(Clone)]
pub struct AssistantEngine {
    classifier: RiskClassifier,
    trust: TrustEvaluator,
    proposals: ProposalStore,
    executor: ProposalExecutor,
    rollback: RollbackEngine,
    audit: AuditLog,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl fmt::Debug for AssistantEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantEngine")
            .field("settings", &self.settings)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl AssistantEngine {
    /// Start building an engine.
    #[must_use]
    pub fn builder() -> AssistantEngineBuilder {
        AssistantEngineBuilder::default()
    }

    /// The settings the engine was built with.
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The risk classifier.
    #[must_use]
    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    /// Every invocable function with its effective metadata.
    #[must_use]
    pub fn functions(&self) -> Vec<FunctionConfig> {
        self.classifier.functions()
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn to_action(&self, intent: &FunctionIntent) -> ApprovalResult<ProposedAction> {
        let call = FunctionCall::from_intent(intent)?.normalize();
        let config = self.classifier.classify(call.function().as_str());
        Ok(ProposedAction::from_call(&call, &config))
    }

    /// Decide whether `intent` would run without confirmation. Does not
    /// touch the rate window.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidArguments`] for an unknown function
    /// or bad arguments, or a storage error.
    pub async fn evaluate(
        &self,
        household: HouseholdId,
        intent: &FunctionIntent,
    ) -> ApprovalResult<Evaluation> {
        let call = FunctionCall::from_intent(intent)?;
        let function = self.classifier.classify(call.function().as_str());
        let decision = self
            .trust
            .should_auto_approve(&household, &function.name, self.now())
            .await?;
        Ok(Evaluation {
            auto_execute: decision.approve,
            reason: decision.reason,
            function,
        })
    }

    /// Build a pending proposal from `intents`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidArguments`] if any intent is invalid
    /// (nothing is stored), [`ApprovalError::InvalidSelection`] for an empty
    /// list, or a storage error.
    pub async fn propose(
        &self,
        household: HouseholdId,
        session: SessionId,
        intents: &[FunctionIntent],
    ) -> ApprovalResult<AiProposal> {
        self.propose_with_summary(household, session, intents, None)
            .await
    }

    /// [`propose`](Self::propose) with a caller-supplied summary.
    ///
    /// # Errors
    ///
    /// See [`propose`](Self::propose).
    pub async fn propose_with_summary(
        &self,
        household: HouseholdId,
        session: SessionId,
        intents: &[FunctionIntent],
        summary: Option<String>,
    ) -> ApprovalResult<AiProposal> {
        let actions = intents
            .iter()
            .map(|intent| self.to_action(intent))
            .collect::<ApprovalResult<Vec<_>>>()?;
        self.proposals
            .create_proposal_with_summary(household, session, actions, summary)
            .await
    }

    /// Approve, partially approve or reject a pending proposal.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Expired`, `AlreadyResolved` or
    /// `InvalidSelection` as described on [`ProposalStore`].
    pub async fn resolve_proposal(
        &self,
        household: HouseholdId,
        id: &ProposalId,
        decision: ProposalDecision,
        actor: Option<UserId>,
    ) -> ApprovalResult<AiProposal> {
        match decision {
            ProposalDecision::Approve { selected } => {
                self.proposals
                    .approve(&household, id, selected.as_deref(), actor)
                    .await
            },
            ProposalDecision::Reject => self.proposals.reject(&household, id, actor).await,
        }
    }

    /// Execute an approved proposal. A proposal runs at most once.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InvalidState` (not approved) or
    /// `AlreadyResolved` (already executed) before anything runs.
    pub async fn execute_proposal(
        &self,
        household: HouseholdId,
        id: &ProposalId,
        actor: Option<UserId>,
    ) -> ApprovalResult<ProposalExecutionResult> {
        let proposal = self.proposals.claim_for_execution(&household, id).await?;
        self.executor.execute(&proposal, actor).await
    }

    /// Execute a single intent without a proposal, if trust allows it.
    ///
    /// The rate slot is taken atomically before execution.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArguments`, `RateLimited` or `NotAutoApproved`
    /// before any audit entry is written.
    pub async fn execute_auto(
        &self,
        household: HouseholdId,
        intent: &FunctionIntent,
        actor: Option<UserId>,
    ) -> ApprovalResult<ProposalExecutionResult> {
        let action = self.to_action(intent)?;
        let decision = self
            .trust
            .reserve(&household, &action.function_name, self.now())
            .await?;
        if !decision.approve {
            return Err(decision.into_error());
        }
        self.executor
            .execute_action(household, &action, actor, ExecutionOrigin::AutoApproved)
            .await
    }

    /// Run one intent through the full flow: execute it if trust allows,
    /// otherwise store it as a single-action proposal.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArguments` for a bad intent, or a storage error.
    pub async fn handle_intent(
        &self,
        household: HouseholdId,
        session: SessionId,
        intent: &FunctionIntent,
        actor: Option<UserId>,
    ) -> ApprovalResult<IntentOutcome> {
        let action = self.to_action(intent)?;
        let decision = self
            .trust
            .reserve(&household, &action.function_name, self.now())
            .await?;

        if decision.approve {
            let result = self
                .executor
                .execute_action(household, &action, actor, ExecutionOrigin::AutoApproved)
                .await?;
            return Ok(IntentOutcome::Executed { result });
        }

        let proposal = self
            .proposals
            .create_proposal(household, session, vec![action])
            .await?;
        info!(
            household = %household,
            proposal = %proposal.id,
            reason = %decision.reason,
            "intent needs confirmation"
        );
        Ok(IntentOutcome::Proposed {
            proposal,
            reason: decision.reason,
        })
    }

    /// Undo one executed action.
    ///
    /// # Errors
    ///
    /// See [`RollbackEngine::undo`].
    pub async fn undo(
        &self,
        household: HouseholdId,
        audit_log_id: &AuditEntryId,
        actor: Option<UserId>,
    ) -> ApprovalResult<RollbackResult> {
        self.rollback.undo(household, audit_log_id, actor).await
    }

    /// Read a proposal, applying lazy expiry.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a storage error.
    pub async fn proposal(
        &self,
        household: HouseholdId,
        id: &ProposalId,
    ) -> ApprovalResult<AiProposal> {
        self.proposals.get_proposal(&household, id).await
    }

    /// Proposals still waiting for a decision.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn pending_proposals(
        &self,
        household: HouseholdId,
    ) -> ApprovalResult<Vec<AiProposal>> {
        self.proposals.list_pending(&household).await
    }

    /// Every stored proposal of the household, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn proposals(&self, household: HouseholdId) -> ApprovalResult<Vec<AiProposal>> {
        self.proposals.list(&household).await
    }

    /// Delete finished proposals resolved more than `older_than_secs` ago.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn purge_proposals(
        &self,
        household: HouseholdId,
        older_than_secs: u64,
    ) -> ApprovalResult<usize> {
        let cutoff = self
            .now()
            .checked_sub_secs(older_than_secs)
            .ok_or_else(|| ApprovalError::invalid_state("purge cutoff is out of range"))?;
        self.proposals.purge_resolved_before(&household, cutoff).await
    }

    /// Audit entries of the household, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn audit_entries(&self, household: HouseholdId) -> ApprovalResult<Vec<AuditEntry>> {
        Ok(self.audit.household_entries(&household).await?)
    }

    /// One audit entry.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a storage error.
    pub async fn audit_entry(
        &self,
        household: HouseholdId,
        id: &AuditEntryId,
    ) -> ApprovalResult<AuditEntry> {
        self.audit
            .get(&household, id)
            .await?
            .ok_or_else(|| ApprovalError::NotFound {
                resource: "audit entry",
                id: id.to_string(),
            })
    }

    /// Entries that can still be undone, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn undoable_entries(
        &self,
        household: HouseholdId,
    ) -> ApprovalResult<Vec<AuditEntry>> {
        self.rollback.undoable_entries(&household).await
    }

    /// The household's trust settings and current window.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn trust_settings(&self, household: HouseholdId) -> ApprovalResult<HouseholdAiTrust> {
        self.trust.trust_settings(&household, self.now()).await
    }

    /// Change the household's trust settings.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for a zero capacity or window, or a storage
    /// error.
    pub async fn update_trust_settings(
        &self,
        household: HouseholdId,
        update: &TrustSettingsUpdate,
    ) -> ApprovalResult<HouseholdAiTrust> {
        self.trust
            .update_trust_settings(&household, update, self.now())
            .await
    }

    /// Auto-approvals left in the current window.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn remaining_actions(&self, household: HouseholdId) -> ApprovalResult<u32> {
        self.trust.remaining_actions(&household, self.now()).await
    }
}
