//! Executes approved actions against household data.
//!
//! # Execution Flow
//!
//! For each action, strictly in list order:
//!
//! 1. Parse the stored arguments into a [`FunctionCall`]
//! 2. Capture the pre-state of the touched entities if the action is
//!    reversible
//! 3. Write a STARTED audit entry carrying the pre-state
//! 4. Apply the mutation (atomic per action)
//! 5. Mark the entry SUCCEEDED, or FAILED and stop
//!
//! A proposal as a whole is not atomic. When action *n* fails, actions
//! before it stay applied and actions after it are never attempted; the
//! result says exactly which is which.

use std::fmt;
use std::sync::Arc;

use hearth_audit::{AuditEntryId, AuditLog, NewAuditEntry};
use hearth_core::{ActionId, Clock, HouseholdId, ProposalId, UserId};
use hearth_household::{ActionOutput, FunctionCall, HouseholdData, HouseholdResult, StateSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApprovalError, ApprovalResult};
use crate::proposal::{AiProposal, ProposedAction};
use crate::trust::TrustEvaluator;

/// How an action came to be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOrigin {
    /// Trust allowed it to run without confirmation. Its rate slot was
    /// reserved before execution.
    AutoApproved,
    /// Part of a proposal a member approved.
    Proposal,
}

/// One attempted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedAction {
    /// The proposed action.
    pub action_id: ActionId,
    /// Catalog function name.
    pub function_name: String,
    /// Audit entry recording the attempt.
    pub audit_log_id: AuditEntryId,
    /// Whether the mutation was applied.
    pub success: bool,
    /// What the mutation produced.
    pub result: Option<ActionOutput>,
    /// Why it failed.
    pub error: Option<String>,
    /// Bookkeeping that did not complete: an audit entry that could not be
    /// finished, or an execution that was not counted in the rate window.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Whether nothing, some or all of the requested work happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Every action was applied.
    Completed,
    /// Some actions were applied before one failed.
    Partial,
    /// The first action failed; nothing was applied.
    NothingApplied,
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Partial => write!(f, "partially applied"),
            Self::NothingApplied => write!(f, "nothing applied"),
        }
    }
}

/// Result of executing a proposal or a single auto-approved action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalExecutionResult {
    /// The executed proposal, if any.
    pub proposal_id: Option<ProposalId>,
    /// Attempted actions in order.
    pub executed_actions: Vec<ExecutedAction>,
    /// Index of the action that stopped execution. It is the last entry of
    /// `executed_actions` when that action failed, or one past it when the
    /// audit log could not record the next action.
    pub failed_at: Option<usize>,
    /// Why execution stopped.
    pub error: Option<String>,
}

impl ProposalExecutionResult {
    fn new(proposal_id: Option<ProposalId>) -> Self {
        Self {
            proposal_id,
            executed_actions: Vec::new(),
            failed_at: None,
            error: None,
        }
    }

    fn push(&mut self, action: ExecutedAction) -> bool {
        let failed = !action.success;
        if failed {
            self.failed_at = Some(self.executed_actions.len());
            self.error.clone_from(&action.error);
        }
        self.executed_actions.push(action);
        failed
    }

    fn halt(&mut self, error: String) {
        self.failed_at = Some(self.executed_actions.len());
        self.error = Some(error);
    }

    /// Number of applied actions.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.executed_actions.iter().filter(|a| a.success).count()
    }

    /// Summary of what happened.
    #[must_use]
    pub fn outcome(&self) -> ExecutionOutcome {
        match (self.failed_at, self.succeeded()) {
            (None, _) => ExecutionOutcome::Completed,
            (Some(_), 0) => ExecutionOutcome::NothingApplied,
            (Some(_), _) => ExecutionOutcome::Partial,
        }
    }

    /// Audit entry ids in execution order.
    #[must_use]
    pub fn audit_log_ids(&self) -> Vec<AuditEntryId> {
        self.executed_actions.iter().map(|a| a.audit_log_id).collect()
    }
}

/// Runs actions and records them in the audit log.
#[derive(Clone)]
pub struct ProposalExecutor {
    household: Arc<dyn HouseholdData>,
    audit: AuditLog,
    trust: TrustEvaluator,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ProposalExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProposalExecutor")
            .field("audit", &self.audit)
            .field("trust", &self.trust)
            .finish_non_exhaustive()
    }
}

impl ProposalExecutor {
    /// Create an executor.
    #[must_use]
    pub fn new(
        household: Arc<dyn HouseholdData>,
        audit: AuditLog,
        trust: TrustEvaluator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            household,
            audit,
            trust,
            clock,
        }
    }

    /// Execute an approved proposal.
    ///
    /// Once the first action has been attempted, failures are reported in
    /// the result rather than as errors, so the caller always learns which
    /// actions were applied. If the audit log stops accepting writes the
    /// remaining actions are not attempted.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidState`] unless the proposal is
    /// APPROVED or PARTIALLY_APPROVED.
    pub async fn execute(
        &self,
        proposal: &AiProposal,
        actor: Option<UserId>,
    ) -> ApprovalResult<ProposalExecutionResult> {
        if !proposal.status.is_approved() {
            return Err(ApprovalError::invalid_state(format!(
                "proposal {} is {} and cannot be executed",
                proposal.id, proposal.status
            )));
        }

        let mut result = ProposalExecutionResult::new(Some(proposal.id));
        for (index, action) in proposal.actions.iter().enumerate() {
            let run = self
                .run_action(
                    proposal.household_id,
                    action,
                    actor,
                    Some(proposal.id),
                    ExecutionOrigin::Proposal,
                )
                .await;
            match run {
                ActionRun::Recorded(executed) => {
                    if result.push(executed) {
                        break;
                    }
                },
                ActionRun::Unrecorded { applied, error } => {
                    warn!(
                        proposal = %proposal.id,
                        index,
                        applied = result.succeeded(),
                        error = %error,
                        "audit log unavailable, proposal execution stopped"
                    );
                    let failed = applied.is_some_and(|a| result.push(a));
                    let remaining = result.executed_actions.len() < proposal.actions.len();
                    if !failed && remaining {
                        result.halt(format!("audit log unavailable: {error}"));
                    }
                    break;
                },
            }
        }

        info!(
            proposal = %proposal.id,
            household = %proposal.household_id,
            outcome = %result.outcome(),
            applied = result.succeeded(),
            total = proposal.actions.len(),
            "proposal executed"
        );
        Ok(result)
    }

    /// Execute one action outside any proposal.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the audit entry cannot be written. Nothing
    /// has been applied in that case.
    pub async fn execute_action(
        &self,
        household: HouseholdId,
        action: &ProposedAction,
        actor: Option<UserId>,
        origin: ExecutionOrigin,
    ) -> ApprovalResult<ProposalExecutionResult> {
        let mut result = ProposalExecutionResult::new(None);
        match self
            .run_action(household, action, actor, None, origin)
            .await
        {
            ActionRun::Recorded(executed) | ActionRun::Unrecorded {
                applied: Some(executed),
                ..
            } => {
                result.push(executed);
            },
            ActionRun::Unrecorded {
                applied: None,
                error,
            } => return Err(error),
        }
        Ok(result)
    }

    async fn prepare(
        &self,
        household: HouseholdId,
        action: &ProposedAction,
    ) -> HouseholdResult<(FunctionCall, Option<StateSnapshot>)> {
        // Ids are filled in here so the snapshot and the mutation agree on
        // which entity a create call touches.
        let call = FunctionCall::from_parts(&action.function_name, &action.arguments)?.normalize();
        let pre_state = if action.is_reversible {
            Some(self.household.snapshot(household, &call).await?)
        } else {
            None
        };
        Ok((call, pre_state))
    }

    async fn run_action(
        &self,
        household: HouseholdId,
        action: &ProposedAction,
        actor: Option<UserId>,
        proposal_id: Option<ProposalId>,
        origin: ExecutionOrigin,
    ) -> ActionRun {
        let (call, pre_state) = match self.prepare(household, action).await {
            Ok((call, pre_state)) => (Ok(call), pre_state),
            Err(e) => (Err(e.to_string()), None),
        };
        let arguments = match &call {
            Ok(call) => call.arguments(),
            Err(_) => action.arguments.clone(),
        };

        // The entry, with its pre-state, is on disk before anything changes.
        let entry = match self
            .audit
            .begin(NewAuditEntry {
                household_id: household,
                user_id: actor,
                proposal_id,
                action_id: proposal_id.map(|_| action.id),
                function_name: action.function_name.clone(),
                arguments,
                risk_level: action.risk_level,
                is_reversible: action.is_reversible,
                pre_state,
            })
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                return ActionRun::Unrecorded {
                    applied: None,
                    error: e.into(),
                };
            },
        };

        let applied = match call {
            Ok(call) => self
                .household
                .apply(household, &call)
                .await
                .map_err(|e| e.to_string()),
            Err(message) => Err(message),
        };

        let mut executed = ExecutedAction {
            action_id: action.id,
            function_name: action.function_name.clone(),
            audit_log_id: entry.id,
            success: applied.is_ok(),
            result: None,
            error: None,
            warnings: Vec::new(),
        };

        match applied {
            Ok(output) => {
                executed.result = Some(output.clone());
                if let Err(e) = self.audit.succeed(&entry.id, output).await {
                    warn!(
                        audit_id = %entry.id,
                        household = %household,
                        error = %e,
                        "action applied but its audit entry could not be completed"
                    );
                    let note = format!("applied, but the audit entry was not completed: {e}");
                    if let Err(e) = self.audit.fail(&entry.id, note.clone()).await {
                        warn!(audit_id = %entry.id, error = %e, "audit entry left STARTED");
                    }
                    executed.warnings.push(note);
                    return ActionRun::Unrecorded {
                        applied: Some(executed),
                        error: e.into(),
                    };
                }
                if origin == ExecutionOrigin::Proposal
                    && let Err(e) = self
                        .trust
                        .record_execution(&household, self.clock.now())
                        .await
                {
                    warn!(
                        household = %household,
                        error = %e,
                        "failed to count execution in trust window"
                    );
                    executed
                        .warnings
                        .push(format!("not counted in the rate window: {e}"));
                }
            },
            Err(message) => {
                if let Err(e) = self.audit.fail(&entry.id, message.clone()).await {
                    warn!(
                        audit_id = %entry.id,
                        household = %household,
                        error = %e,
                        "failed action could not be recorded"
                    );
                    executed
                        .warnings
                        .push(format!("audit entry was not completed: {e}"));
                }
                executed.error = Some(message);
            },
        }
        ActionRun::Recorded(executed)
    }
}

/// What happened to one action, from the audit log's point of view.
enum ActionRun {
    /// The attempt is fully recorded.
    Recorded(ExecutedAction),
    /// The audit log rejected a write. `applied` is set when the mutation
    /// ran before the failure.
    Unrecorded {
        applied: Option<ExecutedAction>,
        error: ApprovalError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::{ProposalStatus, ProposalStore};
    use crate::risk::RiskClassifier;
    use crate::trust::{
        HouseholdAiTrust, KvTrustStore, TrustDecision, TrustDefaults, TrustSettingsUpdate,
        TrustStore,
    };
    use hearth_audit::{AuditStatus, KvAuditStorage};
    use hearth_core::{ManualClock, SessionId};
    use hearth_household::{FunctionIntent, KvHouseholdData, ShoppingItem};
    use hearth_storage::{KvStore, MemoryKvStore};
    use serde_json::json;

    struct Fixture {
        executor: ProposalExecutor,
        proposals: ProposalStore,
        audit: AuditLog,
        data: KvHouseholdData,
        trust: TrustEvaluator,
        classifier: RiskClassifier,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let data = KvHouseholdData::new(Arc::clone(&store), clock.clone());
        let audit = AuditLog::new(
            Arc::new(KvAuditStorage::new(Arc::clone(&store)).unwrap()),
            clock.clone(),
        );
        let classifier = RiskClassifier::new();
        let trust = TrustEvaluator::new(
            classifier.clone(),
            Arc::new(KvTrustStore::new(Arc::clone(&store)).unwrap()),
            TrustDefaults::default(),
        );
        let executor = ProposalExecutor::new(
            Arc::new(data.clone()),
            audit.clone(),
            trust.clone(),
            clock.clone(),
        );
        let proposals = ProposalStore::new(store, clock.clone(), 600).unwrap();
        Fixture {
            executor,
            proposals,
            audit,
            data,
            trust,
            classifier,
            clock,
        }
    }

    impl Fixture {
        fn action(&self, name: &str, arguments: serde_json::Value) -> ProposedAction {
            let call = FunctionCall::from_intent(&FunctionIntent::new(name, arguments))
                .unwrap()
                .normalize();
            ProposedAction::from_call(&call, &self.classifier.classify(name))
        }

        async fn approved(&self, hh: HouseholdId, actions: Vec<ProposedAction>) -> AiProposal {
            let p = self
                .proposals
                .create_proposal(hh, SessionId::new(), actions)
                .await
                .unwrap();
            self.proposals.approve(&hh, &p.id, None, None).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_executes_in_order_and_audits() {
        let f = fixture();
        let hh = HouseholdId::new();
        let add = f.action("add_shopping_item", json!({"id": "milk", "name": "milk"}));
        let check = f.action("check_shopping_item", json!({"id": "milk"}));
        let p = f.approved(hh, vec![add, check]).await;

        let result = f.executor.execute(&p, None).await.unwrap();
        assert_eq!(result.outcome(), ExecutionOutcome::Completed);
        assert_eq!(result.succeeded(), 2);

        let item: ShoppingItem = f.data.get(hh, "milk").await.unwrap().unwrap();
        assert!(item.checked);

        let entries = f.audit.household_entries(&hh).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.status == AuditStatus::Succeeded));
        assert_eq!(entries[0].proposal_id, Some(p.id));
        assert_eq!(
            entries.iter().map(|e| e.id).collect::<Vec<_>>(),
            result.audit_log_ids()
        );
        // Proposal executions count toward the household's window.
        assert_eq!(f.trust.remaining_actions(&hh, f.clock.now()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let f = fixture();
        let hh = HouseholdId::new();
        let actions = vec![
            f.action("add_shopping_item", json!({"name": "eggs"})),
            f.action("remove_inventory_item", json!({"id": "missing"})),
            f.action("add_shopping_item", json!({"name": "bread"})),
            f.action("create_recipe", json!({"name": "Tortilla"})),
        ];
        let p = f.approved(hh, actions).await;

        let result = f.executor.execute(&p, Some(UserId::new())).await.unwrap();
        assert_eq!(result.outcome(), ExecutionOutcome::Partial);
        assert_eq!(result.failed_at, Some(1));
        assert_eq!(result.executed_actions.len(), 2);
        assert!(result.executed_actions[0].success);
        assert!(!result.executed_actions[1].success);
        assert!(result.error.as_deref().unwrap().contains("missing"));

        let entries = f.audit.household_entries(&hh).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].status, AuditStatus::Failed);
        assert_eq!(f.data.list::<ShoppingItem>(hh).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_action_is_audited_as_failed() {
        let f = fixture();
        let hh = HouseholdId::new();
        let mut action = f.action("add_shopping_item", json!({"name": "milk"}));
        action.arguments = json!({"quantity": "lots"});

        let result = f
            .executor
            .execute_action(hh, &action, None, ExecutionOrigin::AutoApproved)
            .await
            .unwrap();
        assert_eq!(result.outcome(), ExecutionOutcome::NothingApplied);
        assert_eq!(result.failed_at, Some(0));

        let entries = f.audit.household_entries(&hh).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, AuditStatus::Failed);
        assert!(entries[0].pre_state.is_none());
    }

    #[tokio::test]
    async fn test_reversible_actions_capture_pre_state() {
        let f = fixture();
        let hh = HouseholdId::new();
        let action = f.action("add_shopping_item", json!({"id": "oil", "name": "oil"}));
        f.executor
            .execute_action(hh, &action, None, ExecutionOrigin::AutoApproved)
            .await
            .unwrap();

        let entry = &f.audit.household_entries(&hh).await.unwrap()[0];
        let snapshot = entry.pre_state.as_ref().unwrap();
        assert_eq!(snapshot.entities.len(), 1);
        assert!(snapshot.entities[0].state.is_none());
        assert!(entry.action_id.is_none());
        // Auto-approved actions reserve their own slot; the executor does not count them.
        assert_eq!(f.trust.remaining_actions(&hh, f.clock.now()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_irreversible_actions_skip_pre_state() {
        let f = fixture();
        let hh = HouseholdId::new();
        let reset = f.action("reset_inventory", json!({}));
        let p = f.approved(hh, vec![reset]).await;
        let result = f.executor.execute(&p, None).await.unwrap();
        assert_eq!(result.outcome(), ExecutionOutcome::Completed);
        let entry = &f.audit.household_entries(&hh).await.unwrap()[0];
        assert!(entry.pre_state.is_none());
        assert!(!entry.is_undoable());
    }

    #[tokio::test]
    async fn test_refuses_unapproved_proposal() {
        let f = fixture();
        let hh = HouseholdId::new();
        let p = f
            .proposals
            .create_proposal(
                hh,
                SessionId::new(),
                vec![f.action("add_shopping_item", json!({"name": "milk"}))],
            )
            .await
            .unwrap();
        assert_eq!(p.status, ProposalStatus::Pending);
        assert!(matches!(
            f.executor.execute(&p, None).await,
            Err(ApprovalError::InvalidState { .. })
        ));
        assert!(f.audit.household_entries(&hh).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_without_id_can_be_undone() {
        use crate::rollback::RollbackEngine;

        let f = fixture();
        let hh = HouseholdId::new();
        // Built from the raw intent, so the stored arguments carry no id.
        let call = FunctionCall::from_intent(&FunctionIntent::new(
            "add_shopping_item",
            json!({"name": "salt"}),
        ))
        .unwrap();
        let action = ProposedAction::from_call(&call, &f.classifier.classify("add_shopping_item"));

        let result = f
            .executor
            .execute_action(hh, &action, None, ExecutionOrigin::AutoApproved)
            .await
            .unwrap();
        let entry = f
            .audit
            .get(&hh, &result.executed_actions[0].audit_log_id)
            .await
            .unwrap()
            .unwrap();
        let id = entry.arguments["id"].as_str().unwrap().to_owned();
        assert!(!id.is_empty());
        assert_eq!(entry.pre_state.as_ref().unwrap().entities.len(), 1);
        assert!(f.data.get::<ShoppingItem>(hh, &id).await.unwrap().is_some());

        let rollback = RollbackEngine::new(
            Arc::new(f.data.clone()),
            f.audit.clone(),
            f.clock.clone(),
            300,
        );
        rollback.undo(hh, &entry.id, None).await.unwrap();
        assert!(f.data.list::<ShoppingItem>(hh).await.unwrap().is_empty());
    }

    /// Delegates to a real store but cannot count executions.
    struct UncountedTrust(KvTrustStore);

    #[async_trait::async_trait]
    impl TrustStore for UncountedTrust {
        async fn load(&self, household: &HouseholdId) -> ApprovalResult<Option<HouseholdAiTrust>> {
            self.0.load(household).await
        }

        async fn save(&self, trust: &HouseholdAiTrust) -> ApprovalResult<()> {
            self.0.save(trust).await
        }

        async fn reserve_slot(
            &self,
            household: &HouseholdId,
            defaults: &TrustDefaults,
            now: hearth_core::Timestamp,
            decide: &(dyn for<'r> Fn(&'r HouseholdAiTrust) -> TrustDecision + Send + Sync),
        ) -> ApprovalResult<TrustDecision> {
            self.0.reserve_slot(household, defaults, now, decide).await
        }

        async fn record_execution(
            &self,
            _household: &HouseholdId,
            _defaults: &TrustDefaults,
            _now: hearth_core::Timestamp,
        ) -> ApprovalResult<()> {
            Err(ApprovalError::Storage("trust store offline".into()))
        }

        async fn update_settings(
            &self,
            household: &HouseholdId,
            defaults: &TrustDefaults,
            update: &TrustSettingsUpdate,
            now: hearth_core::Timestamp,
        ) -> ApprovalResult<HouseholdAiTrust> {
            self.0.update_settings(household, defaults, update, now).await
        }
    }

    #[tokio::test]
    async fn test_uncounted_execution_is_reported() {
        let f = fixture();
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let trust = TrustEvaluator::new(
            f.classifier.clone(),
            Arc::new(UncountedTrust(KvTrustStore::new(store).unwrap())),
            TrustDefaults::default(),
        );
        let executor = ProposalExecutor::new(
            Arc::new(f.data.clone()),
            f.audit.clone(),
            trust,
            f.clock.clone(),
        );
        let hh = HouseholdId::new();
        let p = f
            .approved(hh, vec![f.action("add_shopping_item", json!({"name": "milk"}))])
            .await;

        let result = executor.execute(&p, None).await.unwrap();
        assert_eq!(result.outcome(), ExecutionOutcome::Completed);
        let action = &result.executed_actions[0];
        assert!(action.success);
        assert_eq!(action.warnings.len(), 1);
        assert!(action.warnings[0].contains("rate window"));
        assert_eq!(
            f.audit.get(&hh, &action.audit_log_id).await.unwrap().unwrap().status,
            AuditStatus::Succeeded
        );
    }
}
