//! Pending proposals awaiting a human decision.
//!
//! ```text
//! PENDING ──► APPROVED
//!    │──────► PARTIALLY_APPROVED
//!    │──────► REJECTED
//!    └──────► EXPIRED
//! ```
//!
//! Every state leaving PENDING is terminal. Expiry is evaluated lazily: the
//! first read or decision after `expires_at` writes EXPIRED back. All
//! writes are compare-and-swap against the bytes that were read, so of two
//! concurrent decisions exactly one wins.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use hearth_core::{
    ActionId, Clock, HouseholdId, ProposalId, RiskLevel, SessionId, Timestamp, UserId,
};
use hearth_household::FunctionCall;
use hearth_storage::{KvStore, KvWrite, ScopedKvStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ApprovalError, ApprovalResult};
use crate::risk::FunctionConfig;

const NS_PROPOSALS: &str = "ai:proposals";
const NS_PROPOSAL_INDEX: &str = "ai:proposal_index";

/// Retries of a proposal or index compare-and-swap before giving up.
const PROPOSAL_CAS_ATTEMPTS: usize = 64;

/// Default proposal lifetime.
pub const DEFAULT_PROPOSAL_TTL_SECS: u64 = 600;

/// One action inside a proposal.
///
/// Risk and reversibility are copied from the classifier when the proposal
/// is built; later configuration changes do not affect them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedAction {
    /// Action id, used for partial approval.
    pub id: ActionId,
    /// Catalog function name.
    pub function_name: String,
    /// Normalized arguments.
    pub arguments: Value,
    /// Risk at proposal time.
    pub risk_level: RiskLevel,
    /// Reversibility at proposal time.
    pub is_reversible: bool,
    /// English description.
    pub description: String,
    /// Spanish description.
    pub description_es: String,
}

impl ProposedAction {
    /// Build an action from a validated call and its classification.
    #[must_use]
    pub fn from_call(call: &FunctionCall, config: &FunctionConfig) -> Self {
        Self {
            id: ActionId::new(),
            function_name: call.function().as_str().to_owned(),
            arguments: call.arguments(),
            risk_level: config.risk_level,
            is_reversible: config.is_reversible,
            description: call.describe(),
            description_es: call.describe_es(),
        }
    }
}

/// Lifecycle state of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    /// Waiting for a decision.
    Pending,
    /// Every action approved.
    Approved,
    /// A strict subset approved; the rest discarded.
    PartiallyApproved,
    /// Discarded by a member.
    Rejected,
    /// Not decided before `expires_at`.
    Expired,
}

impl ProposalStatus {
    /// Whether the proposal may be executed.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved | Self::PartiallyApproved)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::PartiallyApproved => "PARTIALLY_APPROVED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// A batch of actions awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiProposal {
    /// Proposal id.
    pub id: ProposalId,
    /// Owning household.
    pub household_id: HouseholdId,
    /// Assistant session that produced it.
    pub session_id: SessionId,
    /// Short human-readable summary.
    pub summary: String,
    /// Actions to run, in order. Filtered on partial approval.
    pub actions: Vec<ProposedAction>,
    /// Highest risk among the actions.
    pub risk_level: RiskLevel,
    /// Lifecycle state.
    pub status: ProposalStatus,
    /// Creation time.
    pub created_at: Timestamp,
    /// Decision deadline, fixed at creation.
    pub expires_at: Timestamp,
    /// When it left PENDING.
    pub resolved_at: Option<Timestamp>,
    /// Who decided.
    pub resolved_by: Option<UserId>,
    /// When execution was claimed.
    pub executed_at: Option<Timestamp>,
}

impl AiProposal {
    /// Whether the decision deadline has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    fn ensure_pending(&self, now: Timestamp) -> ApprovalResult<()> {
        match self.status {
            ProposalStatus::Pending if self.is_expired_at(now) => Err(self.expired_error()),
            ProposalStatus::Pending => Ok(()),
            ProposalStatus::Expired => Err(self.expired_error()),
            status => Err(ApprovalError::AlreadyResolved {
                id: self.id.to_string(),
                status: status.to_string(),
            }),
        }
    }

    fn expired_error(&self) -> ApprovalError {
        ApprovalError::Expired {
            what: format!("proposal {}", self.id),
        }
    }

    fn resolve(&mut self, status: ProposalStatus, by: Option<UserId>, now: Timestamp) {
        self.status = status;
        self.resolved_at = Some(now);
        self.resolved_by = by;
    }

    /// Apply an approval with an optional selection.
    fn approve(
        &mut self,
        selected: Option<&[ActionId]>,
        by: Option<UserId>,
        now: Timestamp,
    ) -> ApprovalResult<()> {
        let Some(selected) = selected else {
            self.resolve(ProposalStatus::Approved, by, now);
            return Ok(());
        };
        if selected.is_empty() {
            return Err(ApprovalError::invalid_selection("no actions selected"));
        }
        let known: HashSet<ActionId> = self.actions.iter().map(|a| a.id).collect();
        let chosen: HashSet<ActionId> = selected.iter().copied().collect();
        let mut unknown: Vec<String> = chosen
            .difference(&known)
            .map(ToString::to_string)
            .collect();
        if !unknown.is_empty() {
            unknown.sort();
            return Err(ApprovalError::invalid_selection(format!(
                "unknown action ids: {}",
                unknown.join(", ")
            )));
        }
        if chosen.len() == known.len() {
            self.resolve(ProposalStatus::Approved, by, now);
        } else {
            self.actions.retain(|a| chosen.contains(&a.id));
            self.risk_level = max_risk(&self.actions);
            self.resolve(ProposalStatus::PartiallyApproved, by, now);
        }
        Ok(())
    }
}

fn max_risk(actions: &[ProposedAction]) -> RiskLevel {
    RiskLevel::max_of(actions.iter().map(|a| a.risk_level)).unwrap_or(RiskLevel::Low)
}

fn summarize(actions: &[ProposedAction]) -> String {
    match actions {
        [only] => only.description.clone(),
        [first, rest @ ..] => format!("{} (+{} more)", first.description, rest.len()),
        [] => String::new(),
    }
}

/// Stores proposals in `ai:proposals`, with a per-household id list in
/// `ai:proposal_index`.
#[derive(Clone)]
pub struct ProposalStore {
    records: ScopedKvStore,
    index: ScopedKvStore,
    clock: Arc<dyn Clock>,
    ttl_secs: u64,
}

impl fmt::Debug for ProposalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProposalStore")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl ProposalStore {
    /// Create a proposal store over `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespaces are rejected by the store.
    pub fn new(
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        ttl_secs: u64,
    ) -> ApprovalResult<Self> {
        Ok(Self {
            records: ScopedKvStore::new(Arc::clone(&store), NS_PROPOSALS)?,
            index: ScopedKvStore::new(store, NS_PROPOSAL_INDEX)?,
            clock,
            ttl_secs,
        })
    }

    /// Proposal lifetime in seconds.
    #[must_use]
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Create a PENDING proposal with a summary built from the actions.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidSelection`] for an empty action list,
    /// or a storage error.
    pub async fn create_proposal(
        &self,
        household: HouseholdId,
        session: SessionId,
        actions: Vec<ProposedAction>,
    ) -> ApprovalResult<AiProposal> {
        self.create_proposal_with_summary(household, session, actions, None)
            .await
    }

    /// Create a PENDING proposal.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidSelection`] for an empty action list,
    /// or a storage error.
    pub async fn create_proposal_with_summary(
        &self,
        household: HouseholdId,
        session: SessionId,
        actions: Vec<ProposedAction>,
        summary: Option<String>,
    ) -> ApprovalResult<AiProposal> {
        if actions.is_empty() {
            return Err(ApprovalError::invalid_selection(
                "a proposal needs at least one action",
            ));
        }
        let now = self.clock.now();
        let expires_at = now
            .checked_add_secs(self.ttl_secs)
            .ok_or_else(|| ApprovalError::Internal("proposal expiry overflows".into()))?;
        let proposal = AiProposal {
            id: ProposalId::new(),
            household_id: household,
            session_id: session,
            summary: summary.unwrap_or_else(|| summarize(&actions)),
            risk_level: max_risk(&actions),
            actions,
            status: ProposalStatus::Pending,
            created_at: now,
            expires_at,
            resolved_at: None,
            resolved_by: None,
            executed_at: None,
        };

        let key = proposal.id.0.to_string();
        if !self
            .records
            .compare_and_swap_json(&key, None, &proposal)
            .await?
        {
            return Err(ApprovalError::Internal(format!(
                "proposal id collision: {}",
                proposal.id
            )));
        }
        self.update_index(&household, |ids| {
            ids.push(proposal.id);
            true
        })
        .await?;

        info!(
            proposal = %proposal.id,
            household = %household,
            actions = proposal.actions.len(),
            risk = %proposal.risk_level,
            "proposal created"
        );
        Ok(proposal)
    }

    /// Get a proposal, normalizing it to EXPIRED if its deadline passed.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::NotFound`] for unknown ids and for ids owned
    /// by another household.
    pub async fn get_proposal(
        &self,
        household: &HouseholdId,
        id: &ProposalId,
    ) -> ApprovalResult<AiProposal> {
        for _ in 0..PROPOSAL_CAS_ATTEMPTS {
            let (mut proposal, raw) = self.load(household, id).await?;
            let now = self.clock.now();
            if proposal.status != ProposalStatus::Pending || !proposal.is_expired_at(now) {
                return Ok(proposal);
            }
            proposal.resolve(ProposalStatus::Expired, None, now);
            if self.swap(&proposal, raw).await? {
                info!(proposal = %id, household = %household, "proposal expired");
                return Ok(proposal);
            }
        }
        Err(contention(id))
    }

    /// Approve all actions (`selected = None`) or a subset.
    ///
    /// # Errors
    ///
    /// - [`ApprovalError::NotFound`] for unknown or foreign proposals
    /// - [`ApprovalError::Expired`] past the deadline
    /// - [`ApprovalError::AlreadyResolved`] if already decided
    /// - [`ApprovalError::InvalidSelection`] for an empty or unknown selection
    pub async fn approve(
        &self,
        household: &HouseholdId,
        id: &ProposalId,
        selected: Option<&[ActionId]>,
        by: Option<UserId>,
    ) -> ApprovalResult<AiProposal> {
        let proposal = self
            .decide(household, id, |p, now| p.approve(selected, by, now))
            .await?;
        info!(
            proposal = %id,
            household = %household,
            status = %proposal.status,
            actions = proposal.actions.len(),
            "proposal approved"
        );
        Ok(proposal)
    }

    /// Reject a pending proposal.
    ///
    /// # Errors
    ///
    /// Same as [`approve`](Self::approve), minus selection errors.
    pub async fn reject(
        &self,
        household: &HouseholdId,
        id: &ProposalId,
        by: Option<UserId>,
    ) -> ApprovalResult<AiProposal> {
        let proposal = self
            .decide(household, id, |p, now| {
                p.resolve(ProposalStatus::Rejected, by, now);
                Ok(())
            })
            .await?;
        info!(proposal = %id, household = %household, "proposal rejected");
        Ok(proposal)
    }

    /// Run a decision against a PENDING proposal and write it back.
    async fn decide<F>(
        &self,
        household: &HouseholdId,
        id: &ProposalId,
        apply: F,
    ) -> ApprovalResult<AiProposal>
    where
        F: Fn(&mut AiProposal, Timestamp) -> ApprovalResult<()> + Send + Sync,
    {
        for attempt in 0..PROPOSAL_CAS_ATTEMPTS {
            let (mut proposal, raw) = self.load(household, id).await?;
            let now = self.clock.now();
            if let Err(e) = proposal.ensure_pending(now) {
                if proposal.status == ProposalStatus::Pending {
                    // Past the deadline: persist EXPIRED before reporting it.
                    let mut expired = proposal.clone();
                    expired.resolve(ProposalStatus::Expired, None, now);
                    if !self.swap(&expired, raw).await? {
                        continue;
                    }
                    info!(proposal = %id, household = %household, "proposal expired");
                }
                return Err(e);
            }
            apply(&mut proposal, now)?;
            if self.swap(&proposal, raw).await? {
                return Ok(proposal);
            }
            debug!(proposal = %id, attempt, "proposal changed concurrently; re-reading");
        }
        Err(contention(id))
    }

    /// Mark an approved proposal as being executed.
    ///
    /// # Errors
    ///
    /// - [`ApprovalError::InvalidState`] unless APPROVED or PARTIALLY_APPROVED
    /// - [`ApprovalError::AlreadyResolved`] if execution was already claimed
    pub async fn claim_for_execution(
        &self,
        household: &HouseholdId,
        id: &ProposalId,
    ) -> ApprovalResult<AiProposal> {
        for _ in 0..PROPOSAL_CAS_ATTEMPTS {
            let (mut proposal, raw) = self.load(household, id).await?;
            if !proposal.status.is_approved() {
                return Err(ApprovalError::invalid_state(format!(
                    "proposal {id} is {} and cannot be executed",
                    proposal.status
                )));
            }
            if proposal.executed_at.is_some() {
                return Err(ApprovalError::AlreadyResolved {
                    id: id.to_string(),
                    status: "already executed".to_owned(),
                });
            }
            proposal.executed_at = Some(self.clock.now());
            if self.swap(&proposal, raw).await? {
                debug!(proposal = %id, "proposal claimed for execution");
                return Ok(proposal);
            }
        }
        Err(contention(id))
    }

    /// Every proposal of a household, oldest first, with lazy expiry applied.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list(&self, household: &HouseholdId) -> ApprovalResult<Vec<AiProposal>> {
        let mut out = Vec::new();
        for id in self.household_ids(household).await? {
            match self.get_proposal(household, &id).await {
                Ok(p) => out.push(p),
                Err(ApprovalError::NotFound { .. }) => {
                    warn!(proposal = %id, "proposal index points at a missing record");
                },
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    /// Pending proposals of a household, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_pending(&self, household: &HouseholdId) -> ApprovalResult<Vec<AiProposal>> {
        Ok(self
            .list(household)
            .await?
            .into_iter()
            .filter(|p| p.status == ProposalStatus::Pending)
            .collect())
    }

    /// Delete finished proposals resolved before `cutoff`. Approved
    /// proposals that were never executed are kept.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn purge_resolved_before(
        &self,
        household: &HouseholdId,
        cutoff: Timestamp,
    ) -> ApprovalResult<usize> {
        let doomed: Vec<ProposalId> = self
            .list(household)
            .await?
            .into_iter()
            .filter(|p| {
                let finished = match p.status {
                    ProposalStatus::Rejected | ProposalStatus::Expired => true,
                    ProposalStatus::Approved | ProposalStatus::PartiallyApproved => {
                        p.executed_at.is_some()
                    },
                    ProposalStatus::Pending => false,
                };
                finished && p.resolved_at.is_some_and(|at| at < cutoff)
            })
            .map(|p| p.id)
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        self.records
            .write_batch(
                doomed
                    .iter()
                    .map(|id| KvWrite::delete(id.0.to_string()))
                    .collect(),
            )
            .await?;
        let gone: HashSet<ProposalId> = doomed.iter().copied().collect();
        self.update_index(household, |ids| {
            ids.retain(|id| !gone.contains(id));
            true
        })
        .await?;
        info!(household = %household, purged = doomed.len(), "purged resolved proposals");
        Ok(doomed.len())
    }

    async fn load(
        &self,
        household: &HouseholdId,
        id: &ProposalId,
    ) -> ApprovalResult<(AiProposal, Vec<u8>)> {
        let not_found = || ApprovalError::NotFound {
            resource: "proposal",
            id: id.to_string(),
        };
        let (proposal, raw) = self
            .records
            .get_json_versioned::<AiProposal>(&id.0.to_string())
            .await?
            .ok_or_else(not_found)?;
        if &proposal.household_id != household {
            return Err(not_found());
        }
        Ok((proposal, raw))
    }

    async fn swap(&self, proposal: &AiProposal, expected: Vec<u8>) -> ApprovalResult<bool> {
        Ok(self
            .records
            .compare_and_swap_json(&proposal.id.0.to_string(), Some(expected), proposal)
            .await?)
    }

    async fn household_ids(&self, household: &HouseholdId) -> ApprovalResult<Vec<ProposalId>> {
        Ok(self
            .index
            .get_json(&household.0.to_string())
            .await?
            .unwrap_or_default())
    }

    async fn update_index<F>(&self, household: &HouseholdId, mut change: F) -> ApprovalResult<()>
    where
        F: FnMut(&mut Vec<ProposalId>) -> bool + Send,
    {
        let key = household.0.to_string();
        for _ in 0..PROPOSAL_CAS_ATTEMPTS {
            let (mut ids, raw) = match self
                .index
                .get_json_versioned::<Vec<ProposalId>>(&key)
                .await?
            {
                Some((ids, raw)) => (ids, Some(raw)),
                None => (Vec::new(), None),
            };
            if !change(&mut ids) {
                return Ok(());
            }
            if self.index.compare_and_swap_json(&key, raw, &ids).await? {
                return Ok(());
            }
        }
        Err(ApprovalError::Internal(format!(
            "proposal index for {household} kept conflicting"
        )))
    }
}

fn contention(id: &ProposalId) -> ApprovalError {
    warn!(proposal = %id, "proposal kept conflicting");
    ApprovalError::Internal(format!(
        "proposal {id} kept changing after {PROPOSAL_CAS_ATTEMPTS} attempts"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::ManualClock;
    use hearth_storage::MemoryKvStore;
    use serde_json::json;

    fn store() -> (ProposalStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let store = ProposalStore::new(
            Arc::new(MemoryKvStore::new()),
            clock.clone(),
            DEFAULT_PROPOSAL_TTL_SECS,
        )
        .unwrap();
        (store, clock)
    }

    fn action(name: &str, risk: RiskLevel) -> ProposedAction {
        ProposedAction {
            id: ActionId::new(),
            function_name: "add_shopping_item".into(),
            arguments: json!({"name": name}),
            risk_level: risk,
            is_reversible: true,
            description: format!("Add {name}"),
            description_es: format!("Añadir {name}"),
        }
    }

    async fn pending(store: &ProposalStore, hh: HouseholdId, n: usize) -> AiProposal {
        let risks = [RiskLevel::Low, RiskLevel::High, RiskLevel::Medium, RiskLevel::Low];
        let actions = risks
            .iter()
            .cycle()
            .take(n)
            .enumerate()
            .map(|(i, risk)| action(&format!("item{i}"), *risk))
            .collect();
        store
            .create_proposal(hh, SessionId::new(), actions)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_sets_risk_ttl_and_summary() {
        let (store, clock) = store();
        let p = pending(&store, HouseholdId::new(), 3).await;
        assert_eq!(p.status, ProposalStatus::Pending);
        assert_eq!(p.risk_level, RiskLevel::High);
        assert_eq!(p.expires_at, clock.now().checked_add_secs(600).unwrap());
        assert_eq!(p.summary, "Add item0 (+2 more)");
    }

    #[tokio::test]
    async fn test_empty_proposal_rejected() {
        let (store, _) = store();
        let err = store
            .create_proposal(HouseholdId::new(), SessionId::new(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::InvalidSelection { .. }));
    }

    #[tokio::test]
    async fn test_second_decision_is_already_resolved() {
        let (store, _) = store();
        let hh = HouseholdId::new();
        let p = pending(&store, hh, 2).await;

        let approved = store.approve(&hh, &p.id, None, None).await.unwrap();
        assert_eq!(approved.status, ProposalStatus::Approved);

        assert!(matches!(
            store.approve(&hh, &p.id, None, None).await,
            Err(ApprovalError::AlreadyResolved { .. })
        ));
        assert!(matches!(
            store.reject(&hh, &p.id, None).await,
            Err(ApprovalError::AlreadyResolved { .. })
        ));
        assert_eq!(store.get_proposal(&hh, &p.id).await.unwrap(), approved);
    }

    #[tokio::test]
    async fn test_reject_then_approve() {
        let (store, _) = store();
        let hh = HouseholdId::new();
        let p = pending(&store, hh, 1).await;
        let by = UserId::new();
        let rejected = store.reject(&hh, &p.id, Some(by)).await.unwrap();
        assert_eq!(rejected.status, ProposalStatus::Rejected);
        assert_eq!(rejected.resolved_by, Some(by));
        assert!(matches!(
            store.approve(&hh, &p.id, None, None).await,
            Err(ApprovalError::AlreadyResolved { .. })
        ));
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let (store, clock) = store();
        let hh = HouseholdId::new();
        let on_time = pending(&store, hh, 1).await;
        let late = pending(&store, hh, 1).await;

        clock.advance_secs(600);
        // Exactly at the deadline it is still open.
        store.approve(&hh, &on_time.id, None, None).await.unwrap();

        clock.advance_secs(1);
        assert!(matches!(
            store.approve(&hh, &late.id, None, None).await,
            Err(ApprovalError::Expired { .. })
        ));
        let stored = store.get_proposal(&hh, &late.id).await.unwrap();
        assert_eq!(stored.status, ProposalStatus::Expired);
        assert!(matches!(
            store.reject(&hh, &late.id, None).await,
            Err(ApprovalError::Expired { .. })
        ));
    }

    #[tokio::test]
    async fn test_read_normalizes_expired() {
        let (store, clock) = store();
        let hh = HouseholdId::new();
        let p = pending(&store, hh, 1).await;
        clock.advance_secs(601);
        let read = store.get_proposal(&hh, &p.id).await.unwrap();
        assert_eq!(read.status, ProposalStatus::Expired);
        assert_eq!(read.resolved_at, Some(clock.now()));
        assert!(store.list_pending(&hh).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_approval_keeps_order() {
        let (store, _) = store();
        let hh = HouseholdId::new();
        let p = pending(&store, hh, 4).await;
        let ids: Vec<ActionId> = p.actions.iter().map(|a| a.id).collect();

        // Selection order and duplicates do not matter.
        let selected = [ids[3], ids[0], ids[3]];
        let approved = store
            .approve(&hh, &p.id, Some(&selected), None)
            .await
            .unwrap();
        assert_eq!(approved.status, ProposalStatus::PartiallyApproved);
        let kept: Vec<ActionId> = approved.actions.iter().map(|a| a.id).collect();
        assert_eq!(kept, vec![ids[0], ids[3]]);
        assert_eq!(approved.risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_full_selection_is_plain_approval() {
        let (store, _) = store();
        let hh = HouseholdId::new();
        let p = pending(&store, hh, 2).await;
        let ids: Vec<ActionId> = p.actions.iter().rev().map(|a| a.id).collect();
        let approved = store.approve(&hh, &p.id, Some(&ids), None).await.unwrap();
        assert_eq!(approved.status, ProposalStatus::Approved);
        assert_eq!(approved.actions, p.actions);
    }

    #[tokio::test]
    async fn test_invalid_selection_leaves_proposal_pending() {
        let (store, _) = store();
        let hh = HouseholdId::new();
        let p = pending(&store, hh, 2).await;
        assert!(matches!(
            store.approve(&hh, &p.id, Some(&[]), None).await,
            Err(ApprovalError::InvalidSelection { .. })
        ));
        assert!(matches!(
            store
                .approve(&hh, &p.id, Some(&[p.actions[0].id, ActionId::new()]), None)
                .await,
            Err(ApprovalError::InvalidSelection { .. })
        ));
        assert_eq!(
            store.get_proposal(&hh, &p.id).await.unwrap().status,
            ProposalStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_other_household_sees_not_found() {
        let (store, _) = store();
        let hh = HouseholdId::new();
        let p = pending(&store, hh, 1).await;
        let stranger = HouseholdId::new();
        assert!(matches!(
            store.get_proposal(&stranger, &p.id).await,
            Err(ApprovalError::NotFound { .. })
        ));
        assert!(matches!(
            store.approve(&stranger, &p.id, None, None).await,
            Err(ApprovalError::NotFound { .. })
        ));
        assert!(store.list(&stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_claim_once() {
        let (store, _) = store();
        let hh = HouseholdId::new();
        let p = pending(&store, hh, 1).await;
        assert!(matches!(
            store.claim_for_execution(&hh, &p.id).await,
            Err(ApprovalError::InvalidState { .. })
        ));
        store.approve(&hh, &p.id, None, None).await.unwrap();
        let claimed = store.claim_for_execution(&hh, &p.id).await.unwrap();
        assert!(claimed.executed_at.is_some());
        assert!(matches!(
            store.claim_for_execution(&hh, &p.id).await,
            Err(ApprovalError::AlreadyResolved { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_decisions_single_winner() {
        let (store, _) = store();
        let store = Arc::new(store);
        let hh = HouseholdId::new();
        let p = pending(&store, hh, 1).await;
        let tasks = (0..10).map(|i| {
            let store = Arc::clone(&store);
            let id = p.id;
            tokio::spawn(async move {
                if i < 5 {
                    store.approve(&hh, &id, None, None).await
                } else {
                    store.reject(&hh, &id, None).await
                }
            })
        });
        let results = futures::future::join_all(tasks).await;
        let winners = results.iter().filter(|r| r.as_ref().unwrap().is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results.iter().all(|r| match r.as_ref().unwrap() {
            Ok(_) => true,
            Err(e) => matches!(e, ApprovalError::AlreadyResolved { .. }),
        }));
    }

    #[tokio::test]
    async fn test_purge() {
        let (store, clock) = store();
        let hh = HouseholdId::new();
        let rejected = pending(&store, hh, 1).await;
        let approved = pending(&store, hh, 1).await;
        let open = pending(&store, hh, 1).await;
        store.reject(&hh, &rejected.id, None).await.unwrap();
        store.approve(&hh, &approved.id, None, None).await.unwrap();

        clock.advance_secs(10);
        let purged = store.purge_resolved_before(&hh, clock.now()).await.unwrap();
        assert_eq!(purged, 1);
        let left: Vec<ProposalId> = store.list(&hh).await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(left, vec![approved.id, open.id]);
    }
}
