//! Engine harness with a manual clock and in-memory storage.

use std::sync::Arc;

use hearth_approval::{
    AiProposal, AssistantEngine, EngineSettings, ProposalDecision, ProposalExecutionResult,
};
use hearth_audit::{AuditStorage, KvAuditStorage};
use hearth_core::{Clock, HouseholdId, ManualClock, SessionId};
use hearth_household::{Entity, FunctionIntent, HouseholdData, KvHouseholdData};
use hearth_storage::{KvStore, MemoryKvStore};
use tempfile::TempDir;

use crate::mocks::{AuditFailurePlan, FailingAuditStorage, FailingHouseholdData, FailurePlan};

/// Create a temporary directory, removed on drop.
///
/// # Panics
///
/// Panics if the directory cannot be created.
#[must_use]
pub fn test_dir() -> TempDir {
    TempDir::with_prefix("hearth-test").expect("Failed to create temp directory")
}

/// Route `tracing` output to the test writer. Safe to call repeatedly.
pub fn setup_test_logging(filter: &str) {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// An [`AssistantEngine`] wired to one in-memory store and a
/// [`ManualClock`], with a household and session ready to use.
pub struct TestEngine {
    /// The engine under test.
    pub engine: AssistantEngine,
    /// Clock shared by every component.
    pub clock: Arc<ManualClock>,
    /// Direct access to household rows.
    pub data: KvHouseholdData,
    /// The shared store.
    pub store: Arc<dyn KvStore>,
    /// Failure-injecting wrapper, when built with a [`FailurePlan`].
    pub failing: Option<Arc<FailingHouseholdData>>,
    /// Failure-injecting audit storage, when built with an
    /// [`AuditFailurePlan`].
    pub failing_audit: Option<Arc<FailingAuditStorage>>,
    /// Default household.
    pub household: HouseholdId,
    /// Default session.
    pub session: SessionId,
}

impl std::fmt::Debug for TestEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestEngine")
            .field("engine", &self.engine)
            .field("household", &self.household)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEngine {
    /// Engine with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::build(EngineSettings::default(), None)
    }

    /// Engine with custom settings.
    #[must_use]
    pub fn with_settings(settings: EngineSettings) -> Self {
        Self::build(settings, None)
    }

    /// Engine whose household data fails according to `plan`.
    #[must_use]
    pub fn with_failures(plan: FailurePlan) -> Self {
        Self::build(EngineSettings::default(), Some(plan))
    }

    /// Engine whose audit writes fail according to `plan`.
    #[must_use]
    pub fn with_audit_failures(plan: AuditFailurePlan) -> Self {
        Self::assemble(EngineSettings::default(), None, Some(plan))
    }

    /// Engine with custom settings and failure injection.
    #[must_use]
    pub fn build(settings: EngineSettings, plan: Option<FailurePlan>) -> Self {
        Self::assemble(settings, plan, None)
    }

    /// Wire every component over one in-memory store.
    ///
    /// # Panics
    ///
    /// Panics if the audit storage or the engine cannot be built.
    fn assemble(
        settings: EngineSettings,
        plan: Option<FailurePlan>,
        audit_plan: Option<AuditFailurePlan>,
    ) -> Self {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let shared_clock: Arc<dyn Clock> = clock.clone();
        let data = KvHouseholdData::new(Arc::clone(&store), Arc::clone(&shared_clock));

        let failing = plan.map(|plan| {
            Arc::new(FailingHouseholdData::new(Arc::new(data.clone()), plan))
        });
        let household: Arc<dyn HouseholdData> = match &failing {
            Some(f) => f.clone(),
            None => Arc::new(data.clone()),
        };

        let audit_storage: Arc<dyn AuditStorage> = Arc::new(
            KvAuditStorage::new(Arc::clone(&store)).expect("Failed to create audit storage"),
        );
        let failing_audit = audit_plan
            .map(|plan| Arc::new(FailingAuditStorage::new(Arc::clone(&audit_storage), plan)));
        let audit_storage: Arc<dyn AuditStorage> = match &failing_audit {
            Some(f) => f.clone(),
            None => audit_storage,
        };

        let engine = AssistantEngine::builder()
            .store(Arc::clone(&store))
            .household(household)
            .audit_storage(audit_storage)
            .clock(shared_clock)
            .settings(settings)
            .build()
            .expect("Failed to build test engine");

        Self {
            engine,
            clock,
            data,
            store,
            failing,
            failing_audit,
            household: HouseholdId::new(),
            session: SessionId::new(),
        }
    }

    /// Write an entity straight into the default household.
    ///
    /// # Panics
    ///
    /// Panics if the write fails.
    pub async fn seed<E: Entity>(&self, entity: &E) {
        self.data
            .put(self.household, entity)
            .await
            .expect("Failed to seed entity");
    }

    /// Propose `intents` in the default household.
    ///
    /// # Panics
    ///
    /// Panics if the proposal is rejected.
    pub async fn propose(&self, intents: &[FunctionIntent]) -> AiProposal {
        self.engine
            .propose(self.household, self.session, intents)
            .await
            .expect("Failed to create proposal")
    }

    /// Propose, approve everything, and execute.
    ///
    /// # Panics
    ///
    /// Panics if any step before execution fails.
    pub async fn run_approved(&self, intents: &[FunctionIntent]) -> ProposalExecutionResult {
        let proposal = self.propose(intents).await;
        self.engine
            .resolve_proposal(
                self.household,
                &proposal.id,
                ProposalDecision::Approve { selected: None },
                None,
            )
            .await
            .expect("Failed to approve proposal");
        self.engine
            .execute_proposal(self.household, &proposal.id, None)
            .await
            .expect("Failed to execute proposal")
    }
}
