//! Per-household trust settings and the auto-approval decision.
//!
//! # Decision Flow
//!
//! 1. Classify the function through the [`RiskClassifier`]
//! 2. Load the household's [`HouseholdAiTrust`] (defaults if it has none)
//! 3. Drop window timestamps older than `window_seconds`
//! 4. Deny if the window is full, whatever the risk
//! 5. Deny [`RiskLevel::Critical`] unconditionally
//! 6. Deny above the household threshold or the function's own
//!    confirmation threshold; approve otherwise
//!
//! [`TrustEvaluator::should_auto_approve`] never writes. Only
//! [`TrustEvaluator::reserve`], used right before an execution, appends to
//! the window, and it does so atomically in the [`TrustStore`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::{HouseholdId, RiskLevel, Timestamp};
use hearth_storage::{KvStore, ScopedKvStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ApprovalError, ApprovalResult};
use crate::risk::{FunctionConfig, RiskClassifier};

const NS_TRUST: &str = "ai:household_trust";

/// Retries of the trust row compare-and-swap before giving up.
const TRUST_CAS_ATTEMPTS: usize = 64;

/// Trust settings used for households without a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustDefaults {
    /// Highest risk level executed without confirmation.
    pub auto_approve_threshold: RiskLevel,
    /// Executions allowed per window.
    pub max_actions_per_window: u32,
    /// Window length in seconds.
    pub window_seconds: u64,
}

impl Default for TrustDefaults {
    fn default() -> Self {
        Self {
            auto_approve_threshold: RiskLevel::Low,
            max_actions_per_window: 5,
            window_seconds: 60,
        }
    }
}

/// How much autonomy a household gives the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseholdAiTrust {
    /// Owning household.
    pub household_id: HouseholdId,
    /// Highest risk level executed without confirmation.
    pub auto_approve_threshold: RiskLevel,
    /// Executions allowed per window.
    pub max_actions_per_window: u32,
    /// Window length in seconds.
    pub window_seconds: u64,
    /// Execution times inside the current window, oldest first.
    pub recent_action_timestamps: Vec<Timestamp>,
    /// Last change to the row.
    pub updated_at: Timestamp,
}

impl HouseholdAiTrust {
    /// A fresh row carrying `defaults`.
    #[must_use]
    pub fn new(household_id: HouseholdId, defaults: &TrustDefaults, now: Timestamp) -> Self {
        Self {
            household_id,
            auto_approve_threshold: defaults.auto_approve_threshold,
            max_actions_per_window: defaults.max_actions_per_window,
            window_seconds: defaults.window_seconds,
            recent_action_timestamps: Vec::new(),
            updated_at: now,
        }
    }

    fn in_window(&self, ts: &Timestamp, now: Timestamp) -> bool {
        match now.checked_sub_secs(self.window_seconds) {
            Some(start) => *ts > start,
            None => true,
        }
    }

    /// Executions inside the window ending at `now`.
    #[must_use]
    pub fn recent_actions(&self, now: Timestamp) -> u32 {
        let n = self
            .recent_action_timestamps
            .iter()
            .filter(|ts| self.in_window(ts, now))
            .count();
        u32::try_from(n).unwrap_or(u32::MAX)
    }

    /// Executions still allowed inside the window ending at `now`.
    #[must_use]
    pub fn remaining_actions(&self, now: Timestamp) -> u32 {
        self.max_actions_per_window
            .saturating_sub(self.recent_actions(now))
    }

    /// Drop timestamps outside the window and keep at most
    /// `max_actions_per_window` of the newest.
    pub fn prune(&mut self, now: Timestamp) {
        let start = now.checked_sub_secs(self.window_seconds);
        self.recent_action_timestamps
            .retain(|ts| start.is_none_or(|start| *ts > start));
        let max = usize::try_from(self.max_actions_per_window).unwrap_or(usize::MAX);
        let excess = self.recent_action_timestamps.len().saturating_sub(max);
        if excess > 0 {
            self.recent_action_timestamps.drain(..excess);
        }
    }

    fn record(&mut self, now: Timestamp) {
        self.recent_action_timestamps.push(now);
        self.prune(now);
        self.updated_at = now;
    }
}

/// Why trust approved or denied an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionReason {
    /// Risk and rate are within the household's trust.
    WithinTrust,
    /// The rate window is full.
    RateLimited {
        /// Executions inside the window.
        recent: u32,
        /// Allowed executions per window.
        max: u32,
        /// Window length in seconds.
        window_seconds: u64,
    },
    /// Critical actions always need a human decision.
    CriticalCeiling,
    /// Risk is above the household threshold.
    AboveThreshold {
        /// The action's risk.
        risk: RiskLevel,
        /// The household's threshold.
        threshold: RiskLevel,
    },
    /// The function requires confirmation at this risk.
    ConfirmationRequired {
        /// The action's risk.
        risk: RiskLevel,
        /// The function's confirmation threshold.
        above: RiskLevel,
    },
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WithinTrust => write!(f, "within household trust"),
            Self::RateLimited {
                recent,
                max,
                window_seconds,
            } => write!(
                f,
                "rate limited ({recent}/{max} actions in {window_seconds}s)"
            ),
            Self::CriticalCeiling => write!(f, "critical actions always need confirmation"),
            Self::AboveThreshold { risk, threshold } => {
                write!(f, "{risk} risk is above the household threshold ({threshold})")
            },
            Self::ConfirmationRequired { risk, above } => {
                write!(f, "function needs confirmation at {above} risk or above ({risk} risk)")
            },
        }
    }
}

/// Outcome of a trust check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustDecision {
    /// Whether the action may run without confirmation.
    pub approve: bool,
    /// Why.
    pub reason: DecisionReason,
    /// Risk the decision was made at.
    pub risk_level: RiskLevel,
}

impl TrustDecision {
    /// Decide for `function` under `trust` at `now`. Pure.
    #[must_use]
    pub fn evaluate(function: &FunctionConfig, trust: &HouseholdAiTrust, now: Timestamp) -> Self {
        let risk = function.risk_level;
        let recent = trust.recent_actions(now);
        let reason = if recent >= trust.max_actions_per_window {
            DecisionReason::RateLimited {
                recent,
                max: trust.max_actions_per_window,
                window_seconds: trust.window_seconds,
            }
        } else if risk == RiskLevel::Critical {
            DecisionReason::CriticalCeiling
        } else if risk > trust.auto_approve_threshold {
            DecisionReason::AboveThreshold {
                risk,
                threshold: trust.auto_approve_threshold,
            }
        } else if function.requires_confirmation() {
            DecisionReason::ConfirmationRequired {
                risk,
                above: function.requires_confirmation_above,
            }
        } else {
            DecisionReason::WithinTrust
        };
        Self {
            approve: reason == DecisionReason::WithinTrust,
            reason,
            risk_level: risk,
        }
    }

    /// Whether the denial was caused by the rate window.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.reason, DecisionReason::RateLimited { .. })
    }

    /// Turn a denial into the matching error.
    #[must_use]
    pub fn into_error(self) -> ApprovalError {
        match self.reason {
            DecisionReason::RateLimited {
                recent,
                max,
                window_seconds,
            } => ApprovalError::RateLimited {
                recent,
                max,
                window_seconds,
            },
            reason => ApprovalError::NotAutoApproved { reason },
        }
    }
}

/// Changes to a household's trust settings. Unset fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSettingsUpdate {
    /// New threshold.
    pub auto_approve_threshold: Option<RiskLevel>,
    /// New window capacity (at least 1).
    pub max_actions_per_window: Option<u32>,
    /// New window length (at least 1 second).
    pub window_seconds: Option<u64>,
}

impl TrustSettingsUpdate {
    fn validate(&self) -> ApprovalResult<()> {
        if self.max_actions_per_window == Some(0) {
            return Err(ApprovalError::invalid_state(
                "max_actions_per_window must be at least 1",
            ));
        }
        if self.window_seconds == Some(0) {
            return Err(ApprovalError::invalid_state(
                "window_seconds must be at least 1",
            ));
        }
        Ok(())
    }

    fn apply_to(&self, trust: &mut HouseholdAiTrust, now: Timestamp) {
        if let Some(level) = self.auto_approve_threshold {
            trust.auto_approve_threshold = level;
        }
        if let Some(max) = self.max_actions_per_window {
            trust.max_actions_per_window = max;
        }
        if let Some(secs) = self.window_seconds {
            trust.window_seconds = secs;
        }
        trust.prune(now);
        trust.updated_at = now;
    }
}

/// Persistence for household trust rows.
///
/// [`reserve_slot`](Self::reserve_slot), [`record_execution`](Self::record_execution)
/// and [`update_settings`](Self::update_settings) must each read, change
/// and write the row as one atomic step so concurrent callers cannot push
/// the window past its capacity.
#[async_trait]
pub trait TrustStore: Send + Sync {
    /// Load the stored row, if any.
    async fn load(&self, household: &HouseholdId) -> ApprovalResult<Option<HouseholdAiTrust>>;

    /// Overwrite the stored row.
    async fn save(&self, trust: &HouseholdAiTrust) -> ApprovalResult<()>;

    /// Prune the window, run `decide` on the row, and append `now` if it
    /// approves.
    async fn reserve_slot(
        &self,
        household: &HouseholdId,
        defaults: &TrustDefaults,
        now: Timestamp,
        decide: &(dyn for<'r> Fn(&'r HouseholdAiTrust) -> TrustDecision + Send + Sync),
    ) -> ApprovalResult<TrustDecision>;

    /// Prune the window and append `now` unconditionally.
    async fn record_execution(
        &self,
        household: &HouseholdId,
        defaults: &TrustDefaults,
        now: Timestamp,
    ) -> ApprovalResult<()>;

    /// Apply a settings change, keeping the current window.
    async fn update_settings(
        &self,
        household: &HouseholdId,
        defaults: &TrustDefaults,
        update: &TrustSettingsUpdate,
        now: Timestamp,
    ) -> ApprovalResult<HouseholdAiTrust>;
}

/// [`TrustStore`] over a [`KvStore`], one row per household in
/// `ai:household_trust`, changed with compare-and-swap.
#[derive(Debug, Clone)]
pub struct KvTrustStore {
    rows: ScopedKvStore,
}

impl KvTrustStore {
    /// Create a trust store over `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace is rejected by the store.
    pub fn new(store: Arc<dyn KvStore>) -> ApprovalResult<Self> {
        Ok(Self {
            rows: ScopedKvStore::new(store, NS_TRUST)?,
        })
    }

    /// Read-modify-CAS loop. `apply` returns its output and whether the row
    /// should be written.
    async fn modify<T, F>(
        &self,
        household: &HouseholdId,
        defaults: &TrustDefaults,
        now: Timestamp,
        mut apply: F,
    ) -> ApprovalResult<T>
    where
        F: FnMut(&mut HouseholdAiTrust) -> (T, bool) + Send,
        T: Send,
    {
        let key = household.0.to_string();
        for attempt in 0..TRUST_CAS_ATTEMPTS {
            let (mut row, raw) = match self
                .rows
                .get_json_versioned::<HouseholdAiTrust>(&key)
                .await?
            {
                Some((row, raw)) => (row, Some(raw)),
                None => (HouseholdAiTrust::new(*household, defaults, now), None),
            };
            row.prune(now);
            let (out, write) = apply(&mut row);
            if !write || self.rows.compare_and_swap_json(&key, raw, &row).await? {
                return Ok(out);
            }
            debug!(household = %household, attempt, "trust row changed concurrently; retrying");
        }
        warn!(household = %household, "trust row kept conflicting");
        Err(ApprovalError::Internal(format!(
            "trust window for {household} kept conflicting"
        )))
    }
}

#[async_trait]
impl TrustStore for KvTrustStore {
    async fn load(&self, household: &HouseholdId) -> ApprovalResult<Option<HouseholdAiTrust>> {
        Ok(self.rows.get_json(&household.0.to_string()).await?)
    }

    async fn save(&self, trust: &HouseholdAiTrust) -> ApprovalResult<()> {
        Ok(self
            .rows
            .set_json(&trust.household_id.0.to_string(), trust)
            .await?)
    }

    async fn reserve_slot(
        &self,
        household: &HouseholdId,
        defaults: &TrustDefaults,
        now: Timestamp,
        decide: &(dyn for<'r> Fn(&'r HouseholdAiTrust) -> TrustDecision + Send + Sync),
    ) -> ApprovalResult<TrustDecision> {
        self.modify(household, defaults, now, |row| {
            let decision = decide(row);
            if decision.approve {
                row.record(now);
            }
            let write = decision.approve;
            (decision, write)
        })
        .await
    }

    async fn record_execution(
        &self,
        household: &HouseholdId,
        defaults: &TrustDefaults,
        now: Timestamp,
    ) -> ApprovalResult<()> {
        self.modify(household, defaults, now, |row| {
            row.record(now);
            ((), true)
        })
        .await
    }

    async fn update_settings(
        &self,
        household: &HouseholdId,
        defaults: &TrustDefaults,
        update: &TrustSettingsUpdate,
        now: Timestamp,
    ) -> ApprovalResult<HouseholdAiTrust> {
        self.modify(household, defaults, now, |row| {
            update.apply_to(row, now);
            (row.clone(), true)
        })
        .await
    }
}

/// Decides whether an action may run without confirmation.
#[derive(Clone)]
pub struct TrustEvaluator {
    classifier: RiskClassifier,
    store: Arc<dyn TrustStore>,
    defaults: TrustDefaults,
}

impl fmt::Debug for TrustEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustEvaluator")
            .field("classifier", &self.classifier)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl TrustEvaluator {
    /// Create an evaluator.
    #[must_use]
    pub fn new(
        classifier: RiskClassifier,
        store: Arc<dyn TrustStore>,
        defaults: TrustDefaults,
    ) -> Self {
        Self {
            classifier,
            store,
            defaults,
        }
    }

    /// The classifier decisions are based on.
    #[must_use]
    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    /// Settings used for households without a stored row.
    #[must_use]
    pub fn defaults(&self) -> &TrustDefaults {
        &self.defaults
    }

    /// Decide without touching the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the trust row cannot be read.
    pub async fn should_auto_approve(
        &self,
        household: &HouseholdId,
        function_name: &str,
        now: Timestamp,
    ) -> ApprovalResult<TrustDecision> {
        let function = self.classifier.classify(function_name);
        let trust = self.trust_settings(household, now).await?;
        let decision = TrustDecision::evaluate(&function, &trust, now);
        debug!(
            household = %household,
            function = function_name,
            risk = %decision.risk_level,
            approve = decision.approve,
            reason = %decision.reason,
            "trust evaluated"
        );
        Ok(decision)
    }

    /// Decide and, on approval, take a slot in the window atomically.
    ///
    /// Call this only when the action is about to be executed.
    ///
    /// # Errors
    ///
    /// Returns an error if the trust row cannot be read or written.
    pub async fn reserve(
        &self,
        household: &HouseholdId,
        function_name: &str,
        now: Timestamp,
    ) -> ApprovalResult<TrustDecision> {
        let function = self.classifier.classify(function_name);
        let decide = move |row: &HouseholdAiTrust| TrustDecision::evaluate(&function, row, now);
        let decision = self
            .store
            .reserve_slot(household, &self.defaults, now, &decide)
            .await?;
        if decision.approve {
            debug!(household = %household, function = function_name, "trust slot reserved");
        } else {
            info!(
                household = %household,
                function = function_name,
                reason = %decision.reason,
                "auto-approval denied"
            );
        }
        Ok(decision)
    }

    /// Count an execution that was approved by a human.
    ///
    /// # Errors
    ///
    /// Returns an error if the trust row cannot be written.
    pub async fn record_execution(
        &self,
        household: &HouseholdId,
        now: Timestamp,
    ) -> ApprovalResult<()> {
        self.store
            .record_execution(household, &self.defaults, now)
            .await
    }

    /// The household's settings, or the defaults if it has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the trust row cannot be read.
    pub async fn trust_settings(
        &self,
        household: &HouseholdId,
        now: Timestamp,
    ) -> ApprovalResult<HouseholdAiTrust> {
        let mut trust = self
            .store
            .load(household)
            .await?
            .unwrap_or_else(|| HouseholdAiTrust::new(*household, &self.defaults, now));
        trust.prune(now);
        Ok(trust)
    }

    /// Change the household's settings.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidState`] for a zero capacity or
    /// window, or an error if the row cannot be written.
    pub async fn update_trust_settings(
        &self,
        household: &HouseholdId,
        update: &TrustSettingsUpdate,
        now: Timestamp,
    ) -> ApprovalResult<HouseholdAiTrust> {
        update.validate()?;
        let trust = self
            .store
            .update_settings(household, &self.defaults, update, now)
            .await?;
        info!(
            household = %household,
            threshold = %trust.auto_approve_threshold,
            max_actions = trust.max_actions_per_window,
            window_seconds = trust.window_seconds,
            "trust settings updated"
        );
        Ok(trust)
    }

    /// Executions the household may still run in the current window.
    ///
    /// # Errors
    ///
    /// Returns an error if the trust row cannot be read.
    pub async fn remaining_actions(
        &self,
        household: &HouseholdId,
        now: Timestamp,
    ) -> ApprovalResult<u32> {
        Ok(self
            .trust_settings(household, now)
            .await?
            .remaining_actions(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_storage::MemoryKvStore;

    fn evaluator(defaults: TrustDefaults) -> TrustEvaluator {
        let store = Arc::new(KvTrustStore::new(Arc::new(MemoryKvStore::new())).unwrap());
        TrustEvaluator::new(RiskClassifier::new(), store, defaults)
    }

    fn trust(threshold: RiskLevel) -> HouseholdAiTrust {
        HouseholdAiTrust::new(
            HouseholdId::new(),
            &TrustDefaults {
                auto_approve_threshold: threshold,
                ..TrustDefaults::default()
            },
            Timestamp::now(),
        )
    }

    fn config(risk: RiskLevel, above: RiskLevel) -> FunctionConfig {
        FunctionConfig {
            name: "f".into(),
            risk_level: risk,
            is_reversible: true,
            requires_confirmation_above: above,
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let now = Timestamp::now();
        let t = trust(RiskLevel::Medium);
        let low = TrustDecision::evaluate(&config(RiskLevel::Low, RiskLevel::Critical), &t, now);
        assert!(low.approve);
        let medium =
            TrustDecision::evaluate(&config(RiskLevel::Medium, RiskLevel::Critical), &t, now);
        assert!(medium.approve);
        let high = TrustDecision::evaluate(&config(RiskLevel::High, RiskLevel::Critical), &t, now);
        assert_eq!(
            high.reason,
            DecisionReason::AboveThreshold {
                risk: RiskLevel::High,
                threshold: RiskLevel::Medium
            }
        );
    }

    #[test]
    fn test_critical_never_auto_approved() {
        let now = Timestamp::now();
        for threshold in RiskLevel::ALL {
            for above in RiskLevel::ALL {
                let d = TrustDecision::evaluate(
                    &config(RiskLevel::Critical, above),
                    &trust(threshold),
                    now,
                );
                assert!(!d.approve, "threshold {threshold}, above {above}");
            }
        }
    }

    #[test]
    fn test_function_confirmation_threshold() {
        let d = TrustDecision::evaluate(
            &config(RiskLevel::Medium, RiskLevel::Low),
            &trust(RiskLevel::High),
            Timestamp::now(),
        );
        assert_eq!(
            d.reason,
            DecisionReason::ConfirmationRequired {
                risk: RiskLevel::Medium,
                above: RiskLevel::Low
            }
        );
    }

    #[test]
    fn test_rate_limit_checked_first() {
        let now = Timestamp::now();
        let mut t = trust(RiskLevel::High);
        t.max_actions_per_window = 2;
        t.recent_action_timestamps = vec![now, now];
        let d = TrustDecision::evaluate(&config(RiskLevel::Critical, RiskLevel::Critical), &t, now);
        assert!(d.is_rate_limited());
        assert!(matches!(d.into_error(), ApprovalError::RateLimited { recent: 2, max: 2, .. }));
    }

    #[test]
    fn test_prune_drops_old_and_bounds_window() {
        let now = Timestamp::now();
        let mut t = trust(RiskLevel::Low);
        t.max_actions_per_window = 2;
        t.recent_action_timestamps = vec![
            now.checked_sub_secs(60).unwrap(),
            now.checked_sub_secs(30).unwrap(),
            now.checked_sub_secs(20).unwrap(),
            now,
        ];
        assert_eq!(t.recent_actions(now), 3);
        t.prune(now);
        assert_eq!(t.recent_action_timestamps.len(), 2);
        assert_eq!(t.recent_action_timestamps.last(), Some(&now));
    }

    #[tokio::test]
    async fn test_should_auto_approve_does_not_consume() {
        let ev = evaluator(TrustDefaults::default());
        let hh = HouseholdId::new();
        let now = Timestamp::now();
        for _ in 0..10 {
            assert!(ev.should_auto_approve(&hh, "add_shopping_item", now).await.unwrap().approve);
        }
        assert_eq!(ev.remaining_actions(&hh, now).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_reserve_consumes_until_window_elapses() {
        let ev = evaluator(TrustDefaults {
            max_actions_per_window: 3,
            ..TrustDefaults::default()
        });
        let hh = HouseholdId::new();
        let t0 = Timestamp::now();
        for i in 0..3 {
            let at = t0.checked_add_secs(i).unwrap();
            assert!(ev.reserve(&hh, "add_shopping_item", at).await.unwrap().approve);
        }
        let fourth = ev
            .reserve(&hh, "add_shopping_item", t0.checked_add_secs(10).unwrap())
            .await
            .unwrap();
        assert!(fourth.is_rate_limited());

        // 60s after the first reservation one slot is free again.
        let later = t0.checked_add_secs(60).unwrap();
        assert!(ev.reserve(&hh, "add_shopping_item", later).await.unwrap().approve);
    }

    #[tokio::test]
    async fn test_denied_reservation_leaves_window_alone() {
        let ev = evaluator(TrustDefaults::default());
        let hh = HouseholdId::new();
        let now = Timestamp::now();
        let d = ev.reserve(&hh, "clear_shopping_list", now).await.unwrap();
        assert!(!d.approve);
        assert_eq!(ev.remaining_actions(&hh, now).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_respect_capacity() {
        let ev = Arc::new(evaluator(TrustDefaults::default()));
        let hh = HouseholdId::new();
        let now = Timestamp::now();
        let attempts = (0..20).map(|_| {
            let ev = Arc::clone(&ev);
            tokio::spawn(async move { ev.reserve(&hh, "add_shopping_item", now).await })
        });
        let approved = futures::future::join_all(attempts)
            .await
            .into_iter()
            .filter(|r| r.as_ref().unwrap().as_ref().unwrap().approve)
            .count();
        assert_eq!(approved, 5);
    }

    #[tokio::test]
    async fn test_update_settings() {
        let ev = evaluator(TrustDefaults::default());
        let hh = HouseholdId::new();
        let now = Timestamp::now();
        ev.reserve(&hh, "add_shopping_item", now).await.unwrap();

        let updated = ev
            .update_trust_settings(
                &hh,
                &TrustSettingsUpdate {
                    auto_approve_threshold: Some(RiskLevel::Medium),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(updated.auto_approve_threshold, RiskLevel::Medium);
        assert_eq!(updated.recent_action_timestamps.len(), 1);
        assert!(
            ev.should_auto_approve(&hh, "remove_shopping_item", now)
                .await
                .unwrap()
                .approve
        );

        let bad = TrustSettingsUpdate {
            max_actions_per_window: Some(0),
            ..Default::default()
        };
        assert!(ev.update_trust_settings(&hh, &bad, now).await.is_err());
    }
}
