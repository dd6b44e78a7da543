//! Common types used throughout Hearth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when an identifier or enum value cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseError {
    /// What was being parsed (e.g. `household id`, `risk level`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Parse a UUID that may carry a `prefix:` tag (as produced by `Display`).
fn parse_prefixed_uuid(s: &str, prefix: &str, kind: &'static str) -> Result<Uuid, ParseError> {
    let raw = s
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(s);
    Uuid::parse_str(raw).map_err(|_| ParseError {
        kind,
        value: s.to_owned(),
    })
}

/// Unique identifier for a household. Every persisted entity is scoped to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HouseholdId(pub Uuid);

impl HouseholdId {
    /// Create a new random household ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a household ID from a UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for HouseholdId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HouseholdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "household:{}", self.0)
    }
}

impl FromStr for HouseholdId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed_uuid(s, "household", "household id").map(Self)
    }
}

/// Unique identifier for an assistant conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a session ID from a UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed_uuid(s, "session", "session id").map(Self)
    }
}

/// Unique identifier for a household member acting on proposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Create a new random user ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a user ID from a UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed_uuid(s, "user", "user id").map(Self)
    }
}

/// Unique identifier for an assistant proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub Uuid);

impl ProposalId {
    /// Create a new random proposal ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proposal:{}", self.0)
    }
}

impl FromStr for ProposalId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed_uuid(s, "proposal", "proposal id").map(Self)
    }
}

/// Identifier of one action inside a proposal. Used for partial approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub Uuid);

impl ActionId {
    /// Create a new random action ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action:{}", self.0)
    }
}

impl FromStr for ActionId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed_uuid(s, "action", "action id").map(Self)
    }
}

/// Timestamp wrapper for consistent handling throughout Hearth.
///
/// Components never read the wall clock directly; they take timestamps
/// from an injected [`Clock`](crate::Clock).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Get the current wall-clock timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Add a number of seconds, returning `None` on overflow.
    #[must_use]
    pub fn checked_add_secs(&self, secs: u64) -> Option<Self> {
        let secs = i64::try_from(secs).ok()?;
        let delta = chrono::TimeDelta::try_seconds(secs)?;
        self.0.checked_add_signed(delta).map(Self)
    }

    /// Subtract a number of seconds, returning `None` on overflow.
    #[must_use]
    pub fn checked_sub_secs(&self, secs: u64) -> Option<Self> {
        let secs = i64::try_from(secs).ok()?;
        let delta = chrono::TimeDelta::try_seconds(secs)?;
        self.0.checked_sub_signed(delta).map(Self)
    }

    /// Whole seconds elapsed from `earlier` to `self` (negative if `earlier` is later).
    #[must_use]
    pub fn seconds_since(&self, earlier: &Timestamp) -> i64 {
        self.0.signed_duration_since(earlier.0).num_seconds()
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

/// Risk level classification for assistant actions.
///
/// Totally ordered: `Low < Medium < High < Critical`. Auto-approval
/// thresholds compare against this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Low risk - additive, easily corrected changes.
    Low,
    /// Medium risk - edits or removals of single entities.
    Medium,
    /// High risk - bulk or destructive changes.
    High,
    /// Critical risk - never executed without a human decision.
    Critical,
}

impl RiskLevel {
    /// All levels in ascending order.
    pub const ALL: [RiskLevel; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// The snake_case label used in storage and configuration.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// The highest level in `levels`, or `None` if empty.
    #[must_use]
    pub fn max_of(levels: impl IntoIterator<Item = RiskLevel>) -> Option<RiskLevel> {
        levels.into_iter().max()
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(ParseError {
                kind: "risk level",
                value: s.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_household_id_display_and_parse() {
        let id = HouseholdId::new();
        let display = id.to_string();
        assert!(display.starts_with("household:"));
        assert_eq!(display.parse::<HouseholdId>().unwrap(), id);
        assert_eq!(id.0.to_string().parse::<HouseholdId>().unwrap(), id);
    }

    #[test]
    fn test_session_id() {
        let id = SessionId::new();
        assert!(id.to_string().starts_with("session:"));
        assert_ne!(id, SessionId::new());
    }

    #[test]
    fn test_user_id_rejects_garbage() {
        let err = "user:not-a-uuid".parse::<UserId>().unwrap_err();
        assert_eq!(err.kind, "user id");
    }

    #[test]
    fn test_proposal_and_action_ids() {
        let proposal = ProposalId::new();
        assert_eq!(proposal.to_string().parse::<ProposalId>().unwrap(), proposal);
        let action = ActionId::new();
        assert!(action.to_string().starts_with("action:"));
        assert!("proposal:123".parse::<ProposalId>().is_err());
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let ts = Timestamp::now();
        let later = ts.checked_add_secs(600).unwrap();
        assert_eq!(later.seconds_since(&ts), 600);
        assert_eq!(ts.seconds_since(&later), -600);
        assert_eq!(later.checked_sub_secs(600).unwrap(), ts);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_risk_level_max_of() {
        assert_eq!(
            RiskLevel::max_of([RiskLevel::Low, RiskLevel::High, RiskLevel::Medium]),
            Some(RiskLevel::High)
        );
        assert_eq!(RiskLevel::max_of([]), None);
    }

    #[test]
    fn test_risk_level_parse() {
        for level in RiskLevel::ALL {
            assert_eq!(level.as_str().parse::<RiskLevel>().unwrap(), level);
        }
        assert_eq!(" HIGH ".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert!("extreme".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_risk_level_serde() {
        let json = serde_json::to_string(&RiskLevel::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
