//! Request context for correlating engine operations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hearth_core::{HouseholdId, SessionId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one request through the engine.
///
/// The `span()` carries the request, correlation and household ids, so every
/// event logged inside it can be tied back to the request that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// This request.
    pub request_id: Uuid,
    /// Shared by a request and every child it spawns.
    pub correlation_id: Uuid,
    /// Request that spawned this one.
    pub parent_id: Option<Uuid>,
    /// Household the request acts on.
    pub household_id: Option<HouseholdId>,
    /// Assistant session, if any.
    pub session_id: Option<SessionId>,
    /// Acting member, if known.
    pub user_id: Option<UserId>,
    /// Creation time.
    pub started_at: DateTime<Utc>,
    /// Component that created the context.
    pub source: String,
    /// Operation name (`"propose"`, `"undo"`, ...).
    pub operation: Option<String>,
    /// Free-form extra fields.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RequestContext {
    /// New root context.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            request_id: id,
            correlation_id: id,
            parent_id: None,
            household_id: None,
            session_id: None,
            user_id: None,
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Child context sharing correlation, household, session, user and
    /// metadata.
    #[must_use]
    pub fn child(&self, source: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            parent_id: Some(self.request_id),
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
            ..self.clone()
        }
    }

    /// Set the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    /// Set the household.
    #[must_use]
    pub fn with_household(mut self, household: HouseholdId) -> Self {
        self.household_id = Some(household);
        self
    }

    /// Set the session.
    #[must_use]
    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session_id = Some(session);
        self
    }

    /// Set the acting member.
    #[must_use]
    pub fn with_user(mut self, user: UserId) -> Self {
        self.user_id = Some(user);
        self
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Add a metadata field.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Milliseconds since the context was created.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// First eight hex digits of the request id.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.simple().to_string().chars().take(8).collect()
    }

    /// Span carrying this context's ids.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.short_id(),
            correlation_id = %self.correlation_id,
            household = self.household_id.map(tracing::field::display),
            source = %self.source,
            operation = self.operation.as_deref(),
        )
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Keeps a request's span entered and logs its duration on drop.
pub struct RequestGuard {
    context: RequestContext,
    _span: tracing::span::EnteredSpan,
}

impl RequestGuard {
    /// Enter `context`'s span.
    #[must_use]
    pub fn new(context: RequestContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("request started");
        Self {
            context,
            _span: span,
        }
    }

    /// The guarded context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "request completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_context() {
        let ctx = RequestContext::new("cli");
        assert_eq!(ctx.request_id, ctx.correlation_id);
        assert!(ctx.parent_id.is_none());
        assert!(ctx.household_id.is_none());
        assert_eq!(ctx.short_id().len(), 8);
    }

    #[test]
    fn test_child_inherits_scope() {
        let household = HouseholdId::new();
        let user = UserId::new();
        let parent = RequestContext::new("cli")
            .with_household(household)
            .with_user(user)
            .with_operation("execute")
            .with_metadata("proposal", "p1");
        let child = parent.child("executor");

        assert_ne!(child.request_id, parent.request_id);
        assert_eq!(child.correlation_id, parent.correlation_id);
        assert_eq!(child.parent_id, Some(parent.request_id));
        assert_eq!(child.household_id, Some(household));
        assert_eq!(child.user_id, Some(user));
        assert!(child.operation.is_none());
        assert_eq!(child.metadata.get("proposal").map(String::as_str), Some("p1"));
    }

    #[test]
    fn test_serialization() {
        let ctx = RequestContext::new("cli")
            .with_session(SessionId::new())
            .with_operation("propose");
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"operation\":\"propose\""));
        let parsed: RequestContext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ctx);
    }

    #[test]
    fn test_guard_exposes_context() {
        let guard = RequestGuard::new(RequestContext::new("test").with_operation("undo"));
        assert_eq!(guard.context().operation.as_deref(), Some("undo"));
        assert!(guard.context().elapsed_ms() >= 0);
    }
}
