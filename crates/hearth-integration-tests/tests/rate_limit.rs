//! Sliding-window rate limiting of auto-approved actions.

use hearth_approval::{
    ApprovalError, DecisionReason, EngineSettings, IntentOutcome, ProposalStatus, TrustDefaults,
};
use hearth_core::RiskLevel;
use hearth_test::{TestEngine, add_shopping_item};

fn limited(max: u32) -> TestEngine {
    TestEngine::with_settings(EngineSettings {
        trust_defaults: TrustDefaults {
            auto_approve_threshold: RiskLevel::Low,
            max_actions_per_window: max,
            window_seconds: 60,
        },
        ..EngineSettings::default()
    })
}

#[tokio::test]
async fn test_fourth_action_in_window_is_limited() {
    let t = limited(3);
    for i in 0..3 {
        t.engine
            .execute_auto(t.household, &add_shopping_item(&format!("item {i}")), None)
            .await
            .unwrap();
        t.clock.advance_secs(10);
    }

    // t = 30s: three actions in the last minute.
    let err = t
        .engine
        .execute_auto(t.household, &add_shopping_item("one more"), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "RATE_LIMITED");
    assert!(matches!(err, ApprovalError::RateLimited { .. }));
    assert_eq!(t.engine.audit_entries(t.household).await.unwrap().len(), 3);

    // t = 60s: the action at t = 0 has left the window.
    t.clock.advance_secs(30);
    assert_eq!(t.engine.remaining_actions(t.household).await.unwrap(), 1);
    t.engine
        .execute_auto(t.household, &add_shopping_item("one more"), None)
        .await
        .unwrap();
    assert_eq!(t.engine.remaining_actions(t.household).await.unwrap(), 0);
    assert_eq!(t.engine.audit_entries(t.household).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_evaluate_does_not_consume_slots() {
    let t = limited(2);
    for _ in 0..5 {
        let eval = t
            .engine
            .evaluate(t.household, &add_shopping_item("eggs"))
            .await
            .unwrap();
        assert!(eval.auto_execute);
    }
    assert_eq!(t.engine.remaining_actions(t.household).await.unwrap(), 2);
}

#[tokio::test]
async fn test_evaluate_reports_rate_limit() {
    let t = limited(1);
    t.engine
        .execute_auto(t.household, &add_shopping_item("eggs"), None)
        .await
        .unwrap();
    let eval = t
        .engine
        .evaluate(t.household, &add_shopping_item("milk"))
        .await
        .unwrap();
    assert!(!eval.auto_execute);
    assert_eq!(
        eval.reason,
        DecisionReason::RateLimited {
            recent: 1,
            max: 1,
            window_seconds: 60
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_respect_the_limit() {
    let t = limited(3);
    let handles: Vec<_> = (0..10)
        .map(|i| {
            let engine = t.engine.clone();
            let household = t.household;
            tokio::spawn(async move {
                engine
                    .execute_auto(household, &add_shopping_item(&format!("item {i}")), None)
                    .await
            })
        })
        .collect();

    let mut allowed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => allowed += 1,
            Err(e) => assert_eq!(e.code(), "RATE_LIMITED"),
        }
    }
    assert_eq!(allowed, 3);
    assert_eq!(t.engine.audit_entries(t.household).await.unwrap().len(), 3);
    assert_eq!(t.engine.remaining_actions(t.household).await.unwrap(), 0);
}

#[tokio::test]
async fn test_handle_intent_proposes_when_limited() {
    let t = limited(1);
    let first = t
        .engine
        .handle_intent(t.household, t.session, &add_shopping_item("eggs"), None)
        .await
        .unwrap();
    assert!(matches!(first, IntentOutcome::Executed { .. }));

    let second = t
        .engine
        .handle_intent(t.household, t.session, &add_shopping_item("milk"), None)
        .await
        .unwrap();
    let IntentOutcome::Proposed { proposal, reason } = second else {
        panic!("expected a proposal, got {second:?}");
    };
    assert!(matches!(reason, DecisionReason::RateLimited { .. }));
    assert_eq!(proposal.status, ProposalStatus::Pending);
    assert_eq!(proposal.actions.len(), 1);
    assert_eq!(proposal.actions[0].function_name, "add_shopping_item");
}

#[tokio::test]
async fn test_households_have_separate_windows() {
    let t = limited(1);
    t.engine
        .execute_auto(t.household, &add_shopping_item("eggs"), None)
        .await
        .unwrap();
    let other = hearth_core::HouseholdId::new();
    t.engine
        .execute_auto(other, &add_shopping_item("eggs"), None)
        .await
        .unwrap();
    assert_eq!(t.engine.remaining_actions(other).await.unwrap(), 0);
}
