//! Fail-closed classification and the critical-risk ceiling.

use std::collections::HashMap;

use hearth_approval::{
    ApprovalError, DecisionReason, EngineSettings, FunctionOverride, RiskClassifier,
    TrustSettingsUpdate,
};
use hearth_core::RiskLevel;
use hearth_test::{TestEngine, add_shopping_item, intent, reset_inventory};
use serde_json::json;

#[test]
fn test_unknown_functions_are_critical_and_irreversible() {
    let classifier = RiskClassifier::new();
    for name in ["launch_rocket", "", "ADD_SHOPPING_ITEM", "add_shopping_item ", "drop_table"] {
        let config = classifier.classify(name);
        assert_eq!(config.risk_level, RiskLevel::Critical, "{name:?}");
        assert!(!config.is_reversible, "{name:?}");
    }
}

#[tokio::test]
async fn test_unknown_function_is_rejected_before_anything_runs() {
    let t = TestEngine::new();
    let err = t
        .engine
        .execute_auto(t.household, &intent("launch_rocket", json!({})), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::InvalidArguments { .. }));
    assert!(t.engine.audit_entries(t.household).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_critical_is_never_auto_approved() {
    let t = TestEngine::new();
    for threshold in [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ] {
        t.engine
            .update_trust_settings(
                t.household,
                &TrustSettingsUpdate {
                    auto_approve_threshold: Some(threshold),
                    max_actions_per_window: Some(1000),
                    window_seconds: None,
                },
            )
            .await
            .unwrap();

        let evaluation = t.engine.evaluate(t.household, &reset_inventory()).await.unwrap();
        assert!(!evaluation.auto_execute, "threshold {threshold}");
        assert_eq!(evaluation.reason, DecisionReason::CriticalCeiling);

        let err = t
            .engine
            .execute_auto(t.household, &reset_inventory(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_AUTO_APPROVED");
    }
    assert!(t.engine.audit_entries(t.household).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_function_raised_to_critical_by_override() {
    let mut overrides = HashMap::new();
    overrides.insert(
        "add_shopping_item".to_owned(),
        FunctionOverride {
            risk_level: Some(RiskLevel::Critical),
            requires_confirmation_above: None,
            reversible: None,
        },
    );
    let t = TestEngine::with_settings(EngineSettings {
        function_overrides: overrides,
        ..EngineSettings::default()
    });
    t.engine
        .update_trust_settings(
            t.household,
            &TrustSettingsUpdate {
                auto_approve_threshold: Some(RiskLevel::Critical),
                ..TrustSettingsUpdate::default()
            },
        )
        .await
        .unwrap();

    let evaluation = t
        .engine
        .evaluate(t.household, &add_shopping_item("milk"))
        .await
        .unwrap();
    assert!(!evaluation.auto_execute);
    assert_eq!(evaluation.function.risk_level, RiskLevel::Critical);
}
