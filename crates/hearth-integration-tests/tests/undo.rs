//! Undo through the engine: field-level restore, windows, and failures.

use hearth_approval::{ApprovalError, DEFAULT_UNDO_WINDOW_SECS};
use hearth_audit::AuditStatus;
use hearth_core::UserId;
use hearth_household::{InventoryItem, ShoppingItem};
use hearth_test::{
    FailurePlan, TestEngine, add_inventory_item, add_shopping_item_with_id, check_shopping_item,
    update_inventory_quantity,
};

#[tokio::test]
async fn test_undo_restores_every_field() {
    let t = TestEngine::new();
    t.run_approved(&[add_inventory_item("flour", "flour", 3)])
        .await;
    let before: InventoryItem = t.data.get(t.household, "flour").await.unwrap().unwrap();

    t.clock.advance_secs(5);
    let update = t
        .run_approved(&[update_inventory_quantity("flour", 9)])
        .await;
    let changed: InventoryItem = t.data.get(t.household, "flour").await.unwrap().unwrap();
    assert_eq!(changed.quantity, 9);
    assert_ne!(changed.updated_at, before.updated_at);

    let actor = UserId::new();
    let audit_id = update.executed_actions[0].audit_log_id;
    let undone = t.engine.undo(t.household, &audit_id, Some(actor)).await.unwrap();
    assert_eq!(undone.function_name, "update_inventory_quantity");
    assert_eq!(undone.restored_entities, 1);

    let after: InventoryItem = t.data.get(t.household, "flour").await.unwrap().unwrap();
    assert_eq!(after, before);

    let entry = t.engine.audit_entry(t.household, &audit_id).await.unwrap();
    assert_eq!(entry.status, AuditStatus::Undone);
    assert_eq!(entry.undone_by, Some(actor));
}

#[tokio::test]
async fn test_undo_twice() {
    let t = TestEngine::new();
    let result = t
        .run_approved(&[add_shopping_item_with_id("milk", "milk")])
        .await;
    let id = result.executed_actions[0].audit_log_id;
    t.engine.undo(t.household, &id, None).await.unwrap();

    let err = t.engine.undo(t.household, &id, None).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");
}

#[tokio::test]
async fn test_undo_window_elapses() {
    let t = TestEngine::new();
    let result = t
        .run_approved(&[add_shopping_item_with_id("milk", "milk")])
        .await;
    let id = result.executed_actions[0].audit_log_id;

    t.clock.advance_secs(DEFAULT_UNDO_WINDOW_SECS + 1);
    assert!(t.engine.undoable_entries(t.household).await.unwrap().is_empty());
    assert!(matches!(
        t.engine.undo(t.household, &id, None).await,
        Err(ApprovalError::Expired { .. })
    ));
    assert!(t.data.get::<ShoppingItem>(t.household, "milk").await.unwrap().is_some());
}

#[tokio::test]
async fn test_undo_one_action_of_a_proposal() {
    let t = TestEngine::new();
    let result = t
        .run_approved(&[
            add_shopping_item_with_id("a", "apples"),
            add_shopping_item_with_id("b", "bread"),
            check_shopping_item("b"),
        ])
        .await;
    let ids = result.audit_log_ids();

    // Undo the middle action only.
    t.engine.undo(t.household, &ids[1], None).await.unwrap();
    assert!(t.data.get::<ShoppingItem>(t.household, "a").await.unwrap().is_some());
    assert!(t.data.get::<ShoppingItem>(t.household, "b").await.unwrap().is_none());

    let statuses: Vec<AuditStatus> = {
        let mut out = Vec::new();
        for id in &ids {
            out.push(t.engine.audit_entry(t.household, id).await.unwrap().status);
        }
        out
    };
    assert_eq!(
        statuses,
        vec![AuditStatus::Succeeded, AuditStatus::Undone, AuditStatus::Succeeded]
    );

    let undoable = t.engine.undoable_entries(t.household).await.unwrap();
    assert_eq!(undoable.len(), 2);
    assert_eq!(undoable[0].id, ids[2]);
}

#[tokio::test]
async fn test_failed_restore_keeps_entry_succeeded() {
    let t = TestEngine::with_failures(FailurePlan::restores());
    let result = t
        .run_approved(&[add_shopping_item_with_id("milk", "milk")])
        .await;
    let id = result.executed_actions[0].audit_log_id;

    let err = t.engine.undo(t.household, &id, None).await.unwrap_err();
    assert_eq!(err.code(), "EXECUTION_FAILED");
    assert_eq!(t.failing.as_ref().unwrap().restore_calls(), 1);

    let entry = t.engine.audit_entry(t.household, &id).await.unwrap();
    assert_eq!(entry.status, AuditStatus::Succeeded);
    assert!(entry.undone_at.is_none());
    assert!(t.data.get::<ShoppingItem>(t.household, "milk").await.unwrap().is_some());
}

#[tokio::test]
async fn test_undo_from_another_household() {
    let t = TestEngine::new();
    let result = t
        .run_approved(&[add_shopping_item_with_id("milk", "milk")])
        .await;
    let id = result.executed_actions[0].audit_log_id;
    let err = t
        .engine
        .undo(hearth_core::HouseholdId::new(), &id, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_undo_restores_once() {
    let t = TestEngine::with_failures(FailurePlan::default());
    let result = t
        .run_approved(&[add_shopping_item_with_id("milk", "milk")])
        .await;
    let id = result.executed_actions[0].audit_log_id;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = t.engine.clone();
            let household = t.household;
            tokio::spawn(async move { engine.undo(household, &id, None).await })
        })
        .collect();

    let mut undone = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => undone += 1,
            Err(e) => assert_eq!(e.code(), "INVALID_STATE"),
        }
    }
    assert_eq!(undone, 1);
    assert_eq!(t.failing.as_ref().unwrap().restore_calls(), 1);
    assert_eq!(
        t.engine.audit_entry(t.household, &id).await.unwrap().status,
        AuditStatus::Undone
    );
}
