//! Proposal decisions: single resolution, lazy expiry, partial approval,
//! single execution and household scoping.

use hearth_approval::{
    ApprovalError, DEFAULT_PROPOSAL_TTL_SECS, ProposalDecision, ProposalStatus,
};
use hearth_core::{ActionId, HouseholdId, UserId};
use hearth_household::ShoppingItem;
use hearth_test::{
    TestEngine, add_shopping_item_with_id, check_shopping_item, clear_shopping_list,
    remove_shopping_item,
};

fn approve_all() -> ProposalDecision {
    ProposalDecision::Approve { selected: None }
}

#[tokio::test]
async fn test_second_decision_is_already_resolved() {
    let t = TestEngine::new();
    let first_actor = UserId::new();

    let approved = t.propose(&[add_shopping_item_with_id("milk", "milk")]).await;
    let after_first = t
        .engine
        .resolve_proposal(t.household, &approved.id, approve_all(), Some(first_actor))
        .await
        .unwrap();
    assert_eq!(after_first.status, ProposalStatus::Approved);

    for decision in [approve_all(), ProposalDecision::Reject] {
        let err = t
            .engine
            .resolve_proposal(t.household, &approved.id, decision, Some(UserId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::AlreadyResolved { .. }));
    }
    let stored = t.engine.proposal(t.household, &approved.id).await.unwrap();
    assert_eq!(stored, after_first);

    let rejected = t.propose(&[clear_shopping_list()]).await;
    let after_reject = t
        .engine
        .resolve_proposal(t.household, &rejected.id, ProposalDecision::Reject, None)
        .await
        .unwrap();
    assert_eq!(after_reject.status, ProposalStatus::Rejected);
    let err = t
        .engine
        .resolve_proposal(t.household, &rejected.id, approve_all(), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ALREADY_RESOLVED");
    assert_eq!(
        t.engine.proposal(t.household, &rejected.id).await.unwrap(),
        after_reject
    );
}

#[tokio::test]
async fn test_approve_after_expiry_is_expired() {
    let t = TestEngine::new();
    let proposal = t.propose(&[clear_shopping_list()]).await;
    assert_eq!(
        proposal
            .expires_at
            .0
            .signed_duration_since(proposal.created_at.0)
            .num_seconds(),
        i64::try_from(DEFAULT_PROPOSAL_TTL_SECS).unwrap()
    );

    // Exactly at the deadline the proposal is still open.
    t.clock.advance_secs(DEFAULT_PROPOSAL_TTL_SECS);
    assert_eq!(
        t.engine.proposal(t.household, &proposal.id).await.unwrap().status,
        ProposalStatus::Pending
    );

    t.clock.advance_secs(1);
    let err = t
        .engine
        .resolve_proposal(t.household, &proposal.id, approve_all(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::Expired { .. }));

    let stored = t.engine.proposal(t.household, &proposal.id).await.unwrap();
    assert_eq!(stored.status, ProposalStatus::Expired);
    assert!(t.engine.pending_proposals(t.household).await.unwrap().is_empty());

    let err = t
        .engine
        .resolve_proposal(t.household, &proposal.id, ProposalDecision::Reject, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "EXPIRED");
}

#[tokio::test]
async fn test_read_past_deadline_reports_expired() {
    let t = TestEngine::new();
    let proposal = t.propose(&[clear_shopping_list()]).await;
    t.clock.advance_secs(DEFAULT_PROPOSAL_TTL_SECS.saturating_add(60));

    let listed = t.engine.proposals(t.household).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, ProposalStatus::Expired);
    let err = t
        .engine
        .execute_proposal(t.household, &proposal.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");
}

#[tokio::test]
async fn test_partial_approval_keeps_original_order() {
    let t = TestEngine::new();
    let proposal = t
        .propose(&[
            add_shopping_item_with_id("a", "apples"),
            add_shopping_item_with_id("b", "bread"),
            add_shopping_item_with_id("c", "cheese"),
            add_shopping_item_with_id("d", "dates"),
        ])
        .await;
    let ids: Vec<ActionId> = proposal.actions.iter().map(|a| a.id).collect();

    // Selected out of order on purpose.
    let selected = vec![ids[3], ids[0], ids[2]];
    let approved = t
        .engine
        .resolve_proposal(
            t.household,
            &proposal.id,
            ProposalDecision::Approve {
                selected: Some(selected),
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(approved.status, ProposalStatus::PartiallyApproved);
    let kept: Vec<ActionId> = approved.actions.iter().map(|a| a.id).collect();
    assert_eq!(kept, vec![ids[0], ids[2], ids[3]]);

    let result = t
        .engine
        .execute_proposal(t.household, &proposal.id, None)
        .await
        .unwrap();
    let executed: Vec<ActionId> = result.executed_actions.iter().map(|a| a.action_id).collect();
    assert_eq!(executed, kept);

    let mut names: Vec<String> = t
        .data
        .list::<ShoppingItem>(t.household)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    names.sort();
    assert_eq!(names, vec!["a", "c", "d"]);
}

#[tokio::test]
async fn test_selecting_every_action_is_full_approval() {
    let t = TestEngine::new();
    let proposal = t
        .propose(&[
            add_shopping_item_with_id("a", "apples"),
            check_shopping_item("a"),
        ])
        .await;
    let all: Vec<ActionId> = proposal.actions.iter().rev().map(|a| a.id).collect();
    let approved = t
        .engine
        .resolve_proposal(
            t.household,
            &proposal.id,
            ProposalDecision::Approve { selected: Some(all) },
            None,
        )
        .await
        .unwrap();
    assert_eq!(approved.status, ProposalStatus::Approved);
    assert_eq!(approved.actions, proposal.actions);
}

#[tokio::test]
async fn test_invalid_selection_leaves_proposal_pending() {
    let t = TestEngine::new();
    let proposal = t.propose(&[clear_shopping_list()]).await;

    for selected in [vec![], vec![ActionId::new()]] {
        let err = t
            .engine
            .resolve_proposal(
                t.household,
                &proposal.id,
                ProposalDecision::Approve {
                    selected: Some(selected),
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::InvalidSelection { .. }));
    }
    assert_eq!(
        t.engine.proposal(t.household, &proposal.id).await.unwrap().status,
        ProposalStatus::Pending
    );
}

#[tokio::test]
async fn test_proposal_executes_once() {
    let t = TestEngine::new();
    let proposal = t.propose(&[add_shopping_item_with_id("milk", "milk")]).await;
    t.engine
        .resolve_proposal(t.household, &proposal.id, approve_all(), None)
        .await
        .unwrap();

    let first = t
        .engine
        .execute_proposal(t.household, &proposal.id, None)
        .await
        .unwrap();
    assert_eq!(first.succeeded(), 1);

    let err = t
        .engine
        .execute_proposal(t.household, &proposal.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ALREADY_RESOLVED");
    assert_eq!(t.engine.audit_entries(t.household).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_execution_claims_once() {
    let t = TestEngine::new();
    let proposal = t.propose(&[add_shopping_item_with_id("milk", "milk")]).await;
    t.engine
        .resolve_proposal(t.household, &proposal.id, approve_all(), None)
        .await
        .unwrap();

    let runs = (0..8).map(|_| t.engine.execute_proposal(t.household, &proposal.id, None));
    let results = futures::future::join_all(runs).await;
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(t.engine.audit_entries(t.household).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_pending_proposal_cannot_execute() {
    let t = TestEngine::new();
    let proposal = t.propose(&[remove_shopping_item("milk")]).await;
    let err = t
        .engine
        .execute_proposal(t.household, &proposal.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::InvalidState { .. }));
    assert!(t.engine.audit_entries(t.household).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_other_households_see_nothing() {
    let t = TestEngine::new();
    let stranger = HouseholdId::new();
    let proposal = t.propose(&[add_shopping_item_with_id("milk", "milk")]).await;

    let err = t.engine.proposal(stranger, &proposal.id).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    let err = t
        .engine
        .resolve_proposal(stranger, &proposal.id, approve_all(), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert!(t.engine.proposals(stranger).await.unwrap().is_empty());

    let result = t.run_approved(&[add_shopping_item_with_id("eggs", "eggs")]).await;
    let audit_id = result.executed_actions[0].audit_log_id;
    assert_eq!(
        t.engine.audit_entry(stranger, &audit_id).await.unwrap_err().code(),
        "NOT_FOUND"
    );
    assert_eq!(
        t.engine.undo(stranger, &audit_id, None).await.unwrap_err().code(),
        "NOT_FOUND"
    );
    assert!(t.engine.audit_entries(stranger).await.unwrap().is_empty());

    // The original proposal is untouched by the foreign attempts.
    assert_eq!(
        t.engine.proposal(t.household, &proposal.id).await.unwrap().status,
        ProposalStatus::Pending
    );
}
