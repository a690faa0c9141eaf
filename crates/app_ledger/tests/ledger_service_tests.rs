//! Ledger and trip service tests over the in-memory store

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use app_ledger::{
    ChannelNotifier, ErrorKind, LedgerError, LedgerEvent, LedgerService, NewTrip, SnapshotLoader,
    TripService,
};
use core_kernel::{MemberId, Money, TripId, UserId};
use domain_expense::{ExpenseChanges, LedgerStore, MockLedgerStore, SplitKind};
use domain_trip::{
    Invitation, InvitationStatus, Member, Principal, TripChanges, TripSnapshot, TripStore,
};
use infra_cache::{InMemoryCacheStore, TripSnapshotCache, DEFAULT_SNAPSHOT_TTL};
use test_utils::{
    assert_expense_balanced, assert_settlements_balance, assert_settlements_zero, DateFixtures,
    NewExpenseBuilder, PeopleFixtures, PrincipalFixtures, TripSnapshotBuilder,
};

struct Harness {
    store: MockLedgerStore,
    snapshots: SnapshotLoader,
    ledger: LedgerService,
    trips: TripService,
    events: mpsc::Receiver<LedgerEvent>,
}

async fn harness(snapshot: &TripSnapshot) -> Harness {
    let store = MockLedgerStore::with_snapshots(vec![snapshot.clone()]).await;
    let cache = TripSnapshotCache::new(Arc::new(InMemoryCacheStore::new()), DEFAULT_SNAPSHOT_TTL);
    let snapshots = SnapshotLoader::new(Arc::new(store.clone()), cache);
    let (notifier, events) = ChannelNotifier::new(256);
    let notifier = Arc::new(notifier);

    Harness {
        ledger: LedgerService::new(Arc::new(store.clone()), snapshots.clone(), notifier.clone()),
        trips: TripService::new(snapshots.clone(), notifier),
        store,
        snapshots,
        events,
    }
}

fn three_member_trip() -> TripSnapshot {
    TripSnapshotBuilder::new().with_guest().with_third().build()
}

fn drain(events: &mut mpsc::Receiver<LedgerEvent>) -> Vec<&'static str> {
    let mut names = Vec::new();
    while let Ok(event) = events.try_recv() {
        names.push(event.name());
    }
    names
}

// ============================================================================
// Expense writes
// ============================================================================

mod expense_tests {
    use super::*;

    #[tokio::test]
    async fn test_creator_records_equal_expense() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let input = NewExpenseBuilder::new(snapshot.members[0].id).build();

        let expense = h
            .ledger
            .create_expense(&creator, snapshot.trip_id(), input)
            .await
            .unwrap();

        let amounts: Vec<_> = expense.splits.iter().map(|s| s.amount.amount()).collect();
        assert_eq!(amounts, vec![dec!(33.34), dec!(33.33), dec!(33.33)]);
        assert_eq!(expense.created_by, Some(snapshot.members[0].id));
        assert_expense_balanced(&expense);

        let settlements = h.store.list_settlements(snapshot.trip_id()).await.unwrap();
        assert_eq!(settlements.len(), 3);
        assert_settlements_balance(&settlements, &[expense]);
    }

    #[tokio::test]
    async fn test_member_is_recorded_as_creator_of_expense() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let guest = PrincipalFixtures::member(&snapshot.members[1]);
        let input = NewExpenseBuilder::new(snapshot.members[1].id).build();

        let expense = h
            .ledger
            .create_expense(&guest, snapshot.trip_id(), input)
            .await
            .unwrap();

        assert_eq!(expense.created_by, Some(snapshot.members[1].id));
    }

    #[tokio::test]
    async fn test_stranger_is_forbidden() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let input = NewExpenseBuilder::new(snapshot.members[0].id).build();

        let err = h
            .ledger
            .create_expense(&PrincipalFixtures::stranger(), snapshot.trip_id(), input)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(err.status_code(), 403);
        assert_eq!(h.store.expense_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_trip_is_not_found() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let input = NewExpenseBuilder::new(snapshot.members[0].id).build();

        let err = h
            .ledger
            .create_expense(&PrincipalFixtures::creator(&snapshot), TripId::new(), input)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_payer_outside_trip_is_not_found() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let input = NewExpenseBuilder::new(MemberId::new()).build();

        let err = h
            .ledger
            .create_expense(&PrincipalFixtures::creator(&snapshot), snapshot.trip_id(), input)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(h.store.expense_count().await, 0);
    }

    #[tokio::test]
    async fn test_exact_mismatch_is_rejected_with_totals() {
        let snapshot = TripSnapshotBuilder::new().with_guest().build();
        let h = harness(&snapshot).await;
        let ids: Vec<MemberId> = snapshot.members.iter().map(|m| m.id).collect();
        let input = NewExpenseBuilder::new(ids[0])
            .exact(&[(ids[0], dec!(40.00)), (ids[1], dec!(60.02))])
            .build();

        let err = h
            .ledger
            .create_expense(&PrincipalFixtures::creator(&snapshot), snapshot.trip_id(), input)
            .await
            .unwrap_err();

        match err {
            LedgerError::InvalidSplit {
                expected, actual, ..
            } => {
                assert_eq!(expected, Some(dec!(100.00)));
                assert_eq!(actual, Some(dec!(100.02)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(h.store.expense_count().await, 0);
    }

    #[tokio::test]
    async fn test_exact_within_tolerance_is_made_exact() {
        let snapshot = TripSnapshotBuilder::new().with_guest().build();
        let h = harness(&snapshot).await;
        let ids: Vec<MemberId> = snapshot.members.iter().map(|m| m.id).collect();
        let input = NewExpenseBuilder::new(ids[0])
            .exact(&[(ids[0], dec!(40.00)), (ids[1], dec!(59.99))])
            .build();

        let expense = h
            .ledger
            .create_expense(&PrincipalFixtures::creator(&snapshot), snapshot.trip_id(), input)
            .await
            .unwrap();

        assert_expense_balanced(&expense);
    }

    #[tokio::test]
    async fn test_member_cannot_change_another_members_expense() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let guest = PrincipalFixtures::member(&snapshot.members[1]);
        let third = PrincipalFixtures::member(&snapshot.members[2]);
        let input = NewExpenseBuilder::new(snapshot.members[1].id).build();
        let expense = h
            .ledger
            .create_expense(&guest, snapshot.trip_id(), input)
            .await
            .unwrap();

        let err = h.ledger.delete_expense(&third, expense.id).await.unwrap_err();
        assert!(err.is_forbidden());

        h.ledger
            .delete_expense(&PrincipalFixtures::creator(&snapshot), expense.id)
            .await
            .unwrap();
        assert_eq!(h.store.expense_count().await, 0);
    }

    #[tokio::test]
    async fn test_new_amount_resplits_equal_expense() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let input = NewExpenseBuilder::new(snapshot.members[0].id)
            .amount(dec!(90.00))
            .build();
        let expense = h
            .ledger
            .create_expense(&creator, snapshot.trip_id(), input)
            .await
            .unwrap();

        let changes = ExpenseChanges {
            amount: Some(Money::new(dec!(120.00))),
            description: Some("Dinner and drinks".to_string()),
            ..Default::default()
        };
        let updated = h
            .ledger
            .update_expense(&creator, expense.id, changes)
            .await
            .unwrap();

        assert_eq!(updated.description, "Dinner and drinks");
        assert!(updated
            .splits
            .iter()
            .all(|s| s.amount == Money::new(dec!(40.00))));

        let settlements = h.store.list_settlements(snapshot.trip_id()).await.unwrap();
        assert_settlements_balance(&settlements, &[updated]);
    }

    #[tokio::test]
    async fn test_new_amount_on_exact_expense_needs_new_splits() {
        let snapshot = TripSnapshotBuilder::new().with_guest().build();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let ids: Vec<MemberId> = snapshot.members.iter().map(|m| m.id).collect();
        let input = NewExpenseBuilder::new(ids[0])
            .exact(&[(ids[0], dec!(30.00)), (ids[1], dec!(70.00))])
            .build();
        let expense = h
            .ledger
            .create_expense(&creator, snapshot.trip_id(), input)
            .await
            .unwrap();

        let changes = ExpenseChanges {
            amount: Some(Money::new(dec!(150.00))),
            ..Default::default()
        };
        let err = h
            .ledger
            .update_expense(&creator, expense.id, changes)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSplit);

        let stored = h.ledger.get_expense(&creator, expense.id).await.unwrap();
        assert_eq!(stored.amount, Money::new(dec!(100.00)));
    }

    #[tokio::test]
    async fn test_strategy_change_replaces_splits() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let ids: Vec<MemberId> = snapshot.members.iter().map(|m| m.id).collect();
        let expense = h
            .ledger
            .create_expense(
                &creator,
                snapshot.trip_id(),
                NewExpenseBuilder::new(ids[0]).amount(dec!(99.99)).build(),
            )
            .await
            .unwrap();

        let changes = ExpenseChanges {
            strategy: Some(
                NewExpenseBuilder::new(ids[0])
                    .percentage(&[(ids[0], dec!(30)), (ids[1], dec!(30)), (ids[2], dec!(40))])
                    .build()
                    .strategy,
            ),
            ..Default::default()
        };
        let updated = h
            .ledger
            .update_expense(&creator, expense.id, changes)
            .await
            .unwrap();

        assert!(matches!(
            h.ledger.get_expense(&creator, expense.id).await.unwrap().split_kind,
            SplitKind::Percentage
        ));
        let amounts: Vec<_> = updated.splits.iter().map(|s| s.amount.amount()).collect();
        assert_eq!(amounts, vec![dec!(30.00), dec!(30.00), dec!(39.99)]);
        assert_expense_balanced(&updated);
    }

    #[tokio::test]
    async fn test_expenses_are_listed_newest_first() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let payer = snapshot.members[0].id;

        for (date, description) in [
            (DateFixtures::expense_date(), "Early"),
            (DateFixtures::later_expense_date(), "Late"),
        ] {
            let input = NewExpenseBuilder::new(payer)
                .on(date)
                .description(description)
                .build();
            h.ledger
                .create_expense(&creator, snapshot.trip_id(), input)
                .await
                .unwrap();
        }

        let listed = h.ledger.list_expenses(&creator, snapshot.trip_id()).await.unwrap();
        let descriptions: Vec<_> = listed.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Late", "Early"]);
    }

    #[tokio::test]
    async fn test_reading_an_expense_requires_access() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let expense = h
            .ledger
            .create_expense(
                &PrincipalFixtures::creator(&snapshot),
                snapshot.trip_id(),
                NewExpenseBuilder::new(snapshot.members[0].id).build(),
            )
            .await
            .unwrap();

        let err = h
            .ledger
            .get_expense(&PrincipalFixtures::stranger(), expense.id)
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
    }
}

// ============================================================================
// Settlements
// ============================================================================

mod settlement_tests {
    use super::*;

    #[tokio::test]
    async fn test_deleting_only_expense_leaves_zero_rows() {
        let snapshot = TripSnapshotBuilder::new().with_guest().build();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let expense = h
            .ledger
            .create_expense(
                &creator,
                snapshot.trip_id(),
                NewExpenseBuilder::new(snapshot.members[0].id).build(),
            )
            .await
            .unwrap();

        h.ledger.delete_expense(&creator, expense.id).await.unwrap();

        let summary = h.ledger.get_settlements(snapshot.trip_id()).await.unwrap();
        assert_eq!(summary.rows.len(), 2);
        assert!(summary.total.is_zero());
        let rows: Vec<_> = summary.rows.into_iter().map(|r| r.settlement).collect();
        assert_settlements_zero(&rows);
    }

    #[tokio::test]
    async fn test_settlements_are_sorted_and_named() {
        let snapshot = TripSnapshotBuilder::new().with_guest().build();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let ids: Vec<MemberId> = snapshot.members.iter().map(|m| m.id).collect();
        let input = NewExpenseBuilder::new(ids[0])
            .exact(&[(ids[0], dec!(25.00)), (ids[1], dec!(75.00))])
            .build();
        h.ledger
            .create_expense(&creator, snapshot.trip_id(), input)
            .await
            .unwrap();

        let summary = h.ledger.get_settlements(snapshot.trip_id()).await.unwrap();

        assert_eq!(summary.total, Money::new(dec!(100.00)));
        assert_eq!(summary.rows[0].settlement.member_id, ids[1]);
        assert_eq!(summary.rows[0].settlement.amount, Money::new(dec!(75.00)));
        assert_eq!(summary.rows[0].member_name.as_deref(), Some(PeopleFixtures::guest_name()));
        assert_eq!(summary.rows[1].member_name.as_deref(), Some(PeopleFixtures::owner_name()));
    }

    #[tokio::test]
    async fn test_detail_lists_contributions_newest_first() {
        let snapshot = TripSnapshotBuilder::new().with_guest().build();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let guest_id = snapshot.members[1].id;

        for (date, description) in [
            (DateFixtures::expense_date(), "Museum"),
            (DateFixtures::later_expense_date(), "Ferry"),
        ] {
            let input = NewExpenseBuilder::new(snapshot.members[0].id)
                .on(date)
                .description(description)
                .amount(dec!(20.00))
                .build();
            h.ledger
                .create_expense(&creator, snapshot.trip_id(), input)
                .await
                .unwrap();
        }

        let detail = h
            .ledger
            .get_settlement_detail(snapshot.trip_id(), guest_id)
            .await
            .unwrap();

        assert_eq!(detail.settlement.amount, Money::new(dec!(20.00)));
        assert_eq!(detail.member_name.as_deref(), Some(PeopleFixtures::guest_name()));
        let descriptions: Vec<_> = detail
            .contributions
            .iter()
            .map(|c| c.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["Ferry", "Museum"]);
    }

    #[tokio::test]
    async fn test_detail_without_settlement_is_not_found() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;

        let err = h
            .ledger
            .get_settlement_detail(snapshot.trip_id(), MemberId::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_settlements_of_unknown_trip_are_not_found() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;

        let err = h.ledger.get_settlements(TripId::new()).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_recalculation_is_idempotent() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        h.ledger
            .create_expense(
                &PrincipalFixtures::creator(&snapshot),
                snapshot.trip_id(),
                NewExpenseBuilder::new(snapshot.members[0].id).build(),
            )
            .await
            .unwrap();

        let before = h.ledger.get_settlements(snapshot.trip_id()).await.unwrap();
        let first = h.ledger.recalculate_settlements(snapshot.trip_id()).await.unwrap();
        let second = h.ledger.recalculate_settlements(snapshot.trip_id()).await.unwrap();
        let after = h.ledger.get_settlements(snapshot.trip_id()).await.unwrap();

        assert_eq!(first.balances, second.balances);
        assert_eq!(before.total, after.total);
        let ids_before: Vec<_> = before.rows.iter().map(|r| (r.settlement.id, r.settlement.amount)).collect();
        let ids_after: Vec<_> = after.rows.iter().map(|r| (r.settlement.id, r.settlement.amount)).collect();
        assert_eq!(ids_before, ids_after);
    }

    #[tokio::test]
    async fn test_failed_recalculation_rolls_back_expense() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        h.store.fail_settlement_writes(true);

        let err = h
            .ledger
            .create_expense(
                &creator,
                snapshot.trip_id(),
                NewExpenseBuilder::new(snapshot.members[0].id).build(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(h.store.expense_count().await, 0);
        assert!(h
            .store
            .list_settlements(snapshot.trip_id())
            .await
            .unwrap()
            .is_empty());

        h.store.fail_settlement_writes(false);
        h.ledger
            .create_expense(
                &creator,
                snapshot.trip_id(),
                NewExpenseBuilder::new(snapshot.members[0].id).build(),
            )
            .await
            .unwrap();
        assert_eq!(h.store.expense_count().await, 1);
    }

    #[tokio::test]
    async fn test_expense_writes_are_announced() {
        let snapshot = three_member_trip();
        let mut h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);

        let expense = h
            .ledger
            .create_expense(
                &creator,
                snapshot.trip_id(),
                NewExpenseBuilder::new(snapshot.members[0].id).build(),
            )
            .await
            .unwrap();
        h.ledger.delete_expense(&creator, expense.id).await.unwrap();

        assert_eq!(
            drain(&mut h.events),
            vec![
                "expense_recorded",
                "settlements_recalculated",
                "expense_deleted",
                "settlements_recalculated",
            ]
        );
    }
}

// ============================================================================
// Snapshot cache
// ============================================================================

mod cache_tests {
    use super::*;

    async fn join_behind_cache(h: &Harness, snapshot: &TripSnapshot) -> Principal {
        let user_id = UserId::new();
        let mut invitation =
            Invitation::new(snapshot.trip_id(), "late@example.com", snapshot.owner_id()).unwrap();
        h.store.insert_invitation(&invitation, None).await.unwrap();

        invitation.accept().unwrap();
        let member = Member::linked(snapshot.trip_id(), user_id, "late@example.com", "Late").unwrap();
        h.store.accept_invitation(&invitation, &member).await.unwrap();
        Principal::new(user_id, "late@example.com")
    }

    #[tokio::test]
    async fn test_snapshot_is_served_from_cache() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);

        h.ledger.list_expenses(&creator, snapshot.trip_id()).await.unwrap();
        h.ledger.list_expenses(&creator, snapshot.trip_id()).await.unwrap();

        assert_eq!(h.store.snapshot_reads(), 1);
    }

    #[tokio::test]
    async fn test_stale_snapshot_hides_member_until_invalidated() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        h.ledger.list_expenses(&creator, snapshot.trip_id()).await.unwrap();

        let late = join_behind_cache(&h, &snapshot).await;
        let err = h
            .ledger
            .list_expenses(&late, snapshot.trip_id())
            .await
            .unwrap_err();
        assert!(err.is_forbidden());

        h.snapshots.invalidate(snapshot.trip_id()).await.unwrap();
        assert!(h.ledger.list_expenses(&late, snapshot.trip_id()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_snapshot_expires_after_ttl() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        h.ledger.list_expenses(&creator, snapshot.trip_id()).await.unwrap();

        let late = join_behind_cache(&h, &snapshot).await;
        assert!(h
            .ledger
            .list_expenses(&late, snapshot.trip_id())
            .await
            .unwrap_err()
            .is_forbidden());

        tokio::time::advance(DEFAULT_SNAPSHOT_TTL + Duration::from_secs(1)).await;
        assert!(h.ledger.list_expenses(&late, snapshot.trip_id()).await.is_ok());
    }

    #[tokio::test]
    async fn test_accepting_invitation_is_visible_immediately() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        h.ledger.list_expenses(&creator, snapshot.trip_id()).await.unwrap();

        let newcomer = Principal::new(UserId::new(), "newcomer@example.com");
        h.trips
            .invite_member(&creator, snapshot.trip_id(), "newcomer@example.com")
            .await
            .unwrap();
        let member = h
            .trips
            .accept_invitation(&newcomer, snapshot.trip_id(), "Newcomer")
            .await
            .unwrap();

        let expense = h
            .ledger
            .create_expense(
                &newcomer,
                snapshot.trip_id(),
                NewExpenseBuilder::new(member.id).build(),
            )
            .await
            .unwrap();
        assert_eq!(expense.created_by, Some(member.id));
        assert_eq!(expense.splits.len(), 4);
    }
}

// ============================================================================
// Trip and membership writes
// ============================================================================

mod trip_service_tests {
    use super::*;

    fn new_trip(start: chrono::NaiveDate, end: chrono::NaiveDate) -> NewTrip {
        NewTrip {
            name: "Alps".to_string(),
            start_date: start,
            end_date: end,
            location: Some("Chamonix".to_string()),
            description: None,
            creator_name: "Ines".to_string(),
        }
    }

    #[tokio::test]
    async fn test_creator_becomes_first_member() {
        let snapshot = three_member_trip();
        let mut h = harness(&snapshot).await;
        let principal = Principal::new(UserId::new(), "ines@example.com");

        let created = h
            .trips
            .create_trip(
                &principal,
                new_trip(DateFixtures::trip_start(), DateFixtures::trip_end()),
            )
            .await
            .unwrap();

        assert_eq!(created.members.len(), 1);
        assert_eq!(created.members[0].user_id, Some(principal.user_id));

        let loaded = h.trips.get_trip(&principal, created.trip_id()).await.unwrap();
        assert_eq!(loaded.trip.location.as_deref(), Some("Chamonix"));
        assert_eq!(drain(&mut h.events), vec!["trip_created"]);
    }

    #[tokio::test]
    async fn test_inverted_dates_are_rejected() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let principal = Principal::new(UserId::new(), "ines@example.com");

        let err = h
            .trips
            .create_trip(
                &principal,
                new_trip(DateFixtures::trip_end(), DateFixtures::trip_start()),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DegenerateInput);
    }

    #[tokio::test]
    async fn test_only_creator_adds_members() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let guest = PrincipalFixtures::member(&snapshot.members[1]);

        let err = h
            .trips
            .add_member(&guest, snapshot.trip_id(), "friend@example.com", "Friend")
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts_case_insensitively() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);

        let err = h
            .trips
            .add_member(&creator, snapshot.trip_id(), "GABRIEL@example.com", "Gabe")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_added_member_can_access_trip() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        h.trips.get_trip(&creator, snapshot.trip_id()).await.unwrap();

        let member = h
            .trips
            .add_member(&creator, snapshot.trip_id(), "friend@example.com", "Friend")
            .await
            .unwrap();

        let friend = PrincipalFixtures::member(&member);
        let loaded = h.trips.get_trip(&friend, snapshot.trip_id()).await.unwrap();
        assert_eq!(loaded.members.len(), 4);
    }

    #[tokio::test]
    async fn test_referenced_member_cannot_be_removed() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        h.ledger
            .create_expense(
                &creator,
                snapshot.trip_id(),
                NewExpenseBuilder::new(snapshot.members[0].id).build(),
            )
            .await
            .unwrap();

        let err = h
            .trips
            .remove_member(&creator, snapshot.trip_id(), snapshot.members[2].id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_unreferenced_member_is_removed() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let removed = snapshot.members[2].id;

        h.trips
            .remove_member(&creator, snapshot.trip_id(), removed)
            .await
            .unwrap();

        let loaded = h.trips.get_trip(&creator, snapshot.trip_id()).await.unwrap();
        assert!(!loaded.has_member(removed));
    }

    #[tokio::test]
    async fn test_creator_row_cannot_be_removed() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);

        let err = h
            .trips
            .remove_member(&creator, snapshot.trip_id(), snapshot.members[0].id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_trip_update_is_creator_only_and_visible() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let guest = PrincipalFixtures::member(&snapshot.members[1]);
        let rename = || TripChanges {
            name: Some("Porto instead".to_string()),
            ..Default::default()
        };

        assert!(h
            .trips
            .update_trip(&guest, snapshot.trip_id(), rename())
            .await
            .unwrap_err()
            .is_forbidden());

        h.trips.get_trip(&creator, snapshot.trip_id()).await.unwrap();
        h.trips
            .update_trip(&creator, snapshot.trip_id(), rename())
            .await
            .unwrap();

        let loaded = h.trips.get_trip(&guest, snapshot.trip_id()).await.unwrap();
        assert_eq!(loaded.trip.name, "Porto instead");
    }

    #[tokio::test]
    async fn test_deleting_trip_removes_its_ledger() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        h.ledger
            .create_expense(
                &creator,
                snapshot.trip_id(),
                NewExpenseBuilder::new(snapshot.members[0].id).build(),
            )
            .await
            .unwrap();

        h.trips.delete_trip(&creator, snapshot.trip_id()).await.unwrap();

        assert!(h.trips.get_trip(&creator, snapshot.trip_id()).await.unwrap_err().is_not_found());
        assert!(h.ledger.get_settlements(snapshot.trip_id()).await.unwrap_err().is_not_found());
        assert_eq!(h.store.expense_count().await, 0);
    }
}

// ============================================================================
// Invitations
// ============================================================================

mod invitation_tests {
    use super::*;

    const NEWCOMER: &str = "newcomer@example.com";

    fn newcomer() -> Principal {
        Principal::new(UserId::new(), NEWCOMER)
    }

    #[tokio::test]
    async fn test_accepting_without_invitation_is_not_found() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;

        let err = h
            .trips
            .accept_invitation(&PrincipalFixtures::stranger(), snapshot.trip_id(), "Mallory")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let loaded = h
            .trips
            .get_trip(&PrincipalFixtures::creator(&snapshot), snapshot.trip_id())
            .await
            .unwrap();
        assert_eq!(loaded.members.len(), 3);
    }

    #[tokio::test]
    async fn test_invitation_for_another_trip_does_not_admit() {
        let snapshot = three_member_trip();
        let other = TripSnapshotBuilder::new().with_name("Other").build();
        let store = MockLedgerStore::with_snapshots(vec![snapshot.clone(), other.clone()]).await;
        let cache = TripSnapshotCache::new(Arc::new(InMemoryCacheStore::new()), DEFAULT_SNAPSHOT_TTL);
        let snapshots = SnapshotLoader::new(Arc::new(store.clone()), cache);
        let (notifier, _events) = ChannelNotifier::new(16);
        let trips = TripService::new(snapshots, Arc::new(notifier));

        trips
            .invite_member(&PrincipalFixtures::creator(&other), other.trip_id(), NEWCOMER)
            .await
            .unwrap();

        let err = trips
            .accept_invitation(&newcomer(), snapshot.trip_id(), "Newcomer")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_invitee_accepts_and_joins() {
        let snapshot = three_member_trip();
        let mut h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let newcomer = newcomer();

        let invitation = h
            .trips
            .invite_member(&creator, snapshot.trip_id(), "NewComer@Example.com")
            .await
            .unwrap();
        assert_eq!(invitation.email, NEWCOMER);
        assert_eq!(invitation.status, InvitationStatus::Pending);

        let member = h
            .trips
            .accept_invitation(&newcomer, snapshot.trip_id(), "Newcomer")
            .await
            .unwrap();
        assert_eq!(member.user_id, Some(newcomer.user_id));

        let loaded = h.trips.get_trip(&newcomer, snapshot.trip_id()).await.unwrap();
        assert!(loaded.has_member(member.id));
        assert!(h
            .trips
            .pending_invitations(&creator, snapshot.trip_id())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(drain(&mut h.events), vec!["invitation_sent", "member_joined"]);
    }

    #[tokio::test]
    async fn test_added_member_is_linked_on_accept() {
        let snapshot = three_member_trip();
        let mut h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let newcomer = newcomer();

        let added = h
            .trips
            .add_member(&creator, snapshot.trip_id(), NEWCOMER, "Newcomer")
            .await
            .unwrap();
        assert_eq!(added.user_id, None);
        assert_eq!(drain(&mut h.events), vec!["invitation_sent"]);

        let joined = h
            .trips
            .accept_invitation(&newcomer, snapshot.trip_id(), "Ignored")
            .await
            .unwrap();
        assert_eq!(joined.id, added.id);
        assert_eq!(joined.name, "Newcomer");
        assert_eq!(joined.user_id, Some(newcomer.user_id));

        let loaded = h.trips.get_trip(&creator, snapshot.trip_id()).await.unwrap();
        assert_eq!(loaded.members.len(), 4);
    }

    #[tokio::test]
    async fn test_creator_cannot_invite_themselves() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);

        let err = h
            .trips
            .invite_member(&creator, snapshot.trip_id(), &creator.email.to_uppercase())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DegenerateInput);
    }

    #[tokio::test]
    async fn test_second_invitation_for_email_conflicts() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        h.trips
            .invite_member(&creator, snapshot.trip_id(), NEWCOMER)
            .await
            .unwrap();

        let err = h
            .trips
            .invite_member(&creator, snapshot.trip_id(), "NEWCOMER@example.com")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_only_creator_invites() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let guest = PrincipalFixtures::member(&snapshot.members[1]);

        let err = h
            .trips
            .invite_member(&guest, snapshot.trip_id(), NEWCOMER)
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[tokio::test]
    async fn test_rejected_invitation_cannot_be_accepted() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let newcomer = newcomer();
        h.trips
            .invite_member(&creator, snapshot.trip_id(), NEWCOMER)
            .await
            .unwrap();

        let rejected = h
            .trips
            .reject_invitation(&newcomer, snapshot.trip_id())
            .await
            .unwrap();
        assert_eq!(rejected.status, InvitationStatus::Rejected);

        let err = h
            .trips
            .accept_invitation(&newcomer, snapshot.trip_id(), "Newcomer")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(h
            .trips
            .get_trip(&newcomer, snapshot.trip_id())
            .await
            .unwrap_err()
            .is_forbidden());
    }

    #[tokio::test]
    async fn test_rejected_invitation_is_replaced_by_new_invite() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let newcomer = newcomer();
        let first = h
            .trips
            .invite_member(&creator, snapshot.trip_id(), NEWCOMER)
            .await
            .unwrap();
        h.trips
            .reject_invitation(&newcomer, snapshot.trip_id())
            .await
            .unwrap();

        let second = h
            .trips
            .invite_member(&creator, snapshot.trip_id(), NEWCOMER)
            .await
            .unwrap();
        assert_ne!(second.id, first.id);

        h.trips
            .accept_invitation(&newcomer, snapshot.trip_id(), "Newcomer")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_invitation_cannot_be_accepted() {
        let snapshot = three_member_trip();
        let mut h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let guest = PrincipalFixtures::member(&snapshot.members[1]);
        h.trips
            .invite_member(&creator, snapshot.trip_id(), NEWCOMER)
            .await
            .unwrap();

        assert!(h
            .trips
            .cancel_invitation(&guest, snapshot.trip_id(), NEWCOMER)
            .await
            .unwrap_err()
            .is_forbidden());
        h.trips
            .cancel_invitation(&creator, snapshot.trip_id(), NEWCOMER)
            .await
            .unwrap();

        let err = h
            .trips
            .accept_invitation(&newcomer(), snapshot.trip_id(), "Newcomer")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            drain(&mut h.events),
            vec!["invitation_sent", "invitation_cancelled"]
        );
    }

    #[tokio::test]
    async fn test_invitations_are_listed_for_creator_and_invitee() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let guest = PrincipalFixtures::member(&snapshot.members[1]);
        h.trips
            .invite_member(&creator, snapshot.trip_id(), NEWCOMER)
            .await
            .unwrap();

        let pending = h
            .trips
            .pending_invitations(&creator, snapshot.trip_id())
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].is_for(NEWCOMER));
        assert!(h
            .trips
            .pending_invitations(&guest, snapshot.trip_id())
            .await
            .unwrap_err()
            .is_forbidden());

        let mine = h.trips.my_invitations(&newcomer()).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].trip_id, snapshot.trip_id());
        assert!(h
            .trips
            .my_invitations(&PrincipalFixtures::stranger())
            .await
            .unwrap()
            .is_empty());
    }
}

// ============================================================================
// Concurrent writes
// ============================================================================

mod concurrency_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_keep_both_changes() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let ledger = Arc::new(h.ledger);
        let creator = PrincipalFixtures::creator(&snapshot);
        let guest = PrincipalFixtures::member(&snapshot.members[1]);

        for round in 0..20 {
            let expense = ledger
                .create_expense(
                    &guest,
                    snapshot.trip_id(),
                    NewExpenseBuilder::new(snapshot.members[1].id)
                        .amount(dec!(90.00))
                        .build(),
                )
                .await
                .unwrap();

            let reprice = {
                let ledger = Arc::clone(&ledger);
                let creator = creator.clone();
                let changes = ExpenseChanges {
                    amount: Some(Money::new(dec!(150.00))),
                    ..Default::default()
                };
                tokio::spawn(async move { ledger.update_expense(&creator, expense.id, changes).await })
            };
            let rename = {
                let ledger = Arc::clone(&ledger);
                let guest = guest.clone();
                let changes = ExpenseChanges {
                    description: Some(format!("Boat hire {}", round)),
                    ..Default::default()
                };
                tokio::spawn(async move { ledger.update_expense(&guest, expense.id, changes).await })
            };
            reprice.await.unwrap().unwrap();
            rename.await.unwrap().unwrap();

            let stored = ledger.get_expense(&creator, expense.id).await.unwrap();
            assert_eq!(stored.amount, Money::new(dec!(150.00)));
            assert_eq!(stored.description, format!("Boat hire {}", round));
            assert_expense_balanced(&stored);
        }

        let expenses = ledger
            .list_expenses(&creator, snapshot.trip_id())
            .await
            .unwrap();
        let settlements = h.store.list_settlements(snapshot.trip_id()).await.unwrap();
        assert_settlements_balance(&settlements, &expenses);
    }

    #[tokio::test]
    async fn test_update_racing_delete_does_not_resurrect() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let expense = h
            .ledger
            .create_expense(
                &creator,
                snapshot.trip_id(),
                NewExpenseBuilder::new(snapshot.members[0].id).build(),
            )
            .await
            .unwrap();

        let rename = ExpenseChanges {
            description: Some("Renamed".to_string()),
            ..Default::default()
        };
        let (deleted, updated) = tokio::join!(
            h.ledger.delete_expense(&creator, expense.id),
            h.ledger.update_expense(&creator, expense.id, rename),
        );
        deleted.unwrap();
        assert!(updated.unwrap_err().is_not_found());

        assert_eq!(h.store.expense_count().await, 0);
        let settlements = h.store.list_settlements(snapshot.trip_id()).await.unwrap();
        assert_settlements_zero(&settlements);
    }

    #[tokio::test]
    async fn test_interleaved_creates_settle_every_expense() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let creator = PrincipalFixtures::creator(&snapshot);
        let guest = PrincipalFixtures::member(&snapshot.members[1]);
        let third = PrincipalFixtures::member(&snapshot.members[2]);
        let expense = |payer: usize, amount| {
            NewExpenseBuilder::new(snapshot.members[payer].id)
                .amount(amount)
                .build()
        };

        let (a, b, c) = tokio::join!(
            h.ledger.create_expense(&creator, snapshot.trip_id(), expense(0, dec!(30.00))),
            h.ledger.create_expense(&guest, snapshot.trip_id(), expense(1, dec!(45.50))),
            h.ledger.create_expense(&third, snapshot.trip_id(), expense(2, dec!(10.01))),
        );
        let expenses = vec![a.unwrap(), b.unwrap(), c.unwrap()];

        let settlements = h.store.list_settlements(snapshot.trip_id()).await.unwrap();
        assert_eq!(settlements.len(), 3);
        assert_settlements_balance(&settlements, &expenses);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_creates_settle_every_expense() {
        let snapshot = three_member_trip();
        let h = harness(&snapshot).await;
        let ledger = Arc::new(h.ledger);

        let mut handles = Vec::new();
        for i in 0..12 {
            let ledger = Arc::clone(&ledger);
            let payer = &snapshot.members[i % snapshot.members.len()];
            let principal = PrincipalFixtures::member(payer);
            let input = NewExpenseBuilder::new(payer.id)
                .amount(rust_decimal::Decimal::new(1000 + i as i64 * 37, 2))
                .build();
            let trip_id = snapshot.trip_id();
            handles.push(tokio::spawn(async move {
                ledger.create_expense(&principal, trip_id, input).await
            }));
        }

        let mut expenses = Vec::new();
        for handle in handles {
            expenses.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(h.store.expense_count().await, 12);
        let settlements = h.store.list_settlements(snapshot.trip_id()).await.unwrap();
        assert_eq!(settlements.len(), 3);
        assert_settlements_balance(&settlements, &expenses);
    }
}
