//! Access policy tests for domain_trip

use chrono::NaiveDate;

use core_kernel::{DateRange, MemberId, UserId};

use domain_trip::{
    can_modify_owned_resource, can_modify_trip, evaluate_access, resolve_member_id, AccessPolicy,
    AccessRole, Member, Principal, Trip, TripAccessPolicy, TripSnapshot,
};

struct Fixture {
    owner: Principal,
    owner_member: Member,
    alice: Member,
    bob: Member,
    snapshot: TripSnapshot,
}

fn fixture() -> Fixture {
    let owner = Principal::new(UserId::new(), "owner@example.com");
    let dates = DateRange::new(
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 9, 7).unwrap(),
    )
    .unwrap();
    let trip = Trip::new(owner.user_id, "Alps", dates).unwrap();

    let owner_member = Member::linked(trip.id, owner.user_id, "owner@example.com", "Owner").unwrap();
    let alice = Member::new(trip.id, "alice@example.com", "Alice").unwrap();
    let bob = Member::new(trip.id, "bob@example.com", "Bob").unwrap();

    let snapshot = TripSnapshot::new(
        trip,
        vec![owner_member.clone(), alice.clone(), bob.clone()],
    );

    Fixture {
        owner,
        owner_member,
        alice,
        bob,
        snapshot,
    }
}

// ============================================================================
// EvaluateAccess
// ============================================================================

mod evaluate_access_tests {
    use super::*;

    #[test]
    fn test_creator_is_recognised_by_user_id() {
        let f = fixture();
        let decision = evaluate_access(&f.owner, &f.snapshot);

        assert!(decision.can_access);
        assert_eq!(decision.role, AccessRole::Creator);
        assert!(decision.is_creator());
    }

    #[test]
    fn test_creator_rights_do_not_depend_on_email() {
        let f = fixture();
        let renamed = Principal::new(f.owner.user_id, "someone-else@example.com");

        assert_eq!(evaluate_access(&renamed, &f.snapshot).role, AccessRole::Creator);
    }

    #[test]
    fn test_owner_email_with_other_user_id_is_only_a_member() {
        let f = fixture();
        let impostor = Principal::new(UserId::new(), "owner@example.com");
        let decision = evaluate_access(&impostor, &f.snapshot);

        assert!(decision.can_access);
        assert_eq!(decision.role, AccessRole::Member);
        assert!(!can_modify_trip(impostor.user_id, &f.snapshot));
    }

    #[test]
    fn test_member_email_match_is_case_insensitive() {
        let f = fixture();
        let alice = Principal::new(UserId::new(), "ALICE@Example.COM");
        let decision = evaluate_access(&alice, &f.snapshot);

        assert!(decision.can_access);
        assert_eq!(decision.role, AccessRole::Member);
    }

    #[test]
    fn test_stranger_is_denied() {
        let f = fixture();
        let stranger = Principal::new(UserId::new(), "mallory@example.com");
        let decision = evaluate_access(&stranger, &f.snapshot);

        assert!(!decision.can_access);
        assert_eq!(decision.role, AccessRole::Stranger);
    }
}

// ============================================================================
// Modification rights
// ============================================================================

mod modification_tests {
    use super::*;

    #[test]
    fn test_only_creator_modifies_trip() {
        let f = fixture();
        assert!(can_modify_trip(f.owner.user_id, &f.snapshot));
        assert!(!can_modify_trip(UserId::new(), &f.snapshot));
    }

    #[test]
    fn test_creator_modifies_any_resource() {
        let f = fixture();
        assert!(can_modify_owned_resource(&f.owner, &f.snapshot, Some(f.alice.id)));
        assert!(can_modify_owned_resource(&f.owner, &f.snapshot, Some(f.owner_member.id)));
        assert!(can_modify_owned_resource(&f.owner, &f.snapshot, None));
    }

    #[test]
    fn test_member_modifies_only_own_resource() {
        let f = fixture();
        let alice = Principal::new(UserId::new(), "alice@example.com");

        assert!(can_modify_owned_resource(&alice, &f.snapshot, Some(f.alice.id)));
        assert!(!can_modify_owned_resource(&alice, &f.snapshot, Some(f.bob.id)));
        assert!(!can_modify_owned_resource(&alice, &f.snapshot, Some(f.owner_member.id)));
    }

    #[test]
    fn test_resource_without_recorder_is_creator_only() {
        let f = fixture();
        let bob = Principal::new(UserId::new(), "bob@example.com");

        assert!(!can_modify_owned_resource(&bob, &f.snapshot, None));
    }

    #[test]
    fn test_stranger_modifies_nothing() {
        let f = fixture();
        let stranger = Principal::new(UserId::new(), "mallory@example.com");

        assert!(!can_modify_owned_resource(&stranger, &f.snapshot, Some(f.alice.id)));
        assert!(!can_modify_owned_resource(&stranger, &f.snapshot, Some(MemberId::new())));
    }
}

// ============================================================================
// ResolveMemberId and the policy trait
// ============================================================================

mod resolution_tests {
    use super::*;

    #[test]
    fn test_resolve_member_id_folds_case() {
        let f = fixture();
        assert_eq!(resolve_member_id("BOB@example.com", &f.snapshot.members), Some(f.bob.id));
        assert_eq!(resolve_member_id("nobody@example.com", &f.snapshot.members), None);
    }

    #[test]
    fn test_policy_trait_agrees_with_free_functions() {
        let f = fixture();
        let policy: &dyn AccessPolicy = &TripAccessPolicy;
        let alice = Principal::new(UserId::new(), "alice@example.com");

        assert_eq!(
            policy.evaluate_access(&alice, &f.snapshot),
            evaluate_access(&alice, &f.snapshot)
        );
        assert!(policy.can_modify_trip(f.owner.user_id, &f.snapshot));
        assert!(policy.can_modify_owned_resource(&alice, &f.snapshot, Some(f.alice.id)));
        assert_eq!(
            policy.resolve_member_id("alice@example.com", &f.snapshot.members),
            Some(f.alice.id)
        );
    }

    #[test]
    fn test_snapshot_survives_serialization() {
        let f = fixture();
        let json = serde_json::to_string(&f.snapshot).unwrap();
        let decoded: TripSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, f.snapshot);
    }
}

// ============================================================================
// Properties
// ============================================================================

mod access_properties {
    use super::*;
    use proptest::prelude::*;

    fn recase(email: &str, mask: &[bool]) -> String {
        email
            .chars()
            .zip(mask.iter().cycle())
            .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_any_casing_of_a_member_email_grants_member_role(
            mask in proptest::collection::vec(any::<bool>(), 1..8)
        ) {
            let f = fixture();
            let principal = Principal::new(UserId::new(), recase("alice@example.com", &mask));
            let decision = evaluate_access(&principal, &f.snapshot);

            prop_assert!(decision.can_access);
            prop_assert_eq!(decision.role, AccessRole::Member);
            prop_assert_eq!(
                resolve_member_id(&principal.email, &f.snapshot.members),
                Some(f.alice.id)
            );
        }

        #[test]
        fn prop_unknown_local_parts_are_strangers(local in "[a-z]{1,12}") {
            prop_assume!(local != "alice" && local != "bob" && local != "owner");
            let f = fixture();
            let principal = Principal::new(UserId::new(), format!("{}@example.com", local));

            prop_assert_eq!(evaluate_access(&principal, &f.snapshot).role, AccessRole::Stranger);
            prop_assert!(!can_modify_trip(principal.user_id, &f.snapshot));
        }
    }
}
