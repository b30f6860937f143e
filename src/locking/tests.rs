//! Tests for the lock state machine.

use super::*;
use crate::error::TreeLockError;
use proptest::prelude::*;

const WORLD: [&str; 7] = [
    "World",
    "Asia",
    "Africa",
    "China",
    "India",
    "SouthAfrica",
    "Egypt",
];

fn world() -> LockManager {
    LockManager::new(Arc::new(Tree::build(&WORLD, 2).unwrap()))
}

fn id(manager: &LockManager, label: &str) -> NodeId {
    manager.tree().resolve(label).unwrap()
}

fn snapshot(manager: &LockManager) -> Vec<LockState> {
    manager
        .tree()
        .iter()
        .map(|node| manager.state(node).clone())
        .collect()
}

const ALICE: OwnerId = OwnerId(9);
const BOB: OwnerId = OwnerId(4);

// ============================================================================
// Reference scenario
// ============================================================================

#[test]
fn test_world_scenario() {
    let mut manager = world();

    assert!(manager.lock("China", ALICE).unwrap());
    assert!(manager.lock("India", ALICE).unwrap());
    assert!(manager.upgrade("Asia", ALICE).unwrap());
    assert!(!manager.unlock("India", ALICE).unwrap());
    assert!(manager.unlock("Asia", ALICE).unwrap());

    manager.audit().unwrap();
    assert_eq!(manager.locked_nodes().count(), 0);
}

#[test]
fn test_world_scenario_through_queries() {
    let mut manager = world();
    let queries = [
        Query::lock("China", ALICE),
        Query::lock("India", ALICE),
        Query::upgrade("Asia", ALICE),
        Query::unlock("India", ALICE),
        Query::unlock("Asia", ALICE),
    ];

    let results: Vec<bool> = queries
        .iter()
        .map(|query| manager.apply(query).unwrap())
        .collect();
    assert_eq!(results, vec![true, true, true, false, true]);
}

// ============================================================================
// Lock
// ============================================================================

#[test]
fn test_lock_updates_counters() {
    let mut manager = world();
    assert!(manager.lock("Asia", ALICE).unwrap());

    let asia = id(&manager, "Asia");
    assert!(manager.is_locked(asia));
    assert_eq!(manager.owner(asia), Some(ALICE));
    assert_eq!(manager.state(id(&manager, "World")).descendant_locked, 1);
    assert_eq!(manager.state(id(&manager, "China")).ancestor_locked, 1);
    assert_eq!(manager.state(id(&manager, "India")).ancestor_locked, 1);
    assert_eq!(manager.state(id(&manager, "Egypt")).ancestor_locked, 0);
    assert_eq!(manager.state(asia).ancestor_locked, 0);
    assert_eq!(manager.state(asia).descendant_locked, 0);
}

#[test]
fn test_lock_reaches_whole_subtree() {
    let tree = Tree::build(&["a", "b", "c", "d", "e"], 1).unwrap();
    let mut manager = LockManager::new(Arc::new(tree));

    assert!(manager.lock("b", ALICE).unwrap());
    for label in ["c", "d", "e"] {
        assert_eq!(manager.state(id(&manager, label)).ancestor_locked, 1);
    }
    assert_eq!(manager.state(id(&manager, "a")).descendant_locked, 1);
}

#[test]
fn test_lock_already_locked() {
    let mut manager = world();
    assert!(manager.lock("Asia", ALICE).unwrap());

    let asia = id(&manager, "Asia");
    assert_eq!(manager.try_lock(asia, ALICE), Err(Rejection::AlreadyLocked));
    assert_eq!(manager.try_lock(asia, BOB), Err(Rejection::AlreadyLocked));
}

#[test]
fn test_lock_under_locked_ancestor() {
    let mut manager = world();
    assert!(manager.lock("World", BOB).unwrap());

    let china = id(&manager, "China");
    assert_eq!(manager.try_lock(china, ALICE), Err(Rejection::AncestorLocked));
    assert_eq!(manager.try_lock(china, BOB), Err(Rejection::AncestorLocked));
}

#[test]
fn test_lock_over_locked_descendant() {
    let mut manager = world();
    assert!(manager.lock("Egypt", BOB).unwrap());

    let world_id = id(&manager, "World");
    let africa = id(&manager, "Africa");
    assert_eq!(manager.try_lock(world_id, ALICE), Err(Rejection::DescendantLocked));
    assert_eq!(manager.try_lock(africa, BOB), Err(Rejection::DescendantLocked));

    // Siblings and cousins are unaffected.
    assert!(manager.lock("SouthAfrica", ALICE).unwrap());
    assert!(manager.lock("Asia", ALICE).unwrap());
    manager.audit().unwrap();
}

#[test]
fn test_rejected_lock_is_repeatable_and_side_effect_free() {
    let mut manager = world();
    assert!(manager.lock("China", BOB).unwrap());
    let before = snapshot(&manager);

    for _ in 0..3 {
        assert!(!manager.lock("Asia", ALICE).unwrap());
        assert_eq!(snapshot(&manager), before);
    }
}

// ============================================================================
// Unlock
// ============================================================================

#[test]
fn test_lock_unlock_round_trip() {
    let mut manager = world();
    assert!(manager.lock("Egypt", BOB).unwrap());
    let before = snapshot(&manager);

    assert!(manager.lock("Asia", ALICE).unwrap());
    assert_ne!(snapshot(&manager), before);
    assert!(manager.unlock("Asia", ALICE).unwrap());
    assert_eq!(snapshot(&manager), before);
}

#[test]
fn test_unlock_clears_owner() {
    let mut manager = world();
    assert!(manager.lock("India", ALICE).unwrap());
    assert!(manager.unlock("India", ALICE).unwrap());
    assert_eq!(manager.owner(id(&manager, "India")), None);
}

#[test]
fn test_unlock_by_non_owner() {
    let mut manager = world();
    assert!(manager.lock("India", ALICE).unwrap());
    let before = snapshot(&manager);

    let india = id(&manager, "India");
    assert_eq!(manager.try_unlock(india, BOB), Err(Rejection::OwnerMismatch));
    assert_eq!(snapshot(&manager), before);
}

#[test]
fn test_unlock_not_locked() {
    let mut manager = world();
    let india = id(&manager, "India");
    assert_eq!(manager.try_unlock(india, ALICE), Err(Rejection::NotLocked));
}

#[test]
fn test_unlock_does_not_reach_locked_descendant() {
    let mut manager = world();
    assert!(manager.lock("China", ALICE).unwrap());
    // The ancestor cannot be locked, so it cannot be unlocked either.
    assert!(!manager.unlock("Asia", ALICE).unwrap());
    assert!(manager.is_locked(id(&manager, "China")));
}

// ============================================================================
// Upgrade
// ============================================================================

#[test]
fn test_upgrade_consumes_descendant_locks() {
    let mut manager = world();
    assert!(manager.lock("China", ALICE).unwrap());
    assert!(manager.lock("Egypt", ALICE).unwrap());

    assert!(manager.upgrade("World", ALICE).unwrap());

    let world_id = id(&manager, "World");
    assert_eq!(manager.owner(world_id), Some(ALICE));
    assert!(!manager.is_locked(id(&manager, "China")));
    assert!(!manager.is_locked(id(&manager, "Egypt")));
    assert_eq!(manager.locked_nodes().collect::<Vec<_>>(), vec![(world_id, ALICE)]);
    manager.audit().unwrap();
}

#[test]
fn test_upgrade_with_single_descendant() {
    let mut manager = world();
    assert!(manager.lock("SouthAfrica", ALICE).unwrap());
    assert!(manager.upgrade("Africa", ALICE).unwrap());
    assert!(manager.is_locked(id(&manager, "Africa")));
    manager.audit().unwrap();
}

#[test]
fn test_upgrade_with_foreign_descendant_changes_nothing() {
    let mut manager = world();
    assert!(manager.lock("China", ALICE).unwrap());
    assert!(manager.lock("India", BOB).unwrap());
    assert!(manager.lock("Egypt", ALICE).unwrap());
    let before = snapshot(&manager);

    let world_id = id(&manager, "World");
    assert_eq!(
        manager.try_upgrade(world_id, ALICE),
        Err(Rejection::ForeignDescendant)
    );
    assert_eq!(snapshot(&manager), before);

    let asia = id(&manager, "Asia");
    assert_eq!(manager.try_upgrade(asia, BOB), Err(Rejection::ForeignDescendant));
    assert_eq!(snapshot(&manager), before);
}

#[test]
fn test_upgrade_without_locked_descendants() {
    let mut manager = world();
    assert!(manager.lock("Egypt", ALICE).unwrap());

    let asia = id(&manager, "Asia");
    assert_eq!(
        manager.try_upgrade(asia, ALICE),
        Err(Rejection::NoLockedDescendants)
    );

    let china = id(&manager, "China");
    assert_eq!(
        manager.try_upgrade(china, ALICE),
        Err(Rejection::NoLockedDescendants)
    );
}

#[test]
fn test_upgrade_on_locked_node() {
    let mut manager = world();
    assert!(manager.lock("Asia", ALICE).unwrap());
    let asia = id(&manager, "Asia");
    assert_eq!(manager.try_upgrade(asia, ALICE), Err(Rejection::AlreadyLocked));
}

#[test]
fn test_upgrade_under_locked_ancestor() {
    let tree = Tree::build(&["a", "b", "c"], 1).unwrap();
    let mut manager = LockManager::new(Arc::new(tree));

    // Climb the chain one upgrade at a time.
    assert!(manager.lock("c", ALICE).unwrap());
    assert!(manager.upgrade("b", ALICE).unwrap());
    assert!(manager.upgrade("a", ALICE).unwrap());
    manager.audit().unwrap();

    let b = id(&manager, "b");
    assert_eq!(manager.try_upgrade(b, ALICE), Err(Rejection::AncestorLocked));
}

#[test]
fn test_upgrade_skips_branches_without_locks() {
    let labels: Vec<String> = (0..40).map(|n| format!("n{}", n)).collect();
    let tree = Tree::build(&labels, 3).unwrap();
    let mut manager = LockManager::new(Arc::new(tree));

    assert!(manager.lock("n39", BOB).unwrap());
    assert!(manager.lock("n4", ALICE).unwrap());

    // n4 sits under n1 and n39 under n3; the n2 branch holds no locks.
    let root = manager.tree().root();
    assert_eq!(manager.try_upgrade(root, ALICE), Err(Rejection::ForeignDescendant));
    assert!(manager.unlock("n39", BOB).unwrap());
    assert_eq!(manager.try_upgrade(root, ALICE), Ok(()));
    manager.audit().unwrap();
}

// ============================================================================
// Misc
// ============================================================================

#[test]
fn test_unknown_label_is_an_error() {
    let mut manager = world();
    assert!(matches!(
        manager.lock("Mars", ALICE),
        Err(TreeLockError::UnknownLabel(_))
    ));
    assert!(matches!(
        manager.apply(&Query::upgrade("Mars", ALICE)),
        Err(TreeLockError::UnknownLabel(_))
    ));
    assert_eq!(manager.locked_nodes().count(), 0);
}

#[test]
fn test_evaluate_reports_reason() {
    let mut manager = world();
    let outcome = manager.evaluate(&Query::unlock("Asia", ALICE)).unwrap();
    assert!(!outcome.granted);
    assert_eq!(outcome.reason, Some(Rejection::NotLocked));

    let outcome = manager.evaluate(&Query::lock("Asia", ALICE)).unwrap();
    assert!(outcome.granted);
    assert_eq!(outcome.reason, None);
}

#[test]
fn test_reset_releases_everything() {
    let mut manager = world();
    assert!(manager.lock("China", ALICE).unwrap());
    assert!(manager.lock("Egypt", BOB).unwrap());
    manager.reset();

    assert_eq!(snapshot(&manager), vec![LockState::default(); WORLD.len()]);
    assert!(manager.lock("World", BOB).unwrap());
}

#[test]
fn test_audit_detects_corrupted_counters() {
    let mut manager = world();
    assert!(manager.lock("China", ALICE).unwrap());

    let asia = id(&manager, "Asia");
    manager.states[asia.index()].descendant_locked = 0;
    assert!(matches!(
        manager.audit(),
        Err(InvariantViolation::DescendantCount { ref label, recorded: 0, actual: 1 }) if label == "Asia"
    ));
}

#[test]
fn test_audit_detects_nested_locks() {
    let mut manager = world();
    let world_id = id(&manager, "World");
    let egypt = id(&manager, "Egypt");
    let africa = id(&manager, "Africa");

    // Counters consistent with both locks, which is still a violation.
    manager.states[world_id.index()].owner = Some(ALICE);
    manager.states[world_id.index()].descendant_locked = 1;
    manager.states[africa.index()].ancestor_locked = 1;
    manager.states[africa.index()].descendant_locked = 1;
    manager.states[egypt.index()].owner = Some(ALICE);
    manager.states[egypt.index()].ancestor_locked = 1;
    for label in ["Asia", "China", "India", "SouthAfrica"] {
        let node = id(&manager, label);
        manager.states[node.index()].ancestor_locked = 1;
    }

    assert!(matches!(
        manager.audit(),
        Err(InvariantViolation::NestedLocks { .. })
    ));
}

// ============================================================================
// Randomized
// ============================================================================

fn arb_tree() -> impl Strategy<Value = Tree> {
    (1usize..40, 1usize..5).prop_map(|(size, branching)| {
        let labels: Vec<String> = (0..size).map(|n| format!("r{}", n)).collect();
        Tree::build(&labels, branching).unwrap()
    })
}

fn arb_ops() -> impl Strategy<Value = Vec<(u8, usize, i64)>> {
    prop::collection::vec((1u8..=3, any::<usize>(), -1i64..2), 1..200)
}

fn no_nested_locks(manager: &LockManager) -> bool {
    let tree = manager.tree();
    manager
        .locked_nodes()
        .all(|(node, _)| tree.ancestors(node).all(|a| !manager.is_locked(a)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn counters_match_true_counts(tree in arb_tree(), ops in arb_ops()) {
        let len = tree.len();
        let mut manager = LockManager::new(Arc::new(tree));

        for (code, pick, owner) in ops {
            let node = manager.tree().iter().nth(pick % len).unwrap();
            let owner = OwnerId(owner);
            let before = snapshot(&manager);

            let decision = match Opcode::from_code(code).unwrap() {
                Opcode::Lock => manager.try_lock(node, owner),
                Opcode::Unlock => manager.try_unlock(node, owner),
                Opcode::Upgrade => manager.try_upgrade(node, owner),
            };

            if decision.is_err() {
                prop_assert_eq!(snapshot(&manager), before);
            } else {
                prop_assert_eq!(manager.owner(node), (code != 2).then_some(owner));
            }
            prop_assert_eq!(manager.audit(), Ok(()));
            prop_assert!(no_nested_locks(&manager));
        }
    }

    #[test]
    fn lock_then_unlock_restores_state(tree in arb_tree(), ops in arb_ops()) {
        let len = tree.len();
        let mut manager = LockManager::new(Arc::new(tree));

        for (_, pick, owner) in ops {
            let node = manager.tree().iter().nth(pick % len).unwrap();
            let owner = OwnerId(owner);
            let before = snapshot(&manager);

            if manager.lock_node(node, owner) {
                prop_assert!(manager.unlock_node(node, owner));
                prop_assert_eq!(snapshot(&manager), before);
                // Keep the lock so later iterations see a populated tree.
                prop_assert!(manager.lock_node(node, owner));
            }
        }
    }
}
