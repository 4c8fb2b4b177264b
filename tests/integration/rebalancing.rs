//! Integration test: rebalancing.
//!
//! Grow and shrink a cluster and check how shards move between versions.

use shardctl_ctrler::invariants;
use shardctl_integration_tests::{ReplicaSet, counts, join, leave, move_to};
use shardctl_types::Gid;

/// Joining a third group takes shards from the two largest groups, lowest
/// gid first, front of each group's list first.
#[test]
fn test_third_group_takes_front_shards() {
    let mut set = ReplicaSet::new(2, 10);
    set.submit(&join(&[1])).unwrap();
    set.submit(&join(&[2])).unwrap();
    assert_eq!(set.latest().shards_of(Gid::new(2)), vec![0, 1, 2, 3, 4]);

    set.submit(&join(&[3])).unwrap();
    let latest = set.latest();
    assert_eq!(counts(&latest), vec![(1, 3), (2, 4), (3, 3)]);
    assert_eq!(latest.shards_of(Gid::new(3)), vec![0, 5, 6]);
    set.assert_healthy();
    set.assert_converged();
}

/// From a balanced start, a join only moves shards onto the new group.
#[test]
fn test_join_moves_only_onto_new_group() {
    let mut set = ReplicaSet::new(1, 10);
    for id in 1..=10u64 {
        set.submit(&join(&[id])).unwrap();
        set.assert_healthy();

        let ctrler = set.replica(0);
        let num = ctrler.log().latest().num;
        let migrations = ctrler.migrations(num - 1, num).unwrap();
        assert!(
            migrations.iter().all(|m| m.to == Gid::new(id)),
            "join {id}: {migrations:?}"
        );
        assert_eq!(migrations.len(), ctrler.log().latest().shards_of(Gid::new(id)).len());
    }

    // Ten groups, ten shards: one each.
    assert!(counts(&set.latest()).iter().all(|(_, count)| *count == 1));
}

/// A leave only moves the departing group's shards.
#[test]
fn test_leave_moves_only_orphans() {
    let mut set = ReplicaSet::new(1, 12);
    set.submit(&join(&[1, 2, 3, 4])).unwrap();
    let before = set.latest();

    set.submit(&leave(&[2])).unwrap();
    let ctrler = set.replica(0);
    let migrations = ctrler.migrations(before.num, before.num + 1).unwrap();

    assert_eq!(migrations.len(), 3);
    assert!(migrations.iter().all(|m| m.from == Gid::new(2)));
    assert!(migrations.iter().all(|m| m.to != Gid::new(2)));
    assert_eq!(counts(&set.latest()), vec![(1, 4), (3, 4), (4, 4)]);
}

/// More groups than shards: some groups get nothing, none gets two.
#[test]
fn test_more_groups_than_shards() {
    let mut set = ReplicaSet::new(2, 3);
    set.submit(&join(&[1, 2, 3, 4, 5])).unwrap();

    let latest = set.latest();
    assert_eq!(latest.unassigned_count(), 0);
    assert!(counts(&latest).iter().all(|(_, count)| *count <= 1));
    assert!(invariants::is_balanced(&latest));
    set.assert_converged();
}

/// A shard pinned to a group that never joined is reclaimed by the next
/// join.
#[test]
fn test_join_reclaims_stale_owner() {
    let mut set = ReplicaSet::new(2, 10);
    set.submit(&join(&[1, 2])).unwrap();
    set.submit(&move_to(0, 42)).unwrap();
    assert!(invariants::check_owners(&set.latest()).is_err());

    set.submit(&join(&[3])).unwrap();
    let latest = set.latest();
    assert_ne!(latest.owner(0), Some(Gid::new(42)));
    set.assert_healthy();
}

/// Moves may unbalance a configuration; the next join evens it out.
#[test]
fn test_join_repairs_manual_imbalance() {
    let mut set = ReplicaSet::new(1, 10);
    set.submit(&join(&[1, 2])).unwrap();
    for shard in 0..10 {
        set.submit(&move_to(shard, 1)).unwrap();
    }
    assert!(!invariants::is_balanced(&set.latest()));

    set.submit(&join(&[1])).unwrap();
    assert_eq!(counts(&set.latest()), vec![(1, 5), (2, 5)]);
}
