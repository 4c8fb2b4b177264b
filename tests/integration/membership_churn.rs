//! Integration test: membership churn.
//!
//! Groups join and leave repeatedly; every version must stay well formed
//! and published versions must never change.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shardctl_integration_tests::{ReplicaSet, counts, join, leave, random_command};
use shardctl_types::{Command, Config, Gid};

/// Leaving every group unassigns every shard; rejoining spreads them again.
#[test]
fn test_drain_and_refill() {
    let mut set = ReplicaSet::new(3, 10);
    set.submit(&join(&[1, 2, 3])).unwrap();
    set.submit(&leave(&[1, 2, 3])).unwrap();

    let empty = set.latest();
    assert!(empty.groups.is_empty());
    assert!(empty.shards.iter().all(|gid| *gid == Gid::UNASSIGNED));
    set.assert_healthy();

    set.submit(&join(&[4, 5])).unwrap();
    assert_eq!(counts(&set.latest()), vec![(4, 5), (5, 5)]);
    set.assert_healthy();
    set.assert_converged();
}

/// Random joins and leaves without moves keep every replica balanced.
#[test]
fn test_random_churn_stays_balanced() {
    for seed in 0..30 {
        let mut rng = StdRng::seed_from_u64(seed);
        let n_shards = rng.random_range(1..=24);
        let mut set = ReplicaSet::new(3, n_shards);

        for _ in 0..150 {
            let command = random_command(&mut rng, 10, n_shards, false);
            set.submit(&command).unwrap();
            set.assert_healthy();
        }
        set.assert_converged();
    }
}

/// Earlier versions read back unchanged after later churn.
#[test]
fn test_history_is_immutable() {
    let mut set = ReplicaSet::new(2, 10);
    let mut rng = StdRng::seed_from_u64(99);
    let mut snapshots: Vec<Config> = vec![set.latest()];

    for _ in 0..60 {
        let command = random_command(&mut rng, 8, 10, true);
        let mutates = command.is_mutation();
        if set.submit(&command).is_ok() && mutates {
            snapshots.push(set.latest());
        }
    }

    for (num, snapshot) in snapshots.iter().enumerate() {
        for i in 0..set.len() {
            assert_eq!(&set.replica(i).query(num as i64), snapshot, "version {num}");
        }
    }
}

/// Servers of an already joined group are not replaced by a second join.
#[test]
fn test_rejoin_keeps_servers() {
    let mut set = ReplicaSet::new(2, 10);
    set.submit(&join(&[1])).unwrap();

    let mut groups = shardctl_integration_tests::groups(&[1, 2]);
    groups.insert(Gid::new(1), vec!["replacement:1".to_string()]);
    set.submit(&Command::Join { groups }).unwrap();

    let latest = set.latest();
    assert_eq!(
        latest.groups.get(&Gid::new(1)),
        Some(&shardctl_integration_tests::servers(1))
    );
    assert_eq!(counts(&latest), vec![(1, 5), (2, 5)]);
}

/// Leaving unknown gids still publishes a version, identical in content.
#[test]
fn test_leave_unknown_publishes_copy() {
    let mut set = ReplicaSet::new(2, 10);
    set.submit(&join(&[1, 2])).unwrap();
    let before = set.latest();

    set.submit(&leave(&[77])).unwrap();
    let after = set.latest();
    assert_eq!(after.num, before.num + 1);
    assert_eq!(after.shards, before.shards);
    assert_eq!(after.groups, before.groups);
}
