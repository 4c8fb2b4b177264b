//! Chaos test: replica crashes, restarts and lag.
//!
//! Replicas lose their state or stop receiving commands at random points.
//! Rebuilding from the committed log must always land on the same history.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shardctl_integration_tests::{ReplicaSet, random_command};

/// 5 replicas, random crashes and restarts while 400 commands commit.
#[test]
fn test_random_crash_restart_converges() {
    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut set = ReplicaSet::new(5, 10);
        let mut crashed: Vec<usize> = Vec::new();

        for _ in 0..400 {
            // Keep replica 0 up so there is always someone to apply.
            if rng.random_bool(0.05) {
                let victim = rng.random_range(1..set.len());
                if !crashed.contains(&victim) {
                    set.crash(victim);
                    crashed.push(victim);
                }
            }
            if !crashed.is_empty() && rng.random_bool(0.08) {
                let back = crashed.swap_remove(rng.random_range(0..crashed.len()));
                set.restart(back);
            }

            let command = random_command(&mut rng, 12, 10, true);
            let _ = set.submit(&command);
        }

        for i in crashed {
            set.restart(i);
        }
        set.assert_converged();
        for i in 1..set.len() {
            assert_eq!(set.replica(0), set.replica(i), "seed {seed}: replica {i}");
        }
    }
}

/// A replica paused for most of the run catches up on resume.
#[test]
fn test_lagging_replica_catches_up() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut set = ReplicaSet::new(3, 16);

    for _ in 0..20 {
        let _ = set.submit(&random_command(&mut rng, 9, 16, true));
    }
    set.pause(2);
    for _ in 0..300 {
        let _ = set.submit(&random_command(&mut rng, 9, 16, true));
    }
    assert!(set.replica(2).log().len() < set.replica(0).log().len());

    set.resume(2);
    set.assert_converged();
    assert_eq!(set.replica(0), set.replica(2));
}

/// Every replica crashing and restarting in turn still converges.
#[test]
fn test_rolling_restart() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut set = ReplicaSet::new(4, 10);

    for round in 0..set.len() {
        for _ in 0..50 {
            let _ = set.submit(&random_command(&mut rng, 6, 10, true));
        }
        set.crash(round);
        for _ in 0..25 {
            let _ = set.submit(&random_command(&mut rng, 6, 10, true));
        }
        set.restart(round);
        set.assert_converged();
    }
}
