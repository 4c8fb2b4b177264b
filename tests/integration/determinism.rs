//! Integration test: replica determinism.
//!
//! Several replicas receive the same encoded command log and must build
//! identical configuration histories.

use rand::SeedableRng;
use rand::rngs::StdRng;
use shardctl_ctrler::{ShardCtrler, codec};
use shardctl_integration_tests::{ReplicaSet, join, leave, move_to, random_command};
use shardctl_types::{Command, Reply};

/// Three replicas, 200 random commands per seed, moves included.
#[test]
fn test_random_commands_converge() {
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut set = ReplicaSet::new(3, 10);

        for _ in 0..200 {
            let command = random_command(&mut rng, 12, 10, true);
            let _ = set.submit(&command);
        }

        set.assert_converged();
        assert_eq!(set.replica(0), set.replica(1), "seed {seed}");
        assert_eq!(set.replica(1), set.replica(2), "seed {seed}");
    }
}

/// A controller fed the committed bytes by hand matches the replica set.
#[test]
fn test_manual_replay_matches() {
    let commands = vec![
        join(&[3, 1]),
        join(&[2]),
        move_to(4, 3),
        leave(&[1]),
        Command::Query { num: 1 },
        join(&[7, 8]),
        leave(&[2, 9]),
    ];

    let mut set = ReplicaSet::new(2, 10);
    set.submit_all(&commands);

    let mut manual = ShardCtrler::new(10).unwrap();
    for command in &commands {
        let bytes = codec::encode(command).unwrap();
        manual.apply_bytes(&bytes).unwrap();
    }

    assert_eq!(&manual, set.replica(0));
    assert_eq!(
        manual.log().latest().digest_hex(),
        set.latest().digest_hex()
    );
}

/// Queries are answered identically everywhere and never append.
#[test]
fn test_queries_do_not_append() {
    let mut set = ReplicaSet::new(3, 10);
    set.submit(&join(&[1, 2])).unwrap();

    for num in [-1, 0, 1, 5, i64::MIN, i64::MAX] {
        let reply = set.submit(&Command::Query { num }).unwrap();
        let Reply::Config(config) = reply else {
            panic!("query must return a configuration");
        };
        let expected = if num == 0 { 0 } else { 1 };
        assert_eq!(config.num, expected, "query {num}");
    }

    for i in 0..set.len() {
        assert_eq!(set.replica(i).log().len(), 2);
    }
    set.assert_converged();
}

/// Rejected commands are rejected by every replica and leave no trace.
#[test]
fn test_rejections_agree() {
    let mut set = ReplicaSet::new(3, 4);
    set.submit(&join(&[1])).unwrap();

    assert!(set.submit(&move_to(4, 1)).is_err());
    assert!(set.submit(&join(&[0, 5])).is_err());

    for i in 0..set.len() {
        assert_eq!(set.replica(i).log().len(), 2);
    }
    assert_eq!(set.committed_len(), 3);
    set.assert_converged();
}
