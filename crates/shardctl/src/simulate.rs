//! Seeded random simulation over two independent replicas.

use anyhow::{Context, Result, bail, ensure};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shardctl_ctrler::{ShardCtrler, codec, invariants};
use shardctl_types::{Command, Gid, Groups};
use tracing::{debug, info};

/// Simulation parameters.
#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    /// Number of commands to apply.
    pub steps: usize,
    /// RNG seed; the same seed always produces the same run.
    pub seed: u64,
    /// Group ids are drawn from `1..=max_groups`.
    pub max_groups: u64,
    /// Shard count for both replicas.
    pub n_shards: usize,
}

/// Outcome of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimReport {
    /// Commands that produced a reply.
    pub applied: usize,
    /// Commands both replicas rejected.
    pub rejected: usize,
    /// Shards whose owner changed, summed over every appended version.
    pub moves: usize,
    /// Version of the final configuration.
    pub final_num: u64,
    /// Groups in the final configuration.
    pub final_groups: usize,
    /// Digest of the final configuration.
    pub digest: String,
}

/// Run a simulation.
///
/// Every command is postcard-encoded once and applied to both replicas from
/// the same bytes. Fails on the first divergence or invariant violation.
pub fn run(params: SimParams) -> Result<SimReport> {
    ensure!(params.max_groups > 0, "max_groups must be at least 1");

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut primary = ShardCtrler::new(params.n_shards)?;
    let mut replica = ShardCtrler::new(params.n_shards)?;

    let mut applied = 0;
    let mut rejected = 0;
    let mut moves = 0;

    for step in 0..params.steps {
        let command = random_command(&mut rng, params.max_groups, params.n_shards);
        let bytes = codec::encode(&command)?;
        let before = primary.log().next_num();

        match (primary.apply_bytes(&bytes), replica.apply_bytes(&bytes)) {
            (Ok(a), Ok(b)) => {
                ensure!(a == b, "step {step}: replies diverged on {}", command.name());
                applied += 1;
            }
            (Err(a), Err(b)) => {
                ensure!(
                    a.to_string() == b.to_string(),
                    "step {step}: replicas rejected {} differently",
                    command.name()
                );
                debug!(step, op = command.name(), error = %a, "command rejected");
                rejected += 1;
                continue;
            }
            (a, b) => bail!(
                "step {step}: one replica rejected {}: {:?} vs {:?}",
                command.name(),
                a.err(),
                b.err()
            ),
        }

        let latest = primary.log().latest();
        ensure!(
            latest.digest() == replica.log().latest().digest(),
            "step {step}: replicas diverged at version {}",
            latest.num
        );

        if command.is_mutation() {
            let migrations = primary
                .migrations(before - 1, before)
                .with_context(|| format!("version {before} missing after {}", command.name()))?;
            moves += migrations.len();
        }

        match command {
            Command::Join { .. } => {
                check_shape(&primary, step)?;
                invariants::check_owners(latest).with_context(|| format!("step {step}"))?;
                ensure!(
                    invariants::is_balanced(latest),
                    "step {step}: version {} unbalanced after join",
                    latest.num
                );
            }
            // A leave keeps shards moved to gids that never joined.
            Command::Leave { .. } => check_shape(&primary, step)?,
            Command::Move { .. } | Command::Query { .. } => {}
        }
    }

    let latest = primary.log().latest();
    let report = SimReport {
        applied,
        rejected,
        moves,
        final_num: latest.num,
        final_groups: latest.groups.len(),
        digest: latest.digest_hex(),
    };
    info!(
        seed = params.seed,
        steps = params.steps,
        moves,
        final_num = report.final_num,
        "simulation finished"
    );
    Ok(report)
}

fn check_shape(ctrler: &ShardCtrler, step: usize) -> Result<()> {
    let latest = ctrler.log().latest();
    invariants::check_shape(latest, latest.num, ctrler.n_shards())
        .with_context(|| format!("step {step}"))
}

fn random_gids(rng: &mut StdRng, max_groups: u64, max_len: usize) -> Vec<Gid> {
    let len = rng.random_range(1..=max_len);
    (0..len)
        .map(|_| Gid::new(rng.random_range(1..=max_groups)))
        .collect()
}

/// Joins and leaves dominate; an occasional move targets an out-of-range
/// shard so rejection paths run too.
fn random_command(rng: &mut StdRng, max_groups: u64, n_shards: usize) -> Command {
    match rng.random_range(0..20) {
        0..=7 => Command::Join {
            groups: random_gids(rng, max_groups, 3)
                .into_iter()
                .map(|gid| (gid, vec![format!("10.0.{gid}.1:7000")]))
                .collect::<Groups>(),
        },
        8..=13 => Command::Leave {
            gids: random_gids(rng, max_groups, 2),
        },
        14..=16 => Command::Move {
            shard: rng.random_range(0..=n_shards),
            gid: Gid::new(rng.random_range(0..=max_groups)),
        },
        _ => Command::Query {
            num: rng.random_range(-1..=n_shards as i64),
        },
    }
}
