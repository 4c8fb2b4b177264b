//! Structural checks over configurations and logs.
//!
//! The controller maintains these properties by construction; the checks
//! exist for tests, simulations and hosts that restore a log from
//! elsewhere.

use shardctl_types::{Config, Gid};

use crate::error::CtrlerError;
use crate::log::ConfigLog;

type Result<T> = std::result::Result<T, CtrlerError>;

fn violated(msg: String) -> CtrlerError {
    CtrlerError::InvariantViolated(msg)
}

/// Check that `config` can sit at position `index` of a log of `n_shards`
/// shards: right version number, right shard count, no gid 0 group.
pub fn check_shape(config: &Config, index: u64, n_shards: usize) -> Result<()> {
    if config.num != index {
        return Err(violated(format!(
            "config at index {index} has version {}",
            config.num
        )));
    }
    if config.shards.len() != n_shards {
        return Err(violated(format!(
            "config {} has {} shards, expected {n_shards}",
            config.num,
            config.shards.len()
        )));
    }
    if config.groups.contains_key(&Gid::UNASSIGNED) {
        return Err(violated(format!(
            "config {} registers reserved gid 0",
            config.num
        )));
    }
    Ok(())
}

/// Check that every assigned shard belongs to a known group.
///
/// A direct move may legitimately break this; join and leave never do.
pub fn check_owners(config: &Config) -> Result<()> {
    for (shard, gid) in config.shards.iter().enumerate() {
        if gid.is_assigned() && !config.groups.contains_key(gid) {
            return Err(violated(format!(
                "config {}: shard {shard} owned by unknown gid {gid}",
                config.num
            )));
        }
    }
    Ok(())
}

/// True if shard counts across the known groups differ by at most one, or,
/// with no groups, if every shard is unassigned.
pub fn is_balanced(config: &Config) -> bool {
    if config.groups.is_empty() {
        return config.shards.iter().all(|gid| !gid.is_assigned());
    }
    let counts = config.shard_counts();
    match (counts.values().max(), counts.values().min()) {
        (Some(max), Some(min)) => max - min <= 1,
        _ => true,
    }
}

/// Check the shape of every configuration in `log`, and that version 0 is
/// the empty configuration.
pub fn check_log(log: &ConfigLog) -> Result<()> {
    let n_shards = log.n_shards();
    for (index, config) in log.iter().enumerate() {
        check_shape(config, index as u64, n_shards)?;
    }
    match log.get(0) {
        Some(first) if *first == Config::initial(n_shards) => Ok(()),
        _ => Err(violated("version 0 is not the empty configuration".into())),
    }
}
