//! Shard ownership changes between two assignments.

use shardctl_types::Gid;

/// A shard that changed owner between two configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    /// The shard that must move.
    pub shard: usize,
    /// The group that owned it before (may be `Gid::UNASSIGNED`).
    pub from: Gid,
    /// The group that owns it after (may be `Gid::UNASSIGNED`).
    pub to: Gid,
}

/// Compute which shards changed owner from `old` to `new`.
///
/// Migrations come out in ascending shard order. Both arrays are expected to
/// come from the same controller and so have the same length; extra entries
/// on either side are ignored.
pub fn diff(old: &[Gid], new: &[Gid]) -> Vec<Migration> {
    old.iter()
        .zip(new)
        .enumerate()
        .filter(|(_, (from, to))| from != to)
        .map(|(shard, (from, to))| Migration {
            shard,
            from: *from,
            to: *to,
        })
        .collect()
}
