//! The shard controller state machine.

use shardctl_placement::{Migration, ShardView, diff};
use shardctl_types::{Command, Config, Gid, Groups, Reply};
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::CtrlerError;
use crate::log::ConfigLog;

type Result<T> = std::result::Result<T, CtrlerError>;

/// Deterministic shard-assignment state machine.
///
/// Each mutating operation copies the latest configuration, changes the
/// copy, and appends it to the [`ConfigLog`] as the next version. Nothing in
/// the log is modified in place. A failed operation appends nothing.
///
/// The controller is meant to be driven by one apply loop. Hosts that also
/// serve reads from other threads must serialize access to the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardCtrler {
    log: ConfigLog,
}

impl ShardCtrler {
    /// Create a controller managing `n_shards` shards.
    pub fn new(n_shards: usize) -> Result<Self> {
        if n_shards == 0 {
            return Err(CtrlerError::InvalidShardCount(n_shards));
        }
        Ok(Self {
            log: ConfigLog::new(n_shards),
        })
    }

    /// Number of shards this controller manages.
    pub fn n_shards(&self) -> usize {
        self.log.n_shards()
    }

    /// The full configuration history.
    pub fn log(&self) -> &ConfigLog {
        &self.log
    }

    /// Return configuration `num`, or the latest one if `num` is negative or
    /// past the end of the log.
    pub fn query(&self, num: i64) -> Config {
        u64::try_from(num)
            .ok()
            .and_then(|num| self.log.get(num))
            .unwrap_or_else(|| self.log.latest())
            .clone()
    }

    /// Add groups and rebalance shards across every known group.
    ///
    /// Gids that are already known keep their current servers; their entry
    /// in `groups` is ignored. Fails with [`CtrlerError::ReservedGid`] if
    /// `groups` contains gid 0.
    pub fn join(&mut self, groups: &Groups) -> Result<()> {
        if groups.contains_key(&Gid::UNASSIGNED) {
            return Err(CtrlerError::ReservedGid);
        }

        let mut config = self.candidate();
        let mut joined = Vec::new();
        for (gid, servers) in groups {
            if config.groups.contains_key(gid) {
                warn!(%gid, "group already joined, keeping existing servers");
                continue;
            }
            config.groups.insert(*gid, servers.clone());
            joined.push(*gid);
        }

        let mut view = ShardView::build(&config.shards, &config.groups);
        let moved = view.rebalance();
        config.shards = view.into_shards();

        info!(num = config.num, ?joined, moved, "groups joined");
        self.publish(config);
        Ok(())
    }

    /// Remove groups and give their shards to the remaining groups.
    ///
    /// Orphaned shards are placed one at a time, in ascending shard order,
    /// on whichever remaining group holds the fewest shards at that moment.
    /// Every other shard keeps its owner, including a gid that only owns
    /// shards through a direct move; naming such a gid orphans its shards.
    /// Gids that own nothing are ignored, and gid 0 is never removed. If no
    /// group remains, every shard becomes unassigned.
    pub fn leave(&mut self, gids: &[Gid]) {
        let mut config = self.candidate();
        let mut view = ShardView::build_keeping_stale(&config.shards, &config.groups);

        let mut orphaned = Vec::new();
        let mut left = Vec::new();
        for gid in gids {
            if config.groups.remove(gid).is_some() {
                left.push(*gid);
            }
            orphaned.extend(view.remove_group(*gid));
        }

        if config.groups.is_empty() {
            config.shards = vec![Gid::UNASSIGNED; self.n_shards()];
        } else {
            orphaned.sort_unstable();
            for shard in &orphaned {
                view.assign_to_least_loaded(*shard);
            }
            config.shards = view.into_shards();
        }

        info!(
            num = config.num,
            ?left,
            orphaned = orphaned.len(),
            remaining = config.groups.len(),
            "groups left"
        );
        self.publish(config);
    }

    /// Assign `shard` to `gid` directly.
    ///
    /// No rebalancing happens and `gid` is not checked against the known
    /// groups. Fails with [`CtrlerError::ShardOutOfRange`] if `shard` is not
    /// a valid index.
    pub fn move_shard(&mut self, shard: usize, gid: Gid) -> Result<()> {
        let n_shards = self.n_shards();
        let mut config = self.candidate();
        let slot = config
            .shards
            .get_mut(shard)
            .ok_or(CtrlerError::ShardOutOfRange { shard, n_shards })?;
        *slot = gid;

        if gid.is_assigned() && !config.groups.contains_key(&gid) {
            warn!(shard, %gid, "shard moved to a group that has not joined");
        }

        info!(num = config.num, shard, %gid, "shard moved");
        self.publish(config);
        Ok(())
    }

    /// Apply one command from the replication layer.
    pub fn apply(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::Query { num } => Ok(Reply::Config(self.query(num))),
            Command::Join { groups } => {
                self.join(&groups)?;
                Ok(Reply::Ok)
            }
            Command::Leave { gids } => {
                self.leave(&gids);
                Ok(Reply::Ok)
            }
            Command::Move { shard, gid } => {
                self.move_shard(shard, gid)?;
                Ok(Reply::Ok)
            }
        }
    }

    /// Decode a postcard-encoded command and apply it.
    pub fn apply_bytes(&mut self, bytes: &[u8]) -> Result<Reply> {
        let command = codec::decode(bytes)?;
        self.apply(command)
    }

    /// Shards whose owner differs between versions `from` and `to`.
    ///
    /// `None` if either version is not in the log.
    pub fn migrations(&self, from: u64, to: u64) -> Option<Vec<Migration>> {
        let old = self.log.get(from)?;
        let new = self.log.get(to)?;
        Some(diff(&old.shards, &new.shards))
    }

    /// A private copy of the latest configuration, numbered as the next
    /// version.
    fn candidate(&self) -> Config {
        let latest = self.log.latest();
        Config {
            num: self.log.next_num(),
            shards: latest.shards.clone(),
            groups: latest.groups.clone(),
        }
    }

    fn publish(&mut self, config: Config) {
        debug!(
            num = config.num,
            groups = config.groups.len(),
            unassigned = config.unassigned_count(),
            "appending configuration"
        );
        self.log.append(config);
    }
}
