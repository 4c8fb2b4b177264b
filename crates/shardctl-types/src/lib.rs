//! Shared types for shardctl.
//!
//! This crate defines the types used across the shardctl workspace:
//! the group identifier ([`Gid`]), the versioned shard assignment
//! ([`Config`]), and the commands a replicated apply loop feeds to the
//! controller ([`Command`], [`Reply`]).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Shard count used when the host does not configure one.
pub const DEFAULT_N_SHARDS: usize = 10;

// ---------------------------------------------------------------------------
// ID types
// ---------------------------------------------------------------------------

/// Identifier of a replica group.
///
/// `Gid(0)` is reserved and means "no group": a shard owned by
/// [`Gid::UNASSIGNED`] is not served by anyone.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gid(u64);

impl Gid {
    /// The reserved "unassigned" group id.
    pub const UNASSIGNED: Gid = Gid(0);

    /// Wrap a raw group id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Return the raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// True for every id except the reserved [`Gid::UNASSIGNED`].
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for Gid {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gid({})", self.0)
    }
}

/// Group directory: gid -> ordered server addresses.
///
/// A `BTreeMap` so that every walk over group ids is in ascending order on
/// every replica.
pub type Groups = BTreeMap<Gid, Vec<String>>;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// One versioned assignment of shards to groups.
///
/// Configurations are values: the controller hands out clones, and a
/// published configuration is never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Version number, equal to this configuration's index in the log.
    pub num: u64,
    /// shard index -> owning group (`Gid::UNASSIGNED` if nobody owns it).
    pub shards: Vec<Gid>,
    /// Known groups and their servers. Never contains `Gid::UNASSIGNED`.
    pub groups: Groups,
}

impl Config {
    /// The version-0 configuration: no groups, every shard unassigned.
    pub fn initial(n_shards: usize) -> Self {
        Self {
            num: 0,
            shards: vec![Gid::UNASSIGNED; n_shards],
            groups: Groups::new(),
        }
    }

    /// Number of shards in the assignment.
    pub fn n_shards(&self) -> usize {
        self.shards.len()
    }

    /// Owner of `shard`, or `None` if the index is out of range.
    pub fn owner(&self, shard: usize) -> Option<Gid> {
        self.shards.get(shard).copied()
    }

    /// Shards owned by `gid`, ascending.
    pub fn shards_of(&self, gid: Gid) -> Vec<usize> {
        self.shards
            .iter()
            .enumerate()
            .filter(|(_, owner)| **owner == gid)
            .map(|(shard, _)| shard)
            .collect()
    }

    /// Shard count per known group, including groups that own nothing.
    pub fn shard_counts(&self) -> BTreeMap<Gid, usize> {
        let mut counts: BTreeMap<Gid, usize> = self.groups.keys().map(|gid| (*gid, 0)).collect();
        for owner in &self.shards {
            if let Some(count) = counts.get_mut(owner) {
                *count += 1;
            }
        }
        counts
    }

    /// Number of shards currently owned by [`Gid::UNASSIGNED`].
    pub fn unassigned_count(&self) -> usize {
        self.shards.iter().filter(|gid| !gid.is_assigned()).count()
    }

    /// blake3 digest of the configuration's canonical encoding.
    ///
    /// Two replicas that applied the same commands produce the same digest.
    /// Groups are hashed in ascending gid order; every variable-length field
    /// is length-prefixed.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.num.to_le_bytes());
        hasher.update(&(self.shards.len() as u64).to_le_bytes());
        for gid in &self.shards {
            hasher.update(&gid.get().to_le_bytes());
        }
        hasher.update(&(self.groups.len() as u64).to_le_bytes());
        for (gid, servers) in &self.groups {
            hasher.update(&gid.get().to_le_bytes());
            hasher.update(&(servers.len() as u64).to_le_bytes());
            for server in servers {
                hasher.update(&(server.len() as u64).to_le_bytes());
                hasher.update(server.as_bytes());
            }
        }
        hasher.finalize().into()
    }

    /// Hex rendering of [`Config::digest`].
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest())
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A command delivered to the controller by the replication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Read a configuration. Negative or out-of-range `num` means latest.
    Query {
        /// Requested version.
        num: i64,
    },
    /// Add groups and rebalance shards onto them.
    Join {
        /// New gid -> servers mappings. Already-known gids are ignored.
        groups: Groups,
    },
    /// Remove groups and hand their shards to the survivors.
    Leave {
        /// Groups to remove. Unknown gids are ignored.
        gids: Vec<Gid>,
    },
    /// Assign one shard to a group directly, without rebalancing.
    Move {
        /// Shard index.
        shard: usize,
        /// Target group.
        gid: Gid,
    },
}

impl Command {
    /// Short lowercase name of the operation, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Query { .. } => "query",
            Command::Join { .. } => "join",
            Command::Leave { .. } => "leave",
            Command::Move { .. } => "move",
        }
    }

    /// True if applying the command appends a configuration.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Command::Query { .. })
    }
}

/// Result of applying a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    /// A mutation was applied and a new configuration appended.
    Ok,
    /// The configuration returned by a query.
    Config(Config),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
