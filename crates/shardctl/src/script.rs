//! TOML command scripts for `shardctl replay`.
//!
//! ```toml
//! n_shards = 10
//!
//! [[step]]
//! op = "join"
//! groups = [{ gid = 1, servers = ["a:7000", "b:7000"] }]
//!
//! [[step]]
//! op = "move"
//! shard = 3
//! gid = 1
//!
//! [[step]]
//! op = "leave"
//! gids = [1]
//!
//! [[step]]
//! op = "query"
//! num = 1
//! ```

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use shardctl_types::{Command, Gid, Groups};

/// A parsed command script.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Script {
    /// Shard count for the replay; overrides the config file.
    pub n_shards: Option<usize>,
    /// Commands, applied in order.
    #[serde(rename = "step")]
    pub steps: Vec<Step>,
}

/// One scripted command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Step {
    /// Add groups.
    Join {
        /// Groups to add.
        groups: Vec<GroupSpec>,
    },
    /// Remove groups.
    Leave {
        /// Group ids to remove.
        gids: Vec<u64>,
    },
    /// Pin a shard to a group.
    Move {
        /// Shard index.
        shard: usize,
        /// Target group id.
        gid: u64,
    },
    /// Print a configuration. Omitting `num` prints the latest.
    Query {
        /// Requested version.
        #[serde(default = "latest")]
        num: i64,
    },
}

/// A group entry inside a `join` step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupSpec {
    /// Group id.
    pub gid: u64,
    /// Server addresses.
    #[serde(default)]
    pub servers: Vec<String>,
}

fn latest() -> i64 {
    -1
}

impl Script {
    /// Read and parse a script file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid script {}", path.display()))
    }

    /// Parse a script from TOML text.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl Step {
    /// Convert into the controller's command type.
    ///
    /// A gid listed twice in one join keeps its last server list.
    pub fn into_command(self) -> Command {
        match self {
            Step::Join { groups } => Command::Join {
                groups: groups
                    .into_iter()
                    .map(|g| (Gid::new(g.gid), g.servers))
                    .collect::<Groups>(),
            },
            Step::Leave { gids } => Command::Leave {
                gids: gids.into_iter().map(Gid::new).collect(),
            },
            Step::Move { shard, gid } => Command::Move {
                shard,
                gid: Gid::new(gid),
            },
            Step::Query { num } => Command::Query { num },
        }
    }
}
