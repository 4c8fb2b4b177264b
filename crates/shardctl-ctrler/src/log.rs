//! Append-only log of configurations.

use shardctl_types::Config;

/// Ordered, append-only history of configurations.
///
/// Version 0 is always present. A configuration's `num` equals its index,
/// and published entries are only ever handed out by shared reference or by
/// clone.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::len_without_is_empty)]
pub struct ConfigLog {
    /// Indexed by version. Never empty.
    configs: Vec<Config>,
}

impl ConfigLog {
    /// Create a log holding only the version-0 configuration.
    pub fn new(n_shards: usize) -> Self {
        Self {
            configs: vec![Config::initial(n_shards)],
        }
    }

    /// Number of configurations, version 0 included.
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Number of shards every configuration in this log assigns.
    pub fn n_shards(&self) -> usize {
        self.configs[0].n_shards()
    }

    /// The version the next appended configuration must carry.
    pub fn next_num(&self) -> u64 {
        self.configs.len() as u64
    }

    /// The most recent configuration.
    pub fn latest(&self) -> &Config {
        &self.configs[self.configs.len() - 1]
    }

    /// The configuration with version `num`, if it exists.
    pub fn get(&self, num: u64) -> Option<&Config> {
        usize::try_from(num).ok().and_then(|idx| self.configs.get(idx))
    }

    /// All configurations, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Config> {
        self.configs.iter()
    }

    /// Publish `config` as the next version.
    ///
    /// The caller builds `config` with `num == self.next_num()`.
    pub(crate) fn append(&mut self, config: Config) {
        debug_assert_eq!(config.num, self.next_num(), "config appended out of order");
        debug_assert_eq!(config.shards.len(), self.n_shards(), "shard array resized");
        self.configs.push(config);
    }
}
