//! Error types for the controller crate.

/// Errors returned by the shard controller.
///
/// All of them are precondition violations: the log is left untouched when
/// an operation fails.
#[derive(Debug, thiserror::Error)]
pub enum CtrlerError {
    /// The controller was configured with no shards.
    #[error("shard count must be positive, got {0}")]
    InvalidShardCount(usize),

    /// A move named a shard index outside `[0, n_shards)`.
    #[error("shard {shard} out of range: controller has {n_shards} shards")]
    ShardOutOfRange {
        /// The requested shard index.
        shard: usize,
        /// Number of shards the controller manages.
        n_shards: usize,
    },

    /// A join tried to register the reserved gid 0.
    #[error("gid 0 is reserved for unassigned shards")]
    ReservedGid,

    /// A configuration does not satisfy a structural invariant.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    /// A command could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<postcard::Error> for CtrlerError {
    fn from(e: postcard::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
