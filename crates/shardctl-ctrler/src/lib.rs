//! Replicated shard-assignment state machine.
//!
//! [`ShardCtrler`] owns an append-only [`ConfigLog`] of versioned shard
//! assignments and applies the four controller operations to it:
//!
//! - **join** adds groups and rebalances shards onto them;
//! - **leave** removes groups and hands their shards to the least-loaded
//!   survivors;
//! - **move** pins one shard to one group without rebalancing;
//! - **query** reads a configuration (negative or unknown versions mean the
//!   latest one).
//!
//! Every operation is a deterministic function of the log and its
//! arguments, so replicas that apply the same commands in the same order
//! (as delivered by a consensus layer) end up with identical logs. The
//! controller does no locking and spawns nothing: the host applies commands
//! from a single thread.

pub mod codec;
mod ctrler;
mod error;
pub mod invariants;
mod log;


pub use ctrler::ShardCtrler;
pub use error::CtrlerError;
pub use log::ConfigLog;
