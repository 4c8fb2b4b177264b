//! Deterministic shard placement over replica groups.
//!
//! This crate turns a flat `shard -> gid` array into a [`ShardView`]
//! (`gid -> shards`), rebalances it so that every group holds either
//! `floor(n / groups)` or `ceil(n / groups)` shards, and reports which shards
//! changed owner between two assignments ([`diff`]).
//!
//! Placement is a pure function of its input. Group ids are always scanned
//! in ascending order and ties go to the smallest gid, so every replica that
//! feeds in the same assignment gets the same result.

mod migration;
mod view;

pub use migration::{Migration, diff};
pub use view::ShardView;
