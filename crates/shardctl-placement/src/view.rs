//! Group-centric view of a shard assignment.

use std::collections::BTreeMap;

use shardctl_types::{Gid, Groups};
use tracing::debug;

/// Shards grouped by owner: `gid -> shards`, in the order each group
/// acquired them.
///
/// Every known group has an entry, even when it owns nothing. Shards that
/// nobody owns sit in the [`Gid::UNASSIGNED`] bucket, which only exists while
/// it is (or was) non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardView {
    /// Owner -> shards. `BTreeMap` gives ascending gid scans.
    owned: BTreeMap<Gid, Vec<usize>>,
    /// Shards held by gids outside the known groups, when the view was built
    /// with [`ShardView::build_keeping_stale`]. Never selected as max or min.
    stale: BTreeMap<Gid, Vec<usize>>,
    /// Length of the shard array this view was built from.
    n_shards: usize,
}

impl ShardView {
    /// Build a view from a shard array and the set of known groups.
    ///
    /// A shard whose owner is not in `groups` (a stale owner written by a
    /// direct move) lands in the unassigned bucket.
    pub fn build(shards: &[Gid], groups: &Groups) -> Self {
        let mut owned: BTreeMap<Gid, Vec<usize>> =
            groups.keys().map(|gid| (*gid, Vec::new())).collect();

        for (shard, gid) in shards.iter().enumerate() {
            let owner = if owned.contains_key(gid) {
                *gid
            } else {
                Gid::UNASSIGNED
            };
            owned.entry(owner).or_default().push(shard);
        }

        Self {
            owned,
            stale: BTreeMap::new(),
            n_shards: shards.len(),
        }
    }

    /// Build a view that leaves stale owners where they are.
    ///
    /// Shards owned by a gid outside `groups` stay with that gid: they take
    /// no part in max/min selection and [`ShardView::into_shards`] writes
    /// them back unchanged unless [`ShardView::remove_group`] takes them.
    pub fn build_keeping_stale(shards: &[Gid], groups: &Groups) -> Self {
        let mut owned: BTreeMap<Gid, Vec<usize>> =
            groups.keys().map(|gid| (*gid, Vec::new())).collect();
        let mut stale: BTreeMap<Gid, Vec<usize>> = BTreeMap::new();
        for (shard, gid) in shards.iter().enumerate() {
            if owned.contains_key(gid) || !gid.is_assigned() {
                owned.entry(*gid).or_default().push(shard);
            } else {
                stale.entry(*gid).or_default().push(shard);
            }
        }
        Self {
            owned,
            stale,
            n_shards: shards.len(),
        }
    }

    /// Number of shards held by `gid` (0 if the gid is not in the view).
    pub fn count(&self, gid: Gid) -> usize {
        self.owned.get(&gid).map_or(0, Vec::len)
    }

    /// Shards held by `gid`, in acquisition order.
    pub fn shards(&self, gid: Gid) -> &[usize] {
        self.owned.get(&gid).map_or(&[], Vec::as_slice)
    }

    /// Real groups in the view, ascending.
    pub fn group_ids(&self) -> impl Iterator<Item = Gid> + '_ {
        self.owned.keys().copied().filter(|gid| gid.is_assigned())
    }

    /// Number of real groups in the view.
    pub fn group_count(&self) -> usize {
        self.group_ids().count()
    }

    /// The group to take a shard from next.
    ///
    /// The unassigned bucket always comes first while it holds anything.
    /// Otherwise the real group with the most shards, smallest gid on ties.
    /// `None` if there are no real groups and nothing is unassigned.
    pub fn gid_with_max_shards(&self) -> Option<Gid> {
        if self.count(Gid::UNASSIGNED) > 0 {
            return Some(Gid::UNASSIGNED);
        }

        let mut best: Option<(Gid, usize)> = None;
        for gid in self.group_ids() {
            let count = self.count(gid);
            if best.is_none_or(|(_, max)| count > max) {
                best = Some((gid, count));
            }
        }
        best.map(|(gid, _)| gid)
    }

    /// The real group with the fewest shards, smallest gid on ties.
    pub fn gid_with_min_shards(&self) -> Option<Gid> {
        let mut best: Option<(Gid, usize)> = None;
        for gid in self.group_ids() {
            let count = self.count(gid);
            if best.is_none_or(|(_, min)| count < min) {
                best = Some((gid, count));
            }
        }
        best.map(|(gid, _)| gid)
    }

    /// Difference between the largest and smallest real group.
    ///
    /// `None` when there are no real groups.
    pub fn spread(&self) -> Option<usize> {
        let max = self.group_ids().map(|gid| self.count(gid)).max()?;
        let min = self.group_ids().map(|gid| self.count(gid)).min()?;
        Some(max - min)
    }

    /// Move shards one at a time until the view is balanced.
    ///
    /// Each step takes the first shard of [`ShardView::gid_with_max_shards`]
    /// and appends it to [`ShardView::gid_with_min_shards`]. Stops once
    /// nothing is unassigned and the spread is at most one. Does nothing if
    /// there are no real groups. Returns the number of shards moved.
    pub fn rebalance(&mut self) -> usize {
        let mut moved = 0;

        loop {
            let (Some(max_gid), Some(min_gid)) =
                (self.gid_with_max_shards(), self.gid_with_min_shards())
            else {
                break;
            };

            if max_gid.is_assigned()
                && self.count(max_gid).saturating_sub(self.count(min_gid)) <= 1
            {
                break;
            }

            let Some(shard) = self.take_first(max_gid) else {
                break;
            };
            self.owned.entry(min_gid).or_default().push(shard);
            moved += 1;
        }

        debug!(moved, groups = self.group_count(), "rebalanced shard view");
        moved
    }

    /// Drop `gid` from the view and return the shards it held, including
    /// shards it holds as a stale owner.
    ///
    /// Returns an empty list for gids that hold nothing and for
    /// [`Gid::UNASSIGNED`], which is not a group.
    pub fn remove_group(&mut self, gid: Gid) -> Vec<usize> {
        if !gid.is_assigned() {
            return Vec::new();
        }
        let mut shards = self.owned.remove(&gid).unwrap_or_default();
        shards.extend(self.stale.remove(&gid).unwrap_or_default());
        shards
    }

    /// Give `shard` to the real group with the fewest shards.
    ///
    /// Returns the chosen group, or `None` (leaving the view untouched) if
    /// there are no real groups.
    pub fn assign_to_least_loaded(&mut self, shard: usize) -> Option<Gid> {
        let gid = self.gid_with_min_shards()?;
        self.owned.entry(gid).or_default().push(shard);
        Some(gid)
    }

    /// Flatten the view back into a `shard -> gid` array.
    ///
    /// Shards absent from every bucket come out unassigned.
    pub fn into_shards(self) -> Vec<Gid> {
        let mut shards = vec![Gid::UNASSIGNED; self.n_shards];
        for (gid, owned) in self.owned.into_iter().chain(self.stale) {
            for shard in owned {
                if let Some(slot) = shards.get_mut(shard) {
                    *slot = gid;
                }
            }
        }
        shards
    }

    fn take_first(&mut self, gid: Gid) -> Option<usize> {
        let owned = self.owned.get_mut(&gid)?;
        if owned.is_empty() {
            None
        } else {
            Some(owned.remove(0))
        }
    }
}
