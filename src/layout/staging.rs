use std::collections::BTreeMap;

use super::{GridPoint, NodeId};

/// Moves recorded since the last commit, keyed by node, holding the position
/// each node had before its first staged move.
#[derive(Debug, Default, Clone)]
pub(crate) struct StagedMoves {
    origins: BTreeMap<NodeId, GridPoint>,
}

impl StagedMoves {
    pub(crate) fn stage(&mut self, id: NodeId, origin: GridPoint) {
        self.origins.entry(id).or_insert(origin);
    }

    pub(crate) fn origin(&self, id: NodeId) -> Option<GridPoint> {
        self.origins.get(&id).copied()
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.origins.contains_key(&id)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.origins.keys().copied()
    }

    pub(crate) fn take(&mut self) -> BTreeMap<NodeId, GridPoint> {
        std::mem::take(&mut self.origins)
    }
}
