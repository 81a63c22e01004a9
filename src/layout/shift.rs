use std::collections::HashSet;

use log::{trace, warn};

use super::error::{LayoutError, Result};
use super::{GridIndex, LayoutGraph, Limits, NodeId, NodeKind};

impl GridIndex {
    /// Shifts `id` and everything connected to it by `dx`, stopping at nodes
    /// in `ignore`. Every visited node is added to `ignore` before recursing,
    /// which also breaks cycles through partnership back-references.
    ///
    /// A partnership whose two partners are both fixed and on the same row is
    /// re-centered on the grid column nearest their midpoint instead of
    /// taking `dx` verbatim; its neighbors follow by the same amount. Returns
    /// `false` when the effective shift is zero.
    pub fn subgraph_shift<G: LayoutGraph>(
        &mut self,
        graph: &mut G,
        id: NodeId,
        dx: i32,
        ignore: &mut HashSet<NodeId>,
    ) -> Result<bool> {
        let pos = graph.position(id).ok_or(LayoutError::NotFound(id))?;
        ignore.insert(id);

        let mut dx = dx;
        if graph.kind(id) == Some(NodeKind::Partnership) {
            if let [a, b] = graph.side_neighbors(id).as_slice() {
                if ignore.contains(a) && ignore.contains(b) {
                    if let (Some(pa), Some(pb)) = (graph.position(*a), graph.position(*b)) {
                        if pa.y == pb.y {
                            dx = self.midpoint_x(pa.x, pb.x) - pos.x;
                        }
                    }
                }
            }
        }
        if dx == 0 {
            return Ok(false);
        }

        trace!("shift node {id} by {dx}");
        self.relative_move(graph, id, dx, 0)?;
        for next in graph.neighbors(id) {
            if !ignore.contains(&next) {
                self.subgraph_shift(graph, next, dx, ignore)?;
            }
        }
        Ok(true)
    }

    /// Pushes every node on row `y` away from the middle of `limits` by
    /// `length`: nodes left of the middle go left, the rest go right.
    pub fn row_shift<G: LayoutGraph>(
        &mut self,
        graph: &mut G,
        y: i32,
        limits: Limits,
        length: i32,
        ignore: &mut HashSet<NodeId>,
    ) -> Result<bool> {
        let mid2 = limits.mid2();
        let mut shifted = false;
        for id in self.shift_order(graph, y) {
            if ignore.contains(&id) {
                continue;
            }
            let Some(pos) = graph.position(id) else {
                continue;
            };
            let dx = if 2 * (pos.x as i64) < mid2 { -length } else { length };
            shifted |= self.subgraph_shift(graph, id, dx, ignore)?;
        }
        Ok(shifted)
    }

    /// Registered nodes of row `y`, partnerships last so that they can be
    /// re-centered once their partners have moved.
    fn shift_order<G: LayoutGraph>(&self, graph: &G, y: i32) -> Vec<NodeId> {
        let mut row = self.nodes_in_row(y);
        row.sort_by_key(|&id| graph.kind(id) == Some(NodeKind::Partnership));
        row
    }

    /// Moves `from` and every node beyond it on its row one grid unit in the
    /// direction of `dir`.
    fn push_row<G: LayoutGraph>(
        &mut self,
        graph: &mut G,
        from: NodeId,
        dir: i32,
        ignore: &mut HashSet<NodeId>,
    ) -> Result<bool> {
        let start = graph.position(from).ok_or(LayoutError::NotFound(from))?;
        let dx = dir * self.unit.x;
        let mut shifted = false;
        for id in self.shift_order(graph, start.y) {
            if ignore.contains(&id) {
                continue;
            }
            let Some(pos) = graph.position(id) else {
                continue;
            };
            if (dir > 0 && pos.x >= start.x) || (dir < 0 && pos.x <= start.x) {
                shifted |= self.subgraph_shift(graph, id, dx, ignore)?;
            }
        }
        Ok(shifted)
    }

    /// Resolves collisions left behind by staged shifts by pushing the
    /// occupied side further along, until the staged layout is injective.
    pub(super) fn settle<G: LayoutGraph>(
        &mut self,
        graph: &mut G,
        reserved: &[NodeId],
        fixed: &HashSet<NodeId>,
    ) -> Result<()> {
        let rounds = self.len() + reserved.len() + 1;
        for _ in 0..rounds {
            let Some(conflict) = self.find_conflict(graph, reserved) else {
                return Ok(());
            };
            let occupied = LayoutError::Occupied {
                x: conflict.at.x,
                y: conflict.at.y,
                by: conflict.occupant,
            };
            let occupant = conflict.occupant;
            if fixed.contains(&occupant) || self.pending.contains(occupant) || reserved.contains(&occupant) {
                return Err(occupied);
            }
            let dir = match self.pending.origin(conflict.mover) {
                Some(origin) if conflict.at.x < origin.x => -1,
                _ => 1,
            };
            let mut ignore: HashSet<NodeId> = fixed.iter().copied().collect();
            ignore.extend(self.pending.ids());
            ignore.extend(reserved.iter().copied());
            trace!("pushing node {occupant} out of the way of {}", conflict.mover);
            if !self.push_row(graph, occupant, dir, &mut ignore)? {
                return Err(occupied);
            }
        }
        warn!("layout did not settle after {rounds} rounds");
        match self.find_conflict(graph, reserved) {
            Some(conflict) => Err(LayoutError::Occupied {
                x: conflict.at.x,
                y: conflict.at.y,
                by: conflict.occupant,
            }),
            None => Ok(()),
        }
    }
}
