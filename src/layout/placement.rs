use std::collections::BTreeMap;

use super::error::{Result, invalid};
use super::{GridIndex, GridPoint, LayoutGraph, NodeId, Relative};

impl GridIndex {
    /// Suggested positions for not-yet-created relatives of an existing node.
    ///
    /// `ids` are caller-chosen keys for the new nodes. `Side` and `Join`
    /// compute a single slot, which every key receives. The registry is not
    /// modified; register the nodes once they exist.
    pub fn find_position<G, K>(
        &self,
        graph: &G,
        relative: &Relative,
        ids: &[K],
    ) -> Result<BTreeMap<K, GridPoint>>
    where
        G: LayoutGraph,
        K: Ord + Clone,
    {
        let slots = self.slots(graph, relative, ids.len())?;
        Ok(ids.iter().cloned().zip(slots).collect())
    }

    /// The single slot for one new relative.
    pub fn find_slot<G: LayoutGraph>(&self, graph: &G, relative: &Relative) -> Result<GridPoint> {
        let slots = self.slots(graph, relative, 1)?;
        slots
            .into_iter()
            .next()
            .ok_or_else(|| invalid("no slot computed"))
    }

    fn slots<G: LayoutGraph>(&self, graph: &G, relative: &Relative, count: usize) -> Result<Vec<GridPoint>> {
        match relative {
            Relative::Above(anchor) => self.slots_above(*anchor, count),
            Relative::Below(anchor) => self.slots_below(graph, *anchor, count),
            Relative::Side(anchor) => {
                let slot = self.slot_beside(graph, *anchor)?;
                Ok(vec![slot; count])
            }
            Relative::Join(partners) => {
                let [a, b] = partners.as_slice() else {
                    return Err(invalid(format!(
                        "join needs exactly two partners, got {}",
                        partners.len()
                    )));
                };
                if a == b {
                    return Err(invalid(format!("cannot join node {a} with itself")));
                }
                let slot = self.slot_between(graph, *a, *b)?;
                Ok(vec![slot; count])
            }
        }
    }

    fn slots_above(&self, anchor: NodeId, count: usize) -> Result<Vec<GridPoint>> {
        let pos = self.require(anchor)?;
        let total = count as i32;
        let y = pos.y - self.unit.y;
        Ok((0..total)
            .map(|i| GridPoint::new(pos.x + (2 * i - total + 1) * self.unit.x, y))
            .collect())
    }

    fn slots_below<G: LayoutGraph>(&self, graph: &G, anchor: NodeId, count: usize) -> Result<Vec<GridPoint>> {
        let pos = self.require(anchor)?;
        let y = pos.y + self.unit.y;
        let mut span: Option<(i32, i32)> = None;
        for child in graph.lower_neighbors(anchor) {
            if let Some(p) = self.get_node(child) {
                span = Some(match span {
                    Some((lo, hi)) => (lo.min(p.x), hi.max(p.x)),
                    None => (p.x, p.x),
                });
            }
        }

        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            let x = match span {
                None => pos.x,
                // keep the combined group centered under the anchor
                Some((lo, hi)) if lo + hi > 2 * pos.x => lo - self.unit.x,
                Some((_, hi)) => hi + self.unit.x,
            };
            span = Some(match span {
                Some((lo, hi)) => (lo.min(x), hi.max(x)),
                None => (x, x),
            });
            slots.push(GridPoint::new(x, y));
        }
        Ok(slots)
    }

    fn slot_beside<G: LayoutGraph>(&self, graph: &G, anchor: NodeId) -> Result<GridPoint> {
        let pos = self.require(anchor)?;
        let own = graph.side_neighbors(anchor);
        let passable = |id: NodeId| own.contains(&id) || graph.is_partner_of(anchor, id);

        let row: Vec<i32> = self
            .nodes_in_row(pos.y)
            .into_iter()
            .filter_map(|id| self.get_node(id).map(|p| p.x))
            .collect();
        let reach = row
            .iter()
            .map(|x| (x - pos.x).abs() / self.unit.x)
            .max()
            .unwrap_or(0)
            + 2;

        let mut best: Option<(i32, i32)> = None;
        let mut outermost = pos.x;
        for dir in [1, -1] {
            let mut prev_free = false;
            for step in 1..=reach {
                let x = pos.x + dir * step * self.unit.x;
                match self.get_node_at(x, pos.y) {
                    None if step >= 2 && prev_free => {
                        if best.is_none_or(|(s, _)| step < s) {
                            best = Some((step, x));
                        }
                        break;
                    }
                    None => prev_free = true,
                    Some(id) if passable(id) => {
                        prev_free = false;
                        if dir > 0 {
                            outermost = x;
                        }
                    }
                    Some(_) => break,
                }
            }
        }

        if let Some((_, x)) = best {
            return Ok(GridPoint::new(x, pos.y));
        }
        // both sides blocked: first free cell two units past the anchor's
        // own family on the right
        let mut x = outermost + 2 * self.unit.x;
        while self.get_node_at(x, pos.y).is_some() {
            x += self.unit.x;
        }
        Ok(GridPoint::new(x, pos.y))
    }

    fn slot_between<G: LayoutGraph>(&self, graph: &G, a: NodeId, b: NodeId) -> Result<GridPoint> {
        let pa = self.position_of(graph, a)?;
        let pb = self.position_of(graph, b)?;
        let y = pa.y.max(pb.y);
        let (near, far) = if graph.side_neighbors(b).len() < graph.side_neighbors(a).len() {
            (pb, pa)
        } else {
            (pa, pb)
        };
        let dir = if far.x < near.x { -1 } else { 1 };
        Ok(GridPoint::new(near.x + dir * self.unit.x, y))
    }
}
