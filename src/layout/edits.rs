use std::collections::HashSet;

use log::{debug, warn};

use super::error::{LayoutError, Result};
use super::{GridIndex, GridPoint, LayoutGraph, Limits, NodeId};

// The structural edits only shift a row when one of the new nodes would
// land on an occupied cell; a free target leaves the rest of the chart alone.

impl GridIndex {
    /// Makes room for `child`, freshly placed under `parent`, and registers it.
    ///
    /// Siblings on the side the group is not growing towards stay put, as do
    /// the parent and its partners; the rest of the row moves out of the way
    /// when the child's cell is taken.
    pub fn on_child_added<G: LayoutGraph>(&mut self, graph: &mut G, child: NodeId, parent: NodeId) -> Result<()> {
        let pos = graph.position(child).ok_or(LayoutError::NotFound(child))?;
        let parent_pos = self.require(parent)?;
        let grows_right = pos.x >= parent_pos.x;

        let mut fixed: HashSet<NodeId> = [child, parent].into_iter().collect();
        fixed.extend(graph.upper_neighbors(parent));
        fixed.extend(graph.side_neighbors(parent));
        for sibling in graph.lower_neighbors(parent) {
            if sibling == child {
                continue;
            }
            if let Some(p) = self.get_node(sibling) {
                if (grows_right && p.x < pos.x) || (!grows_right && p.x > pos.x) {
                    fixed.insert(sibling);
                }
            }
        }

        if self.is_blocked(graph, child, pos) {
            let limits = if grows_right {
                Limits::new(pos.x - self.unit.x, pos.x)
            } else {
                Limits::new(pos.x, pos.x + self.unit.x)
            };
            let mut ignore = fixed.clone();
            let shifted = self.row_shift(graph, pos.y, limits, self.unit.x, &mut ignore);
            self.or_rollback(graph, shifted)?;
        }
        debug!("child {child} added under {parent} at ({}, {})", pos.x, pos.y);
        self.finish(graph, &[child], &fixed)
    }

    /// Makes room for `partner` next to `person`, and for their partnership
    /// node when one is given, then registers the new nodes.
    ///
    /// The person's existing partnerships and partners keep their places;
    /// when a new node's cell is taken, the rest of the row moves away from
    /// the span between person and partner.
    pub fn on_partner_added<G: LayoutGraph>(
        &mut self,
        graph: &mut G,
        person: NodeId,
        partner: NodeId,
        partnership: Option<NodeId>,
    ) -> Result<()> {
        let person_pos = self.require(person)?;
        let partner_pos = graph.position(partner).ok_or(LayoutError::NotFound(partner))?;
        let mut added = vec![partner];
        if let Some(id) = partnership {
            if !graph.contains(id) {
                return Err(LayoutError::NotFound(id));
            }
            added.push(id);
        }
        let grows_right = partner_pos.x >= person_pos.x;

        let mut fixed: HashSet<NodeId> = added.iter().copied().collect();
        fixed.insert(person);
        let parents = graph.upper_neighbors(person);
        fixed.extend(parents.iter().copied());
        let unions = graph.side_neighbors(person);
        for &union in &unions {
            fixed.insert(union);
            fixed.extend(graph.side_neighbors(union));
        }
        let mut siblings = Vec::new();
        for parent in parents {
            siblings.extend(graph.lower_neighbors(parent));
        }
        for id in siblings {
            if let Some(p) = self.get_node(id) {
                if (grows_right && p.x < person_pos.x) || (!grows_right && p.x > person_pos.x) {
                    fixed.insert(id);
                }
            }
        }

        let blocked = added.iter().any(|&id| {
            graph
                .position(id)
                .is_some_and(|p| self.is_blocked(&*graph, id, p))
        });
        if blocked {
            let limits = Limits::new(person_pos.x, partner_pos.x);
            let length = (partner_pos.x - person_pos.x).abs().max(self.unit.x);
            let mut ignore = fixed.clone();
            let shifted = self.row_shift(graph, partner_pos.y, limits, length, &mut ignore);
            self.or_rollback(graph, shifted)?;
        }
        debug!("partner {partner} added next to {person}");
        self.finish(graph, &added, &fixed)
    }

    /// Makes room for two new parents and their partnership above `child`,
    /// shifting the parents' row until all three cells are free. Nothing
    /// moves when the cells are free to begin with.
    pub fn on_parents_added<G: LayoutGraph>(
        &mut self,
        graph: &mut G,
        child: NodeId,
        mother: NodeId,
        father: NodeId,
        partnership: NodeId,
    ) -> Result<()> {
        self.require(child)?;
        let added = [mother, father, partnership];
        let mut points: Vec<GridPoint> = Vec::with_capacity(added.len());
        for id in added {
            points.push(graph.position(id).ok_or(LayoutError::NotFound(id))?);
        }
        let low = points.iter().map(|p| p.x).min().unwrap_or_default();
        let high = points.iter().map(|p| p.x).max().unwrap_or_default();
        let limits = Limits::new(low, high);
        let y = points.iter().map(|p| p.y).max().unwrap_or_default();

        let mut fixed: HashSet<NodeId> = added.into_iter().collect();
        fixed.insert(child);

        let rounds = (high - low) / self.unit.x + 2;
        for _ in 0..rounds {
            let blocked = added
                .iter()
                .zip(&points)
                .any(|(&id, &p)| self.is_blocked(&*graph, id, p));
            if !blocked {
                break;
            }
            let mut ignore = fixed.clone();
            let shifted = self.row_shift(graph, y, limits, self.unit.x, &mut ignore);
            if !self.or_rollback(graph, shifted)? {
                break;
            }
        }
        debug!("parents {mother} and {father} added above {child}");
        self.finish(graph, &added, &fixed)
    }

    fn is_blocked<G: LayoutGraph>(&self, graph: &G, id: NodeId, pos: GridPoint) -> bool {
        self.pending_occupant(graph, pos).is_some_and(|other| other != id)
    }

    /// Passes `result` through, dropping every staged move if it failed.
    fn or_rollback<G: LayoutGraph, T>(&mut self, graph: &mut G, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            warn!("rolling back layout edit: {err}");
            self.rollback_pending_moves(graph);
        }
        result
    }

    /// Settles and commits the staged shifts, then registers `added`.
    /// Any failure, including a node left off the grid, rolls the whole
    /// edit back.
    fn finish<G: LayoutGraph>(&mut self, graph: &mut G, added: &[NodeId], fixed: &HashSet<NodeId>) -> Result<()> {
        let settled = self
            .settle(graph, added, fixed)
            .and_then(|_| self.check_on_grid(&*graph, added))
            .and_then(|_| self.commit_pending_moves(graph));
        self.or_rollback(graph, settled)?;
        for &id in added {
            self.insert(graph, id)?;
        }
        Ok(())
    }

    fn check_on_grid<G: LayoutGraph>(&self, graph: &G, added: &[NodeId]) -> Result<()> {
        for id in self.pending.ids().chain(added.iter().copied()) {
            let Some(pos) = graph.position(id) else {
                continue;
            };
            if !self.is_on_grid(pos) {
                return Err(LayoutError::OffGrid { id, x: pos.x, y: pos.y });
            }
        }
        Ok(())
    }
}
