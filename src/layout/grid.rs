use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::trace;

use super::error::{LayoutError, Result, invalid};
use super::staging::StagedMoves;
use super::{Cell, GridPoint, GridUnit, LayoutGraph, NodeId};

/// Collision-free placement of pedigree nodes on a coarse grid.
///
/// The index keeps its own copy of each node's registered position. Moves
/// update the graph immediately but only reach the registry on
/// [`GridIndex::commit_pending_moves`], so lookups made in the middle of a
/// multi-node shift see the pre-shift layout.
#[derive(Debug, Clone)]
pub struct GridIndex {
    pub(super) unit: GridUnit,
    positions: BTreeMap<NodeId, GridPoint>,
    cells: HashMap<Cell, NodeId>,
    by_x: BTreeMap<i32, BTreeSet<NodeId>>,
    by_y: BTreeMap<i32, BTreeSet<NodeId>>,
    pub(super) pending: StagedMoves,
}

/// Two nodes that would end up in the same cell once staged moves land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Conflict {
    pub at: GridPoint,
    pub mover: NodeId,
    pub occupant: NodeId,
}

impl GridIndex {
    pub fn new(unit: GridUnit) -> Result<Self> {
        if unit.x <= 0 || unit.y <= 0 {
            return Err(invalid(format!(
                "grid unit must be positive, got {}x{}",
                unit.x, unit.y
            )));
        }
        Ok(Self {
            unit,
            positions: BTreeMap::new(),
            cells: HashMap::new(),
            by_x: BTreeMap::new(),
            by_y: BTreeMap::new(),
            pending: StagedMoves::default(),
        })
    }

    pub fn grid_unit(&self) -> GridUnit {
        self.unit
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Registered position of `id`.
    pub fn get_node(&self, id: NodeId) -> Option<GridPoint> {
        self.positions.get(&id).copied()
    }

    pub fn get_node_at(&self, x: i32, y: i32) -> Option<NodeId> {
        let id = *self.cells.get(&self.cell_of(GridPoint::new(x, y)))?;
        (self.positions.get(&id) == Some(&GridPoint::new(x, y))).then_some(id)
    }

    /// Node registered at the grid point nearest to a pointer position.
    pub fn get_node_near(&self, x: f32, y: f32) -> Option<NodeId> {
        let snapped = self.snap(x, y);
        self.cells.get(&self.cell_of(snapped)).copied()
    }

    pub fn snap(&self, x: f32, y: f32) -> GridPoint {
        let ux = self.unit.x as f32;
        let uy = self.unit.y as f32;
        GridPoint::new(
            ((x / ux).round() * ux) as i32,
            ((y / uy).round() * uy) as i32,
        )
    }

    pub fn nodes_in_row(&self, y: i32) -> Vec<NodeId> {
        self.by_y
            .get(&y)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn nodes_in_column(&self, x: i32) -> Vec<NodeId> {
        self.by_x
            .get(&x)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, GridPoint)> + '_ {
        self.positions.iter().map(|(id, pos)| (*id, *pos))
    }

    /// Registers `id` at the position the graph currently reports for it.
    pub fn insert<G: LayoutGraph>(&mut self, graph: &G, id: NodeId) -> Result<()> {
        let pos = graph.position(id).ok_or(LayoutError::NotFound(id))?;
        if self.positions.get(&id) == Some(&pos) {
            return Ok(());
        }
        let cell = self.cell_of(pos);
        if let Some(&by) = self.cells.get(&cell) {
            if by != id {
                return Err(LayoutError::Occupied {
                    x: pos.x,
                    y: pos.y,
                    by,
                });
            }
        }
        self.remove(id);
        self.register(id, pos);
        Ok(())
    }

    pub fn remove(&mut self, id: NodeId) {
        let Some(pos) = self.positions.remove(&id) else {
            return;
        };
        let cell = self.cell_of(pos);
        if self.cells.get(&cell) == Some(&id) {
            self.cells.remove(&cell);
        }
        remove_from(&mut self.by_x, pos.x, id);
        remove_from(&mut self.by_y, pos.y, id);
    }

    /// Moves `id` in the graph right away; the registry follows on commit.
    pub fn move_to<G: LayoutGraph>(&mut self, graph: &mut G, id: NodeId, pos: GridPoint) -> Result<()> {
        let current = graph.position(id).ok_or(LayoutError::NotFound(id))?;
        let origin = self.positions.get(&id).copied().unwrap_or(current);
        self.pending.stage(id, origin);
        graph.set_position(id, pos);
        Ok(())
    }

    pub fn relative_move<G: LayoutGraph>(
        &mut self,
        graph: &mut G,
        id: NodeId,
        dx: i32,
        dy: i32,
    ) -> Result<()> {
        let current = graph.position(id).ok_or(LayoutError::NotFound(id))?;
        self.move_to(graph, id, current.offset(dx, dy))
    }

    pub fn has_pending_moves(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Applies every staged move to the registry in one step.
    ///
    /// Fails without touching the registry if two nodes would share a cell;
    /// the staged moves are kept so the caller can roll them back.
    pub fn commit_pending_moves<G: LayoutGraph>(&mut self, graph: &G) -> Result<()> {
        if let Some(conflict) = self.find_conflict(graph, &[]) {
            return Err(LayoutError::Occupied {
                x: conflict.at.x,
                y: conflict.at.y,
                by: conflict.occupant,
            });
        }
        let staged = self.pending.take();
        let moved: Vec<(NodeId, GridPoint)> = staged
            .keys()
            .filter(|id| self.positions.contains_key(*id))
            .filter_map(|&id| graph.position(id).map(|pos| (id, pos)))
            .collect();
        for (id, _) in &moved {
            self.remove(*id);
        }
        for (id, pos) in moved {
            trace!("commit node {id} -> ({}, {})", pos.x, pos.y);
            self.register(id, pos);
        }
        Ok(())
    }

    /// Puts every staged node back where it was before its first move.
    pub fn rollback_pending_moves<G: LayoutGraph>(&mut self, graph: &mut G) {
        for (id, origin) in self.pending.take() {
            graph.set_position(id, origin);
        }
    }

    /// Node that holds the cell of `pos` once staged moves land: staged
    /// arrivals win over registered nodes, and nodes staged away leave
    /// their old cell free.
    pub(super) fn pending_occupant<G: LayoutGraph>(&self, graph: &G, pos: GridPoint) -> Option<NodeId> {
        let cell = self.cell_of(pos);
        let arriving = self
            .pending
            .ids()
            .find(|&id| graph.position(id).is_some_and(|p| self.cell_of(p) == cell));
        if arriving.is_some() {
            return arriving;
        }
        self.cells
            .get(&cell)
            .copied()
            .filter(|&id| !self.pending.contains(id))
    }

    /// First pair of nodes that would collide if staged moves were committed,
    /// counting `reserved` (not yet registered) nodes as movers.
    pub(super) fn find_conflict<G: LayoutGraph>(&self, graph: &G, reserved: &[NodeId]) -> Option<Conflict> {
        let mut taken: HashMap<Cell, NodeId> = HashMap::new();
        for (&id, &pos) in &self.positions {
            if !self.pending.contains(id) {
                taken.insert(self.cell_of(pos), id);
            }
        }
        let movers: BTreeSet<NodeId> = self.pending.ids().chain(reserved.iter().copied()).collect();
        for id in movers {
            let Some(pos) = graph.position(id) else {
                continue;
            };
            let cell = self.cell_of(pos);
            match taken.get(&cell) {
                Some(&occupant) if occupant != id => {
                    return Some(Conflict {
                        at: pos,
                        mover: id,
                        occupant,
                    });
                }
                _ => {
                    taken.insert(cell, id);
                }
            }
        }
        None
    }

    /// Registered position, falling back to the graph for nodes that are
    /// not registered yet.
    pub(super) fn position_of<G: LayoutGraph>(&self, graph: &G, id: NodeId) -> Result<GridPoint> {
        self.positions
            .get(&id)
            .copied()
            .or_else(|| graph.position(id))
            .ok_or(LayoutError::NotFound(id))
    }

    pub(super) fn require(&self, id: NodeId) -> Result<GridPoint> {
        self.get_node(id).ok_or(LayoutError::NotFound(id))
    }

    pub fn is_on_grid(&self, pos: GridPoint) -> bool {
        pos.x.rem_euclid(self.unit.x) == 0 && pos.y.rem_euclid(self.unit.y) == 0
    }

    /// Grid column nearest to the midpoint of `a` and `b`; halves go right.
    pub(super) fn midpoint_x(&self, a: i32, b: i32) -> i32 {
        let unit = self.unit.x as i64;
        (div_round(a as i64 + b as i64, 2 * unit) * unit) as i32
    }

    pub fn cell_of(&self, pos: GridPoint) -> Cell {
        Cell {
            col: div_round(pos.x as i64, self.unit.x as i64),
            row: div_round(pos.y as i64, self.unit.y as i64),
        }
    }

    fn register(&mut self, id: NodeId, pos: GridPoint) {
        let cell = self.cell_of(pos);
        self.positions.insert(id, pos);
        self.cells.insert(cell, id);
        self.by_x.entry(pos.x).or_default().insert(id);
        self.by_y.entry(pos.y).or_default().insert(id);
    }
}

fn remove_from(index: &mut BTreeMap<i32, BTreeSet<NodeId>>, key: i32, id: NodeId) {
    if let Some(ids) = index.get_mut(&key) {
        ids.remove(&id);
        if ids.is_empty() {
            index.remove(&key);
        }
    }
}

// Nearest cell index; halves round up.
fn div_round(value: i64, unit: i64) -> i64 {
    (2 * value + unit).div_euclid(2 * unit)
}
