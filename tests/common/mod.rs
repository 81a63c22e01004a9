#![allow(dead_code)]

use std::collections::HashMap;

use pedigree_layout::{GridIndex, GridPoint, GridUnit, LayoutGraph, NodeId, NodeKind, Relative};

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    pos: GridPoint,
    parents: Option<NodeId>,
    children: Vec<NodeId>,
    side: Vec<NodeId>,
}

/// Small in-memory pedigree that places new relatives through a `GridIndex`
/// the way an editor would.
#[derive(Debug, Default, Clone)]
pub struct Pedigree {
    nodes: HashMap<NodeId, Node>,
    next_id: NodeId,
}

impl Pedigree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: NodeKind, at: GridPoint) -> NodeId {
        self.next_id += 1;
        self.nodes.insert(
            self.next_id,
            Node {
                kind,
                pos: at,
                parents: None,
                children: Vec::new(),
                side: Vec::new(),
            },
        );
        self.next_id
    }

    pub fn person(&mut self, x: i32, y: i32) -> NodeId {
        self.add(NodeKind::Person, GridPoint::new(x, y))
    }

    pub fn marry(&mut self, partnership: NodeId, a: NodeId, b: NodeId) {
        for partner in [a, b] {
            if let Some(node) = self.nodes.get_mut(&partnership) {
                node.side.push(partner);
            }
            if let Some(node) = self.nodes.get_mut(&partner) {
                node.side.push(partnership);
            }
        }
    }

    pub fn adopt(&mut self, partnership: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(&partnership) {
            node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parents = Some(partnership);
        }
    }
}

impl LayoutGraph for Pedigree {
    fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn position(&self, id: NodeId) -> Option<GridPoint> {
        self.nodes.get(&id).map(|n| n.pos)
    }

    fn set_position(&mut self, id: NodeId, pos: GridPoint) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.pos = pos;
        }
    }

    fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).map(|n| n.kind)
    }

    fn upper_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .and_then(|n| n.parents)
            .into_iter()
            .collect()
    }

    fn lower_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes.get(&id).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn side_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes.get(&id).map(|n| n.side.clone()).unwrap_or_default()
    }

    fn is_partner_of(&self, id: NodeId, other: NodeId) -> bool {
        self.side_neighbors(id)
            .iter()
            .any(|p| self.side_neighbors(*p).contains(&other))
    }
}

pub fn index() -> GridIndex {
    GridIndex::new(GridUnit::default()).unwrap()
}

/// Creates a node at the slot the index suggests.
pub fn add_at(pedigree: &mut Pedigree, index: &GridIndex, kind: NodeKind, relative: Relative) -> NodeId {
    let slot = index.find_slot(pedigree, &relative).unwrap();
    pedigree.add(kind, slot)
}

/// Registry is settled, injective, on the grid and in step with the graph.
pub fn assert_valid_layout(pedigree: &Pedigree, index: &GridIndex) {
    assert!(!index.has_pending_moves());
    assert_injective(index);
    for (id, pos) in index.iter() {
        assert!(index.is_on_grid(pos), "node {id} off the grid at ({}, {})", pos.x, pos.y);
        assert_eq!(pedigree.position(id), Some(pos), "node {id}");
    }
}

/// Every registered node sits in its own cell.
pub fn assert_injective(index: &GridIndex) {
    let mut seen = HashMap::new();
    for (id, pos) in index.iter() {
        if let Some(other) = seen.insert(index.cell_of(pos), id) {
            panic!("nodes {other} and {id} share cell at ({}, {})", pos.x, pos.y);
        }
    }
}
