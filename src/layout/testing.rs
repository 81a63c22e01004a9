use std::collections::BTreeMap;

use super::{GridPoint, LayoutGraph, NodeId, NodeKind};

#[derive(Debug, Clone)]
struct TestNode {
    kind: NodeKind,
    pos: GridPoint,
    upper: Vec<NodeId>,
    lower: Vec<NodeId>,
    side: Vec<NodeId>,
}

/// Minimal pedigree: persons link sideways to their partnerships and up to
/// the partnership they descend from.
#[derive(Debug, Default, Clone)]
pub(crate) struct TestGraph {
    nodes: BTreeMap<NodeId, TestNode>,
}

impl TestGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, kind: NodeKind, x: i32, y: i32) -> NodeId {
        let id = self.nodes.len() + 1;
        self.nodes.insert(
            id,
            TestNode {
                kind,
                pos: GridPoint::new(x, y),
                upper: Vec::new(),
                lower: Vec::new(),
                side: Vec::new(),
            },
        );
        id
    }

    pub(crate) fn person(&mut self, x: i32, y: i32) -> NodeId {
        self.add(NodeKind::Person, x, y)
    }

    pub(crate) fn partnership(&mut self, x: i32, y: i32, a: NodeId, b: NodeId) -> NodeId {
        self.partnership_of(x, y, &[a, b])
    }

    pub(crate) fn partnership_of(&mut self, x: i32, y: i32, partners: &[NodeId]) -> NodeId {
        let id = self.add(NodeKind::Partnership, x, y);
        for &partner in partners {
            self.link_side(id, partner);
        }
        id
    }

    pub(crate) fn link_side(&mut self, partnership: NodeId, person: NodeId) {
        if let Some(node) = self.nodes.get_mut(&partnership) {
            node.side.push(person);
        }
        if let Some(node) = self.nodes.get_mut(&person) {
            node.side.push(partnership);
        }
    }

    pub(crate) fn link_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.lower.push(child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.upper.push(parent);
        }
    }
}

impl LayoutGraph for TestGraph {
    fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn position(&self, id: NodeId) -> Option<GridPoint> {
        self.nodes.get(&id).map(|node| node.pos)
    }

    fn set_position(&mut self, id: NodeId, pos: GridPoint) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.pos = pos;
        }
    }

    fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).map(|node| node.kind)
    }

    fn upper_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes.get(&id).map(|n| n.upper.clone()).unwrap_or_default()
    }

    fn lower_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes.get(&id).map(|n| n.lower.clone()).unwrap_or_default()
    }

    fn side_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes.get(&id).map(|n| n.side.clone()).unwrap_or_default()
    }

    fn is_partner_of(&self, id: NodeId, other: NodeId) -> bool {
        self.side_neighbors(id)
            .into_iter()
            .any(|p| self.side_neighbors(p).contains(&other))
    }
}
