use serde::{Deserialize, Serialize};

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Spacing between adjacent valid node positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridUnit {
    pub x: i32,
    pub y: i32,
}

impl Default for GridUnit {
    fn default() -> Self {
        Self { x: 100, y: 200 }
    }
}

/// Snapped grid cell, in units rather than pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub col: i64,
    pub row: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Person,
    Partnership,
    Pregnancy,
    PlaceHolder,
    Other,
}

/// Capabilities the layout core needs from the host graph model.
///
/// Node handles are plain ids; the graph owns the nodes and their positions.
/// Neighbor queries return an empty list for unknown ids.
pub trait LayoutGraph {
    fn contains(&self, id: NodeId) -> bool;
    fn position(&self, id: NodeId) -> Option<GridPoint>;
    fn set_position(&mut self, id: NodeId, pos: GridPoint);
    fn kind(&self, id: NodeId) -> Option<NodeKind>;
    fn upper_neighbors(&self, id: NodeId) -> Vec<NodeId>;
    fn lower_neighbors(&self, id: NodeId) -> Vec<NodeId>;
    fn side_neighbors(&self, id: NodeId) -> Vec<NodeId>;
    fn is_partner_of(&self, id: NodeId, other: NodeId) -> bool;

    fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut all = self.upper_neighbors(id);
        all.extend(self.lower_neighbors(id));
        all.extend(self.side_neighbors(id));
        all
    }
}

/// Where new relatives go, relative to existing nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relative {
    /// Parents of the anchor.
    Above(NodeId),
    /// Children of the anchor.
    Below(NodeId),
    /// A partner of the anchor.
    Side(NodeId),
    /// The junction between two partners.
    Join(Vec<NodeId>),
}

/// Horizontal span that has to make room during a row shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub low: i32,
    pub high: i32,
}

impl Limits {
    pub fn new(a: i32, b: i32) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    /// Doubled midpoint, so odd spans stay exact in integer math.
    pub(crate) fn mid2(&self) -> i64 {
        self.low as i64 + self.high as i64
    }
}
