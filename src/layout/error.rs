use thiserror::Error;

use super::NodeId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("node {0} is not known to the layout")]
    NotFound(NodeId),
    #[error("invalid layout request: {0}")]
    InvalidRequest(String),
    #[error("cell ({x}, {y}) is already occupied by node {by}")]
    Occupied { x: i32, y: i32, by: NodeId },
    #[error("node {id} would land off the grid at ({x}, {y})")]
    OffGrid { id: NodeId, x: i32, y: i32 },
}

pub type Result<T> = std::result::Result<T, LayoutError>;

pub(crate) fn invalid(reason: impl Into<String>) -> LayoutError {
    LayoutError::InvalidRequest(reason.into())
}
