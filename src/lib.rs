pub mod config;
pub mod layout;
pub mod layout_dump;

pub use config::{Config, LayoutConfig, OptimizerConfig, load_config};
pub use layout::{GridIndex, GridPoint, GridUnit, LayoutError, LayoutGraph, LevelOptimizer, NodeId, NodeKind, Relative};
