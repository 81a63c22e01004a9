mod edits;
mod error;
mod grid;
mod levels;
mod placement;
mod shift;
mod staging;
#[cfg(test)]
mod testing;
pub(crate) mod types;
pub use types::*;

pub use error::{LayoutError, Result};
pub use grid::GridIndex;
pub use levels::LevelOptimizer;
