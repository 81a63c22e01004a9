use crate::layout::{GridIndex, GridUnit, NodeId};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct GridDump {
    pub unit: GridUnit,
    pub nodes: Vec<NodeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: NodeId,
    pub x: i32,
    pub y: i32,
    pub col: i64,
    pub row: i64,
}

impl GridDump {
    /// Registered nodes in id order, with their snapped cells.
    pub fn from_index(index: &GridIndex) -> Self {
        let nodes = index
            .iter()
            .map(|(id, pos)| {
                let cell = index.cell_of(pos);
                NodeDump {
                    id,
                    x: pos.x,
                    y: pos.y,
                    col: cell.col,
                    row: cell.row,
                }
            })
            .collect();
        GridDump {
            unit: index.grid_unit(),
            nodes,
        }
    }
}

pub fn write_grid_dump(path: &Path, index: &GridIndex) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = GridDump::from_index(index);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
