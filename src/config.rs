use crate::layout::GridUnit;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Largest number of crossing edges still searched exhaustively.
    pub max_full_search_size: usize,
    pub max_steps: usize,
    pub seed: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_full_search_size: 5,
            max_steps: 20_000,
            seed: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub grid: GridUnit,
    pub optimizer: OptimizerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub layout: LayoutConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GridConfigFile {
    x: Option<i32>,
    y: Option<i32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct OptimizerConfigFile {
    max_full_search_size: Option<usize>,
    max_steps: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    grid_unit: Option<GridConfigFile>,
    optimizer: Option<OptimizerConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;

    if let Some(grid) = parsed.grid_unit {
        if let Some(v) = grid.x {
            config.layout.grid.x = v;
        }
        if let Some(v) = grid.y {
            config.layout.grid.y = v;
        }
    }
    if config.layout.grid.x <= 0 || config.layout.grid.y <= 0 {
        return Err(anyhow::anyhow!(
            "grid unit must be positive, got {}x{}",
            config.layout.grid.x,
            config.layout.grid.y
        ));
    }

    if let Some(optimizer) = parsed.optimizer {
        if let Some(v) = optimizer.max_full_search_size {
            config.layout.optimizer.max_full_search_size = v;
        }
        if let Some(v) = optimizer.max_steps {
            config.layout.optimizer.max_steps = v;
        }
        if let Some(v) = optimizer.seed {
            config.layout.optimizer.seed = v;
        }
    }

    Ok(config)
}
