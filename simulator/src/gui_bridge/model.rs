use crate::workflow::runner::{AimPointReport, WorkflowResult};
use ndarray::Axis;
use serde::{Deserialize, Serialize};

/// Snapshot handed to the external visualizer: the reduced leakage map
/// plus the ranked aim points for overlay rendering.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VisualizationModel {
    pub leakage_map: Vec<Vec<f64>>,
    pub x_div: usize,
    pub y_div: usize,
    pub hump_count: usize,
    pub aim_points: Vec<AimPointReport>,
}

impl VisualizationModel {
    pub fn from_result(result: &WorkflowResult) -> Self {
        let (y_div, x_div) = result.leakage_map.dim();
        Self {
            leakage_map: result
                .leakage_map
                .axis_iter(Axis(0))
                .map(|row| row.to_vec())
                .collect(),
            x_div,
            y_div,
            hump_count: result.hump_count,
            aim_points: result.aim_points.clone(),
        }
    }
}
