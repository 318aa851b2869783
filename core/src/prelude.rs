use serde::{Deserialize, Serialize};

/// Integer scan-grid coordinate. `x` is the column (rightward-positive),
/// `y` the row (downward-positive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: usize,
    pub y: usize,
}

impl GridPoint {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another grid point.
    pub fn distance(&self, other: &GridPoint) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Common error type for the aiming pipeline.
#[derive(thiserror::Error, Debug)]
pub enum AimError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("index out of bounds: {0}")]
    OutOfBounds(String),
    #[error("missing metadata key: {0}")]
    MissingMetadata(&'static str),
}

pub type AimResult<T> = Result<T, AimError>;
