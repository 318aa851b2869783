use aimcore::aiming::extractor::{ExtractionParams, TopN};
use aimcore::aiming::filter::FilterKind;
use aimcore::chunk::WATT_TO_DBM_CORRECTION;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Full aiming-workflow configuration, loadable from YAML.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Dataset directory; a synthetic chunk is generated when absent.
    pub dataset: Option<PathBuf>,
    /// Quarter turns applied to the grid before it reaches the core.
    pub rotate_90d: i32,
    /// Closed frequency window in Hz (either bound optional).
    pub lower_hz: Option<f64>,
    pub upper_hz: Option<f64>,
    /// Discrete clock-harmonic targets; takes precedence over the window.
    pub target_freqs_hz: Vec<f64>,
    pub dbm_scale: bool,
    pub dbm_correction: f64,
    pub filter_kind: FilterKind,
    /// Spatial window as `(width, height)` bins.
    pub filter_size: (usize, usize),
    /// Alternative spatial window given in Hz; overrides `filter_size`.
    pub filter_window_hz: Option<f64>,
    /// Hump threshold percentile in `[0, 1]`.
    pub percentile: f64,
    pub top_n: TopN,
    pub eps: f64,
    pub min_samples: usize,
    /// Physical span of the scanned area in millimetres.
    pub chip_mm: (f64, f64),
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            dataset: None,
            rotate_90d: 0,
            lower_hz: None,
            upper_hz: None,
            target_freqs_hz: Vec::new(),
            dbm_scale: false,
            dbm_correction: WATT_TO_DBM_CORRECTION,
            filter_kind: FilterKind::Mean,
            filter_size: (3, 3),
            filter_window_hz: None,
            percentile: 0.98,
            top_n: TopN::Fraction(0.05),
            eps: 1.5,
            min_samples: 5,
            chip_mm: (7.48, 6.64),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(percentile: f64, eps: f64, min_samples: usize) -> Self {
        Self {
            percentile,
            eps,
            min_samples,
            ..Default::default()
        }
    }

    pub fn extraction_params(&self) -> ExtractionParams {
        ExtractionParams {
            top_n: self.top_n,
            eps: self.eps,
            min_samples: self.min_samples,
        }
    }
}
