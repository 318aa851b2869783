use crate::workflow::config::WorkflowConfig;
use aimcore::aiming::{coords, extractor, filter, finder};
use aimcore::chunk::PsdChunk;
use aimcore::telemetry::{MetricsRecorder, MetricsSnapshot};
use anyhow::{bail, Context};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One ranked probe recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AimPointReport {
    pub grid_xy: (f64, f64),
    pub mm_xy: (f64, f64),
    pub confidence: f64,
    pub members: usize,
}

pub struct WorkflowResult {
    pub aim_points: Vec<AimPointReport>,
    pub leakage_map: Array2<f64>,
    pub hump_count: usize,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Runs the full aiming workflow over one measurement chunk:
    /// frequency selection, log conversion, spatial filtering, leakage-map
    /// reduction, hump detection, aim-point extraction and millimetre
    /// mapping.
    pub fn execute(&self, chunk: &PsdChunk) -> anyhow::Result<WorkflowResult> {
        let outcome = self.run_pipeline(chunk);
        match &outcome {
            Ok(result) => {
                self.metrics.record_completed(result.aim_points.len());
                log::info!(
                    "workflow {} -> {} aim points from {} humps",
                    chunk.id(),
                    result.aim_points.len(),
                    result.hump_count
                );
            }
            Err(err) => {
                self.metrics.record_failed();
                log::warn!("workflow {} failed: {}", chunk.id(), err);
            }
        }
        outcome
    }

    fn run_pipeline(&self, chunk: &PsdChunk) -> anyhow::Result<WorkflowResult> {
        let cfg = &self.config;

        let sliced = if !cfg.target_freqs_hz.is_empty() {
            chunk
                .slice_nearest(&cfg.target_freqs_hz)
                .context("selecting target frequencies")?
                .chunk
        } else if cfg.lower_hz.is_some() || cfg.upper_hz.is_some() {
            match chunk
                .slice_freq_range(cfg.lower_hz, cfg.upper_hz)
                .context("slicing frequency window")?
            {
                Some(sliced) => sliced,
                None => bail!("frequency window selects no bins"),
            }
        } else {
            chunk.clone()
        };

        let scaled = if cfg.dbm_scale {
            sliced.to_dbm(cfg.dbm_correction)
        } else {
            sliced
        };

        let filter_size = if let Some(window_hz) = cfg.filter_window_hz {
            let spacing = scaled.bin_spacing_hz().context("resolving bin spacing")?;
            let bins = filter::window_bins_from_hz(window_hz, spacing)
                .context("converting filter window to bins")?;
            (bins, bins)
        } else {
            cfg.filter_size
        };

        let filtered = scaled
            .filtered_maps(cfg.filter_kind, filter_size)
            .context("spatial filtering")?;
        let leakage_map = filtered.mean_map().context("reducing leakage map")?;

        let humps = finder::top_percent_locations(leakage_map.view(), cfg.percentile)
            .context("detecting hump points")?;
        let extraction =
            extractor::extract_aim_points(leakage_map.view(), &humps, &cfg.extraction_params())
                .context("extracting aim points")?;

        let mut aim_points = Vec::with_capacity(extraction.clusters.len());
        for cluster in &extraction.clusters {
            let mm_xy =
                coords::mm_location_from_origin(leakage_map.view(), cluster.centroid, cfg.chip_mm)
                    .context("mapping centroid to millimetres")?;
            aim_points.push(AimPointReport {
                grid_xy: cluster.centroid,
                mm_xy,
                confidence: cluster.confidence,
                members: cluster.members.len(),
            });
        }

        Ok(WorkflowResult {
            aim_points,
            leakage_map,
            hump_count: humps.len(),
        })
    }
}
