use crate::aiming::filter::{self, FilterKind};
use crate::chunk::metadata::ChunkMetadata;
use crate::prelude::{AimError, AimResult};
use crate::telemetry::log::LogManager;
use ndarray::{Array1, Array2, Array3, Axis};

/// Default linear-power-to-log correction (watts to dBm).
pub const WATT_TO_DBM_CORRECTION: f64 = 30.0;

/// Provenance of a chunk. Slices carry the parent identifier only; the
/// parent's storage is never shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOrigin {
    Original,
    RangeSlice { parent: String },
    DiscreteSlice { parent: String },
    Derived { parent: String },
}

/// A dense grid of near-field PSD measurements.
///
/// `data[y][x][bin]` holds the measured power at scan row `y`, column `x`
/// for frequency bin `bin`; `freq` is the strictly increasing axis in Hz.
/// Chunks are immutable after construction: every slicing or transform
/// operation returns a new chunk with freshly copied buffers.
#[derive(Debug, Clone)]
pub struct PsdChunk {
    id: String,
    data: Array3<f64>,
    freq: Array1<f64>,
    metadata: ChunkMetadata,
    origin: ChunkOrigin,
    logger: LogManager,
}

/// Result of a discrete frequency selection: the sliced chunk plus, per
/// requested frequency, the absolute distance in Hz to the bin actually
/// selected.
#[derive(Debug)]
pub struct NearestSlice {
    pub chunk: PsdChunk,
    pub deviation_hz: Vec<f64>,
}

impl PsdChunk {
    pub fn new(
        id: impl Into<String>,
        data: Array3<f64>,
        freq: Array1<f64>,
        metadata: ChunkMetadata,
    ) -> AimResult<Self> {
        if freq.len() != data.shape()[2] {
            return Err(AimError::InvalidInput(format!(
                "frequency axis length {} does not match grid depth {}",
                freq.len(),
                data.shape()[2]
            )));
        }
        if freq.windows(2).into_iter().any(|w| w[0] >= w[1]) {
            return Err(AimError::InvalidInput(
                "frequency axis must be strictly increasing".into(),
            ));
        }
        Ok(Self {
            id: id.into(),
            data,
            freq,
            metadata,
            origin: ChunkOrigin::Original,
            logger: LogManager::new(),
        })
    }

    fn take_bins(&self, indices: &[usize], origin: ChunkOrigin) -> PsdChunk {
        PsdChunk {
            id: self.id.clone(),
            data: self.data.select(Axis(2), indices),
            freq: self.freq.select(Axis(0), indices),
            metadata: self.metadata.clone(),
            origin,
            logger: LogManager::new(),
        }
    }

    /// Closed-interval frequency slice. At least one bound is required.
    /// An empty match warns and returns `Ok(None)` rather than failing.
    pub fn slice_freq_range(
        &self,
        lower_hz: Option<f64>,
        upper_hz: Option<f64>,
    ) -> AimResult<Option<PsdChunk>> {
        if lower_hz.is_none() && upper_hz.is_none() {
            return Err(AimError::InvalidConfig(
                "frequency-range slice needs at least one bound".into(),
            ));
        }
        let lo = lower_hz.unwrap_or(f64::NEG_INFINITY);
        let hi = upper_hz.unwrap_or(f64::INFINITY);
        let indices: Vec<usize> = self
            .freq
            .iter()
            .enumerate()
            .filter(|(_, &f)| lo <= f && f <= hi)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            self.logger.warn(&format!(
                "{}: no frequency bins inside [{:?}, {:?}]",
                self.id, lower_hz, upper_hz
            ));
            return Ok(None);
        }
        let origin = ChunkOrigin::RangeSlice {
            parent: self.id.clone(),
        };
        Ok(Some(self.take_bins(&indices, origin)))
    }

    /// Selects, per requested frequency, the axis bin with the smallest
    /// absolute distance (ties broken by smallest index). Warns when a
    /// selection lands on the first or last bin of the axis.
    pub fn slice_nearest(&self, targets_hz: &[f64]) -> AimResult<NearestSlice> {
        if targets_hz.is_empty() {
            return Err(AimError::InvalidConfig(
                "nearest-frequency slice needs at least one target".into(),
            ));
        }
        if self.bins() == 0 {
            return Err(AimError::InvalidInput("chunk has no frequency bins".into()));
        }
        let mut indices = Vec::with_capacity(targets_hz.len());
        let mut deviation_hz = Vec::with_capacity(targets_hz.len());
        for &target in targets_hz {
            let mut best = 0usize;
            let mut best_diff = f64::INFINITY;
            for (i, &f) in self.freq.iter().enumerate() {
                let diff = (f - target).abs();
                if diff < best_diff {
                    best = i;
                    best_diff = diff;
                }
            }
            indices.push(best);
            deviation_hz.push(best_diff);
        }
        let last = self.freq.len() - 1;
        if indices.iter().any(|&i| i == 0 || i == last) {
            self.logger
                .warn(&format!("{}: an edge frequency bin was selected", self.id));
        }
        let origin = ChunkOrigin::DiscreteSlice {
            parent: self.id.clone(),
        };
        Ok(NearestSlice {
            chunk: self.take_bins(&indices, origin),
            deviation_hz,
        })
    }

    /// Closed inclusive index interval. At least one bound is required;
    /// out-of-range or inverted bounds fail.
    pub fn slice_index_range(
        &self,
        lower: Option<usize>,
        upper: Option<usize>,
    ) -> AimResult<PsdChunk> {
        if lower.is_none() && upper.is_none() {
            return Err(AimError::InvalidConfig(
                "index-range slice needs at least one bound".into(),
            ));
        }
        let lo = lower.unwrap_or(0);
        let hi = upper.unwrap_or(self.bins().saturating_sub(1));
        if hi >= self.bins() || lo > hi {
            return Err(AimError::OutOfBounds(format!(
                "index range [{}, {}] outside 0..{}",
                lo,
                hi,
                self.bins()
            )));
        }
        let indices: Vec<usize> = (lo..=hi).collect();
        let origin = ChunkOrigin::RangeSlice {
            parent: self.id.clone(),
        };
        Ok(self.take_bins(&indices, origin))
    }

    /// Explicit bin list; fails if any index is out of range. The
    /// deviation list is all zeros since the selection is exact.
    pub fn slice_indices(&self, indices: &[usize]) -> AimResult<NearestSlice> {
        if indices.is_empty() {
            return Err(AimError::InvalidConfig(
                "index-list slice needs at least one index".into(),
            ));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.bins()) {
            return Err(AimError::OutOfBounds(format!(
                "bin index {} outside 0..{}",
                bad,
                self.bins()
            )));
        }
        let origin = ChunkOrigin::DiscreteSlice {
            parent: self.id.clone(),
        };
        Ok(NearestSlice {
            chunk: self.take_bins(indices, origin),
            deviation_hz: vec![0.0; indices.len()],
        })
    }

    /// Linear power to log scale: `10·log10(v) + correction` per cell.
    pub fn to_dbm(&self, correction: f64) -> PsdChunk {
        PsdChunk {
            id: self.id.clone(),
            data: self.data.mapv(|v| 10.0 * v.log10() + correction),
            freq: self.freq.clone(),
            metadata: self.metadata.clone(),
            origin: ChunkOrigin::Derived {
                parent: self.id.clone(),
            },
            logger: LogManager::new(),
        }
    }

    /// Applies a 2D spatial filter to every frequency slice, producing a
    /// chunk of identical shape.
    pub fn filtered_maps(&self, kind: FilterKind, size: (usize, usize)) -> AimResult<PsdChunk> {
        let mut out = Array3::<f64>::zeros(self.data.raw_dim());
        for bin in 0..self.bins() {
            let slice = self.data.index_axis(Axis(2), bin);
            let filtered = filter::filter_2d(slice, kind, size)?;
            out.index_axis_mut(Axis(2), bin).assign(&filtered);
        }
        Ok(PsdChunk {
            id: self.id.clone(),
            data: out,
            freq: self.freq.clone(),
            metadata: self.metadata.clone(),
            origin: ChunkOrigin::Derived {
                parent: self.id.clone(),
            },
            logger: LogManager::new(),
        })
    }

    /// Leakage map: per-cell mean across all bins of this chunk.
    pub fn mean_map(&self) -> AimResult<Array2<f64>> {
        self.data
            .mean_axis(Axis(2))
            .ok_or_else(|| AimError::InvalidInput("chunk has no frequency bins".into()))
    }

    /// Leakage map: per-cell sum across all bins of this chunk.
    pub fn sum_map(&self) -> Array2<f64> {
        self.data.sum_axis(Axis(2))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn freq(&self) -> &Array1<f64> {
        &self.freq
    }

    pub fn metadata(&self) -> &ChunkMetadata {
        &self.metadata
    }

    pub fn origin(&self) -> &ChunkOrigin {
        &self.origin
    }

    /// Columns of the scan grid (X positions).
    pub fn x_div(&self) -> usize {
        self.data.shape()[1]
    }

    /// Rows of the scan grid (Y positions).
    pub fn y_div(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn bins(&self) -> usize {
        self.data.shape()[2]
    }

    /// Bin-to-bin spacing in Hz, derived from the metadata span. Fails
    /// explicitly when `freq_span` is absent.
    pub fn bin_spacing_hz(&self) -> AimResult<f64> {
        Ok(self.metadata.require_freq_span()? / self.bins() as f64)
    }
}
