use crate::prelude::{AimError, AimResult, GridPoint};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Neighborhood reduction applied by the spatial filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Min,
    Max,
    Mean,
    Median,
}

impl FromStr for FilterKind {
    type Err = AimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min" => Ok(FilterKind::Min),
            "max" => Ok(FilterKind::Max),
            "mean" => Ok(FilterKind::Mean),
            "median" => Ok(FilterKind::Median),
            other => Err(AimError::InvalidConfig(format!(
                "unsupported filter type '{}'",
                other
            ))),
        }
    }
}

fn reduce(window: &mut Vec<f64>, kind: FilterKind) -> f64 {
    match kind {
        FilterKind::Min => window.iter().copied().fold(f64::INFINITY, f64::min),
        FilterKind::Max => window.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        FilterKind::Mean => window.iter().sum::<f64>() / window.len() as f64,
        FilterKind::Median => {
            window.sort_by(f64::total_cmp);
            window[window.len() / 2]
        }
    }
}

/// 1D neighborhood filter with nearest-value edge padding.
pub fn filter_1d(values: ArrayView1<f64>, kind: FilterKind, size: usize) -> AimResult<Array1<f64>> {
    if size == 0 {
        return Err(AimError::InvalidConfig("filter window must be >= 1".into()));
    }
    let n = values.len();
    if n == 0 {
        return Ok(Array1::zeros(0));
    }
    let left = (size / 2) as isize;
    let mut window = Vec::with_capacity(size);
    let mut out = Array1::zeros(n);
    for i in 0..n {
        window.clear();
        for j in 0..size as isize {
            let idx = (i as isize - left + j).clamp(0, n as isize - 1) as usize;
            window.push(values[idx]);
        }
        out[i] = reduce(&mut window, kind);
    }
    Ok(out)
}

/// Separable 2D neighborhood filter over a `(width, height)` window:
/// a row pass with `width` followed by a column pass with `height`,
/// both with nearest-value edge padding.
pub fn filter_2d(
    map: ArrayView2<f64>,
    kind: FilterKind,
    size_xy: (usize, usize),
) -> AimResult<Array2<f64>> {
    let (width, height) = size_xy;
    let mut out = map.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let filtered = filter_1d(row.view(), kind, width)?;
        row.assign(&filtered);
    }
    for mut col in out.axis_iter_mut(Axis(1)) {
        let filtered = filter_1d(col.view(), kind, height)?;
        col.assign(&filtered);
    }
    Ok(out)
}

/// Converts a desired window size in Hz into an odd bin count.
///
/// `raw = target / spacing`; if `round(raw)` is odd it is used directly,
/// otherwise the window shifts to the nearer odd integer: up when the
/// fractional remainder is >= 0.5, down otherwise.
pub fn window_bins_from_hz(target_hz: f64, bin_spacing_hz: f64) -> AimResult<usize> {
    if target_hz <= 0.0 || bin_spacing_hz <= 0.0 {
        return Err(AimError::InvalidConfig(
            "window size and bin spacing must be positive".into(),
        ));
    }
    let raw = target_hz / bin_spacing_hz;
    let rounded = raw.round() as i64;
    let odd = if rounded % 2 != 0 {
        rounded
    } else if raw.fract() < 0.5 {
        rounded + 1
    } else {
        rounded - 1
    };
    Ok(odd.max(1) as usize)
}

/// Rasterizes grid points into an all-false boolean grid with the listed
/// cells set true. `shape` is `(rows, cols)`.
pub fn mask_from_points(shape: (usize, usize), points: &[GridPoint]) -> AimResult<Array2<bool>> {
    let (rows, cols) = shape;
    let mut mask = Array2::from_elem(shape, false);
    for p in points {
        if p.y >= rows || p.x >= cols {
            return Err(AimError::OutOfBounds(format!(
                "point ({}, {}) outside {}x{} grid",
                p.x, p.y, cols, rows
            )));
        }
        mask[[p.y, p.x]] = true;
    }
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn filter_kind_parses_known_identifiers_only() {
        assert_eq!(FilterKind::from_str("median").unwrap(), FilterKind::Median);
        assert!(FilterKind::from_str("gaussian").is_err());
    }

    #[test]
    fn filter_1d_mean_pads_with_nearest_value() {
        let v = array![1.0, 2.0, 3.0];
        let out = filter_1d(v.view(), FilterKind::Mean, 3).unwrap();
        // Left edge window is [1, 1, 2], right edge [2, 3, 3].
        assert!((out[0] - 4.0 / 3.0).abs() < 1e-12);
        assert!((out[1] - 2.0).abs() < 1e-12);
        assert!((out[2] - 8.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn filter_1d_min_max_median() {
        let v = array![5.0, 1.0, 4.0, 2.0];
        let min = filter_1d(v.view(), FilterKind::Min, 3).unwrap();
        assert_eq!(min.to_vec(), vec![1.0, 1.0, 1.0, 2.0]);
        let max = filter_1d(v.view(), FilterKind::Max, 3).unwrap();
        assert_eq!(max.to_vec(), vec![5.0, 5.0, 4.0, 4.0]);
        let med = filter_1d(v.view(), FilterKind::Median, 3).unwrap();
        assert_eq!(med.to_vec(), vec![5.0, 4.0, 2.0, 2.0]);
    }

    #[test]
    fn filter_2d_mean_smooths_an_impulse() {
        let mut map = Array2::zeros((3, 3));
        map[[1, 1]] = 9.0;
        let out = filter_2d(map.view(), FilterKind::Mean, (3, 3)).unwrap();
        // Separable mean spreads the impulse evenly over the 3x3 block.
        for v in out.iter() {
            assert!((v - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn window_conversion_lands_on_odd_bin_counts() {
        // raw = 3 is already odd.
        assert_eq!(window_bins_from_hz(30.0, 10.0).unwrap(), 3);
        // raw = 2.0 rounds even, fract < 0.5 -> up to 3.
        assert_eq!(window_bins_from_hz(20.0, 10.0).unwrap(), 3);
        // raw = 3.6 rounds to 4, fract >= 0.5 -> down to 3.
        assert_eq!(window_bins_from_hz(36.0, 10.0).unwrap(), 3);
        // raw = 2.5 rounds to 3 directly.
        assert_eq!(window_bins_from_hz(25.0, 10.0).unwrap(), 3);
        // Degenerate inputs never collapse below one bin.
        assert_eq!(window_bins_from_hz(1.0, 10.0).unwrap(), 1);
        assert!(window_bins_from_hz(0.0, 10.0).is_err());
    }

    #[test]
    fn mask_sets_listed_cells_only() {
        let pts = [GridPoint::new(0, 1), GridPoint::new(2, 0)];
        let mask = mask_from_points((2, 3), &pts).unwrap();
        assert!(mask[[1, 0]]);
        assert!(mask[[0, 2]]);
        assert_eq!(mask.iter().filter(|&&b| b).count(), 2);
        assert!(mask_from_points((2, 3), &[GridPoint::new(3, 0)]).is_err());
    }
}
