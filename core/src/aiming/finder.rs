use crate::prelude::{AimError, AimResult, GridPoint};
use ndarray::ArrayView2;

/// Value at percentile `p` of the map, `p` in `[0, 1]`.
///
/// All values are sorted ascending and the element at index
/// `ceil(p * N)` (clamped to the last element) is returned, so `p = 0`
/// yields the minimum-exceeding threshold and `p = 1` the maximum.
pub fn percentile_value(map: ArrayView2<f64>, p: f64) -> AimResult<f64> {
    if !(0.0..=1.0).contains(&p) {
        return Err(AimError::InvalidConfig(format!(
            "percentile {} outside [0, 1]",
            p
        )));
    }
    let mut flat: Vec<f64> = map.iter().copied().collect();
    if flat.is_empty() {
        return Err(AimError::InvalidInput("empty map".into()));
    }
    flat.sort_by(f64::total_cmp);
    let idx = ((p * flat.len() as f64).ceil() as usize).min(flat.len() - 1);
    Ok(flat[idx])
}

/// All grid cells whose value is at or above `percentile_value(map, p)`,
/// in row-major order. `p = 0` selects every cell; `p = 1` at least the
/// global maximum.
pub fn top_percent_locations(map: ArrayView2<f64>, p: f64) -> AimResult<Vec<GridPoint>> {
    let threshold = percentile_value(map, p)?;
    let mut points = Vec::new();
    for ((y, x), &v) in map.indexed_iter() {
        if v >= threshold {
            points.push(GridPoint::new(x, y));
        }
    }
    Ok(points)
}

/// `percent * global maximum`, `percent` in `[0, 1]`.
pub fn percent_of_global_max(map: ArrayView2<f64>, percent: f64) -> AimResult<f64> {
    if !(0.0..=1.0).contains(&percent) {
        return Err(AimError::InvalidConfig(format!(
            "percent {} outside [0, 1]",
            percent
        )));
    }
    let max = map
        .iter()
        .copied()
        .max_by(f64::total_cmp)
        .ok_or_else(|| AimError::InvalidInput("empty map".into()))?;
    Ok(max * percent)
}

fn window_max(map: ArrayView2<f64>, y: usize, x: usize) -> f64 {
    let (rows, cols) = map.dim();
    let mut max = f64::NEG_INFINITY;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            let ny = (y as i64 + dy).clamp(0, rows as i64 - 1) as usize;
            let nx = (x as i64 + dx).clamp(0, cols as i64 - 1) as usize;
            max = max.max(map[[ny, nx]]);
        }
    }
    max
}

fn eroded_background(map: ArrayView2<f64>, y: usize, x: usize) -> bool {
    let (rows, cols) = map.dim();
    // Cells outside the grid count as background.
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            let ny = y as i64 + dy;
            let nx = x as i64 + dx;
            if ny < 0 || nx < 0 || ny >= rows as i64 || nx >= cols as i64 {
                continue;
            }
            if map[[ny as usize, nx as usize]] != 0.0 {
                return false;
            }
        }
    }
    true
}

/// Cells equal to their 8-connected dilation, excluding flat zero-background
/// plateaus (eroded against the grid border), optionally above a hard floor.
pub fn local_maxima(map: ArrayView2<f64>, floor: Option<f64>) -> Vec<GridPoint> {
    let mut points = Vec::new();
    for ((y, x), &v) in map.indexed_iter() {
        let is_peak = v == window_max(map, y, x);
        let is_flat_background = eroded_background(map, y, x);
        let mut detected = is_peak ^ is_flat_background;
        if let Some(floor) = floor {
            detected = detected && v > floor;
        }
        if detected {
            points.push(GridPoint::new(x, y));
        }
    }
    points
}
