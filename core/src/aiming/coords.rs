use crate::prelude::{AimError, AimResult};
use ndarray::ArrayView2;

/// Maps a fractional grid coordinate onto physical coordinates by linear
/// interpolation between two reference corners.
///
/// Per axis `unit = (bottom_right - top_left) / divisions` and
/// `real = top_left + unit * pseudo`. The pseudo point must satisfy
/// `0 <= x <= width` and `0 <= y <= height` inclusive. With `apply_round`
/// the result is truncated to whole units. Convention: rightward-positive
/// X, downward-positive Y.
pub fn real_location(
    reference: ArrayView2<f64>,
    pseudo_xy: (f64, f64),
    top_left_xy: (f64, f64),
    bottom_right_xy: (f64, f64),
    apply_round: bool,
) -> AimResult<(f64, f64)> {
    let (rows, cols) = reference.dim();
    let (px, py) = pseudo_xy;
    if !(0.0..=cols as f64).contains(&px) || !(0.0..=rows as f64).contains(&py) {
        return Err(AimError::InvalidConfig(format!(
            "pseudo point ({}, {}) outside {}x{} grid",
            px, py, cols, rows
        )));
    }
    let unit_x = (bottom_right_xy.0 - top_left_xy.0) / cols as f64;
    let unit_y = (bottom_right_xy.1 - top_left_xy.1) / rows as f64;
    let mut real_x = top_left_xy.0 + unit_x * px;
    let mut real_y = top_left_xy.1 + unit_y * py;
    if apply_round {
        real_x = real_x.trunc();
        real_y = real_y.trunc();
    }
    Ok((real_x, real_y))
}

/// Millimetre position of a grid coordinate with the chip's top-left
/// corner as origin; `chip_mm_xy` is the physical span of the scanned
/// area.
pub fn mm_location_from_origin(
    reference: ArrayView2<f64>,
    pseudo_xy: (f64, f64),
    chip_mm_xy: (f64, f64),
) -> AimResult<(f64, f64)> {
    real_location(reference, pseudo_xy, (0.0, 0.0), chip_mm_xy, false)
}
