//! Resampling of volume slices to isotropic pixels.

use ndarray::{Array2, ArrayView2, Zip};

/// Shape `(depth, rows, columns)` of `dim` after resampling every axis to the
/// finest spacing. `spacing` is `(x, y, z)`, `dim` is `(z, y, x)`.
///
/// Zero, negative or non-finite spacing leaves the shape unchanged.
pub(crate) fn isotropic_dimensions(
    (sx, sy, sz): (f32, f32, f32),
    (depth, rows, columns): (usize, usize, usize),
) -> (usize, usize, usize) {
    let finest = sx.min(sy).min(sz);
    if !(finest.is_finite() && finest > 0.0) {
        return (depth, rows, columns);
    }
    let scale = |n: usize, s: f32| (n as f32 * s / finest).round() as usize;
    (scale(depth, sz), scale(rows, sy), scale(columns, sx))
}

/// Bilinear sample at fractional row `y`, column `x`, both inside the slice.
#[inline]
pub(crate) fn sample_bilinear(slice: &ArrayView2<'_, u16>, y: f32, x: f32) -> f32 {
    let (rows, columns) = slice.dim();
    let (r0, c0) = (y.floor() as usize, x.floor() as usize);
    let (r1, c1) = ((r0 + 1).min(rows - 1), (c0 + 1).min(columns - 1));
    let (fy, fx) = (y - r0 as f32, x - c0 as f32);

    let at = |r: usize, c: usize| f32::from(slice[[r, c]]);
    let lerp = |a: f32, b: f32, t: f32| (b - a).mul_add(t, a);

    let top = lerp(at(r0, c0), at(r0, c1), fx);
    let bottom = lerp(at(r1, c0), at(r1, c1), fx);
    lerp(top, bottom, fy)
}

/// Resample `slice` to `shape` `(rows, columns)`, aligning pixel centres.
/// `None` when either shape is empty.
pub(crate) fn resample(slice: &ArrayView2<'_, u16>, shape: (usize, usize)) -> Option<Array2<f32>> {
    let (rows, columns) = slice.dim();
    if rows == 0 || columns == 0 || shape.0 == 0 || shape.1 == 0 {
        return None;
    }
    let row_scale = rows as f32 / shape.0 as f32;
    let column_scale = columns as f32 / shape.1 as f32;
    let source = |i: usize, scale: f32, len: usize| {
        ((i as f32 + 0.5) * scale - 0.5).clamp(0.0, (len - 1) as f32)
    };

    let mut out = Array2::<f32>::zeros(shape);
    Zip::indexed(&mut out).par_for_each(|(r, c), value| {
        *value = sample_bilinear(
            slice,
            source(r, row_scale, rows),
            source(c, column_scale, columns),
        );
    });
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn isotropic_dimensions_stretch_thick_slices() {
        // 10 slices of 3mm with 1mm pixels become 30 slices.
        assert_eq!(isotropic_dimensions((1.0, 1.0, 3.0), (10, 64, 32)), (30, 64, 32));
        assert_eq!(isotropic_dimensions((0.5, 1.0, 1.0), (2, 4, 8)), (4, 8, 8));
    }

    #[test]
    fn degenerate_spacing_keeps_dimensions() {
        assert_eq!(isotropic_dimensions((0.0, 1.0, 1.0), (4, 5, 6)), (4, 5, 6));
        assert_eq!(isotropic_dimensions((f32::NAN, 1.0, 1.0), (4, 5, 6)), (4, 5, 6));
    }

    #[test]
    fn bilinear_midpoint_is_average() {
        let slice = array![[0u16, 100], [200, 300]];
        assert!((sample_bilinear(&slice.view(), 0.5, 0.5) - 150.0).abs() < 1e-3);
        assert!((sample_bilinear(&slice.view(), 1.0, 1.0) - 300.0).abs() < 1e-3);
    }

    #[test]
    fn resampling_doubles_rows() {
        let slice = array![[0u16, 0], [400, 400]];
        let out = resample(&slice.view(), (4, 2)).unwrap();

        assert_eq!(out.dim(), (4, 2));
        assert_eq!(out[[0, 0]], 0.0);
        assert!((out[[1, 1]] - 100.0).abs() < 1e-3);
        assert_eq!(out[[3, 0]], 400.0);
        assert!(resample(&slice.view(), (0, 2)).is_none());
    }
}
