use crate::enums::{Interpolation, Orientation};
use crate::interpolator;

use image::GrayImage;
use ndarray::{Array3, ArrayView2, Axis};
use rayon::prelude::*;

/// A scalar volume indexed `(z, y, x)`.
#[derive(Default, Debug, Clone)]
pub struct Volume {
    data: Array3<u16>,
    /// Voxel spacing in millimetres along (x, y, z).
    spacing: (f32, f32, f32),
    /// Shape `(z, y, x)` with every axis resampled to the finest spacing.
    isotropic_dim: (usize, usize, usize),
}

impl Volume {
    pub fn new(data: Array3<u16>, spacing: (f32, f32, f32)) -> Self {
        let isotropic_dim = interpolator::isotropic_dimensions(spacing, data.dim());
        Self {
            data,
            spacing,
            isotropic_dim,
        }
    }

    /// `(depth, height, width)`
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array3<u16> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array3<u16> {
        &mut self.data
    }

    pub fn spacing(&self) -> (f32, f32, f32) {
        self.spacing
    }

    /// Smallest and largest sample, `None` for an empty volume.
    pub fn scalar_range(&self) -> Option<(u16, u16)> {
        let widen = |a: Option<(u16, u16)>, b: Option<(u16, u16)>| match (a, b) {
            (Some((lo_a, hi_a)), Some((lo_b, hi_b))) => Some((lo_a.min(lo_b), hi_a.max(hi_b))),
            (a, None) => a,
            (None, b) => b,
        };
        self.data
            .par_iter()
            .fold(|| None, |acc, &v| widen(acc, Some((v, v))))
            .reduce(|| None, widen)
    }

    /// The 2D slice at `index` across `orientation`, `None` past the last one.
    ///
    /// Axial slices are `(y, x)`, coronal `(z, x)` and sagittal `(z, y)`.
    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: &Orientation,
    ) -> Option<ArrayView2<'_, u16>> {
        let axis = Self::axis(orientation);
        (index < self.data.len_of(axis)).then(|| self.data.index_axis(axis, index))
    }

    /// Extract a slice as an 8-bit image, scaled by the volume's intensity range.
    ///
    /// Axial slices are never resampled; coronal and sagittal slices are
    /// stretched to isotropic pixels with [`Interpolation::Bilinear`].
    pub fn get_image_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
        interpolation: Interpolation,
    ) -> Option<GrayImage> {
        let slice = self.get_slice_from_axis(index, &orientation)?;
        let range = self.scalar_range()?;

        let resample = matches!(interpolation, Interpolation::Bilinear)
            && !matches!(orientation, Orientation::Axial);
        if !resample {
            let (rows, columns) = slice.dim();
            let pixels = slice
                .into_par_iter()
                .map(|&v| to_u8(f32::from(v), range))
                .collect();
            return GrayImage::from_raw(columns as u32, rows as u32, pixels);
        }

        let resampled = interpolator::resample(&slice, self.isotropic_slice_shape(&orientation))?;
        let (rows, columns) = resampled.dim();
        let pixels = resampled.par_iter().map(|&v| to_u8(v, range)).collect();
        GrayImage::from_raw(columns as u32, rows as u32, pixels)
    }

    fn axis(orientation: &Orientation) -> Axis {
        match orientation {
            Orientation::Axial => Axis(0),
            Orientation::Coronal => Axis(1),
            Orientation::Sagittal => Axis(2),
        }
    }

    /// `(rows, columns)` of an isotropic slice across `orientation`.
    fn isotropic_slice_shape(&self, orientation: &Orientation) -> (usize, usize) {
        let (z, y, x) = self.isotropic_dim;
        match orientation {
            Orientation::Axial => (y, x),
            Orientation::Coronal => (z, x),
            Orientation::Sagittal => (z, y),
        }
    }
}

/// Map `value` from `(min, max)` onto `0..=255`; a flat range maps to 0.
#[inline]
fn to_u8(value: f32, (min, max): (u16, u16)) -> u8 {
    let span = f32::from(max) - f32::from(min);
    if span <= 0.0 {
        return 0;
    }
    ((value - f32::from(min)) * 255.0 / span).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_volume() -> Volume {
        // depth 2, height 3, width 4; value = x + 10 * y + 100 * z
        let data = Array3::from_shape_fn((2, 3, 4), |(z, y, x)| (x + 10 * y + 100 * z) as u16);
        Volume::new(data, (1.0, 1.0, 2.0))
    }

    #[test]
    fn scalar_range_covers_all_samples() {
        assert_eq!(ramp_volume().scalar_range(), Some((0, 123)));
        assert_eq!(Volume::default().scalar_range(), None);
    }

    #[test]
    fn slices_follow_orientation() {
        let volume = ramp_volume();

        let axial = volume.get_slice_from_axis(1, &Orientation::Axial).unwrap();
        assert_eq!(axial.dim(), (3, 4));
        assert_eq!(axial[[2, 3]], 123);

        let coronal = volume.get_slice_from_axis(2, &Orientation::Coronal).unwrap();
        assert_eq!(coronal.dim(), (2, 4));

        let sagittal = volume.get_slice_from_axis(3, &Orientation::Sagittal).unwrap();
        assert_eq!(sagittal.dim(), (2, 3));

        assert!(volume.get_slice_from_axis(4, &Orientation::Sagittal).is_none());
    }

    #[test]
    fn image_extremes_map_to_full_range() {
        let volume = ramp_volume();
        let image = volume
            .get_image_from_axis(1, Orientation::Axial, Interpolation::None)
            .unwrap();
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.get_pixel(3, 2).0[0], 255);

        let first = volume
            .get_image_from_axis(0, Orientation::Axial, Interpolation::None)
            .unwrap();
        assert_eq!(first.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn flat_volume_renders_black() {
        let volume = Volume::new(Array3::from_elem((1, 2, 2), 700), (1.0, 1.0, 1.0));
        let image = volume
            .get_image_from_axis(0, Orientation::Axial, Interpolation::Bilinear)
            .unwrap();
        assert!(image.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn bilinear_coronal_slice_is_stretched() {
        let volume = ramp_volume();
        let image = volume
            .get_image_from_axis(0, Orientation::Coronal, Interpolation::Bilinear)
            .unwrap();
        // Two 2mm slices resampled to four 1mm rows.
        assert_eq!(image.dimensions(), (4, 4));
    }
}
