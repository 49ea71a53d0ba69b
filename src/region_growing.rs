//! Seeded region growing on 2D scalar images.
//!
//! Starting from a seed pixel, [`grow_region`] marks every pixel that can be
//! reached through 4-connected neighbours whose intensity is strictly above a
//! threshold. The traversal uses an explicit work stack, so the region size is
//! not limited by the call stack, and a dense visited grid so every pixel is
//! processed at most once.
//!
//! Images and masks are consumed through the small [`ScalarImage`] and
//! [`Mask`] traits, implemented for `image` grayscale buffers and `ndarray`
//! 2D arrays (indexed `[[y, x]]`).

use image::{GrayImage, ImageBuffer, Luma, Primitive};
use log::debug;
use ndarray::{Array2, ArrayBase, Data, DataMut, Ix2};
use rand::Rng;
use std::ops::{Deref, DerefMut};
use thiserror::Error;

/// Mask value of pixels inside the region.
pub const FOREGROUND: u8 = 255;
/// Mask value of pixels outside the region.
pub const BACKGROUND: u8 = 0;
/// Threshold used when none is configured.
pub const DEFAULT_THRESHOLD: f64 = 100.0;

const FOUR_NEIGHBOURS: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionGrowingError {
    #[error("seed ({x}, {y}) is outside the {width}x{height} image")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("mask is {mask_width}x{mask_height} but the image is {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        mask_width: u32,
        mask_height: u32,
    },
}

/// Read access to a 2D grid of intensities.
pub trait ScalarImage {
    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Intensity at column `x`, row `y`. Callers stay within [`Self::dimensions`].
    fn get(&self, x: u32, y: u32) -> f64;
}

/// Write access to a segmentation mask.
pub trait Mask {
    fn dimensions(&self) -> (u32, u32);

    fn set(&mut self, x: u32, y: u32, value: u8);
}

impl<P, C> ScalarImage for ImageBuffer<Luma<P>, C>
where
    P: Primitive + Into<f64>,
    C: Deref<Target = [P]>,
{
    #[inline]
    fn dimensions(&self) -> (u32, u32) {
        ImageBuffer::dimensions(self)
    }

    #[inline]
    fn get(&self, x: u32, y: u32) -> f64 {
        self.get_pixel(x, y).0[0].into()
    }
}

impl<C> Mask for ImageBuffer<Luma<u8>, C>
where
    C: Deref<Target = [u8]> + DerefMut,
{
    #[inline]
    fn dimensions(&self) -> (u32, u32) {
        ImageBuffer::dimensions(self)
    }

    #[inline]
    fn set(&mut self, x: u32, y: u32, value: u8) {
        self.put_pixel(x, y, Luma([value]));
    }
}

/// `(width, height)` of a `(rows, columns)` array shape. Axes longer than
/// `u32::MAX` are clamped, so only the leading `u32::MAX` rows or columns are
/// addressable.
fn grid_dimensions((height, width): (usize, usize)) -> (u32, u32) {
    (
        u32::try_from(width).unwrap_or(u32::MAX),
        u32::try_from(height).unwrap_or(u32::MAX),
    )
}

impl<A, S> ScalarImage for ArrayBase<S, Ix2>
where
    A: Copy + Into<f64>,
    S: Data<Elem = A>,
{
    #[inline]
    fn dimensions(&self) -> (u32, u32) {
        grid_dimensions(self.dim())
    }

    #[inline]
    fn get(&self, x: u32, y: u32) -> f64 {
        self[[y as usize, x as usize]].into()
    }
}

impl<S> Mask for ArrayBase<S, Ix2>
where
    S: DataMut<Elem = u8>,
{
    #[inline]
    fn dimensions(&self) -> (u32, u32) {
        grid_dimensions(self.dim())
    }

    #[inline]
    fn set(&mut self, x: u32, y: u32, value: u8) {
        self[[y as usize, x as usize]] = value;
    }
}

/// Counters reported by one region growing run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionStats {
    /// Pixels popped from the stack and examined.
    pub visited: usize,
    /// Pixels set to [`FOREGROUND`].
    pub marked: usize,
}

/// Grow a region from `seed` and mark it in `mask`.
///
/// Pixels are examined depth-first. A pixel whose intensity is strictly
/// greater than `threshold` is set to [`FOREGROUND`] and its in-bounds
/// 4-neighbours are pushed; pixels at or below the threshold are only marked
/// as visited. Mask pixels outside the region are left untouched.
///
/// # Errors
///
/// [`RegionGrowingError::OutOfBounds`] if the seed lies outside the image and
/// [`RegionGrowingError::DimensionMismatch`] if the mask extent differs from
/// the image. The mask is not modified in either case.
pub fn grow_region<I, M>(
    image: &I,
    mask: &mut M,
    seed: (u32, u32),
    threshold: f64,
) -> Result<RegionStats, RegionGrowingError>
where
    I: ScalarImage + ?Sized,
    M: Mask + ?Sized,
{
    grow_region_with_offsets(image, mask, seed, threshold, &FOUR_NEIGHBOURS)
}

fn grow_region_with_offsets<I, M>(
    image: &I,
    mask: &mut M,
    seed: (u32, u32),
    threshold: f64,
    offsets: &[(i64, i64)],
) -> Result<RegionStats, RegionGrowingError>
where
    I: ScalarImage + ?Sized,
    M: Mask + ?Sized,
{
    let (width, height) = image.dimensions();
    let (mask_width, mask_height) = mask.dimensions();
    if (mask_width, mask_height) != (width, height) {
        return Err(RegionGrowingError::DimensionMismatch {
            width,
            height,
            mask_width,
            mask_height,
        });
    }

    let (seed_x, seed_y) = seed;
    if seed_x >= width || seed_y >= height {
        return Err(RegionGrowingError::OutOfBounds {
            x: seed_x,
            y: seed_y,
            width,
            height,
        });
    }

    let mut visited = Array2::<bool>::from_elem((height as usize, width as usize), false);
    let mut stack = vec![seed];
    let mut stats = RegionStats::default();

    while let Some((x, y)) = stack.pop() {
        let cell = &mut visited[[y as usize, x as usize]];
        if *cell {
            continue;
        }
        *cell = true;
        stats.visited += 1;

        if image.get(x, y) > threshold {
            mask.set(x, y, FOREGROUND);
            stats.marked += 1;

            for &(dx, dy) in offsets {
                let nx = i64::from(x) + dx;
                let ny = i64::from(y) + dy;
                if (0..i64::from(width)).contains(&nx) && (0..i64::from(height)).contains(&ny) {
                    stack.push((nx as u32, ny as u32));
                }
            }
        }
    }

    debug!(
        "region from seed ({seed_x}, {seed_y}) at threshold {threshold}: {} visited, {} marked",
        stats.visited, stats.marked
    );

    Ok(stats)
}

/// Grow a region into a freshly allocated all-background mask.
pub fn segment_from_seed<I>(
    image: &I,
    seed: (u32, u32),
    threshold: f64,
) -> Result<GrayImage, RegionGrowingError>
where
    I: ScalarImage + ?Sized,
{
    let (width, height) = image.dimensions();
    let mut mask = GrayImage::new(width, height);
    grow_region(image, &mut mask, seed, threshold)?;
    Ok(mask)
}

/// Pick a uniformly distributed seed inside a `width` x `height` grid.
///
/// Returns `None` for an empty grid.
pub fn random_seed<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    Some((rng.random_range(0..width), rng.random_range(0..height)))
}
