//! # mri-segment
//!
//! Segmentation of MRI slices and volumes.
//!
//! The crate offers two ways to extract structures from a scan:
//!
//!  - **Region growing** on a 2D slice: starting from a seed pixel, every
//!    4-connected pixel brighter than a threshold is marked in a mask
//!    ([`region_growing`]).
//!  - A **threshold-and-label pipeline** on a whole volume: intensities are
//!    rescaled, thresholded and labeled into connected objects, which are
//!    then pruned by size and shape before being collapsed into a mask
//!    ([`pipeline`]).
//!
//! Volumes are read from DICOM series, MetaImage (`.mha`/`.mhd`) files or
//! plain 2D images and can be sliced in the three medical axes:
//!  - Axial
//!  - Coronal
//!  - Sagittal
//!
//! Coronal and sagittal slices can be resampled to preserve the aspect ratio
//! of anisotropic scans.
//!
//! # Examples
//!
//! ## Growing a region from a seed
//!
//! ```no_run
//! # use mri_segment::region_growing::segment_from_seed;
//! let slice = image::open("slice.png")
//!     .expect("should have opened the slice")
//!     .into_luma8();
//! let mask = segment_from_seed(&slice, (173, 158), 100.0)
//!     .expect("seed should be inside the slice");
//! mask.save("mask.png").expect("should have saved the mask");
//! ```
//!
//! ## Segmenting a volume
//!
//! ```no_run
//! # use mri_segment::{config::SegmentConfig, metaimage, pipeline::SegmentationPipeline};
//! # use mri_segment::{enums::SortBy, volume_loader::VolumeLoader};
//! let volume = VolumeLoader::load("scan.mha", SortBy::default())
//!     .expect("should have loaded the scan");
//! let output = SegmentationPipeline::new(SegmentConfig::default())
//!     .expect("default configuration is valid")
//!     .run(&volume)
//!     .expect("volume should not be empty");
//! metaimage::write_metaimage("mask.mha", &output.mask, volume.spacing())
//!     .expect("should have written the mask");
//! ```

pub mod config;
pub mod enums;
pub mod filters;
mod interpolator;
pub mod metaimage;
pub mod pipeline;
pub mod region_growing;
pub mod volume;
pub mod volume_loader;
