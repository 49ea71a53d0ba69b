use crate::{
    enums::SortBy,
    metaimage::{self, MetaImageError},
    volume::Volume,
};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom::core::Tag;
use dicom_dictionary_std::tags;
use log::{debug, info, warn};
use ndarray::{Array2, Array3, Axis, s, stack};
use std::{cmp::Ordering, fs, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("MetaImage error: {0}")]
    MetaImage(#[from] MetaImageError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load a volume from whatever `path` points to.
    ///
    /// Directories are read as DICOM series, `.mha`/`.mhd` files as
    /// MetaImage, and anything else as a single 2D image.
    pub fn load(path: impl AsRef<Path>, sort_by: SortBy) -> Result<Volume, VolumeLoaderError> {
        let path = path.as_ref();
        let volume = if path.is_dir() {
            Self::load_from_directory(path, sort_by)?
        } else if Self::has_extension(path, &["mha", "mhd"]) {
            Self::load_metaimage(path)?
        } else if Self::has_extension(path, &["dcm"]) {
            Self::load_from_file_paths(&[path], sort_by)?
        } else {
            Self::load_image_slice(path)?
        };
        info!("loaded {} with dimensions {:?}", path.display(), volume.dim());
        Ok(volume)
    }

    /// Stack DICOM slices into a volume.
    ///
    /// Objects without decodable pixel data, or without the attribute
    /// `sort_by` orders on, are skipped. Spacing is taken from the first
    /// object carrying both `PixelSpacing` and `SliceThickness`.
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let mut slices: Vec<_> = dicom_objects
            .iter()
            .filter_map(|object| DicomSlice::decode(object, sort_by))
            .collect();

        if slices.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }
        if slices.len() < dicom_objects.len() {
            warn!(
                "skipped {} of {} DICOM objects",
                dicom_objects.len() - slices.len(),
                dicom_objects.len()
            );
        }

        order_slices(&mut slices, sort_by);
        let data = stack_slices(&slices)?;
        let spacing = series_spacing(dicom_objects).ok_or(VolumeLoaderError::MissingSpacing)?;

        Ok(Volume::new(data, spacing))
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let objects: Result<Vec<_>, _> =
            paths.iter().map(|path| open_file(path.as_ref())).collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| Self::has_extension(path, &["dcm"]))
            .collect();

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }
        debug!("found {} DICOM files in {}", paths.len(), path.as_ref().display());

        Self::load_from_file_paths(&paths, sort_by)
    }

    /// Load a MetaImage (`.mha`, or `.mhd` with a raw data file)
    pub fn load_metaimage(path: impl AsRef<Path>) -> Result<Volume, VolumeLoaderError> {
        Ok(metaimage::read_metaimage(path)?)
    }

    /// Load a single 2D image as a volume of depth 1 with unit spacing.
    ///
    /// Colour images are converted to 16-bit luminance.
    pub fn load_image_slice(path: impl AsRef<Path>) -> Result<Volume, VolumeLoaderError> {
        let image = image::open(path.as_ref())?.into_luma16();
        let (width, height) = image.dimensions();
        let data = Array3::from_shape_vec((1, height as usize, width as usize), image.into_raw())
            .map_err(|_| VolumeLoaderError::InconsistentDimensions)?;
        Ok(Volume::new(data, (1.0, 1.0, 1.0)))
    }

    fn has_extension(path: &Path, extensions: &[&str]) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
    }
}

/// One decoded DICOM frame and its position along the stacking axis.
struct DicomSlice {
    position: Option<f32>,
    pixels: Array2<u16>,
}

impl DicomSlice {
    fn decode(object: &FileDicomObject<InMemDicomObject>, sort_by: SortBy) -> Option<Self> {
        let position = match sort_by {
            // Slices are ordered along the patient z axis.
            SortBy::ImagePositionPatient => floats(object, tags::IMAGE_POSITION_PATIENT)?
                .get(2)
                .copied(),
            SortBy::TablePosition => floats(object, tags::TABLE_POSITION)?.first().copied(),
            SortBy::InstanceNumber => object
                .element(tags::INSTANCE_NUMBER)
                .ok()?
                .to_int::<i32>()
                .ok()
                .map(|n| n as f32),
            SortBy::None => None,
        };

        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);
        let frames = object
            .decode_pixel_data()
            .ok()?
            .to_ndarray_with_options::<u16>(&options)
            .ok()?;

        Some(Self {
            position,
            // First frame, first sample: (frame, row, column, sample).
            pixels: frames.slice_move(s![0, .., .., 0]),
        })
    }
}

fn floats(object: &FileDicomObject<InMemDicomObject>, tag: Tag) -> Option<Vec<f32>> {
    object.element(tag).ok()?.to_multi_float32().ok()
}

/// Order slices by position. Image position runs from head to feet, so it
/// is sorted descending; unknown positions go first (last when descending).
fn order_slices(slices: &mut [DicomSlice], sort_by: SortBy) {
    let by_position = |a: &DicomSlice, b: &DicomSlice| {
        a.position
            .partial_cmp(&b.position)
            .unwrap_or(Ordering::Equal)
    };
    match sort_by {
        SortBy::None => {}
        SortBy::ImagePositionPatient => slices.sort_by(|a, b| by_position(b, a)),
        SortBy::TablePosition | SortBy::InstanceNumber => slices.sort_by(by_position),
    }
}

fn stack_slices(slices: &[DicomSlice]) -> Result<Array3<u16>, VolumeLoaderError> {
    let views: Vec<_> = slices.iter().map(|slice| slice.pixels.view()).collect();
    stack(Axis(0), &views).map_err(|_| VolumeLoaderError::InconsistentDimensions)
}

/// `(x, y, z)` spacing. `PixelSpacing` is stored as (row, column), i.e. (y, x).
fn series_spacing(objects: &[FileDicomObject<InMemDicomObject>]) -> Option<(f32, f32, f32)> {
    objects.iter().find_map(|object| {
        let pixel_spacing = floats(object, tags::PIXEL_SPACING)?;
        let thickness = floats(object, tags::SLICE_THICKNESS)?;
        Some((
            *pixel_spacing.get(1)?,
            *pixel_spacing.first()?,
            *thickness.first()?,
        ))
    })
}
