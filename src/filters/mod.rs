//! Volume filters used by the segmentation pipeline.
//!
//! Each filter takes an owned-or-borrowed `ndarray` volume indexed
//! `(z, y, x)` and returns a new one; none of them modify their input.

mod connected_components;
mod label_shape;
mod mask;
mod rescale;
mod threshold;

pub use connected_components::{Labeling, connected_components};
pub use label_shape::{KeepNObjects, LabelShape, keep_n_objects, label_shapes};
pub use mask::binary_mask;
pub use rescale::rescale_intensity;
pub use threshold::threshold_below;
