use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Resample coronal and sagittal slices to isotropic pixels.
    Bilinear,
    #[default]
    None,
}

#[derive(Clone, Copy, Debug, Default)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

/// Neighbourhood used when labeling volumes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Voxels sharing a face (6 neighbours in 3D).
    #[default]
    Face,
    /// Voxels sharing a face, an edge or a corner (26 neighbours in 3D).
    Full,
}

/// Per-object attribute used to rank labeled objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeAttribute {
    NumberOfPixels,
    PhysicalSize,
    Elongation,
    Flatness,
}
