use ndarray::Array3;

/// Collapse a label volume to a 0/1 mask of its foreground.
pub fn binary_mask(labels: &Array3<u32>) -> Array3<u8> {
    labels.mapv(|label| u8::from(label != 0))
}
