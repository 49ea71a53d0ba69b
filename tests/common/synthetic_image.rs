use image::{GrayImage, Luma};
use ndarray::Array3;

/// Dark image with one bright disc of the given radius.
pub fn disc_u8(width: u32, height: u32, centre: (u32, u32), radius: u32) -> GrayImage {
    assert!(width > 0 && height > 0, "image dimensions must be positive");

    let r2 = i64::from(radius) * i64::from(radius);
    GrayImage::from_fn(width, height, |x, y| {
        let dx = i64::from(x) - i64::from(centre.0);
        let dy = i64::from(y) - i64::from(centre.1);
        if dx * dx + dy * dy <= r2 {
            Luma([220])
        } else {
            Luma([30])
        }
    })
}

/// Volume with a bright ball on a dim background, indexed `(z, y, x)`.
pub fn ball_volume(side: usize, radius: f32) -> Array3<u16> {
    assert!(side > 0, "volume side must be positive");

    let c = (side as f32 - 1.0) / 2.0;
    Array3::from_shape_fn((side, side, side), |(z, y, x)| {
        let d2 = (x as f32 - c).powi(2) + (y as f32 - c).powi(2) + (z as f32 - c).powi(2);
        if d2 <= radius * radius { 3000 } else { 200 }
    })
}
