use log::debug;
use ndarray::{Array3, Zip};

/// Linearly map the sample range of `data` onto `[out_min, out_max]`.
///
/// A constant volume maps to `out_min`. Results are truncated towards zero.
pub fn rescale_intensity(data: &Array3<u16>, out_min: u8, out_max: u8) -> Array3<u8> {
    let (in_min, in_max) = data
        .iter()
        .fold((u16::MAX, u16::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    if data.is_empty() || in_min >= in_max {
        return Array3::from_elem(data.dim(), out_min);
    }

    let scale = (f64::from(out_max) - f64::from(out_min)) / (f64::from(in_max) - f64::from(in_min));
    debug!("rescaling [{in_min}, {in_max}] to [{out_min}, {out_max}]");

    Zip::from(data).par_map_collect(|&v| {
        let mapped = (f64::from(v) - f64::from(in_min)) * scale + f64::from(out_min);
        mapped.clamp(f64::from(out_min.min(out_max)), f64::from(out_min.max(out_max))) as u8
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn range_is_stretched_to_output() {
        let data = array![[[1000u16, 1500, 2000]]];
        assert_eq!(rescale_intensity(&data, 0, 255), array![[[0u8, 127, 255]]]);
    }

    #[test]
    fn constant_volume_maps_to_minimum() {
        let data = Array3::<u16>::from_elem((2, 2, 2), 900);
        assert!(rescale_intensity(&data, 0, 255).iter().all(|&v| v == 0));
    }

    #[test]
    fn unit_range_output() {
        let data = array![[[0u16, 5]]];
        assert_eq!(rescale_intensity(&data, 0, 1), array![[[0u8, 1]]]);
    }
}
