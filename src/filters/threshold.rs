use ndarray::Array3;

/// Set every sample below `lower` to zero, leaving the rest unchanged.
pub fn threshold_below(data: &Array3<u8>, lower: u8) -> Array3<u8> {
    data.mapv(|v| if v < lower { 0 } else { v })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn values_below_lower_are_cleared() {
        let data = array![[[10u8, 101, 102, 250]]];
        assert_eq!(threshold_below(&data, 102), array![[[0u8, 0, 102, 250]]]);
    }

    #[test]
    fn zero_lower_keeps_everything() {
        let data = array![[[0u8, 1], [2, 3]]];
        assert_eq!(threshold_below(&data, 0), data);
    }
}
