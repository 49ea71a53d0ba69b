use super::connected_components::Labeling;
use crate::enums::ShapeAttribute;

use log::debug;
use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Shape measurements of one labeled object, in physical units.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelShape {
    pub label: u32,
    pub number_of_pixels: usize,
    /// Volume in cubic millimetres.
    pub physical_size: f64,
    /// Centroid `(x, y, z)` in millimetres.
    pub centroid: [f64; 3],
    /// Eigenvalues of the covariance matrix, ascending.
    pub principal_moments: [f64; 3],
    /// `sqrt(m2 / m1)`, 0 when `m1` is 0.
    pub elongation: f64,
    /// `sqrt(m1 / m0)`, 0 when `m0` is 0.
    pub flatness: f64,
}

impl LabelShape {
    pub fn attribute(&self, attribute: ShapeAttribute) -> f64 {
        match attribute {
            ShapeAttribute::NumberOfPixels => self.number_of_pixels as f64,
            ShapeAttribute::PhysicalSize => self.physical_size,
            ShapeAttribute::Elongation => self.elongation,
            ShapeAttribute::Flatness => self.flatness,
        }
    }
}

/// Keep the `count` objects ranking highest by `attribute`.
///
/// With `reverse` the lowest-ranking objects are kept instead.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeepNObjects {
    pub attribute: ShapeAttribute,
    pub count: usize,
    #[serde(default)]
    pub reverse: bool,
}

// Principal moments below this (mm^2) are numerical noise of a flat axis.
const MOMENT_EPSILON: f64 = 1e-10;

#[derive(Clone, Copy)]
struct Moments {
    count: usize,
    sum: Vector3<f64>,
    sum_sq: Matrix3<f64>,
}

impl Default for Moments {
    fn default() -> Self {
        Self {
            count: 0,
            sum: Vector3::zeros(),
            sum_sq: Matrix3::zeros(),
        }
    }
}

fn ratio_sqrt(num: f64, den: f64) -> f64 {
    if den > 0.0 { (num / den).sqrt() } else { 0.0 }
}

/// Measure every object of `labeling`. `spacing` is `(x, y, z)`.
pub fn label_shapes(labeling: &Labeling, spacing: (f32, f32, f32)) -> Vec<LabelShape> {
    let mut moments = vec![Moments::default(); labeling.max_label() as usize + 1];
    let (sx, sy, sz) = (
        f64::from(spacing.0),
        f64::from(spacing.1),
        f64::from(spacing.2),
    );

    for ((z, y, x), &label) in labeling.labels.indexed_iter() {
        // Labels missing from `object_labels` are not measured.
        let Some(m) = moments.get_mut(label as usize).filter(|_| label != 0) else {
            continue;
        };
        let p = Vector3::new(x as f64 * sx, y as f64 * sy, z as f64 * sz);
        m.count += 1;
        m.sum += p;
        m.sum_sq += p * p.transpose();
    }

    labeling
        .object_labels
        .iter()
        .filter_map(|&label| {
            let m = moments.get(label as usize)?;
            if m.count == 0 {
                return None;
            }
            let n = m.count as f64;
            let centroid = m.sum / n;
            let covariance = m.sum_sq / n - centroid * centroid.transpose();

            let mut eig: Vec<f64> = SymmetricEigen::new(covariance)
                .eigenvalues
                .iter()
                .map(|&v| if v > MOMENT_EPSILON { v } else { 0.0 })
                .collect();
            eig.sort_by(f64::total_cmp);

            Some(LabelShape {
                label,
                number_of_pixels: m.count,
                physical_size: n * sx * sy * sz,
                centroid: [centroid.x, centroid.y, centroid.z],
                principal_moments: [eig[0], eig[1], eig[2]],
                elongation: ratio_sqrt(eig[2], eig[1]),
                flatness: ratio_sqrt(eig[1], eig[0]),
            })
        })
        .collect()
}

/// Remove every object except the ones selected by `rule`.
///
/// Kept objects retain their label values. Ties are broken by the lower label.
pub fn keep_n_objects(
    labeling: &Labeling,
    spacing: (f32, f32, f32),
    rule: &KeepNObjects,
) -> Labeling {
    let mut shapes = label_shapes(labeling, spacing);
    shapes.sort_by(|a, b| {
        let (va, vb) = (a.attribute(rule.attribute), b.attribute(rule.attribute));
        let by_value = if rule.reverse {
            va.total_cmp(&vb)
        } else {
            vb.total_cmp(&va)
        };
        match by_value {
            Ordering::Equal => a.label.cmp(&b.label),
            other => other,
        }
    });

    let mut keep = vec![false; labeling.max_label() as usize + 1];
    let mut object_labels: Vec<u32> = shapes
        .iter()
        .take(rule.count)
        .map(|shape| {
            keep[shape.label as usize] = true;
            shape.label
        })
        .collect();
    object_labels.sort_unstable();

    debug!(
        "kept {} of {} objects by {:?} (reverse: {})",
        object_labels.len(),
        labeling.object_count(),
        rule.attribute,
        rule.reverse
    );

    Labeling {
        labels: labeling
            .labels
            .mapv(|label| {
                if keep.get(label as usize).copied().unwrap_or(false) {
                    label
                } else {
                    0
                }
            }),
        object_labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::Connectivity;
    use crate::filters::connected_components;
    use ndarray::Array3;

    /// A 12x12x12 volume with a 3x3x3 cube, a 5x5x1 plate and a 6-voxel rod.
    fn three_objects() -> Labeling {
        let mut data = Array3::<u8>::zeros((12, 12, 12));
        for z in 0..3 {
            for y in 0..3 {
                for x in 0..3 {
                    data[[z, y, x]] = 1;
                }
            }
        }
        for y in 5..10 {
            for x in 5..10 {
                data[[8, y, x]] = 1;
            }
        }
        for x in 0..6 {
            data[[11, 11, x]] = 1;
        }
        connected_components(&data, Connectivity::Face)
    }

    #[test]
    fn labels_outside_object_list_are_cleared() {
        let mut labels = Array3::<u32>::zeros((1, 3, 4));
        labels[[0, 0, 0]] = 1;
        labels[[0, 0, 1]] = 1;
        labels[[0, 2, 3]] = 9;
        let labeling = Labeling {
            labels,
            object_labels: vec![1],
        };

        let shapes = label_shapes(&labeling, (1.0, 1.0, 1.0));
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].number_of_pixels, 2);

        let rule = KeepNObjects {
            attribute: ShapeAttribute::NumberOfPixels,
            count: 1,
            reverse: false,
        };
        let kept = keep_n_objects(&labeling, (1.0, 1.0, 1.0), &rule);

        assert_eq!(kept.object_labels, vec![1]);
        assert_eq!(kept.labels[[0, 0, 1]], 1);
        assert_eq!(kept.labels[[0, 2, 3]], 0);
    }

    #[test]
    fn shapes_report_size_and_centroid() {
        let shapes = label_shapes(&three_objects(), (1.0, 1.0, 2.0));

        assert_eq!(shapes.len(), 3);
        let cube = &shapes[0];
        assert_eq!(cube.number_of_pixels, 27);
        assert!((cube.physical_size - 54.0).abs() < 1e-9);
        assert!((cube.centroid[0] - 1.0).abs() < 1e-9);
        assert!((cube.centroid[2] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn flat_and_elongated_objects_are_distinguished() {
        let shapes = label_shapes(&three_objects(), (1.0, 1.0, 1.0));
        let (cube, plate, rod) = (&shapes[0], &shapes[1], &shapes[2]);

        assert!((cube.flatness - 1.0).abs() < 1e-6);
        assert!((cube.elongation - 1.0).abs() < 1e-6);
        // A one-voxel-thick plate has no extent along its normal.
        assert_eq!(plate.flatness, 0.0);
        assert!((plate.elongation - 1.0).abs() < 1e-6);
        assert_eq!(rod.elongation, 0.0);
    }

    #[test]
    fn largest_objects_are_kept() {
        let labeling = three_objects();
        let rule = KeepNObjects {
            attribute: ShapeAttribute::NumberOfPixels,
            count: 2,
            reverse: false,
        };

        let kept = keep_n_objects(&labeling, (1.0, 1.0, 1.0), &rule);

        assert_eq!(kept.object_labels, vec![1, 2]);
        assert_eq!(kept.labels[[8, 6, 6]], 2);
        assert_eq!(kept.labels[[11, 11, 0]], 0);
    }

    #[test]
    fn reverse_keeps_smallest() {
        let labeling = three_objects();
        let rule = KeepNObjects {
            attribute: ShapeAttribute::NumberOfPixels,
            count: 1,
            reverse: true,
        };

        let kept = keep_n_objects(&labeling, (1.0, 1.0, 1.0), &rule);

        assert_eq!(kept.object_labels, vec![3]);
        assert_eq!(kept.labels.iter().filter(|&&l| l != 0).count(), 6);
    }

    #[test]
    fn count_above_object_total_keeps_all() {
        let labeling = three_objects();
        let rule = KeepNObjects {
            attribute: ShapeAttribute::Flatness,
            count: 10,
            reverse: true,
        };
        assert_eq!(keep_n_objects(&labeling, (1.0, 1.0, 1.0), &rule), labeling);
    }
}
