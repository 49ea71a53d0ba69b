use crate::enums::Connectivity;

use log::debug;
use ndarray::Array3;

/// A label volume together with the labels it contains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Labeling {
    /// 0 is background.
    pub labels: Array3<u32>,
    /// Labels present in `labels`, ascending.
    pub object_labels: Vec<u32>,
}

impl Labeling {
    pub fn object_count(&self) -> usize {
        self.object_labels.len()
    }

    /// Largest label value, 0 when there are no objects.
    pub fn max_label(&self) -> u32 {
        self.object_labels.last().copied().unwrap_or(0)
    }
}

fn neighbour_offsets(connectivity: Connectivity) -> Vec<[isize; 3]> {
    match connectivity {
        Connectivity::Face => vec![
            [-1, 0, 0],
            [1, 0, 0],
            [0, -1, 0],
            [0, 1, 0],
            [0, 0, -1],
            [0, 0, 1],
        ],
        Connectivity::Full => {
            let mut offsets = Vec::with_capacity(26);
            for dz in -1..=1 {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        if (dz, dy, dx) != (0, 0, 0) {
                            offsets.push([dz, dy, dx]);
                        }
                    }
                }
            }
            offsets
        }
    }
}

/// Label the connected groups of non-zero voxels.
///
/// Labels are consecutive from 1, assigned in raster order (x fastest) of
/// each object's first voxel.
pub fn connected_components(data: &Array3<u8>, connectivity: Connectivity) -> Labeling {
    let (depth, height, width) = data.dim();
    let offsets = neighbour_offsets(connectivity);
    let mut labels = Array3::<u32>::zeros(data.dim());
    let mut next_label = 0u32;
    let mut stack = Vec::new();

    for ((z, y, x), &value) in data.indexed_iter() {
        if value == 0 || labels[[z, y, x]] != 0 {
            continue;
        }

        next_label += 1;
        labels[[z, y, x]] = next_label;
        stack.push([z, y, x]);

        while let Some([cz, cy, cx]) = stack.pop() {
            for [dz, dy, dx] in &offsets {
                let (Some(nz), Some(ny), Some(nx)) = (
                    cz.checked_add_signed(*dz),
                    cy.checked_add_signed(*dy),
                    cx.checked_add_signed(*dx),
                ) else {
                    continue;
                };
                if nz >= depth || ny >= height || nx >= width {
                    continue;
                }
                if data[[nz, ny, nx]] != 0 && labels[[nz, ny, nx]] == 0 {
                    labels[[nz, ny, nx]] = next_label;
                    stack.push([nz, ny, nx]);
                }
            }
        }
    }

    debug!("labeled {next_label} objects with {connectivity:?} connectivity");

    Labeling {
        labels,
        object_labels: (1..=next_label).collect(),
    }
}
