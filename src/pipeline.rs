//! Threshold-and-label segmentation of a whole volume.
//!
//! The chain is: rescale intensities to `[0, 255]`, clear everything below
//! the lower threshold, label connected objects, prune them with each
//! configured [`KeepNObjects`] rule in turn, and collapse the survivors into a
//! 0/1 mask.

use crate::config::SegmentConfig;
use crate::filters::{
    KeepNObjects, Labeling, binary_mask, connected_components, keep_n_objects, rescale_intensity,
    threshold_below,
};
use crate::volume::Volume;

use log::{debug, info};
use ndarray::Array3;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Volume is empty")]
    EmptyVolume,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Number of objects left after one pipeline stage.
#[derive(Clone, Debug, PartialEq)]
pub struct StageSummary {
    pub stage: String,
    pub objects: usize,
}

#[derive(Clone, Debug)]
pub struct PipelineOutput {
    /// Labels surviving the last pruning rule.
    pub labeling: Labeling,
    /// 0/1 foreground mask of `labeling`.
    pub mask: Array3<u8>,
    pub stages: Vec<StageSummary>,
}

pub struct SegmentationPipeline {
    config: SegmentConfig,
}

impl SegmentationPipeline {
    pub fn new(config: SegmentConfig) -> Result<Self, PipelineError> {
        if let Some(index) = config.filters.iter().position(|rule| rule.count == 0) {
            return Err(PipelineError::InvalidConfig(format!(
                "filter {index} keeps zero objects"
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    pub fn run(&self, volume: &Volume) -> Result<PipelineOutput, PipelineError> {
        if volume.data().is_empty() {
            return Err(PipelineError::EmptyVolume);
        }

        let rescaled = rescale_intensity(volume.data(), 0, 255);
        let thresholded = threshold_below(&rescaled, self.config.lower_threshold);
        let mut labeling = connected_components(&thresholded, self.config.connectivity);

        let mut stages = vec![StageSummary {
            stage: "connected components".into(),
            objects: labeling.object_count(),
        }];

        for rule in &self.config.filters {
            labeling = keep_n_objects(&labeling, volume.spacing(), rule);
            stages.push(StageSummary {
                stage: Self::describe(rule),
                objects: labeling.object_count(),
            });
        }

        for summary in &stages {
            debug!("{}: {} objects", summary.stage, summary.objects);
        }

        let mask = binary_mask(&labeling.labels);
        info!(
            "segmented {} objects covering {} voxels",
            labeling.object_count(),
            mask.iter().filter(|&&v| v != 0).count()
        );

        Ok(PipelineOutput {
            labeling,
            mask,
            stages,
        })
    }

    fn describe(rule: &KeepNObjects) -> String {
        let order = if rule.reverse { "lowest" } else { "highest" };
        format!("keep {} {order} {:?}", rule.count, rule.attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::ShapeAttribute;

    fn blobs() -> Volume {
        // Background 100, three bright cubes of side 4, 3 and 2 at 1000.
        let mut data = Array3::<u16>::from_elem((10, 20, 20), 100);
        for (origin, side) in [(1usize, 4usize), (8, 3), (14, 2)] {
            for z in 2..2 + side {
                for y in origin..origin + side {
                    for x in origin..origin + side {
                        data[[z, y, x]] = 1000;
                    }
                }
            }
        }
        Volume::new(data, (1.0, 1.0, 1.0))
    }

    #[test]
    fn default_pipeline_keeps_all_large_blobs() {
        let pipeline = SegmentationPipeline::new(SegmentConfig::default()).unwrap();
        let output = pipeline.run(&blobs()).unwrap();

        assert_eq!(output.labeling.object_count(), 3);
        assert_eq!(output.mask.iter().filter(|&&v| v == 1).count(), 64 + 27 + 8);
        assert_eq!(output.stages.len(), 4);
        assert_eq!(output.stages[0].objects, 3);
    }

    #[test]
    fn keep_one_largest() {
        let config = SegmentConfig {
            filters: vec![KeepNObjects {
                attribute: ShapeAttribute::NumberOfPixels,
                count: 1,
                reverse: false,
            }],
            ..SegmentConfig::default()
        };
        let output = SegmentationPipeline::new(config)
            .unwrap()
            .run(&blobs())
            .unwrap();

        assert_eq!(output.mask.iter().filter(|&&v| v == 1).count(), 64);
        assert_eq!(output.mask[[2, 1, 1]], 1);
        assert_eq!(output.mask[[2, 8, 8]], 0);
    }

    #[test]
    fn maximum_threshold_keeps_brightest_voxel() {
        let config = SegmentConfig {
            lower_threshold: 255,
            ..SegmentConfig::default()
        };
        let mut volume = blobs();
        volume.data_mut()[[0, 0, 0]] = 2000;

        let output = SegmentationPipeline::new(config)
            .unwrap()
            .run(&volume)
            .unwrap();

        // Only the single brightest voxel rescales to 255.
        assert_eq!(output.stages[0].objects, 1);
        assert_eq!(output.mask.iter().filter(|&&v| v == 1).count(), 1);
    }

    #[test]
    fn zero_count_rule_is_rejected() {
        let config = SegmentConfig {
            filters: vec![KeepNObjects {
                attribute: ShapeAttribute::Flatness,
                count: 0,
                reverse: false,
            }],
            ..SegmentConfig::default()
        };
        assert!(matches!(
            SegmentationPipeline::new(config),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_volume_is_rejected() {
        let pipeline = SegmentationPipeline::new(SegmentConfig::default()).unwrap();
        assert_eq!(
            pipeline.run(&Volume::default()).unwrap_err(),
            PipelineError::EmptyVolume
        );
    }
}
