mod common;

use common::synthetic_image::ball_volume;
use mri_segment::config::SegmentConfig;
use mri_segment::enums::{Interpolation, Orientation, SortBy};
use mri_segment::metaimage::write_metaimage;
use mri_segment::pipeline::SegmentationPipeline;
use mri_segment::region_growing::{FOREGROUND, segment_from_seed};
use mri_segment::volume_loader::VolumeLoader;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn ball_survives_the_default_pipeline() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let scan = dir.path().join("scan.mha");
    let data = ball_volume(16, 5.0);
    let ball_voxels = data.iter().filter(|&&v| v == 3000).count();
    write_metaimage(&scan, &data, (1.0, 1.0, 1.0)).unwrap();

    let volume = VolumeLoader::load(&scan, SortBy::default()).unwrap();
    let output = SegmentationPipeline::new(SegmentConfig::default())
        .unwrap()
        .run(&volume)
        .unwrap();

    assert_eq!(output.labeling.object_count(), 1);
    assert_eq!(output.mask.iter().filter(|&&v| v == 1).count(), ball_voxels);

    let mask_path = dir.path().join("mask.mha");
    write_metaimage(&mask_path, &output.mask, volume.spacing()).unwrap();
    let reloaded = VolumeLoader::load(&mask_path, SortBy::default()).unwrap();
    assert_eq!(reloaded.data().mapv(|v| v as u8), output.mask);
}

#[test]
fn region_grown_on_middle_slice_matches_ball_cross_section() {
    init_logging();
    let data = ball_volume(21, 6.0);
    let volume = mri_segment::volume::Volume::new(data, (1.0, 1.0, 1.0));

    let slice = volume
        .get_image_from_axis(10, Orientation::Axial, Interpolation::None)
        .unwrap();
    let mask = segment_from_seed(&slice, (10, 10), 100.0).unwrap();

    let expected = volume
        .get_slice_from_axis(10, &Orientation::Axial)
        .unwrap()
        .iter()
        .filter(|&&v| v == 3000)
        .count();
    assert_eq!(
        mask.pixels().filter(|p| p.0[0] == FOREGROUND).count(),
        expected
    );
}
