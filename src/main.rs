//! mri-segment CLI: region growing, volume segmentation and slice export.

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use mri_segment::{
    config::{Config, load_config},
    enums::{Interpolation, Orientation, SortBy},
    metaimage,
    pipeline::SegmentationPipeline,
    region_growing::{random_seed, segment_from_seed},
    volume_loader::VolumeLoader,
};
use std::path::PathBuf;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "mri-segment")]
#[command(about = "Segment MRI slices by region growing and volumes by threshold and labeling")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grow a region from a seed pixel of a 2D image and save the mask.
    Grow(GrowArgs),

    /// Segment a volume and write the mask as MetaImage.
    Segment(SegmentArgs),

    /// Export one slice of a volume as an 8-bit image.
    Slice(SliceArgs),
}

#[derive(Debug, Args)]
struct GrowArgs {
    /// Path to the input image (PNG, JPEG, ...).
    #[arg(long)]
    image: PathBuf,

    /// Path to write the mask image.
    #[arg(long)]
    out: PathBuf,

    /// Seed pixel as X Y. A random seed is used when omitted.
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    seed: Option<Vec<u32>>,

    /// Pixels strictly above this intensity join the region.
    #[arg(long)]
    threshold: Option<f64>,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct SegmentArgs {
    /// Input volume: a DICOM directory, a .mha/.mhd file or a 2D image.
    #[arg(long)]
    input: PathBuf,

    /// Path to write the mask (.mha).
    #[arg(long)]
    out: PathBuf,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lower threshold on the rescaled [0, 255] intensities.
    #[arg(long)]
    lower: Option<u8>,

    /// Slice ordering for DICOM series.
    #[arg(long, value_enum, default_value = "image-position-patient")]
    sort_by: CliSortBy,
}

#[derive(Debug, Args)]
struct SliceArgs {
    /// Input volume: a DICOM directory, a .mha/.mhd file or a 2D image.
    #[arg(long)]
    input: PathBuf,

    /// Path to write the slice image.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, value_enum, default_value = "axial")]
    orientation: CliOrientation,

    /// Slice index along the axis. Defaults to the middle slice.
    #[arg(long)]
    index: Option<usize>,

    /// Resample coronal and sagittal slices to isotropic pixels.
    #[arg(long)]
    interpolate: bool,

    /// Slice ordering for DICOM series.
    #[arg(long, value_enum, default_value = "image-position-patient")]
    sort_by: CliSortBy,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOrientation {
    Axial,
    Coronal,
    Sagittal,
}

impl From<CliOrientation> for Orientation {
    fn from(value: CliOrientation) -> Self {
        match value {
            CliOrientation::Axial => Orientation::Axial,
            CliOrientation::Coronal => Orientation::Coronal,
            CliOrientation::Sagittal => Orientation::Sagittal,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSortBy {
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

impl From<CliSortBy> for SortBy {
    fn from(value: CliSortBy) -> Self {
        match value {
            CliSortBy::ImagePositionPatient => SortBy::ImagePositionPatient,
            CliSortBy::TablePosition => SortBy::TablePosition,
            CliSortBy::InstanceNumber => SortBy::InstanceNumber,
            CliSortBy::None => SortBy::None,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Grow(args) => run_grow(args),
        Commands::Segment(args) => run_segment(args),
        Commands::Slice(args) => run_slice(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn read_config(path: Option<&PathBuf>) -> CliResult<Config> {
    Ok(match path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    })
}

fn run_grow(args: GrowArgs) -> CliResult<()> {
    let config = read_config(args.config.as_ref())?;
    let input = image::open(&args.image)?.into_luma16();
    let (width, height) = input.dimensions();

    // Intensities are compared in the 8-bit scale of the input file.
    let scaled = image::ImageBuffer::<image::Luma<f32>, Vec<f32>>::from_fn(width, height, |x, y| {
        image::Luma([f32::from(input.get_pixel(x, y).0[0]) / 257.0])
    });

    let seed = match (args.seed.as_deref(), config.grow.seed) {
        (Some([x, y]), _) => (*x, *y),
        (Some(_), _) => return Err("--seed takes exactly two values".into()),
        (None, Some(seed)) => seed,
        (None, None) => random_seed(width, height, &mut rand::rng()).ok_or("image is empty")?,
    };
    let threshold = args.threshold.unwrap_or(config.grow.threshold);
    info!("growing region from seed {seed:?} at threshold {threshold}");

    let mask = segment_from_seed(&scaled, seed, threshold)?;
    let marked = mask.pixels().filter(|p| p.0[0] != 0).count();
    mask.save(&args.out)?;

    info!("wrote {} ({marked} pixels in region)", args.out.display());
    Ok(())
}

fn run_segment(args: SegmentArgs) -> CliResult<()> {
    let mut config = read_config(args.config.as_ref())?;
    if let Some(lower) = args.lower {
        config.segment.lower_threshold = lower;
    }

    let volume = VolumeLoader::load(&args.input, args.sort_by.into())?;
    let output = SegmentationPipeline::new(config.segment)?.run(&volume)?;
    for stage in &output.stages {
        info!("{}: {} objects", stage.stage, stage.objects);
    }

    metaimage::write_metaimage(&args.out, &output.mask, volume.spacing())?;
    info!("wrote {}", args.out.display());
    Ok(())
}

fn run_slice(args: SliceArgs) -> CliResult<()> {
    let volume = VolumeLoader::load(&args.input, args.sort_by.into())?;
    let orientation = Orientation::from(args.orientation);
    let (depth, height, width) = volume.dim();
    let index = args.index.unwrap_or(match orientation {
        Orientation::Axial => depth / 2,
        Orientation::Coronal => height / 2,
        Orientation::Sagittal => width / 2,
    });
    let interpolation = if args.interpolate {
        Interpolation::Bilinear
    } else {
        Interpolation::None
    };

    let image = volume
        .get_image_from_axis(index, orientation, interpolation)
        .ok_or_else(|| format!("slice {index} is outside the volume"))?;
    image.save(&args.out)?;

    info!("wrote {} ({}x{})", args.out.display(), image.width(), image.height());
    Ok(())
}
