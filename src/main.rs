use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use flex_crop::{
    brainsfit::{BrainsFitCli, BrainsFitConfig},
    enums::{BlankRegion, Interpolation, MaskMode, Orientation, SortBy},
    geometry::{Point, Vector},
    mask::mask_volume,
    moments::MomentsEngine,
    nrrd::write_volume,
    region::Region,
    registration::{RegistrationEngine, RegistrationLogic},
    scene::{NodeId, Scene},
    volume_loader::VolumeLoader,
};

#[derive(Parser)]
#[command(name = "flex-crop")]
#[command(about = "Mask volumes with an oriented box and register them rigidly")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Position,
    Table,
    Instance,
    None,
}

impl From<SortArg> for SortBy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Position => SortBy::ImagePositionPatient,
            SortArg::Table => SortBy::TablePosition,
            SortArg::Instance => SortBy::InstanceNumber,
            SortArg::None => SortBy::None,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AxisArg {
    Axial,
    Coronal,
    Sagittal,
}

impl From<AxisArg> for Orientation {
    fn from(arg: AxisArg) -> Self {
        match arg {
            AxisArg::Axial => Orientation::Axial,
            AxisArg::Coronal => Orientation::Coronal,
            AxisArg::Sagittal => Orientation::Sagittal,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Blank everything outside (or inside) a box region of a DICOM series
    Mask {
        /// Directory containing the .dcm slices
        input: PathBuf,

        /// Box center in RAS millimetres
        #[arg(long, required = true, num_args = 3, allow_negative_numbers = true, value_names = ["R", "A", "S"])]
        center: Vec<f64>,

        /// Box half extents in millimetres
        #[arg(long, required = true, num_args = 3, value_names = ["R", "A", "S"])]
        radius: Vec<f64>,

        /// Blank the inside of the box instead of the outside
        #[arg(long)]
        invert: bool,

        /// Output NRRD file
        #[arg(short, long, default_value = "masked.nrrd")]
        output: PathBuf,

        /// Also save the middle slice of the result as a PNG
        #[arg(long)]
        preview: Option<PathBuf>,

        /// Slice direction of the preview
        #[arg(long, value_enum, default_value = "axial")]
        preview_axis: AxisArg,

        #[arg(long, value_enum, default_value = "position")]
        sort_by: SortArg,
    },

    /// Rigidly register moving series onto a target series
    Register {
        /// Directory of the target (fixed) series
        target: PathBuf,

        /// Directories of the moving series
        #[arg(required = true)]
        moving: Vec<PathBuf>,

        /// BRAINSFit executable (defaults to $FLEXCROP_BRAINSFIT or BRAINSFit)
        #[arg(long)]
        brainsfit: Option<PathBuf>,

        /// Only run the in-process center-of-mass initializer
        #[arg(long, conflicts_with = "brainsfit")]
        moments_only: bool,

        /// Keep the files exchanged with BRAINSFit
        #[arg(long)]
        keep_scratch: bool,

        #[arg(long, value_enum, default_value = "position")]
        sort_by: SortArg,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Mask {
            input,
            center,
            radius,
            invert,
            output,
            preview,
            preview_axis,
            sort_by,
        } => {
            let blank = if invert {
                BlankRegion::Inside
            } else {
                BlankRegion::Outside
            };
            let region = Region::new(
                Point::new(center[0], center[1], center[2]),
                Vector::new(radius[0], radius[1], radius[2]),
            );
            run_mask(&input, region, blank, &output, preview.as_deref(), preview_axis.into(), sort_by.into())?;
        }
        Commands::Register {
            target,
            moving,
            brainsfit,
            moments_only,
            keep_scratch,
            sort_by,
        } => {
            let engine: Box<dyn RegistrationEngine> = if moments_only {
                Box::new(MomentsEngine::new())
            } else {
                let mut config = BrainsFitConfig::from_env();
                if let Some(executable) = brainsfit {
                    config.executable = executable;
                }
                config.keep_scratch |= keep_scratch;
                Box::new(BrainsFitCli::new(config))
            };
            run_register(&target, &moving, RegistrationLogic::new(engine), sort_by.into())?;
        }
    }

    Ok(())
}

fn load_into(scene: &mut Scene, dir: &Path, sort_by: SortBy) -> Result<NodeId> {
    let volume = VolumeLoader::load_from_directory(dir, sort_by)
        .with_context(|| format!("loading DICOM series from {}", dir.display()))?;
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());
    Ok(scene.add_volume(name, volume))
}

fn run_mask(
    input: &Path,
    region: Region,
    blank: BlankRegion,
    output: &Path,
    preview: Option<&Path>,
    preview_axis: Orientation,
    sort_by: SortBy,
) -> Result<()> {
    let mut scene = Scene::new();
    let volume = load_into(&mut scene, input, sort_by)?;
    let region = scene.add_region("ROI", region);

    let masked = mask_volume(&mut scene, volume, region, MaskMode::Clone, blank)?;
    let masked_volume = scene.volume(masked)?;
    write_volume(masked_volume, output).with_context(|| format!("writing {}", output.display()))?;
    info!("saved {} to {}", scene.name(masked)?, output.display());

    if let Some(preview) = preview {
        let (depth, height, width) = masked_volume.dim().context("masked volume is empty")?;
        let middle = match preview_axis {
            Orientation::Axial => depth / 2,
            Orientation::Coronal => height / 2,
            Orientation::Sagittal => width / 2,
        };
        let image = masked_volume
            .get_image_from_axis(middle, preview_axis, Interpolation::Bilinear)
            .context("could not render preview slice")?;
        image
            .save(preview)
            .with_context(|| format!("writing {}", preview.display()))?;
    }
    Ok(())
}

fn run_register<E: RegistrationEngine>(
    target: &Path,
    moving: &[PathBuf],
    logic: RegistrationLogic<E>,
    sort_by: SortBy,
) -> Result<()> {
    let mut scene = Scene::new();
    let target = load_into(&mut scene, target, sort_by)?;
    let moving = moving
        .iter()
        .map(|dir| load_into(&mut scene, dir, sort_by))
        .collect::<Result<Vec<_>>>()?;

    for transform in logic.run_registration(&mut scene, target, &moving)? {
        println!("{}\n{}", scene.name(transform)?, scene.transform(transform)?.to_parent);
    }
    Ok(())
}
