//! Registration through an external BRAINSFit executable.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::{FlexCropError, Result};
use crate::itk_transform::read_transform_file;
use crate::geometry::Matrix;
use crate::nrrd::{write_placed_volume, write_volume};
use crate::registration::{RegistrationEngine, RegistrationParameters};
use crate::scene::Scene;

pub const EXECUTABLE_ENV: &str = "FLEXCROP_BRAINSFIT";
pub const KEEP_SCRATCH_ENV: &str = "FLEXCROP_KEEP_SCRATCH";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrainsFitConfig {
    pub executable: PathBuf,
    /// Appended after the generated arguments.
    pub extra_args: Vec<OsString>,
    /// Leave the scratch directory with the exchanged files on disk.
    pub keep_scratch: bool,
}

impl Default for BrainsFitConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("BRAINSFit"),
            extra_args: Vec::new(),
            keep_scratch: false,
        }
    }
}

impl BrainsFitConfig {
    /// Defaults overridden by `FLEXCROP_BRAINSFIT` and `FLEXCROP_KEEP_SCRATCH`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(executable) = std::env::var_os(EXECUTABLE_ENV) {
            config.executable = PathBuf::from(executable);
        }
        if let Ok(value) = std::env::var(KEEP_SCRATCH_ENV) {
            config.keep_scratch = matches!(value.as_str(), "1" | "true" | "yes");
        }
        config
    }
}

#[derive(Clone, Debug, Default)]
pub struct BrainsFitCli {
    config: BrainsFitConfig,
}

impl BrainsFitCli {
    pub fn new(config: BrainsFitConfig) -> Self {
        Self { config }
    }

    /// Arguments for one run, with volumes and transform exchanged as files.
    pub fn arguments(
        &self,
        parameters: &RegistrationParameters,
        fixed: &Path,
        moving: &Path,
        output_transform: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--fixedVolume".into(),
            fixed.into(),
            "--movingVolume".into(),
            moving.into(),
            "--outputTransform".into(),
            output_transform.into(),
            "--initializeTransformMode".into(),
            parameters.initialize_transform_mode.as_arg().into(),
            parameters.transform_model.as_flag().into(),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args
    }

    fn run(&self, parameters: &RegistrationParameters, scratch: &Path, scene: &mut Scene) -> Result<()> {
        let fixed = scratch.join("fixed.nrrd");
        let moving = scratch.join("moving.nrrd");
        let output = scratch.join("transform.txt");

        let placement = fixed_placement(scene, parameters)?;
        write_placed_volume(scene.volume(parameters.fixed_volume)?, &placement, &fixed)?;
        write_volume(scene.volume(parameters.moving_volume)?, &moving)?;

        let args = self.arguments(parameters, &fixed, &moving, &output);
        info!("running {} {:?}", self.config.executable.display(), args);
        let result = Command::new(&self.config.executable).args(&args).output()?;

        debug!("stdout: {}", String::from_utf8_lossy(&result.stdout));
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            warn!("{} exited with {}", self.config.executable.display(), result.status);
            return Err(FlexCropError::RegistrationFailed(format!(
                "{} exited with {}: {}",
                self.config.executable.display(),
                result.status,
                stderr.trim()
            )));
        }

        let to_parent = read_transform_file(&output)?;
        scene.transform_mut(parameters.output_transform)?.to_parent = to_parent;
        Ok(())
    }
}

/// Maps the fixed volume's parent space into the output transform's parent
/// space. The imported matrix then lands in the frame the fixed volume was
/// written in.
fn fixed_placement(scene: &Scene, parameters: &RegistrationParameters) -> Result<Matrix> {
    let fixed_parent = scene.parent_transform(parameters.fixed_volume)?;
    let output_parent = scene.parent_transform(parameters.output_transform)?;
    scene.matrix_transform_to_node(fixed_parent, output_parent)
}

impl RegistrationEngine for BrainsFitCli {
    fn register(&self, scene: &mut Scene, parameters: &RegistrationParameters) -> Result<()> {
        let scratch = tempfile::Builder::new().prefix("flex-crop-").tempdir()?;
        let outcome = self.run(parameters, scratch.path(), scene);
        if self.config.keep_scratch {
            let kept = scratch.keep();
            info!("kept scratch directory {}", kept.display());
        }
        outcome
    }
}
