//! Rigid registration of moving volumes onto a target volume.
//!
//! The logic here only manages the output transform node and hands a fixed
//! parameter set to a [`RegistrationEngine`]; the fitting itself happens in
//! the engine.

use tracing::info;

use crate::enums::{InitializeTransformMode, TransformModel};
use crate::error::Result;
use crate::scene::{NodeId, Scene};

pub const TRANSFORM_NAME_SEPARATOR: &str = " ---TO--- ";

/// Name of the transform that carries `moving` onto `target`.
pub fn transform_name(moving: &str, target: &str) -> String {
    format!("{moving}{TRANSFORM_NAME_SEPARATOR}{target}")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationParameters {
    pub fixed_volume: NodeId,
    pub moving_volume: NodeId,
    pub output_transform: NodeId,
    pub initialize_transform_mode: InitializeTransformMode,
    pub transform_model: TransformModel,
}

impl RegistrationParameters {
    /// Moments-aligned, rigid-only parameters.
    pub fn rigid(fixed_volume: NodeId, moving_volume: NodeId, output_transform: NodeId) -> Self {
        Self {
            fixed_volume,
            moving_volume,
            output_transform,
            initialize_transform_mode: InitializeTransformMode::UseMomentsAlign,
            transform_model: TransformModel::Rigid,
        }
    }
}

/// Something that can fit `output_transform` so that the moving volume,
/// nested under it, lines up with the fixed volume.
///
/// Implementations block until the fit is finished.
pub trait RegistrationEngine {
    fn register(&self, scene: &mut Scene, parameters: &RegistrationParameters) -> Result<()>;
}

impl<E: RegistrationEngine + ?Sized> RegistrationEngine for &E {
    fn register(&self, scene: &mut Scene, parameters: &RegistrationParameters) -> Result<()> {
        (**self).register(scene, parameters)
    }
}

impl<E: RegistrationEngine + ?Sized> RegistrationEngine for Box<E> {
    fn register(&self, scene: &mut Scene, parameters: &RegistrationParameters) -> Result<()> {
        (**self).register(scene, parameters)
    }
}

/// Reuse the moving volume's parent transform when it already carries the
/// expected name, otherwise create one and nest the volume under it.
pub fn ensure_output_transform(scene: &mut Scene, target: NodeId, moving: NodeId) -> Result<NodeId> {
    scene.volume(target)?;
    scene.volume(moving)?;
    let name = transform_name(scene.name(moving)?, scene.name(target)?);

    if let Some(existing) = scene.parent_transform(moving)? {
        if scene.name(existing)? == name {
            return Ok(existing);
        }
    }

    let transform = scene.create_transform(name.as_str());
    scene.set_parent_transform(moving, Some(transform))?;
    info!("created transform {name} ({transform})");
    Ok(transform)
}

pub struct RegistrationLogic<E> {
    engine: E,
}

impl<E: RegistrationEngine> RegistrationLogic<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Register one moving volume and return its output transform.
    pub fn register_volumes(&self, scene: &mut Scene, target: NodeId, moving: NodeId) -> Result<NodeId> {
        let transform = ensure_output_transform(scene, target, moving)?;
        let parameters = RegistrationParameters::rigid(target, moving, transform);
        self.engine.register(scene, &parameters)?;
        Ok(transform)
    }

    pub fn run_registration(&self, scene: &mut Scene, target: NodeId, moving: &[NodeId]) -> Result<Vec<NodeId>> {
        info!("registering {} volume(s) to {target}", moving.len());
        moving
            .iter()
            .map(|&volume| self.register_volumes(scene, target, volume))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_join_moving_and_target() {
        assert_eq!(transform_name("T2", "T1"), "T2 ---TO--- T1");
    }

    #[test]
    fn default_parameters_are_rigid_moments() {
        let mut scene = Scene::new();
        let a = scene.create_transform("a");
        let p = RegistrationParameters::rigid(a, a, a);
        assert_eq!(p.initialize_transform_mode, InitializeTransformMode::UseMomentsAlign);
        assert_eq!(p.transform_model, TransformModel::Rigid);
    }
}
