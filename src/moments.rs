//! In-process registration initializer.
//!
//! Aligns either the intensity centers of mass (`useMomentsAlign`) or the
//! geometric centers (`useGeometryAlign`) of the two volumes with a pure
//! translation. No iterative optimization follows.

use nalgebra::Translation3;
use ndarray::{Array3, Axis};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::enums::InitializeTransformMode;
use crate::error::{FlexCropError, Result};
use crate::geometry::{Matrix, Point};
use crate::registration::{RegistrationEngine, RegistrationParameters};
use crate::scene::{NodeId, Scene};

#[derive(Clone, Copy, Debug, Default)]
pub struct MomentsEngine;

impl MomentsEngine {
    pub fn new() -> Self {
        Self
    }
}

/// Intensity-weighted mean voxel index `(i, j, k)`, or `None` when the
/// total intensity is zero.
pub fn center_of_mass_index(image: &Array3<f32>) -> Option<Point> {
    let (mass, si, sj, sk) = image
        .axis_iter(Axis(0))
        .into_par_iter()
        .enumerate()
        .map(|(k, plane)| {
            plane
                .indexed_iter()
                .fold((0.0f64, 0.0f64, 0.0f64, 0.0f64), |(m, si, sj, sk), ((j, i), &v)| {
                    let v = v as f64;
                    (m + v, si + v * i as f64, sj + v * j as f64, sk + v * k as f64)
                })
        })
        .reduce(
            || (0.0, 0.0, 0.0, 0.0),
            |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2, a.3 + b.3),
        );

    if mass.abs() <= f64::EPSILON {
        return None;
    }
    Some(Point::new(si / mass, sj / mass, sk / mass))
}

/// Center of the voxel grid `(i, j, k)`.
pub fn geometric_center_index(dim: (usize, usize, usize)) -> Point {
    let (depth, height, width) = dim;
    Point::new(
        (width as f64 - 1.0) / 2.0,
        (height as f64 - 1.0) / 2.0,
        (depth as f64 - 1.0) / 2.0,
    )
}

fn center_in_parent_space(scene: &Scene, volume: NodeId, mode: InitializeTransformMode) -> Result<Point> {
    let v = scene.volume(volume)?;
    let image = v.data().ok_or(FlexCropError::MissingImageData(volume))?;
    let index = match mode {
        InitializeTransformMode::UseMomentsAlign => center_of_mass_index(image).ok_or_else(|| {
            FlexCropError::RegistrationFailed(format!("{volume} has zero total intensity"))
        })?,
        _ => geometric_center_index(image.dim()),
    };
    Ok(v.ijk_to_ras.transform_point(&index))
}

fn parent_to_world(scene: &Scene, node: NodeId) -> Result<Matrix> {
    match scene.parent_transform(node)? {
        Some(parent) => scene.matrix_transform_to_world(parent),
        None => Ok(Matrix::identity()),
    }
}

impl RegistrationEngine for MomentsEngine {
    fn register(&self, scene: &mut Scene, parameters: &RegistrationParameters) -> Result<()> {
        let mode = parameters.initialize_transform_mode;
        let to_parent = if mode == InitializeTransformMode::Off {
            Matrix::identity()
        } else {
            let fixed_world = parent_to_world(scene, parameters.fixed_volume)?
                .transform_point(&center_in_parent_space(scene, parameters.fixed_volume, mode)?);
            let moving_local = center_in_parent_space(scene, parameters.moving_volume, mode)?;

            // Express the fixed center in the output transform's parent space.
            let world_to_output_parent = parent_to_world(scene, parameters.output_transform)?
                .try_inverse()
                .ok_or(FlexCropError::SingularTransform)?;
            let target = world_to_output_parent.transform_point(&fixed_world);
            Translation3::from(target - moving_local).to_homogeneous()
        };

        if parameters.transform_model != Default::default() {
            warn!(
                "moments initializer ignores transform model {:?}",
                parameters.transform_model
            );
        }
        debug!("initial transform for {}: {to_parent}", parameters.output_transform);
        scene.transform_mut(parameters.output_transform)?.to_parent = to_parent;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_of_mass_of_single_voxel() {
        let mut image = Array3::zeros((4, 5, 6));
        image[[3, 1, 2]] = 5.0;
        let c = center_of_mass_index(&image).unwrap();
        assert_eq!(c, Point::new(2.0, 1.0, 3.0));
    }

    #[test]
    fn empty_image_has_no_center_of_mass() {
        assert!(center_of_mass_index(&Array3::zeros((2, 2, 2))).is_none());
    }

    #[test]
    fn geometric_center_is_mid_grid() {
        assert_eq!(geometric_center_index((3, 5, 9)), Point::new(4.0, 2.0, 1.0));
    }
}
