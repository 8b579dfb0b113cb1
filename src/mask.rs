//! Masking a volume by an oriented region.

use tracing::{debug, info, warn};

use crate::enums::{BlankRegion, MaskMode};
use crate::error::{FlexCropError, Result};
use crate::geometry::{Matrix, PlaneSet};
use crate::scene::{NodeId, Scene};
use crate::stencil::Stencil;

pub const MASKED_MARKER: &str = "masked";
pub const BACKGROUND_VALUE: f32 = 0.0;

/// Name for a masked output: `name` with `" masked"` appended unless it
/// already mentions "masked".
pub fn masked_name(name: &str) -> String {
    if name.contains(MASKED_MARKER) {
        name.to_string()
    } else {
        format!("{name} {MASKED_MARKER}")
    }
}

/// True when `volume` is a volume node carrying voxel data.
pub fn has_image_data(scene: &Scene, volume: NodeId) -> bool {
    match scene.volume(volume) {
        Ok(v) if v.image.is_some() => true,
        Ok(_) => {
            warn!("no image data in {volume}");
            false
        }
        Err(err) => {
            warn!("no volume node: {err}");
            false
        }
    }
}

/// Matrix mapping voxel indices of `volume` into the space in which the
/// planes of `region` are expressed.
pub fn index_to_region_matrix(scene: &Scene, volume: NodeId, region: NodeId) -> Result<Matrix> {
    let ijk_to_ras = scene.volume(volume)?.ijk_to_ras;
    let volume_parent = scene.parent_transform(volume)?;
    let region_parent = scene.parent_transform(region)?;

    let relative = match (region_parent, volume_parent) {
        (None, None) => Matrix::identity(),
        // Already in the right direction: volume parent space to world.
        (None, Some(volume_parent)) => scene.matrix_transform_to_world(volume_parent)?,
        (Some(region_parent), volume_parent) => scene
            .matrix_transform_to_node(Some(region_parent), volume_parent)?
            .try_inverse()
            .ok_or(FlexCropError::SingularTransform)?,
    };

    Ok(relative * ijk_to_ras)
}

/// The region's bounding planes expressed in the volume's voxel-index space.
pub fn region_planes_in_index_space(scene: &Scene, volume: NodeId, region: NodeId) -> Result<PlaneSet> {
    let index_to_region = index_to_region_matrix(scene, volume, region)?;
    Ok(scene.region(region)?.planes().pulled_back(&index_to_region))
}

/// Rasterize `region` over the voxel grid of `volume`.
pub fn region_stencil(scene: &Scene, volume: NodeId, region: NodeId) -> Result<Stencil> {
    let dim = scene
        .volume(volume)?
        .dim()
        .ok_or(FlexCropError::MissingImageData(volume))?;
    if scene.region(region)?.is_degenerate() {
        return Ok(Stencil::empty(dim));
    }
    let planes = region_planes_in_index_space(scene, volume, region)?;
    Ok(Stencil::from_planes(&planes, dim))
}

/// Mask one volume by `region`, returning the node that holds the result.
///
/// With [`MaskMode::Clone`] a new node named by [`masked_name`] is added to
/// the scene; with [`MaskMode::InPlace`] the input node is renamed and its
/// voxels overwritten.
pub fn mask_volume(
    scene: &mut Scene,
    volume: NodeId,
    region: NodeId,
    mode: MaskMode,
    blank: BlankRegion,
) -> Result<NodeId> {
    if !has_image_data(scene, volume) {
        scene.volume(volume)?;
        return Err(FlexCropError::MissingImageData(volume));
    }

    let stencil = region_stencil(scene, volume, region)?;
    debug!(
        "{} of {:?} voxels inside region {region}",
        stencil.count_inside(),
        stencil.dim()
    );

    let output_name = masked_name(scene.name(volume)?);
    let output = match mode {
        MaskMode::Clone => scene.clone_volume(volume, output_name.as_str())?,
        MaskMode::InPlace => {
            scene.set_name(volume, output_name.as_str())?;
            volume
        }
    };

    let image = scene
        .volume_mut(output)?
        .data_mut()
        .ok_or(FlexCropError::MissingImageData(output))?;
    stencil.apply(image, BACKGROUND_VALUE, blank);

    info!("wrote {output_name} ({output})");
    Ok(output)
}

/// Mask every volume in `volumes` by the same region.
pub fn run_masking(
    scene: &mut Scene,
    region: NodeId,
    volumes: &[NodeId],
    mode: MaskMode,
    blank: BlankRegion,
) -> Result<Vec<NodeId>> {
    info!("masking {} volume(s) with region {region}", volumes.len());
    volumes
        .iter()
        .map(|&volume| mask_volume(scene, volume, region, mode, blank))
        .collect()
}
