//! # flex-crop
//!
//! Crop medical volumes with an arbitrarily oriented box and register
//! volumes onto each other.
//!
//! Volumes, regions and linear transforms live as named nodes in a
//! [`Scene`](scene::Scene). Every node may be nested under a transform, and
//! the masking operation composes these transforms so the region's six
//! bounding planes land in the voxel-index space of each volume:
//!  - voxels outside the box are set to 0 (or, reversed, the ones inside)
//!  - the result is written to a clone named `"<name> masked"` or in place
//!
//! Registration creates (or reuses) a transform named
//! `"<moving> ---TO--- <target>"`, nests the moving volume under it and hands
//! a rigid, moments-initialized parameter set to a
//! [`RegistrationEngine`](registration::RegistrationEngine): either an
//! external BRAINSFit executable or the in-process moments initializer.
//!
//! Volumes can be loaded from a directory of DICOM slices. Stencils are
//! rasterized in parallel using rayon.
//!
//! # Examples
//!
//! ## Masking a DICOM series
//!
//! ```no_run
//! # use flex_crop::{enums::{BlankRegion, MaskMode, SortBy}, geometry::{Point, Vector}};
//! # use flex_crop::{mask::mask_volume, region::Region, scene::Scene, volume_loader::VolumeLoader};
//! let mut scene = Scene::new();
//! let volume = VolumeLoader::load_from_directory("dicom", SortBy::ImagePositionPatient)
//!     .expect("should have loaded files from directory");
//! let volume = scene.add_volume("CT", volume);
//! let region = scene.add_region(
//!     "ROI",
//!     Region::new(Point::new(0.0, 0.0, 0.0), Vector::new(40.0, 40.0, 40.0)),
//! );
//! let masked = mask_volume(&mut scene, volume, region, MaskMode::Clone, BlankRegion::Outside)
//!     .expect("should have masked the volume");
//! assert_eq!(scene.name(masked).unwrap(), "CT masked");
//! ```

pub mod brainsfit;
pub mod cleanup;
pub mod enums;
pub mod error;
pub mod geometry;
mod interpolator;
pub mod itk_transform;
pub mod mask;
pub mod moments;
pub mod nrrd;
pub mod panel;
pub mod region;
pub mod registration;
pub mod scene;
pub mod stencil;
pub mod transform;
pub mod volume;
pub mod volume_loader;
