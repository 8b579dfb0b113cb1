use crate::{
    enums::SortBy,
    geometry::{Matrix, Vector, lps_to_ras},
    volume::Volume,
};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, Array3, s};
use rayon::prelude::*;
use std::{fs, path::Path};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),
}

/// Patient geometry of one slice, in LPS.
#[derive(Clone, Debug, PartialEq)]
struct SliceGeometry {
    position: Option<Vector>,
    row_direction: Vector,
    column_direction: Vector,
}

impl SliceGeometry {
    fn normal(&self) -> Vector {
        self.row_direction.cross(&self.column_direction)
    }

    /// Distance of the slice origin along the slice normal.
    fn position_along_normal(&self) -> Option<f64> {
        self.position.map(|position| position.dot(&self.normal()))
    }
}

struct Slice {
    order: Option<f64>,
    geometry: SliceGeometry,
    image: Array2<f32>,
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load a volume from DICOM objects
    ///
    /// The IJK→RAS matrix is derived from ImagePositionPatient,
    /// ImageOrientationPatient and PixelSpacing. When positions are missing
    /// the slice axis falls back to SliceThickness along the slice normal.
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found or dimensions are inconsistent
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let mut slices: Vec<Slice> = dicom_objects
            .par_iter()
            .filter_map(|dicom_object| Self::extract_slice(dicom_object, &sort_by))
            .collect();

        if slices.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::sort_slices(&mut slices, sort_by);
        Self::validate_dimensions(&slices)?;

        let spacing = Self::get_spacing(dicom_objects).ok_or(VolumeLoaderError::MissingSpacing)?;
        let ijk_to_ras = Self::build_ijk_to_ras(&slices, spacing);
        let volume_array = Self::build_volume_array(&slices);
        debug!("loaded {:?} voxels, spacing {:?}", volume_array.dim(), spacing);

        Ok(Volume::new(volume_array, ijk_to_ras))
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path> + Sync],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let objects: Result<Vec<_>, _> = paths
            .par_iter()
            .map(|path| open_file(path.as_ref()))
            .collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        info!("loading {} DICOM files from {}", paths.len(), path.as_ref().display());
        Self::load_from_file_paths(&paths, sort_by)
    }

    fn extract_slice(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Slice> {
        let geometry = Self::get_geometry(dicom_object);
        let order = Self::get_sort_order(dicom_object, &geometry, sort_by)?;
        let image = Self::decode_image(dicom_object)?;
        Some(Slice {
            order,
            geometry,
            image,
        })
    }

    /// Slices without an ImagePositionPatient are skipped when sorting by
    /// position. Positions are projected on the slice normal so sagittal and
    /// coronal series stack in physical order too.
    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        geometry: &SliceGeometry,
        sort_by: &SortBy,
    ) -> Option<Option<f64>> {
        match sort_by {
            SortBy::ImagePositionPatient => Some(Some(geometry.position_along_normal()?)),
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float64()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(f64::from);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    fn get_geometry(dicom_object: &FileDicomObject<InMemDicomObject>) -> SliceGeometry {
        let multi = |tag| {
            dicom_object
                .element(tag)
                .ok()
                .and_then(|element| element.to_multi_float64().ok())
        };
        let position = multi(tags::IMAGE_POSITION_PATIENT)
            .filter(|p| p.len() == 3)
            .map(|p| Vector::new(p[0], p[1], p[2]));
        let (row_direction, column_direction) = multi(tags::IMAGE_ORIENTATION_PATIENT)
            .filter(|o| o.len() == 6)
            .map(|o| {
                (
                    Vector::new(o[0], o[1], o[2]).normalize(),
                    Vector::new(o[3], o[4], o[5]).normalize(),
                )
            })
            .unwrap_or_else(|| (Vector::x(), Vector::y()));
        SliceGeometry {
            position,
            row_direction,
            column_direction,
        }
    }

    /// Modality LUT applied, VOI LUT left out so voxel values stay physical.
    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<f32>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::Identity);
        pixel_data
            .to_ndarray_with_options::<f32>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_slices(slices: &mut [Slice], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            slices.sort_by(|a, b| {
                a.order
                    .partial_cmp(&b.order)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }

    fn validate_dimensions(slices: &[Slice]) -> Result<(), VolumeLoaderError> {
        let first_dim = slices[0].image.dim();
        if slices.iter().any(|slice| slice.image.dim() != first_dim) {
            return Err(VolumeLoaderError::InconsistentDimensions);
        }
        Ok(())
    }

    /// Columns of the matrix are the i (along a row), j (down the columns)
    /// and k (slice to slice) steps, converted from LPS to RAS.
    fn build_ijk_to_ras(slices: &[Slice], spacing: (f64, f64, f64)) -> Matrix {
        let (column_spacing, row_spacing, thickness) = spacing;
        let first = &slices[0].geometry;
        let normal = first.normal();

        let slice_step = match (first.position, slices.last().and_then(|s| s.geometry.position)) {
            (Some(a), Some(b)) if slices.len() > 1 && (b - a).norm() > f64::EPSILON => {
                (b - a) / (slices.len() - 1) as f64
            }
            _ => normal * thickness,
        };

        let mut ijk_to_lps = Matrix::identity();
        ijk_to_lps
            .fixed_view_mut::<3, 1>(0, 0)
            .copy_from(&(first.row_direction * column_spacing));
        ijk_to_lps
            .fixed_view_mut::<3, 1>(0, 1)
            .copy_from(&(first.column_direction * row_spacing));
        ijk_to_lps.fixed_view_mut::<3, 1>(0, 2).copy_from(&slice_step);
        ijk_to_lps
            .fixed_view_mut::<3, 1>(0, 3)
            .copy_from(&first.position.unwrap_or_else(Vector::zeros));

        lps_to_ras() * ijk_to_lps
    }

    fn build_volume_array(slices: &[Slice]) -> Array3<f32> {
        let (height, width) = slices[0].image.dim();
        let depth = slices.len();
        let mut volume = Array3::<f32>::zeros((depth, height, width));

        for (i, slice) in slices.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(&slice.image);
        }

        volume
    }

    /// `(column spacing, row spacing, slice thickness)`
    fn get_spacing(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
    ) -> Option<(f64, f64, f64)> {
        dicom_objects.iter().find_map(|dicom_object| {
            let pixel_spacing = dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()?
                .to_multi_float64()
                .ok()?;

            let slice_thickness = dicom_object
                .element(tags::SLICE_THICKNESS)
                .ok()
                .and_then(|element| element.to_float64().ok())
                .unwrap_or(1.0);

            // PixelSpacing is (row spacing, column spacing)
            Some((*pixel_spacing.get(1)?, *pixel_spacing.first()?, slice_thickness))
        })
    }
}
