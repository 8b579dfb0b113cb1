use crate::enums::Interpolation;
use crate::enums::Orientation;
use crate::geometry::{Matrix, spacing_of};
use crate::interpolator::Interpolator;

use image::ImageBuffer;
use image::Luma;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::s;
use rayon::prelude::*;

/// Voxel payload of a volume node.
///
/// `image` is indexed `[k, j, i]` (depth, height, width) and may be absent
/// while a node is still being populated.
#[derive(Clone, Debug)]
pub struct Volume {
    pub image: Option<Array3<f32>>,
    pub ijk_to_ras: Matrix,
}

impl Default for Volume {
    fn default() -> Self {
        Self {
            image: None,
            ijk_to_ras: Matrix::identity(),
        }
    }
}

impl Volume {
    pub fn new(image: Array3<f32>, ijk_to_ras: Matrix) -> Self {
        Self {
            image: Some(image),
            ijk_to_ras,
        }
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> Option<(usize, usize, usize)> {
        self.image.as_ref().map(|image| image.dim())
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> Option<&Array3<f32>> {
        self.image.as_ref()
    }

    /// Get a mutable reference to the underlying data
    pub fn data_mut(&mut self) -> Option<&mut Array3<f32>> {
        self.image.as_mut()
    }

    pub fn spacing(&self) -> (f64, f64, f64) {
        spacing_of(&self.ijk_to_ras)
    }

    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: &Orientation,
    ) -> Option<ArrayView2<'_, f32>> {
        let data = self.data()?;
        let slice_result = match orientation {
            Orientation::Axial => data.slice(s![index, .., ..]),
            Orientation::Coronal => data.slice(s![.., index, ..]),
            Orientation::Sagittal => data.slice(s![.., .., index]),
        };
        Some(slice_result)
    }

    /// Render a slice as an 8-bit image, windowed to the volume's value range.
    pub fn get_image_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
        interpolation: Interpolation,
    ) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        if !self.is_valid_index(index, &orientation) {
            return None;
        }
        let slice = self.get_slice_from_axis(index, &orientation)?;
        let window = self.value_range()?;

        match interpolation {
            Interpolation::None => Self::slice_to_image(&slice, window),
            Interpolation::Bilinear => {
                // In-plane voxels are square for axial slices of DICOM series
                if matches!(orientation, Orientation::Axial) {
                    return Self::slice_to_image(&slice, window);
                }
                let (width, height) = self.get_output_dimensions(&orientation)?;
                Self::interpolate_slice(&slice, width, height, window)
            }
        }
    }

    fn value_range(&self) -> Option<(f32, f32)> {
        let data = self.data()?;
        let (min, max) = data
            .par_iter()
            .fold(
                || (f32::INFINITY, f32::NEG_INFINITY),
                |(lo, hi), &v| (lo.min(v), hi.max(v)),
            )
            .reduce(
                || (f32::INFINITY, f32::NEG_INFINITY),
                |(a, b), (c, d)| (a.min(c), b.max(d)),
            );
        Some((min, max))
    }

    #[inline]
    fn normalize_to_u8(value: f32, (min, max): (f32, f32)) -> u8 {
        if max <= min {
            return 0;
        }
        (((value - min) / (max - min)) * 255.0).clamp(0.0, 255.0) as u8
    }

    fn get_output_dimensions(&self, orientation: &Orientation) -> Option<(u32, u32)> {
        let (sx, sy, sz) = self.spacing();
        let interpolated_dim = Interpolator::get_isotropic_dimensions(
            (sx as f32, sy as f32, sz as f32),
            self.dim()?,
        );
        // Always return (width, height) - standard image convention
        let dims = match orientation {
            Orientation::Axial => (interpolated_dim.2, interpolated_dim.1),
            Orientation::Coronal => (interpolated_dim.2, interpolated_dim.0),
            Orientation::Sagittal => (interpolated_dim.1, interpolated_dim.0),
        };
        Some(dims)
    }

    fn slice_to_image(
        slice: &ArrayView2<'_, f32>,
        window: (f32, f32),
    ) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let (height, width) = slice.dim();
        let pixel_data: Vec<u8> = slice
            .into_par_iter()
            .map(|&v| Self::normalize_to_u8(v, window))
            .collect();
        ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
    }

    fn interpolate_slice(
        slice: &ArrayView2<'_, f32>,
        width: u32,
        height: u32,
        window: (f32, f32),
    ) -> Option<ImageBuffer<Luma<u8>, Vec<u8>>> {
        let (slice_height, slice_width) = slice.dim();
        if width == 0 || height == 0 || slice_width == 0 || slice_height == 0 {
            return None;
        }

        let pixel_data: Vec<u8> = (0..height)
            .into_par_iter()
            .flat_map(|y| {
                (0..width)
                    .map(|x| {
                        let norm_x = (x as f32 + 0.5) / width as f32;
                        let norm_y = (y as f32 + 0.5) / height as f32;

                        let src_x = norm_x * slice_width as f32 - 0.5;
                        let src_y = norm_y * slice_height as f32 - 0.5;

                        let src_x = src_x.max(0.0).min((slice_width - 1) as f32);
                        let src_y = src_y.max(0.0).min((slice_height - 1) as f32);

                        let value = Interpolator::bilinear_interpolate(slice, src_y, src_x);
                        Self::normalize_to_u8(value, window)
                    })
                    .collect::<Vec<u8>>()
            })
            .collect();

        ImageBuffer::from_raw(width, height, pixel_data)
    }

    fn is_valid_index(&self, index: usize, orientation: &Orientation) -> bool {
        let Some(dim) = self.dim() else {
            return false;
        };
        let max_index = match orientation {
            Orientation::Axial => dim.0,
            Orientation::Coronal => dim.1,
            Orientation::Sagittal => dim.2,
        };
        index < max_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(dim: (usize, usize, usize)) -> Volume {
        let image = Array3::from_shape_fn(dim, |(k, j, i)| (k * 100 + j * 10 + i) as f32);
        Volume::new(image, Matrix::identity())
    }

    #[test]
    fn slices_follow_axis_layout() {
        let volume = ramp((3, 4, 5));
        let axial = volume.get_slice_from_axis(2, &Orientation::Axial).unwrap();
        assert_eq!(axial.dim(), (4, 5));
        assert_eq!(axial[[1, 3]], 213.0);
        let sagittal = volume.get_slice_from_axis(4, &Orientation::Sagittal).unwrap();
        assert_eq!(sagittal.dim(), (3, 4));
        assert_eq!(sagittal[[2, 3]], 234.0);
    }

    #[test]
    fn out_of_range_slice_has_no_image() {
        let volume = ramp((3, 4, 5));
        assert!(
            volume
                .get_image_from_axis(3, Orientation::Axial, Interpolation::None)
                .is_none()
        );
        assert!(
            Volume::default()
                .get_image_from_axis(0, Orientation::Axial, Interpolation::None)
                .is_none()
        );
    }

    #[test]
    fn image_is_windowed_to_value_range() {
        let volume = ramp((2, 2, 2));
        let image = volume
            .get_image_from_axis(1, Orientation::Axial, Interpolation::None)
            .unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(1, 1)[0], 255);
        let first = volume
            .get_image_from_axis(0, Orientation::Axial, Interpolation::None)
            .unwrap();
        assert_eq!(first.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn bilinear_stretches_thick_slices() {
        let mut volume = ramp((4, 8, 8));
        volume.ijk_to_ras[(2, 2)] = 2.0;
        let image = volume
            .get_image_from_axis(0, Orientation::Coronal, Interpolation::Bilinear)
            .unwrap();
        assert_eq!(image.dimensions(), (8, 8));
    }
}
