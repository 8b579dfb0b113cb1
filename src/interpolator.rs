use ndarray::ArrayView2;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Grid size that gives every axis the finest spacing of the volume.
    ///
    /// `spacing` is `(i, j, k)` and `original_dim` is `(depth, height, width)`;
    /// the result uses the same `(depth, height, width)` order.
    pub(crate) fn get_isotropic_dimensions(
        spacing: (f32, f32, f32),
        original_dim: (usize, usize, usize),
    ) -> (u32, u32, u32) {
        let (x_spacing, y_spacing, z_spacing) = spacing;
        let min_spacing = x_spacing.min(y_spacing).min(z_spacing);
        if !(min_spacing > 0.0) {
            return (
                original_dim.0 as u32,
                original_dim.1 as u32,
                original_dim.2 as u32,
            );
        }
        let scale = |count: usize, spacing: f32| (count as f32 * spacing / min_spacing).round() as u32;

        (
            scale(original_dim.0, z_spacing),
            scale(original_dim.1, y_spacing),
            scale(original_dim.2, x_spacing),
        )
    }

    #[inline]
    pub(crate) fn bilinear_interpolate(slice: &ArrayView2<f32>, y: f32, x: f32) -> f32 {
        let (height, width) = slice.dim();

        let y0 = y.floor() as usize;
        let x0 = x.floor() as usize;
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f32;
        let dx = x - x0 as f32;

        let top = slice[[y0, x0]].mul_add(1.0 - dx, slice[[y0, x1]] * dx);
        let bottom = slice[[y1, x0]].mul_add(1.0 - dx, slice[[y1, x1]] * dx);

        top.mul_add(1.0 - dy, bottom * dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn isotropic_dimensions_stretch_coarse_axes() {
        let dims = Interpolator::get_isotropic_dimensions((0.5, 0.5, 2.0), (10, 64, 64));
        assert_eq!(dims, (40, 64, 64));
    }

    #[test]
    fn zero_spacing_keeps_original_grid() {
        let dims = Interpolator::get_isotropic_dimensions((0.0, 1.0, 1.0), (3, 4, 5));
        assert_eq!(dims, (3, 4, 5));
    }

    #[test]
    fn bilinear_midpoint_is_mean_of_corners() {
        let slice = array![[0.0f32, 2.0], [4.0, 6.0]];
        let value = Interpolator::bilinear_interpolate(&slice.view(), 0.5, 0.5);
        assert!((value - 3.0).abs() < 1e-6);
    }
}
