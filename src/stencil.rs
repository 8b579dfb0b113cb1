//! Binary voxel masks rasterized from plane sets.

use ndarray::{Array3, Zip};

use crate::enums::BlankRegion;
use crate::geometry::{PlaneSet, Point};

/// Per-voxel inside/outside flags, indexed `[k, j, i]` like the image.
#[derive(Clone, Debug, PartialEq)]
pub struct Stencil {
    inside: Array3<bool>,
}

impl Stencil {
    /// Rasterize `planes`, which must already be expressed in voxel-index
    /// space. Voxel `(i, j, k)` is sampled at its integer index.
    pub fn from_planes(planes: &PlaneSet, dim: (usize, usize, usize)) -> Self {
        let mut inside = Array3::from_elem(dim, false);
        Zip::indexed(&mut inside).par_for_each(|(k, j, i), flag| {
            *flag = planes.contains(&Point::new(i as f64, j as f64, k as f64));
        });
        Self { inside }
    }

    pub fn empty(dim: (usize, usize, usize)) -> Self {
        Self {
            inside: Array3::from_elem(dim, false),
        }
    }

    pub fn dim(&self) -> (usize, usize, usize) {
        self.inside.dim()
    }

    pub fn is_inside(&self, i: usize, j: usize, k: usize) -> bool {
        self.inside.get((k, j, i)).copied().unwrap_or(false)
    }

    pub fn count_inside(&self) -> usize {
        self.inside.iter().filter(|flag| **flag).count()
    }

    /// Write `background` into every voxel on the `blank` side of the
    /// stencil and leave the others unchanged.
    ///
    /// `image` must have the stencil's dimensions.
    pub fn apply(&self, image: &mut Array3<f32>, background: f32, blank: BlankRegion) {
        debug_assert_eq!(image.dim(), self.inside.dim());
        let blank_inside = matches!(blank, BlankRegion::Inside);
        Zip::from(image)
            .and(&self.inside)
            .par_for_each(|value, &inside| {
                if inside == blank_inside {
                    *value = background;
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector;
    use crate::region::Region;

    #[test]
    fn rasterizes_box_inclusively() {
        let region = Region::new(Point::new(2.0, 2.0, 2.0), Vector::new(1.0, 1.0, 1.0));
        let stencil = Stencil::from_planes(&region.planes(), (5, 5, 5));
        assert_eq!(stencil.count_inside(), 27);
        assert!(stencil.is_inside(1, 3, 2));
        assert!(!stencil.is_inside(0, 2, 2));
        assert!(!stencil.is_inside(9, 9, 9));
    }

    #[test]
    fn apply_honours_polarity() {
        let region = Region::new(Point::new(0.0, 0.0, 0.0), Vector::new(0.5, 0.5, 0.5));
        let stencil = Stencil::from_planes(&region.planes(), (1, 1, 2));

        let mut keep_inside = Array3::from_elem((1, 1, 2), 7.0f32);
        stencil.apply(&mut keep_inside, 0.0, BlankRegion::Outside);
        assert_eq!(keep_inside.as_slice().unwrap(), &[7.0, 0.0]);

        let mut keep_outside = Array3::from_elem((1, 1, 2), 7.0f32);
        stencil.apply(&mut keep_outside, -1.0, BlankRegion::Inside);
        assert_eq!(keep_outside.as_slice().unwrap(), &[-1.0, 7.0]);
    }
}
