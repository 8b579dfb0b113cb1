//! Homogeneous matrices and plane sets used to carry a region into the
//! voxel-index space of a volume.

use nalgebra::{Matrix4, Point3, Vector3, Vector4};

pub type Matrix = Matrix4<f64>;
pub type Point = Point3<f64>;
pub type Vector = Vector3<f64>;

/// Flip between LPS and RAS patient coordinates.
pub fn lps_to_ras() -> Matrix {
    Matrix::from_diagonal(&Vector4::new(-1.0, -1.0, 1.0, 1.0))
}

/// Plane stored as `(a, b, c, d)` with `a*x + b*y + c*z + d = 0`.
///
/// The normal points outward, so points with a negative value are on the
/// inner side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    coefficients: Vector4<f64>,
}

impl Plane {
    pub fn from_point_normal(origin: &Point, normal: &Vector) -> Self {
        let d = -normal.dot(&origin.coords);
        Self {
            coefficients: Vector4::new(normal.x, normal.y, normal.z, d),
        }
    }

    pub fn coefficients(&self) -> &Vector4<f64> {
        &self.coefficients
    }

    #[inline]
    pub fn evaluate(&self, point: &Point) -> f64 {
        self.coefficients.dot(&point.to_homogeneous())
    }

    /// Pull the plane back through `point_transform`.
    ///
    /// If `point_transform` maps a space A into the plane's space, the result
    /// is the same plane expressed in A: `result.evaluate(p)` equals
    /// `self.evaluate(point_transform * p)`. No inversion is needed.
    pub fn pulled_back(&self, point_transform: &Matrix) -> Self {
        Self {
            coefficients: point_transform.transpose() * self.coefficients,
        }
    }
}

/// Intersection of half-spaces, evaluated like an implicit function: the
/// value is the maximum over all planes, so `<= 0` means inside.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaneSet {
    planes: Vec<Plane>,
}

impl PlaneSet {
    pub fn new(planes: Vec<Plane>) -> Self {
        Self { planes }
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    #[inline]
    pub fn contains(&self, point: &Point) -> bool {
        self.planes.iter().all(|plane| plane.evaluate(point) <= 0.0)
    }

    pub fn pulled_back(&self, point_transform: &Matrix) -> Self {
        Self {
            planes: self
                .planes
                .iter()
                .map(|plane| plane.pulled_back(point_transform))
                .collect(),
        }
    }
}

/// Column norms of the upper 3x3 block, i.e. voxel spacing of an IJK→RAS
/// matrix along (i, j, k).
pub fn spacing_of(ijk_to_ras: &Matrix) -> (f64, f64, f64) {
    let block = ijk_to_ras.fixed_view::<3, 3>(0, 0);
    (
        block.column(0).norm(),
        block.column(1).norm(),
        block.column(2).norm(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Rotation3, Translation3};

    #[test]
    fn pulled_back_plane_agrees_with_transformed_points() {
        let plane = Plane::from_point_normal(&Point::new(1.0, 2.0, 3.0), &Vector::new(0.0, 0.0, 1.0));
        let transform = Translation3::new(5.0, -2.0, 4.0).to_homogeneous()
            * Rotation3::from_euler_angles(0.3, -0.2, 1.1).to_homogeneous();
        let pulled = plane.pulled_back(&transform);

        for p in [Point::new(0.0, 0.0, 0.0), Point::new(-3.0, 7.5, 2.0), Point::new(10.0, 1.0, -4.0)] {
            let moved = transform.transform_point(&p);
            assert!((pulled.evaluate(&p) - plane.evaluate(&moved)).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_plane_set_contains_everything() {
        let set = PlaneSet::default();
        assert!(set.contains(&Point::new(1e6, -1e6, 0.0)));
    }

    #[test]
    fn spacing_reads_column_norms() {
        let m = Matrix::new(
            0.0, 2.0, 0.0, 1.0,
            -0.5, 0.0, 0.0, 2.0,
            0.0, 0.0, 3.0, 3.0,
            0.0, 0.0, 0.0, 1.0,
        );
        assert_eq!(spacing_of(&m), (0.5, 2.0, 3.0));
    }
}
