use nalgebra::Rotation3;

use crate::geometry::{Plane, PlaneSet, Point, Vector};

/// Oriented box region of interest.
///
/// `center` and `axes` are expressed in the coordinate space of the node's
/// parent transform (world when there is none). `radius` holds the half
/// extent along each box axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub center: Point,
    pub radius: Vector,
    pub axes: Rotation3<f64>,
}

impl Region {
    pub fn new(center: Point, radius: Vector) -> Self {
        Self {
            center,
            radius,
            axes: Rotation3::identity(),
        }
    }

    pub fn with_axes(mut self, axes: Rotation3<f64>) -> Self {
        self.axes = axes;
        self
    }

    /// Axis-aligned region spanning `min..=max`.
    pub fn from_bounds(min: Point, max: Point) -> Self {
        let center = nalgebra::center(&min, &max);
        Self::new(center, (max - min) / 2.0)
    }

    /// A region encloses no volume when any half extent is not positive.
    pub fn is_degenerate(&self) -> bool {
        self.radius.iter().any(|r| r.is_nan() || *r <= 0.0)
    }

    /// The six bounding planes, normals pointing out of the box.
    pub fn planes(&self) -> PlaneSet {
        let matrix = self.axes.matrix();
        let planes = (0..3)
            .flat_map(|axis| {
                let direction: Vector = matrix.column(axis).into_owned();
                let offset = direction * self.radius[axis];
                [
                    Plane::from_point_normal(&(self.center + offset), &direction),
                    Plane::from_point_normal(&(self.center - offset), &-direction),
                ]
            })
            .collect();
        PlaneSet::new(planes)
    }
}
