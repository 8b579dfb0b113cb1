use crate::geometry::Matrix;

/// Linear transform node payload. `to_parent` maps the coordinates of
/// nodes nested under this transform into the transform's own parent space.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearTransform {
    pub to_parent: Matrix,
}

impl Default for LinearTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl LinearTransform {
    pub fn new(to_parent: Matrix) -> Self {
        Self { to_parent }
    }

    pub fn identity() -> Self {
        Self {
            to_parent: Matrix::identity(),
        }
    }
}
