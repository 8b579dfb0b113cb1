#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    Bilinear,
    #[default]
    None,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

/// Where the masked voxels are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MaskMode {
    /// Clone the input under a derived name and mask the clone.
    #[default]
    Clone,
    /// Rename the input and overwrite its voxels.
    InPlace,
}

/// Which side of the region receives the background value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlankRegion {
    #[default]
    Outside,
    Inside,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InitializeTransformMode {
    Off,
    UseGeometryAlign,
    #[default]
    UseMomentsAlign,
}

impl InitializeTransformMode {
    pub fn as_arg(&self) -> &'static str {
        match self {
            InitializeTransformMode::Off => "Off",
            InitializeTransformMode::UseGeometryAlign => "useGeometryAlign",
            InitializeTransformMode::UseMomentsAlign => "useMomentsAlign",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransformModel {
    #[default]
    Rigid,
    ScaleVersor3D,
    Affine,
}

impl TransformModel {
    pub fn as_flag(&self) -> &'static str {
        match self {
            TransformModel::Rigid => "--useRigid",
            TransformModel::ScaleVersor3D => "--useScaleVersor3D",
            TransformModel::Affine => "--useAffine",
        }
    }
}
