use thiserror::Error;

use crate::scene::NodeId;

#[derive(Debug, Error)]
pub enum FlexCropError {
    #[error("Node {0} not found in scene")]
    NodeNotFound(NodeId),

    #[error("Node {id} is not a {expected} node")]
    WrongNodeKind { id: NodeId, expected: &'static str },

    #[error("Volume {0} has no image data")]
    MissingImageData(NodeId),

    #[error("Transform matrix is not invertible")]
    SingularTransform,

    #[error("Transform hierarchy contains a cycle through {0}")]
    TransformCycle(NodeId),

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Invalid transform file: {0}")]
    InvalidTransformFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FlexCropError>;
