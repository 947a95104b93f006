use thiserror::Error;

#[derive(Error, Debug)]
pub enum MocorrError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid MRC file: {0}")]
    InvalidMrc(String),

    #[error("Invalid movie manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Movie already contains a frame with time stamp {time_stamp}")]
    DuplicateTimeStamp { time_stamp: f64 },

    #[error("Frame shape {actual:?} does not match movie shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Empty frame sequence")]
    EmptySequence,

    #[error("Deformation model has not been fitted or randomized")]
    ModelNotFitted,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, MocorrError>;
