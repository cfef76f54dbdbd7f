//! Error types for dominant color extraction.

use thiserror::Error;

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Top-level error returned by the extractor.
///
/// Exactly two kinds cross the crate boundary: a rejected input, which the
/// caller should report as unprocessable, and an internal failure, which the
/// caller should report as a generic server-side error.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The input could not be turned into colors. Retrying with the same
    /// bytes reproduces the same error.
    #[error(transparent)]
    ImageProcessing(#[from] ImageProcessingError),

    /// Unexpected failure not attributable to the input shape.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Reasons an input buffer is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageProcessingError {
    #[error("number of colors must be between 1 and {max}, got {requested}")]
    InvalidColorCount { requested: usize, max: usize },

    #[error("unsupported or unrecognized image format")]
    UnsupportedFormat,

    #[error("image is too large to process: {width}x{height} exceeds {max_pixels} pixels")]
    TooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    #[error("image exceeds decoding limits: {0}")]
    LimitExceeded(String),

    #[error("image has no pixels")]
    Empty,

    #[error("unable to decode image: {0}")]
    Decode(String),
}

/// Failures inside the clustering step. Always internal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("no pixels to cluster")]
    EmptyInput,

    #[error("clustering produced a non-finite centroid at index {index}")]
    NonFinite { index: usize },

    #[error("clustering produced {got} centroids, expected {expected}")]
    CentroidCount { expected: usize, got: usize },
}

impl From<ClusterError> for ExtractError {
    fn from(err: ClusterError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl ExtractError {
    /// Whether the caller should treat this as a bad-input response.
    pub fn is_input_error(&self) -> bool {
        matches!(self, ExtractError::ImageProcessing(_))
    }

    /// Message safe to hand to an untrusted peer.
    ///
    /// Input errors are descriptive; internal details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            ExtractError::ImageProcessing(err) => err.to_string(),
            ExtractError::Internal(_) => "internal error while processing the image".to_string(),
        }
    }
}
