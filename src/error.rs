use thiserror::Error;

/// Errors produced by the image-to-classification pipeline.
///
/// `Decode` is the only failure a well-behaved caller can trigger; the
/// shape/type variants indicate a wiring bug between the normalizer and the
/// predictor and are fatal to the request. All variants propagate unmodified.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("image decode")]
    Decode(#[source] image::ImageError),

    #[error("invalid input shape: expected {expected:?}, got {actual:?}")]
    InvalidShape {
        expected: [usize; 4],
        actual: Vec<usize>,
    },

    #[error("invalid input type: {message}")]
    InvalidType { message: String },

    #[error("inference")]
    Inference(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("io")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn inference(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        PipelineError::Inference(source.into())
    }
}
