//! Per-image failure type.
//!
//! Failures are converted into data at the per-image boundary of the batch, so
//! one broken upload never takes its siblings down with it.

use image::error::UnsupportedErrorKind;
use image::ImageError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// The bytes are not a recognized or parsable image, or decode to an empty raster
    #[error("invalid image file")]
    Decode,

    /// Anything else that went wrong while reading, resizing or encoding
    #[error("an error occurred: {0}")]
    Processing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    Decode,
    Processing,
}

impl ProcessError {
    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::Decode => ErrorKind::Decode,
            ProcessError::Processing(_) => ErrorKind::Processing,
        }
    }

    /// Whether the same input is guaranteed to fail the same way again
    pub fn is_deterministic(&self) -> bool {
        matches!(self, ProcessError::Decode)
    }
}

impl From<ImageError> for ProcessError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Decoding(_) => ProcessError::Decode,
            // unrecognized format; a known format with an unsupported color mode or feature is not
            ImageError::Unsupported(e) if matches!(e.kind(), UnsupportedErrorKind::Format(_)) => {
                ProcessError::Decode
            }
            other => ProcessError::Processing(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ProcessError {
    fn from(err: std::io::Error) -> Self {
        ProcessError::Processing(err.to_string())
    }
}

impl From<anyhow::Error> for ProcessError {
    fn from(err: anyhow::Error) -> Self {
        ProcessError::Processing(format!("{err:#}"))
    }
}
