//! Error types for volume processing operations

use crate::types::VolumeShape;
use thiserror::Error;

/// Main error type for volume operations
#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("Invalid simulation parameters: {0}")]
    InvalidInput(String),

    #[error("Invalid indices: c={channel}, z={depth} for shape {shape}")]
    OutOfRange {
        channel: usize,
        depth: usize,
        shape: VolumeShape,
    },

    #[error("Simulation failed: {0}")]
    ProcessingFailure(String),

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Image encoding error: {0}")]
    ImageEncoding(String),
}

/// Condition kinds a caller can branch on without parsing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    /// The request was malformed
    InvalidInput,
    /// A slice index exceeds the current volume shape
    OutOfRange,
    /// Valid input could not be processed
    ProcessingFailure,
}

impl ConditionKind {
    /// Whether the condition is attributable to the caller
    pub fn is_client_error(&self) -> bool {
        matches!(self, ConditionKind::InvalidInput | ConditionKind::OutOfRange)
    }
}

impl VolumeError {
    /// Stable condition kind of this error
    pub fn kind(&self) -> ConditionKind {
        match self {
            VolumeError::InvalidInput(_) => ConditionKind::InvalidInput,
            VolumeError::OutOfRange { .. } => ConditionKind::OutOfRange,
            VolumeError::ProcessingFailure(_)
            | VolumeError::InvalidDimensions(_)
            | VolumeError::Serialization(_)
            | VolumeError::ImageEncoding(_) => ConditionKind::ProcessingFailure,
        }
    }

    /// Re-tag as a processing failure, keeping the original text
    pub fn into_processing_failure(self) -> Self {
        match self {
            VolumeError::ProcessingFailure(_) => self,
            err => VolumeError::ProcessingFailure(err.to_string()),
        }
    }
}

/// Specialized Result type for volume operations
pub type Result<T> = std::result::Result<T, VolumeError>;

impl From<serde_json::Error> for VolumeError {
    fn from(err: serde_json::Error) -> Self {
        VolumeError::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for VolumeError {
    fn from(err: image::ImageError) -> Self {
        VolumeError::ImageEncoding(err.to_string())
    }
}
