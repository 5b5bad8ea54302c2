//! Error types for meshbridge

use thiserror::Error;

/// Main error type for meshbridge operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Unsupported interaction mode: {0}")]
    UnsupportedMode(String),

    #[error("Face {face} has {vertex_count} vertices, expected 3")]
    NonTriangularFace { face: usize, vertex_count: usize },

    #[error("Geometry engine failure: {0}")]
    EngineFailure(String),

    #[error("Malformed result: {0}")]
    MalformedResult(String),

    #[error("Object replacement failed: {0}")]
    ReplacementFailure(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discriminant of [`Error`], for callers that branch on the failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidSelection,
    UnsupportedMode,
    NonTriangularFace,
    EngineFailure,
    MalformedResult,
    ReplacementFailure,
    InvalidParameter,
    InvalidData,
    UnsupportedFormat,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidSelection(_) => ErrorKind::InvalidSelection,
            Error::UnsupportedMode(_) => ErrorKind::UnsupportedMode,
            Error::NonTriangularFace { .. } => ErrorKind::NonTriangularFace,
            Error::EngineFailure(_) => ErrorKind::EngineFailure,
            Error::MalformedResult(_) => ErrorKind::MalformedResult,
            Error::ReplacementFailure(_) => ErrorKind::ReplacementFailure,
            Error::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Error::InvalidData(_) => ErrorKind::InvalidData,
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result type alias for meshbridge operations
pub type Result<T> = std::result::Result<T, Error>;
