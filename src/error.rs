use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Initialization,
    Validation,
    NotFound,
    TransientStore,
}

#[derive(Debug, Error, Diagnostic)]
pub enum SliceError {
    #[error("metadata arrays do not match matrix shape: {0}")]
    ShapeMismatch(String),

    #[error("invalid utf-8 in {field} metadata at entry {index}")]
    MetadataDecode { field: &'static str, index: usize },

    #[error("failed to open matrix store: {0}")]
    MatrixOpen(String),

    #[error("failed to load dataset: {0}")]
    DatasetLoad(String),

    #[error("max {max} samples can be processed at a time, got {got}")]
    TooManySamples { got: usize, max: usize },

    #[error("no genes provided found in the dataset")]
    NoGenesMatched,

    #[error("no samples provided found in the dataset")]
    NoSamplesMatched,

    #[error("series_id not found: {0}")]
    SeriesNotFound(String),

    #[error("query resulted in empty result set")]
    EmptyWindow,

    #[error("matrix read failed: {0}")]
    StoreRead(String),

    #[error("stream write failed: {0}")]
    StreamWrite(String),
}

impl SliceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SliceError::ShapeMismatch(_)
            | SliceError::MetadataDecode { .. }
            | SliceError::MatrixOpen(_)
            | SliceError::DatasetLoad(_) => ErrorKind::Initialization,
            SliceError::TooManySamples { .. } => ErrorKind::Validation,
            SliceError::NoGenesMatched
            | SliceError::NoSamplesMatched
            | SliceError::SeriesNotFound(_)
            | SliceError::EmptyWindow => ErrorKind::NotFound,
            SliceError::StoreRead(_) | SliceError::StreamWrite(_) => ErrorKind::TransientStore,
        }
    }
}
