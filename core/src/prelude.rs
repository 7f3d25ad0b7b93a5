pub use crate::store::{GeoPoint, NestedPathStore, Value};
pub use crate::waveform::Waveform;

/// Common error type for store access, waveform assembly and stage execution.
#[derive(thiserror::Error, Debug)]
pub enum NmbimError {
    #[error("invalid path '{0}'")]
    InvalidPath(String),
    #[error("path '{0}' not found")]
    PathNotFound(String),
    #[error("data already present at '{0}'; overwrite not requested")]
    PathExists(String),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("read-only violation: {0}")]
    ReadOnlyViolation(String),
    #[error("shot {shot_number} is not aligned across products: {detail}")]
    ShotAlignment { shot_number: i64, detail: String },
    #[error("shot numbers differ across products for beam {beam}: {detail}")]
    ShotNumberMismatch { beam: String, detail: String },
    #[error("malformed source: {0}")]
    MalformedSource(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("stage '{stage}' failed on shot {shot_number}: {source}")]
    Processing {
        stage: String,
        shot_number: i64,
        #[source]
        source: Box<NmbimError>,
    },
}

pub type NmbimResult<T> = Result<T, NmbimError>;
