//! Converter-level errors; mapped to `JobError::ConverterFailed` at the
//! pipeline seam.

use docgen_core::JobError;
use thiserror::Error;

pub type ConvertResult<T> = Result<T, ConvertError>;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("failed to spawn {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{executable} timed out after {timeout_secs}s")]
    Timeout {
        executable: String,
        timeout_secs: u64,
    },

    #[error("{executable} exited with code {code:?}: {stderr}")]
    NonZeroExit {
        executable: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("rdf conversion failed: {detail}")]
    Rdf { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ConvertError> for JobError {
    fn from(e: ConvertError) -> Self {
        JobError::converter_failed(e.to_string())
    }
}
