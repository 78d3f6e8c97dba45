//! Template-layer errors: workspace materialization, step construction
//! and the pipeline seam checks. Mapped onto `JobError::TemplateMalformed`
//! / `StepInvariantViolated` at the coordinator boundary.

use docgen_core::JobError;
use thiserror::Error;

pub type TemplateResult<T> = Result<T, TemplateError>;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("I/O error materializing workspace: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown step name: {name}")]
    UnknownStep { name: String },

    #[error("step {name} is missing required option {option}")]
    MissingOption { name: String, option: String },

    #[error("step {name} option {option} has an unsupported value: {value}")]
    InvalidOption {
        name: String,
        option: String,
        value: String,
    },

    #[error("format has no steps")]
    EmptyFormat,

    #[error("step at position {position} ({name}) was invoked as a producer but is a transformer")]
    ProducerExpected { position: usize, name: String },

    #[error("step at position {position} ({name}) was invoked as a transformer but is a producer")]
    TransformerExpected { position: usize, name: String },

    #[error(
        "step at position {position} ({name}) expects input format {expected} but received {actual}"
    )]
    FormatMismatch {
        position: usize,
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("template render error: {0}")]
    Render(String),

    #[error(transparent)]
    Convert(#[from] docgen_convert::ConvertError),

    #[error(transparent)]
    Storage(#[from] docgen_storage::StorageError),
}

impl TemplateError {
    /// Whether this failure belongs to the `StepInvariantViolated` taxonomy
    /// entry rather than `TemplateMalformed`.
    fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            TemplateError::ProducerExpected { .. }
                | TemplateError::TransformerExpected { .. }
                | TemplateError::FormatMismatch { .. }
        )
    }
}

impl From<TemplateError> for JobError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::Convert(e) => e.into(),
            other if other.is_invariant_violation() => {
                JobError::step_invariant_violated(other.to_string())
            }
            other => JobError::template_malformed(other.to_string()),
        }
    }
}
