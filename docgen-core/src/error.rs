//! The job-level error taxonomy.
//!
//! Infrastructure crates raise their own narrower error types; the
//! coordinator maps those into a `JobError` at the boundary, the same way
//! the worker this was distilled from wrapped every step so a low-level
//! exception became a structured job exception carrying both a detailed
//! log message and a concise, user-facing one.

use thiserror::Error;

pub type JobResult<T> = Result<T, JobError>;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("configuration missing: {path}")]
    ConfigMissing { path: String },

    #[error("dependency unavailable: {detail}")]
    Unavailable { detail: String },

    #[error("document not found: {uuid}")]
    JobNotFound { uuid: String },

    #[error("document already finished: {uuid}")]
    AlreadyFinished { uuid: String },

    #[error("template malformed: {detail}")]
    TemplateMalformed { detail: String },

    #[error("step invariant violated: {detail}")]
    StepInvariantViolated { detail: String },

    #[error("converter failed: {detail}")]
    ConverterFailed { detail: String },

    #[error("limit exceeded: {detail}")]
    LimitExceeded { detail: String },

    #[error("unexpected error: {detail}")]
    Unexpected { detail: String },
}

impl JobError {
    pub fn config_missing(path: impl Into<String>) -> Self {
        Self::ConfigMissing { path: path.into() }
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::Unavailable {
            detail: detail.into(),
        }
    }

    pub fn job_not_found(uuid: impl Into<String>) -> Self {
        Self::JobNotFound { uuid: uuid.into() }
    }

    pub fn already_finished(uuid: impl Into<String>) -> Self {
        Self::AlreadyFinished { uuid: uuid.into() }
    }

    pub fn template_malformed(detail: impl Into<String>) -> Self {
        Self::TemplateMalformed {
            detail: detail.into(),
        }
    }

    pub fn step_invariant_violated(detail: impl Into<String>) -> Self {
        Self::StepInvariantViolated {
            detail: detail.into(),
        }
    }

    pub fn converter_failed(detail: impl Into<String>) -> Self {
        Self::ConverterFailed {
            detail: detail.into(),
        }
    }

    pub fn limit_exceeded(detail: impl Into<String>) -> Self {
        Self::LimitExceeded {
            detail: detail.into(),
        }
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self::Unexpected {
            detail: detail.into(),
        }
    }

    /// Whether this document's queue row is benign to drop with no FAILED
    /// transition — the document already reached a terminal state.
    pub fn is_benign(&self) -> bool {
        matches!(self, JobError::AlreadyFinished { .. })
    }

    /// Detailed message, safe only for worker-local logs.
    pub fn log_message(&self) -> String {
        format!("{self:#}")
    }

    /// Concise message persisted to the document's `worker_log` column.
    pub fn db_message(&self) -> String {
        match self {
            JobError::ConfigMissing { path } => format!("configuration missing: {path}"),
            JobError::Unavailable { .. } => "a required dependency was unavailable".to_string(),
            JobError::JobNotFound { .. } => "document not found".to_string(),
            JobError::AlreadyFinished { .. } => "document already finished".to_string(),
            JobError::TemplateMalformed { detail } => format!("template error: {detail}"),
            JobError::StepInvariantViolated { detail } => format!("pipeline error: {detail}"),
            JobError::ConverterFailed { detail } => format!("conversion failed: {detail}"),
            JobError::LimitExceeded { detail } => format!("limit exceeded: {detail}"),
            JobError::Unexpected { .. } => "an unexpected error occurred".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_finished_is_benign() {
        let e = JobError::already_finished("doc-1");
        assert!(e.is_benign());
        assert!(!JobError::unexpected("boom").is_benign());
    }

    #[test]
    fn db_message_is_concise_for_converter_failure() {
        let e = JobError::converter_failed("pandoc exited 1: bad input");
        assert_eq!(e.db_message(), "conversion failed: pandoc exited 1: bad input");
    }
}
