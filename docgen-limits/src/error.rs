use docgen_core::JobError;
use thiserror::Error;

pub type LimitsResult<T> = Result<T, LimitsError>;

#[derive(Error, Debug)]
pub enum LimitsError {
    #[error("output format is PDF but this tenant has PDF output disabled")]
    PdfNotAllowed,

    #[error("rendered document is {actual} bytes, exceeding the per-document cap of {cap} bytes")]
    DocumentTooLarge { actual: u64, cap: u64 },

    #[error(
        "tenant storage usage would be {projected} bytes, exceeding the per-tenant cap of {cap} bytes"
    )]
    TenantStorageExceeded { projected: u64, cap: u64 },

    #[error("job exceeded its wall-clock budget of {budget_secs}s")]
    Timeout { budget_secs: u64 },

    #[error("failed to stamp watermark: {detail}")]
    Watermark { detail: String },
}

impl From<LimitsError> for JobError {
    fn from(err: LimitsError) -> Self {
        JobError::limit_exceeded(err.to_string())
    }
}
