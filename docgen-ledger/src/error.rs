use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("could not connect to the ledger: {detail}")]
    Connect { detail: String },

    #[error("ledger query failed: {detail}")]
    Query { detail: String },

    #[error("row decode failed: {detail}")]
    Decode { detail: String },
}

impl LedgerError {
    pub fn connect(detail: impl Into<String>) -> Self {
        Self::Connect {
            detail: detail.into(),
        }
    }

    pub fn query(detail: impl Into<String>) -> Self {
        Self::Query {
            detail: detail.into(),
        }
    }

    pub fn decode(detail: impl Into<String>) -> Self {
        Self::Decode {
            detail: detail.into(),
        }
    }
}

impl From<tokio_postgres::Error> for LedgerError {
    fn from(err: tokio_postgres::Error) -> Self {
        LedgerError::query(err.to_string())
    }
}

impl From<LedgerError> for docgen_core::JobError {
    fn from(err: LedgerError) -> Self {
        docgen_core::JobError::unavailable(err.to_string())
    }
}
