//! docgen-limits: per-tenant size/storage/time limit enforcement (C8) and
//! PDF watermarking.

pub mod error;
pub mod limits;
pub mod watermark;

pub use error::{LimitsError, LimitsResult};
pub use limits::{check_document_size, check_format_allowed, check_tenant_usage};
pub use watermark::Watermarker;
