//! Limits & Watermarker (C8): the four checks the coordinator runs around
//! `build_document`, each raising a distinct, canonically-worded reason.

use docgen_core::{AppConfig, AppLimits, FileFormat};

use crate::error::{LimitsError, LimitsResult};

/// Format-allowed gate, run before rendering: reject a PDF-producing
/// format outright if the tenant's config forbids PDF output.
pub fn check_format_allowed(config: &AppConfig, output_format: FileFormat) -> LimitsResult<()> {
    if output_format.name == "pdf" && !config.pdf_enabled {
        return Err(LimitsError::PdfNotAllowed);
    }
    Ok(())
}

/// Per-document size cap, run after rendering.
pub fn check_document_size(limits: &AppLimits, byte_size: usize) -> LimitsResult<()> {
    if let Some(cap) = limits.max_document_bytes {
        let cap = cap.max(0) as u64;
        if byte_size as u64 > cap {
            return Err(LimitsError::DocumentTooLarge {
                actual: byte_size as u64,
                cap,
            });
        }
    }
    Ok(())
}

/// Per-tenant usage cap: `used_storage + byte_size` must not exceed the
/// tenant's budget.
pub fn check_tenant_usage(limits: &AppLimits, used_storage_bytes: i64, byte_size: usize) -> LimitsResult<()> {
    if let Some(cap) = limits.max_total_bytes {
        let cap = cap.max(0) as u64;
        let projected = used_storage_bytes.max(0) as u64 + byte_size as u64;
        if projected > cap {
            return Err(LimitsError::TenantStorageExceeded { projected, cap });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgen_core::{format, TenantId};
    use std::time::Duration;

    fn limits(max_document_bytes: Option<i64>, max_total_bytes: Option<i64>) -> AppLimits {
        AppLimits {
            app_uuid: TenantId::null(),
            max_document_bytes,
            max_total_bytes,
            job_timeout: Duration::from_secs(120),
            pdf_watermark: None,
            pdf_watermark_top: 0.0,
        }
    }

    #[test]
    fn pdf_gate_rejects_when_tenant_disables_pdf() {
        let config = AppConfig {
            app_uuid: TenantId::null(),
            pdf_enabled: false,
        };
        assert!(matches!(
            check_format_allowed(&config, format::PDF),
            Err(LimitsError::PdfNotAllowed)
        ));
        assert!(check_format_allowed(&config, format::HTML).is_ok());
    }

    #[test]
    fn document_size_cap_rejects_over_budget() {
        let l = limits(Some(100), None);
        assert!(check_document_size(&l, 50).is_ok());
        assert!(matches!(
            check_document_size(&l, 150),
            Err(LimitsError::DocumentTooLarge { actual: 150, cap: 100 })
        ));
    }

    #[test]
    fn tenant_usage_cap_accounts_for_existing_usage() {
        let l = limits(None, Some(100));
        // Matches §8 scenario 5: used=90, limit=100, render=50 bytes -> reject.
        assert!(matches!(
            check_tenant_usage(&l, 90, 50),
            Err(LimitsError::TenantStorageExceeded { projected: 140, cap: 100 })
        ));
        assert!(check_tenant_usage(&l, 10, 50).is_ok());
    }

    #[test]
    fn unbounded_limits_never_reject() {
        let l = limits(None, None);
        assert!(check_document_size(&l, u32::MAX as usize).is_ok());
        assert!(check_tenant_usage(&l, i64::MAX / 2, 1).is_ok());
    }
}
