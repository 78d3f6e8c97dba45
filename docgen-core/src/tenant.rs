//! Multi-tenant identifiers.

/// The well-known tenant id that denotes single-tenant mode. Ledger rows and
/// storage keys are never prefixed for this tenant.
pub const NULL_TENANT: &str = "00000000-0000-0000-0000-000000000000";

/// A tenant identifier (`app_uuid` in the ledger and storage layout).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// The single-tenant sentinel.
    pub fn null() -> Self {
        Self(NULL_TENANT.to_string())
    }

    /// Whether this tenant is the single-tenant sentinel, i.e. whether
    /// storage keys and ledger filters should skip the `<app_uuid>/` prefix.
    pub fn is_null(&self) -> bool {
        self.0 == NULL_TENANT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `documents/<file_name>`, prefixed with `<app_uuid>/` iff multi-tenant.
    pub fn document_key(&self, file_name: &str) -> String {
        self.prefixed(&format!("documents/{file_name}"))
    }

    /// `templates/<template_id>/<asset_uuid>`, prefixed with `<app_uuid>/`
    /// iff multi-tenant.
    pub fn template_asset_key(&self, template_id: &str, asset_uuid: &str) -> String {
        self.prefixed(&format!("templates/{template_id}/{asset_uuid}"))
    }

    fn prefixed(&self, key: &str) -> String {
        if self.is_null() {
            key.to_string()
        } else {
            format!("{}/{}", self.0, key)
        }
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Per-job tracing context: the two contextual fields a structured logger
/// attaches to every event emitted while a job is in flight.
#[derive(Debug, Clone, Default)]
pub struct JobCtx {
    pub trace_id: Option<String>,
    pub document_id: Option<String>,
}

impl JobCtx {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            trace_id: None,
            document_id: Some(document_id.into()),
        }
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_tenant_keys_are_unprefixed() {
        let t = TenantId::null();
        assert_eq!(t.document_key("out.pdf"), "documents/out.pdf");
        assert_eq!(
            t.template_asset_key("org:coord:v1", "asset-1"),
            "templates/org:coord:v1/asset-1"
        );
    }

    #[test]
    fn tenant_keys_are_prefixed() {
        let t = TenantId::new("tenant-a");
        assert_eq!(t.document_key("out.pdf"), "tenant-a/documents/out.pdf");
    }
}
