//! The shared data model: jobs, documents, templates and their parts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tenant::TenantId;

/// A work item dequeued from the shared queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub document_uuid: String,
    pub document_context: Value,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub app_uuid: TenantId,
}

/// Lifecycle state of a `Document`. Monotonic except FAILED/FINISHED are
/// both terminal; neither may transition further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentState {
    Queued,
    Processing,
    Failed,
    Finished,
}

impl DocumentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentState::Failed | DocumentState::Finished)
    }
}

impl std::fmt::Display for DocumentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocumentState::Queued => "QUEUED",
            DocumentState::Processing => "PROCESSING",
            DocumentState::Failed => "FAILED",
            DocumentState::Finished => "FINISHED",
        };
        write!(f, "{s}")
    }
}

/// The durable record of a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub uuid: String,
    pub name: String,
    pub state: DocumentState,
    pub template_id: String,
    pub format_uuid: String,
    pub creator_uuid: Option<String>,
    pub app_uuid: TenantId,
    pub retrieved_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub file_size: Option<i64>,
    pub worker_log: Option<String>,
}

/// A single step in a `FormatDescriptor`'s pipeline: `{name, options}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub name: String,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

/// A named, ordered, non-empty pipeline of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub uuid: String,
    pub name: String,
    pub steps: Vec<StepDescriptor>,
}

/// A text file belonging to a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateFile {
    pub template_id: String,
    pub file_name: String,
    pub content: String,
}

/// A binary file belonging to a template; bytes live in object storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateAsset {
    pub template_id: String,
    pub uuid: String,
    pub file_name: String,
    pub content_type: String,
}

/// A named generator of documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub metamodel_version: i32,
    pub formats: Vec<FormatDescriptor>,
}

impl Template {
    pub fn format_by_uuid(&self, format_uuid: &str) -> Option<&FormatDescriptor> {
        self.formats.iter().find(|f| f.uuid == format_uuid)
    }
}

/// Everything the Template Assembler needs to materialize a workspace.
#[derive(Debug, Clone)]
pub struct TemplateComposite {
    pub template: Template,
    pub files: Vec<TemplateFile>,
    pub assets: Vec<TemplateAsset>,
}

/// The in-memory artifact flowing between pipeline steps.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    pub file_format: crate::format::FileFormat,
    pub content: Vec<u8>,
}

impl DocumentFile {
    pub fn new(file_format: crate::format::FileFormat, content: Vec<u8>) -> Self {
        Self {
            file_format,
            content,
        }
    }

    pub fn byte_size(&self) -> usize {
        self.content.len()
    }
}

/// A resolved `TemplateAsset` with its bytes.
#[derive(Debug, Clone)]
pub struct Asset {
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl Asset {
    /// A `data:` URI view of this asset, for embedding in rendered markup.
    pub fn data_uri(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.content);
        format!("data:{};base64,{}", self.content_type, encoded)
    }
}

/// Per-tenant policy governing which output formats are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app_uuid: TenantId,
    /// If false, pipelines whose final output is PDF are rejected.
    pub pdf_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_uuid: TenantId::null(),
            pdf_enabled: true,
        }
    }
}

/// Per-tenant resource caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppLimits {
    pub app_uuid: TenantId,
    /// Hard cap on a single document's rendered byte size. `None` = unbounded.
    pub max_document_bytes: Option<i64>,
    /// Hard cap on a tenant's total stored bytes. `None` = unbounded.
    pub max_total_bytes: Option<i64>,
    /// Wall-clock budget for a single job, end to end.
    pub job_timeout: std::time::Duration,
    /// Optional PDF watermark image bytes, and its vertical offset in points
    /// from the top of each page.
    pub pdf_watermark: Option<Vec<u8>>,
    pub pdf_watermark_top: f32,
}

impl Default for AppLimits {
    fn default() -> Self {
        Self {
            app_uuid: TenantId::null(),
            max_document_bytes: None,
            max_total_bytes: None,
            job_timeout: std::time::Duration::from_secs(120),
            pdf_watermark: None,
            pdf_watermark_top: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(DocumentState::Failed.is_terminal());
        assert!(DocumentState::Finished.is_terminal());
        assert!(!DocumentState::Queued.is_terminal());
        assert!(!DocumentState::Processing.is_terminal());
    }

    #[test]
    fn template_finds_format_by_uuid() {
        let t = Template {
            id: "org:coord:v1".into(),
            metamodel_version: 1,
            formats: vec![FormatDescriptor {
                uuid: "fmt-1".into(),
                name: "default".into(),
                steps: vec![],
            }],
        };
        assert!(t.format_by_uuid("fmt-1").is_some());
        assert!(t.format_by_uuid("missing").is_none());
    }
}
