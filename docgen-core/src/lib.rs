//! docgen-core: shared data model, error taxonomy, and tenant/naming
//! primitives used by every component of the document generation worker.

pub mod error;
pub mod format;
pub mod model;
pub mod naming;
pub mod retry;
pub mod tenant;

pub use error::{JobError, JobResult};
pub use format::FileFormat;
pub use model::{
    AppConfig, AppLimits, Asset, Document, DocumentFile, DocumentState, FormatDescriptor, Job,
    StepDescriptor, Template, TemplateAsset, TemplateComposite, TemplateFile,
};
pub use naming::NamingStrategy;
pub use retry::RetryPolicy;
pub use tenant::{JobCtx, TenantId, NULL_TENANT};
