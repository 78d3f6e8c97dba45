//! Template Assembler (C4): materializes a `TemplateComposite` into an
//! isolated per-job workspace directory on local disk.

use std::path::{Path, PathBuf};

use docgen_core::{TemplateComposite, TenantId};
use docgen_storage::StorageClient;

use crate::error::TemplateResult;

/// A materialized template: the workspace directory plus everything a
/// step needs to resolve asset lookups during rendering.
pub struct Workspace {
    pub(crate) root: PathBuf,
    #[allow(dead_code)]
    pub(crate) template_id: String,
}

impl Workspace {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Workspace-relative path for referencing a file during conversion
    /// (e.g. as a `wkhtmltopdf --allow`ed resource).
    pub fn asset_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }
}

/// Derive the workspace directory name from a template id by replacing
/// `:` (the organization/coordinate/version separator) with `_`, since
/// `:` is unsafe in paths on some platforms.
fn sanitize_template_id(template_id: &str) -> String {
    template_id.replace(':', "_")
}

/// Materialize `composite` under `<workdir>/<sanitized template id>`,
/// removing a stale directory from a prior run first. Text files are
/// written verbatim in UTF-8; assets are downloaded from the storage
/// client keyed by `[<app_uuid>/]templates/<template_id>/<asset.uuid>`. A
/// missing asset is logged but does not fail assembly.
pub async fn materialize(
    workdir: &Path,
    composite: &TemplateComposite,
    app_uuid: &TenantId,
    storage: &StorageClient,
) -> TemplateResult<Workspace> {
    let template_id = composite.template.id.clone();
    let root = workdir.join(sanitize_template_id(&template_id));

    if root.exists() {
        tokio::fs::remove_dir_all(&root).await?;
    }
    tokio::fs::create_dir_all(&root).await?;

    for file in &composite.files {
        let path = root.join(&file.file_name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &file.content).await?;
    }

    for asset in &composite.assets {
        let key = app_uuid.template_asset_key(&template_id, &asset.uuid);
        let dest = root.join(&asset.file_name);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match storage.download_file(&key, &dest).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    template_id = %template_id,
                    asset_uuid = %asset.uuid,
                    file_name = %asset.file_name,
                    "template asset missing in object store, skipping"
                );
            }
            Err(e) => {
                tracing::warn!(
                    template_id = %template_id,
                    asset_uuid = %asset.uuid,
                    error = %e,
                    "failed to download template asset, skipping"
                );
            }
        }
    }

    Ok(Workspace { root, template_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_colons_in_template_ids() {
        assert_eq!(sanitize_template_id("acme:invoice:v2"), "acme_invoice_v2");
        assert_eq!(sanitize_template_id("no-colons"), "no-colons");
    }
}
