//! wkhtmltopdf driver: quiet mode, ignore load errors, whitelist the
//! workspace for local file access, stdin -> stdout.

use std::path::Path;
use std::time::Duration;

use crate::error::ConvertResult;
use crate::subprocess::{run, shlex_split};

#[derive(Debug, Clone)]
pub struct WkHtmlToPdfConfig {
    pub executable: String,
    pub args: String,
    pub timeout: Option<Duration>,
}

pub struct WkHtmlToPdf {
    config: WkHtmlToPdfConfig,
}

impl WkHtmlToPdf {
    pub fn new(config: WkHtmlToPdfConfig) -> Self {
        Self { config }
    }

    pub async fn convert(
        &self,
        template_args: &str,
        workspace: &Path,
        html: &[u8],
    ) -> ConvertResult<Vec<u8>> {
        let workspace_str = workspace.to_string_lossy().into_owned();
        let mut args = vec![
            "--quiet".to_string(),
            "--load-error-handling".to_string(),
            "ignore".to_string(),
        ];
        args.extend(shlex_split(template_args));
        args.extend(shlex_split(&self.config.args));
        args.extend([
            "--disable-local-file-access".to_string(),
            "--allow".to_string(),
            workspace_str,
            "--encoding".to_string(),
            "utf-8".to_string(),
            "-".to_string(),
            "-".to_string(),
        ]);
        run(&self.config.executable, &args, workspace, html, self.config.timeout).await
    }
}
