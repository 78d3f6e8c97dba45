//! Pandoc driver: `[executable] ++ template_args ++ config_args ++ [-f,
//! <src>, -t, <dst>, -o, -]`.

use std::path::Path;
use std::time::Duration;

use docgen_core::FileFormat;

use crate::error::ConvertResult;
use crate::subprocess::{run, shlex_split};

#[derive(Debug, Clone)]
pub struct PandocConfig {
    pub executable: String,
    pub args: String,
    pub timeout: Option<Duration>,
}

pub struct Pandoc {
    config: PandocConfig,
}

impl Pandoc {
    pub fn new(config: PandocConfig) -> Self {
        Self { config }
    }

    /// `template_args` come from the step descriptor's own `args` option;
    /// they are placed ahead of the worker-wide config args, matching the
    /// reference driver's ordering.
    pub async fn convert(
        &self,
        from: FileFormat,
        to: FileFormat,
        template_args: &str,
        workspace: &Path,
        data: &[u8],
    ) -> ConvertResult<Vec<u8>> {
        let mut args = shlex_split(template_args);
        args.extend(shlex_split(&self.config.args));
        args.extend([
            "-f".to_string(),
            from.name.to_string(),
            "-t".to_string(),
            to.name.to_string(),
            "-o".to_string(),
            "-".to_string(),
        ]);
        run(&self.config.executable, &args, workspace, data, self.config.timeout).await
    }
}
