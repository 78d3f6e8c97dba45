//! CLI entry point surface (§12): `<program> <config.yaml> <workdir>`.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "docgen-worker", about = "Document generation queue worker")]
pub struct Cli {
    /// Path to the worker's YAML configuration file.
    pub config: PathBuf,

    /// Scratch root under which per-job template workspaces are created.
    pub workdir: PathBuf,
}
