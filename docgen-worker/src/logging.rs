//! Logging setup (§11): a `tracing-subscriber` `fmt` layer initialized
//! once at startup from `logging.format`/`logging.level`/`logging.globalLevel`.
//! Per-job spans carrying `trace_id`/`document_id` are created by the
//! coordinator; this module only wires the global subscriber.

use docgen_config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Build an `EnvFilter` from the worker's own level and the blanket level
/// applied to every other crate, matching `logging.level` (this crate)
/// vs `logging.globalLevel` (everything else) in the YAML config.
fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let directive = format!(
        "{global},docgen_worker={level},docgen_core={level},docgen_ledger={level},docgen_storage={level},docgen_template={level},docgen_convert={level},docgen_limits={level}",
        global = config.global_level.to_lowercase(),
        level = config.level.to_lowercase(),
    );
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global subscriber. Returns an error only if a
/// subscriber was already installed (never expected in `main`, guarded
/// against for defensive init ordering).
pub fn init(config: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = build_filter(config);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}
