//! Signal handling (§5): SIGINT and SIGABRT set a process-wide
//! "interrupted" flag checked between drain iterations; the job in hand
//! is allowed to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};

/// Spawn a task that flips `interrupted` true on SIGINT or SIGABRT and
/// then exits; the listener loop polls the flag itself rather than being
/// cancelled out from under an in-flight job.
pub fn install(interrupted: Arc<AtomicBool>) {
    tokio::spawn(async move {
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGINT handler");
                return;
            }
        };
        let mut sigabrt = match signal(SignalKind::from_raw(libc::SIGABRT)) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGABRT handler");
                return;
            }
        };

        tokio::select! {
            _ = sigint.recv() => tracing::info!("received SIGINT, finishing current job then exiting"),
            _ = sigabrt.recv() => tracing::info!("received SIGABRT, finishing current job then exiting"),
        }
        interrupted.store(true, Ordering::SeqCst);
    });
}
