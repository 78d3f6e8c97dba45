//! Shared Postgres connect-with-retry helper used by both the query and
//! queue connections.

use docgen_core::RetryPolicy;
use tokio_postgres::{Client, Config, NoTls};

use crate::error::{LedgerError, LedgerResult};

/// Connect to Postgres, retrying with the connect-class backoff (0.2s
/// base, 10 tries). Spawns the connection driver and returns the client;
/// the caller is responsible for the returned connection's lifetime via
/// the join handle it gets back.
pub async fn connect(
    connection_string: &str,
) -> LedgerResult<(Client, tokio::task::JoinHandle<()>)> {
    let config: Config = connection_string
        .parse()
        .map_err(|e: tokio_postgres::Error| LedgerError::connect(e.to_string()))?;

    RetryPolicy::connect()
        .run(|| async {
            let (client, connection) = config
                .connect(NoTls)
                .await
                .map_err(|e| LedgerError::connect(e.to_string()))?;
            let handle = tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "ledger connection terminated");
                }
            });
            Ok((client, handle))
        })
        .await
}
