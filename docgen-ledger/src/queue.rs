//! The queue connection: LISTEN/NOTIFY subscription used purely as a wake
//! signal between drain cycles. The skip-locked dequeue itself runs on the
//! ledger's own connection (see `ledger::JobTransaction`) so that the row
//! lock it takes is held for the job's full processing time, rather than
//! released the instant the SELECT returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docgen_core::{Job, RetryPolicy};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_postgres::{AsyncMessage, Client, Config, NoTls};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{JobTransaction, Ledger};

const LISTEN: &str = "LISTEN document_queue_channel;";

/// The queue connection: autocommit, serves notifications only. No query
/// ever runs against it outside of `LISTEN`/`NOTIFY` bookkeeping.
pub struct QueueConnection {
    client: Client,
    notifications: mpsc::UnboundedReceiver<String>,
    connection_string: String,
}

impl QueueConnection {
    pub async fn connect(connection_string: &str) -> LedgerResult<Self> {
        let (client, notifications) = connect_with_notifications(connection_string).await?;
        client
            .simple_query(LISTEN)
            .await
            .map_err(|e| LedgerError::query(e.to_string()))?;
        Ok(Self {
            client,
            notifications,
            connection_string: connection_string.to_string(),
        })
    }

    pub async fn reconnect(&mut self) -> LedgerResult<()> {
        let (client, notifications) = connect_with_notifications(&self.connection_string).await?;
        client
            .simple_query(LISTEN)
            .await
            .map_err(|e| LedgerError::query(e.to_string()))?;
        self.client = client;
        self.notifications = notifications;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// Block until a notification arrives or `timeout` elapses. The
    /// payload is logged and discarded; any wake is just a hint to
    /// re-drain.
    async fn wait(&mut self, timeout: Duration) {
        match tokio::time::timeout(timeout, self.notifications.recv()).await {
            Ok(Some(payload)) => tracing::debug!(%payload, "queue notification received"),
            Ok(None) => tracing::warn!("queue notification channel closed"),
            Err(_) => {}
        }
    }
}

async fn connect_with_notifications(
    connection_string: &str,
) -> LedgerResult<(Client, mpsc::UnboundedReceiver<String>)> {
    let config: Config = connection_string
        .parse()
        .map_err(|e: tokio_postgres::Error| LedgerError::connect(e.to_string()))?;

    RetryPolicy::connect()
        .run(|| async {
            let (client, mut connection) = config
                .connect(NoTls)
                .await
                .map_err(|e| LedgerError::connect(e.to_string()))?;
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(async move {
                while let Some(message) = connection.next().await {
                    match message {
                        Ok(AsyncMessage::Notification(n)) => {
                            let _ = tx.send(n.payload().to_string());
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "queue connection terminated");
                            break;
                        }
                    }
                }
            });
            Ok((client, rx))
        })
        .await
}

/// Invoked once per dequeued job, given the open transaction its ledger
/// reads/writes must run against so the skip-locked row lock is held
/// until the job's outcome (and the queue row's delete) commit together.
#[async_trait::async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, ledger: &JobTransaction<'_>, job: Job);
}

/// Drives the C3 drain-and-wait protocol: for each drain cycle, open a
/// transaction on the ledger connection, skip-locked-select a job, hand it
/// to the processor, delete the row and commit — all in that one
/// transaction — then block for a notification or the configured wait
/// timeout. Exits cleanly once `interrupted` is observed true, after
/// finishing the job currently in hand.
pub struct Listener {
    ledger: Ledger,
    queue: QueueConnection,
    wait_timeout: Duration,
}

impl Listener {
    pub fn new(ledger: Ledger, queue: QueueConnection, wait_timeout: Duration) -> Self {
        Self {
            ledger,
            queue,
            wait_timeout,
        }
    }

    pub async fn run<P: JobProcessor>(&mut self, interrupted: Arc<AtomicBool>, processor: &P) {
        loop {
            loop {
                let txn = match self.ledger.begin().await {
                    Ok(txn) => txn,
                    Err(e) => {
                        tracing::error!(error = %e, "ledger connection lost, attempting reconnect");
                        if let Err(e) = RetryPolicy::connect().run(|| self.ledger.reconnect()).await
                        {
                            tracing::error!(
                                error = %e,
                                "giving up on ledger after repeated reconnect failures"
                            );
                            return;
                        }
                        continue;
                    }
                };

                let job = match txn.select_next_job().await {
                    Ok(job) => job,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to select next job");
                        let _ = txn.rollback().await;
                        break;
                    }
                };

                let Some(job) = job else {
                    let _ = txn.commit().await;
                    break;
                };

                let id = job.id;
                processor.process(&txn, job).await;

                if let Err(e) = txn.delete_job(id).await {
                    tracing::error!(error = %e, job_id = id, "failed to delete queue row after processing");
                }
                if let Err(e) = txn.commit().await {
                    tracing::error!(error = %e, job_id = id, "failed to commit job transaction");
                }
            }

            if interrupted.load(Ordering::SeqCst) {
                return;
            }

            self.queue.wait(self.wait_timeout).await;

            if self.queue.is_closed() {
                if let Err(e) = self.queue.reconnect().await {
                    tracing::error!(error = %e, "queue reconnect failed, backing off");
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            }

            if interrupted.load(Ordering::SeqCst) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // The drain/wait/exit protocol and the skip-locked select are exercised
    // against a real Postgres instance in integration tests outside this
    // crate; a fake pool is not representative of `FOR UPDATE SKIP LOCKED`
    // semantics under contention, so unit tests here are limited to the
    // surface that doesn't require a live connection.
    use super::*;

    #[test]
    fn listen_statement_targets_the_documented_channel() {
        assert!(LISTEN.contains("document_queue_channel"));
    }
}
