//! The query connection: one physical connection held for the worker's
//! lifetime, from which each job's dequeue-through-delete sequence opens
//! its own transaction (`Ledger::begin`). Every read/update the Coordinator
//! issues while processing a job runs against that transaction via
//! `JobTransaction`, at default isolation with one explicit commit per job
//! (§4.2, §4.3).

use chrono::{DateTime, Utc};
use docgen_core::{
    AppConfig, AppLimits, Document, DocumentState, Job, RetryPolicy, Template, TemplateAsset,
    TemplateFile, TenantId,
};
use tokio_postgres::{Client, Transaction};

use crate::connection::connect;
use crate::error::{LedgerError, LedgerResult};

const SELECT_DOCUMENT: &str = "SELECT uuid, name, state, template_id, format_uuid, creator_uuid, \
     app_uuid, retrieved_at, finished_at, file_name, content_type, file_size, worker_log \
     FROM document WHERE uuid = $1 AND app_uuid = $2;";

const UPDATE_DOCUMENT_STATE: &str =
    "UPDATE document SET state = $1, worker_log = $2 WHERE uuid = $3;";

const UPDATE_DOCUMENT_RETRIEVED: &str =
    "UPDATE document SET state = 'PROCESSING', retrieved_at = $1 WHERE uuid = $2;";

const UPDATE_DOCUMENT_FINISHED: &str =
    "UPDATE document SET state = 'FINISHED', finished_at = $1, file_name = $2, \
     content_type = $3, file_size = $4, worker_log = $5 WHERE uuid = $6;";

const SELECT_TEMPLATE: &str =
    "SELECT id, metamodel_version, formats_json FROM template WHERE id = $1 AND app_uuid = $2;";

const SELECT_TEMPLATE_FILES: &str =
    "SELECT template_id, file_name, content FROM template_file WHERE template_id = $1;";

const SELECT_TEMPLATE_ASSETS: &str =
    "SELECT template_id, uuid, file_name, content_type FROM template_asset WHERE template_id = $1;";

const SELECT_APP_CONFIG: &str = "SELECT app_uuid, pdf_enabled FROM app_config WHERE app_uuid = $1;";

const SELECT_APP_LIMITS: &str =
    "SELECT app_uuid, max_document_bytes, max_total_bytes, job_timeout_secs, \
     pdf_watermark, pdf_watermark_top FROM app_limits WHERE app_uuid = $1;";

const SELECT_USED_STORAGE_BYTES: &str =
    "SELECT COALESCE(SUM(file_size), 0) FROM document WHERE app_uuid = $1 AND state = 'FINISHED';";

const SELECT_JOB: &str =
    "SELECT id, document_uuid, document_context, created_by, created_at, app_uuid \
     FROM document_queue LIMIT 1 FOR UPDATE SKIP LOCKED;";

const DELETE_JOB: &str = "DELETE FROM document_queue WHERE id = $1;";

fn parse_state(raw: &str) -> LedgerResult<DocumentState> {
    match raw {
        "QUEUED" => Ok(DocumentState::Queued),
        "PROCESSING" => Ok(DocumentState::Processing),
        "FAILED" => Ok(DocumentState::Failed),
        "FINISHED" => Ok(DocumentState::Finished),
        other => Err(LedgerError::decode(format!("unknown document state {other}"))),
    }
}

/// One physical Postgres connection, held for the worker's lifetime.
/// `begin` opens a fresh transaction for each drain cycle; nothing here
/// touches the database directly outside of one.
pub struct Ledger {
    client: Client,
    _handle: tokio::task::JoinHandle<()>,
    connection_string: String,
}

impl Ledger {
    pub async fn connect(connection_string: &str) -> LedgerResult<Self> {
        let (client, handle) = connect(connection_string).await?;
        Ok(Self {
            client,
            _handle: handle,
            connection_string: connection_string.to_string(),
        })
    }

    /// Re-establish the connection after it has been observed dead.
    pub async fn reconnect(&mut self) -> LedgerResult<()> {
        let (client, handle) = connect(&self.connection_string).await?;
        self.client = client;
        self._handle = handle;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// Open the transaction that will carry one job from its skip-locked
    /// dequeue through every ledger read/write the Coordinator issues
    /// while handling it, down to the final `DELETE` and commit. The row
    /// lock `select_next_job` takes is held for as long as this
    /// transaction stays open, so no other worker can see the same row
    /// until it commits (§4.2, §4.3, §8).
    pub async fn begin(&mut self) -> LedgerResult<JobTransaction<'_>> {
        let txn = self
            .client
            .transaction()
            .await
            .map_err(|e| LedgerError::query(e.to_string()))?;
        Ok(JobTransaction { txn })
    }
}

/// All ledger access for one job, scoped to the transaction opened by
/// `Ledger::begin`. The caller commits once, after the queue row has been
/// deleted.
pub struct JobTransaction<'a> {
    txn: Transaction<'a>,
}

impl<'a> JobTransaction<'a> {
    /// A single-row select under a row lock that skips already-locked
    /// rows, so concurrent workers never contend for the same job.
    pub async fn select_next_job(&self) -> LedgerResult<Option<Job>> {
        let row = self
            .txn
            .query_opt(SELECT_JOB, &[])
            .await
            .map_err(|e| LedgerError::query(e.to_string()))?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Job {
            id: row.try_get(0).map_err(|e| LedgerError::decode(e.to_string()))?,
            document_uuid: row.try_get(1).map_err(|e| LedgerError::decode(e.to_string()))?,
            document_context: row.try_get(2).map_err(|e| LedgerError::decode(e.to_string()))?,
            created_by: row.try_get(3).map_err(|e| LedgerError::decode(e.to_string()))?,
            created_at: row.try_get(4).map_err(|e| LedgerError::decode(e.to_string()))?,
            app_uuid: TenantId::new(
                row.try_get::<_, String>(5)
                    .map_err(|e| LedgerError::decode(e.to_string()))?,
            ),
        }))
    }

    /// Deletes the dequeued row. Not committed until the caller calls
    /// `commit`, so the delete and everything the Coordinator did to
    /// process the job land atomically.
    pub async fn delete_job(&self, id: i64) -> LedgerResult<()> {
        self.txn
            .execute(DELETE_JOB, &[&id])
            .await
            .map_err(|e| LedgerError::query(e.to_string()))?;
        Ok(())
    }

    pub async fn commit(self) -> LedgerResult<()> {
        self.txn
            .commit()
            .await
            .map_err(|e| LedgerError::query(e.to_string()))
    }

    pub async fn rollback(self) -> LedgerResult<()> {
        self.txn
            .rollback()
            .await
            .map_err(|e| LedgerError::query(e.to_string()))
    }

    pub async fn fetch_document(
        &self,
        uuid: &str,
        app_uuid: &TenantId,
    ) -> LedgerResult<Option<Document>> {
        RetryPolicy::query()
            .run(|| async {
                let row = self
                    .txn
                    .query_opt(SELECT_DOCUMENT, &[&uuid, &app_uuid.as_str()])
                    .await?;
                let Some(row) = row else { return Ok(None) };
                let state_raw: String = row.try_get(2)?;
                Ok(Some(Document {
                    uuid: row.try_get(0)?,
                    name: row.try_get(1)?,
                    state: parse_state(&state_raw)?,
                    template_id: row.try_get(3)?,
                    format_uuid: row.try_get(4)?,
                    creator_uuid: row.try_get(5)?,
                    app_uuid: TenantId::new(row.try_get::<_, String>(6)?),
                    retrieved_at: row.try_get(7)?,
                    finished_at: row.try_get(8)?,
                    file_name: row.try_get(9)?,
                    content_type: row.try_get(10)?,
                    file_size: row.try_get(11)?,
                    worker_log: row.try_get(12)?,
                }))
            })
            .await
    }

    pub async fn fetch_template(
        &self,
        id: &str,
        app_uuid: &TenantId,
    ) -> LedgerResult<Option<Template>> {
        RetryPolicy::query()
            .run(|| async {
                let row = self
                    .txn
                    .query_opt(SELECT_TEMPLATE, &[&id, &app_uuid.as_str()])
                    .await?;
                let Some(row) = row else { return Ok(None) };
                let formats_json: serde_json::Value = row.try_get(2)?;
                let formats = serde_json::from_value(formats_json)
                    .map_err(|e| LedgerError::decode(e.to_string()))?;
                Ok(Some(Template {
                    id: row.try_get(0)?,
                    metamodel_version: row.try_get(1)?,
                    formats,
                }))
            })
            .await
    }

    pub async fn fetch_template_files(&self, id: &str) -> LedgerResult<Vec<TemplateFile>> {
        RetryPolicy::query()
            .run(|| async {
                let rows = self.txn.query(SELECT_TEMPLATE_FILES, &[&id]).await?;
                rows.into_iter()
                    .map(|row| {
                        Ok(TemplateFile {
                            template_id: row.try_get(0)?,
                            file_name: row.try_get(1)?,
                            content: row.try_get(2)?,
                        })
                    })
                    .collect::<LedgerResult<Vec<_>>>()
            })
            .await
    }

    pub async fn fetch_template_assets(&self, id: &str) -> LedgerResult<Vec<TemplateAsset>> {
        RetryPolicy::query()
            .run(|| async {
                let rows = self.txn.query(SELECT_TEMPLATE_ASSETS, &[&id]).await?;
                rows.into_iter()
                    .map(|row| {
                        Ok(TemplateAsset {
                            template_id: row.try_get(0)?,
                            uuid: row.try_get(1)?,
                            file_name: row.try_get(2)?,
                            content_type: row.try_get(3)?,
                        })
                    })
                    .collect::<LedgerResult<Vec<_>>>()
            })
            .await
    }

    pub async fn fetch_app_config(&self, app_uuid: &TenantId) -> LedgerResult<Option<AppConfig>> {
        RetryPolicy::query()
            .run(|| async {
                let row = self
                    .txn
                    .query_opt(SELECT_APP_CONFIG, &[&app_uuid.as_str()])
                    .await?;
                let Some(row) = row else { return Ok(None) };
                Ok(Some(AppConfig {
                    app_uuid: TenantId::new(row.try_get::<_, String>(0)?),
                    pdf_enabled: row.try_get(1)?,
                }))
            })
            .await
    }

    pub async fn fetch_app_limits(&self, app_uuid: &TenantId) -> LedgerResult<Option<AppLimits>> {
        RetryPolicy::query()
            .run(|| async {
                let row = self
                    .txn
                    .query_opt(SELECT_APP_LIMITS, &[&app_uuid.as_str()])
                    .await?;
                let Some(row) = row else { return Ok(None) };
                let job_timeout_secs: i64 = row.try_get(3)?;
                Ok(Some(AppLimits {
                    app_uuid: TenantId::new(row.try_get::<_, String>(0)?),
                    max_document_bytes: row.try_get(1)?,
                    max_total_bytes: row.try_get(2)?,
                    job_timeout: std::time::Duration::from_secs(job_timeout_secs.max(0) as u64),
                    pdf_watermark: row.try_get(4)?,
                    pdf_watermark_top: row.try_get(5)?,
                }))
            })
            .await
    }

    pub async fn used_storage_bytes(&self, app_uuid: &TenantId) -> LedgerResult<i64> {
        RetryPolicy::query()
            .run(|| async {
                let row = self
                    .txn
                    .query_one(SELECT_USED_STORAGE_BYTES, &[&app_uuid.as_str()])
                    .await?;
                Ok(row.try_get(0)?)
            })
            .await
    }

    pub async fn update_document_state(
        &self,
        uuid: &str,
        log: &str,
        state: DocumentState,
    ) -> LedgerResult<bool> {
        RetryPolicy::query()
            .run(|| async {
                let affected = self
                    .txn
                    .execute(UPDATE_DOCUMENT_STATE, &[&state.to_string(), &log, &uuid])
                    .await?;
                Ok(affected > 0)
            })
            .await
    }

    pub async fn update_document_retrieved(
        &self,
        ts: DateTime<Utc>,
        uuid: &str,
    ) -> LedgerResult<bool> {
        RetryPolicy::query()
            .run(|| async {
                let affected = self
                    .txn
                    .execute(UPDATE_DOCUMENT_RETRIEVED, &[&ts, &uuid])
                    .await?;
                Ok(affected > 0)
            })
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_document_finished(
        &self,
        ts: DateTime<Utc>,
        file_name: &str,
        content_type: &str,
        file_size: i64,
        log: &str,
        uuid: &str,
    ) -> LedgerResult<bool> {
        RetryPolicy::query()
            .run(|| async {
                let affected = self
                    .txn
                    .execute(
                        UPDATE_DOCUMENT_FINISHED,
                        &[&ts, &file_name, &content_type, &file_size, &log, &uuid],
                    )
                    .await?;
                Ok(affected > 0)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_states() {
        assert_eq!(parse_state("QUEUED").unwrap(), DocumentState::Queued);
        assert_eq!(parse_state("FINISHED").unwrap(), DocumentState::Finished);
        assert!(parse_state("BOGUS").is_err());
    }

    #[test]
    fn job_select_still_carries_the_row_lock_clause() {
        assert!(SELECT_JOB.contains("FOR UPDATE SKIP LOCKED"));
    }
}
