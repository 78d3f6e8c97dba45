//! Job Coordinator (C9): wires the ledger, template assembler, step
//! pipeline, limits/watermarker and storage client into the five-phase
//! per-job sequence in §4.9, with a single failure edge back to FAILED.

use std::path::PathBuf;

use chrono::Utc;
use docgen_config::WorkerConfig;
use docgen_core::{
    AppConfig, AppLimits, Document, DocumentFile, DocumentState, Job, JobError, JobResult,
    TemplateComposite, TenantId,
};
use docgen_ledger::{JobProcessor, JobTransaction};
use docgen_limits::{check_document_size, check_format_allowed, check_tenant_usage, Watermarker};
use docgen_storage::StorageClient;
use docgen_template::{assembler, Pipeline, StepEnv};
use tracing::Instrument;

pub struct Coordinator {
    storage: StorageClient,
    config: WorkerConfig,
    workdir: PathBuf,
    default_watermarker: Option<Watermarker>,
}

/// Everything carried from `prepare_template` into `build_document`.
struct PreparedJob {
    composite: TemplateComposite,
    workspace: assembler::Workspace,
    app_config: AppConfig,
    app_limits: AppLimits,
    format_uuid: String,
}

impl Coordinator {
    pub fn new(storage: StorageClient, config: WorkerConfig, workdir: PathBuf) -> Self {
        let default_watermarker = config
            .experimental
            .pdf_watermark
            .as_ref()
            .and_then(|path| std::fs::read(path).ok())
            .and_then(|bytes| Watermarker::load(&bytes).ok());
        Self {
            storage,
            config,
            workdir,
            default_watermarker,
        }
    }

    /// Process one dequeued job end to end. Never propagates an error:
    /// every failure is converted into a FAILED transition (or, for a
    /// benign already-finished document, a silent no-op) so the listener
    /// can always delete the row and commit the transaction afterward.
    pub async fn run_job(&self, ledger: &JobTransaction<'_>, job: Job) {
        let trace_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("job", trace_id = %trace_id, document_id = %job.document_uuid);
        self.run_job_inner(ledger, job).instrument(span).await;
    }

    async fn run_job_inner(&self, ledger: &JobTransaction<'_>, job: Job) {
        let document_uuid = job.document_uuid.clone();
        let result = self.run_phases(ledger, &job).await;

        match result {
            Ok(()) => {}
            Err(e) if e.is_benign() => {
                tracing::info!(document_uuid = %document_uuid, "document already finished, nothing to do");
            }
            Err(e) => {
                tracing::error!(document_uuid = %document_uuid, error = %e.log_message(), "job failed");
                if let Err(update_err) = ledger
                    .update_document_state(&document_uuid, &e.db_message(), DocumentState::Failed)
                    .await
                {
                    tracing::error!(
                        document_uuid = %document_uuid,
                        error = %update_err,
                        "failed to persist FAILED state after job error; queue row still dropped"
                    );
                }
            }
        }
    }

    async fn run_phases(&self, ledger: &JobTransaction<'_>, job: &Job) -> JobResult<()> {
        let document = self.get_document(ledger, job).await?;
        let prepared = self.prepare_template(ledger, job, &document).await?;

        let timeout = prepared.app_limits.job_timeout;
        let rendered = tokio::time::timeout(timeout, self.build_document(ledger, job, &prepared))
            .await
            .map_err(|_| {
                JobError::limit_exceeded(format!(
                    "job exceeded its wall-clock budget of {}s",
                    timeout.as_secs()
                ))
            })??;

        self.store_document(&document, &rendered).await?;
        self.finalize(ledger, &document, &rendered).await?;

        let _ = tokio::fs::remove_dir_all(prepared.workspace.root()).await;
        Ok(())
    }

    /// Phase 1: fetch the document row; fail fast (benign) if already
    /// FINISHED; otherwise mark PROCESSING.
    async fn get_document(&self, ledger: &JobTransaction<'_>, job: &Job) -> JobResult<Document> {
        let document = ledger
            .fetch_document(&job.document_uuid, &job.app_uuid)
            .await?
            .ok_or_else(|| JobError::job_not_found(job.document_uuid.clone()))?;

        if document.state == DocumentState::Finished {
            return Err(JobError::already_finished(job.document_uuid.clone()));
        }

        ledger
            .update_document_retrieved(Utc::now(), &job.document_uuid)
            .await?;

        Ok(document)
    }

    /// Phase 2: load the template composite, materialize its workspace,
    /// locate the requested format, and fetch per-tenant policy. Also
    /// runs the one limit check (PDF-allowed) that must happen before any
    /// rendering work is spent.
    async fn prepare_template(
        &self,
        ledger: &JobTransaction<'_>,
        job: &Job,
        document: &Document,
    ) -> JobResult<PreparedJob> {
        let template = ledger
            .fetch_template(&document.template_id, &job.app_uuid)
            .await?
            .ok_or_else(|| {
                JobError::template_malformed(format!(
                    "template not found: {}",
                    document.template_id
                ))
            })?;

        let format = template
            .format_by_uuid(&document.format_uuid)
            .ok_or_else(|| {
                JobError::template_malformed(format!(
                    "format not found on template {}: {}",
                    document.template_id, document.format_uuid
                ))
            })?
            .clone();

        let files = ledger.fetch_template_files(&template.id).await?;
        let assets = ledger.fetch_template_assets(&template.id).await?;
        let composite = TemplateComposite {
            template,
            files,
            assets,
        };

        let workspace =
            assembler::materialize(&self.workdir, &composite, &job.app_uuid, &self.storage)
                .await
                .map_err(JobError::from)?;

        let app_config = ledger
            .fetch_app_config(&job.app_uuid)
            .await?
            .unwrap_or_else(|| self.default_app_config(&job.app_uuid));
        let app_limits = ledger
            .fetch_app_limits(&job.app_uuid)
            .await?
            .unwrap_or_else(|| self.default_app_limits(&job.app_uuid));

        let pipeline = Pipeline::build(&format).map_err(JobError::from)?;
        if let Some(output_format) = pipeline.output_format() {
            check_format_allowed(&app_config, output_format).map_err(JobError::from)?;
        }

        Ok(PreparedJob {
            composite,
            workspace,
            app_config,
            app_limits,
            format_uuid: document.format_uuid.clone(),
        })
    }

    fn default_app_config(&self, app_uuid: &TenantId) -> AppConfig {
        AppConfig {
            app_uuid: app_uuid.clone(),
            pdf_enabled: true,
        }
    }

    fn default_app_limits(&self, app_uuid: &TenantId) -> AppLimits {
        AppLimits {
            app_uuid: app_uuid.clone(),
            max_document_bytes: None,
            max_total_bytes: None,
            job_timeout: self.config.experimental.job_timeout(),
            pdf_watermark: None,
            pdf_watermark_top: self.config.experimental.pdf_watermark_top,
        }
    }

    /// Phase 3: execute the step pipeline, then enforce size/usage limits
    /// and watermark a PDF output if the tenant configures one.
    async fn build_document(
        &self,
        ledger: &JobTransaction<'_>,
        job: &Job,
        prepared: &PreparedJob,
    ) -> JobResult<DocumentFile> {
        let format = prepared
            .composite
            .template
            .format_by_uuid(&prepared.format_uuid)
            .expect("format resolved in prepare_template");
        let pipeline = Pipeline::build(format).map_err(JobError::from)?;

        let step_env = StepEnv {
            workspace: &prepared.workspace,
            composite: &prepared.composite,
            pandoc: docgen_convert::PandocConfig {
                executable: self.config.externals.pandoc.executable.clone(),
                args: self.config.externals.pandoc.args.clone(),
                timeout: self.config.externals.pandoc.timeout_duration(),
            },
            wkhtmltopdf: docgen_convert::WkHtmlToPdfConfig {
                executable: self.config.externals.wkhtmltopdf.executable.clone(),
                args: self.config.externals.wkhtmltopdf.args.clone(),
                timeout: self.config.externals.wkhtmltopdf.timeout_duration(),
            },
        };

        let mut rendered = pipeline
            .execute(&job.document_context, &step_env)
            .await
            .map_err(JobError::from)?;

        check_document_size(&prepared.app_limits, rendered.byte_size()).map_err(JobError::from)?;

        let used = ledger.used_storage_bytes(&job.app_uuid).await?;
        check_tenant_usage(&prepared.app_limits, used, rendered.byte_size())
            .map_err(JobError::from)?;

        if rendered.file_format.name == "pdf" {
            let watermarker = match &prepared.app_limits.pdf_watermark {
                Some(bytes) => Watermarker::load(bytes).ok(),
                None => self.default_watermarker.clone(),
            };
            if let Some(watermarker) = watermarker {
                let stamped = watermarker
                    .stamp(&rendered.content, prepared.app_limits.pdf_watermark_top)
                    .map_err(JobError::from)?;
                rendered = DocumentFile::new(rendered.file_format, stamped);
            }
        }

        let _ = &prepared.app_config;
        Ok(rendered)
    }

    /// Phase 4: ensure the bucket exists and upload the rendered bytes,
    /// keyed by document uuid rather than the naming-strategy filename —
    /// that name is only a presentation label computed in `finalize`.
    async fn store_document(&self, document: &Document, rendered: &DocumentFile) -> JobResult<()> {
        self.storage.ensure_bucket().await.map_err(JobError::from)?;

        let key = document.app_uuid.document_key(&document.uuid);
        self.storage
            .store_document(&key, rendered.file_format.content_type, rendered.content.clone())
            .await
            .map_err(JobError::from)?;

        Ok(())
    }

    /// Phase 5: compute the presentation filename via the configured
    /// naming strategy and persist the terminal FINISHED state.
    async fn finalize(
        &self,
        ledger: &JobTransaction<'_>,
        document: &Document,
        rendered: &DocumentFile,
    ) -> JobResult<()> {
        let naming = self.config.documents.naming_strategy();
        let file_name = format!(
            "{}.{}",
            naming.file_stem(document),
            rendered.file_format.extension
        );
        let log = format!(
            "rendered {} bytes as {} ({})",
            rendered.byte_size(),
            file_name,
            rendered.file_format.content_type
        );
        ledger
            .update_document_finished(
                Utc::now(),
                &file_name,
                rendered.file_format.content_type,
                rendered.byte_size() as i64,
                &log,
                &document.uuid,
            )
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl JobProcessor for Coordinator {
    async fn process(&self, ledger: &JobTransaction<'_>, job: Job) {
        self.run_job(ledger, job).await
    }
}

impl From<docgen_storage::StorageError> for JobError {
    fn from(err: docgen_storage::StorageError) -> Self {
        JobError::unavailable(err.to_string())
    }
}
