//! S3-compatible storage client: ensure-bucket, store, download.

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use docgen_core::RetryPolicy;

use crate::config::S3Config;
use crate::error::{StorageError, StorageResult};

/// Thin wrapper around an S3-compatible client. One instance is shared by
/// a worker process for the lifetime of the process; it holds no per-job
/// state and is safe for sequential use across jobs.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    bucket: String,
}

impl StorageClient {
    pub async fn new(config: &S3Config) -> StorageResult<Self> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.clone(),
            None,
            None,
            "docgen-storage",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(config.url.clone())
            .load()
            .await;

        let client = Client::from_conf(
            S3ConfigBuilder::from(&aws_config)
                .force_path_style(true)
                .build(),
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
        })
    }

    /// Idempotent: create the configured bucket if it doesn't already exist.
    pub async fn ensure_bucket(&self) -> StorageResult<()> {
        RetryPolicy::query()
            .run(|| async {
                let existing = self
                    .client
                    .list_buckets()
                    .send()
                    .await
                    .map_err(StorageError::backend)?;
                let exists = existing
                    .buckets()
                    .iter()
                    .any(|b| b.name() == Some(self.bucket.as_str()));
                if exists {
                    return Ok(());
                }
                self.client
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .map_err(StorageError::backend)?;
                Ok(())
            })
            .await
    }

    /// Put `bytes` at `[<app_uuid>/]documents/<file_name>` (the caller
    /// supplies the full tenant-aware key via `TenantId::document_key`).
    pub async fn store_document(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> StorageResult<()> {
        RetryPolicy::query()
            .run(|| async {
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .content_type(content_type)
                    .body(ByteStream::from(bytes.clone()))
                    .send()
                    .await
                    .map_err(StorageError::backend)?;
                Ok(())
            })
            .await
    }

    /// Fetch the object at `key` and write it to `local_path`. Returns
    /// `Ok(false)` on a well-defined "missing key" response (AWS's
    /// `NoSuchKey`), propagates any other error.
    pub async fn download_file(
        &self,
        key: &str,
        local_path: &std::path::Path,
    ) -> StorageResult<bool> {
        let result = RetryPolicy::query()
            .run(|| async {
                match self
                    .client
                    .get_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .send()
                    .await
                {
                    Ok(output) => Ok(Some(output)),
                    Err(err) => {
                        if is_no_such_key(&err) {
                            Ok(None)
                        } else {
                            Err(StorageError::backend(err))
                        }
                    }
                }
            })
            .await?;

        let Some(output) = result else {
            return Ok(false);
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(StorageError::backend)?
            .into_bytes();

        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local_path, &bytes).await?;
        Ok(true)
    }
}

fn is_no_such_key<E, R>(err: &aws_sdk_s3::error::SdkError<E, R>) -> bool
where
    E: aws_sdk_s3::error::ProvideErrorMetadata,
{
    err.as_service_error()
        .and_then(|e| e.code())
        .map(|code| code == "NoSuchKey")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_config_round_trips_fields() {
        let cfg = S3Config::new("http://localhost:9000", "user", "pass", "bucket", "eu-central-1");
        assert_eq!(cfg.bucket, "bucket");
        assert_eq!(cfg.region, "eu-central-1");
    }
}
