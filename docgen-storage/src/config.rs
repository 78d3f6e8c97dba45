/// S3-compatible endpoint configuration (`s3.*` in the worker's YAML config).
#[derive(Debug, Clone, Default)]
pub struct S3Config {
    pub url: String,
    pub username: String,
    pub password: String,
    pub bucket: String,
    pub region: String,
}

impl S3Config {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        bucket: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            bucket: bucket.into(),
            region: region.into(),
        }
    }
}
