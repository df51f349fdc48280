//! Permanent avatar storage.
//!
//! Platform avatar URLs are signed and expire, so creators persisted during a
//! run have their avatar copied into a public storage bucket.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use comet_core::StorageConfig;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::Semaphore;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_AVATAR_BYTES: u64 = 1_048_576;

#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("storage returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("not an image: content type '{0}'")]
    NotAnImage(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[async_trait]
pub trait AvatarCache: Send + Sync {
    /// Returns the permanent URL for `original_url`, or `original_url`
    /// itself when it cannot be cached. Never fails.
    async fn cache(&self, user_id: &str, original_url: &str) -> String;
}

/// Caches avatars in a Supabase storage bucket.
pub struct SupabaseAvatarStore {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
    downloads: Semaphore,
}

impl std::fmt::Debug for SupabaseAvatarStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseAvatarStore")
            .field("base_url", &self.base_url)
            .field("service_key", &"[redacted]")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl SupabaseAvatarStore {
    /// # Errors
    ///
    /// Returns [`AvatarError::InvalidConfig`] if the base URL is blank, or
    /// [`AvatarError::Http`] if the HTTP client cannot be built.
    pub fn new(
        storage: &StorageConfig,
        download_concurrency: usize,
        timeout_secs: u64,
    ) -> Result<Self, AvatarError> {
        let base_url = storage.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AvatarError::InvalidConfig("storage base URL is empty".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url,
            service_key: storage.service_key.clone(),
            bucket: storage.bucket.clone(),
            downloads: Semaphore::new(download_concurrency.max(1)),
        })
    }

    #[must_use]
    pub fn public_url(&self, file_name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{file_name}",
            self.base_url, self.bucket
        )
    }

    /// True when `url` already points into this storage project.
    fn is_hosted(&self, url: &str) -> bool {
        url.starts_with(&self.base_url)
    }

    /// Creates the public bucket if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`AvatarError`] if the bucket lookup or creation fails.
    pub async fn ensure_bucket(&self) -> Result<(), AvatarError> {
        let lookup = self
            .http
            .get(format!("{}/storage/v1/bucket/{}", self.base_url, self.bucket))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await?;
        if lookup.status().is_success() {
            return Ok(());
        }

        let body = serde_json::json!({
            "id": self.bucket,
            "name": self.bucket,
            "public": true,
            "file_size_limit": MAX_AVATAR_BYTES,
            "allowed_mime_types": ["image/jpeg", "image/png", "image/webp", "image/gif"],
        });
        let created = self
            .http
            .post(format!("{}/storage/v1/bucket", self.base_url))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&body)
            .send()
            .await?;
        check_status(created).await?;
        tracing::info!(bucket = %self.bucket, "created avatar bucket");
        Ok(())
    }

    async fn download(&self, url: &str) -> Result<(Vec<u8>, String), AvatarError> {
        let _permit = self
            .downloads
            .acquire()
            .await
            .map_err(|_| AvatarError::InvalidConfig("download limiter closed".into()))?;

        let response = self
            .http
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(AvatarError::NotAnImage(content_type));
        }
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), content_type))
    }

    async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AvatarError> {
        let response = self
            .http
            .post(format!(
                "{}/storage/v1/object/{}/{file_name}",
                self.base_url, self.bucket
            ))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        check_status(response).await
    }

    async fn try_cache(&self, user_id: &str, original_url: &str) -> Result<String, AvatarError> {
        let (bytes, content_type) = self.download(original_url).await?;
        let file_name = avatar_file_name(user_id, original_url);
        self.upload(&file_name, bytes, &content_type).await?;
        Ok(self.public_url(&file_name))
    }
}

#[async_trait]
impl AvatarCache for SupabaseAvatarStore {
    async fn cache(&self, user_id: &str, original_url: &str) -> String {
        if original_url.is_empty() || self.is_hosted(original_url) {
            return original_url.to_string();
        }
        match self.try_cache(user_id, original_url).await {
            Ok(url) => {
                tracing::debug!(user_id, "avatar cached");
                url
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "avatar caching failed, keeping original URL");
                original_url.to_string()
            }
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), AvatarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(AvatarError::Status {
        status: status.as_u16(),
        body,
    })
}

/// `{user_id}_{first 8 hex chars of sha256(url)}.jpg`
pub(crate) fn avatar_file_name(user_id: &str, url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut name = String::with_capacity(user_id.len() + 13);
    name.push_str(user_id);
    name.push('_');
    for byte in &digest[..4] {
        let _ = write!(name, "{byte:02x}");
    }
    name.push_str(".jpg");
    name
}
