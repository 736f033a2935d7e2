//! Google Cloud Storage writes: media upload, existence checks, and folder
//! marker objects.

use thiserror::Error;

use crate::auth::{self, ServiceAccountKey};

const API_BASE: &str = "https://storage.googleapis.com/storage/v1";
const UPLOAD_BASE: &str = "https://storage.googleapis.com/upload/storage/v1";
pub const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

#[derive(Error, Debug)]
pub enum GcsError {
    #[error("gcs authentication failed: {0}")]
    Auth(String),
    #[error("gcs request failed ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct GcsClient {
    http: reqwest::Client,
    token: String,
    bucket: String,
}

impl GcsClient {
    /// Authenticate with GCS using the service account. One handshake per
    /// request.
    pub async fn connect(
        http: reqwest::Client,
        key: &ServiceAccountKey,
        bucket: String,
    ) -> Result<Self, GcsError> {
        let token = auth::access_token(&http, key, STORAGE_SCOPE)
            .await
            .map_err(|e| GcsError::Auth(e.to_string()))?;
        tracing::debug!("gcs authentication successful");
        Ok(Self { http, token, bucket })
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, GcsError> {
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(GcsError::Api { status, body });
        }
        Ok(resp)
    }

    /// Upload `content` to `object_key`, overwriting any existing object
    /// unconditionally.
    pub async fn upload(
        &self,
        object_key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), GcsError> {
        let url = format!(
            "{}/b/{}/o",
            UPLOAD_BASE,
            urlencoding::encode(&self.bucket)
        );
        let content_type = if content_type.is_empty() {
            "application/octet-stream"
        } else {
            content_type
        };

        let size = content.len();
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .query(&[("uploadType", "media"), ("name", object_key)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await?;

        Self::check(resp).await?;
        tracing::info!(key = object_key, bytes = size, "uploaded to gcs");
        Ok(())
    }

    /// Check whether an object exists at `object_key`.
    pub async fn exists(&self, object_key: &str) -> Result<bool, GcsError> {
        let url = format!(
            "{}/b/{}/o/{}",
            API_BASE,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(object_key)
        );
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("fields", "name")])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::check(resp).await?;
        Ok(true)
    }

    /// Create a zero-byte `folder_path/` marker object if one is not already
    /// present. Some browsers need these to render the directory tree.
    pub async fn ensure_folder_marker(&self, folder_path: &str) -> Result<(), GcsError> {
        if folder_path.is_empty() || folder_path == "/" {
            return Ok(());
        }

        let marker = format!("{}/", folder_path.trim_end_matches('/'));
        if !self.exists(&marker).await? {
            self.upload(&marker, Vec::new(), "application/octet-stream")
                .await?;
            tracing::info!(folder = %marker, "created gcs folder marker");
        }
        Ok(())
    }
}
