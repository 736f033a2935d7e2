//! Google Drive access: metadata lookup, content download, and native
//! document export.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{self, ServiceAccountKey};

const API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("drive authentication failed: {0}")]
    Auth(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("drive request failed ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Metadata for a Drive file or folder, fetched fresh per request.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }

    /// Multi-parent files are resolved through their first parent only.
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Metadata-lookup capability consumed by the path resolver.
#[async_trait]
pub trait MetadataLookup {
    async fn metadata(&self, file_id: &str) -> Result<DriveFile, DriveError>;
}

pub struct DriveClient {
    http: reqwest::Client,
    token: String,
}

impl DriveClient {
    /// Authenticate with Drive using the service account. One handshake per
    /// request, no token reuse across requests.
    pub async fn connect(
        http: reqwest::Client,
        key: &ServiceAccountKey,
    ) -> Result<Self, DriveError> {
        let token = auth::access_token(&http, key, DRIVE_SCOPE)
            .await
            .map_err(|e| DriveError::Auth(e.to_string()))?;
        tracing::debug!("drive authentication successful");
        Ok(Self { http, token })
    }

    async fn check(resp: reqwest::Response, file_id: &str) -> Result<reqwest::Response, DriveError> {
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DriveError::NotFound(file_id.to_string()));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DriveError::Api { status, body });
        }
        Ok(resp)
    }

    /// Fetch name, parents and MIME type for a file or folder.
    pub async fn metadata(&self, file_id: &str) -> Result<DriveFile, DriveError> {
        let url = format!("{}/files/{}", API_BASE, urlencoding::encode(file_id));
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("fields", "id, name, parents, mimeType"),
                ("supportsAllDrives", "true"),
            ])
            .send()
            .await?;

        let resp = Self::check(resp, file_id).await?;
        Ok(resp.json().await?)
    }

    /// Download a file's bytes as stored.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        let url = format!("{}/files/{}", API_BASE, urlencoding::encode(file_id));
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await?;

        let resp = Self::check(resp, file_id).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    /// Export a native Google document as `export_mime`.
    pub async fn export(&self, file_id: &str, export_mime: &str) -> Result<Vec<u8>, DriveError> {
        let url = format!("{}/files/{}/export", API_BASE, urlencoding::encode(file_id));
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("mimeType", export_mime)])
            .send()
            .await?;

        let resp = Self::check(resp, file_id).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    /// List the immediate, non-trashed children of a folder.
    pub async fn list_children(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        let query = format!("'{}' in parents and trashed = false", folder_id);
        let resp = self
            .http
            .get(&format!("{}/files", API_BASE))
            .bearer_auth(&self.token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id, name, mimeType, parents)"),
                ("spaces", "drive"),
                ("pageSize", "100"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await?;

        let resp = Self::check(resp, folder_id).await?;
        let list: FileList = resp.json().await?;
        Ok(list.files)
    }
}

#[async_trait]
impl MetadataLookup for DriveClient {
    async fn metadata(&self, file_id: &str) -> Result<DriveFile, DriveError> {
        DriveClient::metadata(self, file_id).await
    }
}
