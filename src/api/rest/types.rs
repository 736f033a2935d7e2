//! Shared request/response types for the REST surface.

use serde::{Deserialize, Serialize};

use crate::drive::DriveFile;

// ============================================================================
// WEBHOOK
// ============================================================================

/// Webhook body. Upstream notifiers are inconsistent about field names, so
/// both `file_id`/`id` and `file_name`/`name` are accepted.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl WebhookRequest {
    pub fn file_id(&self) -> Option<&str> {
        self.file_id.as_deref().or(self.id.as_deref())
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref().or(self.name.as_deref())
    }
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum WebhookOutcome {
    Skipped(SkippedResponse),
    Mirrored(MirrorResponse),
}

#[derive(Serialize)]
pub struct SkippedResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Serialize)]
pub struct MirrorResponse {
    pub success: bool,
    pub message: String,
    pub file_name: String,
    pub original_name: String,
    pub drive_path: String,
    pub gcs_path: String,
    pub file_id: String,
    pub mime_type: String,
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub bucket: String,
    pub gcs_base_path: String,
    pub shared_folder_id: String,
    pub shared_folder_name: String,
    pub shared_folder_access: bool,
    pub service_account_email: String,
}

#[derive(Serialize)]
pub struct FileDebugResponse {
    pub file_id: String,
    pub file_name: String,
    pub full_drive_path: String,
    pub relative_path: String,
    pub should_process: bool,
    pub gcs_path: String,
    pub metadata: DriveFile,
}

#[derive(Serialize)]
pub struct ListFolderResponse {
    pub shared_folder_id: String,
    pub items_count: usize,
    pub items: Vec<DriveFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_request_accepts_both_field_spellings() {
        let req: WebhookRequest =
            serde_json::from_str(r#"{"id": "abc", "name": "doc.txt"}"#).unwrap();
        assert_eq!(req.file_id(), Some("abc"));
        assert_eq!(req.file_name(), Some("doc.txt"));

        let req: WebhookRequest =
            serde_json::from_str(r#"{"file_id": "abc", "file_name": "doc.txt"}"#).unwrap();
        assert_eq!(req.file_id(), Some("abc"));
        assert_eq!(req.file_name(), Some("doc.txt"));

        let req: WebhookRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(req.file_id(), None);
    }

    #[test]
    fn explicit_field_wins_over_alias() {
        let req: WebhookRequest =
            serde_json::from_str(r#"{"file_id": "primary", "id": "alias"}"#).unwrap();
        assert_eq!(req.file_id(), Some("primary"));
    }
}
