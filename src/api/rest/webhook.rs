//! Webhook endpoint: the main mirror pipeline.
//!
//! Each notification is handled synchronously end-to-end: authenticate both
//! services, fetch metadata, resolve the shared-root-relative path, download
//! (or export) the content, and upload it to the destination key.

use axum::{extract::State, routing::post, Json, Router};
use std::time::Duration;

use crate::api::AppState;
use crate::auth::ServiceAccountKey;
use crate::drive::DriveClient;
use crate::gcs::GcsClient;
use crate::resolver::{export_format, object_key, with_extension, Resolver};

use super::error::AppError;
use super::types::{MirrorResponse, SkippedResponse, WebhookOutcome, WebhookRequest};

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook", post(handle_webhook))
}

async fn handle_webhook(
    State(state): State<AppState>,
    Json(req): Json<WebhookRequest>,
) -> Result<Json<WebhookOutcome>, AppError> {
    let file_id = req
        .file_id()
        .ok_or_else(|| AppError::BadRequest("File ID not provided".into()))?
        .to_string();

    tracing::info!(file_id, name = req.file_name(), "processing webhook notification");

    // Per-request handshakes; nothing is reused across requests.
    let key = ServiceAccountKey::from_file(&state.config.key_file)?;
    let drive = DriveClient::connect(state.http.clone(), &key).await?;
    let gcs = GcsClient::connect(
        state.http.clone(),
        &key,
        state.config.bucket_name.clone(),
    )
    .await?;

    let metadata = drive.metadata(&file_id).await?;

    // Folders are mirrored implicitly through their children.
    if metadata.is_folder() {
        tracing::info!(folder = %metadata.name, "skipping folder");
        return Ok(Json(WebhookOutcome::Skipped(SkippedResponse {
            success: true,
            message: "Skipped folder - only processing files".into(),
            file_id: Some(file_id),
            file_name: None,
            path: None,
        })));
    }

    let resolver = Resolver::new(&drive, &state.config.shared_folder_id);
    let (_, relative) = resolver.resolve(&file_id).await?;
    let relative =
        relative.ok_or_else(|| AppError::Internal("could not determine file path".into()))?;

    tracing::info!(file = %relative.file_name, path = %relative.folder_path, "resolved drive path");

    if !state.filter.accept(&relative.folder_path) {
        tracing::info!(path = %relative.folder_path, "skipping file - not in target folder");
        return Ok(Json(WebhookOutcome::Skipped(SkippedResponse {
            success: true,
            message: "Skipped file - not in target folder".into(),
            file_id: None,
            file_name: Some(relative.file_name),
            path: Some(relative.folder_path),
        })));
    }

    // Native document types are exported; everything else is downloaded
    // verbatim.
    let (content, content_type, extension) = match export_format(&metadata.mime_type) {
        Some((export_mime, ext)) => (drive.export(&file_id, export_mime).await?, export_mime, ext),
        None => (
            drive.download(&file_id).await?,
            metadata.mime_type.as_str(),
            "",
        ),
    };

    let object_name = with_extension(&relative.file_name, extension);
    let destination = object_key(
        &state.config.gcs_base_path,
        &relative.folder_path,
        &object_name,
    );

    if !relative.folder_path.is_empty() {
        let folder = object_key(&state.config.gcs_base_path, "", &relative.folder_path);
        gcs.ensure_folder_marker(&folder).await?;
    }

    gcs.upload(&destination, content, content_type).await?;

    tracing::info!(file = %relative.file_name, key = %destination, "successfully mirrored");

    // Crude rate-limit guard between transfers.
    tokio::time::sleep(Duration::from_millis(state.config.transfer_pause_ms)).await;

    Ok(Json(WebhookOutcome::Mirrored(MirrorResponse {
        success: true,
        message: format!(
            "Successfully replicated: {} to {}",
            relative.file_name, destination
        ),
        file_name: relative.file_name,
        original_name: metadata.name,
        drive_path: relative.folder_path,
        gcs_path: destination,
        file_id,
        mime_type: metadata.mime_type,
    })))
}
