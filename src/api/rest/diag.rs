//! Read-only diagnostic endpoints: service banner, auth health, single-file
//! path-resolution debugging, and a shared-folder listing.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::AppState;
use crate::auth::ServiceAccountKey;
use crate::drive::DriveClient;
use crate::gcs::GcsClient;
use crate::resolver::{object_key, Resolver};

use super::error::AppError;
use super::types::{FileDebugResponse, HealthResponse, ListFolderResponse};

pub fn diag_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/test", get(health_check))
        .route("/test-file/:file_id", get(debug_file))
        .route("/list-shared-folder", get(list_shared_folder))
}

async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "Drive to GCS mirror webhook handler",
        "status": "running",
        "endpoints": {
            "/test": "GET - Health check",
            "/webhook": "POST - Main webhook endpoint",
            "/test-file/<file_id>": "GET - Test file path resolution",
            "/list-shared-folder": "GET - List shared folder contents"
        }
    }))
}

/// Verify both service handshakes and shared-folder access.
async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    tracing::info!("running health check");

    let key = ServiceAccountKey::from_file(&state.config.key_file)?;
    let drive = DriveClient::connect(state.http.clone(), &key).await?;
    GcsClient::connect(
        state.http.clone(),
        &key,
        state.config.bucket_name.clone(),
    )
    .await?;

    // Access problems on the shared folder are reported, not fatal.
    let shared_folder = drive.metadata(&state.config.shared_folder_id).await.ok();

    Ok(Json(HealthResponse {
        status: "Service is running".into(),
        bucket: state.config.bucket_name.clone(),
        gcs_base_path: state.config.gcs_base_path.clone(),
        shared_folder_id: state.config.shared_folder_id.clone(),
        shared_folder_name: shared_folder
            .as_ref()
            .map(|f| f.name.clone())
            .unwrap_or_else(|| "Not accessible".into()),
        shared_folder_access: shared_folder.is_some(),
        service_account_email: key.client_email,
    }))
}

/// Resolve a single file's path without transferring anything.
async fn debug_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<FileDebugResponse>, AppError> {
    tracing::info!(file_id, "testing path resolution");

    let key = ServiceAccountKey::from_file(&state.config.key_file)?;
    let drive = DriveClient::connect(state.http.clone(), &key).await?;

    let metadata = drive.metadata(&file_id).await?;

    let resolver = Resolver::new(&drive, &state.config.shared_folder_id);
    let (chain, relative) = resolver.resolve(&file_id).await?;
    let relative =
        relative.ok_or_else(|| AppError::Internal("could not determine file path".into()))?;

    let should_process = state.filter.accept(&relative.folder_path);
    let gcs_path = object_key(
        &state.config.gcs_base_path,
        &relative.folder_path,
        &relative.file_name,
    );

    Ok(Json(FileDebugResponse {
        file_id,
        file_name: relative.file_name,
        full_drive_path: chain.full_path(),
        relative_path: relative.folder_path,
        should_process,
        gcs_path,
        metadata,
    }))
}

/// List the immediate children of the shared folder.
async fn list_shared_folder(
    State(state): State<AppState>,
) -> Result<Json<ListFolderResponse>, AppError> {
    tracing::info!("listing shared folder contents");

    let key = ServiceAccountKey::from_file(&state.config.key_file)?;
    let drive = DriveClient::connect(state.http.clone(), &key).await?;

    let items = drive.list_children(&state.config.shared_folder_id).await?;
    tracing::info!(count = items.len(), "found shared folder items");

    Ok(Json(ListFolderResponse {
        shared_folder_id: state.config.shared_folder_id.clone(),
        items_count: items.len(),
        items,
    }))
}
