use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub bucket_name: String,
    /// Base prefix under which all mirrored objects land.
    pub gcs_base_path: String,
    /// Drive folder id anchoring relative-path computation.
    pub shared_folder_id: String,
    pub key_file: String,
    pub rest_port: u16,
    /// Fixed pause after a successful transfer, as a crude rate-limit guard.
    pub transfer_pause_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            bucket_name: std::env::var("BUCKET_NAME")
                .map_err(|_| anyhow::anyhow!("BUCKET_NAME environment variable must be set"))?,
            gcs_base_path: std::env::var("GCS_BASE_PATH")
                .map_err(|_| anyhow::anyhow!("GCS_BASE_PATH environment variable must be set"))?,
            shared_folder_id: std::env::var("SHARED_FOLDER_ID")
                .map_err(|_| anyhow::anyhow!("SHARED_FOLDER_ID environment variable must be set"))?,
            key_file: std::env::var("GCS_KEY_FILE")
                .unwrap_or_else(|_| "service-account-key.json".to_string()),
            rest_port: std::env::var("REST_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,
            transfer_pause_ms: std::env::var("TRANSFER_PAUSE_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()?,
        })
    }

    /// Materialize the service-account key file from `GCS_KEY_B64` if that
    /// variable is set. Leaves an existing key file alone otherwise.
    pub fn write_key_from_env(&self) -> anyhow::Result<()> {
        if let Ok(encoded) = std::env::var("GCS_KEY_B64") {
            let decoded = STANDARD
                .decode(encoded.trim())
                .map_err(|e| anyhow::anyhow!("GCS_KEY_B64 is not valid base64: {}", e))?;
            std::fs::write(&self.key_file, decoded)?;
            tracing::info!(path = %self.key_file, "wrote service account key from GCS_KEY_B64");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(key_file: &str) -> Config {
        Config {
            bucket_name: "bucket".into(),
            gcs_base_path: "prefix".into(),
            shared_folder_id: "root-id".into(),
            key_file: key_file.into(),
            rest_port: 5000,
            transfer_pause_ms: 0,
        }
    }

    // Single test because GCS_KEY_B64 is process-global state.
    #[test]
    fn key_material_handling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        let config = test_config(path.to_str().unwrap());

        // Valid base64 is decoded and written to the key file
        std::env::set_var("GCS_KEY_B64", STANDARD.encode(b"{\"client_email\":\"x\"}"));
        config.write_key_from_env().unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\"client_email\":\"x\"}");

        // Garbage is rejected
        std::env::set_var("GCS_KEY_B64", "not base64 !!!");
        assert!(config.write_key_from_env().is_err());

        // Absent variable is a no-op
        std::env::remove_var("GCS_KEY_B64");
        config.write_key_from_env().unwrap();
    }
}
