//! Service-account authentication for the Google APIs.
//!
//! Each request mints a fresh bearer token: an RS256-signed JWT assertion is
//! exchanged at the key's token endpoint for a short-lived access token.
//! Nothing is cached between requests.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Assertion lifetime in minutes. Google caps this at one hour.
const ASSERTION_MINUTES: i64 = 10;

#[derive(Clone, Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read service account key {}: {}", path, e))?;
        let key = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid service account key {}: {}", path, e))?;
        Ok(key)
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Sign the JWT assertion for the given scope.
fn sign_assertion(key: &ServiceAccountKey, scope: &str) -> anyhow::Result<String> {
    let now = Utc::now();
    let claims = Claims {
        iss: &key.client_email,
        scope,
        aud: &key.token_uri,
        exp: (now + Duration::minutes(ASSERTION_MINUTES)).timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::RS256),
        &claims,
        &EncodingKey::from_rsa_pem(key.private_key.as_bytes())?,
    )?;

    Ok(token)
}

/// Exchange a signed assertion for a bearer token scoped to `scope`.
pub async fn access_token(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
    scope: &str,
) -> anyhow::Result<String> {
    let assertion = sign_assertion(key, scope)?;

    let resp = http
        .post(&key.token_uri)
        .form(&[
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("token exchange failed ({}): {}", status, body);
    }

    let token: TokenResponse = resp.json().await?;
    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_parses_with_default_token_uri() {
        let key: ServiceAccountKey = serde_json::from_str(
            r#"{"client_email": "svc@example.iam.gserviceaccount.com", "private_key": "pem"}"#,
        )
        .unwrap();
        assert_eq!(key.client_email, "svc@example.iam.gserviceaccount.com");
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn missing_key_file_reports_path() {
        let err = ServiceAccountKey::from_file("/nonexistent/key.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/key.json"));
    }

    #[test]
    fn garbage_pem_fails_signing() {
        let key = ServiceAccountKey {
            client_email: "svc@example.com".into(),
            private_key: "not a pem".into(),
            token_uri: default_token_uri(),
        };
        assert!(sign_assertion(&key, "scope").is_err());
    }
}
