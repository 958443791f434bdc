//! Caching of the SSO server's token signing key.

use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::{Result, SsoError};

/// Minimum spacing between forced refreshes after a signature mismatch.
const MIN_FORCED_REFRESH: Duration = Duration::from_secs(30);

/// Cached public key used to verify JWT signatures.
///
/// Refreshes the key when:
/// - Nothing has been fetched yet
/// - The refresh interval has passed
/// - A signature failed to verify and the key was not fetched moments ago
///   (key rotation)
pub struct PublicKeyCache {
    key: RwLock<Option<CachedKey>>,
    /// Public key endpoint URL.
    endpoint: String,
    refresh_interval: Duration,
    client: reqwest::Client,
}

struct CachedKey {
    key: DecodingKey,
    fetched_at: Instant,
}

impl PublicKeyCache {
    /// Create a new public key cache with a one hour refresh interval.
    pub fn new(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            key: RwLock::new(None),
            endpoint: endpoint.into(),
            refresh_interval: Duration::from_secs(3600),
            client,
        }
    }

    /// Create with custom refresh interval.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Get the decoding key, fetching it if missing or stale.
    pub async fn get_key(&self) -> Result<DecodingKey> {
        if let Some(cached) = self.key.read().await.as_ref() {
            if cached.fetched_at.elapsed() < self.refresh_interval {
                return Ok(cached.key.clone());
            }
        }
        self.refresh(self.refresh_interval).await
    }

    /// Refetch the key after a signature mismatch.
    ///
    /// Returns `None` when the current key is too fresh to have been rotated:
    /// younger than 30 seconds, or than the refresh interval if that is shorter.
    pub async fn refresh_after_mismatch(&self) -> Result<Option<DecodingKey>> {
        let min_age = MIN_FORCED_REFRESH.min(self.refresh_interval);
        {
            let guard = self.key.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.fetched_at.elapsed() < min_age {
                    return Ok(None);
                }
            }
        }
        self.refresh(min_age).await.map(Some)
    }

    /// Fetch the key unless another caller refreshed it within `fresh_for`.
    async fn refresh(&self, fresh_for: Duration) -> Result<DecodingKey> {
        let mut guard = self.key.write().await;
        if let Some(cached) = guard.as_ref() {
            if cached.fetched_at.elapsed() < fresh_for.min(self.refresh_interval) {
                return Ok(cached.key.clone());
            }
        }

        tracing::debug!("Fetching public key from {}", self.endpoint);

        let body = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| SsoError::InvalidToken(format!("public key fetch error: {e}")))?
            .text()
            .await
            .map_err(|e| SsoError::InvalidToken(format!("public key fetch error: {e}")))?;

        let key = parse_public_key(&body)?;
        *guard = Some(CachedKey {
            key: key.clone(),
            fetched_at: Instant::now(),
        });
        tracing::debug!("Public key cache refreshed");

        Ok(key)
    }
}

/// Public key endpoint response when the server wraps the PEM in JSON.
#[derive(Debug, Deserialize)]
struct PublicKeyResponse {
    #[serde(alias = "publicKey", alias = "public_key")]
    key: String,
}

/// Parse a PEM RSA public key, either raw or wrapped as `{"key": "<pem>"}`.
fn parse_public_key(body: &str) -> Result<DecodingKey> {
    let body = body.trim();
    let pem = if body.starts_with('{') {
        serde_json::from_str::<PublicKeyResponse>(body)
            .map_err(|e| SsoError::InvalidToken(format!("public key parse error: {e}")))?
            .key
    } else {
        body.to_string()
    };

    DecodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| SsoError::InvalidToken(format!("public key parse error: {e}")))
}
