//! Results of token verification and code exchange.

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::claims::TokenClaims;

/// The verified identity behind a token.
///
/// Immutable once built. The cache keeps its own copy keyed by the raw token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authentication {
    /// User identifier.
    pub user_id: String,
    /// Login name, when the server supplies one.
    pub username: Option<String>,
    /// Client the token was issued to.
    pub client_id: Option<String>,
    /// Space separated granted scopes.
    pub scope: Option<String>,
    /// Absolute instant after which this record must not be used.
    pub expires_at: DateTime<Utc>,
    /// All claims the token carried.
    #[serde(default)]
    pub claims: HashMap<String, serde_json::Value>,
}

impl Authentication {
    /// Create a record with no optional attributes.
    pub fn new(user_id: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            username: None,
            client_id: None,
            scope: None,
            expires_at,
            claims: HashMap::new(),
        }
    }

    /// Build a record from decoded token claims.
    ///
    /// Returns `None` when the claims carry no user identifier.
    pub fn from_claims(claims: TokenClaims) -> Option<Self> {
        let user_id = claims.user_id()?.to_string();
        let client_id = claims.client_id().map(str::to_string);
        let expires_at = timestamp_to_datetime(claims.exp);
        let all_claims = match serde_json::to_value(&claims) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => HashMap::new(),
        };

        Some(Self {
            user_id,
            username: claims.username,
            client_id,
            scope: claims.scope,
            expires_at,
            claims: all_claims,
        })
    }

    /// Whether the record's own expiry instant has been reached.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Granted scopes as individual values.
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Tokens returned by an authorization code exchange.
///
/// Ownership passes to the caller; the client never caches these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    /// The raw access token.
    pub access_token: String,
    /// The raw refresh token, if one was issued.
    pub refresh_token: Option<String>,
    /// Absolute expiry of the access token.
    pub expires_at: DateTime<Utc>,
    /// Token type, normally `Bearer`.
    pub token_type: String,
}

impl AccessToken {
    /// Whether the access token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Raw token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Convert to an [`AccessToken`], anchoring `expires_in` at `received_at`.
    pub fn into_access_token(self, received_at: DateTime<Utc>) -> AccessToken {
        // servers that omit expires_in get the OAuth2 customary hour
        let expires_in = self.expires_in.unwrap_or(3600);
        AccessToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: expires_after(received_at, expires_in),
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
        }
    }
}

pub(crate) fn timestamp_to_datetime(secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(|s| Utc.timestamp_opt(s, 0).single())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `from + secs`, saturating at the representable range.
///
/// Lifetimes come from remote servers and may be arbitrarily large.
pub(crate) fn expires_after(from: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    Duration::try_seconds(secs)
        .and_then(|delta| from.checked_add_signed(delta))
        .unwrap_or(if secs < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}
