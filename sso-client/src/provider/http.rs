//! Default token provider talking to the SSO server over HTTP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{PublicKeyCache, TokenProvider};
use crate::claims::TokenClaims;
use crate::config::SsoConfig;
use crate::error::{Result, SsoError};
use crate::model::{
    AccessToken, Authentication, TokenResponse, expires_after, timestamp_to_datetime,
};
use crate::token::fingerprint;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_BEARER_TTL: Duration = Duration::from_secs(300);

/// [`TokenProvider`] backed by the SSO server's HTTP endpoints.
///
/// JWTs are verified locally against the server's RS256 public key, fetched
/// from the public key endpoint and cached. Opaque tokens are introspected at
/// `{token_endpoint}/introspect` unless another URL is configured.
pub struct HttpTokenProvider {
    config: Arc<SsoConfig>,
    client: reqwest::Client,
    public_keys: PublicKeyCache,
    introspection_url: String,
    default_bearer_ttl: Duration,
}

impl HttpTokenProvider {
    /// Create a provider with default settings.
    ///
    /// Use [`builder`](Self::builder) to surface HTTP client setup failures
    /// as errors instead.
    pub fn new(config: Arc<SsoConfig>) -> Self {
        let client = match build_client(DEFAULT_TIMEOUT) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Failed to build HTTP client, falling back to defaults");
                reqwest::Client::default()
            }
        };
        Self::with_client(config, client, None, None, DEFAULT_BEARER_TTL)
    }

    /// Create a new builder.
    pub fn builder(config: Arc<SsoConfig>) -> HttpTokenProviderBuilder {
        HttpTokenProviderBuilder {
            config,
            client: None,
            timeout: DEFAULT_TIMEOUT,
            refresh_interval: None,
            introspection_url: None,
            default_bearer_ttl: DEFAULT_BEARER_TTL,
        }
    }

    fn with_client(
        config: Arc<SsoConfig>,
        client: reqwest::Client,
        refresh_interval: Option<Duration>,
        introspection_url: Option<String>,
        default_bearer_ttl: Duration,
    ) -> Self {
        let mut public_keys = PublicKeyCache::new(&config.public_key_endpoint_url, client.clone());
        if let Some(interval) = refresh_interval {
            public_keys = public_keys.with_refresh_interval(interval);
        }
        let introspection_url = introspection_url.unwrap_or_else(|| {
            format!("{}/introspect", config.token_endpoint_url.trim_end_matches('/'))
        });

        Self {
            config,
            client,
            public_keys,
            introspection_url,
            default_bearer_ttl,
        }
    }

    /// The client configuration this provider uses.
    pub fn config(&self) -> &SsoConfig {
        &self.config
    }

    /// URL used to introspect opaque tokens.
    pub fn introspection_url(&self) -> &str {
        &self.introspection_url
    }

    /// Verify the signature and `exp` of a JWT and decode its claims.
    async fn decode_jwt(&self, token: &str) -> Result<TokenClaims> {
        let key = self.public_keys.get_key().await?;

        match decode_claims(token, &key) {
            Err(err) if matches!(err.kind(), ErrorKind::InvalidSignature) => {
                // the server may have rotated its key since we cached it
                match self.public_keys.refresh_after_mismatch().await? {
                    Some(fresh) => Ok(decode_claims(token, &fresh)?),
                    None => Err(err.into()),
                }
            }
            other => Ok(other?),
        }
    }

    async fn verify_jwt(
        &self,
        token: &str,
        kind: &str,
        check_audience: bool,
    ) -> Result<Authentication> {
        let claims = self.decode_jwt(token).await.inspect_err(|e| {
            debug!(token = fingerprint(token), error = %e, "{kind} rejected");
        })?;

        if check_audience
            && !claims.aud.is_none()
            && !claims.aud.contains(&self.config.client_id)
        {
            return Err(SsoError::InvalidToken(format!(
                "id token audience {:?} does not include client '{}'",
                claims.aud.as_vec(),
                self.config.client_id
            )));
        }

        let authc = Authentication::from_claims(claims)
            .ok_or_else(|| SsoError::InvalidToken("token carries no user identifier".into()))?;
        debug!(token = fingerprint(token), user_id = %authc.user_id, "{kind} verified");
        Ok(authc)
    }
}

fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

fn decode_claims(
    token: &str,
    key: &jsonwebtoken::DecodingKey,
) -> std::result::Result<TokenClaims, jsonwebtoken::errors::Error> {
    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::RS256);
    validation.validate_exp = true;
    // a token is expired the second its exp passes
    validation.leeway = 0;
    // audience is checked by the caller where it matters
    validation.validate_aud = false;
    jsonwebtoken::decode::<TokenClaims>(token, key, &validation).map(|data| data.claims)
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn verify_jwt_access_token(&self, token: &str) -> Result<Authentication> {
        self.verify_jwt(token, "access token", false).await
    }

    async fn verify_bearer_access_token(&self, token: &str) -> Result<Authentication> {
        let response = self
            .client
            .post(&self.introspection_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("token", token), ("token_type_hint", "access_token")])
            .send()
            .await
            .map_err(|e| SsoError::InvalidToken(format!("introspection request failed: {e}")))?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.map_err(|e| {
            SsoError::InvalidToken(format!("introspection response unreadable ({status}): {e}"))
        })?;

        if let Some(error) = OAuthErrorResponse::from_body(&body) {
            warn!(token = fingerprint(token), error = %error.error, "Bearer token rejected");
            return Err(error.into_token_error());
        }
        if !status.is_success() {
            return Err(SsoError::InvalidToken(format!(
                "introspection failed with {status}"
            )));
        }

        let introspection: IntrospectionResponse = serde_json::from_value(body)
            .map_err(|e| SsoError::InvalidToken(format!("introspection response invalid: {e}")))?;
        if !introspection.active {
            return Err(SsoError::InvalidToken("token is not active".into()));
        }

        let now = Utc::now();
        let expires_at = if introspection.claims.exp > 0 {
            timestamp_to_datetime(introspection.claims.exp)
        } else if let Some(expires_in) = introspection.expires_in {
            expires_after(now, expires_in)
        } else {
            let ttl = i64::try_from(self.default_bearer_ttl.as_secs()).unwrap_or(i64::MAX);
            expires_after(now, ttl)
        };
        if expires_at <= now {
            return Err(SsoError::TokenExpired("bearer token has expired".into()));
        }

        let mut authc = Authentication::from_claims(introspection.claims)
            .ok_or_else(|| SsoError::InvalidToken("token carries no user identifier".into()))?;
        authc.expires_at = expires_at;

        debug!(token = fingerprint(token), user_id = %authc.user_id, "bearer token verified");
        Ok(authc)
    }

    async fn verify_id_token(&self, token: &str) -> Result<Authentication> {
        self.verify_jwt(token, "id token", true).await
    }

    async fn obtain_access_token_by_code(&self, code: &str) -> Result<AccessToken> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        if let Some(redirect_uri) = &self.config.redirect_uri {
            form.push(("redirect_uri", redirect_uri.as_str()));
        }

        let response = self
            .client
            .post(&self.config.token_endpoint_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| SsoError::InvalidCode(format!("token request failed: {e}")))?;

        let status = response.status();
        let received_at = Utc::now();
        let body: serde_json::Value = response.json().await.map_err(|e| {
            SsoError::InvalidCode(format!("token response unreadable ({status}): {e}"))
        })?;

        if let Some(error) = OAuthErrorResponse::from_body(&body) {
            warn!(error = %error.error, "Authorization code rejected");
            return Err(error.into_code_error());
        }
        if !status.is_success() {
            return Err(SsoError::InvalidCode(format!(
                "token request failed with {status}"
            )));
        }

        let token: TokenResponse = serde_json::from_value(body)
            .map_err(|e| SsoError::InvalidCode(format!("token response invalid: {e}")))?;
        debug!(expires_in = ?token.expires_in, "Authorization code exchanged");
        Ok(token.into_access_token(received_at))
    }
}

/// Builder for [`HttpTokenProvider`].
pub struct HttpTokenProviderBuilder {
    config: Arc<SsoConfig>,
    client: Option<reqwest::Client>,
    timeout: Duration,
    refresh_interval: Option<Duration>,
    introspection_url: Option<String>,
    default_bearer_ttl: Duration,
}

impl HttpTokenProviderBuilder {
    /// Use a preconfigured HTTP client. Overrides [`timeout`](Self::timeout).
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the per-request timeout (default 10s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how long a fetched public key is trusted (default 1h).
    pub fn public_key_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Override the opaque token introspection URL.
    pub fn introspection_url(mut self, url: impl Into<String>) -> Self {
        self.introspection_url = Some(url.into());
        self
    }

    /// Lifetime given to bearer tokens whose introspection carries no expiry (default 5m).
    pub fn default_bearer_ttl(mut self, ttl: Duration) -> Self {
        self.default_bearer_ttl = ttl;
        self
    }

    /// Build the provider.
    pub fn build(self) -> Result<HttpTokenProvider> {
        self.config.validate()?;
        let client = match self.client {
            Some(client) => client,
            None => build_client(self.timeout)
                .map_err(|e| SsoError::Config(format!("http client: {e}")))?,
        };
        Ok(HttpTokenProvider::with_client(
            self.config,
            client,
            self.refresh_interval,
            self.introspection_url,
            self.default_bearer_ttl,
        ))
    }
}

/// Token introspection response.
#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(flatten)]
    claims: TokenClaims,
}

fn default_active() -> bool {
    true
}

/// OAuth2 error body (`{"error": ..., "error_description": ...}`).
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthErrorResponse {
    fn from_body(body: &serde_json::Value) -> Option<Self> {
        body.get("error")?;
        serde_json::from_value(body.clone()).ok()
    }

    fn mentions_expiry(&self) -> bool {
        self.error.contains("expired")
            || self
                .error_description
                .as_deref()
                .is_some_and(|d| d.to_ascii_lowercase().contains("expired"))
    }

    fn message(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{}: {description}", self.error),
            None => self.error.clone(),
        }
    }

    fn into_token_error(self) -> SsoError {
        if self.mentions_expiry() {
            SsoError::TokenExpired(self.message())
        } else {
            SsoError::InvalidToken(self.message())
        }
    }

    fn into_code_error(self) -> SsoError {
        if self.error == "invalid_grant" && self.mentions_expiry() {
            SsoError::TokenExpired(self.message())
        } else {
            SsoError::InvalidCode(self.message())
        }
    }
}
