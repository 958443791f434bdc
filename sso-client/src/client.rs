//! The client entry point.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::cache::{CacheProvider, InMemoryCacheProvider};
use crate::config::SsoConfig;
use crate::error::{Result, SsoError};
use crate::model::{AccessToken, Authentication};
use crate::provider::{HttpTokenProvider, TokenProvider};
use crate::token::{fingerprint, is_jwt_token};

/// Entry point for verifying SSO tokens.
///
/// Verified authentications are cached by raw token until they expire, so a
/// token presented repeatedly costs one verification per validity window.
/// The client is `Send + Sync`; share one instance across request handlers.
///
/// Providers that were not injected through [`SsoClient::builder`] are created
/// on first use: an [`InMemoryCacheProvider`] and an [`HttpTokenProvider`].
///
/// # Example
///
/// ```rust,ignore
/// use sso_client::{SsoClient, SsoConfig};
///
/// let config = SsoConfig::builder()
///     .client_id("my-app")
///     .client_secret("secret")
///     .server_url("https://sso.example.com")
///     .build()?;
///
/// let client = SsoClient::new(config);
/// let authc = client.verify_access_token(token).await?;
/// println!("User: {}", authc.user_id);
/// ```
pub struct SsoClient {
    config: Arc<SsoConfig>,
    cache_provider: OnceLock<Arc<dyn CacheProvider>>,
    token_provider: OnceLock<Arc<dyn TokenProvider>>,
}

impl SsoClient {
    /// Create a client whose providers are built lazily from `config`.
    pub fn new(config: SsoConfig) -> Self {
        Self {
            config: Arc::new(config),
            cache_provider: OnceLock::new(),
            token_provider: OnceLock::new(),
        }
    }

    /// Create a builder for injecting providers.
    pub fn builder(config: SsoConfig) -> SsoClientBuilder {
        SsoClientBuilder {
            config,
            cache_provider: None,
            token_provider: None,
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &SsoConfig {
        &self.config
    }

    /// The cache provider, created on first call if none was injected.
    pub fn cache_provider(&self) -> &Arc<dyn CacheProvider> {
        self.cache_provider.get_or_init(|| {
            debug!("Creating default in-memory cache provider");
            Arc::new(InMemoryCacheProvider::new())
        })
    }

    /// The token provider, created on first call if none was injected.
    pub fn token_provider(&self) -> &Arc<dyn TokenProvider> {
        self.token_provider.get_or_init(|| {
            debug!("Creating default HTTP token provider");
            Arc::new(HttpTokenProvider::new(self.config.clone()))
        })
    }

    /// Verify an access token and return the authentication behind it.
    ///
    /// Tokens that look like JWTs are verified against the server's public
    /// key, anything else is verified remotely as an opaque bearer token.
    ///
    /// # Errors
    ///
    /// - [`SsoError::InvalidToken`] if the token is empty, malformed or rejected
    /// - [`SsoError::TokenExpired`] if the token's own expiry has passed
    pub async fn verify_access_token(&self, access_token: &str) -> Result<Authentication> {
        ensure_not_empty(access_token)?;

        if let Some(authc) = self.cached(access_token).await {
            return Ok(authc);
        }

        let authc = if is_jwt_token(access_token) {
            debug!(token = fingerprint(access_token), "Verifying JWT access token");
            self.token_provider().verify_jwt_access_token(access_token).await?
        } else {
            debug!(token = fingerprint(access_token), "Verifying bearer access token");
            self.token_provider().verify_bearer_access_token(access_token).await?
        };

        self.store(access_token, &authc).await;
        Ok(authc)
    }

    /// Verify the ID token obtained after login.
    ///
    /// ID tokens are always JWTs; an opaque value is rejected without a
    /// remote call.
    ///
    /// # Errors
    ///
    /// - [`SsoError::InvalidToken`] if the token is empty, not a JWT, or rejected
    /// - [`SsoError::TokenExpired`] if the token's own expiry has passed
    pub async fn verify_id_token(&self, id_token: &str) -> Result<Authentication> {
        ensure_not_empty(id_token)?;

        if let Some(authc) = self.cached(id_token).await {
            return Ok(authc);
        }

        if !is_jwt_token(id_token) {
            return Err(SsoError::InvalidToken(format!(
                "id token is not a JWT: {}",
                fingerprint(id_token)
            )));
        }

        let authc = self.token_provider().verify_id_token(id_token).await?;
        self.store(id_token, &authc).await;
        Ok(authc)
    }

    /// Exchange the authorization code received after login for an access token.
    ///
    /// Never cached: codes are single use and the returned token belongs to
    /// the caller.
    ///
    /// # Errors
    ///
    /// - [`SsoError::InvalidCode`] if the code is unknown, expired or consumed
    /// - [`SsoError::TokenExpired`] if the server reports the grant as expired
    pub async fn obtain_access_token_by_code(
        &self,
        authorization_code: &str,
    ) -> Result<AccessToken> {
        if authorization_code.is_empty() {
            return Err(SsoError::InvalidCode("authorization code is empty".into()));
        }
        self.token_provider()
            .obtain_access_token_by_code(authorization_code)
            .await
    }

    /// Return the cached authentication for `token`, evicting it if expired.
    async fn cached(&self, token: &str) -> Option<Authentication> {
        let cache = self.cache_provider();
        let authc = cache.get(token).await?;
        if !authc.is_expired() {
            debug!(token = fingerprint(token), "Authentication cache hit");
            return Some(authc);
        }

        debug!(token = fingerprint(token), "Evicting expired authentication");
        cache.remove(token).await;
        None
    }

    async fn store(&self, token: &str, authc: &Authentication) {
        self.cache_provider().put(token, authc.clone(), authc.expires_at).await;
    }
}

fn ensure_not_empty(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(SsoError::InvalidToken("token is empty".into()));
    }
    Ok(())
}

/// Builder for [`SsoClient`].
pub struct SsoClientBuilder {
    config: SsoConfig,
    cache_provider: Option<Arc<dyn CacheProvider>>,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl SsoClientBuilder {
    /// Use `provider` instead of the default in-memory cache.
    pub fn cache_provider(mut self, provider: Arc<dyn CacheProvider>) -> Self {
        self.cache_provider = Some(provider);
        self
    }

    /// Use `provider` instead of the default HTTP token provider.
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Build the client.
    pub fn build(self) -> SsoClient {
        let client = SsoClient::new(self.config);
        if let Some(provider) = self.cache_provider {
            let _ = client.cache_provider.set(provider);
        }
        if let Some(provider) = self.token_provider {
            let _ = client.token_provider.set(provider);
        }
        client
    }
}
