//! Client configuration for the SSO server.

use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SsoError};

/// Static client configuration: credentials, callback and SSO endpoints.
///
/// The client only ever reads this; once endpoints are derived from a base
/// server URL they stay fixed for the lifetime of the config.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoConfig {
    /// Application (client) identifier.
    #[serde(default)]
    pub client_id: String,
    /// Application (client) secret.
    #[serde(default)]
    pub client_secret: String,
    /// Callback URL registered with the SSO server (`redirect_uri`).
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// URL serving the server's token signing public key.
    #[serde(default)]
    pub public_key_endpoint_url: String,
    /// URL issuing and verifying access tokens.
    #[serde(default)]
    pub token_endpoint_url: String,
    /// URL of the interactive login page.
    #[serde(default)]
    pub authorization_endpoint_url: String,
    /// URL of the single sign-out page.
    #[serde(default)]
    pub logout_endpoint_url: String,
}

impl SsoConfig {
    /// Create a config with client credentials and no endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Self::default()
        }
    }

    /// Create a config whose endpoints are derived from `server_url`.
    ///
    /// See [`SsoConfig::auto_configure_urls`].
    pub fn from_server_url(server_url: &str) -> Self {
        let mut config = Self::default();
        config.auto_configure_urls(server_url);
        config
    }

    /// Create a new builder.
    pub fn builder() -> SsoConfigBuilder {
        SsoConfigBuilder::default()
    }

    /// Derive all four endpoint URLs from the SSO server's base URL.
    ///
    /// One trailing `/` is stripped, then the fixed suffixes are appended:
    ///
    /// ```rust,ignore
    /// let mut config = SsoConfig::default();
    /// config.auto_configure_urls("https://sso.example.com/v3/oauth2/");
    /// assert_eq!(config.public_key_endpoint_url, "https://sso.example.com/v3/oauth2/publickey");
    /// ```
    pub fn auto_configure_urls(&mut self, base_url: &str) -> &mut Self {
        let base = base_url.strip_suffix('/').unwrap_or(base_url);
        self.public_key_endpoint_url = format!("{base}/publickey");
        self.token_endpoint_url = format!("{base}/oauth2/token");
        self.authorization_endpoint_url = format!("{base}/oauth2/authorize");
        self.logout_endpoint_url = format!("{base}/oauth2/logout");
        self
    }

    /// Build the login URL the user agent should be redirected to.
    pub fn authorization_url(&self, state: Option<&str>) -> Result<String> {
        let mut params = vec![("response_type", "code"), ("client_id", self.client_id.as_str())];
        if let Some(redirect_uri) = &self.redirect_uri {
            params.push(("redirect_uri", redirect_uri.as_str()));
        }
        if let Some(state) = state {
            params.push(("state", state));
        }
        endpoint_with_params(&self.authorization_endpoint_url, &params)
    }

    /// Build the single sign-out URL, optionally returning to `post_logout_redirect`.
    pub fn logout_url(&self, post_logout_redirect: Option<&str>) -> Result<String> {
        let params: Vec<(&str, &str)> = post_logout_redirect
            .map(|uri| vec![("post_logout_redirect_uri", uri)])
            .unwrap_or_default();
        endpoint_with_params(&self.logout_endpoint_url, &params)
    }

    /// Check that the fields the token provider relies on are present.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(SsoError::Config("client_id is required".into()));
        }
        if self.public_key_endpoint_url.is_empty() {
            return Err(SsoError::Config("public_key_endpoint_url is required".into()));
        }
        if self.token_endpoint_url.is_empty() {
            return Err(SsoError::Config("token_endpoint_url is required".into()));
        }
        Ok(())
    }
}

fn endpoint_with_params(endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| SsoError::Config(format!("invalid endpoint url '{endpoint}': {e}")))?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url.into())
}

impl fmt::Debug for SsoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SsoConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("public_key_endpoint_url", &self.public_key_endpoint_url)
            .field("token_endpoint_url", &self.token_endpoint_url)
            .field("authorization_endpoint_url", &self.authorization_endpoint_url)
            .field("logout_endpoint_url", &self.logout_endpoint_url)
            .finish()
    }
}

/// Builder for a validated [`SsoConfig`].
#[derive(Debug, Clone, Default)]
pub struct SsoConfigBuilder {
    config: SsoConfig,
}

impl SsoConfigBuilder {
    /// Set the client identifier.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = client_id.into();
        self
    }

    /// Set the client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.config.client_secret = client_secret.into();
        self
    }

    /// Set the registered callback URL.
    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.config.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Derive every endpoint from the SSO server's base URL.
    pub fn server_url(mut self, server_url: &str) -> Self {
        self.config.auto_configure_urls(server_url);
        self
    }

    /// Set the public key endpoint URL.
    pub fn public_key_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.config.public_key_endpoint_url = url.into();
        self
    }

    /// Set the token endpoint URL.
    pub fn token_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.config.token_endpoint_url = url.into();
        self
    }

    /// Set the authorization endpoint URL.
    pub fn authorization_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.config.authorization_endpoint_url = url.into();
        self
    }

    /// Set the logout endpoint URL.
    pub fn logout_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.config.logout_endpoint_url = url.into();
        self
    }

    /// Build the [`SsoConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`SsoError::Config`] if the client id, public key endpoint or
    /// token endpoint is missing.
    pub fn build(self) -> Result<SsoConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
