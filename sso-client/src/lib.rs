//! Client-side SSO / OAuth2 integration.
//!
//! Verifies access tokens and ID tokens issued by an SSO server and caches the
//! resulting [`Authentication`] until it expires, so a token presented on every
//! request costs a single verification per validity window.
//!
//! - JWT access tokens and ID tokens are verified locally against the server's
//!   published RS256 public key.
//! - Opaque bearer tokens are verified by the server's introspection endpoint.
//! - Authorization codes are exchanged at the token endpoint, uncached.
//!
//! Both collaborators sit behind traits, [`CacheProvider`] and
//! [`TokenProvider`], so either can be replaced.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sso_client::{extract_access_token, SsoClient, SsoConfig};
//!
//! let config = SsoConfig::builder()
//!     .client_id("my-app")
//!     .client_secret("secret")
//!     .redirect_uri("https://app.example.com/callback")
//!     .server_url("https://sso.example.com")
//!     .build()?;
//! let client = SsoClient::new(config);
//!
//! let token = extract_access_token(authorization_header).ok_or(Unauthorized)?;
//! let authc = client.verify_access_token(token).await?;
//! println!("User: {}", authc.user_id);
//! ```

pub mod cache;
pub mod claims;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod token;

pub use cache::{CacheProvider, InMemoryCacheProvider};
pub use claims::{Audience, TokenClaims};
pub use client::{SsoClient, SsoClientBuilder};
pub use config::{SsoConfig, SsoConfigBuilder};
pub use error::{Result, SsoError};
pub use model::{AccessToken, Authentication};
pub use provider::{HttpTokenProvider, HttpTokenProviderBuilder, PublicKeyCache, TokenProvider};
pub use token::{extract_access_token, is_jwt_token};
