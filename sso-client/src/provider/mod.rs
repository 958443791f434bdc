//! Token provider trait and the default HTTP implementation.

mod http;
mod public_key;

pub use http::{HttpTokenProvider, HttpTokenProviderBuilder};
pub use public_key::PublicKeyCache;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{AccessToken, Authentication};

/// Performs the actual trust decision for a token or authorization code.
///
/// Every operation makes a single attempt. Retries and timeouts belong to the
/// transport underneath.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Verify a self-contained JWT access token.
    ///
    /// Fails with `InvalidToken` on a malformed token or signature mismatch and
    /// with `TokenExpired` when its `exp` claim has passed.
    async fn verify_jwt_access_token(&self, token: &str) -> Result<Authentication>;

    /// Verify an opaque bearer access token with the SSO server.
    ///
    /// A token whose validity cannot be confirmed, including on transport
    /// failure, fails with `InvalidToken`.
    async fn verify_bearer_access_token(&self, token: &str) -> Result<Authentication>;

    /// Verify a JWT ID token obtained after login.
    async fn verify_id_token(&self, token: &str) -> Result<Authentication>;

    /// Exchange an authorization code for an access token.
    ///
    /// Fails with `InvalidCode` when the code is unknown, consumed or otherwise
    /// rejected, and with `TokenExpired` when the grant has expired.
    async fn obtain_access_token_by_code(&self, code: &str) -> Result<AccessToken>;
}
