//! Token verification errors.

use thiserror::Error;

/// Errors surfaced by the SSO client.
///
/// The first three variants are the caller-facing outcomes of verification and
/// code exchange. They are recoverable: the caller decides whether to prompt
/// for re-authentication. Cache-entry expiry is never reported as an error.
#[derive(Debug, Error)]
pub enum SsoError {
    /// Token is malformed, has the wrong shape, or could not be verified.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token is well-formed but its own validity window has passed.
    #[error("Token expired: {0}")]
    TokenExpired(String),

    /// Authorization code was rejected by the SSO server.
    #[error("Invalid authorization code: {0}")]
    InvalidCode(String),

    /// Client configuration is incomplete or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SsoError {
    /// Returns `true` for [`SsoError::InvalidToken`].
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, SsoError::InvalidToken(_))
    }

    /// Returns `true` for [`SsoError::TokenExpired`].
    pub fn is_token_expired(&self) -> bool {
        matches!(self, SsoError::TokenExpired(_))
    }

    /// Returns `true` for [`SsoError::InvalidCode`].
    pub fn is_invalid_code(&self) -> bool {
        matches!(self, SsoError::InvalidCode(_))
    }
}

impl From<jsonwebtoken::errors::Error> for SsoError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => SsoError::TokenExpired("exp claim has passed".into()),
            ErrorKind::InvalidSignature => SsoError::InvalidToken("signature mismatch".into()),
            _ => SsoError::InvalidToken(err.to_string()),
        }
    }
}

/// A convenience result type for SSO client operations.
pub type Result<T> = std::result::Result<T, SsoError>;
