//! Helpers for raw token strings.

/// Whether `token` looks like a JWT (contains a `.` segment separator).
///
/// This only routes a token to the JWT or the opaque verification path. It
/// says nothing about validity and must not be used as a security check; the
/// chosen provider operation still verifies the token in full.
pub fn is_jwt_token(token: &str) -> bool {
    token.contains('.')
}

/// Extract the credential from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively. Returns `None` for other schemes
/// or an empty credential.
pub fn extract_access_token(authorization: &str) -> Option<&str> {
    let (scheme, credential) = authorization.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let credential = credential.trim();
    (!credential.is_empty()).then_some(credential)
}

/// Short, log-safe prefix of a token.
pub(crate) fn fingerprint(token: &str) -> &str {
    match token.char_indices().nth(8) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}
