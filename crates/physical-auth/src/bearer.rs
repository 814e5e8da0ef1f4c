//! `Authorization: Bearer` header parsing.

use crate::error::{AuthError, AuthResult};

/// Extract the token from an `Authorization` header value.
///
/// A missing header or one that is not `Bearer <token>` is a request-format
/// error, not an authentication failure.
pub fn bearer_token(header: Option<&str>) -> AuthResult<&str> {
    let value = header
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::MalformedRequest("Missing Authorization header".to_string()))?;

    let malformed =
        || AuthError::MalformedRequest("Authorization header must be `Bearer <token>`".to_string());

    let (scheme, token) = value.split_once(' ').ok_or_else(malformed)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(malformed());
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(malformed());
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token(Some("bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(Some("  Bearer   abc  ")).unwrap(), "abc");
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(bearer_token(None), Err(AuthError::MalformedRequest(_))));
        assert!(matches!(bearer_token(Some("  ")), Err(AuthError::MalformedRequest(_))));
    }

    #[test]
    fn test_wrong_scheme() {
        assert!(matches!(
            bearer_token(Some("Basic dXNlcjpwYXNz")),
            Err(AuthError::MalformedRequest(_))
        ));
        assert!(matches!(
            bearer_token(Some("abc.def.ghi")),
            Err(AuthError::MalformedRequest(_))
        ));
        assert!(matches!(
            bearer_token(Some("Bearer abc def")),
            Err(AuthError::MalformedRequest(_))
        ));
    }
}
