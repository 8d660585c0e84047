//! Credential extraction

/// Extract the token from an `Authorization` header.
///
/// Both the `Bearer` and `Basic` schemes are accepted and the value after
/// the scheme is treated as an opaque session token. Scheme names are
/// case-sensitive.
pub fn extract_credential(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("Basic "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_credential() {
        assert_eq!(extract_credential("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_credential("Basic abc123"), Some("abc123"));
        assert_eq!(extract_credential("Bearer   abc123  "), Some("abc123"));
    }

    #[test]
    fn test_rejects_other_shapes() {
        assert_eq!(extract_credential("bearer abc123"), None);
        assert_eq!(extract_credential("Token abc123"), None);
        assert_eq!(extract_credential("Bearer "), None);
        assert_eq!(extract_credential("abc123"), None);
        assert_eq!(extract_credential(""), None);
    }
}
