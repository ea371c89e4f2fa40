// Redirect login callback handling

use url::Url;

use crate::error::{DebridError, Result};

/// Pull `access_token` out of an implicit-grant callback URL fragment
pub fn extract_fragment_token(callback: &str) -> Result<String> {
    let url = Url::parse(callback)?;
    let fragment = url.fragment().filter(|f| !f.is_empty()).ok_or(DebridError::InvalidResponse)?;

    url::form_urlencoded::parse(fragment.as_bytes())
        .find(|(key, _)| key == "access_token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
        .ok_or(DebridError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_fragment() {
        let token = extract_fragment_token("debrid://auth#access_token=abc123&token_type=Bearer&state=s").unwrap();
        assert_eq!(token, "abc123");
    }

    #[test]
    fn test_missing_fragment() {
        let err = extract_fragment_token("debrid://auth?code=1").unwrap_err();
        assert!(matches!(err, DebridError::InvalidResponse));
    }

    #[test]
    fn test_missing_token() {
        let err = extract_fragment_token("debrid://auth#error=access_denied").unwrap_err();
        assert!(matches!(err, DebridError::InvalidToken));
    }

    #[test]
    fn test_unparseable_url() {
        assert!(matches!(extract_fragment_token("not a url"), Err(DebridError::InvalidUrl)));
    }
}
