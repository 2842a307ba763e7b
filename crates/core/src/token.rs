//! Access tokens and request credentials
//!
//! Tokens are opaque to the servers' point of view, but the identity provider
//! issues JWTs, so the `exp` claim can be read locally to fail fast before a
//! request is sent.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Bearer token issued by the identity provider
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
}

impl AccessToken {
    /// Wrap a raw token string
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    /// Raw token, as sent in the `Authorization` header
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Expiry from the `exp` claim, in epoch seconds.
    ///
    /// Returns `Ok(None)` when the payload has no `exp` claim.
    pub fn expires_at(&self) -> Result<Option<i64>> {
        let mut parts = self.0.split('.');
        let (Some(_header), Some(payload), Some(_sig), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::InvalidToken(
                "expected three dot-separated segments".into(),
            ));
        };

        let decoded = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::InvalidToken(format!("payload is not base64: {e}")))?;
        let claims: Claims = serde_json::from_slice(&decoded)
            .map_err(|e| Error::InvalidToken(format!("payload is not JSON: {e}")))?;

        Ok(claims.exp)
    }

    /// Whether `exp` lies before `now` (epoch seconds)
    pub fn is_expired_at(&self, now: i64) -> Result<bool> {
        Ok(self.expires_at()?.is_some_and(|exp| now > exp))
    }

    /// Fail with [`Error::TokenExpired`] if the token is past its expiry
    pub fn ensure_valid(&self) -> Result<()> {
        if self.is_expired_at(jiff::Timestamp::now().as_second())? {
            return Err(Error::TokenExpired);
        }
        Ok(())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(****)")
    }
}

/// How requests are authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>` on every non-signed request
    Bearer(AccessToken),
    /// No authorization header at all (public buckets)
    Anonymous,
}

impl Credentials {
    /// Bearer credentials from a raw token
    pub fn bearer(raw: impl Into<String>) -> Self {
        Credentials::Bearer(AccessToken::new(raw))
    }

    /// Header value to send, if any
    pub fn authorization(&self) -> Option<String> {
        match self {
            Credentials::Bearer(token) => Some(format!("Bearer {}", token.as_str())),
            Credentials::Anonymous => None,
        }
    }

    /// The bearer token, if any
    pub fn token(&self) -> Option<&AccessToken> {
        match self {
            Credentials::Bearer(token) => Some(token),
            Credentials::Anonymous => None,
        }
    }
}

#[cfg(test)]
pub(crate) fn jwt_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"tester","exp":{exp}}}"#));
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_at_reads_claim() {
        let token = AccessToken::new(jwt_with_exp(1_700_000_000));
        assert_eq!(token.expires_at().unwrap(), Some(1_700_000_000));
    }

    #[test]
    fn test_is_expired_at() {
        let token = AccessToken::new(jwt_with_exp(1_000));
        assert!(token.is_expired_at(1_001).unwrap());
        assert!(!token.is_expired_at(1_000).unwrap());
        assert!(!token.is_expired_at(999).unwrap());
    }

    #[test]
    fn test_ensure_valid() {
        let past = AccessToken::new(jwt_with_exp(1));
        assert!(matches!(past.ensure_valid(), Err(Error::TokenExpired)));

        let future = AccessToken::new(jwt_with_exp(i64::from(i32::MAX) * 4));
        assert!(future.ensure_valid().is_ok());
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let raw = jwt_with_exp(42);
        let mut parts: Vec<String> = raw.split('.').map(String::from).collect();
        parts[1].push_str("==");
        let token = AccessToken::new(parts.join("."));
        assert_eq!(token.expires_at().unwrap(), Some(42));
    }

    #[test]
    fn test_malformed_token() {
        let token = AccessToken::new("not-a-jwt");
        assert!(matches!(token.expires_at(), Err(Error::InvalidToken(_))));

        let token = AccessToken::new("a.!!!.c");
        assert!(matches!(token.expires_at(), Err(Error::InvalidToken(_))));
    }

    #[test]
    fn test_missing_exp_is_not_expired() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#);
        let token = AccessToken::new(format!("{header}.{payload}.sig"));
        assert!(!token.is_expired_at(i64::MAX).unwrap());
    }

    #[test]
    fn test_credentials_authorization() {
        assert_eq!(
            Credentials::bearer("abc").authorization().as_deref(),
            Some("Bearer abc")
        );
        assert!(Credentials::Anonymous.authorization().is_none());
    }

    #[test]
    fn test_debug_hides_token() {
        let token = AccessToken::new("secret-value");
        assert!(!format!("{token:?}").contains("secret"));
    }
}
