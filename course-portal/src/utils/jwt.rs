use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid JWT format")]
    Malformed,
    #[error("Failed to decode JWT payload: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("Failed to parse JWT claims: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Claims the identity service puts in its access tokens.
#[derive(Debug, Deserialize)]
pub struct TokenClaims {
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// Decode JWT claims without validation.
///
/// Only used to describe the stored session to the user; the server remains
/// the sole judge of whether a token is valid.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        return Err(TokenError::Malformed);
    }

    let payload = general_purpose::URL_SAFE_NO_PAD.decode(parts[1].trim_end_matches('='))?;
    Ok(serde_json::from_slice(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &str) -> String {
        format!(
            "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.{}.signature",
            general_purpose::URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_decode_access_token_claims() {
        let token = token_with(
            r#"{"token_type":"access","exp":1893456000,"iat":1893455700,"jti":"abc","user_id":1,"role":"STUDENT"}"#,
        );

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.user_id, Some(1));
        assert_eq!(claims.role.as_deref(), Some("STUDENT"));
        assert_eq!(claims.token_type.as_deref(), Some("access"));
        assert_eq!(
            claims.expires_at().map(|t| t.to_rfc3339()),
            Some("2030-01-01T00:00:00+00:00".to_string())
        );
        assert!(!claims.is_expired_at(DateTime::from_timestamp(1893455999, 0).unwrap()));
        assert!(claims.is_expired_at(DateTime::from_timestamp(1893456000, 0).unwrap()));
    }

    #[test]
    fn test_rejects_opaque_token() {
        assert!(matches!(decode_claims("A1"), Err(TokenError::Malformed)));
        assert!(matches!(
            decode_claims("a.@@@.c"),
            Err(TokenError::Encoding(_))
        ));
    }
}
