//! Login and refresh-token wire types
//!
//! Both endpoints answer with the same token pair shape. A 2xx response whose
//! body is not a pair of non-empty tokens is treated as malformed; the gateway
//! handles that exactly like a failed refresh.

use common::Secret;
use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// Body of `POST /api/v1/auth/login`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /api/v1/auth/refresh-token`.
#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Token pair returned by login and refresh.
#[derive(Debug, Deserialize)]
pub struct TokenPair {
    pub access_token: Secret<String>,
    pub refresh_token: Secret<String>,
}

impl TokenPair {
    /// Parse and validate a token endpoint response body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let pair: TokenPair = serde_json::from_slice(body)
            .map_err(|e| Error::MalformedTokens(format!("invalid token response: {e}")))?;
        if pair.access_token.is_empty() {
            return Err(Error::MalformedTokens("empty access_token".into()));
        }
        if pair.refresh_token.is_empty() {
            return Err(Error::MalformedTokens("empty refresh_token".into()));
        }
        Ok(pair)
    }

    pub fn into_credentials(self) -> Credentials {
        Credentials {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_pair_parses() {
        let pair = TokenPair::parse(br#"{"access_token":"A2","refresh_token":"R2"}"#).unwrap();
        let creds = pair.into_credentials();
        assert_eq!(creds, Credentials::new("A2", "R2"));
        assert!(creds.is_logged_in());
    }

    #[test]
    fn token_pair_ignores_extra_fields() {
        let body = br#"{"access_token":"A2","refresh_token":"R2","token_type":"bearer"}"#;
        assert!(TokenPair::parse(body).is_ok());
    }

    #[test]
    fn missing_token_is_malformed() {
        let err = TokenPair::parse(br#"{"access_token":"A2"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedTokens(_)), "got: {err}");
    }

    #[test]
    fn empty_token_is_malformed() {
        let err = TokenPair::parse(br#"{"access_token":"","refresh_token":"R2"}"#).unwrap_err();
        assert!(err.to_string().contains("empty access_token"), "got: {err}");
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(TokenPair::parse(b"<html>bad gateway</html>").is_err());
    }

    #[test]
    fn request_bodies_use_snake_case_keys() {
        let refresh = serde_json::to_value(RefreshRequest { refresh_token: "R1" }).unwrap();
        assert_eq!(refresh, serde_json::json!({ "refresh_token": "R1" }));

        let login = serde_json::to_value(LoginRequest {
            email: "admin@smartgas.mx",
            password: "hunter2",
        })
        .unwrap();
        assert_eq!(
            login,
            serde_json::json!({ "email": "admin@smartgas.mx", "password": "hunter2" })
        );
    }
}
