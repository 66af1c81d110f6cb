//! Token exchange: trade a signed assertion for a bearer token.
//!
//! One form-encoded POST to the token endpoint using the JWT-bearer grant.
//! No retries; the caller decides whether to try again.

use std::fmt;
use std::time::Duration;

use crate::assertion::SignedAssertion;
use crate::config::{ProxyConfig, JWT_BEARER_GRANT};
use crate::error::Error;
use crate::types::token::{JwtBearerGrant, TokenResponse};

const GENERIC_EXCHANGE_FAILURE: &str = "token endpoint returned no access_token";

/// Short-lived access token. Never logged, never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    secret: String,
    expires_in: Option<u64>,
}

impl BearerToken {
    pub fn new(secret: impl Into<String>, expires_in: Option<u64>) -> Self {
        Self {
            secret: secret.into(),
            expires_in,
        }
    }

    /// The token value, for the `Authorization` header only.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Lifetime in seconds as reported by the authorization server.
    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("secret", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Turn a parsed token endpoint body into a token or an exchange error.
///
/// Without an `access_token`, the message is the server's `error_description`
/// verbatim, falling back to the `error` code, then to a generic message.
pub fn interpret_token_response(response: TokenResponse) -> Result<BearerToken, Error> {
    match response.access_token {
        Some(token) if !token.is_empty() => Ok(BearerToken::new(token, response.expires_in)),
        _ => {
            let message = response
                .error_description
                .filter(|d| !d.is_empty())
                .or(response.error.filter(|e| !e.is_empty()))
                .unwrap_or_else(|| GENERIC_EXCHANGE_FAILURE.to_string());
            Err(Error::AuthExchange(message))
        }
    }
}

/// Parse a token endpoint body, telling a non-JSON body apart from JSON that
/// is not an object.
pub fn parse_token_body(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<TokenResponse, Error> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|_| {
        Error::AuthExchange(format!(
            "token endpoint returned HTTP {} with a non-JSON body",
            status
        ))
    })?;
    serde_json::from_value(value).map_err(|_| {
        Error::AuthExchange(format!(
            "token endpoint returned HTTP {} with an unexpected JSON body",
            status
        ))
    })
}

/// Client for the OAuth token endpoint.
#[derive(Debug, Clone)]
pub struct TokenExchangeClient {
    token_url: String,
    timeout: Duration,
}

impl TokenExchangeClient {
    pub fn new(token_url: &str, timeout: Duration) -> Self {
        Self {
            token_url: token_url.to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(&config.token_url, config.timeout)
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Exchange `assertion` for a bearer token.
    ///
    /// # Errors
    ///
    /// [`Error::Network`] on transport failure or timeout, [`Error::AuthExchange`]
    /// when the body is not JSON or carries no `access_token`.
    pub async fn exchange(&self, assertion: &SignedAssertion) -> Result<BearerToken, Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        let grant = JwtBearerGrant {
            grant_type: JWT_BEARER_GRANT,
            assertion: assertion.as_str(),
        };

        let resp = client.post(&self.token_url).form(&grant).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        let token = interpret_token_response(parse_token_body(status, &body)?)?;
        tracing::debug!(
            status = status.as_u16(),
            expires_in = ?token.expires_in(),
            "bearer token obtained"
        );
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> TokenResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_access_token_present() {
        let token =
            interpret_token_response(response(r#"{"access_token":"abc","expires_in":3599}"#))
                .unwrap();
        assert_eq!(token.secret(), "abc");
        assert_eq!(token.expires_in(), Some(3599));
    }

    #[test]
    fn test_error_description_surfaces_verbatim() {
        let err = interpret_token_response(response(
            r#"{"error":"invalid_grant","error_description":"Invalid JWT Signature."}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, Error::AuthExchange(ref m) if m == "Invalid JWT Signature."));
    }

    #[test]
    fn test_error_code_fallback() {
        let err = interpret_token_response(response(r#"{"error":"unauthorized_client"}"#))
            .unwrap_err();
        assert!(err.to_string().contains("unauthorized_client"));
    }

    #[test]
    fn test_generic_failure() {
        let err = interpret_token_response(response("{}")).unwrap_err();
        assert!(matches!(err, Error::AuthExchange(ref m) if m == GENERIC_EXCHANGE_FAILURE));

        let err = interpret_token_response(response(r#"{"access_token":""}"#)).unwrap_err();
        assert!(matches!(err, Error::AuthExchange(_)));
    }

    #[test]
    fn test_parse_token_body_string_expires_in() {
        let parsed = parse_token_body(
            reqwest::StatusCode::OK,
            r#"{"access_token":"ya29.longtokenvalue","expires_in":"3599"}"#,
        )
        .unwrap();
        let token = interpret_token_response(parsed).unwrap();
        assert_eq!(token.secret(), "ya29.longtokenvalue");
        assert_eq!(token.expires_in(), Some(3599));
    }

    #[test]
    fn test_parse_token_body_distinguishes_shape_from_syntax() {
        let err = parse_token_body(reqwest::StatusCode::BAD_GATEWAY, "<html>oops</html>")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Token exchange failed: token endpoint returned HTTP 502 Bad Gateway with a non-JSON body"
        );

        let err = parse_token_body(reqwest::StatusCode::OK, r#"["ya29.abc"]"#).unwrap_err();
        assert!(matches!(err, Error::AuthExchange(ref m) if m.contains("unexpected JSON body")));
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = BearerToken::new("ya29.very-secret", Some(3600));
        let rendered = format!("{:?}", token);
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("3600"));
    }

    #[test]
    fn test_from_config() {
        let mut config = ProxyConfig::new("42");
        config.token_url = "http://127.0.0.1:1/token".to_string();
        let client = TokenExchangeClient::from_config(&config);
        assert_eq!(client.token_url(), "http://127.0.0.1:1/token");
    }
}
