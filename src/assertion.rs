//! RS256 JWT assertions for the OAuth 2.0 JWT-bearer grant.
//!
//! An assertion is three base64url segments (no padding): a fixed header,
//! the claims, and an RSASSA-PKCS1-v1_5 / SHA-256 signature over
//! `header + "." + claims`. Assertions are built fresh for every outbound
//! exchange and never cached.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::credential::{AssertionSigner, ServiceCredential};
use crate::error::Error;

/// Seconds between `iat` and `exp`.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// JOSE header of every assertion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AssertionHeader {
    pub alg: String,
    pub typ: String,
}

impl Default for AssertionHeader {
    fn default() -> Self {
        Self {
            alg: "RS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Claims carried in the payload segment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AssertionClaims {
    /// Service identity issuing the assertion
    pub iss: String,
    /// Always equal to `iss`
    pub sub: String,
    /// Space-separated permission scopes requested
    pub scope: String,
    /// Token endpoint the assertion is addressed to
    pub aud: String,
    /// Unix seconds
    pub iat: i64,
    /// Unix seconds, `iat + 3600`
    pub exp: i64,
}

impl AssertionClaims {
    /// Fails with [`Error::Encoding`] when `issued_at` is too close to
    /// `i64::MAX` for an expiry to exist.
    pub fn new(issuer: &str, scope: &str, audience: &str, issued_at: i64) -> Result<Self, Error> {
        let exp = issued_at.checked_add(ASSERTION_LIFETIME_SECS).ok_or_else(|| {
            Error::Encoding(format!("issued-at {} leaves no room for an expiry", issued_at))
        })?;
        Ok(Self {
            iss: issuer.to_string(),
            sub: issuer.to_string(),
            scope: scope.to_string(),
            aud: audience.to_string(),
            iat: issued_at,
            exp,
        })
    }

    /// Parse a base64url payload segment back into claims.
    pub fn decode(segment: &str) -> Result<Self, Error> {
        let bytes = URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|e| Error::Encoding(format!("payload segment is not base64url: {}", e)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// A compact, signed assertion ready for the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedAssertion {
    claims: AssertionClaims,
    compact: String,
}

impl SignedAssertion {
    pub fn claims(&self) -> &AssertionClaims {
        &self.claims
    }

    /// The `header.payload.signature` form sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.compact
    }

    /// The three segments in order.
    pub fn segments(&self) -> (&str, &str, &str) {
        let mut parts = self.compact.splitn(3, '.');
        let header = parts.next().unwrap_or_default();
        let payload = parts.next().unwrap_or_default();
        let signature = parts.next().unwrap_or_default();
        (header, payload, signature)
    }
}

// The compact form is a credential in its own right until `exp`.
impl fmt::Debug for SignedAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedAssertion")
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

/// Builds assertions on behalf of one service credential.
#[derive(Debug)]
pub struct AssertionBuilder {
    issuer: String,
    signer: AssertionSigner,
}

impl AssertionBuilder {
    /// Validate the credential and import its signing key.
    ///
    /// # Errors
    ///
    /// [`Error::Encoding`] for empty credential fields, [`Error::KeyImport`]
    /// when the key is not a PKCS#8 RSA private key.
    pub fn new(credential: &ServiceCredential) -> Result<Self, Error> {
        credential.validate()?;
        let signer = AssertionSigner::from_pem(credential.signing_key_pem())?;
        Ok(Self {
            issuer: credential.issuer().to_string(),
            signer,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Fingerprint of the signing key's public half.
    pub fn key_id(&self) -> &str {
        self.signer.key_id()
    }

    /// Build an assertion issued at the current wall-clock second.
    pub fn build(&self, scope: &str, audience: &str) -> Result<SignedAssertion, Error> {
        self.build_at(scope, audience, Utc::now().timestamp())
    }

    /// Build an assertion issued at `issued_at` (Unix seconds).
    pub fn build_at(
        &self,
        scope: &str,
        audience: &str,
        issued_at: i64,
    ) -> Result<SignedAssertion, Error> {
        if scope.trim().is_empty() {
            return Err(Error::Encoding("scope must not be empty".to_string()));
        }
        if audience.trim().is_empty() {
            return Err(Error::Encoding("audience must not be empty".to_string()));
        }

        let header = encode_segment(&AssertionHeader::default())?;
        let claims = AssertionClaims::new(&self.issuer, scope, audience, issued_at)?;
        let payload = encode_segment(&claims)?;

        let signing_input = format!("{}.{}", header, payload);
        let signature = URL_SAFE_NO_PAD.encode(self.signer.sign(signing_input.as_bytes())?);

        Ok(SignedAssertion {
            claims,
            compact: format!("{}.{}", signing_input, signature),
        })
    }
}

/// One-shot helper: import the credential's key and build a single assertion.
pub fn build_assertion(
    credential: &ServiceCredential,
    scope: &str,
    audience: &str,
) -> Result<SignedAssertion, Error> {
    AssertionBuilder::new(credential)?.build(scope, audience)
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, Error> {
    Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(value)?))
}
