//! # newsroom-analytics
//!
//! Server-side analytics proxy for the newsroom CMS admin dashboard.
//!
//! The dashboard cannot hold the analytics service-account key, so this crate
//! does the authenticated work on its behalf:
//!
//! - **Assertion building**: sign an RS256 JWT assertion with the service
//!   account's PKCS#8 RSA key
//! - **Token exchange**: trade the assertion for a short-lived bearer token
//!   using the OAuth 2.0 JWT-bearer grant
//! - **Report query**: run the dashboard's fixed report with the bearer token
//! - **Request handling**: sequence the three and wrap the result in a
//!   `{ success, data | error }` envelope
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use newsroom_analytics::config::ProxyConfig;
//! use newsroom_analytics::handler::AnalyticsHandler;
//! use newsroom_analytics::source::EnvCredentialSource;
//!
//! # async fn run() -> Result<(), newsroom_analytics::Error> {
//! let config = ProxyConfig::from_env()?;
//! let handler = AnalyticsHandler::new(EnvCredentialSource::new(), config);
//!
//! let response = handler.handle().await;
//! println!("{} {}", response.status, response.to_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Security
//!
//! - Assertions are always really signed (RSASSA-PKCS1-v1_5 with SHA-256)
//! - Credentials, assertions and bearer tokens redact themselves in `Debug`
//!   output and are never logged
//! - Error messages leaving the handler are scrubbed of key material and tokens
//! - Nothing is cached: each request signs, exchanges and queries afresh
//!
//! ## Features
//!
//! - `fetch` (default): outbound token and report calls via `reqwest`
//! - `server`: axum router and the `newsroom-analytics` binary

pub mod assertion;
pub mod config;
pub mod credential;
pub mod error;
#[cfg(feature = "fetch")]
pub mod handler;
#[cfg(feature = "fetch")]
pub mod report;
#[cfg(feature = "server")]
pub mod server;
pub mod source;
#[cfg(feature = "fetch")]
pub mod token;
pub mod types;

#[cfg(test)]
mod test_support;

pub use error::{Error, ErrorKind};
