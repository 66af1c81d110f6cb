//! The analytics request handler.
//!
//! One invocation walks a linear pipeline:
//!
//! 1. load the service credential
//! 2. build and sign a fresh assertion
//! 3. exchange it for a bearer token
//! 4. run the dashboard report
//!
//! Any failure ends the invocation with a 500 envelope carrying a single
//! message. Nothing is shared between invocations.

use std::fmt;

use reqwest::StatusCode;

use crate::assertion::AssertionBuilder;
use crate::config::ProxyConfig;
use crate::credential::{pem_body, unescape_newlines};
use crate::error::Error;
use crate::report::{ReportQuery, ReportQueryClient, ReportResult};
use crate::source::CredentialSource;
use crate::token::TokenExchangeClient;
use crate::types::envelope::ResponseEnvelope;

const REDACTED: &str = "[REDACTED]";
/// PEM line fragments shorter than this are left in messages as-is.
const MIN_FRAGMENT_LEN: usize = 8;

/// Pipeline position of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    AssertionBuilt,
    TokenObtained,
    ReportFetched,
    Success,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Start => "start",
            Stage::AssertionBuilt => "assertion_built",
            Stage::TokenObtained => "token_obtained",
            Stage::ReportFetched => "report_fetched",
            Stage::Success => "success",
            Stage::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Status plus JSON envelope, ready for any HTTP layer.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub body: ResponseEnvelope,
}

impl HandlerResponse {
    pub fn ok(report: ReportResult) -> Self {
        Self {
            status: StatusCode::OK,
            body: ResponseEnvelope::success(report),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ResponseEnvelope::failure(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.body.success
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.body)?)
    }
}

/// Secret values seen during one invocation, scrubbed from outgoing messages.
#[derive(Default)]
pub struct Secrets {
    values: Vec<String>,
}

impl Secrets {
    /// Register a whole secret (token, assertion). Any non-empty value counts.
    pub fn add(&mut self, value: &str) {
        let value = value.trim();
        if !value.is_empty() && !self.values.iter().any(|v| v == value) {
            self.values.push(value.to_string());
        }
    }

    /// Register a PEM key in every form it might surface: raw, normalized
    /// body, and line by line.
    pub fn add_key(&mut self, pem: &str) {
        self.add(pem);
        self.add(&pem_body(pem));
        for line in unescape_newlines(pem).lines() {
            if !line.starts_with("-----") && line.trim().len() >= MIN_FRAGMENT_LEN {
                self.add(line);
            }
        }
    }

    pub fn redact(&self, message: &str) -> String {
        let mut values: Vec<&String> = self.values.iter().collect();
        values.sort_by_key(|v| std::cmp::Reverse(v.len()));
        values
            .into_iter()
            .fold(message.to_string(), |acc, secret| acc.replace(secret.as_str(), REDACTED))
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("count", &self.values.len())
            .finish()
    }
}

/// Entry point invoked by the dashboard's analytics tab.
pub struct AnalyticsHandler {
    source: Box<dyn CredentialSource>,
    config: ProxyConfig,
}

impl AnalyticsHandler {
    pub fn new(source: impl CredentialSource + 'static, config: ProxyConfig) -> Self {
        Self::from_boxed(Box::new(source), config)
    }

    pub fn from_boxed(source: Box<dyn CredentialSource>, config: ProxyConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the whole pipeline and map the outcome to a response.
    pub async fn handle(&self) -> HandlerResponse {
        self.handle_staged().await.1
    }

    /// Like [`handle`](Self::handle), also returning the terminal stage:
    /// [`Stage::Success`] or [`Stage::Failed`].
    pub async fn handle_staged(&self) -> (Stage, HandlerResponse) {
        let mut stage = Stage::Start;
        let mut secrets = Secrets::default();

        match self.run(&mut stage, &mut secrets).await {
            Ok(report) => {
                stage = Stage::Success;
                tracing::info!(
                    stage = %stage,
                    property_id = %self.config.property_id,
                    "analytics report relayed"
                );
                (stage, HandlerResponse::ok(report))
            }
            Err(e) => {
                let last_stage = stage;
                stage = Stage::Failed;
                let message = secrets.redact(&e.to_string());
                tracing::warn!(
                    stage = %stage,
                    last_stage = %last_stage,
                    kind = %e.kind(),
                    error = %message,
                    "analytics request failed"
                );
                (stage, HandlerResponse::failed(message))
            }
        }
    }

    async fn run(&self, stage: &mut Stage, secrets: &mut Secrets) -> Result<ReportResult, Error> {
        let assertion = {
            let credential = self.source.load()?;
            secrets.add_key(credential.signing_key_pem());

            let builder = AssertionBuilder::new(&credential)?;
            let assertion = builder.build(&self.config.scope, &self.config.token_url)?;
            secrets.add(assertion.as_str());
            tracing::debug!(
                source = self.source.name(),
                key_id = builder.key_id(),
                iat = assertion.claims().iat,
                "assertion built"
            );
            assertion
        };
        *stage = Stage::AssertionBuilt;

        let token = TokenExchangeClient::from_config(&self.config)
            .exchange(&assertion)
            .await?;
        secrets.add(token.secret());
        *stage = Stage::TokenObtained;

        let query = ReportQuery::trailing_30_days(&self.config.property_id);
        let report = ReportQueryClient::from_config(&self.config)
            .run_report(&token, &query)
            .await?;
        *stage = Stage::ReportFetched;

        Ok(report)
    }
}

impl fmt::Debug for AnalyticsHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsHandler")
            .field("source", &self.source.name())
            .field("config", &self.config)
            .finish()
    }
}
