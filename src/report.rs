//! Report query: run the dashboard's fixed report with a bearer token.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use crate::config::{run_report_url, ProxyConfig};
use crate::error::Error;
use crate::token::BearerToken;
use crate::types::report::{
    ApiErrorDetail, ApiErrorResponse, DateRange, Named, RunReportRequest,
};

/// Metrics requested by the dashboard, in order.
pub const DEFAULT_METRICS: [&str; 2] = ["activeUsers", "screenPageViews"];
/// Dimensions requested by the dashboard, in order.
pub const DEFAULT_DIMENSIONS: [&str; 2] = ["pageTitle", "pagePath"];
pub const DEFAULT_ROW_LIMIT: u32 = 10;

/// Whatever the reporting API returned, untouched.
pub type ReportResult = Value;

/// Parameters of a run-report call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub property_id: String,
    pub date_range_start: String,
    pub date_range_end: String,
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    pub row_limit: u32,
}

impl ReportQuery {
    /// The dashboard's query: last 30 days, top 10 pages by the default metrics.
    pub fn trailing_30_days(property_id: &str) -> Self {
        Self {
            property_id: property_id.to_string(),
            date_range_start: "30daysAgo".to_string(),
            date_range_end: "today".to_string(),
            metrics: DEFAULT_METRICS.iter().map(|m| m.to_string()).collect(),
            dimensions: DEFAULT_DIMENSIONS.iter().map(|d| d.to_string()).collect(),
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }

    /// Reject queries that would produce a malformed endpoint URL.
    pub fn validate(&self) -> Result<(), Error> {
        let id = self.property_id.trim();
        if id.is_empty() {
            return Err(Error::Encoding("property identifier must not be empty".to_string()));
        }
        if id.contains(['/', ':', '?', '#']) || id.chars().any(char::is_whitespace) {
            return Err(Error::Encoding(format!(
                "property identifier '{}' contains reserved characters",
                id
            )));
        }
        Ok(())
    }

    /// Wire body of the request.
    pub fn to_request(&self) -> RunReportRequest {
        RunReportRequest {
            date_ranges: vec![DateRange {
                start_date: self.date_range_start.clone(),
                end_date: self.date_range_end.clone(),
            }],
            metrics: self.metrics.iter().map(|m| Named::new(m)).collect(),
            dimensions: self.dimensions.iter().map(|d| Named::new(d)).collect(),
            limit: self.row_limit,
        }
    }
}

/// Describe a non-2xx reporting API response.
pub fn describe_api_error(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(|resp| {
            let ApiErrorDetail { message, status } = resp.error;
            message.filter(|m| !m.is_empty()).or(status)
        })
        .filter(|m| !m.is_empty());
    match detail {
        Some(message) => format!("reporting API returned HTTP {}: {}", status, message),
        None => format!("reporting API returned HTTP {}", status),
    }
}

/// Client for the run-report endpoint.
#[derive(Debug, Clone)]
pub struct ReportQueryClient {
    report_base_url: String,
    timeout: Duration,
}

impl ReportQueryClient {
    pub fn new(report_base_url: &str, timeout: Duration) -> Self {
        Self {
            report_base_url: report_base_url.to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(&config.report_base_url, config.timeout)
    }

    /// Run-report URL for `query`'s property.
    pub fn endpoint(&self, query: &ReportQuery) -> String {
        run_report_url(&self.report_base_url, query.property_id.trim())
    }

    /// Run `query` and return the parsed body unmodified.
    ///
    /// # Errors
    ///
    /// [`Error::Encoding`] for an unusable property id, [`Error::Network`] on
    /// transport failure or timeout, [`Error::ReportQuery`] on a non-2xx status
    /// or an unparsable body.
    pub async fn run_report(
        &self,
        token: &BearerToken,
        query: &ReportQuery,
    ) -> Result<ReportResult, Error> {
        query.validate()?;
        let url = self.endpoint(query);

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        let resp = client
            .post(&url)
            .bearer_auth(token.secret())
            .json(&query.to_request())
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(Error::ReportQuery(describe_api_error(status, &body)));
        }

        let report: ReportResult = serde_json::from_str(&body).map_err(|e| {
            Error::ReportQuery(format!("reporting API returned an unparsable body: {}", e))
        })?;
        tracing::debug!(status = status.as_u16(), "report fetched");
        Ok(report)
    }
}
