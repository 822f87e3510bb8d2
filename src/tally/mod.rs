//! HTTP client for Tally's XML export interface.

pub mod envelope;
pub mod parse;

use crate::domain::model::{Company, Ledger};
use crate::domain::ports::TallySource;
use crate::utils::error::{BridgeError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// The banner Tally serves when the license server answers instead of the
/// XML gateway, i.e. when XML exchange has not been enabled.
const LICENSE_SERVER_BANNER: &str = "License server is Running";

pub struct TallyClient {
    http: reqwest::Client,
    endpoint: String,
}

impl TallyClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST a TDL envelope and return the raw XML response body.
    async fn export(&self, envelope: String) -> Result<String> {
        tracing::debug!("Posting TDL envelope to {}", self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/xml")
            .body(envelope)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    BridgeError::TallyUnavailable {
                        endpoint: self.endpoint.clone(),
                    }
                } else {
                    BridgeError::ApiError(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await?;

        if body.contains(LICENSE_SERVER_BANNER) {
            return Err(BridgeError::TallyXmlDisabled);
        }
        if !status.is_success() {
            return Err(BridgeError::TallyHttpError {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        tracing::debug!("Tally responded with {} bytes", body.len());
        Ok(body)
    }
}

#[async_trait]
impl TallySource for TallyClient {
    async fn fetch_companies(&self) -> Result<Vec<Company>> {
        let body = self.export(envelope::company_collection()).await?;
        parse::parse_companies(&body)
    }

    async fn fetch_ledgers(&self) -> Result<Vec<Ledger>> {
        let body = self.export(envelope::ledger_details()).await?;
        parse::parse_ledgers(&body)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
