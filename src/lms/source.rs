//! The single I/O boundary of the pipeline: turning an address into a document.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::trace;

use crate::lms::errors::FetchError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Fetches the raw timetable document at an address.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, address: &str) -> Result<String, FetchError>;
}

/// [`DocumentSource`] backed by a shared `reqwest` client.
pub struct HttpSource {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { http, timeout })
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self, address: &str) -> Result<String, FetchError> {
        let resp = self
            .http
            .get(address)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: address.to_owned(),
            });
        }

        let body = resp.text().await.map_err(|e| self.classify(e))?;
        trace!(url = address, bytes = body.len(), "Fetched timetable document");
        Ok(body)
    }
}

impl HttpSource {
    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(err)
        }
    }
}
