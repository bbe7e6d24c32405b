//! eRegulations API HTTP client
//!
//! Every outbound call runs through one retry loop: transient failures
//! (transport errors, 5xx) are retried after a fixed delay up to the
//! configured budget, permanent failures surface immediately, and the
//! call's cancellation token is signalled whenever the loop gives up.

use crate::cancel::CancelToken;
use crate::error::{ApiError, Result};
use crate::types::ResponseBody;
use reqwest::Method;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Additional attempts after the first, so 3 means up to 4 total
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Fixed delay between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Client for a single eRegulations instance
pub struct EregulationsApi {
    http: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl EregulationsApi {
    /// Create a client with default settings (30 second timeout)
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom per-attempt timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override the retry budget and inter-attempt delay
    pub fn retry_policy(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// The configured base address, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /Objectives` - the nested objectives/procedures tree
    pub async fn objectives(&self) -> Result<ResponseBody> {
        self.fetch_json("Objectives").await
    }

    /// `GET /Procedures/{id}` - procedure detail
    pub async fn procedure(&self, id: i64) -> Result<ResponseBody> {
        self.fetch_json(&format!("Procedures/{id}")).await
    }

    /// `GET /Procedures/{id}/Resume` - procedure summary
    pub async fn procedure_resume(&self, id: i64) -> Result<ResponseBody> {
        self.fetch_json(&format!("Procedures/{id}/Resume")).await
    }

    /// `GET /Procedures/{id}/Totals` - cost and time totals
    pub async fn procedure_totals(&self, id: i64) -> Result<ResponseBody> {
        self.fetch_json(&format!("Procedures/{id}/Totals")).await
    }

    /// `GET /Procedures/{id}/Steps/{stepId}` - single step detail
    pub async fn procedure_step(&self, id: i64, step_id: i64) -> Result<ResponseBody> {
        self.fetch_json(&format!("Procedures/{id}/Steps/{step_id}"))
            .await
    }

    /// `POST /Objectives/Search` - keyword search with a raw string body
    pub async fn search(&self, keyword: &str) -> Result<ResponseBody> {
        self.post_text("Objectives/Search", keyword).await
    }

    /// GET a path under the base URL with the standard retry policy
    pub async fn fetch_json(&self, path: &str) -> Result<ResponseBody> {
        self.fetch_json_with(path, CancelToken::new()).await
    }

    /// GET with a caller-held cancellation token
    pub async fn fetch_json_with(&self, path: &str, cancel: CancelToken) -> Result<ResponseBody> {
        self.request_with_retry(Method::GET, path, None, cancel)
            .await
    }

    /// POST a raw text body with the standard retry policy
    pub async fn post_text(&self, path: &str, body: &str) -> Result<ResponseBody> {
        self.post_text_with(path, body, CancelToken::new()).await
    }

    /// POST with a caller-held cancellation token
    pub async fn post_text_with(
        &self,
        path: &str,
        body: &str,
        cancel: CancelToken,
    ) -> Result<ResponseBody> {
        self.request_with_retry(Method::POST, path, Some(body.to_string()), cancel)
            .await
    }

    /// Build the full URL for a path, rejecting unusable inputs before the
    /// retry loop is ever entered
    fn endpoint(&self, path: &str) -> Result<String> {
        if self.base_url.is_empty() {
            return Err(ApiError::Config("base URL is empty".to_string()));
        }
        let path = path.trim().trim_start_matches('/');
        if path.is_empty() {
            return Err(ApiError::Config("request path is empty".to_string()));
        }
        Ok(format!("{}/{}", self.base_url, path))
    }

    async fn request_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        cancel: CancelToken,
    ) -> Result<ResponseBody> {
        let url = self.endpoint(path)?;
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ApiError::Cancelled);
            }

            match self.attempt(&method, &url, body.as_deref(), &cancel).await {
                Ok(parsed) => return Ok(parsed),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        url = %url,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Request failed, retrying after delay"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.retry_delay) => {}
                        _ = cancel.cancelled() => return Err(ApiError::Cancelled),
                    }
                }
                Err(e) => {
                    // Signal the token so nothing stays parked on a call
                    // that has already given up.
                    cancel.cancel();
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &str,
        body: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<ResponseBody> {
        let request = if *method == Method::POST {
            self.http
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(body.unwrap_or_default().to_string())
        } else {
            self.http.get(url)
        };

        let response = tokio::select! {
            r = request.send() => r?,
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
        };

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                resource: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = tokio::select! {
            t = response.text() => t?,
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
        };

        match serde_json::from_str(&text) {
            Ok(value) => Ok(ResponseBody::Parsed(value)),
            Err(e) => {
                warn!(
                    url = %url,
                    length = text.len(),
                    error = %e,
                    "Response body failed structural parsing"
                );
                debug!(url = %url, "Returning malformed-body sentinel");
                Ok(ResponseBody::Malformed { length: text.len() })
            }
        }
    }
}
