//! Shared HTTP transport.
//!
//! One cookie-carrying client for every call. Redirects are never followed
//! automatically: the credential exchange must observe the redirect body
//! itself, and no other endpoint relies on redirect following. Transport
//! failures are retried a bounded number of times and then swallowed into
//! `None`; upstream flakiness is routine and is resolved by the callers'
//! empty-result handling, not by propagation.

use std::time::Duration;

use serde_json::Value;
use tracing::warn;
use webwx_core::{ClientError, ErrorCategory};

/// Transport tuning knobs.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: crate::urls::USER_AGENT.to_owned(),
            request_timeout: Duration::from_secs(40),
            max_retries: 3,
        }
    }
}

/// Cookie-carrying HTTP session shared by all protocol calls.
#[derive(Debug)]
pub struct HttpSession {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpSession {
    pub fn new(config: &HttpConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| {
                ClientError::new(
                    ErrorCategory::Config,
                    "http_client_build_error",
                    err.to_string(),
                )
            })?;

        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
        })
    }

    /// GET the body as text; `None` after exhausting the retry budget.
    pub async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Option<String> {
        for _ in 0..self.max_retries {
            let request = self.client.get(url).query(query);
            match request.send().await {
                Ok(response) => match response.text().await {
                    Ok(body) => return Some(body),
                    Err(err) => warn!(url, %err, "response body read failed"),
                },
                Err(err) => warn!(url, %err, "get failed"),
            }
        }
        None
    }

    /// POST a JSON body; returns the response text, `None` on failure.
    pub async fn post_json(&self, url: &str, body: &Value) -> Option<String> {
        // The service rejects escaped non-ASCII in some send paths, so the
        // body is serialized once and posted as raw bytes.
        let payload = body.to_string();
        for _ in 0..self.max_retries {
            let request = self
                .client
                .post(url)
                .header("Content-Type", "application/json; charset=UTF-8")
                .body(payload.clone());
            match request.send().await {
                Ok(response) => match response.text().await {
                    Ok(text) => return Some(text),
                    Err(err) => warn!(url, %err, "response body read failed"),
                },
                Err(err) => warn!(url, %err, "post failed"),
            }
        }
        None
    }
}
