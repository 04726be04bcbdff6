// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Async HTTP client wrapping reqwest.
//!
//! GETs retry on 5xx and transport errors with bounded backoff on 429.
//! POSTs are sent exactly once: the only POST target appends to a document.

use anyhow::Result;
use std::time::Duration;

/// Retries after the first attempt.
const MAX_RETRIES: u32 = 2;

/// Upper bound on a server-requested `retry-after` wait.
const MAX_RETRY_AFTER_SECS: u64 = 10;

/// Response from an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client shared by the API adapter and the document sink.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    /// Base delay for exponential backoff between retries.
    backoff: Duration,
}

impl HttpClient {
    /// Create a client whose requests time out after `timeout_ms`.
    pub fn new(timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("reviewtrack/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            backoff: Duration::from_millis(500),
        })
    }

    /// Override the retry backoff base (tests use a tiny one).
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// GET `url` with query parameters, retrying on 5xx and backing off on 429.
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse> {
        self.send_with_retry(|| self.client.get(url).query(query))
            .await
    }

    /// POST a JSON body with a bearer token. Never retried.
    pub async fn post_json_once(
        &self,
        url: &str,
        bearer: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        let r = self
            .client
            .post(url)
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await?;
        let status = r.status().as_u16();
        let body = r.text().await?;
        Ok(HttpResponse { status, body })
    }

    async fn send_with_retry<F>(&self, build: F) -> Result<HttpResponse>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut retries = 0u32;

        loop {
            match build().send().await {
                Ok(r) => {
                    let status = r.status().as_u16();

                    // Retry on 5xx
                    if status >= 500 && retries < MAX_RETRIES {
                        retries += 1;
                        tokio::time::sleep(self.backoff * 2u32.pow(retries - 1)).await;
                        continue;
                    }

                    // Backoff on 429
                    if status == 429 && retries < MAX_RETRIES {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        tokio::time::sleep(Duration::from_secs(
                            retry_after.min(MAX_RETRY_AFTER_SECS),
                        ))
                        .await;
                        continue;
                    }

                    let body = r.text().await?;
                    return Ok(HttpResponse { status, body });
                }
                Err(e) => {
                    if retries < MAX_RETRIES && !e.is_builder() {
                        retries += 1;
                        tokio::time::sleep(self.backoff * 2u32.pow(retries - 1)).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}
