// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Document sink: append the text report to a Google Doc.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use reviewtrack::ChangeRecord;

use super::{format_report, ReportSink};
use crate::acquisition::http_client::HttpClient;
use crate::config::ReportConfig;

pub struct DocsSink {
    client: HttpClient,
    endpoint: String,
    token: String,
}

impl DocsSink {
    pub fn new(client: HttpClient, base_url: &str, document_id: &str, token: &str) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/{}:batchUpdate",
                base_url.trim_end_matches('/'),
                document_id
            ),
            token: token.to_string(),
        }
    }

    pub fn from_config(config: &ReportConfig, timeout_ms: u64) -> Result<Self> {
        let document_id = config
            .docs_document_id
            .as_deref()
            .context("REVIEWTRACK_DOCS_DOCUMENT_ID is not set")?;
        let token = config
            .docs_token
            .as_deref()
            .context("REVIEWTRACK_DOCS_TOKEN is not set")?;
        Ok(Self::new(
            HttpClient::new(timeout_ms)?,
            &config.docs_base_url,
            document_id,
            token,
        ))
    }
}

#[async_trait]
impl ReportSink for DocsSink {
    async fn report(&self, records: &[ChangeRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let text = format!("\n{}", format_report(records, Utc::now()));
        let body = json!({
            "requests": [
                { "insertText": { "endOfSegmentLocation": {}, "text": text } }
            ]
        });

        let resp = self.client.post_json_once(&self.endpoint, &self.token, &body).await?;
        if !resp.is_success() {
            anyhow::bail!(
                "document append failed: HTTP {}: {}",
                resp.status,
                resp.body.chars().take(200).collect::<String>()
            );
        }
        tracing::info!(records = records.len(), "report appended to document");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "docs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::record;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sink(server: &MockServer) -> DocsSink {
        let client = HttpClient::new(2000)
            .unwrap()
            .with_backoff(Duration::from_millis(1));
        DocsSink::new(client, &format!("{}/v1/documents/", server.uri()), "doc-1", "tok")
    }

    #[tokio::test]
    async fn test_appends_report_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/documents/doc-1:batchUpdate"))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(json!({
                "requests": [{ "insertText": { "endOfSegmentLocation": {} } }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"documentId": "doc-1"})))
            .expect(1)
            .mount(&server)
            .await;

        sink(&server).report(&[record("bakery")]).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_report_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        sink(&server).report(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_append_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;
        let err = sink(&server).report(&[record("a")]).await.unwrap_err();
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_server_error_is_not_resent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/documents/doc-1:batchUpdate"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        let err = sink(&server).report(&[record("a")]).await.unwrap_err();
        assert!(err.to_string().contains("503"));
        server.verify().await;
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let cfg = ReportConfig {
            kind: crate::config::ReportKind::Docs,
            jsonl_path: None,
            docs_base_url: "http://localhost".into(),
            docs_document_id: None,
            docs_token: Some("t".into()),
        };
        assert!(DocsSink::from_config(&cfg, 1000).is_err());
    }
}
