// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Structured source: the Places Details API.
//!
//! Every failure mode (no locator, transport error, error status, payload
//! that does not parse) becomes "no data" with a log line; nothing
//! propagates to the caller.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use reviewtrack::{
    structured_review_id, Entity, Review, Snapshot, SourceKind, MAX_REVIEWS_PER_SNAPSHOT,
};

use super::http_client::HttpClient;
use super::ReviewSource;
use crate::config::ApiConfig;

const FIELDS: &str = "name,rating,user_ratings_total,reviews";

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    result: Option<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    user_ratings_total: Option<u64>,
    #[serde(default)]
    reviews: Vec<PlaceReview>,
}

#[derive(Debug, Deserialize)]
struct PlaceReview {
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    author_url: Option<String>,
    #[serde(default)]
    profile_photo_url: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    text: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    time: Option<i64>,
}

/// Adapter over the Places Details endpoint.
pub struct PlacesSource {
    client: HttpClient,
    api_key: String,
    base_url: String,
    language: Option<String>,
}

impl PlacesSource {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = config
            .key
            .clone()
            .context("REVIEWTRACK_API_KEY is not set")?;
        Ok(Self {
            client: HttpClient::new(config.timeout_ms)?,
            api_key,
            base_url: config.base_url.clone(),
            language: config.language.clone(),
        })
    }

    /// Replace the HTTP client (tests shorten the retry backoff).
    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.client = client;
        self
    }

    async fn fetch(&self, place_id: &str) -> Result<String> {
        let mut query = vec![
            ("place_id", place_id),
            ("fields", FIELDS),
            ("reviews_sort", "newest"),
            ("key", self.api_key.as_str()),
        ];
        if let Some(lang) = &self.language {
            query.push(("language", lang.as_str()));
        }
        let resp = self.client.get(&self.base_url, &query).await?;
        if !resp.is_success() {
            anyhow::bail!("HTTP {}", resp.status);
        }
        Ok(resp.body)
    }
}

#[async_trait]
impl ReviewSource for PlacesSource {
    async fn acquire(&self, entity: &Entity) -> Result<Option<Snapshot>> {
        let Some(place_id) = entity.place_locator() else {
            tracing::warn!(entity = %entity.id, "no place_id configured, skipping");
            return Ok(None);
        };

        let body = match self.fetch(place_id).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(entity = %entity.id, "places request failed: {e:#}");
                return Ok(None);
            }
        };

        match parse_details(entity, &body, Utc::now()) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                tracing::warn!(entity = %entity.id, "places payload unusable: {e:#}");
                Ok(None)
            }
        }
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Structured
    }
}

/// Map a Details payload into a snapshot.
///
/// `Ok(None)` for an API-level error status; `Err` for a body that is not
/// a Details payload at all.
fn parse_details(entity: &Entity, body: &str, now: DateTime<Utc>) -> Result<Option<Snapshot>> {
    let resp: DetailsResponse =
        serde_json::from_str(body).context("response is not a Details payload")?;

    if resp.status != "OK" {
        tracing::warn!(
            entity = %entity.id,
            status = %resp.status,
            "places API error: {}",
            resp.error_message.as_deref().unwrap_or("no message")
        );
        return Ok(None);
    }

    let result = resp.result.context("status OK but no result")?;

    let reviews = result
        .reviews
        .into_iter()
        .take(MAX_REVIEWS_PER_SNAPSHOT)
        .map(|r| {
            let author = r.author_name.unwrap_or_default();
            let published_unix = r
                .time
                .filter(|t| Utc.timestamp_opt(*t, 0).single().is_some())
                .unwrap_or_else(|| now.timestamp());
            Review {
                id: structured_review_id(&entity.id, published_unix, &author),
                author,
                rating: r
                    .rating
                    .map(f64::round)
                    .filter(|v| (1.0..=5.0).contains(v))
                    .map(|v| v as u8)
                    .unwrap_or(0),
                text: r.text.filter(|t| !t.trim().is_empty()),
                published_at: Utc
                    .timestamp_opt(published_unix, 0)
                    .single()
                    .unwrap_or(now),
                author_url: r.author_url,
                photo_url: r.profile_photo_url,
            }
        })
        .collect();

    Ok(Some(Snapshot {
        entity_id: entity.id.clone(),
        name: result
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| entity.name.clone()),
        rating: result.rating.unwrap_or(0.0),
        review_count: result.user_ratings_total.unwrap_or(0),
        reviews,
        observed_at: now,
        source: SourceKind::Structured,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entity() -> Entity {
        Entity::new("cafe", "Cafe Configured").with_place_id("ChIJcafe")
    }

    fn source(base_url: String) -> PlacesSource {
        PlacesSource::new(&ApiConfig {
            key: Some("test-key".to_string()),
            base_url,
            language: Some("en".to_string()),
            timeout_ms: 2000,
        })
        .unwrap()
        .with_client(
            HttpClient::new(2000)
                .unwrap()
                .with_backoff(Duration::from_millis(1)),
        )
    }

    fn ok_payload() -> serde_json::Value {
        json!({
            "status": "OK",
            "result": {
                "name": "Cafe Observed",
                "rating": 4.6,
                "user_ratings_total": 212,
                "reviews": [
                    {
                        "author_name": "Jane Doe",
                        "author_url": "https://maps.example/contrib/1",
                        "profile_photo_url": "https://img.example/1.png",
                        "rating": 5,
                        "text": "Lovely flat white",
                        "time": 1_767_225_600,
                        "relative_time_description": "a week ago"
                    },
                    {
                        "author_name": "Sam",
                        "rating": 3,
                        "text": "",
                        "time": 1_767_000_000
                    }
                ]
            }
        })
    }

    #[test]
    fn test_parse_details_maps_fields() {
        let now = Utc::now();
        let snap = parse_details(&entity(), &ok_payload().to_string(), now)
            .unwrap()
            .unwrap();
        assert_eq!(snap.name, "Cafe Observed");
        assert_eq!(snap.rating, 4.6);
        assert_eq!(snap.review_count, 212);
        assert_eq!(snap.reviews.len(), 2);

        let first = &snap.reviews[0];
        assert_eq!(first.id, "cafe_1767225600_jane_doe");
        assert_eq!(first.rating, 5);
        assert_eq!(first.published_at.timestamp(), 1_767_225_600);
        assert_eq!(first.photo_url.as_deref(), Some("https://img.example/1.png"));
        assert!(snap.reviews[1].text.is_none());
    }

    #[test]
    fn test_parse_details_ids_are_stable_across_runs() {
        let a = parse_details(&entity(), &ok_payload().to_string(), Utc::now())
            .unwrap()
            .unwrap();
        let b = parse_details(
            &entity(),
            &ok_payload().to_string(),
            Utc::now() + chrono::Duration::days(7),
        )
        .unwrap()
        .unwrap();
        let ids_a: Vec<_> = a.reviews.iter().map(|r| &r.id).collect();
        let ids_b: Vec<_> = b.reviews.iter().map(|r| &r.id).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_parse_details_missing_fields_fall_back() {
        let now = Utc::now();
        let body = json!({
            "status": "OK",
            "result": { "reviews": [ { "author_name": "Ann" } ] }
        });
        let snap = parse_details(&entity(), &body.to_string(), now)
            .unwrap()
            .unwrap();
        assert_eq!(snap.name, "Cafe Configured");
        assert_eq!(snap.rating, 0.0);
        assert_eq!(snap.review_count, 0);
        assert_eq!(snap.reviews[0].rating, 0);
        assert_eq!(snap.reviews[0].published_at.timestamp(), now.timestamp());
    }

    #[test]
    fn test_parse_details_caps_review_sample() {
        let reviews: Vec<_> = (0..15)
            .map(|i| json!({"author_name": format!("a{i}"), "rating": 4, "time": 1_700_000_000 + i}))
            .collect();
        let body = json!({"status": "OK", "result": {"reviews": reviews}});
        let snap = parse_details(&entity(), &body.to_string(), Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(snap.reviews.len(), MAX_REVIEWS_PER_SNAPSHOT);
    }

    #[test]
    fn test_parse_details_error_status_is_no_data() {
        let body = json!({"status": "REQUEST_DENIED", "error_message": "bad key"});
        assert!(parse_details(&entity(), &body.to_string(), Utc::now())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_parse_details_garbage_is_error() {
        assert!(parse_details(&entity(), "<html>nope</html>", Utc::now()).is_err());
    }

    #[tokio::test]
    async fn test_acquire_against_mock_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("place_id", "ChIJcafe"))
            .and(query_param("key", "test-key"))
            .and(query_param("language", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_payload()))
            .mount(&server)
            .await;

        let snap = source(server.uri()).acquire(&entity()).await.unwrap().unwrap();
        assert_eq!(snap.review_count, 212);
        assert_eq!(snap.source, SourceKind::Structured);
    }

    #[tokio::test]
    async fn test_acquire_soft_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let src = source(server.uri());

        // Remote failure
        assert!(src.acquire(&entity()).await.unwrap().is_none());
        // Missing locator
        assert!(src
            .acquire(&Entity::new("bare", "Bare"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_acquire_malformed_body_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"status\": 7}"))
            .mount(&server)
            .await;
        assert!(source(server.uri())
            .acquire(&entity())
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_new_requires_key() {
        let cfg = ApiConfig {
            key: None,
            base_url: "http://localhost".to_string(),
            language: None,
            timeout_ms: 1000,
        };
        assert!(PlacesSource::new(&cfg).is_err());
    }
}
