//! HTTP transport for the label API.
//!
//! The [`PageTransport`] trait is the seam between paging logic and the
//! network. [`ReqwestTransport`] talks to openFDA; tests script their own.

use crate::error::FetchFailure;
use crate::models::LabelRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Longest error body kept in a [`FetchFailure::Status`].
const MAX_ERROR_BODY: usize = 512;

/// One page request against the label API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub manufacturer: String,
    pub skip: usize,
    pub limit: usize,
}

impl PageRequest {
    /// The openFDA `search` expression for this request.
    pub fn search_query(&self) -> String {
        format!(
            "openfda.manufacturer_name:\"{}\"",
            self.manufacturer.replace('"', "")
        )
    }
}

/// `meta.results` of a label API response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsMeta {
    #[serde(default)]
    pub skip: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub results: ResultsMeta,
}

/// One decoded page of label records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelPage {
    #[serde(default)]
    pub meta: Option<PageMeta>,
    #[serde(default)]
    pub results: Vec<LabelRecord>,
}

impl LabelPage {
    /// Total matches reported by the API, if the page carried metadata.
    pub fn total(&self) -> Option<usize> {
        self.meta.as_ref().map(|m| m.results.total)
    }
}

/// Error envelope openFDA returns on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
}

/// Fetches one page of label records.
#[async_trait]
pub trait PageTransport: Send + Sync {
    async fn get_page(&self, request: &PageRequest) -> Result<LabelPage, FetchFailure>;
}

/// Transport backed by a `reqwest` client.
pub struct ReqwestTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl ReqwestTransport {
    pub fn new(api_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }
}

#[async_trait]
impl PageTransport for ReqwestTransport {
    async fn get_page(&self, request: &PageRequest) -> Result<LabelPage, FetchFailure> {
        let mut query = vec![
            ("search", request.search_query()),
            ("limit", request.limit.to_string()),
            ("skip", request.skip.to_string()),
        ];
        if let Some(ref key) = self.api_key {
            query.push(("api_key", key.clone()));
        }

        debug!(
            "GET {} skip={} limit={}",
            self.api_url, request.skip, request.limit
        );

        let response = self
            .client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_reqwest_error)?;

        decode_response(status, &body)
    }
}

/// Turn a status code and body into a page or a failure.
fn decode_response(status: StatusCode, body: &str) -> Result<LabelPage, FetchFailure> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchFailure::RateLimited);
    }

    // openFDA answers "no matches" (including skip past the end) with a 404.
    if status == StatusCode::NOT_FOUND && is_no_matches(body) {
        return Ok(LabelPage::default());
    }

    if !status.is_success() {
        return Err(FetchFailure::Status {
            status: status.as_u16(),
            body: truncate(body, MAX_ERROR_BODY),
        });
    }

    serde_json::from_str(body).map_err(|e| FetchFailure::Decode(e.to_string()))
}

fn is_no_matches(body: &str) -> bool {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.code == "NOT_FOUND")
        .unwrap_or(false)
}

fn classify_reqwest_error(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else if e.is_connect() {
        FetchFailure::Connect(e.to_string())
    } else if e.is_decode() || e.is_body() {
        FetchFailure::Decode(e.to_string())
    } else {
        FetchFailure::Other(e.to_string())
    }
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_BODY: &str = r#"{
        "meta": {
            "disclaimer": "Do not rely on openFDA to make decisions regarding medical care.",
            "results": {"skip": 0, "limit": 2, "total": 43}
        },
        "results": [
            {"id": "a", "effective_time": "20171213", "spl_product_data_elements": ["x y"],
             "openfda": {"generic_name": ["DRUG A"], "route": ["ORAL"]}},
            {"id": "b", "effective_time": "20180101", "spl_product_data_elements": ["z"],
             "openfda": {}}
        ]
    }"#;

    #[test]
    fn test_search_query_quotes_manufacturer() {
        let request = PageRequest {
            manufacturer: "Astra\"Zeneca".to_string(),
            skip: 0,
            limit: 99,
        };
        assert_eq!(
            request.search_query(),
            "openfda.manufacturer_name:\"AstraZeneca\""
        );
    }

    #[test]
    fn test_decode_success_page() {
        let page = decode_response(StatusCode::OK, PAGE_BODY).unwrap();
        assert_eq!(page.total(), Some(43));
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].openfda.generic_name, vec!["DRUG A"]);
    }

    #[test]
    fn test_not_found_means_empty_page() {
        let body = r#"{"error": {"code": "NOT_FOUND", "message": "No matches found!"}}"#;
        let page = decode_response(StatusCode::NOT_FOUND, body).unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.total(), None);
    }

    #[test]
    fn test_other_404_is_an_error() {
        let result = decode_response(StatusCode::NOT_FOUND, "<html>gone</html>");
        assert!(matches!(
            result,
            Err(FetchFailure::Status { status: 404, .. })
        ));
    }

    #[test]
    fn test_rate_limit_and_server_errors() {
        assert_eq!(
            decode_response(StatusCode::TOO_MANY_REQUESTS, ""),
            Err(FetchFailure::RateLimited)
        );

        let err = decode_response(StatusCode::BAD_GATEWAY, "upstream").unwrap_err();
        assert!(err.is_transient());

        let err = decode_response(StatusCode::BAD_REQUEST, "bad search").unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_undecodable_body() {
        let err = decode_response(StatusCode::OK, "{not json").unwrap_err();
        assert!(matches!(err, FetchFailure::Decode(_)));
    }

    #[test]
    fn test_truncate_long_bodies() {
        let long = "x".repeat(600);
        let truncated = truncate(&long, MAX_ERROR_BODY);
        assert_eq!(truncated.len(), MAX_ERROR_BODY + 3);
        assert_eq!(truncate("short", MAX_ERROR_BODY), "short");
    }

    #[test]
    fn test_transport_skips_empty_api_key() {
        let transport =
            ReqwestTransport::new("http://localhost:1", Some(String::new()), Duration::from_secs(1))
                .unwrap();
        assert!(transport.api_key.is_none());
    }
}
