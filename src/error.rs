//! Error types shared across the pipeline.

use thiserror::Error;

/// A page request that still failed after the retry budget was spent.
#[derive(Debug, Error)]
#[error(
    "failed to fetch labels for manufacturer \"{manufacturer}\" (skip={skip}, limit={limit}) after {attempts} attempt(s): {cause}"
)]
pub struct FetchError {
    pub manufacturer: String,
    pub skip: usize,
    pub limit: usize,
    pub attempts: usize,
    pub cause: FetchFailure,
}

/// Why a single page request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("rate limited by the API (HTTP 429)")]
    RateLimited,

    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode API response: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Other(String),
}

impl FetchFailure {
    /// Whether another attempt at the same page could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchFailure::Timeout | FetchFailure::Connect(_) | FetchFailure::RateLimited => true,
            FetchFailure::Status { status, .. } => *status >= 500,
            FetchFailure::Decode(_) | FetchFailure::Other(_) => false,
        }
    }
}

/// Why a label record was dropped by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("missing effective_time")]
    MissingEffectiveTime,

    #[error("effective_time {0:?} does not start with a 4-digit calendar year")]
    InvalidYear(String),

    #[error("no route of administration")]
    MissingRoute,

    #[error("no ingredient elements in spl_product_data_elements")]
    MissingIngredients,
}

/// Rendering failures.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no data: {part} produced no rows")]
    NoData { part: &'static str },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to draw chart: {0}")]
    Chart(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchFailure::Timeout.is_transient());
        assert!(FetchFailure::RateLimited.is_transient());
        assert!(FetchFailure::Connect("refused".into()).is_transient());
        assert!(FetchFailure::Status {
            status: 503,
            body: String::new()
        }
        .is_transient());

        assert!(!FetchFailure::Status {
            status: 400,
            body: String::new()
        }
        .is_transient());
        assert!(!FetchFailure::Decode("eof".into()).is_transient());
    }

    #[test]
    fn test_fetch_error_names_page_context() {
        let err = FetchError {
            manufacturer: "AstraZeneca".to_string(),
            skip: 198,
            limit: 99,
            attempts: 4,
            cause: FetchFailure::RateLimited,
        };
        let message = err.to_string();
        assert!(message.contains("AstraZeneca"));
        assert!(message.contains("skip=198"));
        assert!(message.contains("limit=99"));
        assert!(message.contains("4 attempt"));
    }
}
