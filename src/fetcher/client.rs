//! Paginated label fetching with bounded retries.

use crate::error::{FetchError, FetchFailure};
use crate::fetcher::transport::{LabelPage, PageRequest, PageTransport};
use crate::models::LabelRecord;
use futures::stream::{self, Stream, TryStreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Largest `limit` the label API accepts.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Largest `skip` the label API accepts.
pub const MAX_SKIP: usize = 25_000;

/// Exponential backoff for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one.
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

/// Settings for one fetch run.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub manufacturer: String,
    pub page_size: usize,
    /// Stop after this many records.
    pub max_records: Option<usize>,
    /// Pause between consecutive page requests.
    pub page_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            manufacturer: "AstraZeneca".to_string(),
            page_size: 99,
            max_records: None,
            page_delay: Duration::ZERO,
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&crate::config::Config> for FetchConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            manufacturer: config.analysis.manufacturer.clone(),
            page_size: config.api.page_size,
            max_records: config.api.max_records,
            page_delay: Duration::from_millis(config.api.page_delay_ms),
            retry: RetryPolicy {
                max_retries: config.retry.max_retries,
                base_delay: Duration::from_millis(config.retry.base_delay_ms),
                max_delay: Duration::from_millis(config.retry.max_delay_ms),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PageCursor {
    skip: usize,
    done: bool,
}

/// Pages through the label API for one manufacturer.
pub struct LabelFetcher<T> {
    transport: T,
    config: FetchConfig,
    pages_fetched: AtomicUsize,
}

impl<T: PageTransport> LabelFetcher<T> {
    pub fn new(transport: T, mut config: FetchConfig) -> Self {
        let clamped = config.page_size.clamp(1, MAX_PAGE_SIZE);
        if clamped != config.page_size {
            warn!(
                "Page size {} out of range, using {}",
                config.page_size, clamped
            );
            config.page_size = clamped;
        }
        Self {
            transport,
            config,
            pages_fetched: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Pages successfully received so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched.load(Ordering::Relaxed)
    }

    /// Lazily fetch pages until the API has no further results.
    ///
    /// The stream ends after the first error.
    pub fn pages(&self) -> impl Stream<Item = Result<LabelPage, FetchError>> + '_ {
        let cursor = PageCursor {
            skip: 0,
            done: false,
        };
        stream::try_unfold(cursor, move |cursor| self.next_page(cursor))
    }

    async fn next_page(
        &self,
        cursor: PageCursor,
    ) -> Result<Option<(LabelPage, PageCursor)>, FetchError> {
        if cursor.done {
            return Ok(None);
        }
        let Some(limit) = self.next_limit(cursor.skip) else {
            return Ok(None);
        };
        if cursor.skip > MAX_SKIP {
            warn!(
                "Reached the API's skip limit ({}); remaining labels are not fetched",
                MAX_SKIP
            );
            return Ok(None);
        }

        if cursor.skip > 0 && !self.config.page_delay.is_zero() {
            tokio::time::sleep(self.config.page_delay).await;
        }

        let page = self.fetch_page(cursor.skip, limit).await?;
        let received = page.results.len();
        if received == 0 {
            debug!("Empty page at skip={}, done", cursor.skip);
            return Ok(None);
        }
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);

        let skip = cursor.skip + received;
        let done = match page.total() {
            Some(total) => skip >= total,
            None => received < limit,
        };
        match page.total() {
            Some(total) => info!("Fetched labels {}..{} of {}", cursor.skip, skip, total),
            None => info!("Fetched labels {}..{}", cursor.skip, skip),
        }

        Ok(Some((page, PageCursor { skip, done })))
    }

    /// Lazily fetch individual records.
    pub fn records(&self) -> impl Stream<Item = Result<LabelRecord, FetchError>> + '_ {
        self.pages()
            .map_ok(|page| stream::iter(page.results.into_iter().map(Ok::<_, FetchError>)))
            .try_flatten()
    }

    /// Page size for the next request, or `None` once `max_records` is reached.
    fn next_limit(&self, fetched: usize) -> Option<usize> {
        match self.config.max_records {
            Some(max) if fetched >= max => None,
            Some(max) => Some(self.config.page_size.min(max - fetched)),
            None => Some(self.config.page_size),
        }
    }

    /// Fetch one page, retrying transient failures with backoff.
    pub async fn fetch_page(&self, skip: usize, limit: usize) -> Result<LabelPage, FetchError> {
        let request = PageRequest {
            manufacturer: self.config.manufacturer.clone(),
            skip,
            limit,
        };
        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.transport.get_page(&request).await {
                Ok(page) => {
                    if attempt > 1 {
                        info!("Page at skip={} succeeded on attempt {}", skip, attempt);
                    }
                    return Ok(page);
                }
                Err(failure) if failure.is_transient() && attempt <= retry.max_retries => {
                    let delay = retry.delay_for(attempt);
                    warn!(
                        "Attempt {}/{} for skip={} failed: {}; retrying in {:?}",
                        attempt,
                        retry.max_retries + 1,
                        skip,
                        failure,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(failure) => return Err(self.fetch_error(&request, attempt, failure)),
            }
        }
    }

    fn fetch_error(
        &self,
        request: &PageRequest,
        attempts: usize,
        cause: FetchFailure,
    ) -> FetchError {
        FetchError {
            manufacturer: request.manufacturer.clone(),
            skip: request.skip,
            limit: request.limit,
            attempts,
            cause,
        }
    }
}
