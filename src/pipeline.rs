//! Fetch, normalize and aggregate in a single pass.

use crate::analysis::Aggregator;
use crate::cli::Part;
use crate::error::FetchError;
use crate::fetcher::{LabelFetcher, PageTransport};
use crate::models::{AggregateRow, Grouping, RunSummary, SkippedRecord};
use crate::normalizer::Normalizer;
use futures::TryStreamExt;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

/// Everything one run produces before rendering.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub by_year: Vec<AggregateRow>,
    pub by_year_and_route: Vec<AggregateRow>,
    pub summary: RunSummary,
}

/// Stream every record from `fetcher` through `normalizer` into the
/// aggregators selected by `part`.
///
/// Malformed records are logged and recorded in the summary. A fetch
/// failure aborts the run.
pub async fn run<T: PageTransport>(
    fetcher: &LabelFetcher<T>,
    normalizer: Normalizer,
    part: Part,
    progress: &ProgressBar,
) -> Result<PipelineOutput, FetchError> {
    let mut by_year = part.includes_a().then(|| Aggregator::new(Grouping::ByYear));
    let mut by_route = part
        .includes_b()
        .then(|| Aggregator::new(Grouping::ByYearAndRoute));
    let mut summary = RunSummary::default();

    let records = fetcher.records();
    futures::pin_mut!(records);

    while let Some(record) = records.try_next().await? {
        summary.records_fetched += 1;
        progress.inc(1);

        match normalizer.normalize(&record) {
            Ok(label) => {
                summary.records_kept += 1;
                debug!(
                    "Label {}: year={} routes={:?} ingredients={}",
                    record.display_id(),
                    label.year,
                    label.routes,
                    label.ingredient_count
                );
                for aggregator in [&mut by_year, &mut by_route].into_iter().flatten() {
                    let grouping = aggregator.grouping();
                    aggregator.extend(label.entries(grouping));
                }
            }
            Err(reason) => {
                warn!(
                    "Skipping malformed record {}: {}",
                    record.display_id(),
                    reason
                );
                summary.skipped.push(SkippedRecord {
                    id: record.display_id().to_string(),
                    reason: reason.to_string(),
                });
            }
        }
    }

    summary.pages_fetched = fetcher.pages_fetched();
    info!(
        "Processed {} records from {} pages ({} kept, {} skipped)",
        summary.records_fetched,
        summary.pages_fetched,
        summary.records_kept,
        summary.records_skipped()
    );

    for aggregator in [&by_year, &by_route].into_iter().flatten() {
        if aggregator.is_empty() {
            warn!("No groups for {}", aggregator.grouping().label());
        }
    }

    Ok(PipelineOutput {
        by_year: by_year.map(Aggregator::finish).unwrap_or_default(),
        by_year_and_route: by_route.map(Aggregator::finish).unwrap_or_default(),
        summary,
    })
}
