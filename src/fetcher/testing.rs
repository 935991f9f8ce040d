//! Test doubles for the label API.

use crate::error::FetchFailure;
use crate::fetcher::transport::{LabelPage, PageMeta, PageRequest, PageTransport, ResultsMeta};
use crate::models::LabelRecord;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays scripted responses and records every request.
///
/// Once the script runs out every request gets an empty page.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<LabelPage, FetchFailure>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<LabelPage, FetchFailure>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageTransport for ScriptedTransport {
    async fn get_page(&self, request: &PageRequest) -> Result<LabelPage, FetchFailure> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(LabelPage::default()))
    }
}

/// A page of bare records `label-<i>` for each `i` in `ids`.
pub fn page(ids: std::ops::Range<usize>, total: usize) -> LabelPage {
    let records = ids
        .clone()
        .map(|i| LabelRecord {
            id: format!("label-{}", i),
            ..LabelRecord::default()
        })
        .collect();
    page_of(records, ids.start, total)
}

/// A page carrying the given records.
pub fn page_of(results: Vec<LabelRecord>, skip: usize, total: usize) -> LabelPage {
    LabelPage {
        meta: Some(PageMeta {
            results: ResultsMeta {
                skip,
                limit: results.len(),
                total,
            },
        }),
        results,
    }
}
