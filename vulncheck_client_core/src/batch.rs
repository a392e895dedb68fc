//! Batch orchestration over the request executor
//!
//! A batch executes its first descriptor alone, then fans the remainder out
//! under a concurrency limit. Results come back in input order and the first
//! fatal error aborts the whole batch.

use futures::stream::{self, StreamExt};
use log::debug;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::json_path;
use crate::request::{RawResult, RequestDescriptor, RequestExecutor};

/// Default number of requests in flight during fan-out
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10;

/// Options controlling a batch run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    extraction_path: Option<String>,
    concurrency_limit: usize,
    drop_empty: bool,
}

impl BatchOptions {
    /// Create options with default settings
    pub fn new() -> Self {
        Self {
            extraction_path: None,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            drop_empty: true,
        }
    }

    /// Set the dotted path extracted from each result payload
    pub fn with_extraction_path(mut self, path: impl Into<String>) -> Self {
        self.extraction_path = Some(path.into());
        self
    }

    /// Set the fan-out concurrency limit
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    /// Set whether empty results are discarded
    pub fn with_drop_empty(mut self, drop_empty: bool) -> Self {
        self.drop_empty = drop_empty;
        self
    }

    /// The configured extraction path
    pub fn extraction_path(&self) -> Option<&str> {
        self.extraction_path.as_deref()
    }

    /// The configured concurrency limit
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Whether empty results are discarded
    pub fn drop_empty(&self) -> bool {
        self.drop_empty
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            return Err(Error::configuration("Concurrency limit must be at least 1"));
        }
        Ok(())
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// One batch entry after extraction, still tied to its correlation id
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    pub correlation_id: Option<String>,
    pub value: Value,
    pub limit_hit: bool,
}

impl AggregatedResult {
    /// Check whether the extracted value carries no data
    ///
    /// Null, an empty array, and an empty string are empty; `{}` is not.
    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            Value::String(text) => text.is_empty(),
            _ => false,
        }
    }
}

/// Execute a batch of descriptors and aggregate their results
///
/// The lead descriptor runs alone so a fatal error aborts the batch before
/// any fan-out, and so the token exchange happens exactly once. Remaining
/// descriptors run with at most `concurrency_limit` in flight; their results
/// are collected in input order. Limit-marked entries always survive the
/// empty filter.
pub async fn run_batch(
    executor: &RequestExecutor,
    descriptors: &[RequestDescriptor],
    options: &BatchOptions,
) -> Result<Vec<AggregatedResult>> {
    options.validate()?;
    if descriptors.is_empty() {
        return Ok(Vec::new());
    }

    debug!("starting batch of {} request(s)", descriptors.len());
    let first = executor.execute(&descriptors[0]).await?;
    debug!(
        "lead request resolved; dispatching {} follow-on request(s)",
        descriptors.len() - 1
    );

    let mut raw = Vec::with_capacity(descriptors.len());
    raw.push(first);
    let mut pending = stream::iter(descriptors[1..].iter().map(|d| executor.execute(d)))
        .buffered(options.concurrency_limit());
    while let Some(outcome) = pending.next().await {
        raw.push(outcome?);
    }

    debug!("batch complete; aggregating {} result(s)", raw.len());
    let mut results: Vec<AggregatedResult> = raw
        .into_iter()
        .map(|r| aggregate(r, options.extraction_path()))
        .collect();
    if options.drop_empty() {
        results.retain(|r| r.limit_hit || !r.is_empty());
    }
    Ok(results)
}

fn aggregate(raw: RawResult, path: Option<&str>) -> AggregatedResult {
    let value = match (raw.body, path) {
        (Some(body), Some(path)) => json_path::get_path(&body, path)
            .cloned()
            .unwrap_or(Value::Null),
        (Some(body), None) => body,
        (None, _) => Value::Null,
    };
    AggregatedResult {
        correlation_id: raw.correlation_id,
        value,
        limit_hit: raw.limit_hit,
    }
}
