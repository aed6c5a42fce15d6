pub mod arcgis;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use types::{CaseRecord, Page};

use crate::config::SourceConfig;

/// A paged source of case-line records.
#[async_trait]
pub trait FeatureSource: Send {
    async fn fetch_page(&mut self, offset: usize, count: usize) -> Result<Page>;
}

/// Walk the source page by page until it runs dry.
///
/// A page that decodes to a server error is retried at the same offset after
/// `error_backoff_s`. Transport failures and non-2xx statuses abort the run.
pub async fn fetch_all<S: FeatureSource + ?Sized>(
    source: &mut S,
    config: &SourceConfig,
) -> Result<Vec<CaseRecord>> {
    let started = Instant::now();
    let mut records: Vec<CaseRecord> = Vec::new();
    let mut offset = 0usize;
    let mut pages = 0usize;
    let mut consecutive_errors = 0u32;

    loop {
        let page = source.fetch_page(offset, config.batch_size).await?;

        let batch = match page {
            Page::ServerError(message) => {
                consecutive_errors += 1;
                if let Some(max) = config.max_error_retries {
                    if consecutive_errors > max {
                        anyhow::bail!(
                            "feature service kept failing at offset {} after {} retries: {}",
                            offset, max, message
                        );
                    }
                }
                tracing::warn!(
                    offset,
                    attempt = consecutive_errors,
                    backoff_s = config.error_backoff_s,
                    error = %message,
                    "feature service returned an error, backing off"
                );
                tokio::time::sleep(Duration::from_secs(config.error_backoff_s)).await;
                continue;
            }
            Page::End => break,
            Page::Records(batch) if batch.is_empty() => break,
            Page::Records(batch) => batch,
        };

        consecutive_errors = 0;
        pages += 1;
        offset += batch.len();
        tracing::debug!(page = pages, received = batch.len(), offset, "page fetched");
        records.extend(batch);

        if config.max_pages.is_some_and(|max| pages >= max) {
            tracing::info!(pages, "page limit reached, stopping early");
            break;
        }

        tokio::time::sleep(Duration::from_millis(config.page_delay_ms)).await;
    }

    tracing::info!(
        records = records.len(),
        pages,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "fetch complete"
    );
    Ok(records)
}
