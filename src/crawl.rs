//! Paged crawl of one review listing, with retry, resume and durable progress.
//!
//! Per target the loop is strictly sequential: fetch page n, append its
//! records, advance and save the cursor, sleep, fetch page n+1. Records and
//! cursor are written without an await point in between, so dropping the
//! crawl future (ctrl-c) can never leave the cursor ahead of the data.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::cursor::{CursorStore, ScrapeCursor};
use crate::error::{ConfigError, FetchError};
use crate::fetch::{classify_response, pick_user_agent, IdentityHeaders, PageFetcher, PageRequest, DEFAULT_REQUEST_TIMEOUT};
use crate::record::{output_path, CsvRecordSink};
use crate::retry::RetryPolicy;
use crate::sites::{generic_block_marker, ParsedPage, ReviewSite};

pub const DEFAULT_MAX_PAGES: u32 = 30;
/// Pages in a row without records (or failed) before the listing is
/// considered exhausted. Empirical; some sites keep serving empty pages.
/// A page already stored by an earlier run breaks the streak.
pub const DEFAULT_EMPTY_PAGE_LIMIT: u32 = 3;
pub const DEFAULT_DELAY_MIN: Duration = Duration::from_secs(3);
pub const DEFAULT_DELAY_MAX: Duration = Duration::from_secs(6);
pub const DEFAULT_TARGET_PAUSE_MIN: Duration = Duration::from_secs(10);
pub const DEFAULT_TARGET_PAUSE_MAX: Duration = Duration::from_secs(20);

/// Uniform random wait between `min` and `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    pub min: Duration,
    pub max: Duration,
}

impl DelayWindow {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let secs: f64 = {
            let mut rng = rand::thread_rng();
            rng.gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64())
        };
        Duration::from_secs_f64(secs)
    }

    async fn pause(&self, reason: &str) {
        let wait = self.sample();
        debug!("🛡️ {}: pausing for {:.1}s", reason, wait.as_secs_f64());
        sleep(wait).await;
    }
}

/// What to do when a page exhausts its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedPagePolicy {
    /// Log it, keep the cursor behind it and carry on with the next page.
    #[default]
    Skip,
    /// Stop the target.
    Abort,
}

impl FailedPagePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "skip" => Some(FailedPagePolicy::Skip),
            "abort" => Some(FailedPagePolicy::Abort),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScraperConfig {
    pub max_pages: u32,
    /// Stop once this many records were collected in this run. Checked
    /// between pages, so the last page is never cut short.
    pub max_records: Option<usize>,
    pub delay: DelayWindow,
    pub target_pause: DelayWindow,
    pub retry: RetryPolicy,
    pub empty_page_limit: u32,
    pub failed_page_policy: FailedPagePolicy,
    pub retain_completed_cursors: bool,
    /// Fixed browser identity; a random one from the pool otherwise.
    pub user_agent: Option<String>,
    pub request_timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            max_records: None,
            delay: DelayWindow::new(DEFAULT_DELAY_MIN, DEFAULT_DELAY_MAX),
            target_pause: DelayWindow::new(DEFAULT_TARGET_PAUSE_MIN, DEFAULT_TARGET_PAUSE_MAX),
            retry: RetryPolicy::default(),
            empty_page_limit: DEFAULT_EMPTY_PAGE_LIMIT,
            failed_page_policy: FailedPagePolicy::default(),
            retain_completed_cursors: false,
            user_agent: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    NoNextPage,
    /// Review containers were missing; end of results or a markup change.
    NoMoreContent,
    EmptyPages,
    PageCeiling,
    RecordCeiling,
}

impl CompletionReason {
    /// The site itself signalled the end, as opposed to a local ceiling.
    pub fn is_end_of_listing(self) -> bool {
        matches!(
            self,
            CompletionReason::NoNextPage | CompletionReason::NoMoreContent | CompletionReason::EmptyPages
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    Blocked,
    Rejected,
    PageFailed,
    Persistence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CrawlOutcome {
    Completed(CompletionReason),
    Aborted(AbortReason),
}

impl CrawlOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CrawlOutcome::Completed(_))
    }
}

/// Counts for one target, reported instead of raising.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub target: String,
    pub series_key: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub start_page: u32,
    pub last_completed_page: u32,
    pub pages_fetched: u32,
    pub records_collected: usize,
    /// Pages that exhausted their retries in this run.
    pub failed_pages: Vec<u32>,
    /// Pages stored past a gap; the cursor will absorb them once the gap fills.
    pub pending_pages: Vec<u32>,
    pub outcome: CrawlOutcome,
}

impl CrawlSummary {
    fn start(target: &str, cursor: &ScrapeCursor) -> Self {
        let now = Utc::now();
        Self {
            target: target.to_string(),
            series_key: cursor.series_key.clone(),
            started_at: now,
            finished_at: now,
            start_page: cursor.next_page(),
            last_completed_page: cursor.last_completed_page,
            pages_fetched: 0,
            records_collected: 0,
            failed_pages: Vec::new(),
            pending_pages: Vec::new(),
            outcome: CrawlOutcome::Completed(CompletionReason::NoNextPage),
        }
    }
}

pub struct PagedScraper<F: PageFetcher> {
    site: Box<dyn ReviewSite>,
    fetcher: F,
    config: ScraperConfig,
    user_agent: String,
    credential: Option<String>,
}

impl<F: PageFetcher> PagedScraper<F> {
    /// Fails before any request is built if the site needs a session
    /// credential and none was given, or if the identity is not a valid header.
    pub fn new(
        site: Box<dyn ReviewSite>,
        fetcher: F,
        config: ScraperConfig,
        credential: Option<String>,
    ) -> Result<Self, ConfigError> {
        let credential = credential.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        if site.requires_credential() && credential.is_none() {
            return Err(ConfigError::MissingCredential { site: site.name().to_string() });
        }
        let user_agent = config.user_agent.clone().unwrap_or_else(pick_user_agent);
        let scraper = Self { site, fetcher, config, user_agent, credential };
        scraper.identity("").to_header_map()?;
        Ok(scraper)
    }

    pub fn site(&self) -> &dyn ReviewSite {
        self.site.as_ref()
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Headers for every request on `target`; the same user agent throughout.
    pub fn identity(&self, target: &str) -> IdentityHeaders {
        IdentityHeaders {
            user_agent: self.user_agent.clone(),
            referer: self.site.referer(target),
            accept_language: self.site.accept_language().to_string(),
            cookie: self.credential.clone(),
        }
    }

    /// Fetch and parse one page, retrying transient failures only.
    pub async fn fetch_page(&self, target: &str, page: u32) -> Result<ParsedPage, FetchError> {
        let request = PageRequest {
            url: self.site.page_url(target, page),
            identity: self.identity(target),
        };
        let label = format!("{} page {}", self.site.series_key(target), page);
        let request = &request;
        let body = self
            .config
            .retry
            .run(
                &label,
                |attempt| async move {
                    debug!("🌐 GET {} (attempt {})", request.url, attempt);
                    let raw = self.fetcher.fetch(request).await?;
                    classify_response(raw, self.site.as_ref())
                },
                FetchError::is_retryable,
            )
            .await?;
        match self.site.parse_page(&body, target, page) {
            Err(FetchError::ParseShape { detail }) => match generic_block_marker(&body) {
                Some(marker) => Err(FetchError::Blocked { status: 200, marker: Some(marker.to_string()) }),
                None => Err(FetchError::ParseShape { detail }),
            },
            parsed => parsed,
        }
    }

    /// Crawl one target from its stored cursor until the listing ends, a
    /// ceiling is reached or the site blocks us.
    pub async fn crawl_target(
        &self,
        target: &str,
        sink: &mut CsvRecordSink,
        cursors: &mut dyn CursorStore,
    ) -> CrawlSummary {
        let series_key = self.site.series_key(target);
        let mut cursor = cursors
            .load(&series_key)
            .unwrap_or_else(|| ScrapeCursor::new(series_key.clone()));
        let mut summary = CrawlSummary::start(target, &cursor);
        if summary.start_page > 1 {
            info!("📍 Resuming {} from page {}", series_key, summary.start_page);
        } else {
            info!("🚀 Starting {}", series_key);
        }

        // Filling a gap absorbs these into the cursor, so remember them up front.
        let stored_ahead = cursor.pending.clone();
        let mut page = summary.start_page;
        let mut consecutive_empty = 0;
        let mut first_request = true;
        let outcome = loop {
            if page > self.config.max_pages {
                info!("🏁 {} reached the page ceiling ({})", series_key, self.config.max_pages);
                break CrawlOutcome::Completed(CompletionReason::PageCeiling);
            }
            if stored_ahead.contains(&page) {
                debug!("⏭️ {} page {} already stored", series_key, page);
                consecutive_empty = 0;
                page += 1;
                continue;
            }
            if let Some(max) = self.config.max_records {
                if summary.records_collected >= max {
                    info!("🏁 {} collected {} records (limit {})", series_key, summary.records_collected, max);
                    break CrawlOutcome::Completed(CompletionReason::RecordCeiling);
                }
            }

            if !first_request {
                self.config.delay.pause("Page delay").await;
            }
            first_request = false;

            match self.fetch_page(target, page).await {
                Ok(parsed) => {
                    summary.pages_fetched += 1;
                    // No await between the append and the cursor save.
                    if let Err(e) = sink.append_page(&parsed.records) {
                        error!("💥 {} page {}: cannot write records: {:#}", series_key, page, e);
                        break CrawlOutcome::Aborted(AbortReason::Persistence);
                    }
                    summary.records_collected += parsed.records.len();
                    cursor.mark_completed(page);
                    if let Err(e) = cursors.save(&cursor) {
                        error!("💥 {} page {}: cannot save cursor: {:#}", series_key, page, e);
                        break CrawlOutcome::Aborted(AbortReason::Persistence);
                    }
                    summary.last_completed_page = cursor.last_completed_page;
                    info!(
                        "📄 {} page {}: {} records (total {})",
                        series_key,
                        page,
                        parsed.records.len(),
                        summary.records_collected
                    );

                    if parsed.records.is_empty() {
                        consecutive_empty += 1;
                    } else {
                        consecutive_empty = 0;
                    }
                    if !parsed.has_next {
                        info!("🏁 {} has no next page after page {}", series_key, page);
                        break CrawlOutcome::Completed(CompletionReason::NoNextPage);
                    }
                }
                Err(FetchError::ParseShape { detail }) => {
                    info!("🏁 {} page {}: {}; treating as end of listing", series_key, page, detail);
                    break CrawlOutcome::Completed(CompletionReason::NoMoreContent);
                }
                Err(e @ FetchError::Blocked { .. }) => {
                    error!("🚫 {} page {}: {}. Aborting target", series_key, page, e);
                    break CrawlOutcome::Aborted(AbortReason::Blocked);
                }
                Err(e @ FetchError::Rejected { .. }) => {
                    error!("🚫 {} page {}: {}. Aborting target", series_key, page, e);
                    break CrawlOutcome::Aborted(AbortReason::Rejected);
                }
                Err(e @ FetchError::Transient { .. }) => {
                    warn!("⚠️ {} page {} failed after retries: {}", series_key, page, e);
                    summary.failed_pages.push(page);
                    if self.config.failed_page_policy == FailedPagePolicy::Abort {
                        break CrawlOutcome::Aborted(AbortReason::PageFailed);
                    }
                    consecutive_empty += 1;
                }
            }

            if consecutive_empty >= self.config.empty_page_limit {
                info!("🏁 {}: {} empty pages in a row", series_key, consecutive_empty);
                break CrawlOutcome::Completed(CompletionReason::EmptyPages);
            }
            page += 1;
        };

        summary.outcome = outcome;
        summary.pending_pages = cursor.pending.iter().copied().collect();
        summary.finished_at = Utc::now();

        let finished_listing = matches!(outcome, CrawlOutcome::Completed(reason) if reason.is_end_of_listing());
        if finished_listing
            && summary.failed_pages.is_empty()
            && !cursor.has_gap()
            && !self.config.retain_completed_cursors
        {
            match cursors.remove(&series_key) {
                Ok(()) => debug!("🧹 {} complete, cursor removed", series_key),
                Err(e) => warn!("⚠️ {} complete but cursor removal failed: {:#}", series_key, e),
            }
        }

        match outcome {
            CrawlOutcome::Completed(reason) => info!(
                "✅ {} completed ({:?}): {} pages, {} records, {} failed",
                series_key,
                reason,
                summary.pages_fetched,
                summary.records_collected,
                summary.failed_pages.len()
            ),
            CrawlOutcome::Aborted(reason) => error!(
                "❌ {} aborted ({:?}): {} pages, {} records, cursor at page {}",
                series_key, reason, summary.pages_fetched, summary.records_collected, summary.last_completed_page
            ),
        }
        summary
    }

    /// Crawl several targets one after another, pausing between them.
    /// Each target writes to its own record file under `output_dir`.
    pub async fn crawl_targets(
        &self,
        targets: &[String],
        output_dir: &Path,
        cursors: &mut dyn CursorStore,
    ) -> Vec<CrawlSummary> {
        let mut summaries = Vec::with_capacity(targets.len());
        for (index, target) in targets.iter().enumerate() {
            if index > 0 {
                self.config.target_pause.pause("Between targets").await;
            }
            let path = output_path(output_dir, self.site.as_ref(), target);
            let mut sink = match CsvRecordSink::open(&path) {
                Ok(sink) => sink,
                Err(e) => {
                    error!("💥 {}: cannot open '{}': {:#}", target, path.display(), e);
                    let series_key = self.site.series_key(target);
                    let cursor = cursors.load(&series_key).unwrap_or_else(|| ScrapeCursor::new(series_key));
                    let mut summary = CrawlSummary::start(target, &cursor);
                    summary.outcome = CrawlOutcome::Aborted(AbortReason::Persistence);
                    summaries.push(summary);
                    continue;
                }
            };
            summaries.push(self.crawl_target(target, &mut sink, cursors).await);
        }
        summaries
    }
}
