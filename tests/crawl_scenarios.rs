use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use review_crawler::crawl::{AbortReason, CompletionReason, DelayWindow, FailedPagePolicy, ScraperConfig};
use review_crawler::cursor::{CursorStore, JsonCursorStore, ScrapeCursor};
use review_crawler::fetch::{PageFetcher, PageRequest, RawResponse};
use review_crawler::record::{output_path, read_records, CsvRecordSink};
use review_crawler::sites::{Douban, DoubanSort, ReviewSite};
use review_crawler::{ConfigError, CrawlOutcome, FetchError, PagedScraper};
use tempfile::{tempdir, TempDir};

const TARGET: &str = "27072327";
const COOKIE: &str = "bid=fixture; dbcl2=\"1:x\"";

/// In-process listing server. Each URL plays its scripted responses in
/// order and then repeats the last one; unknown URLs get an empty listing.
#[derive(Clone, Default)]
struct Fixture {
    inner: Arc<FixtureInner>,
}

#[derive(Default)]
struct FixtureInner {
    script: Mutex<HashMap<String, Vec<RawResponse>>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl Fixture {
    fn page(&self, page: u32, responses: Vec<RawResponse>) -> &Self {
        self.script(Douban::new(DoubanSort::Hottest).page_url(TARGET, page), responses)
    }

    fn script(&self, url: String, responses: Vec<RawResponse>) -> &Self {
        self.inner.script.lock().unwrap().insert(url, responses);
        self
    }

    fn hits(&self, page: u32) -> usize {
        self.hits_at(&Douban::new(DoubanSort::Hottest).page_url(TARGET, page))
    }

    fn hits_at(&self, url: &str) -> usize {
        self.inner.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn total_hits(&self) -> usize {
        self.inner.hits.lock().unwrap().values().sum()
    }
}

impl PageFetcher for Fixture {
    async fn fetch(&self, request: &PageRequest) -> Result<RawResponse, FetchError> {
        assert_eq!(request.identity.cookie.as_deref(), Some(COOKIE));
        let attempt = {
            let mut hits = self.inner.hits.lock().unwrap();
            let count = hits.entry(request.url.clone()).or_insert(0);
            *count += 1;
            *count
        };
        let script = self.inner.script.lock().unwrap();
        let response = match script.get(&request.url) {
            Some(responses) => responses[(attempt - 1).min(responses.len() - 1)].clone(),
            None => RawResponse::ok("<html><body><div id=\"comments\"></div></body></html>"),
        };
        Ok(response)
    }
}

fn listing(page: u32, count: usize, has_next: bool) -> RawResponse {
    let mut html = String::from("<html><body><div id=\"comments\">");
    for i in 0..count {
        html.push_str(&format!(
            r#"<div class="comment-item" data-cid="{page}-{i}">
                 <span class="comment-info"><a href="/people/{i}/">user{i}</a>
                   <span class="allstar40 rating"></span>
                   <span class="comment-time">2024-03-0{d} 10:00:00</span></span>
                 <span class="votes">{i}</span>
                 <p><span class="short">第{page}页的第{i}条短评</span></p>
               </div>"#,
            page = page,
            i = i,
            d = (page % 9) + 1,
        ));
    }
    html.push_str("</div>");
    if has_next {
        html.push_str(r#"<div id="paginator"><a class="next" href="?start=20">后页</a></div>"#);
    }
    html.push_str("</body></html>");
    RawResponse::ok(html)
}

/// A page whose comment items all have empty bodies.
fn hollow_listing() -> RawResponse {
    RawResponse::ok(
        r#"<div class="comment-item"><span class="short"> </span></div>
           <a class="next" href="?start=20">后页</a>"#,
    )
}

struct Workspace {
    _dir: TempDir,
    records: std::path::PathBuf,
    cursors: std::path::PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let records = output_path(dir.path(), &Douban::new(DoubanSort::Hottest), TARGET);
        let cursors = dir.path().join("progress.json");
        Self { _dir: dir, records, cursors }
    }

    fn sink(&self) -> CsvRecordSink {
        CsvRecordSink::open(&self.records).unwrap()
    }

    fn store(&self) -> JsonCursorStore {
        JsonCursorStore::open(&self.cursors).unwrap()
    }

    fn stored_cursor(&self) -> Option<ScrapeCursor> {
        self.store().load(&format!("douban:{}", TARGET))
    }
}

fn scraper(fixture: &Fixture, config: ScraperConfig) -> PagedScraper<Fixture> {
    PagedScraper::new(
        Box::new(Douban::new(DoubanSort::Hottest)),
        fixture.clone(),
        config,
        Some(COOKIE.to_string()),
    )
    .unwrap()
}

fn keep_cursors() -> ScraperConfig {
    ScraperConfig { retain_completed_cursors: true, ..ScraperConfig::default() }
}

fn ids(path: &Path) -> Vec<String> {
    read_records(path).unwrap().into_iter().map(|r| r.id).collect()
}

#[tokio::test(start_paused = true)]
async fn test_two_page_listing_completes() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    fixture.page(1, vec![listing(1, 20, true)]).page(2, vec![listing(2, 5, false)]);

    let summary = scraper(&fixture, keep_cursors())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;

    assert_eq!(summary.outcome, CrawlOutcome::Completed(CompletionReason::NoNextPage));
    assert_eq!(summary.records_collected, 25);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.last_completed_page, 2);
    assert!(summary.failed_pages.is_empty());
    assert_eq!(read_records(&ws.records).unwrap().len(), 25);
    assert_eq!(ws.stored_cursor().unwrap().last_completed_page, 2);
}

#[tokio::test(start_paused = true)]
async fn test_completed_cursor_is_removed_by_default() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    fixture.page(1, vec![listing(1, 20, true)]).page(2, vec![listing(2, 5, false)]);

    scraper(&fixture, ScraperConfig::default())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;

    assert!(ws.stored_cursor().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_forbidden_page_aborts_without_retry() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    fixture
        .page(1, vec![listing(1, 20, true)])
        .page(2, vec![listing(2, 20, true)])
        .page(3, vec![RawResponse::status(403)]);

    let summary = scraper(&fixture, ScraperConfig::default())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;

    assert_eq!(summary.outcome, CrawlOutcome::Aborted(AbortReason::Blocked));
    assert_eq!(fixture.hits(3), 1);
    assert_eq!(summary.records_collected, 40);
    assert_eq!(read_records(&ws.records).unwrap().len(), 40);
    assert_eq!(ws.stored_cursor().unwrap().last_completed_page, 2);
}

#[tokio::test(start_paused = true)]
async fn test_anti_automation_page_aborts() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    fixture.page(1, vec![RawResponse::ok("<html><body>检测到有异常请求从你的 IP 发出</body></html>")]);

    let summary = scraper(&fixture, ScraperConfig::default())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;

    assert_eq!(summary.outcome, CrawlOutcome::Aborted(AbortReason::Blocked));
    assert_eq!(fixture.hits(1), 1);
    assert!(ws.stored_cursor().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_retry_until_success() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    let unavailable = RawResponse::status(503);
    fixture.page(1, vec![listing(1, 20, true)]).page(
        2,
        vec![
            unavailable.clone(),
            unavailable.clone(),
            unavailable.clone(),
            unavailable,
            listing(2, 5, false),
        ],
    );

    let summary = scraper(&fixture, ScraperConfig::default())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;

    assert_eq!(summary.outcome, CrawlOutcome::Completed(CompletionReason::NoNextPage));
    assert_eq!(fixture.hits(2), 5);
    assert_eq!(summary.records_collected, 25);
    let page_two = ids(&ws.records).into_iter().filter(|id| id.starts_with("2-")).count();
    assert_eq!(page_two, 5);
}

#[tokio::test(start_paused = true)]
async fn test_resume_skips_completed_pages() {
    let ws = Workspace::new();
    let mut cursor = ScrapeCursor::new(format!("douban:{}", TARGET));
    cursor.mark_completed(1);
    cursor.mark_completed(2);
    ws.store().save(&cursor).unwrap();

    let fixture = Fixture::default();
    fixture
        .page(1, vec![listing(1, 20, true)])
        .page(2, vec![listing(2, 20, true)])
        .page(3, vec![listing(3, 20, true)])
        .page(4, vec![listing(4, 3, false)]);

    let summary = scraper(&fixture, keep_cursors())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;

    assert_eq!(summary.start_page, 3);
    assert_eq!(fixture.hits(1), 0);
    assert_eq!(fixture.hits(2), 0);
    assert_eq!(summary.records_collected, 23);
    assert!(ids(&ws.records).iter().all(|id| id.starts_with("3-") || id.starts_with("4-")));
    assert_eq!(ws.stored_cursor().unwrap().last_completed_page, 4);
}

/// Cursor store whose n-th save fails, as if the process died between
/// writing a page's records and advancing the cursor.
struct FailingStore {
    inner: JsonCursorStore,
    saves: usize,
    fail_on: usize,
}

impl CursorStore for FailingStore {
    fn load(&self, series_key: &str) -> Option<ScrapeCursor> {
        self.inner.load(series_key)
    }

    fn save(&mut self, cursor: &ScrapeCursor) -> anyhow::Result<()> {
        self.saves += 1;
        if self.saves == self.fail_on {
            anyhow::bail!("disk full");
        }
        self.inner.save(cursor)
    }

    fn remove(&mut self, series_key: &str) -> anyhow::Result<()> {
        self.inner.remove(series_key)
    }
}

#[tokio::test(start_paused = true)]
async fn test_cursor_never_ahead_of_records() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    fixture
        .page(1, vec![listing(1, 20, true)])
        .page(2, vec![listing(2, 20, true)])
        .page(3, vec![listing(3, 20, false)]);

    let mut failing = FailingStore { inner: ws.store(), saves: 0, fail_on: 2 };
    let summary = scraper(&fixture, keep_cursors())
        .crawl_target(TARGET, &mut ws.sink(), &mut failing)
        .await;
    assert_eq!(summary.outcome, CrawlOutcome::Aborted(AbortReason::Persistence));

    let highest_written = read_records(&ws.records).unwrap().iter().map(|r| r.source_page).max().unwrap();
    let cursor = ws.stored_cursor().unwrap();
    assert_eq!(cursor.last_completed_page, 1);
    assert!(cursor.last_completed_page <= highest_written);

    // The resumed run refetches page 2 but never page 1.
    let resumed = scraper(&fixture, keep_cursors())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;
    assert_eq!(resumed.outcome, CrawlOutcome::Completed(CompletionReason::NoNextPage));
    assert_eq!(fixture.hits(1), 1);
    let all = ids(&ws.records);
    assert_eq!(all.iter().filter(|id| id.starts_with("1-")).count(), 20);
    assert_eq!(all.iter().filter(|id| id.starts_with("3-")).count(), 20);
}

#[tokio::test(start_paused = true)]
async fn test_failed_page_is_skipped_and_filled_on_resume() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    fixture
        .page(1, vec![listing(1, 20, true)])
        .page(2, vec![RawResponse::status(502)])
        .page(3, vec![listing(3, 7, false)]);

    let summary = scraper(&fixture, ScraperConfig::default())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;

    assert_eq!(summary.outcome, CrawlOutcome::Completed(CompletionReason::NoNextPage));
    assert_eq!(summary.failed_pages, vec![2]);
    assert_eq!(summary.pending_pages, vec![3]);
    assert_eq!(fixture.hits(2), 5);
    let cursor = ws.stored_cursor().expect("gapped cursor is kept");
    assert_eq!(cursor.last_completed_page, 1);

    // Page 2 recovers; page 3 is already on disk and is not fetched again.
    fixture.page(2, vec![listing(2, 20, true)]);
    let resumed = scraper(&fixture, ScraperConfig::default())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;

    assert_eq!(resumed.outcome, CrawlOutcome::Completed(CompletionReason::NoMoreContent));
    assert_eq!(fixture.hits(3), 1);
    assert_eq!(read_records(&ws.records).unwrap().len(), 47);
    assert!(ws.stored_cursor().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_abort_policy_stops_on_failed_page() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    fixture.page(1, vec![listing(1, 20, true)]).page(2, vec![RawResponse::status(500)]);

    let config = ScraperConfig { failed_page_policy: FailedPagePolicy::Abort, ..ScraperConfig::default() };
    let summary = scraper(&fixture, config)
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;

    assert_eq!(summary.outcome, CrawlOutcome::Aborted(AbortReason::PageFailed));
    assert_eq!(fixture.hits(3), 0);
    assert_eq!(ws.stored_cursor().unwrap().last_completed_page, 1);
}

#[tokio::test(start_paused = true)]
async fn test_three_empty_pages_end_the_crawl() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    fixture
        .page(1, vec![listing(1, 20, true)])
        .page(2, vec![hollow_listing()])
        .page(3, vec![hollow_listing()])
        .page(4, vec![hollow_listing()])
        .page(5, vec![listing(5, 20, true)]);

    let summary = scraper(&fixture, ScraperConfig::default())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;

    assert_eq!(summary.outcome, CrawlOutcome::Completed(CompletionReason::EmptyPages));
    assert_eq!(summary.pages_fetched, 4);
    assert_eq!(fixture.hits(5), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_container_ends_as_no_more_content() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    fixture.page(1, vec![listing(1, 20, true)]);

    let summary = scraper(&fixture, ScraperConfig::default())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;

    assert_eq!(summary.outcome, CrawlOutcome::Completed(CompletionReason::NoMoreContent));
    assert_eq!(summary.records_collected, 20);
    assert_eq!(summary.last_completed_page, 1);
}

#[tokio::test(start_paused = true)]
async fn test_ceilings() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    for page in 1..=5 {
        fixture.page(page, vec![listing(page, 20, true)]);
    }

    let config = ScraperConfig { max_pages: 3, ..keep_cursors() };
    let summary = scraper(&fixture, config)
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;
    assert_eq!(summary.outcome, CrawlOutcome::Completed(CompletionReason::PageCeiling));
    assert_eq!(summary.pages_fetched, 3);
    // A ceiling is not the end of the listing, so the cursor stays.
    assert_eq!(ws.stored_cursor().unwrap().last_completed_page, 3);

    let config = ScraperConfig { max_records: Some(30), ..keep_cursors() };
    let summary = scraper(&fixture, config)
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;
    assert_eq!(summary.outcome, CrawlOutcome::Completed(CompletionReason::RecordCeiling));
    assert_eq!(summary.records_collected, 40);
    assert_eq!(fixture.hits(4), 1);
    assert_eq!(fixture.hits(5), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pages_are_spaced_by_the_delay_window() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    fixture
        .page(1, vec![listing(1, 20, true)])
        .page(2, vec![listing(2, 20, true)])
        .page(3, vec![listing(3, 20, false)]);

    let config = ScraperConfig::default();
    let min_delay = config.delay.min;
    let start = tokio::time::Instant::now();
    scraper(&fixture, config)
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;
    assert!(start.elapsed() >= min_delay * 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_credential_fails_before_any_request() {
    let fixture = Fixture::default();
    fixture.page(1, vec![listing(1, 20, false)]);

    let result = PagedScraper::new(
        Box::new(Douban::new(DoubanSort::Latest)),
        fixture.clone(),
        ScraperConfig::default(),
        None,
    );

    assert_eq!(result.err(), Some(ConfigError::MissingCredential { site: "douban".into() }));
    assert_eq!(fixture.total_hits(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_crawl_targets_writes_one_file_per_target() {
    let dir = tempdir().unwrap();
    let fixture = Fixture::default();
    fixture.page(1, vec![listing(1, 4, false)]);

    let mut store = JsonCursorStore::open(dir.path().join("progress.json")).unwrap();
    let targets = vec![TARGET.to_string(), "1291546".to_string()];
    let start = tokio::time::Instant::now();
    let summaries = scraper(&fixture, ScraperConfig::default())
        .crawl_targets(&targets, dir.path(), &mut store)
        .await;

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].records_collected, 4);
    // The second target has no scripted pages: an empty listing.
    assert_eq!(summaries[1].outcome, CrawlOutcome::Completed(CompletionReason::NoMoreContent));
    assert!(output_path(dir.path(), &Douban::new(DoubanSort::Hottest), "1291546").exists());
    assert!(start.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_latest_sort_ignores_hottest_cursor() {
    let ws = Workspace::new();
    let mut hottest = ScrapeCursor::new(format!("douban:{}", TARGET));
    for page in 1..=5 {
        hottest.mark_completed(page);
    }
    ws.store().save(&hottest).unwrap();

    let latest = Douban::new(DoubanSort::Latest);
    let fixture = Fixture::default();
    fixture
        .script(latest.page_url(TARGET, 1), vec![listing(1, 20, true)])
        .script(latest.page_url(TARGET, 2), vec![listing(2, 3, false)]);

    let output_dir = ws.cursors.parent().unwrap().to_path_buf();
    let scraper = PagedScraper::new(Box::new(latest.clone()), fixture.clone(), keep_cursors(), Some(COOKIE.into())).unwrap();
    let summaries = scraper
        .crawl_targets(&[TARGET.to_string()], &output_dir, &mut ws.store())
        .await;

    let summary = &summaries[0];
    assert_eq!(summary.series_key, format!("douban-latest:{}", TARGET));
    assert_eq!(summary.start_page, 1);
    assert_eq!(fixture.hits_at(&latest.page_url(TARGET, 1)), 1);
    assert_eq!(summary.outcome, CrawlOutcome::Completed(CompletionReason::NoNextPage));

    let latest_file = output_path(&output_dir, &latest, TARGET);
    assert_ne!(latest_file, ws.records);
    assert_eq!(read_records(&latest_file).unwrap().len(), 23);
    assert!(!ws.records.exists());

    let store = ws.store();
    assert_eq!(store.load(&format!("douban:{}", TARGET)).unwrap().last_completed_page, 5);
    assert_eq!(store.load(&format!("douban-latest:{}", TARGET)).unwrap().last_completed_page, 2);
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_crawl_resumes_without_duplicates() {
    // Pages go out at 0s, 5s and 10s; page 3 fails and is retried at 12s.
    // 7s cuts during the page delay, 13s during the retry backoff.
    for cut in [7, 13] {
        let ws = Workspace::new();
        let fixture = Fixture::default();
        fixture
            .page(1, vec![listing(1, 20, true)])
            .page(2, vec![listing(2, 20, true)])
            .page(3, vec![RawResponse::status(503)]);
        let steady = Duration::from_secs(5);
        let config = ScraperConfig { delay: DelayWindow::new(steady, steady), ..keep_cursors() };

        let interrupted = tokio::time::timeout(
            Duration::from_secs(cut),
            scraper(&fixture, config.clone()).crawl_target(TARGET, &mut ws.sink(), &mut ws.store()),
        )
        .await;
        assert!(interrupted.is_err(), "crawl finished before the {}s cut", cut);

        let cursor = ws.stored_cursor().unwrap();
        let highest_written = read_records(&ws.records).unwrap().iter().map(|r| r.source_page).max().unwrap();
        assert!(cursor.last_completed_page <= highest_written);
        assert_eq!(cursor.last_completed_page, 2);

        fixture.page(3, vec![listing(3, 20, false)]);
        let resumed = scraper(&fixture, config)
            .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
            .await;
        assert_eq!(resumed.start_page, 3);
        assert_eq!(resumed.outcome, CrawlOutcome::Completed(CompletionReason::NoNextPage));
        assert_eq!(fixture.hits(1), 1);

        let all = ids(&ws.records);
        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(all.len(), 60);
        assert_eq!(unique.len(), all.len());
    }
}

#[tokio::test(start_paused = true)]
async fn test_generic_bot_check_only_on_pages_without_reviews() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    let quoting = RawResponse::ok(
        r#"<div class="comment-item" data-cid="q-1">
             <span class="short">Stuck in unusual traffic on the way, still worth it</span>
           </div>
           <a class="next" href="?start=20">后页</a>"#,
    );
    let bot_check = RawResponse::ok("<html><head><title>Verify it's you</title></head><body>unusual traffic</body></html>");
    fixture.page(1, vec![quoting]).page(2, vec![bot_check]);

    let summary = scraper(&fixture, ScraperConfig::default())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;

    assert_eq!(summary.outcome, CrawlOutcome::Aborted(AbortReason::Blocked));
    assert_eq!(summary.records_collected, 1);
    assert_eq!(fixture.hits(2), 1);
    assert_eq!(ws.stored_cursor().unwrap().last_completed_page, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stored_page_breaks_empty_streak() {
    let ws = Workspace::new();
    let fixture = Fixture::default();
    fixture
        .page(1, vec![listing(1, 20, true)])
        .page(2, vec![RawResponse::status(503)])
        .page(3, vec![listing(3, 5, false)]);

    let first = scraper(&fixture, ScraperConfig::default())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;
    assert_eq!(first.failed_pages, vec![2]);
    assert_eq!(first.pending_pages, vec![3]);

    // Page 2 comes back empty; page 3 is on disk; 4, 5 and 6 are empty.
    fixture.page(2, vec![hollow_listing()]);
    for page in 4..=6 {
        fixture.page(page, vec![hollow_listing()]);
    }
    fixture.page(7, vec![listing(7, 20, true)]);

    let resumed = scraper(&fixture, ScraperConfig::default())
        .crawl_target(TARGET, &mut ws.sink(), &mut ws.store())
        .await;
    assert_eq!(resumed.outcome, CrawlOutcome::Completed(CompletionReason::EmptyPages));
    assert_eq!(resumed.pages_fetched, 4);
    assert_eq!(fixture.hits(3), 1);
    assert_eq!(fixture.hits(6), 1);
    assert_eq!(fixture.hits(7), 0);
}
