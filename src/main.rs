use dotenv::dotenv;
use std::process::ExitCode;
use tracing::{error, info, warn};

use review_crawler::cursor::JsonCursorStore;
use review_crawler::fetch::HttpFetcher;
use review_crawler::{Config, PagedScraper};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("🔥 Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(130),
        Err(e) => {
            error!("🔥 {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when interrupted.
async fn run(config: Config) -> anyhow::Result<bool> {
    let site = config.review_site()?;
    let fetcher = HttpFetcher::new(config.scraper.request_timeout)?;
    let scraper = PagedScraper::new(site, fetcher, config.scraper.clone(), config.credential.clone())?;
    let mut cursors = JsonCursorStore::open(&config.cursor_file)?;

    info!(
        "🕷️ Crawling {} target(s) on {} into '{}' (cursor file '{}')",
        config.targets.len(),
        scraper.site().name(),
        config.output_dir.display(),
        cursors.path().display()
    );

    let summaries = tokio::select! {
        summaries = scraper.crawl_targets(&config.targets, &config.output_dir, &mut cursors) => summaries,
        _ = tokio::signal::ctrl_c() => {
            warn!("⚠️ Interrupted. Records and cursors are saved up to the last completed page");
            return Ok(false);
        }
    };

    for summary in &summaries {
        info!("📊 {}", serde_json::to_string(summary)?);
    }
    let aborted = summaries.iter().filter(|s| !s.outcome.is_completed()).count();
    if aborted > 0 {
        warn!("⚠️ {} of {} target(s) aborted", aborted, summaries.len());
    }
    Ok(true)
}
