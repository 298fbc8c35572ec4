//! Score a scraped review file with the lexicon scorer.

use dotenv::dotenv;
use std::process::ExitCode;
use tracing::{error, info};

use review_crawler::batch::{score_file, write_scored};
use review_crawler::config::ScoreJobConfig;

fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let job = match ScoreJobConfig::from_env() {
        Ok(job) => job,
        Err(e) => {
            error!("🔥 Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&job) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("🔥 {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(job: &ScoreJobConfig) -> anyhow::Result<()> {
    let scorer = job.sentiment_scorer()?;
    let report = score_file(&job.input, &scorer, &job.language, job.scale)?;
    for skipped in &report.skipped {
        info!("⏭️ {}", skipped);
    }
    write_scored(&job.output, &report)?;
    info!(
        "💾 Wrote {} scored reviews to '{}' (mean {:.3})",
        report.scored.len(),
        job.output.display(),
        report.mean_score
    );
    Ok(())
}
