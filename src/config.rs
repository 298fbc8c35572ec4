//! Process configuration, read once from the environment (after `.env`).
//!
//! Everything is optional except `REVIEW_TARGETS`. Values that are present
//! but unparseable are fatal; nothing falls back silently.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::crawl::{DelayWindow, FailedPagePolicy, ScraperConfig};
use crate::error::ConfigError;
use crate::lexicon::Lexicon;
use crate::retry::RetryPolicy;
use crate::sentiment::{ScaleHint, ScorerConfig, SentimentScorer};
use crate::sites::{site_from_name, ReviewSite};

pub const DEFAULT_SITE: &str = "douban";
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const CURSOR_FILE_NAME: &str = "progress.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub site: String,
    pub targets: Vec<String>,
    pub output_dir: PathBuf,
    pub cursor_file: PathBuf,
    /// Session cookie for sites that need a login. Passed through untouched.
    pub credential: Option<String>,
    pub scraper: ScraperConfig,
    pub lexicon_file: Option<PathBuf>,
    pub scorer: ScorerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; tests pass a map instead of touching env.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let site = get("REVIEW_SITE").unwrap_or_else(|| DEFAULT_SITE.to_string()).to_lowercase();
        site_from_name(&site)?;

        let targets: Vec<String> = get("REVIEW_TARGETS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        let output_dir = PathBuf::from(get("REVIEW_OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()));
        let cursor_file = get("REVIEW_CURSOR_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| output_dir.join(CURSOR_FILE_NAME));

        let defaults = ScraperConfig::default();
        let delay = DelayWindow::new(
            parse_secs(&get, "REVIEW_DELAY_MIN_SECS", defaults.delay.min)?,
            parse_secs(&get, "REVIEW_DELAY_MAX_SECS", defaults.delay.max)?,
        );
        let target_pause = DelayWindow::new(
            parse_secs(&get, "REVIEW_TARGET_PAUSE_MIN_SECS", defaults.target_pause.min)?,
            parse_secs(&get, "REVIEW_TARGET_PAUSE_MAX_SECS", defaults.target_pause.max)?,
        );
        let retry = RetryPolicy::new(
            parse_or(&get, "REVIEW_RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts)?,
            parse_secs(&get, "REVIEW_RETRY_BASE_SECS", defaults.retry.base_delay)?,
        );
        let failed_page_policy = match get("REVIEW_ON_PAGE_FAILURE") {
            Some(value) => FailedPagePolicy::parse(&value).ok_or_else(|| invalid("REVIEW_ON_PAGE_FAILURE", &value))?,
            None => defaults.failed_page_policy,
        };
        let max_records = match get("REVIEW_MAX_RECORDS") {
            Some(value) => Some(value.parse::<usize>().map_err(|_| invalid("REVIEW_MAX_RECORDS", &value))?),
            None => None,
        };

        let scraper = ScraperConfig {
            max_pages: parse_or(&get, "REVIEW_MAX_PAGES", defaults.max_pages)?,
            max_records,
            delay,
            target_pause,
            retry,
            empty_page_limit: parse_or(&get, "REVIEW_EMPTY_PAGE_LIMIT", defaults.empty_page_limit)?.max(1),
            failed_page_policy,
            retain_completed_cursors: parse_bool(&get, "REVIEW_KEEP_COMPLETED_CURSORS", false)?,
            user_agent: get("REVIEW_USER_AGENT"),
            request_timeout: parse_secs(&get, "REVIEW_REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
        };

        Ok(Self {
            site,
            targets,
            output_dir,
            cursor_file,
            credential: get("REVIEW_COOKIE"),
            scraper,
            lexicon_file: get("REVIEW_LEXICON_FILE").map(PathBuf::from),
            scorer: scorer_config(&get)?,
        })
    }

    pub fn review_site(&self) -> Result<Box<dyn ReviewSite>, ConfigError> {
        site_from_name(&self.site)
    }

    /// Scorer over the configured lexicon file, or the built-in tables.
    pub fn sentiment_scorer(&self) -> Result<SentimentScorer> {
        load_scorer(self.lexicon_file.as_deref(), &self.scorer)
    }
}

/// Settings for the `score_reviews` binary.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreJobConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub language: String,
    pub scale: ScaleHint,
    pub lexicon_file: Option<PathBuf>,
    pub scorer: ScorerConfig,
}

impl ScoreJobConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let input = get("REVIEW_SCORE_INPUT")
            .map(PathBuf::from)
            .ok_or_else(|| invalid("REVIEW_SCORE_INPUT", ""))?;
        let output = get("REVIEW_SCORE_OUTPUT").map(PathBuf::from).unwrap_or_else(|| {
            let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("reviews");
            input.with_file_name(format!("{}_scored.csv", stem))
        });
        let scale = match get("REVIEW_SCORE_SCALE") {
            Some(value) => ScaleHint::parse(&value).ok_or_else(|| invalid("REVIEW_SCORE_SCALE", &value))?,
            None => ScaleHint::Auto,
        };

        Ok(Self {
            input,
            output,
            language: get("REVIEW_SCORE_LANGUAGE").unwrap_or_else(|| "zh".to_string()),
            scale,
            lexicon_file: get("REVIEW_LEXICON_FILE").map(PathBuf::from),
            scorer: scorer_config(&get)?,
        })
    }

    pub fn sentiment_scorer(&self) -> Result<SentimentScorer> {
        load_scorer(self.lexicon_file.as_deref(), &self.scorer)
    }
}

fn scorer_config<G>(get: &G) -> Result<ScorerConfig, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let defaults = ScorerConfig::default();
    Ok(ScorerConfig {
        rating_offset: parse_or(get, "REVIEW_RATING_OFFSET", defaults.rating_offset)?,
        rating_scale: parse_or(get, "REVIEW_RATING_SCALE", defaults.rating_scale)?,
        ..defaults
    })
}

fn load_scorer(lexicon_file: Option<&Path>, config: &ScorerConfig) -> Result<SentimentScorer> {
    let lexicon = match lexicon_file {
        Some(path) => Lexicon::from_json_file(path)?,
        None => Lexicon::builtin(),
    };
    Ok(SentimentScorer::new(lexicon, config.clone()))
}

fn invalid(var: &str, value: &str) -> ConfigError {
    ConfigError::Invalid { var: var.to_string(), value: value.to_string() }
}

fn parse_or<G, T>(get: &G, var: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(var) {
        Some(value) => value.parse().map_err(|_| invalid(var, &value)),
        None => Ok(default),
    }
}

fn parse_secs<G>(get: &G, var: &str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => value
            .parse::<f64>()
            .ok()
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .ok_or_else(|| invalid(var, &value)),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, var: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(invalid(var, &value)),
        },
        None => Ok(default),
    }
}
