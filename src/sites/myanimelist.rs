use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{encode_path, squashed_text, synthesized_id, ParsedPage, ReviewSite};
use crate::error::FetchError;
use crate::record::ReviewRecord;
use crate::sentiment::ScaleHint;

/// Shorter review bodies are navigation residue, not reviews.
pub const MIN_BODY_CHARS: usize = 20;

static REVIEW: Lazy<Selector> = Lazy::new(|| Selector::parse("div.review-element").expect("valid selector"));
static AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div.username a").expect("valid selector"));
static TEXT: Lazy<Selector> = Lazy::new(|| Selector::parse("div.text").expect("valid selector"));
static RATING: Lazy<Selector> = Lazy::new(|| Selector::parse("div.rating").expect("valid selector"));
static DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.date").expect("valid selector"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));
static DATE_FALLBACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d+,\s+\d{4}").expect("valid regex")
});
static HELPFUL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+of\s+(\d+)").expect("valid regex"));

/// Anime reviews on myanimelist.net. Targets are `{id}/{slug}`.
#[derive(Debug, Clone, Default)]
pub struct MyAnimeList;

impl ReviewSite for MyAnimeList {
    fn name(&self) -> &'static str {
        "myanimelist"
    }

    fn page_url(&self, target: &str, page: u32) -> String {
        let base = format!("https://myanimelist.net/anime/{}/reviews", encode_path(target));
        if page <= 1 {
            base
        } else {
            format!("{}?p={}", base, page)
        }
    }

    fn referer(&self, target: &str) -> String {
        format!("https://myanimelist.net/anime/{}", encode_path(target))
    }

    fn accept_language(&self) -> &'static str {
        "en-US,en;q=0.9"
    }

    fn language(&self) -> &'static str {
        "en"
    }

    fn rating_scale(&self) -> ScaleHint {
        ScaleHint::TenPoint
    }

    fn parse_page(&self, html: &str, target: &str, page: u32) -> Result<ParsedPage, FetchError> {
        let document = Html::parse_document(html);
        let reviews: Vec<_> = document.select(&REVIEW).collect();
        if reviews.is_empty() {
            return Err(FetchError::ParseShape {
                detail: format!("no div.review-element on page {}", page),
            });
        }

        let series_key = self.series_key(target);
        let records = reviews
            .into_iter()
            .enumerate()
            .filter_map(|(index, review)| parse_review(review, &series_key, page, index))
            .collect();

        // The pager is unreliable; the empty-page heuristic ends the crawl.
        Ok(ParsedPage { records, has_next: true })
    }
}

fn parse_review(review: ElementRef<'_>, series_key: &str, page: u32, index: usize) -> Option<ReviewRecord> {
    let body_text = match review.select(&TEXT).next() {
        Some(text) => own_text(text),
        None => squashed_text(review),
    };
    if body_text.chars().count() < MIN_BODY_CHARS {
        return None;
    }

    let all_text = review.text().collect::<String>();
    let rating_raw = review
        .select(&RATING)
        .next()
        .and_then(|el| DIGITS.find(&squashed_text(el)).map(|m| m.as_str().to_string()));
    let timestamp = match review.select(&DATE).next() {
        Some(el) => squashed_text(el),
        None => DATE_FALLBACK
            .find(&all_text)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
    };
    let vote_count = HELPFUL
        .captures(&all_text)
        .map(|c| format!("{}/{}", &c[1], &c[2]))
        .unwrap_or_else(|| "0/0".to_string());

    Some(ReviewRecord {
        author: review.select(&AUTHOR).next().map(squashed_text).unwrap_or_default(),
        rating_raw,
        timestamp,
        vote_count,
        body_text,
        id: synthesized_id(series_key, page, index),
        source_page: page,
    })
}

/// Text of the review body without nested links and widgets ("read more", tags).
fn own_text(text: ElementRef<'_>) -> String {
    let root = text.id();
    let mut parts = Vec::new();
    for node in text.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let nested = node
            .ancestors()
            .take_while(|a| a.id() != root)
            .any(|a| a.value().as_element().map_or(false, |e| matches!(e.name(), "a" | "div")));
        if !nested {
            parts.push(&**fragment);
        }
    }
    parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}
