use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::{squashed_text, synthesized_id, ParsedPage, ReviewSite};
use crate::error::FetchError;
use crate::record::ReviewRecord;
use crate::sentiment::ScaleHint;

static UNIT: Lazy<Selector> = Lazy::new(|| Selector::parse(".l-animeDetailReview__unit").expect("valid selector"));
static UNIT_FALLBACK: Lazy<Selector> = Lazy::new(|| Selector::parse(".m-reviewUnit").expect("valid selector"));
static NICKNAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".m-reviewUnit_userText_nickname strong").expect("valid selector"));
static POINT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".m-reviewUnit_userText_pointLane strong").expect("valid selector"));
static CONTENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".m-reviewUnit_userText_content").expect("valid selector"));
static THANKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".m-reviewUnit_userText_footerLane_thanks p").expect("valid selector"));
static UPDATED: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".m-reviewUnit_userText_footerLane_updated").expect("valid selector"));

const POSTED_PREFIX: &str = "投稿 :";

/// Reviews on www.anikore.jp. Targets are numeric anime ids.
#[derive(Debug, Clone, Default)]
pub struct Anikore;

impl ReviewSite for Anikore {
    fn name(&self) -> &'static str {
        "anikore"
    }

    fn page_url(&self, target: &str, page: u32) -> String {
        let base = format!("https://www.anikore.jp/anime_review/{}/", urlencoding::encode(target));
        if page <= 1 {
            base
        } else {
            format!("{}page:{}", base, page)
        }
    }

    fn referer(&self, _target: &str) -> String {
        "https://www.anikore.jp/".to_string()
    }

    fn accept_language(&self) -> &'static str {
        "ja,en-US;q=0.9,en;q=0.8"
    }

    fn language(&self) -> &'static str {
        "ja"
    }

    fn rating_scale(&self) -> ScaleHint {
        ScaleHint::FivePoint
    }

    fn parse_page(&self, html: &str, target: &str, page: u32) -> Result<ParsedPage, FetchError> {
        let document = Html::parse_document(html);
        let mut units: Vec<_> = document.select(&UNIT).collect();
        if units.is_empty() {
            units = document.select(&UNIT_FALLBACK).collect();
        }
        if units.is_empty() {
            return Err(FetchError::ParseShape {
                detail: format!("no review units on page {}", page),
            });
        }

        let series_key = self.series_key(target);
        let records = units
            .into_iter()
            .enumerate()
            .filter_map(|(index, unit)| {
                let body_text = unit.select(&CONTENT).next().map(content_lines).unwrap_or_default();
                if body_text.is_empty() {
                    return None;
                }
                Some(ReviewRecord {
                    author: first_text(unit, &NICKNAME).unwrap_or_default(),
                    rating_raw: first_text(unit, &POINT).filter(|p| !p.is_empty()),
                    timestamp: first_text(unit, &UPDATED)
                        .map(|t| t.replace(POSTED_PREFIX, "").trim().to_string())
                        .unwrap_or_default(),
                    vote_count: first_text(unit, &THANKS).unwrap_or_else(|| "0".to_string()),
                    body_text,
                    id: synthesized_id(&series_key, page, index),
                    source_page: page,
                })
            })
            .collect();

        Ok(ParsedPage { records, has_next: true })
    }
}

fn first_text(unit: ElementRef<'_>, selector: &Selector) -> Option<String> {
    unit.select(selector).next().map(squashed_text)
}

/// Review text with `<br>` breaks kept as newlines.
fn content_lines(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
