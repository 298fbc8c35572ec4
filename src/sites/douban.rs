use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use super::{squashed_text, synthesized_id, ParsedPage, ReviewSite};
use crate::error::FetchError;
use crate::record::ReviewRecord;
use crate::sentiment::ScaleHint;

pub const PAGE_SIZE: u32 = 20;
const BLOCK_MARKER: &str = "检测到有异常请求";

static ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("div.comment-item").expect("valid selector"));
static AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("span.comment-info a").expect("valid selector"));
static RATING: Lazy<Selector> = Lazy::new(|| Selector::parse("span.rating").expect("valid selector"));
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("span.comment-time").expect("valid selector"));
static VOTES: Lazy<Selector> = Lazy::new(|| Selector::parse("span.votes").expect("valid selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("span.short").expect("valid selector"));
static NEXT: Lazy<Selector> = Lazy::new(|| Selector::parse("a.next").expect("valid selector"));
static ALLSTAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^allstar(\d+)$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoubanSort {
    Hottest,
    Latest,
}

impl DoubanSort {
    fn query_value(self) -> &'static str {
        match self {
            DoubanSort::Hottest => "new_score",
            DoubanSort::Latest => "time",
        }
    }
}

/// Short comments on movie.douban.com. Needs a logged-in session cookie.
#[derive(Debug, Clone)]
pub struct Douban {
    sort: DoubanSort,
}

impl Douban {
    pub fn new(sort: DoubanSort) -> Self {
        Self { sort }
    }
}

impl ReviewSite for Douban {
    fn name(&self) -> &'static str {
        "douban"
    }

    fn series_key(&self, target: &str) -> String {
        match self.sort {
            DoubanSort::Hottest => format!("douban:{}", target),
            DoubanSort::Latest => format!("douban-latest:{}", target),
        }
    }

    fn file_suffix(&self) -> &'static str {
        match self.sort {
            DoubanSort::Hottest => "",
            DoubanSort::Latest => "_latest",
        }
    }

    fn page_url(&self, target: &str, page: u32) -> String {
        let start = page.saturating_sub(1) * PAGE_SIZE;
        format!(
            "https://movie.douban.com/subject/{}/comments?start={}&limit={}&status=P&sort={}",
            urlencoding::encode(target),
            start,
            PAGE_SIZE,
            self.sort.query_value()
        )
    }

    fn referer(&self, target: &str) -> String {
        format!("https://movie.douban.com/subject/{}/", urlencoding::encode(target))
    }

    fn accept_language(&self) -> &'static str {
        "zh-CN,zh;q=0.9,en;q=0.8"
    }

    fn requires_credential(&self) -> bool {
        true
    }

    fn language(&self) -> &'static str {
        "zh"
    }

    fn rating_scale(&self) -> ScaleHint {
        ScaleHint::FivePoint
    }

    fn blocked_marker(&self, body: &str) -> Option<&'static str> {
        body.contains(BLOCK_MARKER).then_some(BLOCK_MARKER)
    }

    fn parse_page(&self, html: &str, target: &str, page: u32) -> Result<ParsedPage, FetchError> {
        let document = Html::parse_document(html);
        let items: Vec<_> = document.select(&ITEM).collect();
        if items.is_empty() {
            return Err(FetchError::ParseShape {
                detail: format!("no div.comment-item on page {}", page),
            });
        }

        let series_key = self.series_key(target);
        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let body_text = item
                .select(&BODY)
                .next()
                .map(squashed_text)
                .unwrap_or_default();
            if body_text.is_empty() {
                continue;
            }

            // Unrated comments have a bare span.comment-time and no span.rating.
            let rating_raw = item.select(&RATING).next().and_then(|span| {
                span.value().classes().find_map(|class| {
                    ALLSTAR
                        .captures(class)
                        .and_then(|c| c[1].parse::<u32>().ok())
                        .map(|stars| (stars / 10).to_string())
                })
            });

            records.push(ReviewRecord {
                author: item.select(&AUTHOR).next().map(squashed_text).unwrap_or_default(),
                rating_raw,
                timestamp: item.select(&TIME).next().map(squashed_text).unwrap_or_default(),
                vote_count: item
                    .select(&VOTES)
                    .next()
                    .map(squashed_text)
                    .unwrap_or_else(|| "0".to_string()),
                body_text,
                id: item
                    .value()
                    .attr("data-cid")
                    .map(String::from)
                    .unwrap_or_else(|| synthesized_id(&series_key, page, index)),
                source_page: page,
            });
        }

        Ok(ParsedPage {
            records,
            has_next: document.select(&NEXT).next().is_some(),
        })
    }
}
