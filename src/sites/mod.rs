//! Site adapters: URL layout, identity hints and page parsing per review site.

pub mod anikore;
pub mod douban;
pub mod myanimelist;

use scraper::ElementRef;

use crate::error::{ConfigError, FetchError};
use crate::record::ReviewRecord;
use crate::sentiment::ScaleHint;

pub use anikore::Anikore;
pub use douban::{Douban, DoubanSort};
pub use myanimelist::MyAnimeList;

/// Generic interstitial texts seen on bot-check pages.
const GENERIC_BLOCK_MARKERS: &[&str] = &[
    "Verify it's you",
    "unusual traffic",
    "captcha-form",
    "temporarily locked",
];

/// Records found on one listing page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedPage {
    pub records: Vec<ReviewRecord>,
    /// Whether the page showed a "next page" affordance.
    pub has_next: bool,
}

pub trait ReviewSite: Send + Sync {
    /// Short name used in file names and series keys.
    fn name(&self) -> &'static str;

    /// Cursor key; listings of the same target in a different order need their own.
    fn series_key(&self, target: &str) -> String {
        format!("{}:{}", self.name(), target)
    }

    /// Appended to the record file stem, for the same reason.
    fn file_suffix(&self) -> &'static str {
        ""
    }

    /// URL of listing page `page` (1-based).
    fn page_url(&self, target: &str, page: u32) -> String;

    fn referer(&self, target: &str) -> String;

    fn accept_language(&self) -> &'static str;

    fn requires_credential(&self) -> bool {
        false
    }

    /// Lexicon language tag for this site's reviews.
    fn language(&self) -> &'static str;

    fn rating_scale(&self) -> ScaleHint;

    /// Site-specific "suspected automation" text, if present in `body`.
    /// Checked on every 2xx page, so it must never occur in review text.
    fn blocked_marker(&self, _body: &str) -> Option<&'static str> {
        None
    }

    /// Parse a listing page. Missing review containers is `ParseShape`.
    fn parse_page(&self, html: &str, target: &str, page: u32) -> Result<ParsedPage, FetchError>;
}

/// Build a site adapter from its configured name.
pub fn site_from_name(name: &str) -> Result<Box<dyn ReviewSite>, ConfigError> {
    match name.trim().to_lowercase().as_str() {
        "douban" | "douban-hottest" => Ok(Box::new(Douban::new(DoubanSort::Hottest))),
        "douban-latest" => Ok(Box::new(Douban::new(DoubanSort::Latest))),
        "myanimelist" | "mal" => Ok(Box::new(MyAnimeList)),
        "anikore" => Ok(Box::new(Anikore)),
        other => Err(ConfigError::UnknownSite(other.to_string())),
    }
}

/// Generic bot-check text. Only consulted once a page turned out to have no
/// review containers, since reviews may quote these phrases.
pub fn generic_block_marker(body: &str) -> Option<&'static str> {
    GENERIC_BLOCK_MARKERS.iter().copied().find(|m| body.contains(m))
}

/// Id for records whose site does not expose one.
pub(crate) fn synthesized_id(series_key: &str, page: u32, index: usize) -> String {
    format!("{}-p{}-{}", series_key, page, index)
}

/// Text of an element with whitespace runs collapsed.
pub(crate) fn squashed_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Encode each `/`-separated segment of a target for use in a URL path.
pub(crate) fn encode_path(target: &str) -> String {
    target
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
