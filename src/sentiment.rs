//! Lexicon-driven sentiment scoring.
//!
//! Deterministic and auditable: every number here comes from the lexicon and
//! [`ScorerConfig`]. The constants were tuned by eye on anime and film reviews
//! and have no deeper justification; override them through the config.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::lexicon::{LanguageLexicon, Lexicon, MatchMode};

/// Characters inspected on each side of a match for modifier words.
pub const CONTEXT_WINDOW: usize = 15;
pub const INTENSIFIER_BOOST: f64 = 1.4;
pub const HEDGE_DAMPER: f64 = 0.6;
/// Negation flips the sign but softens it.
pub const NEGATION_FACTOR: f64 = -0.8;
/// Extra averaging weight per earlier match; later matches count more.
pub const RECENCY_STEP: f64 = 0.1;
pub const MIN_TEXT_CHARS: usize = 3;
/// Ratings sit a little above the middle of the scale on review sites.
pub const RATING_OFFSET: f64 = 0.6;
pub const RATING_SCALE: f64 = 3.0;
pub const LENGTH_DIVISOR: f64 = 200.0;
pub const LENGTH_CAP: f64 = 1.5;
/// Share of the keyword score when a rating is blended in.
pub const BLEND_WEIGHT: f64 = 0.5;
/// Rating scores this close to zero are ignored.
pub const NEGLIGIBLE_RATING: f64 = 0.01;
/// Scores beyond ±this are labelled positive / negative.
pub const LABEL_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct ScorerConfig {
    pub context_window: usize,
    pub intensifier_boost: f64,
    pub hedge_damper: f64,
    pub negation_factor: f64,
    pub recency_step: f64,
    pub min_text_chars: usize,
    pub rating_offset: f64,
    pub rating_scale: f64,
    pub length_divisor: f64,
    pub length_cap: f64,
    pub blend_weight: f64,
    pub negligible_rating: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            context_window: CONTEXT_WINDOW,
            intensifier_boost: INTENSIFIER_BOOST,
            hedge_damper: HEDGE_DAMPER,
            negation_factor: NEGATION_FACTOR,
            recency_step: RECENCY_STEP,
            min_text_chars: MIN_TEXT_CHARS,
            rating_offset: RATING_OFFSET,
            rating_scale: RATING_SCALE,
            length_divisor: LENGTH_DIVISOR,
            length_cap: LENGTH_CAP,
            blend_weight: BLEND_WEIGHT,
            negligible_rating: NEGLIGIBLE_RATING,
        }
    }
}

/// How to read a numeric rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleHint {
    /// Guess from the magnitude: ≤1 normalized, ≤5 five-point, ≤10 ten-point.
    #[default]
    Auto,
    Normalized,
    FivePoint,
    TenPoint,
}

impl ScaleHint {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "auto" => Some(ScaleHint::Auto),
            "normalized" | "1" => Some(ScaleHint::Normalized),
            "5" | "five" | "five-point" | "5-point" => Some(ScaleHint::FivePoint),
            "10" | "ten" | "ten-point" | "10-point" => Some(ScaleHint::TenPoint),
            _ => None,
        }
    }

    fn normalize(self, value: f64) -> Option<f64> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let max = match self {
            ScaleHint::Auto => {
                return if value <= 1.0 {
                    Some(value)
                } else if value <= 5.0 {
                    Some(value / 5.0)
                } else if value <= 10.0 {
                    Some(value / 10.0)
                } else {
                    None
                };
            }
            ScaleHint::Normalized => 1.0,
            ScaleHint::FivePoint => 5.0,
            ScaleHint::TenPoint => 10.0,
        };
        (value <= max).then(|| value / max)
    }
}

/// Numeric value of a raw rating cell such as `"4"`, `"4.9"` or `" 8 "`.
pub fn parse_rating(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score > LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if score < -LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Negative => "Negative",
        }
    }
}

/// A score with its label; displays as `Positive (0.85)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    pub score: f64,
    pub label: SentimentLabel,
}

impl Sentiment {
    pub fn new(score: f64) -> Self {
        Self { score, label: SentimentLabel::from_score(score) }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2})", self.label.as_str(), self.score)
    }
}

/// Stateless scorer; clone it freely, the lexicon is shared.
#[derive(Debug, Clone)]
pub struct SentimentScorer {
    lexicon: Arc<Lexicon>,
    config: ScorerConfig,
}

impl SentimentScorer {
    pub fn new(lexicon: Lexicon, config: ScorerConfig) -> Self {
        Self { lexicon: Arc::new(lexicon), config }
    }

    pub fn with_builtin_lexicon() -> Self {
        Self::new(Lexicon::builtin(), ScorerConfig::default())
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    fn too_short(&self, text: &str) -> bool {
        text.trim().chars().count() < self.config.min_text_chars
    }

    /// Weighted average of per-match contributions, in roughly [-1.4, 1.4]
    /// before any clamping. Unknown languages score 0.0.
    pub fn score_keywords(&self, text: &str, language: &str) -> f64 {
        if self.too_short(text) {
            return 0.0;
        }
        let Some(table) = self.lexicon.language(language) else {
            return 0.0;
        };
        let max = table.max_weight_magnitude();
        if max <= 0.0 {
            return 0.0;
        }

        let haystack = normalize(text, table.match_mode);
        let mut contributions: Vec<(usize, f64)> = Vec::new();
        for (term, weight) in &table.weights {
            let needle = normalize(term, table.match_mode);
            for pos in find_all(&haystack, &needle, table.match_mode) {
                let modifier = self.context_modifier(table, &haystack, pos, needle.len());
                contributions.push((pos, weight / max * modifier));
            }
        }
        if contributions.is_empty() {
            return 0.0;
        }

        contributions.sort_by_key(|(pos, _)| *pos);
        let (sum, total_weight) = contributions
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sum, total), (i, (_, value))| {
                let w = 1.0 + self.config.recency_step * i as f64;
                (sum + value * w, total + w)
            });
        sum / total_weight
    }

    fn context_modifier(&self, table: &LanguageLexicon, haystack: &[char], pos: usize, len: usize) -> f64 {
        let window = self.config.context_window;
        let end = pos + len;
        let left = &haystack[pos.saturating_sub(window)..pos];
        let right = &haystack[end..(end + window).min(haystack.len())];
        let present = |words: &[String]| {
            words.iter().any(|w| {
                let w = normalize(w, table.match_mode);
                !find_all(left, &w, table.match_mode).is_empty()
                    || !find_all(right, &w, table.match_mode).is_empty()
            })
        };

        let mut modifier = 1.0;
        if present(&table.intensifiers) {
            modifier *= self.config.intensifier_boost;
        }
        if present(&table.hedges) {
            modifier *= self.config.hedge_damper;
        }
        if present(&table.negations) {
            modifier *= self.config.negation_factor;
        }
        modifier
    }

    /// Map a rating onto [-1, 1] through `(normalized - offset) * scale`.
    pub fn score_rating(&self, rating: Option<f64>, scale: ScaleHint) -> Option<f64> {
        let normalized = scale.normalize(rating?)?;
        Some(((normalized - self.config.rating_offset) * self.config.rating_scale).clamp(-1.0, 1.0))
    }

    /// Keyword score blended with the rating score, amplified by length and
    /// clamped to [-1, 1]. Long texts can saturate at the bounds.
    pub fn combined_score(&self, text: &str, language: &str, rating: Option<f64>, scale: ScaleHint) -> f64 {
        if self.too_short(text) {
            return 0.0;
        }
        let keyword = self.score_keywords(text, language);
        let blended = match self.score_rating(rating, scale) {
            Some(r) if r.abs() > self.config.negligible_rating => {
                self.config.blend_weight * keyword + (1.0 - self.config.blend_weight) * r
            }
            _ => keyword,
        };
        let length_factor =
            (text.chars().count() as f64 / self.config.length_divisor).min(self.config.length_cap);
        let score = (blended * length_factor).clamp(-1.0, 1.0);
        if score.is_nan() {
            0.0
        } else {
            score
        }
    }

    pub fn sentiment(&self, text: &str, language: &str, rating: Option<f64>, scale: ScaleHint) -> Sentiment {
        Sentiment::new(self.combined_score(text, language, rating, scale))
    }
}

/// One char per input char so positions line up with the input text.
fn normalize(text: &str, mode: MatchMode) -> Vec<char> {
    match mode {
        MatchMode::Substring => text.chars().collect(),
        MatchMode::WordBoundary => text.chars().map(|c| c.to_lowercase().next().unwrap_or(c)).collect(),
    }
}

/// Start positions of `needle` in `haystack`, overlapping matches included.
///
/// In `WordBoundary` mode a term made only of letters, digits and spaces
/// must not touch a letter or digit on either side. Terms with other
/// characters (`n't`, `10/10`) match anywhere.
fn find_all(haystack: &[char], needle: &[char], mode: MatchMode) -> Vec<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }
    let bounded = mode == MatchMode::WordBoundary
        && needle.iter().all(|c| c.is_alphanumeric() || c.is_whitespace());
    (0..=haystack.len() - needle.len())
        .filter(|&start| haystack[start..start + needle.len()] == *needle)
        .filter(|&start| {
            if !bounded {
                return true;
            }
            let end = start + needle.len();
            let before_ok = start == 0 || !haystack[start - 1].is_alphanumeric();
            let after_ok = end == haystack.len() || !haystack[end].is_alphanumeric();
            before_ok && after_ok
        })
        .collect()
}
