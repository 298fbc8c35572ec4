//! Batch scoring of a scraped record file.

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::record::read_without_bom;
use crate::sentiment::{parse_rating, ScaleHint, Sentiment, SentimentLabel, SentimentScorer};

/// A row that could not be scored. Skipped, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("row {row}: {reason}")]
pub struct MalformedRecord {
    /// 1-based data row, header excluded.
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredReview {
    pub username: String,
    pub rating_raw: String,
    pub comment: String,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// Input order preserved.
    pub scored: Vec<ScoredReview>,
    pub skipped: Vec<MalformedRecord>,
    pub mean_score: f64,
    pub distribution: LabelCounts,
}

struct PendingRow {
    username: String,
    rating_raw: String,
    comment: String,
}

/// Read a record CSV and score every row in parallel.
///
/// Needs a `comment` column; `username` and `rating` are used when present.
pub fn score_file(
    path: impl AsRef<Path>,
    scorer: &SentimentScorer,
    language: &str,
    scale: ScaleHint,
) -> Result<BatchReport> {
    let path = path.as_ref();
    let content = read_without_bom(path)?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(content.as_bytes());
    let headers = reader
        .headers()
        .with_context(|| format!("Cannot read header of '{}'", path.display()))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let Some(comment_col) = column("comment") else {
        bail!("'{}' has no comment column", path.display());
    };
    let username_col = column("username");
    let rating_col = column("rating");

    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = index + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                skipped.push(MalformedRecord { row, reason: e.to_string() });
                continue;
            }
        };
        let comment = record.get(comment_col).map(str::trim).unwrap_or_default();
        if comment.is_empty() {
            skipped.push(MalformedRecord { row, reason: "missing comment".to_string() });
            continue;
        }
        let field = |col: Option<usize>| col.and_then(|c| record.get(c)).unwrap_or_default().trim().to_string();
        rows.push(PendingRow {
            username: field(username_col),
            rating_raw: field(rating_col),
            comment: comment.to_string(),
        });
    }

    let scored: Vec<ScoredReview> = rows
        .into_par_iter()
        .map(|row| {
            let sentiment = scorer.sentiment(&row.comment, language, parse_rating(&row.rating_raw), scale);
            ScoredReview {
                username: row.username,
                rating_raw: row.rating_raw,
                comment: row.comment,
                sentiment,
            }
        })
        .collect();

    let mut distribution = LabelCounts::default();
    for review in &scored {
        match review.sentiment.label {
            SentimentLabel::Positive => distribution.positive += 1,
            SentimentLabel::Neutral => distribution.neutral += 1,
            SentimentLabel::Negative => distribution.negative += 1,
        }
    }
    let mean_score = if scored.is_empty() {
        0.0
    } else {
        scored.iter().map(|r| r.sentiment.score).sum::<f64>() / scored.len() as f64
    };

    if !skipped.is_empty() {
        warn!("⚠️ Skipped {} malformed rows in '{}'", skipped.len(), path.display());
    }
    info!(
        "🧠 Scored {} reviews from '{}': mean {:.3}, {} positive / {} neutral / {} negative",
        scored.len(),
        path.display(),
        mean_score,
        distribution.positive,
        distribution.neutral,
        distribution.negative
    );

    Ok(BatchReport { scored, skipped, mean_score, distribution })
}

/// Write `username,rating,comment,sentiment,label`, BOM first.
pub fn write_scored(path: impl AsRef<Path>, report: &BatchReport) -> Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path).with_context(|| format!("Cannot create '{}'", path.display()))?;
    file.write_all(b"\xEF\xBB\xBF")?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(["username", "rating", "comment", "sentiment", "label"])?;
    for review in &report.scored {
        let score = format!("{:.4}", review.sentiment.score);
        writer.write_record([
            review.username.as_str(),
            review.rating_raw.as_str(),
            review.comment.as_str(),
            score.as_str(),
            review.sentiment.label.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
