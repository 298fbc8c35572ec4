//! Review rows and the append-only CSV file they are written to.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::sites::ReviewSite;

/// Spreadsheet tools need the BOM to pick UTF-8 for CJK text.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// The five fixed columns, then the superset columns.
pub const HEADER: [&str; 7] = ["username", "rating", "time", "votes", "comment", "id", "page"];

/// One review as scraped. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(rename = "username")]
    pub author: String,
    /// Raw rating as shown by the site; empty when unrated.
    #[serde(rename = "rating", default)]
    pub rating_raw: Option<String>,
    /// Site-native format, not parsed.
    #[serde(rename = "time")]
    pub timestamp: String,
    #[serde(rename = "votes")]
    pub vote_count: String,
    #[serde(rename = "comment")]
    pub body_text: String,
    pub id: String,
    #[serde(rename = "page")]
    pub source_page: u32,
}

/// Append-only record file.
///
/// Each [`append_page`](CsvRecordSink::append_page) call is flushed and synced
/// before it returns, so a page's rows are durable before the cursor moves.
pub struct CsvRecordSink {
    path: PathBuf,
}

impl CsvRecordSink {
    /// Open (or create) the file, writing the BOM and header if it is new or empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Cannot create output directory '{}'", parent.display()))?;
            }
        }

        let is_new = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        if is_new {
            let mut file = File::create(&path)
                .with_context(|| format!("Cannot create record file '{}'", path.display()))?;
            file.write_all(UTF8_BOM)?;
            let mut writer = csv::Writer::from_writer(&mut file);
            writer.write_record(HEADER)?;
            writer.flush()?;
            drop(writer);
            file.sync_data()?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append_page(&mut self, records: &[ReviewRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Cannot open record file '{}'", self.path.display()))?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut file);
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        file.sync_data()
            .with_context(|| format!("Cannot sync record file '{}'", self.path.display()))?;
        Ok(())
    }
}

/// Read a record file back.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<ReviewRecord>> {
    let path = path.as_ref();
    let content = read_without_bom(path)?;
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row.with_context(|| format!("Malformed row in '{}'", path.display()))?);
    }
    Ok(records)
}

pub(crate) fn read_without_bom(path: &Path) -> Result<String> {
    let mut content = String::new();
    File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?
        .read_to_string(&mut content)
        .with_context(|| format!("Cannot read '{}' as UTF-8", path.display()))?;
    Ok(content.trim_start_matches('\u{feff}').to_string())
}

/// `{output_dir}/{site}_{target}_comments.csv`, target separators flattened.
pub fn output_path(output_dir: &Path, site: &dyn ReviewSite, target: &str) -> PathBuf {
    let safe: String = target
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == ':' { '_' } else { c })
        .collect();
    output_dir.join(format!("{}_{}_comments{}.csv", site.name(), safe, site.file_suffix()))
}
