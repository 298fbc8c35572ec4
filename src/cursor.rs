//! Durable resume cursors, one per series.
//!
//! The cursor only ever moves contiguously: a page that exhausted its retries
//! pins `last_completed_page` below it, and pages that succeed after the gap
//! are remembered in `pending` so a resume does not fetch them twice.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeCursor {
    #[serde(skip)]
    pub series_key: String,
    pub last_completed_page: u32,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub pending: BTreeSet<u32>,
}

impl ScrapeCursor {
    pub fn new(series_key: impl Into<String>) -> Self {
        Self {
            series_key: series_key.into(),
            last_completed_page: 0,
            pending: BTreeSet::new(),
        }
    }

    pub fn next_page(&self) -> u32 {
        self.last_completed_page + 1
    }

    pub fn is_pending(&self, page: u32) -> bool {
        self.pending.contains(&page)
    }

    pub fn has_gap(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Record that `page` is durably written.
    pub fn mark_completed(&mut self, page: u32) {
        if page <= self.last_completed_page {
            return;
        }
        if page == self.last_completed_page + 1 {
            self.last_completed_page = page;
            while self.pending.remove(&(self.last_completed_page + 1)) {
                self.last_completed_page += 1;
            }
        } else {
            self.pending.insert(page);
        }
    }
}

/// Where cursors live between runs.
pub trait CursorStore {
    fn load(&self, series_key: &str) -> Option<ScrapeCursor>;
    fn save(&mut self, cursor: &ScrapeCursor) -> Result<()>;
    fn remove(&mut self, series_key: &str) -> Result<()>;
}

/// `{ series_key: { last_completed_page, pending } }` in one JSON file,
/// rewritten atomically on every change.
pub struct JsonCursorStore {
    path: PathBuf,
    cursors: BTreeMap<String, ScrapeCursor>,
}

impl JsonCursorStore {
    /// Load the file if present; a missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let cursors = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Cannot read cursor file '{}'", path.display()))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                let mut map: BTreeMap<String, ScrapeCursor> = serde_json::from_str(&content)
                    .with_context(|| format!("Corrupt cursor file '{}'", path.display()))?;
                for (key, cursor) in map.iter_mut() {
                    cursor.series_key = key.clone();
                }
                map
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, cursors })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&self.cursors)?;
        {
            let mut file = File::create(&tmp)
                .with_context(|| format!("Cannot write cursor file '{}'", tmp.display()))?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Cannot replace cursor file '{}'", self.path.display()))?;
        Ok(())
    }
}

impl CursorStore for JsonCursorStore {
    fn load(&self, series_key: &str) -> Option<ScrapeCursor> {
        self.cursors.get(series_key).cloned()
    }

    fn save(&mut self, cursor: &ScrapeCursor) -> Result<()> {
        let previous = self.cursors.insert(cursor.series_key.clone(), cursor.clone());
        if let Err(e) = self.persist() {
            // Keep memory in line with disk.
            match previous {
                Some(old) => self.cursors.insert(cursor.series_key.clone(), old),
                None => self.cursors.remove(&cursor.series_key),
            };
            return Err(e);
        }
        debug!("💾 Cursor {} -> page {}", cursor.series_key, cursor.last_completed_page);
        Ok(())
    }

    fn remove(&mut self, series_key: &str) -> Result<()> {
        if self.cursors.remove(series_key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}
