use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use super::{load_json, save_json};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub plate: String,
    pub matched: bool,
}

/// Persisted log of recognized plates, one entry per distinct plate.
#[derive(Debug)]
pub struct HistoryLedger {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stored: Vec<HistoryEntry> = load_json(&path)?;

        let mut ledger = Self::empty(path);
        for entry in stored {
            if !ledger.contains(&entry.plate) {
                ledger.entries.push(entry);
            }
        }
        info!(
            "Loaded {} history entries from {}",
            ledger.entries.len(),
            ledger.path.display()
        );
        Ok(ledger)
    }

    pub fn save(&self) -> Result<()> {
        save_json(&self.path, &self.entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn contains(&self, plate: &str) -> bool {
        self.entries.iter().any(|entry| entry.plate == plate)
    }

    /// Appends the plate unless it was already seen. The first sighting's
    /// outcome is kept. Returns whether an entry was appended.
    ///
    /// The entry stays in memory even when saving fails.
    pub fn record(&mut self, plate: &str, matched: bool) -> Result<bool> {
        if self.contains(plate) {
            return Ok(false);
        }

        self.entries.push(HistoryEntry {
            plate: plate.to_string(),
            matched,
        });
        self.save()?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        info!("History cleared");
        self.save()
    }
}
