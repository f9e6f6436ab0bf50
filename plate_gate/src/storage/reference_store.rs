use std::path::{Path, PathBuf};

use log::info;

use super::{load_json, save_json};
use crate::error::{PlateError, Result};
use crate::plate_detection::text_recognizer::strip_whitespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// Persisted allow list of plates. Order is kept, entries are unique.
#[derive(Debug)]
pub struct ReferenceStore {
    path: PathBuf,
    plates: Vec<String>,
}

impl ReferenceStore {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            plates: Vec::new(),
        }
    }

    /// Loads the list, stripping whitespace from every entry and dropping
    /// blanks and duplicates.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stored: Vec<String> = load_json(&path)?;

        // Hand edited files may carry spaces or blank entries.
        let mut store = Self::empty(path);
        for plate in stored.iter().map(|entry| strip_whitespace(entry)) {
            if !plate.is_empty() && !store.plates.contains(&plate) {
                store.plates.push(plate);
            }
        }
        info!(
            "Loaded {} reference plates from {}",
            store.plates.len(),
            store.path.display()
        );
        Ok(store)
    }

    pub fn save(&self) -> Result<()> {
        save_json(&self.path, &self.plates)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn plates(&self) -> &[String] {
        &self.plates
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }

    /// Adds a plate, written without whitespace like recognized text.
    pub fn add(&mut self, input: &str) -> Result<AddOutcome> {
        let plate = strip_whitespace(input);
        if plate.is_empty() {
            return Err(PlateError::InvalidPlate(input.to_string()));
        }
        if self.plates.contains(&plate) {
            return Ok(AddOutcome::AlreadyPresent);
        }

        info!("Adding reference plate {}", plate);
        self.plates.push(plate);
        self.save()?;
        Ok(AddOutcome::Added)
    }

    /// Removes the plate at a 1-based position and returns it.
    pub fn remove_at(&mut self, index: usize) -> Result<String> {
        if index < 1 || index > self.plates.len() {
            return Err(PlateError::IndexOutOfRange {
                index,
                len: self.plates.len(),
            });
        }

        let removed = self.plates.remove(index - 1);
        info!("Removed reference plate {}", removed);
        self.save()?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = ReferenceStore::load(dir.path().join("plates.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_file_is_a_persistence_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plates.json");
        fs::write(&path, "{\"plates\": ").unwrap();
        assert!(matches!(
            ReferenceStore::load(&path),
            Err(PlateError::Persistence { .. })
        ));
    }

    #[test]
    fn load_normalizes_hand_edited_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plates.json");
        fs::write(&path, r#"["1AB 2345", "1AB2345", " ", "X 1"]"#).unwrap();

        let store = ReferenceStore::load(&path).unwrap();
        assert_eq!(store.plates(), ["1AB2345".to_string(), "X1".to_string()]);
    }

    #[test]
    fn add_is_deduplicated() {
        let dir = tempdir().unwrap();
        let mut store = ReferenceStore::empty(dir.path().join("plates.json"));

        assert_eq!(store.add("X1").unwrap(), AddOutcome::Added);
        assert_eq!(store.add("X1").unwrap(), AddOutcome::AlreadyPresent);
        assert_eq!(store.plates(), ["X1".to_string()]);
    }

    #[test]
    fn add_removes_whitespace() {
        let dir = tempdir().unwrap();
        let mut store = ReferenceStore::empty(dir.path().join("plates.json"));

        store.add(" 1AB 2345 ").unwrap();
        assert_eq!(store.add("1AB2345").unwrap(), AddOutcome::AlreadyPresent);
        assert_eq!(store.plates(), ["1AB2345".to_string()]);
    }

    #[test]
    fn blank_plate_is_rejected() {
        let dir = tempdir().unwrap();
        let mut store = ReferenceStore::empty(dir.path().join("plates.json"));
        assert!(matches!(store.add("   "), Err(PlateError::InvalidPlate(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn add_persists_immediately() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plates.json");
        let mut store = ReferenceStore::empty(&path);
        store.add("AB123CD").unwrap();

        let reloaded = ReferenceStore::load(&path).unwrap();
        assert_eq!(reloaded.plates(), ["AB123CD".to_string()]);
    }

    #[test]
    fn remove_at_is_one_based() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plates.json");
        let mut store = ReferenceStore::empty(&path);
        for plate in ["A1", "B2", "C3"] {
            store.add(plate).unwrap();
        }

        assert_eq!(store.remove_at(2).unwrap(), "B2");
        assert_eq!(store.plates(), ["A1".to_string(), "C3".to_string()]);
        let reloaded = ReferenceStore::load(&path).unwrap();
        assert_eq!(reloaded.plates(), store.plates());
    }

    #[test]
    fn remove_out_of_range_leaves_list_unchanged() {
        let dir = tempdir().unwrap();
        let mut store = ReferenceStore::empty(dir.path().join("plates.json"));
        store.add("A1").unwrap();
        store.add("B2").unwrap();

        for index in [0, 3, 100] {
            assert!(matches!(
                store.remove_at(index),
                Err(PlateError::IndexOutOfRange { len: 2, .. })
            ));
        }
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("plates.json");
        let mut store = ReferenceStore::empty(&path);
        for plate in ["ZZ999", "AA111", "MM555"] {
            store.add(plate).unwrap();
        }
        store.save().unwrap();

        let reloaded = ReferenceStore::load(&path).unwrap();
        assert_eq!(reloaded.plates(), store.plates());
    }
}
