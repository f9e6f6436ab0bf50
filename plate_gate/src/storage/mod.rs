pub mod history_ledger;
pub mod reference_store;

use std::fs;
use std::path::Path;

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PlateError, Result};

/// Reads a JSON document. A missing file is treated as empty.
fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        debug!("{} does not exist yet", path.display());
        return Ok(T::default());
    }
    let contents = fs::read_to_string(path).map_err(|e| PlateError::persistence(path, e))?;
    serde_json::from_str(&contents).map_err(|e| PlateError::persistence(path, e))
}

fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PlateError::persistence(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| PlateError::persistence(path, e))?;
    fs::write(path, json).map_err(|e| PlateError::persistence(path, e))
}
