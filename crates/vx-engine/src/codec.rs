//! Folder- and notebook-config codec (C2): JSON round-trip plus the
//! crash-safe write idiom used everywhere this repo replaces a file on disk.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Result, VxError};
use crate::model::{FolderConfig, NotebookConfig};

pub const FOLDER_CONFIG_FILENAME: &str = "vx.json";
pub const NOTEBOOK_CONFIG_FILENAME: &str = "config.json";

/// Write `value` to `path` as pretty JSON via write-to-temp + rename. The
/// temp file lives beside `path` so the rename is same-filesystem and
/// atomic on POSIX.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        VxError::InvalidParam(format!("path has no parent directory: {}", path.display()))
    })?;
    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(value).map_err(VxError::serialize)?;
    let tmp_path = parent.join(format!(".{}.tmp", Uuid::new_v4()));
    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read and parse a JSON file at `path`. Returns `NotFound` if it is absent.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(VxError::NotFound(format!("no such file: {}", path.display())));
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(VxError::parse)
}

pub fn read_folder_config(path: &Path) -> Result<FolderConfig> {
    read_json(path)
}

pub fn write_folder_config(path: &Path, config: &FolderConfig) -> Result<()> {
    write_json_atomic(path, config)
}

pub fn read_notebook_config(path: &Path) -> Result<NotebookConfig> {
    read_json(path)
}

pub fn write_notebook_config(path: &Path, config: &NotebookConfig) -> Result<()> {
    write_json_atomic(path, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileRecord;
    use tempfile::tempdir;

    #[test]
    fn test_folder_config_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("contents/vx.json");

        let mut config = FolderConfig::new("docs");
        config.files.push(FileRecord::new("readme.md"));

        write_folder_config(&path, &config).unwrap();
        let loaded = read_folder_config(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing/vx.json");
        let err = read_folder_config(&path).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::NotFound);
    }

    #[test]
    fn test_write_overwrites_existing_file_atomically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vx.json");

        let mut config = FolderConfig::new("docs");
        write_folder_config(&path, &config).unwrap();

        config.name = "docs2".to_string();
        write_folder_config(&path, &config).unwrap();

        let loaded = read_folder_config(&path).unwrap();
        assert_eq!(loaded.name, "docs2");

        // No stray temp files left behind.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_notebook_config_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vx_notebook/config.json");
        let config = NotebookConfig::new("My Notebook");

        write_notebook_config(&path, &config).unwrap();
        let loaded = read_notebook_config(&path).unwrap();

        assert_eq!(loaded, config);
    }
}
