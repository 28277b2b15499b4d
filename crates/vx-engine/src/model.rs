//! # Data model
//!
//! The on-disk shapes for folder configs, file records, and notebook
//! configs (C2's JSON shapes, §6.3), plus the two notebook variants.
//!
//! ## Unknown-field preservation
//!
//! A `vx.json` written by a newer engine version may carry fields this
//! engine doesn't know about. Rather than reject or silently drop them,
//! every record here carries a `#[serde(flatten)]` catch-all map: unknown
//! keys round-trip untouched through read-then-write, which is what lets a
//! human edit one field by hand without the next engine-driven save erasing
//! the rest of the sidecar.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::{generate_uuid, now_millis};

/// A single file entry inside a folder config. Not a standalone file on
/// disk — it lives inside its parent folder's `vx.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "createdUtc")]
    pub created_utc: i64,
    #[serde(rename = "modifiedUtc")]
    pub modified_utc: i64,
    #[serde(default = "default_metadata")]
    pub metadata: Value,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_metadata() -> Value {
    Value::Object(Map::new())
}

impl FileRecord {
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: generate_uuid(),
            name: name.into(),
            created_utc: now,
            modified_utc: now,
            metadata: default_metadata(),
            tags: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn touch(&mut self) {
        self.modified_utc = now_millis().max(self.modified_utc);
    }
}

/// The per-folder on-disk record (`vx.json`). One per folder in the tree,
/// including the root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderConfig {
    pub id: String,
    pub name: String,
    #[serde(rename = "createdUtc")]
    pub created_utc: i64,
    #[serde(rename = "modifiedUtc")]
    pub modified_utc: i64,
    #[serde(default = "default_metadata")]
    pub metadata: Value,
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub folders: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FolderConfig {
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: generate_uuid(),
            name: name.into(),
            created_utc: now,
            modified_utc: now,
            metadata: default_metadata(),
            files: Vec::new(),
            folders: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn touch(&mut self) {
        self.modified_utc = now_millis().max(self.modified_utc);
    }

    pub fn find_file(&self, name: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn find_file_mut(&mut self, name: &str) -> Option<&mut FileRecord> {
        self.files.iter_mut().find(|f| f.name == name)
    }

    pub fn find_file_by_id_mut(&mut self, id: &str) -> Option<&mut FileRecord> {
        self.files.iter_mut().find(|f| f.id == id)
    }

    pub fn has_subfolder(&self, name: &str) -> bool {
        self.folders.iter().any(|f| f == name)
    }
}

/// One node in the notebook's tag tree. Identity is the fully-qualified
/// `name` (hierarchical, `/`-separated); `parent_name` is always derivable
/// from it and is not stored separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagDef {
    pub name: String,
    #[serde(default = "default_metadata")]
    pub metadata: Value,
}

impl TagDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: default_metadata(),
        }
    }

    /// Prefix before the final `/`, or empty for a root tag.
    pub fn parent_name(&self) -> &str {
        match self.name.rfind('/') {
            Some(idx) => &self.name[..idx],
            None => "",
        }
    }
}

/// The notebook-level config (`vx_notebook/config.json` for bundled
/// notebooks).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotebookConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "assetsFolder", default = "default_assets_folder")]
    pub assets_folder: String,
    #[serde(rename = "attachmentsFolder", default = "default_attachments_folder")]
    pub attachments_folder: String,
    #[serde(default = "default_metadata")]
    pub metadata: Value,
    #[serde(default)]
    pub tags: Vec<TagDef>,
    #[serde(rename = "tagsModifiedUtc", default)]
    pub tags_modified_utc: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_assets_folder() -> String {
    "assets".to_string()
}

fn default_attachments_folder() -> String {
    "attachments".to_string()
}

impl NotebookConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_uuid(),
            name: name.into(),
            description: String::new(),
            assets_folder: default_assets_folder(),
            attachments_folder: default_attachments_folder(),
            metadata: default_metadata(),
            tags: Vec::new(),
            tags_modified_utc: now_millis(),
            extra: Map::new(),
        }
    }

    pub fn find_tag(&self, name: &str) -> Option<&TagDef> {
        self.tags.iter().find(|t| t.name == name)
    }

    pub fn find_tag_mut(&mut self, name: &str) -> Option<&mut TagDef> {
        self.tags.iter_mut().find(|t| t.name == name)
    }

    pub fn touch_tags(&mut self) {
        self.tags_modified_utc = now_millis().max(self.tags_modified_utc);
    }
}

/// Sealed choice between the two notebook layouts. The `Raw` variant has no
/// `vx_notebook/` sidecar; its folder manager answers `Unsupported` to every
/// node mutation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotebookKind {
    Bundled,
    Raw,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_config_new_has_equal_created_and_modified() {
        let f = FolderConfig::new("docs");
        assert_eq!(f.created_utc, f.modified_utc);
        assert!(f.files.is_empty());
        assert!(f.folders.is_empty());
    }

    #[test]
    fn test_file_record_round_trip_preserves_unknown_fields() {
        let json = serde_json::json!({
            "id": "abc",
            "name": "readme.md",
            "createdUtc": 1,
            "modifiedUtc": 2,
            "metadata": {},
            "tags": [],
            "futureField": "keepme"
        });
        let record: FileRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.extra.get("futureField").unwrap(), "keepme");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["futureField"], "keepme");
    }

    #[test]
    fn test_folder_config_round_trip_preserves_unknown_fields() {
        let json = serde_json::json!({
            "id": "abc",
            "name": "docs",
            "createdUtc": 1,
            "modifiedUtc": 2,
            "metadata": {},
            "files": [],
            "folders": [],
            "experimentalFlag": true
        });
        let folder: FolderConfig = serde_json::from_value(json).unwrap();
        assert_eq!(folder.extra.get("experimentalFlag").unwrap(), true);

        let back = serde_json::to_value(&folder).unwrap();
        assert_eq!(back["experimentalFlag"], true);
    }

    #[test]
    fn test_tag_def_parent_name() {
        let root = TagDef::new("work");
        assert_eq!(root.parent_name(), "");

        let child = TagDef::new("work/urgent");
        assert_eq!(child.parent_name(), "work");

        let grandchild = TagDef::new("work/urgent/today");
        assert_eq!(grandchild.parent_name(), "work/urgent");
    }

    #[test]
    fn test_notebook_config_defaults() {
        let cfg = NotebookConfig::new("N");
        assert_eq!(cfg.assets_folder, "assets");
        assert_eq!(cfg.attachments_folder, "attachments");
        assert!(cfg.tags.is_empty());
    }

    #[test]
    fn test_find_file_by_name() {
        let mut folder = FolderConfig::new("docs");
        folder.files.push(FileRecord::new("readme.md"));
        assert!(folder.find_file("readme.md").is_some());
        assert!(folder.find_file("missing.md").is_none());
    }
}
