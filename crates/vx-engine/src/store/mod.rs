//! # Metadata store (C3)
//!
//! A relational index over the folder/file/tag tree. The store is never
//! ground truth — ground truth is always the on-disk folder configs (C2) —
//! but it is what every query (lookup-by-path, tag joins, full-text
//! candidate gathering) runs against, because walking the disk tree for
//! every query would be prohibitively slow for large notebooks.
//!
//! [`sqlite::SqliteStore`] is the one required implementation, backed by
//! `rusqlite`. The [`MetadataStore`] trait exists so the folder manager and
//! tag subsystem depend on an interface, not a concrete backend, mirroring
//! how this codebase separates the *what* of storage from the *how*
//! elsewhere (see the folder manager's own cache-vs-disk split).

pub mod schema;
pub mod sqlite;

use serde_json::Value;

use crate::error::Result;

/// A folder row as stored by the metadata store. `parent_row_id` is the
/// store's own dense integer id, not the UUID — `None` only for the
/// notebook root.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderRow {
    pub row_id: i64,
    pub uuid: String,
    pub parent_row_id: Option<i64>,
    pub name: String,
    pub created_utc: i64,
    pub modified_utc: i64,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileRow {
    pub row_id: i64,
    pub uuid: String,
    pub folder_row_id: i64,
    pub name: String,
    pub created_utc: i64,
    pub modified_utc: i64,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagRow {
    pub row_id: i64,
    pub name: String,
    pub parent_row_id: Option<i64>,
    pub metadata: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncState {
    pub last_sync_utc: i64,
    pub config_file_mtime: i64,
}

/// A new folder row to insert; the store assigns `row_id`.
#[derive(Debug, Clone)]
pub struct NewFolder {
    pub uuid: String,
    pub parent_row_id: Option<i64>,
    pub name: String,
    pub created_utc: i64,
    pub modified_utc: i64,
    pub metadata: Value,
}

#[derive(Debug, Clone)]
pub struct NewFile {
    pub uuid: String,
    pub folder_row_id: i64,
    pub name: String,
    pub created_utc: i64,
    pub modified_utc: i64,
    pub metadata: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOperator {
    And,
    Or,
}

/// The relational metadata store's full operation set (C3, §4.3). Every
/// method may fail with `VxError::Database`; single-row operations are
/// auto-committed by the backend when no explicit transaction is open.
pub trait MetadataStore {
    fn is_open(&self) -> bool;
    fn close(&mut self) -> Result<()>;

    fn begin(&self) -> Result<()>;
    fn commit(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;

    /// Idempotently creates all tables/indices if absent.
    fn initialize_schema(&self) -> Result<()>;
    /// Drops and recreates the schema. Loses all rows.
    fn rebuild_all(&self) -> Result<()>;

    fn schema_version(&self) -> Result<i64>;
    fn set_schema_version(&self, version: i64) -> Result<()>;

    // Folders
    fn create_folder(&self, folder: NewFolder) -> Result<FolderRow>;
    fn update_folder(&self, uuid: &str, name: &str, modified_utc: i64, metadata: &Value) -> Result<()>;
    fn delete_folder(&self, uuid: &str) -> Result<()>;
    fn get_folder(&self, uuid: &str) -> Result<Option<FolderRow>>;
    fn get_folder_by_path(&self, path: &str) -> Result<Option<FolderRow>>;
    fn list_children_folders(&self, parent_row_id: Option<i64>) -> Result<Vec<FolderRow>>;
    fn get_folder_path(&self, uuid: &str) -> Result<Option<String>>;
    fn move_folder(&self, uuid: &str, new_parent_uuid: Option<&str>) -> Result<()>;

    // Files
    fn create_file(&self, file: NewFile) -> Result<FileRow>;
    fn update_file(&self, uuid: &str, name: &str, modified_utc: i64, metadata: &Value) -> Result<()>;
    fn delete_file(&self, uuid: &str) -> Result<()>;
    fn get_file(&self, uuid: &str) -> Result<Option<FileRow>>;
    fn get_file_by_path(&self, path: &str) -> Result<Option<FileRow>>;
    fn list_files(&self, folder_row_id: i64) -> Result<Vec<FileRow>>;
    fn move_file(&self, uuid: &str, new_folder_uuid: &str) -> Result<()>;

    // Tags
    fn create_or_update_tag(&self, name: &str, parent_name: Option<&str>, metadata: &Value) -> Result<TagRow>;
    fn delete_tag(&self, name: &str) -> Result<()>;
    fn get_tag(&self, name: &str) -> Result<Option<TagRow>>;
    fn list_all_tags(&self) -> Result<Vec<TagRow>>;

    // File <-> tag edges
    fn set_file_tags(&self, file_uuid: &str, tags: &[String]) -> Result<()>;
    fn add_file_tag(&self, file_uuid: &str, tag: &str) -> Result<()>;
    fn remove_file_tag(&self, file_uuid: &str, tag: &str) -> Result<()>;
    fn get_file_tags(&self, file_uuid: &str) -> Result<Vec<String>>;

    // Queries
    fn find_files_any(&self, tags: &[String]) -> Result<Vec<FileRow>>;
    fn find_files_all(&self, tags: &[String]) -> Result<Vec<FileRow>>;
    fn count_files_by_tag(&self) -> Result<Vec<(String, i64)>>;

    /// In-order (depth-first, name-ascending) traversal yielding
    /// `(full_relative_path, file)`. Stops early when `cb` returns `false`.
    fn iterate_all_files(&self, cb: &mut dyn FnMut(&str, &FileRow) -> bool) -> Result<()>;

    // Sync state
    fn get_sync_state(&self, folder_uuid: &str) -> Result<Option<SyncState>>;
    fn update_sync_state(&self, folder_uuid: &str, state: SyncState) -> Result<()>;
    fn clear_sync_state(&self, folder_uuid: &str) -> Result<()>;

    // Key/value
    fn kv_get(&self, key: &str) -> Result<Option<String>>;
    fn kv_set(&self, key: &str, value: &str) -> Result<()>;
}
