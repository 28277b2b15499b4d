//! The one required [`MetadataStore`] implementation, backed by
//! `rusqlite`. Every row-mutating method here is reachable through `&self`
//! (not `&mut self`) because the store is shared behind the folder
//! manager's write-through calls without forcing those call sites into
//! exclusive borrows; interior mutability is confined to the single
//! [`std::sync::Mutex`]-guarded connection.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::{Result, VxError};
use crate::path::join;

use super::schema::{drop_all_script, CURRENT_SCHEMA_VERSION, INIT_SCRIPT};
use super::{
    FileRow, FolderRow, MetadataStore, NewFile, NewFolder, SyncState, TagRow,
};

/// `rusqlite`-backed [`MetadataStore`]. One instance per open notebook.
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, gating on the
    /// `schema_version` table per §10.5: an empty database is initialized
    /// at [`CURRENT_SCHEMA_VERSION`]; a database at an older or newer
    /// version fails with `InvalidState` rather than silently migrating or
    /// guessing at an unknown shape.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::configure_and_gate(conn)
    }

    /// An in-memory store, used by tests that don't need to exercise
    /// file-based open/close/lock behavior (§10.8).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure_and_gate(conn)
    }

    fn configure_and_gate(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let store = Self {
            conn: Mutex::new(Some(conn)),
        };
        store.initialize_schema()?;

        let version = store.schema_version()?;
        if version == 0 {
            store.set_schema_version(CURRENT_SCHEMA_VERSION)?;
        } else if version != CURRENT_SCHEMA_VERSION {
            return Err(VxError::InvalidState(format!(
                "metadata store schema version {version} is incompatible with engine version {CURRENT_SCHEMA_VERSION}"
            )));
        }
        Ok(store)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock().expect("sqlite store mutex poisoned");
        let conn = guard
            .as_ref()
            .ok_or_else(|| VxError::InvalidState("metadata store is closed".to_string()))?;
        f(conn)
    }

    fn folder_row_id(conn: &Connection, uuid: &str) -> Result<Option<i64>> {
        conn.query_row(
            "SELECT id FROM folders WHERE uuid = ?1",
            params![uuid],
            |row| row.get(0),
        )
        .optional()
        .map_err(VxError::from)
    }

    fn tag_row_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
        conn.query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .optional()
        .map_err(VxError::from)
    }

    fn file_row_id(conn: &Connection, uuid: &str) -> Result<Option<i64>> {
        conn.query_row(
            "SELECT id FROM files WHERE uuid = ?1",
            params![uuid],
            |row| row.get(0),
        )
        .optional()
        .map_err(VxError::from)
    }

    fn folder_row_from_sql(row: &rusqlite::Row) -> rusqlite::Result<FolderRow> {
        let metadata_text: Option<String> = row.get(6)?;
        Ok(FolderRow {
            row_id: row.get(0)?,
            uuid: row.get(1)?,
            parent_row_id: row.get(2)?,
            name: row.get(3)?,
            created_utc: row.get(4)?,
            modified_utc: row.get(5)?,
            metadata: parse_metadata(metadata_text),
        })
    }

    fn file_row_from_sql(row: &rusqlite::Row) -> rusqlite::Result<FileRow> {
        let metadata_text: Option<String> = row.get(6)?;
        Ok(FileRow {
            row_id: row.get(0)?,
            uuid: row.get(1)?,
            folder_row_id: row.get(2)?,
            name: row.get(3)?,
            created_utc: row.get(4)?,
            modified_utc: row.get(5)?,
            metadata: parse_metadata(metadata_text),
        })
    }

    fn tag_row_from_sql(row: &rusqlite::Row) -> rusqlite::Result<TagRow> {
        let metadata_text: Option<String> = row.get(3)?;
        Ok(TagRow {
            row_id: row.get(0)?,
            name: row.get(1)?,
            parent_row_id: row.get(2)?,
            metadata: parse_metadata(metadata_text),
        })
    }

    /// Builds the full `/`-joined path to the folder at `row_id`, by
    /// walking the `parent_id` chain up to the root (whose own segment is
    /// never emitted, matching `clean_path("")  == "."`).
    fn path_for_folder_row(conn: &Connection, row_id: i64) -> Result<String> {
        let mut segments: Vec<String> = Vec::new();
        let mut current = Some(row_id);
        while let Some(id) = current {
            let (name, parent): (String, Option<i64>) = conn.query_row(
                "SELECT name, parent_id FROM folders WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            if parent.is_some() {
                segments.push(name);
            }
            current = parent;
        }
        segments.reverse();
        let mut path = ".".to_string();
        for seg in segments {
            path = join(&path, &seg);
        }
        Ok(path)
    }

    /// Resolves `path` (already `clean_path`-normalized by the caller) to a
    /// folder row by walking from the root down through `folders.name`.
    fn folder_row_by_path(conn: &Connection, path: &str) -> Result<Option<FolderRow>> {
        let root: Option<FolderRow> = conn
            .query_row(
                "SELECT id, uuid, parent_id, name, created_utc, modified_utc, metadata \
                 FROM folders WHERE parent_id IS NULL",
                [],
                Self::folder_row_from_sql,
            )
            .optional()?;
        let Some(mut current) = root else {
            return Ok(None);
        };
        if path == "." {
            return Ok(Some(current));
        }
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let next = conn
                .query_row(
                    "SELECT id, uuid, parent_id, name, created_utc, modified_utc, metadata \
                     FROM folders WHERE parent_id = ?1 AND name = ?2",
                    params![current.row_id, segment],
                    Self::folder_row_from_sql,
                )
                .optional()?;
            match next {
                Some(row) => current = row,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// `true` if `candidate_row_id` is `ancestor_row_id` or a descendant of
    /// it — used by [`MetadataStore::move_folder`] to reject cycles.
    fn is_self_or_descendant(
        conn: &Connection,
        ancestor_row_id: i64,
        candidate_row_id: i64,
    ) -> Result<bool> {
        let mut current = Some(candidate_row_id);
        while let Some(id) = current {
            if id == ancestor_row_id {
                return Ok(true);
            }
            current = conn
                .query_row(
                    "SELECT parent_id FROM folders WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?
                .flatten();
        }
        Ok(false)
    }

    fn walk_files(
        conn: &Connection,
        folder_row_id: i64,
        folder_path: &str,
        cb: &mut dyn FnMut(&str, &FileRow) -> bool,
    ) -> Result<bool> {
        let mut file_stmt = conn.prepare(
            "SELECT id, uuid, folder_id, name, created_utc, modified_utc, metadata \
             FROM files WHERE folder_id = ?1 ORDER BY name ASC",
        )?;
        let files = file_stmt
            .query_map(params![folder_row_id], Self::file_row_from_sql)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for file in &files {
            let full_path = join(folder_path, &file.name);
            if !cb(&full_path, file) {
                return Ok(false);
            }
        }
        drop(file_stmt);

        let mut folder_stmt = conn.prepare(
            "SELECT id, uuid, parent_id, name, created_utc, modified_utc, metadata \
             FROM folders WHERE parent_id = ?1 ORDER BY name ASC",
        )?;
        let subfolders = folder_stmt
            .query_map(params![folder_row_id], Self::folder_row_from_sql)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(folder_stmt);
        for sub in &subfolders {
            let sub_path = join(folder_path, &sub.name);
            if !Self::walk_files(conn, sub.row_id, &sub_path, cb)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn parse_metadata(text: Option<String>) -> Value {
    text.and_then(|t| serde_json::from_str(&t).ok())
        .unwrap_or_else(|| Value::Object(Default::default()))
}

fn metadata_text(value: &Value) -> Result<String> {
    serde_json::to_string(value).map_err(VxError::serialize)
}

impl MetadataStore for SqliteStore {
    fn is_open(&self) -> bool {
        self.conn
            .lock()
            .expect("sqlite store mutex poisoned")
            .is_some()
    }

    fn close(&mut self) -> Result<()> {
        let mut guard = self.conn.lock().expect("sqlite store mutex poisoned");
        *guard = None;
        Ok(())
    }

    fn begin(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch("BEGIN")?;
            Ok(())
        })
    }

    fn commit(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch("COMMIT")?;
            Ok(())
        })
    }

    fn rollback(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch("ROLLBACK")?;
            Ok(())
        })
    }

    fn initialize_schema(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(INIT_SCRIPT)?;
            Ok(())
        })
    }

    fn rebuild_all(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(&drop_all_script())?;
            conn.execute_batch(INIT_SCRIPT)?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![CURRENT_SCHEMA_VERSION],
            )?;
            Ok(())
        })
    }

    fn schema_version(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let version: Option<i64> = conn
                .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(version.unwrap_or(0))
        })
    }

    fn set_schema_version(&self, version: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM schema_version", [])?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![version],
            )?;
            Ok(())
        })
    }

    fn create_folder(&self, folder: NewFolder) -> Result<FolderRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO folders (uuid, parent_id, name, created_utc, modified_utc, metadata) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    folder.uuid,
                    folder.parent_row_id,
                    folder.name,
                    folder.created_utc,
                    folder.modified_utc,
                    metadata_text(&folder.metadata)?,
                ],
            )?;
            let row_id = conn.last_insert_rowid();
            Ok(FolderRow {
                row_id,
                uuid: folder.uuid,
                parent_row_id: folder.parent_row_id,
                name: folder.name,
                created_utc: folder.created_utc,
                modified_utc: folder.modified_utc,
                metadata: folder.metadata,
            })
        })
    }

    fn update_folder(&self, uuid: &str, name: &str, modified_utc: i64, metadata: &Value) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE folders SET name = ?1, modified_utc = ?2, metadata = ?3 WHERE uuid = ?4",
                params![name, modified_utc, metadata_text(metadata)?, uuid],
            )?;
            Ok(())
        })
    }

    fn delete_folder(&self, uuid: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM folders WHERE uuid = ?1", params![uuid])?;
            Ok(())
        })
    }

    fn get_folder(&self, uuid: &str) -> Result<Option<FolderRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, uuid, parent_id, name, created_utc, modified_utc, metadata \
                 FROM folders WHERE uuid = ?1",
                params![uuid],
                Self::folder_row_from_sql,
            )
            .optional()
            .map_err(VxError::from)
        })
    }

    fn get_folder_by_path(&self, path: &str) -> Result<Option<FolderRow>> {
        self.with_conn(|conn| Self::folder_row_by_path(conn, path))
    }

    fn list_children_folders(&self, parent_row_id: Option<i64>) -> Result<Vec<FolderRow>> {
        self.with_conn(|conn| {
            let mut stmt = if parent_row_id.is_some() {
                conn.prepare(
                    "SELECT id, uuid, parent_id, name, created_utc, modified_utc, metadata \
                     FROM folders WHERE parent_id = ?1 ORDER BY name ASC",
                )?
            } else {
                conn.prepare(
                    "SELECT id, uuid, parent_id, name, created_utc, modified_utc, metadata \
                     FROM folders WHERE parent_id IS NULL ORDER BY name ASC",
                )?
            };
            let rows = stmt
                .query_map(params![parent_row_id], Self::folder_row_from_sql)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn get_folder_path(&self, uuid: &str) -> Result<Option<String>> {
        self.with_conn(|conn| match Self::folder_row_id(conn, uuid)? {
            Some(row_id) => Ok(Some(Self::path_for_folder_row(conn, row_id)?)),
            None => Ok(None),
        })
    }

    fn move_folder(&self, uuid: &str, new_parent_uuid: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            let row_id = Self::folder_row_id(conn, uuid)?
                .ok_or_else(|| VxError::NotFound(format!("folder {uuid}")))?;

            let new_parent_row_id = match new_parent_uuid {
                Some(parent_uuid) => Some(
                    Self::folder_row_id(conn, parent_uuid)
                        .ok()
                        .flatten()
                        .ok_or_else(|| VxError::NotFound(format!("folder {parent_uuid}")))?,
                ),
                None => None,
            };

            if let Some(new_parent_row_id) = new_parent_row_id {
                if new_parent_row_id == row_id
                    || Self::is_self_or_descendant(conn, row_id, new_parent_row_id)?
                {
                    return Err(VxError::InvalidParam(
                        "cannot move a folder under itself or a descendant".to_string(),
                    ));
                }
            }

            conn.execute(
                "UPDATE folders SET parent_id = ?1 WHERE id = ?2",
                params![new_parent_row_id, row_id],
            )?;
            Ok(())
        })
    }

    fn create_file(&self, file: NewFile) -> Result<FileRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO files (uuid, folder_id, name, created_utc, modified_utc, metadata) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    file.uuid,
                    file.folder_row_id,
                    file.name,
                    file.created_utc,
                    file.modified_utc,
                    metadata_text(&file.metadata)?,
                ],
            )?;
            let row_id = conn.last_insert_rowid();
            Ok(FileRow {
                row_id,
                uuid: file.uuid,
                folder_row_id: file.folder_row_id,
                name: file.name,
                created_utc: file.created_utc,
                modified_utc: file.modified_utc,
                metadata: file.metadata,
            })
        })
    }

    fn update_file(&self, uuid: &str, name: &str, modified_utc: i64, metadata: &Value) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE files SET name = ?1, modified_utc = ?2, metadata = ?3 WHERE uuid = ?4",
                params![name, modified_utc, metadata_text(metadata)?, uuid],
            )?;
            Ok(())
        })
    }

    fn delete_file(&self, uuid: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM files WHERE uuid = ?1", params![uuid])?;
            Ok(())
        })
    }

    fn get_file(&self, uuid: &str) -> Result<Option<FileRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, uuid, folder_id, name, created_utc, modified_utc, metadata \
                 FROM files WHERE uuid = ?1",
                params![uuid],
                Self::file_row_from_sql,
            )
            .optional()
            .map_err(VxError::from)
        })
    }

    fn get_file_by_path(&self, path: &str) -> Result<Option<FileRow>> {
        self.with_conn(|conn| {
            let (folder_path, name) = crate::path::split_path(path);
            let Some(folder) = Self::folder_row_by_path(conn, &folder_path)? else {
                return Ok(None);
            };
            conn.query_row(
                "SELECT id, uuid, folder_id, name, created_utc, modified_utc, metadata \
                 FROM files WHERE folder_id = ?1 AND name = ?2",
                params![folder.row_id, name],
                Self::file_row_from_sql,
            )
            .optional()
            .map_err(VxError::from)
        })
    }

    fn list_files(&self, folder_row_id: i64) -> Result<Vec<FileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, uuid, folder_id, name, created_utc, modified_utc, metadata \
                 FROM files WHERE folder_id = ?1 ORDER BY name ASC",
            )?;
            let rows = stmt
                .query_map(params![folder_row_id], Self::file_row_from_sql)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn move_file(&self, uuid: &str, new_folder_uuid: &str) -> Result<()> {
        self.with_conn(|conn| {
            let new_folder_row_id = Self::folder_row_id(conn, new_folder_uuid)?
                .ok_or_else(|| VxError::NotFound(format!("folder {new_folder_uuid}")))?;
            conn.execute(
                "UPDATE files SET folder_id = ?1 WHERE uuid = ?2",
                params![new_folder_row_id, uuid],
            )?;
            Ok(())
        })
    }

    fn create_or_update_tag(&self, name: &str, parent_name: Option<&str>, metadata: &Value) -> Result<TagRow> {
        self.with_conn(|conn| {
            let parent_row_id = match parent_name {
                Some(p) if !p.is_empty() => Self::tag_row_id(conn, p)?,
                _ => None,
            };
            conn.execute(
                "INSERT INTO tags (name, parent_id, metadata) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(name) DO UPDATE SET parent_id = excluded.parent_id, metadata = excluded.metadata",
                params![name, parent_row_id, metadata_text(metadata)?],
            )?;
            conn.query_row(
                "SELECT id, name, parent_id, metadata FROM tags WHERE name = ?1",
                params![name],
                Self::tag_row_from_sql,
            )
            .map_err(VxError::from)
        })
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM tags WHERE name = ?1", params![name])?;
            Ok(())
        })
    }

    fn get_tag(&self, name: &str) -> Result<Option<TagRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, parent_id, metadata FROM tags WHERE name = ?1",
                params![name],
                Self::tag_row_from_sql,
            )
            .optional()
            .map_err(VxError::from)
        })
    }

    fn list_all_tags(&self) -> Result<Vec<TagRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, parent_id, metadata FROM tags ORDER BY name ASC")?;
            let rows = stmt
                .query_map([], Self::tag_row_from_sql)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn set_file_tags(&self, file_uuid: &str, tags: &[String]) -> Result<()> {
        self.with_conn(|conn| {
            let file_row_id = Self::file_row_id(conn, file_uuid)?
                .ok_or_else(|| VxError::NotFound(format!("file {file_uuid}")))?;
            conn.execute(
                "DELETE FROM file_tags WHERE file_id = ?1",
                params![file_row_id],
            )?;
            for tag in tags {
                let tag_row_id = Self::tag_row_id(conn, tag)?
                    .ok_or_else(|| VxError::NotFound(format!("tag {tag}")))?;
                conn.execute(
                    "INSERT OR IGNORE INTO file_tags (file_id, tag_id) VALUES (?1, ?2)",
                    params![file_row_id, tag_row_id],
                )?;
            }
            Ok(())
        })
    }

    fn add_file_tag(&self, file_uuid: &str, tag: &str) -> Result<()> {
        self.with_conn(|conn| {
            let file_row_id = Self::file_row_id(conn, file_uuid)?
                .ok_or_else(|| VxError::NotFound(format!("file {file_uuid}")))?;
            let tag_row_id = Self::tag_row_id(conn, tag)?
                .ok_or_else(|| VxError::NotFound(format!("tag {tag}")))?;
            conn.execute(
                "INSERT OR IGNORE INTO file_tags (file_id, tag_id) VALUES (?1, ?2)",
                params![file_row_id, tag_row_id],
            )?;
            Ok(())
        })
    }

    fn remove_file_tag(&self, file_uuid: &str, tag: &str) -> Result<()> {
        self.with_conn(|conn| {
            let file_row_id = Self::file_row_id(conn, file_uuid)?
                .ok_or_else(|| VxError::NotFound(format!("file {file_uuid}")))?;
            let tag_row_id = Self::tag_row_id(conn, tag)?
                .ok_or_else(|| VxError::NotFound(format!("tag {tag}")))?;
            conn.execute(
                "DELETE FROM file_tags WHERE file_id = ?1 AND tag_id = ?2",
                params![file_row_id, tag_row_id],
            )?;
            Ok(())
        })
    }

    fn get_file_tags(&self, file_uuid: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let Some(file_row_id) = Self::file_row_id(conn, file_uuid)? else {
                return Ok(Vec::new());
            };
            let mut stmt = conn.prepare(
                "SELECT t.name FROM tags t \
                 JOIN file_tags ft ON ft.tag_id = t.id \
                 WHERE ft.file_id = ?1 ORDER BY t.name ASC",
            )?;
            let rows = stmt
                .query_map(params![file_row_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn find_files_any(&self, tags: &[String]) -> Result<Vec<FileRow>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        self.with_conn(|conn| {
            let placeholders = tags.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!(
                "SELECT DISTINCT f.id, f.uuid, f.folder_id, f.name, f.created_utc, f.modified_utc, f.metadata \
                 FROM files f \
                 JOIN file_tags ft ON ft.file_id = f.id \
                 JOIN tags t ON t.id = ft.tag_id \
                 WHERE t.name IN ({placeholders}) \
                 ORDER BY f.name ASC, f.id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::ToSql> =
                tags.iter().map(|t| t as &dyn rusqlite::ToSql).collect();
            let rows = stmt
                .query_map(params.as_slice(), Self::file_row_from_sql)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn find_files_all(&self, tags: &[String]) -> Result<Vec<FileRow>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        self.with_conn(|conn| {
            let placeholders = tags.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!(
                "SELECT f.id, f.uuid, f.folder_id, f.name, f.created_utc, f.modified_utc, f.metadata \
                 FROM files f \
                 JOIN file_tags ft ON ft.file_id = f.id \
                 JOIN tags t ON t.id = ft.tag_id \
                 WHERE t.name IN ({placeholders}) \
                 GROUP BY f.id \
                 HAVING COUNT(DISTINCT t.name) = ? \
                 ORDER BY f.name ASC, f.id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut params: Vec<&dyn rusqlite::ToSql> =
                tags.iter().map(|t| t as &dyn rusqlite::ToSql).collect();
            let count = tags.len() as i64;
            params.push(&count);
            let rows = stmt
                .query_map(params.as_slice(), Self::file_row_from_sql)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn count_files_by_tag(&self) -> Result<Vec<(String, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.name, COUNT(ft.file_id) FROM tags t \
                 LEFT JOIN file_tags ft ON ft.tag_id = t.id \
                 GROUP BY t.id ORDER BY t.name ASC",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn iterate_all_files(&self, cb: &mut dyn FnMut(&str, &FileRow) -> bool) -> Result<()> {
        self.with_conn(|conn| {
            let root: Option<FolderRow> = conn
                .query_row(
                    "SELECT id, uuid, parent_id, name, created_utc, modified_utc, metadata \
                     FROM folders WHERE parent_id IS NULL",
                    [],
                    Self::folder_row_from_sql,
                )
                .optional()?;
            if let Some(root) = root {
                Self::walk_files(conn, root.row_id, ".", cb)?;
            }
            Ok(())
        })
    }

    fn get_sync_state(&self, folder_uuid: &str) -> Result<Option<SyncState>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT last_sync_utc, config_file_mtime FROM folders WHERE uuid = ?1",
                params![folder_uuid],
                |row| {
                    let last_sync_utc: Option<i64> = row.get(0)?;
                    let config_file_mtime: Option<i64> = row.get(1)?;
                    Ok(match (last_sync_utc, config_file_mtime) {
                        (Some(last_sync_utc), Some(config_file_mtime)) => Some(SyncState {
                            last_sync_utc,
                            config_file_mtime,
                        }),
                        _ => None,
                    })
                },
            )
            .optional()
            .map(|opt| opt.flatten())
            .map_err(VxError::from)
        })
    }

    fn update_sync_state(&self, folder_uuid: &str, state: SyncState) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE folders SET last_sync_utc = ?1, config_file_mtime = ?2 WHERE uuid = ?3",
                params![state.last_sync_utc, state.config_file_mtime, folder_uuid],
            )?;
            Ok(())
        })
    }

    fn clear_sync_state(&self, folder_uuid: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE folders SET last_sync_utc = NULL, config_file_mtime = NULL WHERE uuid = ?1",
                params![folder_uuid],
            )?;
            Ok(())
        })
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM notebook_kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(VxError::from)
        })
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notebook_kv (key, value) VALUES (?1, ?2) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
    }
}
