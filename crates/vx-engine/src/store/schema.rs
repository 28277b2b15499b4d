//! The relational schema backing the metadata store. Mirrors the original
//! engine's table layout field-for-field so that the store stays a faithful
//! index over the same tree shape the folder configs describe.

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

pub const INIT_SCRIPT: &str = r#"
CREATE TABLE IF NOT EXISTS folders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    parent_id INTEGER,
    name TEXT NOT NULL,
    created_utc INTEGER NOT NULL,
    modified_utc INTEGER NOT NULL,
    metadata TEXT,
    last_sync_utc INTEGER,
    config_file_mtime INTEGER,
    FOREIGN KEY (parent_id) REFERENCES folders(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_folders_parent ON folders(parent_id);
CREATE INDEX IF NOT EXISTS idx_folders_uuid ON folders(uuid);

CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT NOT NULL UNIQUE,
    folder_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_utc INTEGER NOT NULL,
    modified_utc INTEGER NOT NULL,
    metadata TEXT,
    FOREIGN KEY (folder_id) REFERENCES folders(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_files_folder ON files(folder_id);
CREATE INDEX IF NOT EXISTS idx_files_name ON files(name);
CREATE INDEX IF NOT EXISTS idx_files_uuid ON files(uuid);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    parent_id INTEGER,
    metadata TEXT,
    FOREIGN KEY (parent_id) REFERENCES tags(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(name);
CREATE INDEX IF NOT EXISTS idx_tags_parent ON tags(parent_id);

CREATE TABLE IF NOT EXISTS file_tags (
    file_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (file_id, tag_id),
    FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_file_tags_tag ON file_tags(tag_id);

CREATE TABLE IF NOT EXISTS notebook_kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);
"#;

/// Drop order respects foreign-key dependencies (children before parents),
/// though `ON DELETE CASCADE` plus `foreign_keys=ON` would also tolerate any
/// order here.
pub const TABLE_NAMES: [&str; 6] = [
    "file_tags",
    "files",
    "tags",
    "folders",
    "notebook_kv",
    "schema_version",
];

pub fn drop_all_script() -> String {
    let mut script = String::new();
    for table in TABLE_NAMES {
        script.push_str(&format!("DROP TABLE IF EXISTS {table};\n"));
    }
    script
}
