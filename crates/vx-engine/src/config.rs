//! # Configuration
//!
//! App-level configuration is the "out of scope" collaborator of §1: the
//! engine itself never reads it directly. It exists as a small, real
//! layered-config module built with [`confique`], the same crate this
//! codebase always reaches for layered config: project file → global file →
//! environment variables → compiled defaults. The CLI and notebook-open
//! call sites are the only consumers.
//!
//! This module also hosts the two narrow collaborator traits the engine
//! *does* depend on (§1, §4.5, §5): [`PathsProvider`] (app-data and
//! notebook-local-data directories) and [`SessionSink`] (the open-notebook
//! session list). Both are implemented here with a filesystem-backed
//! default, but the engine depends only on the trait.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VxError};

/// Process-wide test-mode flag (§9 "Global logger / test-mode flag"). When
/// set, [`DefaultPaths`] resolves app-data under a throwaway root instead of
/// the real OS data directory, so tests never touch a developer's real
/// notebook session list. No hidden state survives a flag flip: every
/// accessor re-reads this atomic rather than caching a resolved path.
static TEST_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_test_mode(enabled: bool) {
    TEST_MODE.store(enabled, Ordering::SeqCst);
}

pub fn is_test_mode() -> bool {
    TEST_MODE.load(Ordering::SeqCst)
}

/// Which content-search backend [`crate::search`] uses by default when the
/// caller does not pin one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchBackendKind {
    InProcess,
    Ripgrep,
}

impl Default for SearchBackendKind {
    fn default() -> Self {
        SearchBackendKind::InProcess
    }
}

/// SQLite journaling mode for the metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JournalMode {
    Wal,
    Delete,
}

impl Default for JournalMode {
    fn default() -> Self {
        JournalMode::Wal
    }
}

impl JournalMode {
    pub fn as_pragma_value(&self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
        }
    }
}

/// Layered app configuration: project file → global file → env → defaults.
/// Env vars are prefixed `VX__`, e.g. `VX__SEARCH_BACKEND=ripgrep`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Default content-search backend ("in_process" or "ripgrep").
    #[config(default = "in_process")]
    pub search_backend: String,

    /// SQLite journaling mode for the metadata store ("WAL" or "DELETE").
    #[config(default = "WAL")]
    pub journal_mode: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search_backend: "in_process".to_string(),
            journal_mode: "WAL".to_string(),
        }
    }
}

impl AppConfig {
    pub fn search_backend_kind(&self) -> SearchBackendKind {
        match self.search_backend.as_str() {
            "ripgrep" => SearchBackendKind::Ripgrep,
            _ => SearchBackendKind::InProcess,
        }
    }

    pub fn journal_mode_kind(&self) -> JournalMode {
        match self.journal_mode.to_uppercase().as_str() {
            "DELETE" => JournalMode::Delete,
            _ => JournalMode::Wal,
        }
    }

    /// Load layered config: `./vx.toml` (project) overrides the global
    /// config-dir file, which overrides compiled defaults. Environment
    /// variables (`VX__*`) take precedence over both files.
    pub fn load(paths: &dyn PathsProvider) -> Result<Self> {
        let mut builder = AppConfig::builder().env();

        if let Some(global) = paths.app_config_file() {
            if global.exists() {
                builder = builder.file(&global);
            }
        }

        let project_file = PathBuf::from("vx.toml");
        if project_file.exists() {
            builder = builder.file(&project_file);
        }

        builder
            .load()
            .map_err(|e| VxError::InvalidState(format!("failed to load config: {e}")))
    }
}

/// The paths collaborator (§1, §6.2): app-data root and notebook-local-data
/// root. The engine only ever asks for these two directories; it never
/// resolves OS-specific data dirs itself.
pub trait PathsProvider: Send + Sync {
    /// Root directory for engine-owned local data (session list, per-notebook
    /// metadata-store files under `notebooks/<id>.db`, §6.2).
    fn app_data_dir(&self) -> PathBuf;

    /// Directory holding data private to one notebook (currently just the
    /// metadata-store file; kept distinct from `app_data_dir` so a future
    /// per-notebook cache can live alongside it without crowding the shared
    /// session-list directory).
    fn notebook_local_data_dir(&self, notebook_id: &str) -> PathBuf {
        self.app_data_dir().join("notebooks").join(notebook_id)
    }

    fn store_db_path(&self, notebook_id: &str) -> PathBuf {
        self.app_data_dir()
            .join("notebooks")
            .join(format!("{notebook_id}.db"))
    }

    /// Path to the optional global `vx.toml`, if this provider has one.
    fn app_config_file(&self) -> Option<PathBuf> {
        None
    }
}

/// Filesystem-backed [`PathsProvider`] using the OS-conventional data
/// directory (via `directories`), or a temp-rooted path under test mode.
pub struct DefaultPaths {
    override_root: Option<PathBuf>,
}

impl DefaultPaths {
    pub fn new() -> Self {
        Self { override_root: None }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            override_root: Some(root.into()),
        }
    }
}

impl Default for DefaultPaths {
    fn default() -> Self {
        Self::new()
    }
}

impl PathsProvider for DefaultPaths {
    fn app_data_dir(&self) -> PathBuf {
        if let Some(root) = &self.override_root {
            return root.clone();
        }
        if is_test_mode() {
            return std::env::temp_dir().join("vx-test-data");
        }
        ProjectDirs::from("com", "vxnotes", "vx")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| Path::new(".vx-data").to_path_buf())
    }

    fn app_config_file(&self) -> Option<PathBuf> {
        ProjectDirs::from("com", "vxnotes", "vx").map(|d| d.config_dir().join("vx.toml"))
    }
}

/// The session collaborator (§1, §4.5): a callback-shaped sink for the
/// open-notebook session list, so the engine never owns session
/// persistence. `add` is called on successful create/open, `remove` on
/// close.
pub trait SessionSink: Send + Sync {
    fn add(&self, notebook_id: &str, root_folder: &str) -> Result<()>;
    fn remove(&self, notebook_id: &str) -> Result<()>;
    fn list(&self) -> Result<Vec<(String, String)>>;
}

/// A [`SessionSink`] backed by a JSON file of `{id, root}` entries under the
/// app-data directory. Not a subsystem of the core — just the default
/// collaborator implementation a caller who doesn't want to write their own
/// gets for free.
pub struct FileSessionSink {
    path: PathBuf,
}

impl FileSessionSink {
    pub fn new(paths: &dyn PathsProvider) -> Self {
        Self {
            path: paths.app_data_dir().join("sessions.json"),
        }
    }

    fn read_all(&self) -> Result<Vec<(String, String)>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let value: Vec<(String, String)> =
            serde_json::from_str(&content).map_err(VxError::parse)?;
        Ok(value)
    }

    fn write_all(&self, entries: &[(String, String)]) -> Result<()> {
        crate::codec::write_json_atomic(&self.path, &entries)
    }
}

impl SessionSink for FileSessionSink {
    fn add(&self, notebook_id: &str, root_folder: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        if !entries.iter().any(|(id, _)| id == notebook_id) {
            entries.push((notebook_id.to_string(), root_folder.to_string()));
        }
        self.write_all(&entries)
    }

    fn remove(&self, notebook_id: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.retain(|(id, _)| id != notebook_id);
        self.write_all(&entries)
    }

    fn list(&self) -> Result<Vec<(String, String)>> {
        self.read_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.search_backend, "in_process");
        assert_eq!(config.search_backend_kind(), SearchBackendKind::InProcess);
        assert_eq!(config.journal_mode_kind(), JournalMode::Wal);
    }

    #[test]
    fn test_session_sink_add_remove() {
        let dir = tempdir().unwrap();
        let paths = DefaultPaths::with_root(dir.path().to_path_buf());
        let sink = FileSessionSink::new(&paths);

        sink.add("nb1", "/tmp/nb1").unwrap();
        sink.add("nb2", "/tmp/nb2").unwrap();
        assert_eq!(sink.list().unwrap().len(), 2);

        sink.remove("nb1").unwrap();
        let remaining = sink.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].0, "nb2");
    }

    #[test]
    fn test_session_sink_add_is_idempotent() {
        let dir = tempdir().unwrap();
        let paths = DefaultPaths::with_root(dir.path().to_path_buf());
        let sink = FileSessionSink::new(&paths);

        sink.add("nb1", "/tmp/nb1").unwrap();
        sink.add("nb1", "/tmp/nb1").unwrap();
        assert_eq!(sink.list().unwrap().len(), 1);
    }

    #[test]
    fn test_default_paths_notebook_local_data_dir() {
        let dir = tempdir().unwrap();
        let paths = DefaultPaths::with_root(dir.path().to_path_buf());
        let local = paths.notebook_local_data_dir("abc");
        assert_eq!(local, dir.path().join("notebooks").join("abc"));
    }
}
