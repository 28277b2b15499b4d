//! # Notebook & notebook manager (C5)
//!
//! A [`Notebook`] bundles a [`FolderManager`] (C4) with the notebook-level
//! config (§3 `N`) that is ground truth for the tag tree. The
//! [`NotebookManager`] is the session-scoped registry of currently open
//! notebooks: it is the only place that resolves a root folder path to a
//! notebook id, opens/closes the metadata store, and talks to the session
//! and paths collaborators (§1, §5).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::codec;
use crate::config::{PathsProvider, SessionSink};
use crate::error::{Result, VxError};
use crate::events::{Event, EventBus};
use crate::folder_manager::{BundledFolderManager, FolderManager, RawFolderManager};
use crate::model::{NotebookConfig, NotebookKind};
use crate::path::{clean_path, generate_uuid, relative_path};
use crate::store::sqlite::SqliteStore;

pub const NOTEBOOK_SIDECAR_DIR: &str = "vx_notebook";
pub const NOTEBOOK_CONFIG_FILENAME: &str = "config.json";

/// One open notebook: its identity, its on-disk root, and the folder
/// manager that mutates both the content tree and the metadata store.
pub struct Notebook {
    pub id: String,
    pub root_folder: PathBuf,
    pub kind: NotebookKind,
    pub config: NotebookConfig,
    pub folder_manager: Box<dyn FolderManager>,
    /// Where `config` is persisted. Bundled notebooks write under
    /// `<root>/vx_notebook/config.json`; raw notebooks have no sidecar in
    /// their content root at all and write under the notebook-local-data
    /// directory instead (§9 "Raw vs bundled as variants").
    config_path: PathBuf,
}

impl Notebook {
    pub fn save_config(&self) -> Result<()> {
        codec::write_notebook_config(&self.config_path, &self.config)
    }
}

/// A summary row for [`NotebookManager::list_notebooks`] (§6.4).
#[derive(Debug, Clone)]
pub struct NotebookInfo {
    pub id: String,
    pub root: String,
    pub kind: NotebookKind,
}

/// The session-scoped registry of open notebooks (C5). One instance is
/// typically owned by the operation-surface layer (C8).
pub struct NotebookManager {
    notebooks: HashMap<String, Notebook>,
    paths: Arc<dyn PathsProvider>,
    session: Arc<dyn SessionSink>,
    events: EventBus,
}

impl NotebookManager {
    pub fn new(paths: Arc<dyn PathsProvider>, session: Arc<dyn SessionSink>, events: EventBus) -> Self {
        Self {
            notebooks: HashMap::new(),
            paths,
            session,
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn bundled_config_path(root: &std::path::Path) -> PathBuf {
        root.join(NOTEBOOK_SIDECAR_DIR).join(NOTEBOOK_CONFIG_FILENAME)
    }

    fn open_store(&self, notebook_id: &str) -> Result<Box<dyn crate::store::MetadataStore>> {
        let path = self.paths.store_db_path(notebook_id);
        Ok(Box::new(SqliteStore::open(&path)?))
    }

    fn find_open_by_root(&self, root: &std::path::Path) -> Option<&Notebook> {
        self.notebooks.values().find(|nb| nb.root_folder == root)
    }

    /// Creates a brand-new notebook at `root_folder` (§4.5): ensures the
    /// root exists, initializes the folder manager (which emits the root
    /// folder config for bundled notebooks), writes the notebook config,
    /// and registers the notebook with the session collaborator.
    pub fn create_notebook(&mut self, root_folder: &str, kind: NotebookKind, properties: Value) -> Result<String> {
        let root = PathBuf::from(root_folder);
        if self.find_open_by_root(&root).is_some() {
            return Err(VxError::AlreadyExists(format!("notebook already open at {root_folder}")));
        }
        std::fs::create_dir_all(&root)?;

        let id = generate_uuid();
        let store = self.open_store(&id)?;

        let folder_manager: Box<dyn FolderManager> = match kind {
            NotebookKind::Bundled => Box::new(BundledFolderManager::init_new(root.clone(), store)?),
            NotebookKind::Raw => Box::new(RawFolderManager::new(root.clone(), store)),
        };

        let name = properties
            .as_object()
            .and_then(|o| o.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let mut config = NotebookConfig::new(name);
        config.id = id.clone();
        if let Some(obj) = properties.as_object() {
            if let Some(desc) = obj.get("description").and_then(|v| v.as_str()) {
                config.description = desc.to_string();
            }
            if let Some(meta) = obj.get("metadata") {
                if meta.is_object() {
                    config.metadata = meta.clone();
                }
            }
        }

        let config_path = match kind {
            NotebookKind::Bundled => Self::bundled_config_path(&root),
            NotebookKind::Raw => self.paths.notebook_local_data_dir(&id).join(NOTEBOOK_CONFIG_FILENAME),
        };

        let notebook = Notebook {
            id: id.clone(),
            root_folder: root.clone(),
            kind,
            config,
            folder_manager,
            config_path,
        };
        notebook.save_config()?;

        self.notebooks.insert(id.clone(), notebook);
        self.session.add(&id, &root.to_string_lossy())?;
        self.events.publish(Event::NotebookOpened { notebook_id: id.clone() });
        Ok(id)
    }

    /// Opens an existing bundled notebook rooted at `root_folder` (§4.5).
    /// If it's already open, returns its id without touching disk again.
    /// Only bundled notebooks can be located by path — a raw notebook's
    /// config lives only in app-local data, keyed by an id the caller must
    /// already hold, so `open_notebook` cannot discover one from a bare
    /// path (§9 "Raw vs bundled as variants": raw support is deliberately
    /// degenerate).
    pub fn open_notebook(&mut self, root_folder: &str) -> Result<String> {
        let root = PathBuf::from(root_folder);
        if let Some(nb) = self.find_open_by_root(&root) {
            return Ok(nb.id.clone());
        }

        let config_path = Self::bundled_config_path(&root);
        if !config_path.exists() {
            return Err(VxError::NotFound(format!("no notebook found at {root_folder}")));
        }
        let config = codec::read_notebook_config(&config_path)?;
        let id = config.id.clone();

        let store = self.open_store(&id)?;
        let folder_manager: Box<dyn FolderManager> = Box::new(BundledFolderManager::open(root.clone(), store));

        let notebook = Notebook {
            id: id.clone(),
            root_folder: root.clone(),
            kind: NotebookKind::Bundled,
            config,
            folder_manager,
            config_path,
        };
        self.notebooks.insert(id.clone(), notebook);

        self.get_notebook_mut(&id)?.sync_tags_if_needed()?;

        self.session.add(&id, &root.to_string_lossy())?;
        self.events.publish(Event::NotebookOpened { notebook_id: id.clone() });
        Ok(id)
    }

    /// Closes `id`: drops the cache, closes the store (releasing OS
    /// handles), and removes the session record so it doesn't reappear on
    /// next process start (§4.5, §5).
    pub fn close_notebook(&mut self, id: &str) -> Result<()> {
        let mut notebook = self
            .notebooks
            .remove(id)
            .ok_or_else(|| VxError::NotFound(format!("notebook not open: {id}")))?;
        notebook.folder_manager.close()?;
        self.session.remove(id)?;
        self.events.publish(Event::NotebookClosed { notebook_id: id.to_string() });
        Ok(())
    }

    pub fn get_notebook(&self, id: &str) -> Result<&Notebook> {
        self.notebooks
            .get(id)
            .ok_or_else(|| VxError::NotFound(format!("notebook not open: {id}")))
    }

    pub fn get_notebook_mut(&mut self, id: &str) -> Result<&mut Notebook> {
        self.notebooks
            .get_mut(id)
            .ok_or_else(|| VxError::NotFound(format!("notebook not open: {id}")))
    }

    pub fn get_notebook_config(&self, id: &str) -> Result<NotebookConfig> {
        Ok(self.get_notebook(id)?.config.clone())
    }

    /// Replace-semantics patch over `{name, description, assetsFolder,
    /// attachmentsFolder, metadata}` (§6.3). Fields absent from `patch` are
    /// left untouched; `metadata`, when present, replaces the whole object
    /// rather than being merged key-by-key, consistent with file/folder
    /// metadata updates elsewhere in this engine.
    pub fn update_notebook_config(&mut self, id: &str, patch: Value) -> Result<()> {
        let obj = patch
            .as_object()
            .ok_or_else(|| VxError::InvalidParam("notebook config patch must be a JSON object".to_string()))?;
        if let Some(metadata) = obj.get("metadata") {
            if !metadata.is_object() {
                return Err(VxError::InvalidParam("notebook metadata must be a JSON object".to_string()));
            }
        }

        let nb = self.get_notebook_mut(id)?;
        if let Some(name) = obj.get("name").and_then(|v| v.as_str()) {
            nb.config.name = name.to_string();
        }
        if let Some(desc) = obj.get("description").and_then(|v| v.as_str()) {
            nb.config.description = desc.to_string();
        }
        if let Some(assets) = obj.get("assetsFolder").and_then(|v| v.as_str()) {
            nb.config.assets_folder = assets.to_string();
        }
        if let Some(attachments) = obj.get("attachmentsFolder").and_then(|v| v.as_str()) {
            nb.config.attachments_folder = attachments.to_string();
        }
        if let Some(metadata) = obj.get("metadata") {
            nb.config.metadata = metadata.clone();
        }
        nb.save_config()
    }

    pub fn list_notebooks(&self) -> Vec<NotebookInfo> {
        self.notebooks
            .values()
            .map(|nb| NotebookInfo {
                id: nb.id.clone(),
                root: nb.root_folder.to_string_lossy().to_string(),
                kind: nb.kind,
            })
            .collect()
    }

    /// For each open notebook, checks whether `absolute_path` lies under
    /// its root; the first non-empty [`relative_path`] wins (§4.5). Returns
    /// `(id, ".")` for an exact root match, `NotFound` if no open notebook
    /// contains the path.
    pub fn resolve_path(&self, absolute_path: &str) -> Result<(String, String)> {
        let abs = clean_path(absolute_path);
        for nb in self.notebooks.values() {
            let root = nb.root_folder.to_string_lossy().to_string();
            let rel = relative_path(&root, &abs);
            if !rel.is_empty() {
                return Ok((nb.id.clone(), rel));
            }
        }
        Err(VxError::NotFound(format!("path not under any open notebook: {absolute_path}")))
    }

    pub fn rebuild_cache(&mut self, id: &str) -> Result<()> {
        {
            let nb = self.get_notebook_mut(id)?;
            nb.folder_manager.sync_metadata_store_from_configs()?;
        }
        self.events.publish(Event::IndexRebuilt { notebook_id: id.to_string() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DefaultPaths, FileSessionSink};
    use tempfile::tempdir;

    fn manager(dir: &std::path::Path) -> NotebookManager {
        let paths: Arc<dyn PathsProvider> = Arc::new(DefaultPaths::with_root(dir.join("appdata")));
        let session: Arc<dyn SessionSink> = Arc::new(FileSessionSink::new(paths.as_ref()));
        NotebookManager::new(paths, session, EventBus::new())
    }

    #[test]
    fn test_create_then_open_returns_same_id() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nb1");
        let mut mgr = manager(dir.path());

        let id = mgr
            .create_notebook(&root.to_string_lossy(), NotebookKind::Bundled, serde_json::json!({"name": "N"}))
            .unwrap();
        mgr.close_notebook(&id).unwrap();

        let reopened = mgr.open_notebook(&root.to_string_lossy()).unwrap();
        assert_eq!(reopened, id);
        assert_eq!(mgr.get_notebook_config(&reopened).unwrap().name, "N");
    }

    #[test]
    fn test_create_twice_at_same_root_fails_while_open() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nb1");
        let mut mgr = manager(dir.path());

        mgr.create_notebook(&root.to_string_lossy(), NotebookKind::Bundled, Value::Null).unwrap();
        let err = mgr
            .create_notebook(&root.to_string_lossy(), NotebookKind::Bundled, Value::Null)
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::AlreadyExists);
    }

    #[test]
    fn test_resolve_path_exact_root_is_dot() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nb1");
        let mut mgr = manager(dir.path());
        let id = mgr
            .create_notebook(&root.to_string_lossy(), NotebookKind::Bundled, Value::Null)
            .unwrap();

        let (resolved_id, rel) = mgr.resolve_path(&root.to_string_lossy()).unwrap();
        assert_eq!(resolved_id, id);
        assert_eq!(rel, ".");
    }

    #[test]
    fn test_resolve_path_outside_any_notebook_is_not_found() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nb1");
        let mut mgr = manager(dir.path());
        mgr.create_notebook(&root.to_string_lossy(), NotebookKind::Bundled, Value::Null)
            .unwrap();

        let err = mgr.resolve_path("/completely/unrelated/path").unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::NotFound);
    }

    #[test]
    fn test_close_then_reopen_removes_session_then_readds() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nb1");
        let mut mgr = manager(dir.path());
        let id = mgr
            .create_notebook(&root.to_string_lossy(), NotebookKind::Bundled, Value::Null)
            .unwrap();
        assert_eq!(mgr.session.list().unwrap().len(), 1);

        mgr.close_notebook(&id).unwrap();
        assert!(mgr.session.list().unwrap().is_empty());

        mgr.open_notebook(&root.to_string_lossy()).unwrap();
        assert_eq!(mgr.session.list().unwrap().len(), 1);
    }

    #[test]
    fn test_update_notebook_config_replaces_metadata() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nb1");
        let mut mgr = manager(dir.path());
        let id = mgr
            .create_notebook(&root.to_string_lossy(), NotebookKind::Bundled, Value::Null)
            .unwrap();

        mgr.update_notebook_config(&id, serde_json::json!({"name": "Renamed", "metadata": {"k": "v"}}))
            .unwrap();
        let cfg = mgr.get_notebook_config(&id).unwrap();
        assert_eq!(cfg.name, "Renamed");
        assert_eq!(cfg.metadata["k"], "v");
    }
}
