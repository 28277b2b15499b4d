//! # Folder manager (C4)
//!
//! The sole mutator of the on-disk tree under a notebook's `root_folder`
//! and of the derived metadata-store rows that mirror it. Two
//! implementations share the [`FolderManager`] trait: [`BundledFolderManager`]
//! does the real work described in §4.4; [`RawFolderManager`] is the
//! degenerate variant that answers every node mutation with `Unsupported`
//! (§9 "Raw vs bundled as variants").

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::codec::{self, FOLDER_CONFIG_FILENAME};
use crate::error::{Result, VxError};
use crate::model::{FileRecord, FolderConfig};
use crate::path::{clean_path, generate_uuid, join, now_millis, split_path};
use crate::store::{MetadataStore, NewFile, NewFolder};

/// A direct subfolder as returned by [`FolderManager::list_folder_children`].
/// `info` is populated only when the caller asked for it — loading every
/// subfolder's config is an extra disk read per child.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderChildEntry {
    pub name: String,
    pub info: Option<FolderConfig>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FolderChildren {
    pub files: Vec<FileRecord>,
    pub folders: Vec<FolderChildEntry>,
}

/// The full operation set of C4, §4.4.3. Every method normalizes its path
/// inputs with [`clean_path`] first. Mutating methods on the bundled
/// implementation save every folder config they touch and write through to
/// the metadata store before returning (§4.4.5).
pub trait FolderManager {
    fn get_folder_config(&mut self, path: &str) -> Result<FolderConfig>;

    fn create_folder(&mut self, parent_path: &str, name: &str) -> Result<String>;
    fn delete_folder(&mut self, path: &str) -> Result<()>;
    fn rename_folder(&mut self, path: &str, new_name: &str) -> Result<()>;
    fn move_folder(&mut self, src_path: &str, dest_parent_path: &str) -> Result<()>;
    fn copy_folder(&mut self, src_path: &str, dest_parent_path: &str, new_name: Option<&str>) -> Result<String>;

    fn create_file(&mut self, folder_path: &str, file_name: &str) -> Result<String>;
    fn delete_file(&mut self, file_path: &str) -> Result<()>;
    fn rename_file(&mut self, file_path: &str, new_name: &str) -> Result<()>;
    fn move_file(&mut self, src_file_path: &str, dest_folder_path: &str) -> Result<()>;
    fn copy_file(&mut self, src_file_path: &str, dest_folder_path: &str, new_name: Option<&str>) -> Result<String>;

    /// Copies bytes from `external_path` (outside any notebook root) into
    /// `dest_folder_path`. Unlike `create_file`/`copy_file`, a name
    /// collision does not fail the operation — the name is auto-renamed by
    /// appending a numeric suffix before the extension (§4.4.3 `import_file`).
    fn import_file(&mut self, external_path: &Path, dest_folder_path: &str, new_name: Option<&str>) -> Result<String>;
    /// Recursively imports an external directory tree as a new folder under
    /// `dest_parent_path`, generating a fresh folder config (and fresh ids
    /// for every created node) exactly as `copy_folder` does for an
    /// in-notebook source (§4.4.3 `import_folder`).
    fn import_folder(&mut self, external_path: &Path, dest_parent_path: &str, new_name: Option<&str>) -> Result<String>;

    fn update_file_metadata(&mut self, file_path: &str, metadata: Value) -> Result<()>;
    fn update_file_tags(&mut self, file_path: &str, tags: &[String], valid_tags: &[String]) -> Result<()>;
    fn add_tag_to_file(&mut self, file_path: &str, tag: &str, valid_tags: &[String]) -> Result<()>;
    fn remove_tag_from_file(&mut self, file_path: &str, tag: &str) -> Result<()>;

    fn get_file_info(&mut self, file_path: &str) -> Result<FileRecord>;
    fn get_file_metadata(&mut self, file_path: &str) -> Result<Value>;
    fn get_folder_metadata(&mut self, folder_path: &str) -> Result<Value>;
    fn update_folder_metadata(&mut self, folder_path: &str, metadata: Value) -> Result<()>;

    fn list_folder_children(&mut self, folder_path: &str, include_folder_info: bool) -> Result<FolderChildren>;
    fn iterate_all_files(&mut self, cb: &mut dyn FnMut(&str, &FileRecord) -> bool) -> Result<()>;

    fn sync_metadata_store_from_configs(&mut self) -> Result<()>;
    fn invalidate(&mut self, path: &str);

    fn store(&self) -> &dyn MetadataStore;
    fn root(&self) -> &Path;
    fn close(&mut self) -> Result<()>;

    /// `mkdir -p` for the folder tree (§6.4 folder `create_path`): creates
    /// every ancestor of `path` that doesn't already exist, then `path`
    /// itself, and is idempotent for any prefix that already exists (R5).
    /// A default implementation in terms of `get_folder_config`/`create_folder`
    /// suffices for both the bundled and raw managers — the raw manager
    /// simply propagates the `Unsupported` error its `get_folder_config` returns.
    fn create_folder_path(&mut self, path: &str) -> Result<String> {
        let path = clean_path(path);
        let mut current = ".".to_string();
        let mut last_id = self.get_folder_config(".")?.id;
        for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            let next = join(&current, segment);
            last_id = match self.get_folder_config(&next) {
                Ok(cfg) => cfg.id,
                Err(VxError::NotFound(_)) => self.create_folder(&current, segment)?,
                Err(e) => return Err(e),
            };
            current = next;
        }
        Ok(last_id)
    }
}

fn join_root(base: &Path, path: &str) -> PathBuf {
    if path == "." {
        base.to_path_buf()
    } else {
        base.join(path)
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Splits a file name into `(stem, extension)`; a leading dot (dotfiles)
/// does not count as an extension separator.
fn split_ext(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Finds a name that collides with neither `folder_config`'s file records
/// nor an existing entry in `content_dir`, starting from `desired` and then
/// trying `stem (1).ext`, `stem (2).ext`, … (§4.4.3 `import_file`).
fn unique_file_name(folder_config: &FolderConfig, content_dir: &Path, desired: &str) -> String {
    let collides = |name: &str| folder_config.find_file(name).is_some() || content_dir.join(name).exists();
    if !collides(desired) {
        return desired.to_string();
    }
    let (stem, ext) = split_ext(desired);
    for i in 1.. {
        let candidate = match ext {
            Some(ext) => format!("{stem} ({i}).{ext}"),
            None => format!("{stem} ({i})"),
        };
        if !collides(&candidate) {
            return candidate;
        }
    }
    unreachable!("unique_file_name: exhausted integer suffixes")
}

fn warn_store_err(op: &str, result: Result<()>) {
    if let Err(e) = result {
        tracing::warn!(operation = op, error = %e, "metadata store write-through failed; disk remains ground truth");
    }
}

/// The bundled folder manager (§4.4): owns the in-memory cache of parsed
/// folder configs and the metadata store, and is the only code path
/// allowed to touch either.
pub struct BundledFolderManager {
    root: PathBuf,
    cache: HashMap<String, FolderConfig>,
    store: Box<dyn MetadataStore>,
}

impl BundledFolderManager {
    /// Initializes a brand-new bundled notebook tree at `root` (§4.4.2):
    /// writes the root folder config, creates `vx_notebook/contents/`,
    /// and emits the matching store row.
    pub fn init_new(root: PathBuf, store: Box<dyn MetadataStore>) -> Result<Self> {
        fs::create_dir_all(&root)?;
        fs::create_dir_all(root.join("vx_notebook").join("contents"))?;

        let config = FolderConfig::new("");
        let mut manager = Self {
            root,
            cache: HashMap::new(),
            store,
        };
        codec::write_folder_config(&manager.sidecar_file("."), &config)?;

        let row = manager.store.create_folder(NewFolder {
            uuid: config.id.clone(),
            parent_row_id: None,
            name: config.name.clone(),
            created_utc: config.created_utc,
            modified_utc: config.modified_utc,
            metadata: config.metadata.clone(),
        })?;
        let _ = row;
        manager.cache.insert(".".to_string(), config);
        Ok(manager)
    }

    /// Opens an existing bundled notebook tree. The root config is loaded
    /// lazily on first access, same as every other folder.
    pub fn open(root: PathBuf, store: Box<dyn MetadataStore>) -> Self {
        Self {
            root,
            cache: HashMap::new(),
            store,
        }
    }

    fn content_dir(&self, path: &str) -> PathBuf {
        join_root(&self.root, path)
    }

    fn sidecar_dir(&self, path: &str) -> PathBuf {
        join_root(&self.root.join("vx_notebook").join("contents"), path)
    }

    fn sidecar_file(&self, path: &str) -> PathBuf {
        self.sidecar_dir(path).join(FOLDER_CONFIG_FILENAME)
    }

    fn invalidate_subtree(&mut self, path: &str) {
        let prefix = format!("{path}/");
        self.cache.retain(|k, _| *k != path && !k.starts_with(&prefix));
    }

    fn save_folder(&mut self, path: &str, config: &FolderConfig) -> Result<()> {
        codec::write_folder_config(&self.sidecar_file(path), config)?;
        self.cache.insert(path.to_string(), config.clone());
        Ok(())
    }

    /// Ensures the store has a row for `config` at `path`, recursing into
    /// the parent first if needed (§4.4.4 lazy sync).
    fn ensure_synced(&mut self, path: &str, config: &FolderConfig) -> Result<()> {
        if self.store.get_folder(&config.id)?.is_some() {
            return Ok(());
        }
        let parent_row_id = if path == "." {
            None
        } else {
            let (parent_path, _) = split_path(path);
            let parent_config = self.get_folder_config(&parent_path)?;
            let parent_row = self
                .store
                .get_folder(&parent_config.id)?
                .ok_or_else(|| VxError::InvalidState(format!("parent folder {parent_path} missing from store after sync")))?;
            Some(parent_row.row_id)
        };

        let row = self.store.create_folder(NewFolder {
            uuid: config.id.clone(),
            parent_row_id,
            name: config.name.clone(),
            created_utc: config.created_utc,
            modified_utc: config.modified_utc,
            metadata: config.metadata.clone(),
        })?;

        for file in &config.files {
            self.store.create_file(NewFile {
                uuid: file.id.clone(),
                folder_row_id: row.row_id,
                name: file.name.clone(),
                created_utc: file.created_utc,
                modified_utc: file.modified_utc,
                metadata: file.metadata.clone(),
            })?;
            if !file.tags.is_empty() {
                self.store.set_file_tags(&file.id, &file.tags)?;
            }
        }
        Ok(())
    }

    fn folder_row_id(&self, config: &FolderConfig) -> Result<i64> {
        self.store
            .get_folder(&config.id)?
            .map(|row| row.row_id)
            .ok_or_else(|| VxError::InvalidState(format!("folder {} missing from store", config.id)))
    }

    /// Recursively regenerates ids and resets timestamps for a freshly
    /// disk-copied subtree, writing the updated configs back and emitting
    /// fresh store rows as it goes (P9: copy freshness).
    fn regenerate_and_sync(&mut self, path: &str, parent_row_id: Option<i64>, now: i64) -> Result<FolderConfig> {
        let mut config = codec::read_folder_config(&self.sidecar_file(path))?;
        config.id = generate_uuid();
        config.created_utc = now;
        config.modified_utc = now;
        for file in &mut config.files {
            file.id = generate_uuid();
            file.created_utc = now;
            file.modified_utc = now;
        }

        codec::write_folder_config(&self.sidecar_file(path), &config)?;

        let row = self.store.create_folder(NewFolder {
            uuid: config.id.clone(),
            parent_row_id,
            name: config.name.clone(),
            created_utc: config.created_utc,
            modified_utc: config.modified_utc,
            metadata: config.metadata.clone(),
        })?;
        for file in &config.files {
            self.store.create_file(NewFile {
                uuid: file.id.clone(),
                folder_row_id: row.row_id,
                name: file.name.clone(),
                created_utc: file.created_utc,
                modified_utc: file.modified_utc,
                metadata: file.metadata.clone(),
            })?;
            if !file.tags.is_empty() {
                self.store.set_file_tags(&file.id, &file.tags)?;
            }
        }

        for subfolder_name in config.folders.clone() {
            let sub_path = join(path, &subfolder_name);
            self.regenerate_and_sync(&sub_path, Some(row.row_id), now)?;
        }

        self.cache.insert(path.to_string(), config.clone());
        Ok(config)
    }

    /// Recursively mirrors an external directory into the notebook tree at
    /// `path`: creates the content and sidecar directories, writes a fresh
    /// folder config with brand-new ids for every file and subfolder, and
    /// emits matching store rows as it goes. Returns the new folder's id.
    fn import_dir_recursive(&mut self, external_dir: &Path, path: &str, name: &str, parent_row_id: Option<i64>) -> Result<String> {
        fs::create_dir_all(self.content_dir(path))?;
        fs::create_dir_all(self.sidecar_dir(path))?;

        let mut config = FolderConfig::new(name);
        let row = self.store.create_folder(NewFolder {
            uuid: config.id.clone(),
            parent_row_id,
            name: config.name.clone(),
            created_utc: config.created_utc,
            modified_utc: config.modified_utc,
            metadata: config.metadata.clone(),
        })?;

        let mut entries: Vec<_> = fs::read_dir(external_dir)?.collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let file_type = entry.file_type()?;
            let entry_name = entry.file_name().to_string_lossy().to_string();
            if file_type.is_dir() {
                let sub_path = join(path, &entry_name);
                self.import_dir_recursive(&entry.path(), &sub_path, &entry_name, Some(row.row_id))?;
                config.folders.push(entry_name);
            } else if file_type.is_file() {
                fs::copy(entry.path(), self.content_dir(path).join(&entry_name))?;
                let record = FileRecord::new(&entry_name);
                self.store.create_file(NewFile {
                    uuid: record.id.clone(),
                    folder_row_id: row.row_id,
                    name: record.name.clone(),
                    created_utc: record.created_utc,
                    modified_utc: record.modified_utc,
                    metadata: record.metadata.clone(),
                })?;
                config.files.push(record);
            }
        }

        codec::write_folder_config(&self.sidecar_file(path), &config)?;
        self.cache.insert(path.to_string(), config.clone());
        Ok(config.id)
    }

    fn sync_subtree(&mut self, path: &str, parent_row_id: Option<i64>) {
        let config = match self.get_folder_config(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path, error = %e, "skipping folder during rebuild");
                return;
            }
        };

        let row = match self.store.create_folder(NewFolder {
            uuid: config.id.clone(),
            parent_row_id,
            name: config.name.clone(),
            created_utc: config.created_utc,
            modified_utc: config.modified_utc,
            metadata: config.metadata.clone(),
        }) {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(path, error = %e, "skipping folder row during rebuild");
                return;
            }
        };

        for file in &config.files {
            if let Err(e) = self.store.create_file(NewFile {
                uuid: file.id.clone(),
                folder_row_id: row.row_id,
                name: file.name.clone(),
                created_utc: file.created_utc,
                modified_utc: file.modified_utc,
                metadata: file.metadata.clone(),
            }) {
                tracing::warn!(path, file = file.name, error = %e, "skipping file row during rebuild");
                continue;
            }
            if !file.tags.is_empty() {
                warn_store_err("rebuild:set_file_tags", self.store.set_file_tags(&file.id, &file.tags));
            }
        }

        let mut subfolders = config.folders.clone();
        subfolders.sort();
        for name in subfolders {
            let sub_path = join(path, &name);
            self.sync_subtree(&sub_path, Some(row.row_id));
        }
    }
}

impl FolderManager for BundledFolderManager {
    fn get_folder_config(&mut self, path: &str) -> Result<FolderConfig> {
        let path = clean_path(path);
        if let Some(cfg) = self.cache.get(&path) {
            return Ok(cfg.clone());
        }
        let config = codec::read_folder_config(&self.sidecar_file(&path))?;
        self.ensure_synced(&path, &config)?;
        self.cache.insert(path, config.clone());
        Ok(config)
    }

    fn create_folder(&mut self, parent_path: &str, name: &str) -> Result<String> {
        let parent_path = clean_path(parent_path);
        if name.is_empty() || name.contains('/') {
            return Err(VxError::InvalidParam(format!("invalid folder name: {name}")));
        }

        let mut parent_config = self.get_folder_config(&parent_path)?;
        let new_path = join(&parent_path, name);
        if self.content_dir(&new_path).exists() || parent_config.has_subfolder(name) {
            return Err(VxError::AlreadyExists(format!("folder already exists: {new_path}")));
        }

        fs::create_dir_all(self.content_dir(&new_path))?;
        let config = FolderConfig::new(name);
        self.save_folder(&new_path, &config)?;

        parent_config.folders.push(name.to_string());
        parent_config.touch();
        self.save_folder(&parent_path, &parent_config)?;

        let parent_row_id = self.folder_row_id(&parent_config)?;
        warn_store_err(
            "create_folder:insert_row",
            self.store
                .create_folder(NewFolder {
                    uuid: config.id.clone(),
                    parent_row_id: Some(parent_row_id),
                    name: config.name.clone(),
                    created_utc: config.created_utc,
                    modified_utc: config.modified_utc,
                    metadata: config.metadata.clone(),
                })
                .map(|_| ()),
        );
        warn_store_err(
            "create_folder:update_parent",
            self.store
                .update_folder(&parent_config.id, &parent_config.name, parent_config.modified_utc, &parent_config.metadata),
        );
        Ok(config.id)
    }

    fn delete_folder(&mut self, path: &str) -> Result<()> {
        let path = clean_path(path);
        if path == "." {
            return Err(VxError::Unsupported("cannot delete the root folder".to_string()));
        }
        if !self.content_dir(&path).exists() {
            return Err(VxError::NotFound(format!("folder not found: {path}")));
        }

        let folder_id = self
            .cache
            .get(&path)
            .map(|c| c.id.clone())
            .or_else(|| codec::read_folder_config(&self.sidecar_file(&path)).ok().map(|c| c.id));

        let (parent_path, name) = split_path(&path);
        let mut parent_config = self.get_folder_config(&parent_path)?;
        parent_config.folders.retain(|f| f != &name);
        parent_config.touch();
        self.save_folder(&parent_path, &parent_config)?;

        if self.content_dir(&path).exists() {
            fs::remove_dir_all(self.content_dir(&path))?;
        }
        if self.sidecar_dir(&path).exists() {
            fs::remove_dir_all(self.sidecar_dir(&path))?;
        }
        self.invalidate_subtree(&path);

        warn_store_err(
            "delete_folder:update_parent",
            self.store
                .update_folder(&parent_config.id, &parent_config.name, parent_config.modified_utc, &parent_config.metadata),
        );
        if let Some(id) = folder_id {
            warn_store_err("delete_folder:delete_row", self.store.delete_folder(&id));
        }
        Ok(())
    }

    fn rename_folder(&mut self, path: &str, new_name: &str) -> Result<()> {
        let path = clean_path(path);
        if path == "." {
            return Err(VxError::Unsupported("cannot rename the root folder".to_string()));
        }
        if new_name.is_empty() || new_name.contains('/') {
            return Err(VxError::InvalidParam(format!("invalid folder name: {new_name}")));
        }

        let (parent_path, old_name) = split_path(&path);
        let new_path = join(&parent_path, new_name);
        let mut parent_config = self.get_folder_config(&parent_path)?;
        if old_name != new_name && (parent_config.has_subfolder(new_name) || self.content_dir(&new_path).exists()) {
            return Err(VxError::AlreadyExists(format!("folder already exists: {new_path}")));
        }

        let mut config = self.get_folder_config(&path)?;

        fs::rename(self.content_dir(&path), self.content_dir(&new_path))?;
        fs::rename(self.sidecar_dir(&path), self.sidecar_dir(&new_path))?;

        config.name = new_name.to_string();
        config.touch();
        self.invalidate_subtree(&path);
        self.save_folder(&new_path, &config)?;

        for folder_name in parent_config.folders.iter_mut() {
            if folder_name == &old_name {
                *folder_name = new_name.to_string();
            }
        }
        parent_config.touch();
        self.save_folder(&parent_path, &parent_config)?;

        warn_store_err(
            "rename_folder:update_row",
            self.store.update_folder(&config.id, &config.name, config.modified_utc, &config.metadata),
        );
        warn_store_err(
            "rename_folder:update_parent",
            self.store
                .update_folder(&parent_config.id, &parent_config.name, parent_config.modified_utc, &parent_config.metadata),
        );
        Ok(())
    }

    fn move_folder(&mut self, src_path: &str, dest_parent_path: &str) -> Result<()> {
        let src_path = clean_path(src_path);
        let dest_parent_path = clean_path(dest_parent_path);
        if src_path == "." {
            return Err(VxError::Unsupported("cannot move the root folder".to_string()));
        }
        if dest_parent_path == src_path || dest_parent_path.starts_with(&format!("{src_path}/")) {
            return Err(VxError::InvalidParam("cannot move a folder into itself or a descendant".to_string()));
        }

        let (src_parent_path, name) = split_path(&src_path);
        let new_path = join(&dest_parent_path, &name);
        let mut dest_parent_config = self.get_folder_config(&dest_parent_path)?;
        if dest_parent_config.has_subfolder(&name) || self.content_dir(&new_path).exists() {
            return Err(VxError::AlreadyExists(format!("folder already exists: {new_path}")));
        }

        let config = self.get_folder_config(&src_path)?;
        let mut src_parent_config = self.get_folder_config(&src_parent_path)?;

        fs::rename(self.content_dir(&src_path), self.content_dir(&new_path))?;
        fs::rename(self.sidecar_dir(&src_path), self.sidecar_dir(&new_path))?;

        src_parent_config.folders.retain(|f| f != &name);
        src_parent_config.touch();
        self.save_folder(&src_parent_path, &src_parent_config)?;

        dest_parent_config.folders.push(name);
        dest_parent_config.touch();
        self.save_folder(&dest_parent_path, &dest_parent_config)?;

        self.invalidate_subtree(&src_path);
        self.cache.insert(new_path, config.clone());

        warn_store_err("move_folder:move_row", self.store.move_folder(&config.id, Some(&dest_parent_config.id)));
        warn_store_err(
            "move_folder:update_src_parent",
            self.store.update_folder(
                &src_parent_config.id,
                &src_parent_config.name,
                src_parent_config.modified_utc,
                &src_parent_config.metadata,
            ),
        );
        warn_store_err(
            "move_folder:update_dest_parent",
            self.store.update_folder(
                &dest_parent_config.id,
                &dest_parent_config.name,
                dest_parent_config.modified_utc,
                &dest_parent_config.metadata,
            ),
        );
        Ok(())
    }

    fn copy_folder(&mut self, src_path: &str, dest_parent_path: &str, new_name: Option<&str>) -> Result<String> {
        let src_path = clean_path(src_path);
        let dest_parent_path = clean_path(dest_parent_path);
        let (_, src_name) = split_path(&src_path);
        let name = new_name.unwrap_or(&src_name).to_string();

        let mut dest_parent_config = self.get_folder_config(&dest_parent_path)?;
        let new_path = join(&dest_parent_path, &name);
        if dest_parent_config.has_subfolder(&name) || self.content_dir(&new_path).exists() {
            return Err(VxError::AlreadyExists(format!("folder already exists: {new_path}")));
        }

        self.get_folder_config(&src_path)?;
        copy_dir_recursive(&self.content_dir(&src_path), &self.content_dir(&new_path))?;
        copy_dir_recursive(&self.sidecar_dir(&src_path), &self.sidecar_dir(&new_path))?;

        let mut new_root_config = codec::read_folder_config(&self.sidecar_file(&new_path))?;
        new_root_config.name = name.clone();
        codec::write_folder_config(&self.sidecar_file(&new_path), &new_root_config)?;

        let dest_parent_row_id = self.folder_row_id(&dest_parent_config)?;
        let now = now_millis();
        let new_config = self.regenerate_and_sync(&new_path, Some(dest_parent_row_id), now)?;

        dest_parent_config.folders.push(name);
        dest_parent_config.touch();
        self.save_folder(&dest_parent_path, &dest_parent_config)?;
        warn_store_err(
            "copy_folder:update_dest_parent",
            self.store.update_folder(
                &dest_parent_config.id,
                &dest_parent_config.name,
                dest_parent_config.modified_utc,
                &dest_parent_config.metadata,
            ),
        );

        Ok(new_config.id)
    }

    fn create_file(&mut self, folder_path: &str, file_name: &str) -> Result<String> {
        let folder_path = clean_path(folder_path);
        let mut folder_config = self.get_folder_config(&folder_path)?;
        let content_path = self.content_dir(&folder_path).join(file_name);
        if content_path.exists() || folder_config.find_file(file_name).is_some() {
            return Err(VxError::AlreadyExists(format!("file already exists: {}", join(&folder_path, file_name))));
        }

        fs::create_dir_all(self.content_dir(&folder_path))?;
        fs::write(&content_path, [])?;

        let record = FileRecord::new(file_name);
        folder_config.files.push(record.clone());
        folder_config.touch();
        self.save_folder(&folder_path, &folder_config)?;

        let folder_row_id = self.folder_row_id(&folder_config)?;
        warn_store_err(
            "create_file:insert_row",
            self.store
                .create_file(NewFile {
                    uuid: record.id.clone(),
                    folder_row_id,
                    name: record.name.clone(),
                    created_utc: record.created_utc,
                    modified_utc: record.modified_utc,
                    metadata: record.metadata.clone(),
                })
                .map(|_| ()),
        );
        Ok(record.id)
    }

    fn delete_file(&mut self, file_path: &str) -> Result<()> {
        let file_path = clean_path(file_path);
        let (folder_path, name) = split_path(&file_path);
        let mut folder_config = self.get_folder_config(&folder_path)?;
        let record = folder_config
            .find_file(&name)
            .cloned()
            .ok_or_else(|| VxError::NotFound(format!("file not found: {file_path}")))?;

        folder_config.files.retain(|f| f.name != name);
        folder_config.touch();
        self.save_folder(&folder_path, &folder_config)?;

        let content_path = self.content_dir(&folder_path).join(&name);
        if content_path.exists() {
            fs::remove_file(&content_path)?;
        }

        warn_store_err("delete_file:delete_row", self.store.delete_file(&record.id));
        Ok(())
    }

    fn rename_file(&mut self, file_path: &str, new_name: &str) -> Result<()> {
        let file_path = clean_path(file_path);
        let (folder_path, old_name) = split_path(&file_path);
        let mut folder_config = self.get_folder_config(&folder_path)?;
        if old_name != new_name
            && (folder_config.find_file(new_name).is_some() || self.content_dir(&folder_path).join(new_name).exists())
        {
            return Err(VxError::AlreadyExists(format!("file already exists: {}", join(&folder_path, new_name))));
        }

        fs::rename(
            self.content_dir(&folder_path).join(&old_name),
            self.content_dir(&folder_path).join(new_name),
        )?;

        let record = folder_config
            .find_file_mut(&old_name)
            .ok_or_else(|| VxError::NotFound(format!("file not found: {file_path}")))?;
        record.name = new_name.to_string();
        record.touch();
        let record = record.clone();
        folder_config.touch();
        self.save_folder(&folder_path, &folder_config)?;

        warn_store_err(
            "rename_file:update_row",
            self.store.update_file(&record.id, &record.name, record.modified_utc, &record.metadata),
        );
        Ok(())
    }

    fn move_file(&mut self, src_file_path: &str, dest_folder_path: &str) -> Result<()> {
        let src_file_path = clean_path(src_file_path);
        let dest_folder_path = clean_path(dest_folder_path);
        let (src_folder_path, name) = split_path(&src_file_path);

        let mut src_folder_config = self.get_folder_config(&src_folder_path)?;
        let mut dest_folder_config = self.get_folder_config(&dest_folder_path)?;
        if dest_folder_config.find_file(&name).is_some() || self.content_dir(&dest_folder_path).join(&name).exists() {
            return Err(VxError::AlreadyExists(format!("file already exists: {}", join(&dest_folder_path, &name))));
        }

        fs::rename(
            self.content_dir(&src_folder_path).join(&name),
            self.content_dir(&dest_folder_path).join(&name),
        )?;

        let mut record = src_folder_config
            .find_file(&name)
            .cloned()
            .ok_or_else(|| VxError::NotFound(format!("file not found: {src_file_path}")))?;
        src_folder_config.files.retain(|f| f.name != name);
        src_folder_config.touch();
        self.save_folder(&src_folder_path, &src_folder_config)?;

        record.modified_utc = now_millis().max(record.modified_utc);
        dest_folder_config.files.push(record.clone());
        dest_folder_config.touch();
        self.save_folder(&dest_folder_path, &dest_folder_config)?;

        warn_store_err("move_file:move_row", self.store.move_file(&record.id, &dest_folder_config.id));
        Ok(())
    }

    fn copy_file(&mut self, src_file_path: &str, dest_folder_path: &str, new_name: Option<&str>) -> Result<String> {
        let src_file_path = clean_path(src_file_path);
        let dest_folder_path = clean_path(dest_folder_path);
        let (src_folder_path, src_name) = split_path(&src_file_path);
        let name = new_name.unwrap_or(&src_name).to_string();

        let src_folder_config = self.get_folder_config(&src_folder_path)?;
        let record = src_folder_config
            .find_file(&src_name)
            .cloned()
            .ok_or_else(|| VxError::NotFound(format!("file not found: {src_file_path}")))?;

        let mut dest_folder_config = self.get_folder_config(&dest_folder_path)?;
        if dest_folder_config.find_file(&name).is_some() || self.content_dir(&dest_folder_path).join(&name).exists() {
            return Err(VxError::AlreadyExists(format!("file already exists: {}", join(&dest_folder_path, &name))));
        }

        fs::copy(
            self.content_dir(&src_folder_path).join(&src_name),
            self.content_dir(&dest_folder_path).join(&name),
        )?;

        let now = now_millis();
        let mut new_record = record;
        new_record.id = generate_uuid();
        new_record.name = name;
        new_record.created_utc = now;
        new_record.modified_utc = now;

        dest_folder_config.files.push(new_record.clone());
        dest_folder_config.touch();
        self.save_folder(&dest_folder_path, &dest_folder_config)?;

        let dest_folder_row_id = self.folder_row_id(&dest_folder_config)?;
        warn_store_err(
            "copy_file:insert_row",
            self.store
                .create_file(NewFile {
                    uuid: new_record.id.clone(),
                    folder_row_id: dest_folder_row_id,
                    name: new_record.name.clone(),
                    created_utc: new_record.created_utc,
                    modified_utc: new_record.modified_utc,
                    metadata: new_record.metadata.clone(),
                })
                .map(|_| ()),
        );
        if !new_record.tags.is_empty() {
            warn_store_err("copy_file:set_tags", self.store.set_file_tags(&new_record.id, &new_record.tags));
        }
        Ok(new_record.id)
    }

    fn import_file(&mut self, external_path: &Path, dest_folder_path: &str, new_name: Option<&str>) -> Result<String> {
        if !external_path.is_file() {
            return Err(VxError::NotFound(format!("external file not found: {}", external_path.display())));
        }
        let dest_folder_path = clean_path(dest_folder_path);
        let mut folder_config = self.get_folder_config(&dest_folder_path)?;
        let desired = new_name
            .map(|s| s.to_string())
            .or_else(|| external_path.file_name().map(|n| n.to_string_lossy().to_string()))
            .ok_or_else(|| VxError::InvalidParam("cannot determine a file name to import under".to_string()))?;
        let name = unique_file_name(&folder_config, &self.content_dir(&dest_folder_path), &desired);

        fs::create_dir_all(self.content_dir(&dest_folder_path))?;
        fs::copy(external_path, self.content_dir(&dest_folder_path).join(&name))?;

        let record = FileRecord::new(&name);
        folder_config.files.push(record.clone());
        folder_config.touch();
        self.save_folder(&dest_folder_path, &folder_config)?;

        let folder_row_id = self.folder_row_id(&folder_config)?;
        warn_store_err(
            "import_file:insert_row",
            self.store
                .create_file(NewFile {
                    uuid: record.id.clone(),
                    folder_row_id,
                    name: record.name.clone(),
                    created_utc: record.created_utc,
                    modified_utc: record.modified_utc,
                    metadata: record.metadata.clone(),
                })
                .map(|_| ()),
        );
        Ok(record.id)
    }

    fn import_folder(&mut self, external_path: &Path, dest_parent_path: &str, new_name: Option<&str>) -> Result<String> {
        if !external_path.is_dir() {
            return Err(VxError::NotFound(format!("external folder not found: {}", external_path.display())));
        }
        let dest_parent_path = clean_path(dest_parent_path);
        let name = new_name
            .map(|s| s.to_string())
            .or_else(|| external_path.file_name().map(|n| n.to_string_lossy().to_string()))
            .ok_or_else(|| VxError::InvalidParam("cannot determine a folder name to import under".to_string()))?;

        let mut dest_parent_config = self.get_folder_config(&dest_parent_path)?;
        let new_path = join(&dest_parent_path, &name);
        if dest_parent_config.has_subfolder(&name) || self.content_dir(&new_path).exists() {
            return Err(VxError::AlreadyExists(format!("folder already exists: {new_path}")));
        }

        let parent_row_id = self.folder_row_id(&dest_parent_config)?;
        let new_id = self.import_dir_recursive(external_path, &new_path, &name, Some(parent_row_id))?;

        dest_parent_config.folders.push(name);
        dest_parent_config.touch();
        self.save_folder(&dest_parent_path, &dest_parent_config)?;
        warn_store_err(
            "import_folder:update_parent",
            self.store.update_folder(
                &dest_parent_config.id,
                &dest_parent_config.name,
                dest_parent_config.modified_utc,
                &dest_parent_config.metadata,
            ),
        );
        Ok(new_id)
    }

    fn update_file_metadata(&mut self, file_path: &str, metadata: Value) -> Result<()> {
        if !metadata.is_object() {
            return Err(VxError::InvalidParam("file metadata must be a JSON object".to_string()));
        }
        let file_path = clean_path(file_path);
        let (folder_path, name) = split_path(&file_path);
        let mut folder_config = self.get_folder_config(&folder_path)?;
        let record = folder_config
            .find_file_mut(&name)
            .ok_or_else(|| VxError::NotFound(format!("file not found: {file_path}")))?;
        record.metadata = metadata;
        record.touch();
        let record = record.clone();
        folder_config.touch();
        self.save_folder(&folder_path, &folder_config)?;

        warn_store_err(
            "update_file_metadata:update_row",
            self.store.update_file(&record.id, &record.name, record.modified_utc, &record.metadata),
        );
        Ok(())
    }

    fn update_file_tags(&mut self, file_path: &str, tags: &[String], valid_tags: &[String]) -> Result<()> {
        if let Some(bad) = tags.iter().find(|t| !valid_tags.iter().any(|v| v == *t)) {
            return Err(VxError::InvalidParam(format!("unknown tag: {bad}")));
        }
        let file_path = clean_path(file_path);
        let (folder_path, name) = split_path(&file_path);
        let mut folder_config = self.get_folder_config(&folder_path)?;
        let record = folder_config
            .find_file_mut(&name)
            .ok_or_else(|| VxError::NotFound(format!("file not found: {file_path}")))?;
        record.tags = tags.to_vec();
        record.touch();
        let record = record.clone();
        folder_config.touch();
        self.save_folder(&folder_path, &folder_config)?;

        warn_store_err("update_file_tags:set_tags", self.store.set_file_tags(&record.id, &record.tags));
        Ok(())
    }

    fn add_tag_to_file(&mut self, file_path: &str, tag: &str, valid_tags: &[String]) -> Result<()> {
        if !valid_tags.iter().any(|v| v == tag) {
            return Err(VxError::InvalidParam(format!("unknown tag: {tag}")));
        }
        let file_path = clean_path(file_path);
        let (folder_path, name) = split_path(&file_path);
        let mut folder_config = self.get_folder_config(&folder_path)?;
        let record = folder_config
            .find_file_mut(&name)
            .ok_or_else(|| VxError::NotFound(format!("file not found: {file_path}")))?;
        if !record.tags.iter().any(|t| t == tag) {
            record.tags.push(tag.to_string());
        }
        record.touch();
        let record = record.clone();
        folder_config.touch();
        self.save_folder(&folder_path, &folder_config)?;

        warn_store_err("add_tag_to_file:add_tag", self.store.add_file_tag(&record.id, tag));
        Ok(())
    }

    fn remove_tag_from_file(&mut self, file_path: &str, tag: &str) -> Result<()> {
        let file_path = clean_path(file_path);
        let (folder_path, name) = split_path(&file_path);
        let mut folder_config = self.get_folder_config(&folder_path)?;
        let record = folder_config
            .find_file_mut(&name)
            .ok_or_else(|| VxError::NotFound(format!("file not found: {file_path}")))?;
        record.tags.retain(|t| t != tag);
        record.touch();
        let record = record.clone();
        folder_config.touch();
        self.save_folder(&folder_path, &folder_config)?;

        warn_store_err("remove_tag_from_file:remove_tag", self.store.remove_file_tag(&record.id, tag));
        Ok(())
    }

    fn get_file_info(&mut self, file_path: &str) -> Result<FileRecord> {
        let file_path = clean_path(file_path);
        let (folder_path, name) = split_path(&file_path);
        let folder_config = self.get_folder_config(&folder_path)?;
        folder_config
            .find_file(&name)
            .cloned()
            .ok_or_else(|| VxError::NotFound(format!("file not found: {file_path}")))
    }

    fn get_file_metadata(&mut self, file_path: &str) -> Result<Value> {
        Ok(self.get_file_info(file_path)?.metadata)
    }

    fn get_folder_metadata(&mut self, folder_path: &str) -> Result<Value> {
        Ok(self.get_folder_config(folder_path)?.metadata)
    }

    fn update_folder_metadata(&mut self, folder_path: &str, metadata: Value) -> Result<()> {
        if !metadata.is_object() {
            return Err(VxError::InvalidParam("folder metadata must be a JSON object".to_string()));
        }
        let folder_path = clean_path(folder_path);
        let mut folder_config = self.get_folder_config(&folder_path)?;
        folder_config.metadata = metadata;
        folder_config.touch();
        self.save_folder(&folder_path, &folder_config)?;

        warn_store_err(
            "update_folder_metadata:update_row",
            self.store
                .update_folder(&folder_config.id, &folder_config.name, folder_config.modified_utc, &folder_config.metadata),
        );
        Ok(())
    }

    fn list_folder_children(&mut self, folder_path: &str, include_folder_info: bool) -> Result<FolderChildren> {
        let folder_path = clean_path(folder_path);
        let config = self.get_folder_config(&folder_path)?;
        let mut folders = Vec::new();
        for name in &config.folders {
            let info = if include_folder_info {
                Some(self.get_folder_config(&join(&folder_path, name))?)
            } else {
                None
            };
            folders.push(FolderChildEntry { name: name.clone(), info });
        }
        Ok(FolderChildren {
            files: config.files,
            folders,
        })
    }

    fn iterate_all_files(&mut self, cb: &mut dyn FnMut(&str, &FileRecord) -> bool) -> Result<()> {
        fn walk(manager: &mut BundledFolderManager, path: &str, cb: &mut dyn FnMut(&str, &FileRecord) -> bool) -> Result<bool> {
            let config = manager.get_folder_config(path)?;
            for file in &config.files {
                let full_path = join(path, &file.name);
                if !cb(&full_path, file) {
                    return Ok(false);
                }
            }
            let mut subfolders = config.folders.clone();
            subfolders.sort();
            for name in subfolders {
                if !walk(manager, &join(path, &name), cb)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        walk(self, ".", cb)?;
        Ok(())
    }

    fn sync_metadata_store_from_configs(&mut self) -> Result<()> {
        self.cache.clear();
        self.store.rebuild_all()?;
        self.sync_subtree(".", None);
        Ok(())
    }

    fn invalidate(&mut self, path: &str) {
        let path = clean_path(path);
        self.invalidate_subtree(&path);
    }

    fn store(&self) -> &dyn MetadataStore {
        self.store.as_ref()
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn close(&mut self) -> Result<()> {
        self.cache.clear();
        self.store.close()
    }
}

/// The degenerate raw-notebook folder manager (§9): every mutation is
/// `Unsupported`. Only notebook-level config is supported for raw
/// notebooks, handled one layer up in [`crate::notebook`].
pub struct RawFolderManager {
    root: PathBuf,
    store: Box<dyn MetadataStore>,
}

impl RawFolderManager {
    pub fn new(root: PathBuf, store: Box<dyn MetadataStore>) -> Self {
        Self { root, store }
    }
}

fn unsupported(op: &str) -> VxError {
    VxError::Unsupported(format!("{op} is not supported for raw notebooks"))
}

impl FolderManager for RawFolderManager {
    fn get_folder_config(&mut self, _path: &str) -> Result<FolderConfig> {
        Err(unsupported("get_folder_config"))
    }
    fn create_folder(&mut self, _parent_path: &str, _name: &str) -> Result<String> {
        Err(unsupported("create_folder"))
    }
    fn delete_folder(&mut self, _path: &str) -> Result<()> {
        Err(unsupported("delete_folder"))
    }
    fn rename_folder(&mut self, _path: &str, _new_name: &str) -> Result<()> {
        Err(unsupported("rename_folder"))
    }
    fn move_folder(&mut self, _src_path: &str, _dest_parent_path: &str) -> Result<()> {
        Err(unsupported("move_folder"))
    }
    fn copy_folder(&mut self, _src_path: &str, _dest_parent_path: &str, _new_name: Option<&str>) -> Result<String> {
        Err(unsupported("copy_folder"))
    }
    fn create_file(&mut self, _folder_path: &str, _file_name: &str) -> Result<String> {
        Err(unsupported("create_file"))
    }
    fn delete_file(&mut self, _file_path: &str) -> Result<()> {
        Err(unsupported("delete_file"))
    }
    fn rename_file(&mut self, _file_path: &str, _new_name: &str) -> Result<()> {
        Err(unsupported("rename_file"))
    }
    fn move_file(&mut self, _src_file_path: &str, _dest_folder_path: &str) -> Result<()> {
        Err(unsupported("move_file"))
    }
    fn copy_file(&mut self, _src_file_path: &str, _dest_folder_path: &str, _new_name: Option<&str>) -> Result<String> {
        Err(unsupported("copy_file"))
    }
    fn import_file(&mut self, _external_path: &Path, _dest_folder_path: &str, _new_name: Option<&str>) -> Result<String> {
        Err(unsupported("import_file"))
    }
    fn import_folder(&mut self, _external_path: &Path, _dest_parent_path: &str, _new_name: Option<&str>) -> Result<String> {
        Err(unsupported("import_folder"))
    }
    fn update_file_metadata(&mut self, _file_path: &str, _metadata: Value) -> Result<()> {
        Err(unsupported("update_file_metadata"))
    }
    fn update_file_tags(&mut self, _file_path: &str, _tags: &[String], _valid_tags: &[String]) -> Result<()> {
        Err(unsupported("update_file_tags"))
    }
    fn add_tag_to_file(&mut self, _file_path: &str, _tag: &str, _valid_tags: &[String]) -> Result<()> {
        Err(unsupported("add_tag_to_file"))
    }
    fn remove_tag_from_file(&mut self, _file_path: &str, _tag: &str) -> Result<()> {
        Err(unsupported("remove_tag_from_file"))
    }
    fn get_file_info(&mut self, _file_path: &str) -> Result<FileRecord> {
        Err(unsupported("get_file_info"))
    }
    fn get_file_metadata(&mut self, _file_path: &str) -> Result<Value> {
        Err(unsupported("get_file_metadata"))
    }
    fn get_folder_metadata(&mut self, _folder_path: &str) -> Result<Value> {
        Err(unsupported("get_folder_metadata"))
    }
    fn update_folder_metadata(&mut self, _folder_path: &str, _metadata: Value) -> Result<()> {
        Err(unsupported("update_folder_metadata"))
    }
    fn list_folder_children(&mut self, _folder_path: &str, _include_folder_info: bool) -> Result<FolderChildren> {
        Err(unsupported("list_folder_children"))
    }
    fn iterate_all_files(&mut self, _cb: &mut dyn FnMut(&str, &FileRecord) -> bool) -> Result<()> {
        Err(unsupported("iterate_all_files"))
    }
    fn sync_metadata_store_from_configs(&mut self) -> Result<()> {
        Err(unsupported("sync_metadata_store_from_configs"))
    }
    fn invalidate(&mut self, _path: &str) {}

    fn store(&self) -> &dyn MetadataStore {
        self.store.as_ref()
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn close(&mut self) -> Result<()> {
        self.store.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::SqliteStore;
    use tempfile::tempdir;

    fn manager() -> (tempfile::TempDir, BundledFolderManager) {
        let dir = tempdir().unwrap();
        let store = Box::new(SqliteStore::open_in_memory().unwrap());
        let manager = BundledFolderManager::init_new(dir.path().to_path_buf(), store).unwrap();
        (dir, manager)
    }

    #[test]
    fn test_init_new_creates_root_config_and_row() {
        let (_dir, mut manager) = manager();
        let root = manager.get_folder_config(".").unwrap();
        assert!(manager.store().get_folder(&root.id).unwrap().is_some());
    }

    #[test]
    fn test_create_folder_then_get_folder_config() {
        let (_dir, mut manager) = manager();
        let id = manager.create_folder(".", "docs").unwrap();
        let docs = manager.get_folder_config("docs").unwrap();
        assert_eq!(docs.id, id);
        assert_eq!(docs.name, "docs");

        let root = manager.get_folder_config(".").unwrap();
        assert!(root.has_subfolder("docs"));
    }

    #[test]
    fn test_create_folder_rejects_duplicate() {
        let (_dir, mut manager) = manager();
        manager.create_folder(".", "docs").unwrap();
        let err = manager.create_folder(".", "docs").unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::AlreadyExists);
    }

    #[test]
    fn test_create_and_delete_file_round_trip() {
        let (_dir, mut manager) = manager();
        manager.create_folder(".", "docs").unwrap();
        let file_id = manager.create_file("docs", "readme.md").unwrap();

        let info = manager.get_file_info("docs/readme.md").unwrap();
        assert_eq!(info.id, file_id);

        manager.delete_file("docs/readme.md").unwrap();
        assert!(manager.get_file_info("docs/readme.md").is_err());
        assert!(!manager.content_dir("docs").join("readme.md").exists());
    }

    #[test]
    fn test_rename_file_updates_record_and_disk() {
        let (_dir, mut manager) = manager();
        manager.create_file(".", "a.md").unwrap();
        manager.rename_file("a.md", "b.md").unwrap();

        assert!(manager.get_file_info("b.md").is_ok());
        assert!(manager.get_file_info("a.md").is_err());
        assert!(manager.content_dir(".").join("b.md").exists());
    }

    #[test]
    fn test_move_folder_preserves_id_and_updates_path() {
        let (_dir, mut manager) = manager();
        manager.create_folder(".", "a").unwrap();
        manager.create_folder("a", "b").unwrap();
        manager.create_folder("a/b", "c").unwrap();
        manager.create_folder(".", "x").unwrap();

        let b_before = manager.get_folder_config("a/b").unwrap();
        manager.move_folder("a/b", "x").unwrap();

        let b_after = manager.get_folder_config("x/b").unwrap();
        assert_eq!(b_after.id, b_before.id);
        assert!(manager.get_folder_config("a/b").is_err());
        assert!(manager.get_folder_config("x/b/c").is_ok());
    }

    #[test]
    fn test_move_folder_rejects_moving_into_own_descendant() {
        let (_dir, mut manager) = manager();
        manager.create_folder(".", "a").unwrap();
        manager.create_folder("a", "b").unwrap();

        let err = manager.move_folder("a", "a/b").unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidParam);
    }

    #[test]
    fn test_copy_folder_regenerates_ids_for_descendants() {
        let (_dir, mut manager) = manager();
        manager.create_folder(".", "docs").unwrap();
        let original_file_id = manager.create_file("docs", "a.md").unwrap();

        let new_id = manager.copy_folder("docs", ".", Some("docs_copy")).unwrap();
        let copy = manager.get_folder_config("docs_copy").unwrap();
        assert_eq!(copy.id, new_id);
        assert_ne!(copy.id, manager.get_folder_config("docs").unwrap().id);
        assert_ne!(copy.files[0].id, original_file_id);
        assert_eq!(copy.files[0].name, "a.md");
    }

    #[test]
    fn test_create_delete_folder_round_trip_restores_parent_listing() {
        let (_dir, mut manager) = manager();
        manager.create_folder(".", "tmp").unwrap();
        manager.delete_folder("tmp").unwrap();

        let root = manager.get_folder_config(".").unwrap();
        assert!(!root.has_subfolder("tmp"));
        assert!(manager.get_folder_config("tmp").is_err());
    }

    #[test]
    fn test_update_file_tags_rejects_unknown_tag() {
        let (_dir, mut manager) = manager();
        manager.create_file(".", "a.md").unwrap();
        let err = manager
            .update_file_tags("a.md", &["ghost".to_string()], &["work".to_string()])
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidParam);
    }

    #[test]
    fn test_list_folder_children_with_and_without_info() {
        let (_dir, mut manager) = manager();
        manager.create_folder(".", "docs").unwrap();
        manager.create_file(".", "a.md").unwrap();

        let shallow = manager.list_folder_children(".", false).unwrap();
        assert_eq!(shallow.files.len(), 1);
        assert_eq!(shallow.folders.len(), 1);
        assert!(shallow.folders[0].info.is_none());

        let deep = manager.list_folder_children(".", true).unwrap();
        assert!(deep.folders[0].info.is_some());
    }

    #[test]
    fn test_iterate_all_files_depth_first() {
        let (_dir, mut manager) = manager();
        manager.create_folder(".", "docs").unwrap();
        manager.create_file(".", "z.md").unwrap();
        manager.create_file("docs", "a.md").unwrap();

        let mut seen = Vec::new();
        manager
            .iterate_all_files(&mut |path, _rec| {
                seen.push(path.to_string());
                true
            })
            .unwrap();
        assert_eq!(seen, vec!["z.md".to_string(), "docs/a.md".to_string()]);
    }

    #[test]
    fn test_sync_metadata_store_from_configs_is_idempotent() {
        let (_dir, mut manager) = manager();
        manager.create_folder(".", "docs").unwrap();
        manager.create_file("docs", "a.md").unwrap();

        manager.sync_metadata_store_from_configs().unwrap();
        let first = manager.store().count_files_by_tag().unwrap();
        manager.sync_metadata_store_from_configs().unwrap();
        let second = manager.store().count_files_by_tag().unwrap();
        assert_eq!(first, second);

        let docs = manager.get_folder_config("docs").unwrap();
        assert!(manager.store().get_folder(&docs.id).unwrap().is_some());
    }

    #[test]
    fn test_delete_root_folder_is_unsupported() {
        let (_dir, mut manager) = manager();
        let err = manager.delete_folder(".").unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Unsupported);
    }

    #[test]
    fn test_create_folder_path_is_idempotent_for_existing_prefix() {
        let (_dir, mut manager) = manager();
        let c_id = manager.create_folder_path("a/b/c").unwrap();
        let a_id_before = manager.get_folder_config("a").unwrap().id;
        let b_id_before = manager.get_folder_config("a/b").unwrap().id;

        let d_id = manager.create_folder_path("a/b/c/d").unwrap();
        assert_ne!(d_id, c_id);
        assert_eq!(manager.get_folder_config("a").unwrap().id, a_id_before);
        assert_eq!(manager.get_folder_config("a/b").unwrap().id, b_id_before);
        assert_eq!(manager.get_folder_config("a/b/c").unwrap().id, c_id);
    }

    #[test]
    fn test_import_file_copies_bytes_and_auto_renames_on_collision() {
        let (_dir, mut manager) = manager();
        let external = tempdir().unwrap();
        let src = external.path().join("notes.md");
        fs::write(&src, b"hello").unwrap();

        let first_id = manager.import_file(&src, ".", None).unwrap();
        assert_eq!(manager.get_file_info("notes.md").unwrap().id, first_id);

        let second_id = manager.import_file(&src, ".", None).unwrap();
        assert_ne!(first_id, second_id);
        assert!(manager.get_file_info("notes (1).md").is_ok());
        assert_eq!(fs::read(manager.content_dir(".").join("notes (1).md")).unwrap(), b"hello");
    }

    #[test]
    fn test_import_folder_regenerates_ids_for_every_descendant() {
        let (_dir, mut manager) = manager();
        let external = tempdir().unwrap();
        fs::create_dir_all(external.path().join("sub")).unwrap();
        fs::write(external.path().join("a.md"), b"a").unwrap();
        fs::write(external.path().join("sub").join("b.md"), b"b").unwrap();

        let new_id = manager.import_folder(external.path(), ".", Some("imported")).unwrap();
        let config = manager.get_folder_config("imported").unwrap();
        assert_eq!(config.id, new_id);
        assert_eq!(config.files[0].name, "a.md");
        assert!(config.has_subfolder("sub"));

        let sub = manager.get_folder_config("imported/sub").unwrap();
        assert_eq!(sub.files[0].name, "b.md");
        assert!(manager.store().get_folder(&sub.id).unwrap().is_some());
    }

    #[test]
    fn test_raw_folder_manager_rejects_mutation() {
        let dir = tempdir().unwrap();
        let store = Box::new(SqliteStore::open_in_memory().unwrap());
        let mut manager = RawFolderManager::new(dir.path().to_path_buf(), store);
        let err = manager.create_folder(".", "docs").unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::Unsupported);
    }
}
