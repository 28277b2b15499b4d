//! # Tag hierarchy (C6)
//!
//! Tags live in two places kept consistent by this module: the ground-truth
//! list in [`crate::model::NotebookConfig`] (§3) and a mirrored set of rows
//! in the metadata store, which file `tags[]` arrays reference by name when
//! the store records a file-tag edge (§4.3). The store never invents a tag
//! row on its own — [`crate::store::sqlite::SqliteStore::set_file_tags`] and
//! `add_file_tag` both fail with `NotFound` against an unknown tag name — so
//! every operation here that changes a tag's name mirrors the new row(s)
//! into the store *before* touching any file's tag array, never after.

use crate::error::{Result, VxError};
use crate::notebook::Notebook;

/// A tag as returned by [`list_tags`] (§6.3): its fully-qualified name and
/// its parent's name (empty for a root tag).
#[derive(Debug, Clone, PartialEq)]
pub struct TagInfo {
    pub name: String,
    pub parent: String,
}

/// Validates one `/`-separated segment of a tag name: must start with an
/// ASCII letter, continue with alphanumerics/underscore/hyphen, and must
/// not contain consecutive or trailing hyphens (§4.6).
fn validate_tag_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(VxError::InvalidParam("tag name segments must not be empty".to_string()));
    }
    let mut chars = segment.chars();
    let first = chars.next().unwrap();
    if !first.is_ascii_alphabetic() {
        return Err(VxError::InvalidParam(format!(
            "tag segment '{segment}' must start with an ASCII letter"
        )));
    }
    let mut prev_hyphen = false;
    for c in chars {
        if c.is_ascii_alphanumeric() || c == '_' {
            prev_hyphen = false;
        } else if c == '-' {
            if prev_hyphen {
                return Err(VxError::InvalidParam(format!(
                    "tag segment '{segment}' must not contain consecutive hyphens"
                )));
            }
            prev_hyphen = true;
        } else {
            return Err(VxError::InvalidParam(format!(
                "tag segment '{segment}' contains an invalid character '{c}'"
            )));
        }
    }
    if segment.ends_with('-') {
        return Err(VxError::InvalidParam(format!(
            "tag segment '{segment}' must not end with a hyphen"
        )));
    }
    Ok(())
}

/// Validates every segment of a hierarchical, `/`-separated tag name.
pub fn validate_tag_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VxError::InvalidParam("tag name must not be empty".to_string()));
    }
    for segment in name.split('/') {
        validate_tag_segment(segment)?;
    }
    Ok(())
}

impl Notebook {
    /// Mirrors every tag into the metadata store in parent-before-child
    /// order, so each row's `parent_name` lookup always finds an
    /// already-inserted ancestor (§4.6). Failures are logged and swallowed
    /// per the store's write-through policy (§4.4.5) — disk (`self.config`)
    /// remains ground truth regardless.
    fn mirror_all_tags_to_store(&self) {
        let mut tags = self.config.tags.clone();
        tags.sort_by_key(|t| t.name.matches('/').count());
        for tag in &tags {
            let parent = tag.parent_name();
            let parent_opt = if parent.is_empty() { None } else { Some(parent) };
            if let Err(e) = self.folder_manager.store().create_or_update_tag(&tag.name, parent_opt, &tag.metadata) {
                tracing::warn!(tag = %tag.name, error = %e, "metadata store tag mirror failed; disk remains ground truth");
            }
        }
    }

    /// Re-mirrors the full tag list into the store if it has drifted out of
    /// sync with `config.tags` since the store was last touched, tracked by
    /// a `tags_modified_utc` marker in the store's key/value table (§4.6,
    /// §10.5 lazy sync). Called once when a notebook is opened.
    pub(crate) fn sync_tags_if_needed(&mut self) -> Result<()> {
        let marker = "tags_modified_utc";
        let current = self.config.tags_modified_utc.to_string();
        let stored = self.folder_manager.store().kv_get(marker)?;
        if stored.as_deref() == Some(current.as_str()) {
            return Ok(());
        }
        self.mirror_all_tags_to_store();
        if let Err(e) = self.folder_manager.store().kv_set(marker, &current) {
            tracing::warn!(error = %e, "metadata store tag-sync marker write failed");
        }
        Ok(())
    }

    /// All tag names currently defined (§4.4.3's `valid_tags` parameter).
    pub fn valid_tag_names(&self) -> Vec<String> {
        self.config.tags.iter().map(|t| t.name.clone()).collect()
    }

    pub fn list_tags(&self) -> Vec<TagInfo> {
        self.config
            .tags
            .iter()
            .map(|t| TagInfo {
                name: t.name.clone(),
                parent: t.parent_name().to_string(),
            })
            .collect()
    }

    /// Creates a single tag. Its parent, if the name is hierarchical, must
    /// already exist (§4.6) — use [`Notebook::create_tag_path`] to create a
    /// whole chain at once.
    pub fn create_tag(&mut self, name: &str) -> Result<()> {
        validate_tag_name(name)?;
        if self.config.find_tag(name).is_some() {
            return Err(VxError::AlreadyExists(format!("tag already exists: {name}")));
        }
        let parent = crate::model::TagDef::new(name).parent_name().to_string();
        if !parent.is_empty() && self.config.find_tag(&parent).is_none() {
            return Err(VxError::NotFound(format!("parent tag does not exist: {parent}")));
        }

        self.config.tags.push(crate::model::TagDef::new(name));
        self.config.touch_tags();
        self.save_config()?;

        let parent_opt = if parent.is_empty() { None } else { Some(parent.as_str()) };
        if let Err(e) = self
            .folder_manager
            .store()
            .create_or_update_tag(name, parent_opt, &serde_json::Value::Object(Default::default()))
        {
            tracing::warn!(tag = %name, error = %e, "metadata store tag mirror failed; disk remains ground truth");
        }
        Ok(())
    }

    /// Creates every ancestor of `name` that doesn't already exist, then
    /// `name` itself, e.g. `work/urgent/today` creates up to three tags.
    pub fn create_tag_path(&mut self, name: &str) -> Result<()> {
        validate_tag_name(name)?;
        let segments: Vec<&str> = name.split('/').collect();
        let mut prefix = String::new();
        for segment in segments {
            prefix = if prefix.is_empty() {
                segment.to_string()
            } else {
                format!("{prefix}/{segment}")
            };
            if self.config.find_tag(&prefix).is_none() {
                self.create_tag(&prefix)?;
            }
        }
        Ok(())
    }

    /// Deletes `name` and every descendant tag (prefix match on
    /// `name/`), cascading the removal through every file's `tags[]` array
    /// as well as the store's tag rows (P5). File tag arrays are rewritten
    /// before the tag rows are dropped from the store, so no file is left
    /// referencing a tag the store no longer knows.
    pub fn delete_tag(&mut self, name: &str) -> Result<()> {
        if self.config.find_tag(name).is_none() {
            return Err(VxError::NotFound(format!("tag not found: {name}")));
        }
        let prefix = format!("{name}/");
        let removed: Vec<String> = self
            .config
            .tags
            .iter()
            .filter(|t| t.name == name || t.name.starts_with(&prefix))
            .map(|t| t.name.clone())
            .collect();

        self.config.tags.retain(|t| !removed.contains(&t.name));
        self.config.touch_tags();
        self.save_config()?;

        let remaining_valid = self.valid_tag_names();
        let mut affected_files = Vec::new();
        self.folder_manager.iterate_all_files(&mut |path, file| {
            if file.tags.iter().any(|t| removed.contains(t)) {
                affected_files.push(path.to_string());
            }
            true
        })?;
        for path in affected_files {
            let file = self.folder_manager.get_file_info(&path)?;
            let new_tags: Vec<String> = file.tags.into_iter().filter(|t| !removed.contains(t)).collect();
            self.folder_manager.update_file_tags(&path, &new_tags, &remaining_valid)?;
        }

        for name in &removed {
            if let Err(e) = self.folder_manager.store().delete_tag(name) {
                tracing::warn!(tag = %name, error = %e, "metadata store tag delete failed; disk remains ground truth");
            }
        }
        Ok(())
    }

    /// Reparents tag `name` (and its whole subtree) under `new_parent`
    /// (empty string for the root). Rejects moving a tag under itself or
    /// one of its own descendants (cycle prevention, same prefix check as
    /// folder moves) and rejects a name collision at the destination.
    ///
    /// Order of operations matters: the new tag names are written to
    /// `config.tags` and mirrored into the store *before* any file's tag
    /// array is rewritten, because the store refuses to attach a tag to a
    /// file unless that tag's row already exists.
    pub fn move_tag(&mut self, name: &str, new_parent: &str) -> Result<()> {
        if self.config.find_tag(name).is_none() {
            return Err(VxError::NotFound(format!("tag not found: {name}")));
        }
        if !new_parent.is_empty() && self.config.find_tag(new_parent).is_none() {
            return Err(VxError::NotFound(format!("parent tag does not exist: {new_parent}")));
        }
        if new_parent == name || new_parent.starts_with(&format!("{name}/")) {
            return Err(VxError::InvalidParam(format!(
                "cannot move tag '{name}' under itself or one of its descendants"
            )));
        }

        let leaf = name.rsplit('/').next().unwrap_or(name);
        let new_name = if new_parent.is_empty() {
            leaf.to_string()
        } else {
            format!("{new_parent}/{leaf}")
        };
        if new_name != name && self.config.find_tag(&new_name).is_some() {
            return Err(VxError::AlreadyExists(format!("tag already exists: {new_name}")));
        }

        let prefix = format!("{name}/");
        let renames: Vec<(String, String)> = self
            .config
            .tags
            .iter()
            .filter(|t| t.name == name || t.name.starts_with(&prefix))
            .map(|t| {
                let renamed = if t.name == name {
                    new_name.clone()
                } else {
                    format!("{new_name}{}", &t.name[name.len()..])
                };
                (t.name.clone(), renamed)
            })
            .collect();

        for (old_name, new_name) in &renames {
            if let Some(tag) = self.config.find_tag_mut(old_name) {
                tag.name = new_name.clone();
            }
        }
        self.config.touch_tags();
        self.save_config()?;

        self.mirror_all_tags_to_store();

        let renamed_pairs: std::collections::HashMap<&str, &str> =
            renames.iter().map(|(o, n)| (o.as_str(), n.as_str())).collect();
        let valid = self.valid_tag_names();
        let mut affected_files = Vec::new();
        self.folder_manager.iterate_all_files(&mut |path, file| {
            if file.tags.iter().any(|t| renamed_pairs.contains_key(t.as_str())) {
                affected_files.push(path.to_string());
            }
            true
        })?;
        for path in affected_files {
            let file = self.folder_manager.get_file_info(&path)?;
            let new_tags: Vec<String> = file
                .tags
                .into_iter()
                .map(|t| renamed_pairs.get(t.as_str()).map(|n| n.to_string()).unwrap_or(t))
                .collect();
            self.folder_manager.update_file_tags(&path, &new_tags, &valid)?;
        }

        for (old_name, _) in &renames {
            if let Err(e) = self.folder_manager.store().delete_tag(old_name) {
                tracing::warn!(tag = %old_name, error = %e, "metadata store stale tag cleanup failed");
            }
        }
        Ok(())
    }

    pub fn tag_file(&mut self, file_path: &str, tag: &str) -> Result<()> {
        let valid = self.valid_tag_names();
        self.folder_manager.add_tag_to_file(file_path, tag, &valid)
    }

    pub fn untag_file(&mut self, file_path: &str, tag: &str) -> Result<()> {
        self.folder_manager.remove_tag_from_file(file_path, tag)
    }

    pub fn update_file_tags(&mut self, file_path: &str, tags: &[String]) -> Result<()> {
        let valid = self.valid_tag_names();
        self.folder_manager.update_file_tags(file_path, tags, &valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DefaultPaths, FileSessionSink, PathsProvider, SessionSink};
    use crate::events::EventBus;
    use crate::model::NotebookKind;
    use crate::notebook::NotebookManager;
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn open_notebook(dir: &std::path::Path) -> (NotebookManager, String) {
        let paths: Arc<dyn PathsProvider> = Arc::new(DefaultPaths::with_root(dir.join("appdata")));
        let session: Arc<dyn SessionSink> = Arc::new(FileSessionSink::new(paths.as_ref()));
        let mut mgr = NotebookManager::new(paths, session, EventBus::new());
        let root = dir.join("nb");
        let id = mgr.create_notebook(&root.to_string_lossy(), NotebookKind::Bundled, Value::Null).unwrap();
        (mgr, id)
    }

    #[test]
    fn test_validate_tag_name_rejects_bad_segments() {
        assert!(validate_tag_name("work").is_ok());
        assert!(validate_tag_name("work/urgent").is_ok());
        assert!(validate_tag_name("1work").is_err());
        assert!(validate_tag_name("work--urgent").is_err());
        assert!(validate_tag_name("work-").is_err());
        assert!(validate_tag_name("work//urgent").is_err());
        assert!(validate_tag_name("").is_err());
    }

    #[test]
    fn test_create_tag_requires_existing_parent() {
        let dir = tempdir().unwrap();
        let (mut mgr, id) = open_notebook(dir.path());
        let nb = mgr.get_notebook_mut(&id).unwrap();

        let err = nb.create_tag("work/urgent").unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::NotFound);

        nb.create_tag("work").unwrap();
        nb.create_tag("work/urgent").unwrap();
        assert_eq!(nb.list_tags().len(), 2);
    }

    #[test]
    fn test_create_tag_path_creates_whole_chain() {
        let dir = tempdir().unwrap();
        let (mut mgr, id) = open_notebook(dir.path());
        let nb = mgr.get_notebook_mut(&id).unwrap();

        nb.create_tag_path("work/urgent/today").unwrap();
        let names: Vec<String> = nb.list_tags().into_iter().map(|t| t.name).collect();
        assert!(names.contains(&"work".to_string()));
        assert!(names.contains(&"work/urgent".to_string()));
        assert!(names.contains(&"work/urgent/today".to_string()));
    }

    #[test]
    fn test_delete_tag_cascades_to_descendants_and_files() {
        let dir = tempdir().unwrap();
        let (mut mgr, id) = open_notebook(dir.path());
        let nb = mgr.get_notebook_mut(&id).unwrap();

        nb.create_tag_path("work/urgent").unwrap();
        nb.folder_manager.create_file(".", "note.md").unwrap();
        nb.tag_file("note.md", "work/urgent").unwrap();

        nb.delete_tag("work").unwrap();
        assert!(nb.list_tags().is_empty());

        let file = nb.folder_manager.get_file_info("note.md").unwrap();
        assert!(file.tags.is_empty());
    }

    #[test]
    fn test_move_tag_rejects_cycle_into_own_descendant() {
        let dir = tempdir().unwrap();
        let (mut mgr, id) = open_notebook(dir.path());
        let nb = mgr.get_notebook_mut(&id).unwrap();

        nb.create_tag_path("work/urgent").unwrap();
        let err = nb.move_tag("work", "work/urgent").unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidParam);
    }

    #[test]
    fn test_move_tag_reparents_and_preserves_file_tags() {
        let dir = tempdir().unwrap();
        let (mut mgr, id) = open_notebook(dir.path());
        let nb = mgr.get_notebook_mut(&id).unwrap();

        nb.create_tag("work").unwrap();
        nb.create_tag("personal").unwrap();
        nb.create_tag("work/urgent").unwrap();
        nb.folder_manager.create_file(".", "note.md").unwrap();
        nb.tag_file("note.md", "work/urgent").unwrap();

        nb.move_tag("work", "personal").unwrap();
        let names: Vec<String> = nb.list_tags().into_iter().map(|t| t.name).collect();
        assert!(names.contains(&"personal/work".to_string()));
        assert!(names.contains(&"personal/work/urgent".to_string()));
        assert!(!names.contains(&"work".to_string()));

        let file = nb.folder_manager.get_file_info("note.md").unwrap();
        assert_eq!(file.tags, vec!["personal/work/urgent".to_string()]);
    }

    #[test]
    fn test_move_tag_rejects_name_collision_at_destination() {
        let dir = tempdir().unwrap();
        let (mut mgr, id) = open_notebook(dir.path());
        let nb = mgr.get_notebook_mut(&id).unwrap();

        nb.create_tag("work").unwrap();
        nb.create_tag("personal").unwrap();
        nb.create_tag("personal/work").unwrap();

        let err = nb.move_tag("work", "personal").unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::AlreadyExists);
    }
}
