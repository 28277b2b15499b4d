//! # Search (C7)
//!
//! Three search modes, all read-only and all walking the on-disk tree
//! through the folder manager rather than querying the metadata store
//! directly — disk remains ground truth, and a search immediately after a
//! fresh `git clone`-style drop-in of files should still see them (§4.4.5
//! lazy sync happens as a side effect of the `get_folder_config` calls this
//! module makes while walking):
//!
//! - [`search_files`]: file-name glob matching, optionally restricted to an
//!   explicit set of input files/folders instead of a scope walk.
//! - [`search_by_tags`]: tag-set matching (AND/OR) over [`crate::store::TagOperator`].
//! - [`search_content`]: line-oriented content search via a pluggable
//!   [`ContentBackend`].
//!
//! All three honor `max_results` by returning at most that many results and
//! setting `truncated` when more existed than were returned.

use std::path::PathBuf;

use crate::error::{Result, VxError};
use crate::notebook::Notebook;
use crate::path::{clean_path, join};
use crate::store::TagOperator;

/// Which timestamp a [`DateFilter`] is applied against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Created,
    Modified,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateFilter {
    pub field: DateField,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

/// The filters shared by all three search modes (§4.7, §6.3 search scope
/// object). Fields not relevant to a given mode (e.g. `tags` in
/// [`search_files`]) are simply left empty/`None`.
#[derive(Debug, Clone, Default)]
pub struct SearchScope {
    pub folder_path: String,
    pub recursive: bool,
    pub file_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub tags: Vec<String>,
    pub tag_operator: TagOperatorDefault,
    pub exclude_tags: Vec<String>,
    pub date_filter: Option<DateFilter>,
}

/// Thin wrapper so [`SearchScope`] can `#[derive(Default)]` with a
/// meaningful default operator (`And`) without `TagOperator` itself
/// implementing `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagOperatorDefault(pub TagOperator);

impl Default for TagOperatorDefault {
    fn default() -> Self {
        TagOperatorDefault(TagOperator::And)
    }
}

/// An explicit set of relative paths to search instead of walking a scope
/// (§6.3 `inputFiles` envelope).
#[derive(Debug, Clone, Default)]
pub struct InputFiles {
    pub files: Vec<String>,
    pub folders: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    File,
    Folder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub node_type: NodeType,
    pub path: String,
    pub id: String,
    pub created_utc: i64,
    pub modified_utc: i64,
    /// `None` for folders; `Some` (possibly empty) for files.
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub total_results: usize,
    pub truncated: bool,
    pub results: Vec<NodeInfo>,
}

/// Matches `*` (any run of characters) and `?` (any single character)
/// against `text`. No other glob syntax (character classes, brace
/// expansion) is supported.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    fn helper(p: &[char], t: &[char]) -> bool {
        match (p.first(), t.first()) {
            (None, None) => true,
            (Some('*'), _) => helper(&p[1..], t) || (!t.is_empty() && helper(p, &t[1..])),
            (Some('?'), Some(_)) => helper(&p[1..], &t[1..]),
            (Some(pc), Some(tc)) if pc == tc => helper(&p[1..], &t[1..]),
            _ => false,
        }
    }
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    helper(&p, &t)
}

struct Candidate {
    path: String,
    id: String,
    created_utc: i64,
    modified_utc: i64,
    tags: Vec<String>,
    is_folder: bool,
}

fn gather_scope_nodes(notebook: &mut Notebook, scope: &SearchScope, include_folders: bool) -> Result<Vec<Candidate>> {
    let folder_path = clean_path(&scope.folder_path);
    let mut out = Vec::new();
    gather_recursive(notebook, &folder_path, scope.recursive, include_folders, &mut out)?;
    Ok(out)
}

fn gather_recursive(
    notebook: &mut Notebook,
    path: &str,
    recursive: bool,
    include_folders: bool,
    out: &mut Vec<Candidate>,
) -> Result<()> {
    let config = notebook.folder_manager.get_folder_config(path)?;
    for file in &config.files {
        out.push(Candidate {
            path: join(path, &file.name),
            id: file.id.clone(),
            created_utc: file.created_utc,
            modified_utc: file.modified_utc,
            tags: file.tags.clone(),
            is_folder: false,
        });
    }

    let mut subfolders = config.folders.clone();
    subfolders.sort();
    for name in subfolders {
        let sub_path = join(path, &name);
        if include_folders {
            let sub_config = notebook.folder_manager.get_folder_config(&sub_path)?;
            out.push(Candidate {
                path: sub_path.clone(),
                id: sub_config.id.clone(),
                created_utc: sub_config.created_utc,
                modified_utc: sub_config.modified_utc,
                tags: Vec::new(),
                is_folder: true,
            });
        }
        if recursive {
            gather_recursive(notebook, &sub_path, recursive, include_folders, out)?;
        }
    }
    Ok(())
}

fn gather_input_files(notebook: &mut Notebook, input: &InputFiles) -> Result<Vec<Candidate>> {
    let mut out = Vec::new();
    for path in &input.files {
        let path = clean_path(path);
        let info = notebook.folder_manager.get_file_info(&path)?;
        out.push(Candidate {
            path,
            id: info.id,
            created_utc: info.created_utc,
            modified_utc: info.modified_utc,
            tags: info.tags,
            is_folder: false,
        });
    }
    for path in &input.folders {
        let path = clean_path(path);
        let config = notebook.folder_manager.get_folder_config(&path)?;
        out.push(Candidate {
            path,
            id: config.id.clone(),
            created_utc: config.created_utc,
            modified_utc: config.modified_utc,
            tags: Vec::new(),
            is_folder: true,
        });
    }
    Ok(out)
}

fn passes_tag_filter(tags: &[String], scope: &SearchScope) -> bool {
    if !scope.tags.is_empty() {
        let ok = match scope.tag_operator.0 {
            TagOperator::And => scope.tags.iter().all(|t| tags.contains(t)),
            TagOperator::Or => scope.tags.iter().any(|t| tags.contains(t)),
        };
        if !ok {
            return false;
        }
    }
    !scope.exclude_tags.iter().any(|t| tags.contains(t))
}

fn passes_date_filter(created_utc: i64, modified_utc: i64, filter: &Option<DateFilter>) -> bool {
    let Some(f) = filter else { return true };
    let value = match f.field {
        DateField::Created => created_utc,
        DateField::Modified => modified_utc,
    };
    if let Some(from) = f.from {
        if value < from {
            return false;
        }
    }
    if let Some(to) = f.to {
        if value > to {
            return false;
        }
    }
    true
}

fn passes_exclude_patterns(path: &str, patterns: &[String]) -> bool {
    !patterns.iter().any(|p| glob_match(p, path))
}

/// Partitions a path into (matched-by-basename, matched-only-by-full-path).
/// An empty pattern list matches everything as a name-match (§4.7 "basename
/// first, then full path").
fn matches_patterns(path: &str, patterns: &[String]) -> (bool, bool) {
    if patterns.is_empty() {
        return (true, false);
    }
    let base = path.rsplit('/').next().unwrap_or(path);
    let name_hit = patterns.iter().any(|p| glob_match(p, base));
    let path_hit = !name_hit && patterns.iter().any(|p| glob_match(p, path));
    (name_hit, path_hit)
}

fn node_info(c: Candidate) -> NodeInfo {
    NodeInfo {
        node_type: if c.is_folder { NodeType::Folder } else { NodeType::File },
        path: c.path,
        id: c.id,
        created_utc: c.created_utc,
        modified_utc: c.modified_utc,
        tags: if c.is_folder { None } else { Some(c.tags) },
    }
}

/// File-name search (§4.7): gathers candidates (either an explicit
/// [`InputFiles`] set or a scope walk), applies tag/date/exclude filters,
/// then orders basename matches before path-only matches.
pub fn search_files(
    notebook: &mut Notebook,
    scope: &SearchScope,
    input_files: Option<&InputFiles>,
    max_results: usize,
) -> Result<SearchResults> {
    let candidates = match input_files {
        Some(input) => gather_input_files(notebook, input)?,
        None => gather_scope_nodes(notebook, scope, true)?,
    };

    let mut name_matches = Vec::new();
    let mut path_matches = Vec::new();

    for c in candidates {
        if !passes_tag_filter(&c.tags, scope) {
            continue;
        }
        if !passes_date_filter(c.created_utc, c.modified_utc, &scope.date_filter) {
            continue;
        }
        if !passes_exclude_patterns(&c.path, &scope.exclude_patterns) {
            continue;
        }
        let (name_hit, path_hit) = matches_patterns(&c.path, &scope.file_patterns);
        if name_hit {
            name_matches.push(c);
        } else if path_hit {
            path_matches.push(c);
        }
    }

    let mut ordered = name_matches;
    ordered.extend(path_matches);

    let truncated = ordered.len() > max_results;
    ordered.truncate(max_results);

    let results: Vec<NodeInfo> = ordered.into_iter().map(node_info).collect();
    Ok(SearchResults {
        total_results: results.len(),
        truncated,
        results,
    })
}

/// Tag search (§4.7): resolves files matching `scope.tag_operator` over
/// `scope.tags`, then applies the rest of the scope filters. Folders are
/// never returned by this mode.
pub fn search_by_tags(notebook: &mut Notebook, scope: &SearchScope, max_results: usize) -> Result<SearchResults> {
    if scope.tags.is_empty() {
        return Err(VxError::InvalidParam("search_by_tags requires at least one tag".to_string()));
    }

    let candidates = gather_scope_nodes(notebook, scope, false)?;
    let mut matches: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| !c.is_folder)
        .filter(|c| passes_tag_filter(&c.tags, scope))
        .filter(|c| passes_date_filter(c.created_utc, c.modified_utc, &scope.date_filter))
        .filter(|c| passes_exclude_patterns(&c.path, &scope.exclude_patterns))
        .filter(|c| {
            if scope.file_patterns.is_empty() {
                true
            } else {
                let (name_hit, path_hit) = matches_patterns(&c.path, &scope.file_patterns);
                name_hit || path_hit
            }
        })
        .collect();
    matches.sort_by(|a, b| a.path.cmp(&b.path));

    let truncated = matches.len() > max_results;
    matches.truncate(max_results);

    let results: Vec<NodeInfo> = matches.into_iter().map(node_info).collect();
    Ok(SearchResults {
        total_results: results.len(),
        truncated,
        results,
    })
}

/// One content match within a line.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentMatch {
    pub line: usize,
    pub col_start: usize,
    pub col_end: usize,
    pub line_text: String,
    pub match_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchedFile {
    pub path: String,
    pub id: String,
    pub matches: Vec<ContentMatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentSearchResults {
    pub matched_files: Vec<MatchedFile>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSearchOptions {
    pub case_sensitive: bool,
    pub whole_word: bool,
    pub regex: bool,
}

/// A pluggable content-matching engine (§4.7, §10.4). [`InProcessContentBackend`]
/// is the required baseline; [`RipgrepContentBackend`] is an optional
/// external backend that must honor the same `max_results`/`truncated`
/// contract.
pub trait ContentBackend {
    fn search(
        &self,
        files: &[(String, String, PathBuf)],
        pattern: &str,
        options: &ContentSearchOptions,
        exclude_patterns: &[String],
        max_results: usize,
    ) -> Result<ContentSearchResults>;
}

enum LineMatcher {
    Regex(regex::Regex),
    Plain {
        needle: String,
        case_sensitive: bool,
        whole_word: bool,
    },
}

impl LineMatcher {
    fn new(pattern: &str, options: &ContentSearchOptions) -> Result<Self> {
        if options.regex {
            let pat = if options.case_sensitive {
                pattern.to_string()
            } else {
                format!("(?i){pattern}")
            };
            let re = regex::Regex::new(&pat).map_err(|e| VxError::InvalidParam(format!("invalid regex: {e}")))?;
            Ok(LineMatcher::Regex(re))
        } else {
            Ok(LineMatcher::Plain {
                needle: pattern.to_string(),
                case_sensitive: options.case_sensitive,
                whole_word: options.whole_word,
            })
        }
    }

    fn find_all(&self, line: &str) -> Vec<(usize, usize)> {
        match self {
            LineMatcher::Regex(re) => re.find_iter(line).map(|m| (m.start(), m.end())).collect(),
            LineMatcher::Plain {
                needle,
                case_sensitive,
                whole_word,
            } => {
                if needle.is_empty() {
                    return Vec::new();
                }
                let (haystack, pat) = if *case_sensitive {
                    (line.to_string(), needle.clone())
                } else {
                    (line.to_lowercase(), needle.to_lowercase())
                };
                let mut out = Vec::new();
                let mut start = 0;
                while let Some(pos) = haystack.get(start..).and_then(|h| h.find(&pat)) {
                    let begin = start + pos;
                    let end = begin + pat.len();
                    if !*whole_word || is_word_boundary_match(line, begin, end) {
                        out.push((begin, end));
                    }
                    start = begin + pat.len().max(1);
                }
                out
            }
        }
    }
}

fn is_word_boundary_match(line: &str, start: usize, end: usize) -> bool {
    let before_ok = start == 0
        || !line[..start]
            .chars()
            .next_back()
            .map(|c| c.is_alphanumeric() || c == '_')
            .unwrap_or(false);
    let after_ok = end == line.len()
        || !line[end..]
            .chars()
            .next()
            .map(|c| c.is_alphanumeric() || c == '_')
            .unwrap_or(false);
    before_ok && after_ok
}

/// The required baseline content backend: reads each candidate file from
/// disk and scans it line by line. Files that fail to read (deleted out
/// from under the search, permission denied, non-UTF-8 binary content) are
/// silently skipped rather than failing the whole search.
pub struct InProcessContentBackend;

impl ContentBackend for InProcessContentBackend {
    fn search(
        &self,
        files: &[(String, String, PathBuf)],
        pattern: &str,
        options: &ContentSearchOptions,
        exclude_patterns: &[String],
        max_results: usize,
    ) -> Result<ContentSearchResults> {
        let matcher = LineMatcher::new(pattern, options)?;
        let mut matched_files = Vec::new();
        let mut total = 0usize;

        'files: for (rel_path, id, abs_path) in files {
            if exclude_patterns.iter().any(|p| glob_match(p, rel_path)) {
                continue;
            }
            let Ok(bytes) = std::fs::read(abs_path) else {
                continue;
            };
            let text = String::from_utf8_lossy(&bytes);
            let mut file_matches = Vec::new();
            for (line_idx, line) in text.lines().enumerate() {
                for (start, end) in matcher.find_all(line) {
                    file_matches.push(ContentMatch {
                        line: line_idx + 1,
                        col_start: start,
                        col_end: end,
                        line_text: line.to_string(),
                        match_text: line[start..end].to_string(),
                    });
                    total += 1;
                    if total > max_results {
                        break;
                    }
                }
                if total > max_results {
                    break;
                }
            }
            if !file_matches.is_empty() {
                matched_files.push(MatchedFile {
                    path: rel_path.clone(),
                    id: id.clone(),
                    matches: file_matches,
                });
            }
            if total > max_results {
                break 'files;
            }
        }

        let truncated = total > max_results;
        let mut remaining = max_results;
        let mut out = Vec::new();
        for mut f in matched_files {
            if remaining == 0 {
                break;
            }
            if f.matches.len() > remaining {
                f.matches.truncate(remaining);
            }
            remaining -= f.matches.len();
            out.push(f);
        }

        Ok(ContentSearchResults {
            matched_files: out,
            truncated,
        })
    }
}

static RG_AVAILABLE: std::sync::OnceLock<bool> = std::sync::OnceLock::new();

/// An optional external backend that shells out to `rg` (ripgrep),
/// producing results semantically equivalent to [`InProcessContentBackend`]
/// (§4.7, §10.4). Availability is probed once per process with `rg
/// --version` and cached.
pub struct RipgrepContentBackend;

impl RipgrepContentBackend {
    pub fn is_available() -> bool {
        *RG_AVAILABLE.get_or_init(|| {
            std::process::Command::new("rg")
                .arg("--version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
    }
}

impl ContentBackend for RipgrepContentBackend {
    fn search(
        &self,
        files: &[(String, String, PathBuf)],
        pattern: &str,
        options: &ContentSearchOptions,
        exclude_patterns: &[String],
        max_results: usize,
    ) -> Result<ContentSearchResults> {
        if !Self::is_available() {
            return Err(VxError::Unsupported("ripgrep backend is not available on this system".to_string()));
        }

        let mut matched_files = Vec::new();
        let mut total = 0usize;

        for (rel_path, id, abs_path) in files {
            if total > max_results {
                break;
            }
            if exclude_patterns.iter().any(|p| glob_match(p, rel_path)) {
                continue;
            }

            let mut cmd = std::process::Command::new("rg");
            cmd.arg("--json");
            if !options.regex {
                cmd.arg("--fixed-strings");
            }
            if options.case_sensitive {
                cmd.arg("--case-sensitive");
            } else {
                cmd.arg("--ignore-case");
            }
            if options.whole_word {
                cmd.arg("--word-regexp");
            }
            cmd.arg("--").arg(pattern).arg(abs_path);

            let Ok(output) = cmd.output() else { continue };
            if output.status.code() == Some(2) {
                continue;
            }
            let stdout = String::from_utf8_lossy(&output.stdout);
            let mut file_matches = Vec::new();
            'lines: for line in stdout.lines() {
                let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
                    continue;
                };
                if value.get("type").and_then(|t| t.as_str()) != Some("match") {
                    continue;
                }
                let data = &value["data"];
                let line_number = data["line_number"].as_u64().unwrap_or(0) as usize;
                let line_text = data["lines"]["text"].as_str().unwrap_or("").trim_end_matches('\n').to_string();
                if let Some(submatches) = data["submatches"].as_array() {
                    for sm in submatches {
                        if total > max_results {
                            break 'lines;
                        }
                        let start = sm["start"].as_u64().unwrap_or(0) as usize;
                        let end = sm["end"].as_u64().unwrap_or(0) as usize;
                        let match_text = sm["match"]["text"].as_str().unwrap_or("").to_string();
                        file_matches.push(ContentMatch {
                            line: line_number,
                            col_start: start,
                            col_end: end,
                            line_text: line_text.clone(),
                            match_text,
                        });
                        total += 1;
                    }
                }
            }
            if !file_matches.is_empty() {
                matched_files.push(MatchedFile {
                    path: rel_path.clone(),
                    id: id.clone(),
                    matches: file_matches,
                });
            }
        }

        let truncated = total > max_results;
        let mut remaining = max_results;
        let mut out = Vec::new();
        for mut f in matched_files {
            if remaining == 0 {
                break;
            }
            if f.matches.len() > remaining {
                f.matches.truncate(remaining);
            }
            remaining -= f.matches.len();
            out.push(f);
        }

        Ok(ContentSearchResults {
            matched_files: out,
            truncated,
        })
    }
}

/// Content search (§4.7): gathers file candidates from the scope, then
/// hands their on-disk paths to `backend`.
pub fn search_content(
    notebook: &mut Notebook,
    scope: &SearchScope,
    pattern: &str,
    options: &ContentSearchOptions,
    max_results: usize,
    backend: &dyn ContentBackend,
) -> Result<ContentSearchResults> {
    let candidates = gather_scope_nodes(notebook, scope, false)?;
    let mut files = Vec::new();
    for c in candidates {
        if c.is_folder {
            continue;
        }
        if !passes_tag_filter(&c.tags, scope) {
            continue;
        }
        if !passes_date_filter(c.created_utc, c.modified_utc, &scope.date_filter) {
            continue;
        }
        if !scope.file_patterns.is_empty() {
            let (name_hit, path_hit) = matches_patterns(&c.path, &scope.file_patterns);
            if !(name_hit || path_hit) {
                continue;
            }
        }
        let abs = notebook.folder_manager.root().join(&c.path);
        files.push((c.path, c.id, abs));
    }
    backend.search(&files, pattern, options, &scope.exclude_patterns, max_results)
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
    fn test_glob_match_star_and_question() {
        assert!(glob_match("*.md", "readme.md"));
        assert!(!glob_match("*.md", "readme.txt"));
        assert!(glob_match("note?.md", "note1.md"));
        assert!(!glob_match("note?.md", "note12.md"));
        assert!(glob_match("*", "anything"));
    }

    #[test]
    fn test_search_files_by_name_pattern() {
        let dir = tempdir().unwrap();
        let (mut mgr, id) = open_notebook(dir.path());
        let nb = mgr.get_notebook_mut(&id).unwrap();

        nb.folder_manager.create_file(".", "readme.md").unwrap();
        nb.folder_manager.create_file(".", "notes.txt").unwrap();

        let scope = SearchScope {
            folder_path: ".".to_string(),
            recursive: true,
            file_patterns: vec!["*.md".to_string()],
            ..Default::default()
        };
        let results = search_files(nb, &scope, None, 10).unwrap();
        assert_eq!(results.results.len(), 1);
        assert_eq!(results.results[0].path, "readme.md");
        assert!(!results.truncated);
    }

    #[test]
    fn test_search_files_truncates_and_sets_flag() {
        let dir = tempdir().unwrap();
        let (mut mgr, id) = open_notebook(dir.path());
        let nb = mgr.get_notebook_mut(&id).unwrap();

        for i in 0..5 {
            nb.folder_manager.create_file(".", &format!("f{i}.md")).unwrap();
        }

        let scope = SearchScope {
            folder_path: ".".to_string(),
            recursive: true,
            ..Default::default()
        };
        let results = search_files(nb, &scope, None, 2).unwrap();
        assert_eq!(results.results.len(), 2);
        assert!(results.truncated);
        assert_eq!(results.total_results, 2);
    }

    #[test]
    fn test_search_by_tags_and_operator() {
        let dir = tempdir().unwrap();
        let (mut mgr, id) = open_notebook(dir.path());
        let nb = mgr.get_notebook_mut(&id).unwrap();

        nb.create_tag("work").unwrap();
        nb.create_tag("urgent").unwrap();
        nb.folder_manager.create_file(".", "a.md").unwrap();
        nb.folder_manager.create_file(".", "b.md").unwrap();
        nb.tag_file("a.md", "work").unwrap();
        nb.tag_file("a.md", "urgent").unwrap();
        nb.tag_file("b.md", "work").unwrap();

        let scope = SearchScope {
            folder_path: ".".to_string(),
            recursive: true,
            tags: vec!["work".to_string(), "urgent".to_string()],
            tag_operator: TagOperatorDefault(TagOperator::And),
            ..Default::default()
        };
        let results = search_by_tags(nb, &scope, 10).unwrap();
        assert_eq!(results.results.len(), 1);
        assert_eq!(results.results[0].path, "a.md");
    }

    #[test]
    fn test_search_by_tags_requires_at_least_one_tag() {
        let dir = tempdir().unwrap();
        let (mut mgr, id) = open_notebook(dir.path());
        let nb = mgr.get_notebook_mut(&id).unwrap();

        let scope = SearchScope::default();
        let err = search_by_tags(nb, &scope, 10).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidParam);
    }

    #[test]
    fn test_search_content_finds_matches_in_process() {
        let dir = tempdir().unwrap();
        let (mut mgr, id) = open_notebook(dir.path());
        let nb = mgr.get_notebook_mut(&id).unwrap();

        nb.folder_manager.create_file(".", "a.txt").unwrap();
        std::fs::write(nb.folder_manager.root().join("a.txt"), "hello world\nHELLO\n").unwrap();

        let scope = SearchScope {
            folder_path: ".".to_string(),
            recursive: true,
            ..Default::default()
        };
        let options = ContentSearchOptions {
            case_sensitive: false,
            ..Default::default()
        };
        let results = search_content(nb, &scope, "hello", &options, 10, &InProcessContentBackend).unwrap();
        assert_eq!(results.matched_files.len(), 1);
        assert_eq!(results.matched_files[0].matches.len(), 2);
        assert!(!results.truncated);
    }

    #[test]
    fn test_search_content_respects_max_results() {
        let dir = tempdir().unwrap();
        let (mut mgr, id) = open_notebook(dir.path());
        let nb = mgr.get_notebook_mut(&id).unwrap();

        nb.folder_manager.create_file(".", "a.txt").unwrap();
        std::fs::write(nb.folder_manager.root().join("a.txt"), "aaa\naaa\naaa\n").unwrap();

        let scope = SearchScope {
            folder_path: ".".to_string(),
            recursive: true,
            ..Default::default()
        };
        let options = ContentSearchOptions {
            case_sensitive: true,
            ..Default::default()
        };
        let results = search_content(nb, &scope, "a", &options, 2, &InProcessContentBackend).unwrap();
        let total: usize = results.matched_files.iter().map(|f| f.matches.len()).sum();
        assert_eq!(total, 2);
        assert!(results.truncated);
    }
}
