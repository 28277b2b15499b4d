//! Path normalization and ID/timestamp generation (C1).
//!
//! All paths the engine stores or compares have gone through [`clean_path`]
//! first; nothing downstream re-normalizes.

use chrono::Utc;
use uuid::Uuid;

/// Normalize separators to `/`, collapse `.`/`..` segments, drop duplicate
/// separators, and preserve a leading `/` or a drive prefix (`C:`). Empty
/// input maps to `"."`.
pub fn clean_path(p: &str) -> String {
    if p.is_empty() {
        return ".".to_string();
    }

    let unified: String = p.chars().map(|c| if c == '\\' { '/' } else { c }).collect();

    let is_unc = unified.starts_with("//");
    let is_abs = unified.starts_with('/');

    let drive_prefix = {
        let bytes = unified.as_bytes();
        if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
            Some(unified[..2].to_string())
        } else {
            None
        }
    };

    let rest = if let Some(ref d) = drive_prefix {
        &unified[d.len()..]
    } else {
        &unified[..]
    };

    let mut out: Vec<&str> = Vec::new();
    for seg in rest.split('/') {
        match seg {
            "" | "." => continue,
            ".." => {
                if let Some(last) = out.last() {
                    if *last != ".." {
                        out.pop();
                        continue;
                    }
                }
                if !is_abs && drive_prefix.is_none() {
                    out.push("..");
                }
            }
            s => out.push(s),
        }
    }

    let joined = out.join("/");

    let mut result = String::new();
    if let Some(d) = drive_prefix {
        result.push_str(&d);
        result.push('/');
    } else if is_unc {
        result.push_str("//");
    } else if is_abs {
        result.push('/');
    }
    result.push_str(&joined);

    if result.is_empty() || result == "/" && !is_abs {
        return if is_abs { "/".to_string() } else { ".".to_string() };
    }
    if result.is_empty() {
        return ".".to_string();
    }
    result
}

/// Split `p` into `(parent, name)` at the last `/`. A path with no `/` has
/// parent `"."`.
pub fn split_path(p: &str) -> (String, String) {
    let p = clean_path(p);
    match p.rfind('/') {
        None => (".".to_string(), p),
        Some(idx) => {
            let parent = &p[..idx];
            let name = &p[idx + 1..];
            let parent = if parent.is_empty() { "/" } else { parent };
            (parent.to_string(), name.to_string())
        }
    }
}

/// Join `parent` and `child`; `parent` of `""` or `"."` yields `child` alone.
pub fn join(parent: &str, child: &str) -> String {
    if parent.is_empty() || parent == "." {
        clean_path(child)
    } else {
        clean_path(&format!("{parent}/{child}"))
    }
}

/// The portion of `target` below `base`, or `""` if `target` is not under
/// `base`. Returns `"."` if the two are equal after normalization.
pub fn relative_path(base: &str, target: &str) -> String {
    let base = clean_path(base);
    let target = clean_path(target);

    if base == target {
        return ".".to_string();
    }

    let prefix = if base == "." {
        String::new()
    } else {
        format!("{base}/")
    };

    target
        .strip_prefix(&prefix)
        .map(|s| s.to_string())
        .unwrap_or_default()
}

pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path_empty_is_dot() {
        assert_eq!(clean_path(""), ".");
    }

    #[test]
    fn test_clean_path_collapses_dots() {
        assert_eq!(clean_path("a/./b/../c"), "a/c");
    }

    #[test]
    fn test_clean_path_collapses_duplicate_separators() {
        assert_eq!(clean_path("a//b///c"), "a/b/c");
    }

    #[test]
    fn test_clean_path_preserves_leading_slash() {
        assert_eq!(clean_path("/a/b"), "/a/b");
    }

    #[test]
    fn test_clean_path_preserves_drive_prefix() {
        assert_eq!(clean_path("C:\\a\\b"), "C:/a/b");
    }

    #[test]
    fn test_clean_path_unc_share() {
        assert_eq!(clean_path("\\\\server\\share"), "//server/share");
    }

    #[test]
    fn test_split_path_no_separator() {
        assert_eq!(split_path("readme.md"), (".".to_string(), "readme.md".to_string()));
    }

    #[test]
    fn test_split_path_nested() {
        assert_eq!(
            split_path("a/b/readme.md"),
            ("a/b".to_string(), "readme.md".to_string())
        );
    }

    #[test]
    fn test_join_with_dot_parent() {
        assert_eq!(join(".", "a"), "a");
        assert_eq!(join("", "a"), "a");
    }

    #[test]
    fn test_join_nested() {
        assert_eq!(join("a/b", "c"), "a/b/c");
    }

    #[test]
    fn test_relative_path_under_base() {
        assert_eq!(relative_path("a/b", "a/b/c/d"), "c/d");
    }

    #[test]
    fn test_relative_path_equal_is_dot() {
        assert_eq!(relative_path("a/b", "a/b"), ".");
    }

    #[test]
    fn test_relative_path_not_under_base() {
        assert_eq!(relative_path("a/b", "x/y"), "");
    }

    #[test]
    fn test_path_round_trip() {
        let p = "a/b/c/d.txt";
        let (parent, name) = split_path(p);
        assert_eq!(join(&parent, &name), clean_path(p));
    }

    #[test]
    fn test_generate_uuid_is_v4_shaped() {
        let id = generate_uuid();
        assert_eq!(id.len(), 36);
        assert_eq!(id.chars().filter(|c| *c == '-').count(), 4);
    }

    #[test]
    fn test_now_millis_increases() {
        let a = now_millis();
        let b = now_millis();
        assert!(b >= a);
    }
}
