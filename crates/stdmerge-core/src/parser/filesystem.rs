//! Source file discovery for library roots.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::{DirEntry, WalkDir};

const IMPLICIT_IGNORED_DIRS: &[&str] = &["node_modules", "vendor", "__pycache__", "target"];

/// Optional file at a library root with one glob pattern per line.
pub const IGNORE_FILE: &str = ".stdmergeignore";

fn load_ignore_patterns(root: &Path) -> Vec<String> {
    let content = match std::fs::read_to_string(root.join(IGNORE_FILE)) {
        Ok(c) => c,
        Err(_) => return vec![],
    };
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let line = line.trim_end_matches('/');
            line.strip_prefix("./").unwrap_or(line).to_string()
        })
        .collect()
}

/// Glob match supporting `*` and `?`.
pub fn glob_match(text: &str, pattern: &str) -> bool {
    let t_chars: Vec<char> = text.chars().collect();
    let p_chars: Vec<char> = pattern.chars().collect();
    let (tl, pl) = (t_chars.len(), p_chars.len());
    let mut dp = vec![vec![false; pl + 1]; tl + 1];
    dp[0][0] = true;
    for j in 1..=pl {
        if p_chars[j - 1] == '*' {
            dp[0][j] = dp[0][j - 1];
        }
    }
    for i in 1..=tl {
        for j in 1..=pl {
            if p_chars[j - 1] == '*' {
                dp[i][j] = dp[i][j - 1] || dp[i - 1][j];
            } else if p_chars[j - 1] == '?' || t_chars[i - 1] == p_chars[j - 1] {
                dp[i][j] = dp[i - 1][j - 1];
            }
        }
    }
    dp[tl][pl]
}

fn is_ignored(rel_path: &str, patterns: &[String]) -> bool {
    let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
    patterns.iter().any(|p| {
        glob_match(rel_path, p) || glob_match(file_name, p) || rel_path.starts_with(&format!("{p}/"))
    })
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || IMPLICIT_IGNORED_DIRS.contains(&name.as_ref())
}

/// Path relative to `root` with `/` separators.
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Walk `root` and return every file whose extension is in `extensions`,
/// sorted by relative path so parse order is stable.
pub fn iter_source_files(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let patterns = load_ignore_patterns(root);
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            extension_of(e.path()).is_some_and(|ext| extensions.contains(&ext.as_str()))
        })
        .filter(|e| !is_ignored(&relative_path(root, e.path()), &patterns))
        .map(DirEntry::into_path)
        .collect();
    files.sort_by_key(|p| relative_path(root, p));
    files
}

/// Lower-cased extension with its leading dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
}

/// SHA-256 over the relative paths and contents of `files`, used to tag a
/// parsed library so reports can tell runs over different trees apart.
pub fn content_fingerprint(root: &Path, files: &[PathBuf]) -> String {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(relative_path(root, file).as_bytes());
        if let Ok(data) = std::fs::read(file) {
            hasher.update(&data);
        }
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("test_strings.py", "test_*"));
        assert!(glob_match("a.go", "?.go"));
        assert!(!glob_match("strings.py", "test_*"));
    }

    #[test]
    fn test_iter_source_files_skips_hidden_and_vendor() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("pkg")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        std::fs::write(root.join("pkg/b.py"), "def b(): pass\n").unwrap();
        std::fs::write(root.join("a.py"), "def a(): pass\n").unwrap();
        std::fs::write(root.join("notes.txt"), "x").unwrap();
        std::fs::write(root.join(".git/hook.py"), "x").unwrap();
        std::fs::write(root.join("node_modules/lib/c.py"), "x").unwrap();

        let files = iter_source_files(root, &[".py"]);
        let rel: Vec<String> = files.iter().map(|f| relative_path(root, f)).collect();
        assert_eq!(rel, vec!["a.py", "pkg/b.py"]);
    }

    #[test]
    fn test_ignore_file_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("tests")).unwrap();
        std::fs::write(root.join(IGNORE_FILE), "# fixtures\ntests/\nconftest.py\n").unwrap();
        std::fs::write(root.join("tests/t.py"), "x").unwrap();
        std::fs::write(root.join("conftest.py"), "x").unwrap();
        std::fs::write(root.join("core.py"), "x").unwrap();

        let files = iter_source_files(root, &[".py"]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("core.py"));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.py");
        std::fs::write(&file, "one").unwrap();
        let first = content_fingerprint(dir.path(), &[file.clone()]);
        std::fs::write(&file, "two").unwrap();
        let second = content_fingerprint(dir.path(), &[file]);
        assert_ne!(first, second);
        assert_eq!(first.len(), 64);
    }
}
