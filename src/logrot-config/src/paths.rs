//! Expansion of section path patterns into concrete log files.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use logrot_common::expand_home_path;

use crate::error::{ConfigError, Result};

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Regular files directly inside `dir`, sorted by name.
fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect(),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot list log directory");
            Vec::new()
        }
    };
    files.sort();
    files
}

/// Expand one pattern.
///
/// - `~` is expanded first.
/// - Glob patterns yield the matching regular files, sorted.
/// - A directory yields the regular files directly inside it.
/// - Any other literal path is returned as-is, even when absent, so
///   `missingok` can decide what to do with it.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let expanded = expand_home_path(Path::new(pattern)).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    let expanded_str = expanded.to_string_lossy().to_string();

    if has_glob_meta(&expanded_str) {
        let entries = glob::glob(&expanded_str).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.msg.to_string(),
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "Unreadable path while expanding pattern");
                    None
                }
            })
            .filter(|p| {
                if p.is_dir() {
                    debug!(path = %p.display(), "Skipping directory matched by glob");
                    false
                } else {
                    true
                }
            })
            .map(|p| absolute(&p))
            .collect();
        files.sort();
        return Ok(files);
    }

    if expanded.is_dir() {
        return Ok(files_in(&expanded).iter().map(|p| absolute(p)).collect());
    }

    Ok(vec![absolute(&expanded)])
}

/// Whether `pattern` can match files it does not name, i.e. it is a glob
/// or a directory. Such expansions also pick up rotated copies.
pub fn expands_broadly(pattern: &str) -> bool {
    match expand_home_path(Path::new(pattern)) {
        Ok(expanded) => has_glob_meta(&expanded.to_string_lossy()) || expanded.is_dir(),
        Err(_) => has_glob_meta(pattern),
    }
}

/// Expand every pattern of a section, keeping discovery order.
pub fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        files.extend(expand_pattern(pattern)?);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_literal_missing_path_is_kept() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.log");
        let files = expand_pattern(&missing.to_string_lossy()).unwrap();
        assert_eq!(files, vec![missing]);
    }

    #[test]
    fn test_glob_matches_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.log"), "b").unwrap();
        fs::write(dir.path().join("a.log"), "a").unwrap();
        fs::write(dir.path().join("c.txt"), "c").unwrap();
        fs::create_dir(dir.path().join("d.log")).unwrap();

        let pattern = dir.path().join("*.log");
        let files = expand_pattern(&pattern.to_string_lossy()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.log"), dir.path().join("b.log")]
        );
    }

    #[test]
    fn test_directory_expands_to_contents() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("one"), "1").unwrap();
        fs::write(dir.path().join("two"), "2").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let files = expand_pattern(&dir.path().to_string_lossy()).unwrap();
        assert_eq!(files, vec![dir.path().join("one"), dir.path().join("two")]);
    }

    #[test]
    fn test_glob_without_matches_is_empty() {
        let dir = TempDir::new().unwrap();
        let pattern = dir.path().join("*.log");
        assert!(expand_pattern(&pattern.to_string_lossy()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_glob_is_error() {
        let err = expand_pattern("/var/log/[oops").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_expands_broadly() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("app.log");
        fs::write(&file, "x").unwrap();

        assert!(expands_broadly(&dir.path().to_string_lossy()));
        assert!(expands_broadly(&dir.path().join("*.log").to_string_lossy()));
        assert!(!expands_broadly(&file.to_string_lossy()));
        assert!(!expands_broadly(&dir.path().join("absent.log").to_string_lossy()));
    }

    #[test]
    fn test_expand_patterns_keeps_order() {
        let dir = TempDir::new().unwrap();
        let z = dir.path().join("z.log");
        let a = dir.path().join("a.log");
        let patterns = vec![
            z.to_string_lossy().to_string(),
            a.to_string_lossy().to_string(),
        ];
        assert_eq!(expand_patterns(&patterns).unwrap(), vec![z, a]);
    }
}
