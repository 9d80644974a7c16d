//! Path utilities for configuration and state handling.
//!
//! This module provides:
//! - Lexical normalisation (resolving `.` and `..` without touching the filesystem)
//! - Home directory (`~`) expansion for configured log paths
//! - Separator folding so `C:\logs\app.log` and `C:/logs/app.log` compare equal
//! - Resolution of relative directives (`olddir`) against a log file's directory

use std::path::{Component, Path, PathBuf};

/// Errors that can occur during path operations.
#[derive(Debug, Clone)]
pub enum PathError {
    /// Home directory could not be determined while expanding `~`.
    HomeNotFound { path: String },
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeNotFound { path } => {
                write!(f, "Could not determine home directory to expand '{}'", path)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// Result type for path operations.
pub type PathResult<T> = Result<T, PathError>;

/// Normalizes a path by resolving `.` and `..` components without filesystem access.
///
/// `..` never climbs above the root of an absolute path; for relative paths a
/// leading `..` that cannot be resolved is kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                if !normalized.pop() && !path.is_absolute() {
                    normalized.push("..");
                }
            }
            Component::CurDir => {}
            _ => {
                normalized.push(component);
            }
        }
    }

    normalized
}

/// Expands the home directory (`~`) at the start of a path.
///
/// Paths like `~user/logs` are returned unchanged.
///
/// # Examples
/// ```rust,ignore
/// use logrot_common::path_utils::expand_home_path;
/// use std::path::Path;
///
/// let expanded = expand_home_path(Path::new("~/logs/app.log"))?;
/// // Returns something like /home/user/logs/app.log
/// ```
pub fn expand_home_path(path: &Path) -> PathResult<PathBuf> {
    let path_str = path.to_string_lossy();

    if !path_str.starts_with('~') {
        return Ok(path.to_path_buf());
    }

    let home = dirs::home_dir().ok_or_else(|| PathError::HomeNotFound {
        path: path.display().to_string(),
    })?;

    if path_str == "~" {
        Ok(home)
    } else if let Some(rest) = path_str.strip_prefix("~/") {
        Ok(home.join(rest))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Folds both `\` and `/` to `/` so paths written on either convention
/// compare equal as strings.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Resolves `path` against `base` when it is relative, then normalizes it.
///
/// Used for `olddir`, which is interpreted relative to the directory of the
/// log file being rotated.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}
