// src/core/paths.rs

use crate::constants::MEMO_CONFIG_FILENAME;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Failed to expand path '{template}': {reason}")]
    Expansion { template: String, reason: String },
}

/// Expands a path from a configuration file, resolving the home directory (`~`)
/// and environment variables (`$VAR`, `${VAR}`).
///
/// An empty template stays empty so that "unset" survives expansion.
pub fn expand_path(template: &str) -> Result<String, PathError> {
    if template.is_empty() {
        return Ok(String::new());
    }
    shellexpand::full(template)
        .map(|expanded| expanded.into_owned())
        .map_err(|e| PathError::Expansion {
            template: template.to_string(),
            reason: e.to_string(),
        })
}

/// Returns the path of the configuration snapshot inside a memoization directory.
pub fn memo_config_path(memo_dir: &Path) -> PathBuf {
    memo_dir.join(MEMO_CONFIG_FILENAME)
}

/// Returns a display-friendly version of `path`: canonical when it exists,
/// unchanged otherwise.
pub fn display_path(path: &Path) -> String {
    dunce::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_empty_stays_empty() {
        assert_eq!(expand_path("").unwrap(), "");
    }

    #[test]
    fn test_expand_plain_path_is_unchanged() {
        assert_eq!(expand_path("/data/halos").unwrap(), "/data/halos");
    }

    #[test]
    fn test_expand_unknown_variable_fails() {
        let result = expand_path("$SHELLFISH_SURELY_UNSET_VARIABLE/halos");
        assert!(matches!(result, Err(PathError::Expansion { .. })));
    }

    #[test]
    fn test_memo_config_path() {
        let path = memo_config_path(Path::new("/tmp/memo"));
        assert_eq!(path, Path::new("/tmp/memo/memo.config"));
    }

    #[test]
    fn test_display_path_of_missing_file() {
        let path = Path::new("/definitely/not/a/real/path");
        assert_eq!(display_path(path), "/definitely/not/a/real/path");
    }
}
