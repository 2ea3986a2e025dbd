// src/backend/tree.rs

use crate::backend::{BackendError, list_files};
use crate::constants::{TREE_FILE_PREFIX, TREE_FILE_SUFFIX};
use crate::models::GlobalConfig;
use std::fs;
use std::path::{Path, PathBuf};

// consistent-trees column layout (0-indexed).
const ID_COLUMN: usize = 1;
const DESC_ID_COLUMN: usize = 3;
const MMP_COLUMN: usize = 14;
const SNAP_COLUMN: usize = 31;

/// One halo of a merger tree, reduced to what is needed to walk branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeNode {
    pub id: i64,
    pub desc_id: i64,
    pub is_main_progenitor: bool,
    pub snap: i64,
}

/// The `tree_*.dat` forest files written by consistent-trees.
#[derive(Debug, Clone)]
pub struct ConsistentTrees {
    files: Vec<PathBuf>,
}

impl ConsistentTrees {
    pub fn open(config: &GlobalConfig) -> Result<Self, BackendError> {
        let dir = Path::new(&config.tree_dir);
        let files = list_files(dir, "TreeDir", |name| {
            name.starts_with(TREE_FILE_PREFIX) && name.ends_with(TREE_FILE_SUFFIX)
        })?;
        if files.is_empty() {
            return Err(BackendError::EmptyDirectory {
                key: "TreeDir",
                path: dir.display().to_string(),
            });
        }
        log::debug!(
            "consistent-trees backend: {} forest file(s) in '{}'",
            files.len(),
            dir.display()
        );
        Ok(Self { files })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Reads every node of every forest file.
    pub fn read_nodes(&self) -> Result<Vec<TreeNode>, BackendError> {
        let mut nodes = Vec::new();
        for path in &self.files {
            read_forest(path, &mut nodes)?;
        }
        Ok(nodes)
    }
}

fn read_forest(path: &Path, nodes: &mut Vec<TreeNode>) -> Result<(), BackendError> {
    let content = fs::read_to_string(path).map_err(|source| BackendError::Io {
        path: path.display().to_string(),
        source,
    })?;

    for (line_number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        // The first data line of a forest file is the bare tree count.
        if fields.len() == 1 {
            continue;
        }

        let malformed = |reason: String| BackendError::Malformed {
            path: path.display().to_string(),
            line: line_number + 1,
            reason,
        };
        let int_at = |column: usize| -> Result<i64, BackendError> {
            let raw = fields.get(column).ok_or_else(|| {
                malformed(format!(
                    "expected at least {} columns, found {}",
                    SNAP_COLUMN + 1,
                    fields.len()
                ))
            })?;
            raw.parse::<i64>()
                .map_err(|e| malformed(format!("column {column} ('{raw}') is not an integer: {e}")))
        };

        nodes.push(TreeNode {
            id: int_at(ID_COLUMN)?,
            desc_id: int_at(DESC_ID_COLUMN)?,
            is_main_progenitor: int_at(MMP_COLUMN)? == 1,
            snap: int_at(SNAP_COLUMN)?,
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Formats a consistent-trees line with the given identity columns and
    /// zeros everywhere else.
    pub(crate) fn tree_line(id: i64, desc_id: i64, mmp: i64, snap: i64) -> String {
        let mut columns = vec!["0".to_string(); SNAP_COLUMN + 1];
        columns[ID_COLUMN] = id.to_string();
        columns[DESC_ID_COLUMN] = desc_id.to_string();
        columns[MMP_COLUMN] = mmp.to_string();
        columns[SNAP_COLUMN] = snap.to_string();
        columns.join(" ")
    }

    fn tree_config(dir: &Path) -> GlobalConfig {
        GlobalConfig {
            tree_dir: dir.display().to_string(),
            ..GlobalConfig::default()
        }
    }

    #[test]
    fn test_read_nodes_skips_headers_and_counts() {
        let tmp = TempDir::new().unwrap();
        let content = format!(
            "#scale(0) id(1) desc_scale(2) desc_id(3) ...\n#Omega_M = 0.27\n1\n#tree 3\n{}\n{}\n",
            tree_line(3, -1, 1, 100),
            tree_line(2, 3, 1, 99)
        );
        fs::write(tmp.path().join("tree_0_0_0.dat"), content).unwrap();
        fs::write(tmp.path().join("forests.list"), "ignored").unwrap();

        let trees = ConsistentTrees::open(&tree_config(tmp.path())).unwrap();
        assert_eq!(trees.files().len(), 1);

        let nodes = trees.read_nodes().unwrap();
        assert_eq!(
            nodes,
            vec![
                TreeNode { id: 3, desc_id: -1, is_main_progenitor: true, snap: 100 },
                TreeNode { id: 2, desc_id: 3, is_main_progenitor: true, snap: 99 },
            ]
        );
    }

    #[test]
    fn test_truncated_line_is_malformed() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("tree_0_0_0.dat"), "0.5 1 0.6 2 1\n").unwrap();
        let trees = ConsistentTrees::open(&tree_config(tmp.path())).unwrap();
        assert!(matches!(
            trees.read_nodes(),
            Err(BackendError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn test_directory_without_forests_is_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("locations.dat"), "").unwrap();
        assert!(matches!(
            ConsistentTrees::open(&tree_config(tmp.path())),
            Err(BackendError::EmptyDirectory { key: "TreeDir", .. })
        ));
    }
}
