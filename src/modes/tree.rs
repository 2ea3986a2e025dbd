// src/modes/tree.rs

use crate::backend::Environment;
use crate::backend::tree::TreeNode;
use crate::constants::MMP_MEMO_FILENAME;
use crate::models::GlobalConfig;
use crate::modes::{Mode, ModeConfig, ModeError, ModeResult, parse_catalog};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Walks each input halo back along its main-progenitor branch.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct TreeMode {
    /// Maximum number of progenitors emitted per halo. `0` follows the whole branch.
    pub max_steps: i64,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct TreeFlags {
    #[arg(long = "MaxSteps")]
    max_steps: Option<i64>,
}

impl ModeConfig for TreeMode {
    const NAME: &'static str = "tree";
    type Flags = TreeFlags;

    fn apply_flags(&mut self, flags: TreeFlags) {
        if let Some(max_steps) = flags.max_steps {
            self.max_steps = max_steps;
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.max_steps < 0 {
            return Err(format!("MaxSteps must be non-negative, got {}.", self.max_steps));
        }
        Ok(())
    }
}

impl Mode for TreeMode {
    fn run(
        &self,
        _global: &GlobalConfig,
        env: &Environment,
        lines: &[String],
    ) -> ModeResult<Vec<String>> {
        let rows = parse_catalog(lines, 2)?;
        let progenitors = MainProgenitors::load_or_build(env)?;

        let mut out = vec!["# ID Snap".to_string()];
        for row in &rows {
            out.push(format!("{} {}", row.id, row.snap));
            let mut visited = HashSet::from([row.id]);
            let mut current = row.id;
            let mut steps = 0;
            while let Some((id, snap)) = progenitors.of(current) {
                if self.max_steps > 0 && steps >= self.max_steps {
                    break;
                }
                if !visited.insert(id) {
                    return Err(ModeError::ProgenitorCycle {
                        path: env.memo_dir().join(MMP_MEMO_FILENAME).display().to_string(),
                        id,
                    });
                }
                out.push(format!("{id} {snap}"));
                current = id;
                steps += 1;
            }
        }
        Ok(out)
    }
}

/// Maps a halo ID to the ID and snapshot of its main progenitor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MainProgenitors {
    by_descendant: HashMap<i64, (i64, i64)>,
}

impl MainProgenitors {
    /// Reads the table from the memo directory, or builds it from the merger
    /// trees and stores it there for later invocations.
    pub fn load_or_build(env: &Environment) -> ModeResult<Self> {
        let path = env.memo_dir().join(MMP_MEMO_FILENAME);
        if path.is_file() {
            log::debug!("Reading main-progenitor table from '{}'", path.display());
            return Self::read(&path);
        }

        let table = Self::from_nodes(&env.trees()?.read_nodes()?);
        table.write(&path)?;
        log::info!(
            "Memoized {} main-progenitor link(s) in '{}'",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_nodes(nodes: &[TreeNode]) -> Self {
        let by_descendant = nodes
            .iter()
            .filter(|node| node.is_main_progenitor && node.desc_id >= 0)
            .map(|node| (node.desc_id, (node.id, node.snap)))
            .collect();
        Self { by_descendant }
    }

    pub fn of(&self, id: i64) -> Option<(i64, i64)> {
        self.by_descendant.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_descendant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_descendant.is_empty()
    }

    fn read(path: &Path) -> ModeResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ModeError::Memo {
            path: path.display().to_string(),
            source,
        })?;
        let mut by_descendant = HashMap::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Result<Vec<i64>, _> = line.split_whitespace().map(str::parse).collect();
            match fields.as_deref() {
                Ok([desc_id, id, snap]) => {
                    by_descendant.insert(*desc_id, (*id, *snap));
                }
                _ => {
                    return Err(ModeError::CorruptMemo {
                        path: path.display().to_string(),
                        line: index + 1,
                    });
                }
            }
        }
        Ok(Self { by_descendant })
    }

    fn write(&self, path: &Path) -> ModeResult<()> {
        let mut entries: Vec<_> = self.by_descendant.iter().collect();
        entries.sort();

        let mut content = String::from("# DescID ProgID ProgSnap\n");
        for (desc_id, (id, snap)) in entries {
            content.push_str(&format!("{desc_id} {id} {snap}\n"));
        }
        fs::write(path, content).map_err(|source| ModeError::Memo {
            path: path.display().to_string(),
            source,
        })
    }
}
