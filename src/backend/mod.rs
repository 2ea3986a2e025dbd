//! # Data Backends
//!
//! Readers for the three categories of on-disk simulation data, and the
//! initializer that activates them into an [`Environment`] for one invocation.
//!
//! ## Modules
//!
//! - **`snapshot`**: locates particle snapshot files from `SnapshotFormat`.
//! - **`halo`**: reads plain-text halo catalogs (`HaloType = "Text"`).
//! - **`tree`**: reads consistent-trees forests (`TreeType = "consistent-trees"`).

pub mod halo;
pub mod snapshot;
pub mod tree;

use crate::constants::{HALO_FREE_MODES, PARTICLE_MODES};
use crate::core::format::FormatError;
use crate::models::{GlobalConfig, HaloType, SnapshotType, TreeType};
use halo::TextHalos;
use snapshot::SnapshotCatalog;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tree::ConsistentTrees;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("You may not use nil as a {key} for the mode '{mode}'.")]
    NilBackend { key: &'static str, mode: String },
    #[error("The {key} '{path}' does not exist or is not a directory.")]
    MissingDirectory { key: &'static str, path: String },
    #[error("The {key} '{path}' contains no usable files.")]
    EmptyDirectory { key: &'static str, path: String },
    #[error("SnapshotType '{kind}' requires SnapshotFormat to be set.")]
    UnsetFormat { kind: String },
    #[error("The {kind} file for snapshot {snap}, '{path}', does not exist.")]
    MissingSnapshotFile {
        kind: String,
        snap: i64,
        path: String,
    },
    #[error("Snapshot {snap} is outside the configured range [{min}, {max}].")]
    SnapshotOutOfRange { snap: i64, min: i64, max: i64 },
    #[error(
        "No halo catalog for snapshot {snap}: HaloDir holds {count} catalog(s) starting at snapshot {first}."
    )]
    HaloSnapshotOutOfRange { snap: i64, first: i64, count: usize },
    #[error("Halo catalogs do not provide the value '{name}'.")]
    MissingValue { name: String },
    #[error("The {kind} backend was not activated for this mode.")]
    NotActivated { kind: &'static str },
    #[error("Could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed line {line} in '{path}': {reason}")]
    Malformed {
        path: String,
        line: usize,
        reason: String,
    },
    #[error(transparent)]
    Format(#[from] FormatError),
}

type BackendResult<T> = Result<T, BackendError>;

/// Everything a mode may touch while it runs. Built once per invocation and
/// lent to the mode for the duration of its `run`.
#[derive(Debug)]
pub struct Environment {
    memo_dir: PathBuf,
    snapshots: Option<SnapshotCatalog>,
    halos: Option<TextHalos>,
    trees: Option<ConsistentTrees>,
}

impl Environment {
    /// An environment with no active backends.
    pub fn new(memo_dir: impl Into<PathBuf>) -> Self {
        Self {
            memo_dir: memo_dir.into(),
            snapshots: None,
            halos: None,
            trees: None,
        }
    }

    pub fn memo_dir(&self) -> &Path {
        &self.memo_dir
    }

    pub fn snapshots(&self) -> BackendResult<&SnapshotCatalog> {
        self.snapshots
            .as_ref()
            .ok_or(BackendError::NotActivated { kind: "snapshot" })
    }

    pub fn halos(&self) -> BackendResult<&TextHalos> {
        self.halos
            .as_ref()
            .ok_or(BackendError::NotActivated { kind: "halo" })
    }

    pub fn trees(&self) -> BackendResult<&ConsistentTrees> {
        self.trees
            .as_ref()
            .ok_or(BackendError::NotActivated { kind: "tree" })
    }
}

/// Builds the environment for `mode`: snapshot catalog first, then halos and trees.
pub fn build_environment(mode: &str, config: &GlobalConfig) -> BackendResult<Environment> {
    let mut env = Environment::new(&config.memo_dir);
    init_catalogs(mode, config, &mut env)?;
    init_halos(mode, config, &mut env)?;
    Ok(env)
}

/// Activates the particle snapshot backend named by `SnapshotType`.
///
/// A nil snapshot type is fatal for the modes that read particles.
pub fn init_catalogs(mode: &str, config: &GlobalConfig, env: &mut Environment) -> BackendResult<()> {
    match config.snapshot_type {
        SnapshotType::Gotetra | SnapshotType::LGadget2 | SnapshotType::Artio => {
            let catalog = SnapshotCatalog::open(config, config.validate_formats)?;
            log::debug!(
                "Activated {} snapshots {:?} ({:?})",
                catalog.kind(),
                catalog.snapshots(),
                catalog.endianness()
            );
            env.snapshots = Some(catalog);
        }
        SnapshotType::Nil if PARTICLE_MODES.contains(&mode) => {
            return Err(BackendError::NilBackend {
                key: "SnapshotType",
                mode: mode.to_string(),
            });
        }
        SnapshotType::Nil => {
            log::debug!("SnapshotType is nil; no snapshot backend activated");
        }
    }
    Ok(())
}

/// Activates the halo and tree backends, unless `mode` never reads halos.
///
/// Both backends must be live for every other mode. The halo/tree pairing is
/// checked before either reader is opened.
pub fn init_halos(mode: &str, config: &GlobalConfig, env: &mut Environment) -> BackendResult<()> {
    if HALO_FREE_MODES.contains(&mode) {
        log::debug!("Mode '{}' does not use halo catalogs", mode);
        return Ok(());
    }

    match (config.halo_type, config.tree_type) {
        (HaloType::Nil, _) => Err(BackendError::NilBackend {
            key: "HaloType",
            mode: mode.to_string(),
        }),
        (_, TreeType::Nil) => Err(BackendError::NilBackend {
            key: "TreeType",
            mode: mode.to_string(),
        }),
        (HaloType::Text, TreeType::ConsistentTrees) => {
            env.halos = Some(TextHalos::open(config)?);
            env.trees = Some(ConsistentTrees::open(config)?);
            Ok(())
        }
    }
}

/// Lists the regular files in `dir` whose names pass `keep`, sorted by name.
/// Hidden files are skipped.
pub(crate) fn list_files(
    dir: &Path,
    key: &'static str,
    keep: impl Fn(&str) -> bool,
) -> BackendResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BackendError::MissingDirectory {
            key,
            path: dir.display().to_string(),
        });
    }
    let io_err = |source| BackendError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            log::warn!("Skipping non-UTF-8 file name in '{}'", dir.display());
            continue;
        };
        if name.starts_with('.') || !path.is_file() || !keep(name) {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}
