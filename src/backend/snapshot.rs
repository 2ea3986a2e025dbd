// src/backend/snapshot.rs

use crate::backend::BackendError;
use crate::core::format;
use crate::models::{Endianness, FormatMeaning, GlobalConfig, SnapshotType};
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// A handle on a set of particle snapshot files.
///
/// The handle only knows where the files live and how they are laid out; the
/// particle payloads are read by format-specific readers outside this crate.
#[derive(Debug, Clone)]
pub struct SnapshotCatalog {
    kind: SnapshotType,
    format: String,
    meanings: Vec<FormatMeaning>,
    block_mins: Vec<i64>,
    block_maxes: Vec<i64>,
    snap_min: i64,
    snap_max: i64,
    endianness: Endianness,
}

impl SnapshotCatalog {
    /// Builds the handle from the global configuration. With `validate`, every
    /// file named by the format for every snapshot and block must exist.
    pub fn open(config: &GlobalConfig, validate: bool) -> Result<Self, BackendError> {
        if config.snapshot_format.is_empty() {
            return Err(BackendError::UnsetFormat {
                kind: config.snapshot_type.to_string(),
            });
        }

        let catalog = Self {
            kind: config.snapshot_type,
            format: config.snapshot_format.clone(),
            meanings: config.snapshot_format_meanings.clone(),
            block_mins: config.block_mins.clone(),
            block_maxes: config.block_maxes.clone(),
            snap_min: config.snap_min,
            snap_max: config.snap_max,
            endianness: config.endianness,
        };

        if validate {
            catalog.validate_files()?;
        }
        Ok(catalog)
    }

    pub fn kind(&self) -> SnapshotType {
        self.kind
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The inclusive range of snapshot indices covered by the catalog.
    pub fn snapshots(&self) -> RangeInclusive<i64> {
        self.snap_min..=self.snap_max
    }

    /// Every block coordinate, in row-major order (last axis fastest).
    /// A catalog without block axes has a single, empty coordinate.
    pub fn blocks(&self) -> Vec<Vec<i64>> {
        let mut blocks = vec![Vec::new()];
        for (min, max) in self.block_mins.iter().zip(&self.block_maxes) {
            blocks = blocks
                .into_iter()
                .flat_map(|prefix| {
                    (*min..=*max).map(move |coord| {
                        let mut block = prefix.clone();
                        block.push(coord);
                        block
                    })
                })
                .collect();
        }
        blocks
    }

    /// The file holding one block of one snapshot.
    pub fn file_name(&self, snap: i64, block: &[i64]) -> Result<PathBuf, BackendError> {
        if !self.snapshots().contains(&snap) {
            return Err(BackendError::SnapshotOutOfRange {
                snap,
                min: self.snap_min,
                max: self.snap_max,
            });
        }
        Ok(PathBuf::from(format::expand(
            &self.format,
            &self.meanings,
            snap,
            block,
        )?))
    }

    /// Every file that makes up one snapshot.
    pub fn files(&self, snap: i64) -> Result<Vec<PathBuf>, BackendError> {
        self.blocks()
            .iter()
            .map(|block| self.file_name(snap, block))
            .collect()
    }

    fn validate_files(&self) -> Result<(), BackendError> {
        log::debug!(
            "Validating {} snapshot file layout for snapshots {}..={}",
            self.kind,
            self.snap_min,
            self.snap_max
        );
        for snap in self.snapshots() {
            for path in self.files(snap)? {
                if !path.is_file() {
                    return Err(BackendError::MissingSnapshotFile {
                        kind: self.kind.to_string(),
                        snap,
                        path: path.display().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
