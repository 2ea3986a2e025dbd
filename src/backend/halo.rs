// src/backend/halo.rs

use crate::backend::{BackendError, list_files};
use crate::models::{GlobalConfig, PositionUnits};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Columns whose values are lengths and follow `HaloPositionUnits`.
const LENGTH_VALUES: &[&str] = &["X", "Y", "Z", "R200m"];

/// Plain-text halo catalogs, one file per snapshot.
///
/// The files in `HaloDir` are sorted by name; file `i` holds snapshot
/// `i + HSnapOffset`. Only the columns named in `HaloValueNames` are read.
#[derive(Debug, Clone)]
pub struct TextHalos {
    files: Vec<PathBuf>,
    snap_offset: i64,
    columns: Vec<(String, usize)>,
    position_units: PositionUnits,
}

/// The requested columns of one snapshot's halo catalog. Lengths are in Mpc/h.
#[derive(Debug, Clone, Default)]
pub struct HaloCatalog {
    pub snap: i64,
    ids: Vec<i64>,
    values: HashMap<String, Vec<f64>>,
    rows_by_id: HashMap<i64, usize>,
}

impl TextHalos {
    pub fn open(config: &GlobalConfig) -> Result<Self, BackendError> {
        let dir = Path::new(&config.halo_dir);
        let files = list_files(dir, "HaloDir", |_| true)?;
        if files.is_empty() {
            return Err(BackendError::EmptyDirectory {
                key: "HaloDir",
                path: dir.display().to_string(),
            });
        }

        let columns = config
            .halo_value_names
            .iter()
            .cloned()
            .zip(config.halo_value_columns.iter().map(|c| usize::try_from(*c).unwrap_or(usize::MAX)))
            .collect();

        log::debug!(
            "Text halo backend: {} catalog file(s) in '{}'",
            files.len(),
            dir.display()
        );
        Ok(Self {
            files,
            snap_offset: config.h_snap_offset,
            columns,
            position_units: config.halo_position_units,
        })
    }

    /// Whether the catalogs provide a column with this name.
    pub fn has_value(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// The catalog file for snapshot `snap`.
    pub fn snapshot_file(&self, snap: i64) -> Result<&Path, BackendError> {
        let out_of_range = || BackendError::HaloSnapshotOutOfRange {
            snap,
            first: self.snap_offset,
            count: self.files.len(),
        };
        let index = snap
            .checked_sub(self.snap_offset)
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(out_of_range)?;
        self.files
            .get(index)
            .map(PathBuf::as_path)
            .ok_or_else(out_of_range)
    }

    /// Reads the configured columns of snapshot `snap`.
    pub fn read(&self, snap: i64) -> Result<HaloCatalog, BackendError> {
        let path = self.snapshot_file(snap)?;
        let content = fs::read_to_string(path).map_err(|source| BackendError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut catalog = HaloCatalog {
            snap,
            ..HaloCatalog::default()
        };
        let per_mpc = match self.position_units {
            PositionUnits::MpcPerH => 1.0,
            PositionUnits::KpcPerH => 1000.0,
        };

        for (line_number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let malformed = |reason: String| BackendError::Malformed {
                path: path.display().to_string(),
                line: line_number + 1,
                reason,
            };

            for (name, column) in &self.columns {
                let raw = fields.get(*column).ok_or_else(|| {
                    malformed(format!(
                        "column {column} ('{name}') is missing; the line has {} columns",
                        fields.len()
                    ))
                })?;
                if name == "ID" {
                    let id = raw
                        .parse::<i64>()
                        .map_err(|e| malformed(format!("ID '{raw}' is not an integer: {e}")))?;
                    catalog.rows_by_id.insert(id, catalog.ids.len());
                    catalog.ids.push(id);
                } else {
                    let mut value = raw
                        .parse::<f64>()
                        .map_err(|e| malformed(format!("{name} '{raw}' is not a number: {e}")))?;
                    if LENGTH_VALUES.contains(&name.as_str()) {
                        value /= per_mpc;
                    }
                    catalog.values.entry(name.clone()).or_default().push(value);
                }
            }
        }

        log::debug!(
            "Read {} halo(s) for snapshot {} from '{}'",
            catalog.len(),
            snap,
            path.display()
        );
        Ok(catalog)
    }
}

impl HaloCatalog {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// One column of values, aligned with `ids()`.
    pub fn values(&self, name: &str) -> Result<&[f64], BackendError> {
        self.values
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| BackendError::MissingValue {
                name: name.to_string(),
            })
    }

    /// The row holding halo `id`, if the catalog contains it.
    pub fn row_of(&self, id: i64) -> Option<usize> {
        self.rows_by_id.get(&id).copied()
    }
}
