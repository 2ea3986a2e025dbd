// src/modes/coord.rs

use crate::backend::halo::HaloCatalog;
use crate::backend::{BackendError, Environment};
use crate::models::GlobalConfig;
use crate::modes::{Mode, ModeConfig, ModeError, ModeResult, parse_catalog, trimmed_string};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

const COORD_VALUES: [&str; 4] = ["X", "Y", "Z", "R200m"];

/// Attaches positions and radii from the halo catalogs to `ID Snap` rows.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct CoordMode {
    /// Extra halo values appended after `R200m`, in order.
    pub values: Vec<String>,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct CoordFlags {
    #[arg(long = "Values", value_delimiter = ',', value_parser = trimmed_string)]
    values: Option<Vec<String>>,
}

impl ModeConfig for CoordMode {
    const NAME: &'static str = "coord";
    type Flags = CoordFlags;

    fn apply_flags(&mut self, flags: CoordFlags) {
        if let Some(values) = flags.values {
            self.values = values;
        }
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(name) = self.values.iter().find(|name| name.is_empty()) {
            return Err(format!("Values contains an empty name: {name:?}."));
        }
        Ok(())
    }
}

impl Mode for CoordMode {
    fn run(
        &self,
        _global: &GlobalConfig,
        env: &Environment,
        lines: &[String],
    ) -> ModeResult<Vec<String>> {
        let halos = env.halos()?;
        let wanted: Vec<&str> = COORD_VALUES
            .iter()
            .copied()
            .chain(self.values.iter().map(String::as_str))
            .collect();
        if let Some(missing) = wanted.iter().find(|name| !halos.has_value(name)) {
            return Err(BackendError::MissingValue {
                name: missing.to_string(),
            }
            .into());
        }

        let rows = parse_catalog(lines, 2)?;
        let mut catalogs: HashMap<i64, HaloCatalog> = HashMap::new();
        let mut out = Vec::with_capacity(rows.len() + 1);
        out.push(format!("# ID Snap {}", wanted.join(" ")));

        for row in &rows {
            let catalog = match catalogs.entry(row.snap) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(halos.read(row.snap)?),
            };
            let index = catalog.row_of(row.id).ok_or(ModeError::UnknownHalo {
                id: row.id,
                snap: row.snap,
            })?;

            let mut line = format!("{} {}", row.id, row.snap);
            for name in &wanted {
                let value = catalog.values(name)?.get(index).copied().ok_or_else(|| {
                    BackendError::MissingValue {
                        name: name.to_string(),
                    }
                })?;
                line.push_str(&format!(" {value}"));
            }
            out.push(line);
        }
        Ok(out)
    }
}
