// src/modes/id.rs

use crate::backend::Environment;
use crate::backend::halo::HaloCatalog;
use crate::models::GlobalConfig;
use crate::modes::{Mode, ModeConfig, ModeError, ModeResult, trimmed_int};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the values in `IDs` (or the `IDStart..IDEnd` range) are interpreted.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum IdType {
    /// Catalog IDs.
    #[default]
    #[serde(rename = "id")]
    #[value(name = "id")]
    Id,
    /// Ranks in order of decreasing M200m; rank 0 is the most massive halo.
    #[serde(rename = "M200m", alias = "m200m")]
    #[value(name = "M200m", alias = "m200m")]
    M200m,
}

/// What happens to halos that sit inside the R200m sphere of a more massive halo.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionStrategy {
    /// Subhalos are selected like any other halo.
    #[default]
    None,
    /// Subhalos are dropped, and M200m ranks count hosts only.
    Subhalo,
    /// The selected hosts are replaced by their subhalos.
    Neighbor,
}

/// Selects halos from a single snapshot's catalog.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct IdMode {
    #[serde(rename = "IDs")]
    pub ids: Vec<i64>,
    #[serde(rename = "IDType")]
    pub id_type: IdType,
    #[serde(rename = "IDStart")]
    pub id_start: i64,
    #[serde(rename = "IDEnd")]
    pub id_end: i64,
    /// `-1` selects `SnapMax`.
    #[serde(rename = "Snap")]
    pub snap: i64,
    #[serde(rename = "ExclusionStrategy")]
    pub exclusion_strategy: ExclusionStrategy,
}

impl Default for IdMode {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            id_type: IdType::Id,
            id_start: 0,
            id_end: 0,
            snap: -1,
            exclusion_strategy: ExclusionStrategy::None,
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct IdFlags {
    /// Comma-separated IDs or mass ranks.
    #[arg(long = "IDs", value_delimiter = ',', value_parser = trimmed_int)]
    ids: Option<Vec<i64>>,
    #[arg(long = "IDType", value_enum)]
    id_type: Option<IdType>,
    #[arg(long = "IDStart", allow_negative_numbers = true)]
    id_start: Option<i64>,
    #[arg(long = "IDEnd", allow_negative_numbers = true)]
    id_end: Option<i64>,
    #[arg(long = "Snap", allow_negative_numbers = true)]
    snap: Option<i64>,
    #[arg(long = "ExclusionStrategy", value_enum)]
    exclusion_strategy: Option<ExclusionStrategy>,
}

impl ModeConfig for IdMode {
    const NAME: &'static str = "id";
    type Flags = IdFlags;

    fn apply_flags(&mut self, flags: IdFlags) {
        if let Some(ids) = flags.ids {
            self.ids = ids;
        }
        if let Some(id_type) = flags.id_type {
            self.id_type = id_type;
        }
        if let Some(id_start) = flags.id_start {
            self.id_start = id_start;
        }
        if let Some(id_end) = flags.id_end {
            self.id_end = id_end;
        }
        if let Some(snap) = flags.snap {
            self.snap = snap;
        }
        if let Some(strategy) = flags.exclusion_strategy {
            self.exclusion_strategy = strategy;
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.snap < -1 {
            return Err(format!("Snap = {} is not a snapshot index.", self.snap));
        }
        if self.ids.is_empty() && self.id_end <= self.id_start {
            return Err(format!(
                "IDs is empty, so IDEnd ({}) must be larger than IDStart ({}).",
                self.id_end, self.id_start
            ));
        }
        if self.id_type == IdType::M200m {
            let first_rank = self.ids.iter().copied().min().unwrap_or(self.id_start);
            if first_rank < 0 {
                return Err(format!("M200m ranks must be non-negative, got {first_rank}."));
            }
        }
        Ok(())
    }
}

impl Mode for IdMode {
    fn run(
        &self,
        global: &GlobalConfig,
        env: &Environment,
        _lines: &[String],
    ) -> ModeResult<Vec<String>> {
        let snap = if self.snap == -1 { global.snap_max } else { self.snap };
        let catalog = env.halos()?.read(snap)?;
        let hosts = match self.exclusion_strategy {
            ExclusionStrategy::None => HashMap::new(),
            ExclusionStrategy::Subhalo | ExclusionStrategy::Neighbor => {
                find_hosts(&Halo::all(&catalog)?)
            }
        };

        let selected = match self.id_type {
            IdType::Id => self.select_by_id(&catalog)?,
            IdType::M200m => self.select_by_rank(&catalog, &hosts)?,
        };
        let ids: Vec<i64> = match self.exclusion_strategy {
            ExclusionStrategy::None => selected,
            ExclusionStrategy::Subhalo => selected
                .into_iter()
                .filter(|id| !hosts.contains_key(id))
                .collect(),
            ExclusionStrategy::Neighbor => subhalos_of(&catalog, &hosts, &selected),
        };
        log::debug!("id: selected {} halo(s) from snapshot {}", ids.len(), snap);

        let mut out = Vec::with_capacity(ids.len() + 1);
        out.push("# ID Snap".to_string());
        out.extend(ids.iter().map(|id| format!("{id} {snap}")));
        Ok(out)
    }
}

impl IdMode {
    fn select_by_id(&self, catalog: &HaloCatalog) -> ModeResult<Vec<i64>> {
        if self.ids.is_empty() {
            let range = self.id_start..self.id_end;
            return Ok(catalog
                .ids()
                .iter()
                .copied()
                .filter(|id| range.contains(id))
                .collect());
        }

        for &id in &self.ids {
            if catalog.row_of(id).is_none() {
                return Err(ModeError::UnknownHalo {
                    id,
                    snap: catalog.snap,
                });
            }
        }
        Ok(self.ids.clone())
    }

    /// Ranks count every halo not listed in `hosts`, i.e. subhalos are
    /// skipped whenever an exclusion strategy is active.
    fn select_by_rank(
        &self,
        catalog: &HaloCatalog,
        hosts: &HashMap<i64, i64>,
    ) -> ModeResult<Vec<i64>> {
        let masses = catalog.values("M200m")?;
        let mut by_mass: Vec<(i64, f64)> = catalog
            .ids()
            .iter()
            .copied()
            .zip(masses.iter().copied())
            .filter(|(id, _)| !hosts.contains_key(id))
            .collect();
        // Stable, so equal masses keep catalog order.
        by_mass.sort_by(|a, b| b.1.total_cmp(&a.1));

        if self.ids.is_empty() {
            // Ranks past the end of the catalog select nothing.
            let end = self
                .id_end
                .min(i64::try_from(by_mass.len()).unwrap_or(i64::MAX));
            return Ok((self.id_start..end)
                .filter_map(|rank| usize::try_from(rank).ok())
                .filter_map(|rank| by_mass.get(rank).map(|(id, _)| *id))
                .collect());
        }

        self.ids
            .iter()
            .copied()
            .map(|rank| {
                usize::try_from(rank)
                    .ok()
                    .and_then(|r| by_mass.get(r))
                    .map(|(id, _)| *id)
                    .ok_or_else(|| ModeError::Invalid {
                        mode: Self::NAME,
                        reason: format!(
                            "M200m rank {rank} is out of range; snapshot {} has {} halo(s).",
                            catalog.snap,
                            by_mass.len()
                        ),
                    })
            })
            .collect()
    }
}

/// The parts of a halo that decide whether it is a subhalo.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Halo {
    id: i64,
    m200m: f64,
    position: [f64; 3],
    r200m: f64,
}

impl Halo {
    fn all(catalog: &HaloCatalog) -> ModeResult<Vec<Self>> {
        let masses = catalog.values("M200m")?;
        let xs = catalog.values("X")?;
        let ys = catalog.values("Y")?;
        let zs = catalog.values("Z")?;
        let radii = catalog.values("R200m")?;

        Ok(catalog
            .ids()
            .iter()
            .zip(masses)
            .zip(xs.iter().zip(ys).zip(zs))
            .zip(radii)
            .map(|(((id, m200m), ((x, y), z)), r200m)| Self {
                id: *id,
                m200m: *m200m,
                position: [*x, *y, *z],
                r200m: *r200m,
            })
            .collect())
    }

    fn encloses(&self, other: &Self) -> bool {
        let dist2: f64 = self
            .position
            .iter()
            .zip(&other.position)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        dist2 < self.r200m * self.r200m
    }
}

/// Maps every subhalo ID to the ID of its host: the most massive halo whose
/// R200m sphere contains it. Halos missing from the map are hosts.
fn find_hosts(halos: &[Halo]) -> HashMap<i64, i64> {
    halos
        .iter()
        .filter_map(|sub| {
            halos
                .iter()
                .filter(|host| host.m200m > sub.m200m && host.encloses(sub))
                .max_by(|a, b| a.m200m.total_cmp(&b.m200m))
                .map(|host| (sub.id, host.id))
        })
        .collect()
}

/// The subhalos of each selected host, host by host, in catalog order.
/// Selected halos that are themselves subhalos contribute nothing.
fn subhalos_of(catalog: &HaloCatalog, hosts: &HashMap<i64, i64>, selected: &[i64]) -> Vec<i64> {
    selected
        .iter()
        .filter(|id| !hosts.contains_key(*id))
        .flat_map(|host| {
            catalog
                .ids()
                .iter()
                .copied()
                .filter(move |sub| hosts.get(sub) == Some(host))
        })
        .collect()
}
