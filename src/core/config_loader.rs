//! # Config Loader
//!
//! Reads configuration files from disk. The global configuration is parsed,
//! has its paths expanded and is validated as a whole; mode configurations are
//! parsed on top of the mode's defaults and validated by the mode itself.
use crate::{
    core::{format, paths},
    models::{GlobalConfig, HaloType},
};
use serde::de::DeserializeOwned;
use std::{collections::HashSet, fs, path::Path};
use thiserror::Error;

/// Halo catalog columns every `Text` halo catalog must provide.
pub const REQUIRED_HALO_VALUES: &[&str] = &["ID", "X", "Y", "Z", "M200m"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Error parsing config file '{path}': {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid value in config file '{path}': {reason}")]
    Invalid { path: String, reason: String },
}

type ConfigResult<T> = Result<T, ConfigError>;

/// Reads a TOML file into `T`. Keys absent from the file keep the value that
/// `T`'s serde defaults give them.
pub fn read_toml<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.display().to_string(),
        source,
    })
}

/// Loads, expands and validates a global configuration file.
pub fn load_global_config(path: &Path) -> ConfigResult<GlobalConfig> {
    log::debug!("Loading global config from '{}'", path.display());
    let mut config: GlobalConfig = read_toml(path)?;
    expand_paths(&mut config).map_err(|e| ConfigError::Invalid {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    validate_global_config(&config).map_err(|reason| ConfigError::Invalid {
        path: path.display().to_string(),
        reason,
    })?;
    Ok(config)
}

fn expand_paths(config: &mut GlobalConfig) -> Result<(), paths::PathError> {
    config.snapshot_format = paths::expand_path(&config.snapshot_format)?;
    config.halo_dir = paths::expand_path(&config.halo_dir)?;
    config.tree_dir = paths::expand_path(&config.tree_dir)?;
    config.memo_dir = paths::expand_path(&config.memo_dir)?;
    Ok(())
}

/// Checks the cross-field invariants of a global configuration.
/// Returns a human-readable reason for the first violation found.
pub fn validate_global_config(config: &GlobalConfig) -> Result<(), String> {
    if config.version.trim().is_empty() {
        return Err("Version must not be empty.".to_string());
    }
    if config.memo_dir.is_empty() {
        return Err("MemoDir must be set.".to_string());
    }

    if config.block_mins.len() != config.block_maxes.len() {
        return Err(format!(
            "BlockMins has {} entries but BlockMaxes has {}.",
            config.block_mins.len(),
            config.block_maxes.len()
        ));
    }
    if let Some((axis, (min, max))) = config
        .block_mins
        .iter()
        .zip(&config.block_maxes)
        .enumerate()
        .find(|(_, (min, max))| min > max)
    {
        return Err(format!(
            "BlockMins[{axis}] = {min} is larger than BlockMaxes[{axis}] = {max}."
        ));
    }
    if config.snap_min > config.snap_max {
        return Err(format!(
            "SnapMin = {} is larger than SnapMax = {}.",
            config.snap_min, config.snap_max
        ));
    }

    format::check_layout(
        &config.snapshot_format,
        &config.snapshot_format_meanings,
        config.block_mins.len(),
    )
    .map_err(|e| e.to_string())?;

    validate_halo_layout(config)
}

fn validate_halo_layout(config: &GlobalConfig) -> Result<(), String> {
    if config.halo_value_columns.len() != config.halo_value_names.len() {
        return Err(format!(
            "HaloValueColumns has {} entries but HaloValueNames has {}.",
            config.halo_value_columns.len(),
            config.halo_value_names.len()
        ));
    }
    if let Some(column) = config.halo_value_columns.iter().find(|c| **c < 0) {
        return Err(format!("HaloValueColumns contains the negative index {column}."));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = config
        .halo_value_names
        .iter()
        .find(|name| !seen.insert(name.as_str()))
    {
        return Err(format!("HaloValueNames lists '{dup}' more than once."));
    }

    if config.halo_type != HaloType::Nil {
        let missing: Vec<&str> = REQUIRED_HALO_VALUES
            .iter()
            .copied()
            .filter(|name| !seen.contains(name))
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "HaloType '{}' requires HaloValueNames to include {}.",
                config.halo_type,
                missing.join(", ")
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".config")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let file = write_config(r#"MemoDir = "/tmp/memo""#);
        let config = load_global_config(file.path()).unwrap();
        assert_eq!(config.memo_dir, "/tmp/memo");
        assert_eq!(config.threads, -1);
        assert_eq!(config.halo_type, HaloType::Nil);
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let err = load_global_config(Path::new("/no/such/file.config")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/no/such/file.config"));
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let file = write_config("MemoDir = ");
        let err = load_global_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse { .. }));
    }

    #[test]
    fn test_memo_dir_is_required() {
        let file = write_config(r#"Threads = 4"#);
        let err = load_global_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("MemoDir must be set"));
    }

    #[test]
    fn test_block_ranges_must_agree() {
        let file = write_config(
            r#"
            MemoDir = "/tmp/memo"
            BlockMins = [0, 0]
            BlockMaxes = [1]
            "#,
        );
        let err = load_global_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("BlockMaxes has 1"));
    }

    #[test]
    fn test_format_verbs_must_match_meanings() {
        let file = write_config(
            r#"
            MemoDir = "/tmp/memo"
            SnapshotType = "LGadget-2"
            SnapshotFormat = "/sims/snap_%03d.%d"
            SnapshotFormatMeanings = ["Snapshot"]
            "#,
        );
        let err = load_global_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("2 verb(s)"));
    }

    #[test]
    fn test_text_halos_require_core_columns() {
        let file = write_config(
            r#"
            MemoDir = "/tmp/memo"
            HaloType = "Text"
            HaloValueColumns = [1, 17, 18]
            HaloValueNames = ["ID", "X", "Y"]
            "#,
        );
        let err = load_global_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Z, M200m"));
    }

    #[test]
    fn test_duplicate_halo_names_are_rejected() {
        let file = write_config(
            r#"
            MemoDir = "/tmp/memo"
            HaloValueColumns = [1, 2]
            HaloValueNames = ["ID", "ID"]
            "#,
        );
        let err = load_global_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
