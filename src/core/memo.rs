// src/core/memo.rs

//! The memoization-directory guard.
//!
//! Every file a mode writes into `MemoDir` is only meaningful under the global
//! configuration that produced it. The first invocation that uses a directory
//! copies its configuration file in as `memo.config`; every later invocation
//! must agree with that snapshot on all keys in `CACHE_FIELDS`. A mismatch is
//! fatal. Nothing here ever rewrites or deletes an existing snapshot.
//!
//! The protocol is not safe against two invocations seeding the same empty
//! directory at the same moment. Serialize first use externally.

use crate::core::{
    cache,
    config_loader::{self, ConfigError},
    paths,
};
use crate::models::GlobalConfig;
use std::{
    fs::{self, OpenOptions},
    io::{self, ErrorKind},
    path::Path,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoError {
    #[error("Could not create MemoDir '{path}': {source}")]
    CreateDir {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Could not copy '{from}' into the MemoDir as '{to}': {source}")]
    Seed {
        from: String,
        to: String,
        #[source]
        source: io::Error,
    },
    #[error("Could not inspect '{path}': {source}")]
    Inspect {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("The MemoDir snapshot could not be read: {0}")]
    Snapshot(#[source] ConfigError),
    #[error(
        "The variables in the config file '{config_file}' do not match the variables used when \
         creating the MemoDir, '{memo_dir}'. Mismatched variables: {fields}. These variables can \
         be compared by inspecting '{config_file}' and '{memo_file}'. Either point MemoDir at a \
         fresh directory or reconcile the two files by hand."
    )]
    Mismatch {
        config_file: String,
        memo_dir: String,
        memo_file: String,
        fields: String,
    },
}

/// What the guard did to accept the memoization directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoStatus {
    /// The directory had no snapshot; the current config file was copied in.
    Seeded,
    /// The snapshot is byte-identical to the current config file.
    Identical,
    /// The snapshot differs textually but agrees on every cache-relevant key.
    Compatible,
}

/// Validates `memo_dir` against the configuration loaded from `config_file`,
/// seeding the snapshot if the directory has never been used.
pub fn check_memo_dir(
    memo_dir: &Path,
    config_file: &Path,
    config: &GlobalConfig,
) -> Result<MemoStatus, MemoError> {
    let memo_file = paths::memo_config_path(memo_dir);

    let snapshot_exists = memo_file.try_exists().map_err(|source| MemoError::Inspect {
        path: memo_file.display().to_string(),
        source,
    })?;

    if !snapshot_exists {
        if seed(memo_dir, config_file, &memo_file)? {
            log::info!(
                "Seeded MemoDir '{}' with a copy of '{}'",
                memo_dir.display(),
                config_file.display()
            );
            return Ok(MemoStatus::Seeded);
        }
        // Another invocation seeded the directory between our check and our copy.
        log::warn!(
            "MemoDir '{}' was seeded concurrently; validating against the new snapshot",
            memo_dir.display()
        );
    }

    validate(memo_dir, config_file, config, &memo_file)
}

/// Copies the config file into the memo directory. Returns `false` when the
/// snapshot already exists by the time the copy starts.
fn seed(memo_dir: &Path, config_file: &Path, memo_file: &Path) -> Result<bool, MemoError> {
    fs::create_dir_all(memo_dir).map_err(|source| MemoError::CreateDir {
        path: memo_dir.display().to_string(),
        source,
    })?;

    let seed_err = |source: io::Error| MemoError::Seed {
        from: config_file.display().to_string(),
        to: memo_file.display().to_string(),
        source,
    };

    let mut src = fs::File::open(config_file).map_err(seed_err)?;
    let mut dst = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(memo_file)
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(seed_err(e)),
    };
    io::copy(&mut src, &mut dst).map_err(seed_err)?;
    dst.sync_all().map_err(seed_err)?;
    Ok(true)
}

fn validate(
    memo_dir: &Path,
    config_file: &Path,
    config: &GlobalConfig,
    memo_file: &Path,
) -> Result<MemoStatus, MemoError> {
    let inspect_err = |path: &Path| {
        let path = path.display().to_string();
        move |source: io::Error| MemoError::Inspect { path, source }
    };
    let current = cache::fingerprint(config_file).map_err(inspect_err(config_file))?;
    let recorded = cache::fingerprint(memo_file).map_err(inspect_err(memo_file))?;
    if current == recorded {
        log::debug!("MemoDir snapshot is byte-identical to '{}'", config_file.display());
        return Ok(MemoStatus::Identical);
    }

    let memo_config = config_loader::load_global_config(memo_file).map_err(MemoError::Snapshot)?;
    let mismatches = config.cache_mismatches(&memo_config);
    if !mismatches.is_empty() {
        return Err(MemoError::Mismatch {
            config_file: config_file.display().to_string(),
            memo_dir: paths::display_path(memo_dir),
            memo_file: memo_file.display().to_string(),
            fields: mismatches.join(", "),
        });
    }

    log::debug!(
        "MemoDir snapshot differs from '{}' only in runtime settings",
        config_file.display()
    );
    Ok(MemoStatus::Compatible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_config(dir: &Path, name: &str, memo_dir: &Path, extra: &str) -> (PathBuf, GlobalConfig) {
        let path = dir.join(name);
        let content = format!("MemoDir = \"{}\"\n{}", memo_dir.display(), extra);
        fs::write(&path, content).unwrap();
        let config = config_loader::load_global_config(&path).unwrap();
        (path, config)
    }

    #[test]
    fn test_first_use_seeds_snapshot() {
        let tmp = TempDir::new().unwrap();
        let memo_dir = tmp.path().join("memo");
        let (path, config) = write_config(tmp.path(), "a.config", &memo_dir, "Threads = 4\n");

        let status = check_memo_dir(&memo_dir, &path, &config).unwrap();

        assert_eq!(status, MemoStatus::Seeded);
        let snapshot = fs::read_to_string(memo_dir.join("memo.config")).unwrap();
        assert_eq!(snapshot, fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn test_revalidation_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let memo_dir = tmp.path().join("memo");
        let (path, config) = write_config(tmp.path(), "a.config", &memo_dir, "");

        check_memo_dir(&memo_dir, &path, &config).unwrap();
        let memo_file = memo_dir.join("memo.config");
        let before = fs::read(&memo_file).unwrap();
        let modified_before = fs::metadata(&memo_file).unwrap().modified().unwrap();

        let status = check_memo_dir(&memo_dir, &path, &config).unwrap();

        assert_eq!(status, MemoStatus::Identical);
        assert_eq!(fs::read(&memo_file).unwrap(), before);
        assert_eq!(
            fs::metadata(&memo_file).unwrap().modified().unwrap(),
            modified_before
        );
    }

    #[test]
    fn test_cache_relevant_difference_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let memo_dir = tmp.path().join("memo");
        let (a_path, a_config) = write_config(tmp.path(), "a.config", &memo_dir, "");
        check_memo_dir(&memo_dir, &a_path, &a_config).unwrap();

        let (b_path, b_config) = write_config(
            tmp.path(),
            "b.config",
            &memo_dir,
            "HaloType = \"Text\"\nHaloValueColumns = [1, 2, 3, 4, 5]\n\
             HaloValueNames = [\"ID\", \"X\", \"Y\", \"Z\", \"M200m\"]\n",
        );
        let err = check_memo_dir(&memo_dir, &b_path, &b_config).unwrap_err();

        match err {
            MemoError::Mismatch { fields, .. } => {
                assert_eq!(fields, "HaloType, HaloValueColumns, HaloValueNames");
            }
            other => panic!("expected a mismatch, got {other:?}"),
        }
        // The first snapshot is untouched.
        assert_eq!(
            fs::read_to_string(memo_dir.join("memo.config")).unwrap(),
            fs::read_to_string(&a_path).unwrap()
        );
    }

    #[test]
    fn test_runtime_only_difference_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let memo_dir = tmp.path().join("memo");
        let (a_path, a_config) = write_config(tmp.path(), "a.config", &memo_dir, "Threads = 1\n");
        check_memo_dir(&memo_dir, &a_path, &a_config).unwrap();

        let (b_path, b_config) =
            write_config(tmp.path(), "b.config", &memo_dir, "Threads = 32\n");
        let status = check_memo_dir(&memo_dir, &b_path, &b_config).unwrap();

        assert_eq!(status, MemoStatus::Compatible);
    }

    #[test]
    fn test_corrupt_snapshot_is_reported() {
        let tmp = TempDir::new().unwrap();
        let memo_dir = tmp.path().join("memo");
        fs::create_dir_all(&memo_dir).unwrap();
        fs::write(memo_dir.join("memo.config"), "this is = = not toml").unwrap();
        let (path, config) = write_config(tmp.path(), "a.config", &memo_dir, "");

        let err = check_memo_dir(&memo_dir, &path, &config).unwrap_err();
        assert!(matches!(err, MemoError::Snapshot(_)));
    }
}
