// src/core/config_resolver.rs

use crate::constants::GLOBAL_CONFIG_ENV_VAR;
use crate::core::arg_parser::Classified;
use crate::core::config_loader::{self, ConfigError};
use crate::models::GlobalConfig;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(
        "${env_var} has been set, so you may only pass a single config file as a parameter (got {count})."
    )]
    AmbiguousGlobalConfig { env_var: &'static str, count: usize },
    #[error("No config files provided in command line arguments, and ${env_var} is not set.")]
    NoConfig { env_var: &'static str },
    #[error("Passed too many config files as arguments ({count}); at most 2 are allowed.")]
    TooManyConfigs { count: usize },
    #[error(transparent)]
    Load(#[from] ConfigError),
}

type ResolveResult<T> = Result<T, ResolveError>;

/// A loaded global configuration together with the file it came from.
/// The path is the provenance recorded in the memoization directory.
#[derive(Debug, Clone)]
pub struct ResolvedGlobal {
    pub path: PathBuf,
    pub config: GlobalConfig,
}

/// Reads the global configuration override from the process environment.
/// An empty value counts as unset.
pub fn global_config_override() -> Option<PathBuf> {
    env::var_os(GLOBAL_CONFIG_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Decides which file holds the global configuration, without touching the disk.
///
/// | override | trailing configs | global file           |
/// |----------|------------------|-----------------------|
/// | set      | 0 or 1           | the override          |
/// | set      | 2+               | error (ambiguous)     |
/// | unset    | 0                | error (none provided) |
/// | unset    | 1                | the only one          |
/// | unset    | 2                | the second-to-last    |
/// | unset    | 3+               | error (too many)      |
pub fn global_config_path(
    classified: &Classified<'_>,
    env_override: Option<&Path>,
) -> ResolveResult<PathBuf> {
    let count = classified.config_count();

    if let Some(path) = env_override {
        if count > 1 {
            return Err(ResolveError::AmbiguousGlobalConfig {
                env_var: GLOBAL_CONFIG_ENV_VAR,
                count,
            });
        }
        log::debug!("Global config taken from ${}", GLOBAL_CONFIG_ENV_VAR);
        return Ok(path.to_path_buf());
    }

    let name = match count {
        0 => {
            return Err(ResolveError::NoConfig {
                env_var: GLOBAL_CONFIG_ENV_VAR,
            });
        }
        1 => classified.last_config(),
        2 => classified.second_to_last_config(),
        _ => return Err(ResolveError::TooManyConfigs { count }),
    };
    name.map(PathBuf::from)
        .ok_or(ResolveError::NoConfig {
            env_var: GLOBAL_CONFIG_ENV_VAR,
        })
}

/// Locates and loads the single global configuration for this invocation.
pub fn resolve_global_config(
    classified: &Classified<'_>,
    env_override: Option<&Path>,
) -> ResolveResult<ResolvedGlobal> {
    let path = global_config_path(classified, env_override)?;
    let config = config_loader::load_global_config(&path)?;
    Ok(ResolvedGlobal { path, config })
}

/// Decides which trailing token, if any, is the mode configuration file.
/// `None` means the mode runs on its built-in defaults.
pub fn mode_config_path<'a>(
    classified: &Classified<'a>,
    env_override_set: bool,
) -> Option<&'a Path> {
    match (env_override_set, classified.config_count()) {
        (true, 1) | (false, 2) => classified.last_config().map(Path::new),
        _ => None,
    }
}
