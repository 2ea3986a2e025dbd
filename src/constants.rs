// src/constants.rs

/// Environment variable that names the global configuration file.
pub const GLOBAL_CONFIG_ENV_VAR: &str = "SHELLFISH_GLOBAL_CONFIG";

/// Suffix that marks a command-line token as a configuration file.
pub const CONFIG_SUFFIX: &str = ".config";

/// The name of the configuration snapshot kept inside a memoization directory.
pub const MEMO_CONFIG_FILENAME: &str = "memo.config";

/// The name of the memoized main-progenitor table (inside the memo directory).
pub const MMP_MEMO_FILENAME: &str = "mmp.txt";

/// Prefix of the line that signals an upstream pipeline failure.
pub const FAILURE_MARKER_PREFIX: &str = "Shellfish";

/// The line printed to stdout whenever an invocation aborts.
pub const TERMINATION_NOTICE: &str = "Shellfish terminating.";

/// Modes that only consume already-derived catalogs and never touch halo or tree data.
pub const HALO_FREE_MODES: &[&str] = &["prof", "shell", "stats"];

/// Modes that read particle snapshots and so need a live `SnapshotType`.
pub const PARTICLE_MODES: &[&str] = &["prof", "shell"];

/// Prefix of consistent-trees forest file names.
pub const TREE_FILE_PREFIX: &str = "tree_";
/// Suffix of consistent-trees forest file names.
pub const TREE_FILE_SUFFIX: &str = ".dat";
