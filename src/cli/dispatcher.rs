use crate::{
    backend,
    constants::FAILURE_MARKER_PREFIX,
    core::{arg_parser::Classified, config_resolver, memo},
    dev_utils::BlockTimer,
    modes::{self, Mode, ModeError, analysis, coord, id, tree},
    state::{Phase, PhaseTracker},
};
use anyhow::{Context, Result};
use std::{io::Read, path::Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("I was not supplied with a mode.\nFor help, type 'shellfish help'.")]
    NoMode,
    #[error("You passed me the mode '{0}', which I don't recognize.\nFor help, type 'shellfish help'.")]
    UnknownMode(String),
}

/// Defines a mode, how its configuration is built and whether it reads stdin.
#[derive(Debug)]
pub struct ModeDefinition {
    pub name: &'static str,
    pub summary: &'static str,
    pub reads_stdin: bool,
    pub configure: fn(Option<&Path>, &[String]) -> Result<Box<dyn Mode>, ModeError>,
    pub example_config: fn() -> Result<String, toml::ser::Error>,
}

/// The single source of truth for all modes.
pub static MODE_REGISTRY: &[ModeDefinition] = &[
    ModeDefinition {
        name: "id",
        summary: "Selects halo IDs by ID range or mass rank. Prints 'ID Snap' rows.",
        reads_stdin: false,
        configure: modes::configure::<id::IdMode>,
        example_config: modes::example_config::<id::IdMode>,
    },
    ModeDefinition {
        name: "tree",
        summary: "Follows each 'ID Snap' row back along its main-progenitor branch.",
        reads_stdin: true,
        configure: modes::configure::<tree::TreeMode>,
        example_config: modes::example_config::<tree::TreeMode>,
    },
    ModeDefinition {
        name: "coord",
        summary: "Looks up 'X Y Z R200m' (Mpc/h) for each 'ID Snap' row.",
        reads_stdin: true,
        configure: modes::configure::<coord::CoordMode>,
        example_config: modes::example_config::<coord::CoordMode>,
    },
    ModeDefinition {
        name: "prof",
        summary: "Computes radial profiles around each 'ID Snap X Y Z R200m' row.",
        reads_stdin: true,
        configure: modes::configure::<analysis::ProfMode>,
        example_config: modes::example_config::<analysis::ProfMode>,
    },
    ModeDefinition {
        name: "shell",
        summary: "Fits splashback shells around each 'ID Snap X Y Z R200m' row.",
        reads_stdin: true,
        configure: modes::configure::<analysis::ShellMode>,
        example_config: modes::example_config::<analysis::ShellMode>,
    },
    ModeDefinition {
        name: "stats",
        summary: "Summarizes fitted shells.",
        reads_stdin: true,
        configure: modes::configure::<analysis::StatsMode>,
        example_config: modes::example_config::<analysis::StatsMode>,
    },
];

/// Finds a mode definition in the registry by its name.
pub fn find_mode(name: &str) -> Option<&'static ModeDefinition> {
    MODE_REGISTRY.iter().find(|mode| mode.name == name)
}

/// What an invocation produced.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The mode ran; these lines go to stdout.
    Completed(Vec<String>),
    /// A stdin-consuming mode received no input. Nothing is printed.
    EmptyInput,
    /// The upstream stage failed; its single marker line is passed along.
    UpstreamFailure(String),
}

/// Runs `mode` with the tokens that followed it on the command line.
///
/// `input` is only read by modes that consume stdin. `env_override` is the
/// value of the global config environment variable, if set.
pub fn dispatch(
    mode: &str,
    tokens: &[String],
    env_override: Option<&Path>,
    input: &mut impl Read,
) -> Result<Outcome> {
    log::debug!("Dispatching mode '{}' with tokens {:?}", mode, tokens);
    let definition = find_mode(mode).ok_or_else(|| DispatchError::UnknownMode(mode.to_string()))?;

    let lines = if definition.reads_stdin {
        let lines = read_lines(input)?;
        if lines.is_empty() {
            log::debug!("Mode '{}' received no input; nothing to do", mode);
            return Ok(Outcome::EmptyInput);
        }
        if let [line] = lines.as_slice()
            && line.starts_with(FAILURE_MARKER_PREFIX)
        {
            log::debug!("Upstream stage failed; passing its marker along");
            return Ok(Outcome::UpstreamFailure(line.clone()));
        }
        lines
    } else {
        Vec::new()
    };

    let mut tracker = PhaseTracker::new(mode);
    match run_phases(definition, tokens, env_override, &lines, &mut tracker) {
        Ok(out) => {
            tracker.advance(Phase::Succeeded)?;
            Ok(Outcome::Completed(out))
        }
        Err(e) => {
            tracker.fail();
            Err(e)
        }
    }
}

fn run_phases(
    definition: &ModeDefinition,
    tokens: &[String],
    env_override: Option<&Path>,
    lines: &[String],
    tracker: &mut PhaseTracker,
) -> Result<Vec<String>> {
    let classified = Classified::new(tokens);
    log::debug!(
        "Flags: {:?}, config files: {:?}",
        classified.flags(),
        classified.config_files()
    );
    tracker.advance(Phase::Classified)?;

    let global = config_resolver::resolve_global_config(&classified, env_override)?;
    let mode_file = config_resolver::mode_config_path(&classified, env_override.is_some());
    let mode = (definition.configure)(mode_file, classified.flags())?;
    tracker.advance(Phase::ConfigResolved)?;

    let memo_dir = Path::new(&global.config.memo_dir);
    let status = memo::check_memo_dir(memo_dir, &global.path, &global.config)?;
    log::debug!("MemoDir '{}' accepted: {:?}", memo_dir.display(), status);
    tracker.advance(Phase::MemoValidated)?;

    let env = backend::build_environment(definition.name, &global.config)?;
    tracker.advance(Phase::BackendReady)?;

    tracker.advance(Phase::Dispatched)?;
    let _timer = BlockTimer::new(format!("mode {}", definition.name));
    let out = mode.run(&global.config, &env, lines)?;
    Ok(out)
}

/// Reads all of `input` and splits it on newlines. A single trailing empty
/// line (from a final newline) is dropped. Invalid UTF-8 is replaced rather
/// than rejected.
fn read_lines(input: &mut impl Read) -> Result<Vec<String>> {
    let mut bytes = Vec::new();
    input
        .read_to_end(&mut bytes)
        .context("Error reading stdin")?;
    let text = String::from_utf8_lossy(&bytes);
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::core::config_resolver::ResolveError;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn to_tokens(params: &[&str]) -> Vec<String> {
        params.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_registry_names_are_unique() {
        for (i, mode) in MODE_REGISTRY.iter().enumerate() {
            assert!(
                MODE_REGISTRY.iter().skip(i + 1).all(|other| other.name != mode.name),
                "duplicate mode '{}'",
                mode.name
            );
            assert!((mode.example_config)().is_ok());
        }
        assert!(find_mode("id").is_some_and(|m| !m.reads_stdin));
        assert!(find_mode("coord").is_some_and(|m| m.reads_stdin));
    }

    #[test]
    fn test_unknown_mode() {
        let err = dispatch("foo", &[], None, &mut Cursor::new("")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::UnknownMode(name)) if name == "foo"
        ));
    }

    #[test]
    fn test_empty_input_is_a_silent_success() {
        let outcome = dispatch("coord", &[], None, &mut Cursor::new("")).unwrap();
        assert_eq!(outcome, Outcome::EmptyInput);
    }

    #[test]
    fn test_upstream_failure_is_passed_along() {
        let outcome =
            dispatch("shell", &[], None, &mut Cursor::new("Shellfish terminating.\n")).unwrap();
        assert_eq!(
            outcome,
            Outcome::UpstreamFailure("Shellfish terminating.".to_string())
        );
    }

    #[test]
    fn test_marker_among_other_lines_is_ordinary_input() {
        let err = dispatch(
            "stats",
            &[],
            None,
            &mut Cursor::new("Shellfish terminating.\n1 2 3 4 5 6\n"),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::NoConfig { .. })
        ));
    }

    #[test]
    fn test_read_lines_strips_one_trailing_newline() {
        assert!(read_lines(&mut Cursor::new("")).unwrap().is_empty());
        assert_eq!(read_lines(&mut Cursor::new("a\nb\n")).unwrap(), vec!["a", "b"]);
        assert_eq!(read_lines(&mut Cursor::new("a\n\n")).unwrap(), vec!["a", ""]);
    }

    #[test]
    fn test_read_lines_tolerates_invalid_utf8() {
        let raw: &[u8] = b"# halo caf\xe9\n1 100 0 0 0 0.2\n";
        let lines = read_lines(&mut Cursor::new(raw)).unwrap();
        assert_eq!(lines, vec!["# halo caf\u{FFFD}", "1 100 0 0 0 0.2"]);
    }

    #[test]
    fn test_halo_free_mode_runs_through_every_phase() {
        let tmp = TempDir::new().unwrap();
        let memo_dir = tmp.path().join("memo");
        let global = tmp.path().join("global.config");
        fs::write(&global, format!("MemoDir = \"{}\"\n", memo_dir.display())).unwrap();
        let tokens = to_tokens(&["--Samples", "12", global.to_str().unwrap()]);

        let err = dispatch(
            "stats",
            &tokens,
            None,
            &mut Cursor::new(&b"# caf\xe9\n1 100 0.5 0.5 0.5 0.2\n"[..]),
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ModeError>(),
            Some(ModeError::KernelUnavailable { mode: "stats", rows: 1 })
        ));
        assert!(memo_dir.join("memo.config").is_file());
    }

    #[test]
    fn test_particle_mode_needs_a_snapshot_type() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.config");
        let memo_dir = tmp.path().join("memo");
        fs::write(&global, format!("MemoDir = \"{}\"\n", memo_dir.display())).unwrap();
        let tokens = to_tokens(&[global.to_str().unwrap()]);

        let err = dispatch(
            "shell",
            &tokens,
            None,
            &mut Cursor::new("1 100 0.5 0.5 0.5 0.2\n"),
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<BackendError>(),
            Some(BackendError::NilBackend { key: "SnapshotType", .. })
        ));
    }

    #[test]
    fn test_env_override_with_mode_config() {
        let tmp = TempDir::new().unwrap();
        let memo_dir = tmp.path().join("memo");
        let global = tmp.path().join("global.config");
        fs::write(&global, format!("MemoDir = \"{}\"\n", memo_dir.display())).unwrap();
        let mode_file = tmp.path().join("bad.stats.config");
        fs::write(&mode_file, "Samples = -4\n").unwrap();
        let tokens = to_tokens(&[mode_file.to_str().unwrap()]);

        let err = dispatch(
            "stats",
            &tokens,
            Some(&global),
            &mut Cursor::new("1 100 0 0 0 1\n"),
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ModeError>(),
            Some(ModeError::Invalid { mode: "stats", .. })
        ));
        // Configuration failed before the memo guard ran.
        assert!(!memo_dir.exists());
    }
}
