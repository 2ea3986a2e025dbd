use clap::Parser;

pub mod commands;
pub mod dispatcher;

/// shellfish: pipeline driver for the splashback-shell toolchain.
///
/// Usage: `shellfish <mode> [flags ...] [configFile ...]`. Every token is
/// captured verbatim; the modes parse their own flags.
#[derive(Parser, Debug)]
#[command(name = "shellfish", about)]
// Help, version and per-mode flags are all handled by shellfish itself.
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// The mode followed by its flags and config files.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}
