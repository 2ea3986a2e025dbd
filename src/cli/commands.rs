// src/cli/commands.rs

use crate::{
    cli::dispatcher::{MODE_REGISTRY, find_mode},
    constants::{CONFIG_SUFFIX, GLOBAL_CONFIG_ENV_VAR},
    models::GlobalConfig,
};
use anyhow::Result;
use colored::*;

/// A built-in command that is not a pipeline mode. The handler returns the text
/// to print.
#[derive(Debug)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub handler: fn(&[String]) -> Result<String>,
}

pub static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "help",
        handler: help,
    },
    CommandDefinition {
        name: "version",
        handler: version,
    },
    CommandDefinition {
        name: "hello",
        handler: hello,
    },
];

pub fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY.iter().find(|cmd| cmd.name == name)
}

/// `shellfish help [topic]`.
///
/// Topics are a mode name, `<mode>.config` for that mode's default
/// configuration, or `config` for the default global configuration.
fn help(args: &[String]) -> Result<String> {
    match args {
        [] => Ok(overview()),
        [topic] => topic_help(topic),
        _ => Ok("The help mode can only take a single argument.".to_string()),
    }
}

fn topic_help(topic: &str) -> Result<String> {
    if topic == "config" {
        return Ok(toml::to_string_pretty(&GlobalConfig::default())?);
    }
    if let Some(name) = topic.strip_suffix(CONFIG_SUFFIX)
        && let Some(mode) = find_mode(name)
    {
        return Ok((mode.example_config)()?);
    }
    if let Some(mode) = find_mode(topic) {
        let input = if mode.reads_stdin {
            "reads a catalog from stdin"
        } else {
            "takes no input from stdin"
        };
        return Ok(format!(
            "{}: {}\nThe {} mode {}. For its configuration, type 'shellfish help {}{}'.",
            mode.name.cyan().bold(),
            mode.summary,
            mode.name,
            input,
            mode.name,
            CONFIG_SUFFIX
        ));
    }
    Ok(format!("I don't recognize the help target '{topic}'"))
}

fn overview() -> String {
    let mut text = format!(
        "{}\n\n    shellfish <mode> [flags ...] [global.config] [mode.config]\n\n",
        "The tools in the Shellfish toolchain are:".yellow().bold()
    );
    for mode in MODE_REGISTRY {
        text.push_str(&format!("    {:<6} {}\n", mode.name.cyan(), mode.summary));
    }
    text.push_str(&format!(
        "\nFlags take the form '--Key value' and override the same key in the mode's\n\
         config file. The global config file can also be given through ${GLOBAL_CONFIG_ENV_VAR}.\n\
         Stages are chained with pipes, e.g.\n\n    \
         shellfish id my.id.config | shellfish coord | shellfish shell\n\n\
         For documented defaults, type 'shellfish help config' or 'shellfish help <mode>.config'."
    ));
    text
}

fn version(_args: &[String]) -> Result<String> {
    Ok(format!("Shellfish version {}", env!("CARGO_PKG_VERSION")))
}

fn hello(_args: &[String]) -> Result<String> {
    Ok("Hello back at you! Installation was successful.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, args: &[&str]) -> String {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        (find_command(name).unwrap().handler)(&args).unwrap()
    }

    #[test]
    fn test_global_config_help_is_valid_toml() {
        let text = run("help", &["config"]);
        let parsed: GlobalConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, GlobalConfig::default());
    }

    #[test]
    fn test_mode_config_help() {
        assert!(run("help", &["tree.config"]).contains("MaxSteps = 0"));
        assert!(run("help", &["shell.config"]).contains("Los = 100"));
    }

    #[test]
    fn test_unknown_topic() {
        assert_eq!(
            run("help", &["bogus.config"]),
            "I don't recognize the help target 'bogus.config'"
        );
        assert!(run("help", &["a", "b"]).contains("single argument"));
    }

    #[test]
    fn test_overview_lists_every_mode() {
        colored::control::set_override(false);
        let text = run("help", &[]);
        for mode in MODE_REGISTRY {
            assert!(text.contains(mode.name));
        }
    }

    #[test]
    fn test_version_and_hello() {
        assert_eq!(
            run("version", &[]),
            format!("Shellfish version {}", env!("CARGO_PKG_VERSION"))
        );
        assert!(run("hello", &[]).starts_with("Hello back at you!"));
        assert!(find_command("id").is_none());
    }
}
