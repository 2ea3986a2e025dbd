// src/bin/shellfish.rs

use anyhow::Result;
use clap::Parser;
use colored::*;
use shellfish::{
    cli::{
        Cli, commands,
        dispatcher::{self, DispatchError, Outcome},
    },
    constants::TERMINATION_NOTICE,
    core::config_resolver,
};
use std::io::{self, BufWriter, Write};
use std::process;

/// The main entry point of the `shellfish` application.
/// It sets up logging, captures the arguments, runs the requested mode or
/// built-in command, and performs centralized error handling.
fn main() {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("CLI args parsed: {:?}", cli);

    let Some((name, tokens)) = cli.args.split_first() else {
        eprintln!("{}: {}", "Error".red().bold(), DispatchError::NoMode);
        process::exit(1);
    };

    if let Some(command) = commands::find_command(name) {
        match (command.handler)(tokens) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("{}: {:#}", "Error".red().bold(), e);
                process::exit(1);
            }
        }
        return;
    }

    let env_override = config_resolver::global_config_override();
    let outcome = dispatcher::dispatch(
        name,
        tokens,
        env_override.as_deref(),
        &mut io::stdin().lock(),
    );

    match outcome {
        Ok(Outcome::Completed(lines)) => {
            if let Err(e) = write_lines(&lines) {
                log::error!("Could not write output catalog: {e}");
                process::exit(1);
            }
        }
        Ok(Outcome::EmptyInput) => {}
        Ok(Outcome::UpstreamFailure(marker)) => {
            println!("{marker}");
            process::exit(1);
        }
        Err(e) => {
            // --- Centralized Error Handling ---
            eprintln!("{} {}:\n{:#}", "Error running mode".red().bold(), name, e);
            println!("{TERMINATION_NOTICE}");
            process::exit(1);
        }
    }
}

fn write_lines(lines: &[String]) -> Result<()> {
    let mut out = BufWriter::new(io::stdout().lock());
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}
