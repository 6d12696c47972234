//! dmerk CLI Binary
//!
//! Command-line interface for generating, comparing and inspecting directory merkle trees.

use clap::Parser;
use dmerk::cli::{exit, map_error, Cli, RunContext};
use dmerk::config::ConfigLoader;
use dmerk::logging::{init_logging, LoggingConfig};
use std::io::IsTerminal;
use std::path::Path;
use std::process;
use tracing::{debug, error};

fn main() {
    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            eprintln!("error: cannot determine current directory: {}", e);
            process::exit(exit::FAILURE);
        }
    };

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli, &cwd);

    // Initialize logging early
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(exit::FAILURE);
    }

    debug!("dmerk starting");

    let context = match RunContext::new(cwd, cli.config.clone()) {
        Ok(ctx) => ctx.with_color(std::io::stdout().is_terminal()),
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(exit::for_error(&e));
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            print!("{}", output.text);
            if !output.text.ends_with('\n') {
                println!();
            }
            process::exit(output.status);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(exit::for_error(&e));
        }
    }
}

/// Build logging configuration from CLI args, environment, and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli, cwd: &Path) -> LoggingConfig {
    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load(cwd)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
        if cli.log_output.is_none() {
            config.output = "file".to_string();
        }
    }

    config
}
