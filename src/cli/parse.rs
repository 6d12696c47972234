//! CLI parse: clap types for dmerk. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dmerk CLI - Directory merkle trees
#[derive(Parser, Debug)]
#[command(name = "dmerk", version)]
#[command(about = "Generate, compare and inspect directory merkle trees")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (replaces the global and workspace config files)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

/// Rendering of command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the merkle tree of a directory and save it
    Generate {
        /// Directory to hash
        path: PathBuf,

        /// Abort on the first unreadable entry
        #[arg(long, conflicts_with = "collect")]
        fail_fast: bool,

        /// Record unreadable entries and continue (default)
        #[arg(long)]
        collect: bool,

        /// Save to this file instead of `<output_dir>/<name>.dmerk`
        #[arg(short = 'f', long)]
        filename: Option<PathBuf>,

        /// Print the tree document to stdout
        #[arg(short, long)]
        print: bool,

        /// Do not save the tree (implies --print)
        #[arg(long)]
        no_save: bool,

        /// Maximum number of files hashed concurrently
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Compare two trees, each a directory or a saved .dmerk file
    Compare {
        /// First directory or .dmerk file
        #[arg(long, visible_alias = "p1")]
        path1: PathBuf,

        /// Second directory or .dmerk file
        #[arg(long, visible_alias = "p2")]
        path2: PathBuf,

        /// Subdirectory of the first tree to compare
        #[arg(long, visible_alias = "sp1", default_value = ".")]
        subpath1: PathBuf,

        /// Subdirectory of the second tree to compare
        #[arg(long, visible_alias = "sp2", default_value = ".")]
        subpath2: PathBuf,

        /// Match content across the whole subtrees (moves, renames, copies)
        #[arg(long)]
        deep: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Do not save trees generated from directories
        #[arg(long)]
        no_save: bool,
    },
    /// List the children of a node
    Show {
        /// Directory or .dmerk file
        source: PathBuf,

        /// Node to list, relative to the tree root
        #[arg(default_value = ".")]
        subpath: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List every entry that could not be read
    Errors {
        /// Directory or .dmerk file
        source: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}
