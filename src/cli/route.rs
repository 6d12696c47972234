//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cli::exit;
use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::*;
use crate::compare::{self, find_matches};
use crate::config::{ConfigLoader, DmerkConfig, GenerateConfig};
use crate::error::{ApiError, CompareError};
use crate::store::{self, FileStore};
use crate::tree::builder::{ErrorPolicy, Tree, TreeBuilder};
use crate::tree::source::TreeSource;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Rendered command result and the status the process should exit with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub status: i32,
}

impl CommandOutput {
    fn new(text: String, trees: &[&Tree]) -> Self {
        let status = if trees.iter().any(|t| t.has_errors()) {
            exit::COLLECTED_ERRORS
        } else {
            exit::OK
        };
        Self { text, status }
    }
}

/// Runtime context for CLI execution: working directory and loaded configuration.
pub struct RunContext {
    cwd: PathBuf,
    config: DmerkConfig,
    color: bool,
}

impl RunContext {
    /// Load and validate configuration for `cwd`, or from `config_path` alone.
    pub fn new(cwd: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&cwd)?,
        };
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(Self::with_config(cwd, config))
    }

    pub fn with_config(cwd: PathBuf, config: DmerkConfig) -> Self {
        Self {
            cwd,
            config,
            color: false,
        }
    }

    /// Colorize text output (only sensible when stdout is a terminal).
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn config(&self) -> &DmerkConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, ApiError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        match &result {
            Ok(output) => info!(
                status = output.status,
                duration_ms = started.elapsed().as_millis() as u64,
                "Command finished"
            ),
            Err(e) => warn!(error = %e, "Command failed"),
        }
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<CommandOutput, ApiError> {
        match command {
            Commands::Generate {
                path,
                fail_fast,
                collect,
                filename,
                print,
                no_save,
                jobs,
            } => {
                let mut generate = self.config.generate.clone();
                if *fail_fast {
                    generate.error_policy = ErrorPolicy::FailFast;
                } else if *collect {
                    generate.error_policy = ErrorPolicy::Collect;
                }
                if jobs.is_some() {
                    generate.jobs = *jobs;
                }
                self.handle_generate(path, &generate, filename.as_deref(), *print, *no_save)
            }
            Commands::Compare {
                path1,
                path2,
                subpath1,
                subpath2,
                deep,
                format,
                no_save,
            } => {
                let left = self.obtain(path1, *no_save)?;
                let right = self.obtain(path2, *no_save)?;
                let text = if *deep {
                    self.handle_deep_compare(&left, subpath1, &right, subpath2, *format)?
                } else {
                    self.handle_compare(&left, subpath1, &right, subpath2, *format)?
                };
                Ok(CommandOutput::new(text, &[&left, &right]))
            }
            Commands::Show {
                source,
                subpath,
                format,
            } => {
                let tree = self.obtain(source, true)?;
                let node = compare::resolve(&tree, subpath)?;
                let text = match format {
                    OutputFormat::Text => format_node_listing_text(&tree, subpath, node, self.color),
                    OutputFormat::Json => format_node_listing_json(node)?,
                };
                Ok(CommandOutput::new(text, &[&tree]))
            }
            Commands::Errors { source, format } => {
                let tree = self.obtain(source, true)?;
                let text = match format {
                    OutputFormat::Text => format_errors_text(&tree),
                    OutputFormat::Json => format_errors_json(&tree)?,
                };
                Ok(CommandOutput::new(text, &[&tree]))
            }
        }
    }

    fn handle_generate(
        &self,
        path: &Path,
        generate: &GenerateConfig,
        filename: Option<&Path>,
        print: bool,
        no_save: bool,
    ) -> Result<CommandOutput, ApiError> {
        let tree = TreeBuilder::from_config(self.cwd.join(path), generate).build()?;

        let saved = if no_save {
            None
        } else if let Some(filename) = filename {
            let target = self.cwd.join(filename);
            store::save(&tree, &target)?;
            Some(target)
        } else {
            Some(FileStore::new(generate.output_dir_in(&self.cwd)).save(&tree)?)
        };
        if let Some(ref saved) = saved {
            info!(path = %saved.display(), "Tree saved");
        }

        let text = if print || no_save {
            format_tree_json(&tree)?
        } else {
            format_generate_summary(&tree, saved.as_deref())
        };
        Ok(CommandOutput::new(text, &[&tree]))
    }

    fn handle_compare(
        &self,
        left: &Tree,
        left_subpath: &Path,
        right: &Tree,
        right_subpath: &Path,
        format: OutputFormat,
    ) -> Result<String, ApiError> {
        match compare::compare(left, left_subpath, right, right_subpath) {
            Ok(result) => match format {
                OutputFormat::Text => Ok(format_diff_text(&result, self.color)),
                OutputFormat::Json => format_diff_json(&result),
            },
            // Two non-directories are compared directly.
            Err(CompareError::NotADirectory(_)) => {
                let left_node = compare::resolve(left, left_subpath)?;
                let right_node = compare::resolve(right, right_subpath)?;
                if left_node.is_dir() || right_node.is_dir() {
                    let subpath = if left_node.is_dir() { right_subpath } else { left_subpath };
                    return Err(CompareError::NotADirectory(subpath.to_path_buf()).into());
                }
                let outcome = compare::compare_nodes(left, left_subpath, right, right_subpath)?;
                match format {
                    OutputFormat::Text => Ok(format_outcome_text(
                        left_subpath,
                        right_subpath,
                        outcome,
                        self.color,
                    )),
                    OutputFormat::Json => format_outcome_json(left_subpath, right_subpath, outcome),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn handle_deep_compare(
        &self,
        left: &Tree,
        left_subpath: &Path,
        right: &Tree,
        right_subpath: &Path,
        format: OutputFormat,
    ) -> Result<String, ApiError> {
        compare::check_version(left)?;
        compare::check_version(right)?;
        let report = find_matches(
            compare::resolve(left, left_subpath)?,
            compare::resolve(right, right_subpath)?,
        );
        match format {
            OutputFormat::Text => Ok(format_match_text(&report, self.color)),
            OutputFormat::Json => format_match_json(&report),
        }
    }

    /// Load a saved tree, or build one and save it unless `no_save`.
    fn obtain(&self, path: &Path, no_save: bool) -> Result<Tree, ApiError> {
        let source = TreeSource::detect(self.cwd.join(path));
        let tree = source.obtain(&self.config.generate)?;
        if source.is_fresh() && !no_save {
            let saved = FileStore::new(self.config.generate.output_dir_in(&self.cwd)).save(&tree)?;
            info!(path = %saved.display(), "Tree saved");
        }
        Ok(tree)
    }
}
