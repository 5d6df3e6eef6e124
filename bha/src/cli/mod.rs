//! Command-line interface: argument definitions and command handlers.

pub mod output;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BhaConfig;
use crate::models::suggestion::Priority;
use crate::models::trace::BuildTrace;
use crate::parsers::{collect_trace_files, parse_trace_file};
use crate::services::pipeline::run_full_analysis;
use crate::services::progress::ProgressTracker;
use crate::services::snapshot::{SnapshotStore, DEFAULT_SIGNIFICANCE_THRESHOLD};
use crate::services::suggest::{generate_all_suggestions, SuggesterRegistry};

#[derive(Parser)]
#[command(
    name = "bha",
    about = "Build hotspot analyzer for compiler time traces",
    version,
    long_about = None
)]
pub struct Cli {
    /// Enable verbose output (info level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output (debug level)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable trace output (trace level)
    #[arg(long, global = true)]
    pub trace: bool,

    /// Custom trace filter (overrides other flags)
    #[arg(long, global = true, env = "RUST_LOG")]
    pub trace_filter: Option<String>,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze build traces and report hotspots
    #[command(visible_alias = "a")]
    Analyze {
        /// Trace files or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write results to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of top items per section (0 = all)
        #[arg(short, long, default_value_t = 10)]
        top: usize,

        /// Minimum compile time for the slow-file list (ms)
        #[arg(long, value_name = "MS")]
        min_time: Option<u64>,
    },

    /// Generate optimization suggestions from build traces
    Suggest {
        /// Trace files or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Maximum number of suggestions
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,

        /// Minimum priority to report
        #[arg(short = 'p', long, value_enum, default_value = "low")]
        min_priority: Priority,

        /// Minimum confidence (0.0-1.0)
        #[arg(short = 'c', long, default_value_t = 0.5)]
        min_confidence: f64,

        /// Include potentially unsafe suggestions
        #[arg(long)]
        include_unsafe: bool,

        /// Show full detail for every suggestion
        #[arg(short, long)]
        detailed: bool,
    },

    /// Save, list, inspect and delete snapshots
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },

    /// Compare two snapshots, or the baseline against a snapshot
    Compare {
        /// Old snapshot name (omit with --baseline)
        old: Option<String>,

        /// New snapshot name
        new: Option<String>,

        /// Compare the configured baseline against NEW
        #[arg(short, long)]
        baseline: bool,

        /// Per-file significance threshold as a fraction (0.10 = 10%)
        #[arg(long, default_value_t = DEFAULT_SIGNIFICANCE_THRESHOLD)]
        threshold: f64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage the baseline pointer
    Baseline {
        #[command(subcommand)]
        action: BaselineAction,
    },
}

#[derive(Subcommand)]
pub enum SnapshotAction {
    /// Analyze traces and save the result under a name
    Save {
        /// Snapshot name
        name: String,

        /// Trace files or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Optional description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Overwrite an existing snapshot of the same name
        #[arg(long)]
        force: bool,
    },

    /// List snapshots, newest first
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one snapshot's analysis
    Show {
        /// Snapshot name
        name: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a snapshot
    Delete {
        /// Snapshot name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum BaselineAction {
    /// Designate a snapshot as the baseline
    Set {
        /// Snapshot name
        name: String,
    },

    /// Print the current baseline
    Show,

    /// Clear the baseline pointer
    Clear,
}

/// Parses every trace under the given paths into a build trace. Unreadable
/// traces are skipped with a warning; the run fails only when nothing
/// parses. The wall time is the sum of unit times (a sequential bound)
/// since trace files carry no driver wall clock.
fn load_trace(paths: &[PathBuf], show_progress: bool) -> anyhow::Result<BuildTrace> {
    let mut trace_files = Vec::new();
    for path in paths {
        if !path.exists() {
            bail!("file not found: {}", path.display());
        }
        trace_files.extend(collect_trace_files(path));
    }
    if trace_files.is_empty() {
        bail!("no trace files found");
    }

    let tracker = ProgressTracker::new(show_progress);
    let bar = tracker.file_bar(trace_files.len() as u64, "Parsing traces");

    let mut units: Vec<_> = trace_files
        .par_iter()
        .enumerate()
        .filter_map(|(index, file)| {
            let parsed = match parse_trace_file(file) {
                Ok(unit) => Some((index, unit)),
                Err(err) => {
                    warn!(file = %file.display(), "skipping trace: {err}");
                    None
                }
            };
            bar.inc(1);
            parsed
        })
        .collect();
    bar.finish_and_clear();

    // Unit order must follow file order regardless of scheduling.
    units.sort_by_key(|(index, _)| *index);
    let units: Vec<_> = units.into_iter().map(|(_, unit)| unit).collect();

    if units.is_empty() {
        bail!("no valid trace files parsed");
    }
    debug!(units = units.len(), "trace loaded");

    Ok(BuildTrace::from_units(units))
}

fn write_or_print(body: &str, output: Option<&PathBuf>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, body)
                .with_context(|| format!("failed to write output: {}", path.display()))?;
            eprintln!("Results written to {}", path.display());
        }
        None => print!("{body}"),
    }
    Ok(())
}

fn snapshot_store(config: &BhaConfig) -> SnapshotStore {
    match &config.snapshot_dir {
        Some(dir) => SnapshotStore::new(dir),
        None => SnapshotStore::default(),
    }
}

/// Executes the parsed command line; returns the process exit code.
pub async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = BhaConfig::discover()?;
    let progress_enabled = !cli.quiet && std::io::stderr().is_terminal();

    match cli.command {
        Commands::Analyze {
            paths,
            format,
            output,
            top,
            min_time,
        } => {
            let trace = load_trace(&paths, progress_enabled && format == OutputFormat::Text)?;

            let mut options = config.analysis_options();
            if let Some(ms) = min_time {
                options.min_duration_threshold = Duration::from_millis(ms);
            }

            let result = run_full_analysis(&trace, &options)?;
            let body = match format {
                OutputFormat::Text => output::render_analysis_text(&result, top),
                OutputFormat::Json => {
                    serde_json::to_string_pretty(&output::render_analysis_json(&result))? + "\n"
                }
            };
            write_or_print(&body, output.as_ref())?;
            Ok(0)
        }

        Commands::Suggest {
            paths,
            format,
            limit,
            min_priority,
            min_confidence,
            include_unsafe,
            detailed,
        } => {
            if !(0.0..=1.0).contains(&min_confidence) {
                bail!("confidence must be between 0.0 and 1.0");
            }
            let trace = load_trace(&paths, progress_enabled && format == OutputFormat::Text)?;
            let analysis = run_full_analysis(&trace, &config.analysis_options())?;

            let mut options = config.suggester_options();
            options.max_suggestions = limit;
            options.min_priority = min_priority;
            options.min_confidence = min_confidence;
            options.include_unsafe = options.include_unsafe || include_unsafe;

            let suggestions = generate_all_suggestions(
                &SuggesterRegistry::standard(),
                &trace,
                &analysis,
                &options,
            );

            let body = match format {
                OutputFormat::Text => output::render_suggestions_text(&suggestions, detailed),
                OutputFormat::Json => {
                    serde_json::to_string_pretty(&output::render_suggestions_json(&suggestions))?
                        + "\n"
                }
            };
            print!("{body}");
            Ok(0)
        }

        Commands::Snapshot { action } => match action {
            SnapshotAction::Save {
                name,
                paths,
                description,
                tags,
                force,
            } => {
                let trace = load_trace(&paths, progress_enabled)?;
                let analysis = run_full_analysis(&trace, &config.analysis_options())?;
                let suggestions = generate_all_suggestions(
                    &SuggesterRegistry::standard(),
                    &trace,
                    &analysis,
                    &config.suggester_options(),
                );

                let store = snapshot_store(&config);
                store.save(&name, &analysis, &suggestions, &description, &tags, force)?;
                eprintln!(
                    "Snapshot '{name}' saved ({} files, {} suggestions)",
                    analysis.files.len(),
                    suggestions.len()
                );
                Ok(0)
            }
            SnapshotAction::List { format } => {
                let store = snapshot_store(&config);
                let snapshots = store.list()?;
                let body = match format {
                    OutputFormat::Text => output::render_snapshot_list_text(&snapshots),
                    OutputFormat::Json => serde_json::to_string_pretty(
                        &output::render_snapshot_list_json(&snapshots),
                    )? + "\n",
                };
                print!("{body}");
                Ok(0)
            }
            SnapshotAction::Show { name, format } => {
                let store = snapshot_store(&config);
                let snapshot = store.load(&name)?;
                let body = match format {
                    OutputFormat::Text => {
                        let mut text = format!(
                            "Snapshot: {}\nCreated:  {}\n",
                            snapshot.metadata.name,
                            snapshot.metadata.created_at.format("%Y-%m-%d %H:%M:%S"),
                        );
                        if !snapshot.metadata.git_branch.is_empty() {
                            text.push_str(&format!(
                                "Git:      {} @ {}\n",
                                snapshot.metadata.git_branch, snapshot.metadata.git_commit
                            ));
                        }
                        if !snapshot.metadata.description.is_empty() {
                            text.push_str(&format!("About:    {}\n", snapshot.metadata.description));
                        }
                        text.push('\n');
                        text + &output::render_analysis_text(&snapshot.analysis, 10)
                    }
                    OutputFormat::Json => serde_json::to_string_pretty(
                        &output::render_analysis_json(&snapshot.analysis),
                    )? + "\n",
                };
                print!("{body}");
                Ok(0)
            }
            SnapshotAction::Delete { name } => {
                let store = snapshot_store(&config);
                store.remove(&name)?;
                eprintln!("Snapshot '{name}' deleted");
                Ok(0)
            }
        },

        Commands::Compare {
            old,
            new,
            baseline,
            threshold,
            format,
        } => {
            let store = snapshot_store(&config);

            let (old_name, new_name) = if baseline {
                let Some(base) = store.get_baseline() else {
                    bail!("no baseline set; use 'bha baseline set <snapshot>' first");
                };
                let new_name = old
                    .or(new)
                    .context("usage: bha compare --baseline <new-snapshot>")?;
                (base, new_name)
            } else {
                let old_name = old.context("usage: bha compare <old> <new>")?;
                let new_name = new.context("usage: bha compare <old> <new>")?;
                (old_name, new_name)
            };

            let old_snapshot = store.load(&old_name)?;
            let new_snapshot = store.load(&new_name)?;
            let result = crate::services::snapshot::compare_analyses(
                &old_snapshot.analysis,
                &new_snapshot.analysis,
                threshold,
            );

            let body = match format {
                OutputFormat::Text => output::render_comparison_text(&result),
                OutputFormat::Json => {
                    serde_json::to_string_pretty(&output::render_comparison_json(&result))? + "\n"
                }
            };
            print!("{body}");

            if result.is_regression() && result.is_significant() {
                Ok(1)
            } else {
                Ok(0)
            }
        }

        Commands::Baseline { action } => {
            let store = snapshot_store(&config);
            match action {
                BaselineAction::Set { name } => {
                    store.set_baseline(&name)?;
                    eprintln!("Baseline set to '{name}'");
                }
                BaselineAction::Show => match store.get_baseline() {
                    Some(name) => println!("{name}"),
                    None => println!("(no baseline set)"),
                },
                BaselineAction::Clear => {
                    store.clear_baseline()?;
                    eprintln!("Baseline cleared");
                }
            }
            Ok(0)
        }
    }
}
