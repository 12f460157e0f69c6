use std::collections::HashSet;
use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use crtools_builders::{BbCli, BuilderEntry, BuilderOptions, Builders, ManifestProvider};
use crtools_size::models::{DeltaRecord, DiffStatus, DiffSummary};
use crtools_size::{diff, DiffOptions, SizeInfo};
use crtools_utils::logging::LOG_FORMAT_VAR;
use crtools_utils::{info, init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingGuard};
use serde_json::json;

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Binary-size diffs and builder discovery for Chromium tooling.
#[derive(Parser, Debug)]
#[command(name = "crtools")]
#[command(version)]
#[command(about = "Binary-size diffs and builder discovery for Chromium tooling", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Diff two size snapshots
    Diff
    {
        /// Snapshot JSON of the old build
        before: PathBuf,
        /// Snapshot JSON of the new build
        after: PathBuf,
        /// Order symbols by largest absolute pss change
        #[arg(long, default_value_t = false)]
        sort: bool,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Print at most this many symbols
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List the builders that run a test suite
    Builders
    {
        /// JSON manifest describing the tests of interest
        #[arg(long)]
        manifest: PathBuf,
        /// Directory holding the public buildbot JSON files
        #[arg(long)]
        buildbot_dir: PathBuf,
        /// Directory holding the internal buildbot JSON files
        #[arg(long)]
        internal_buildbot_dir: Option<PathBuf>,
        /// Only builders running this suite
        #[arg(long)]
        suite: Option<String>,
        /// Also list the try builders mirroring the CI builders
        #[arg(long, default_value_t = false)]
        try_builders: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat
{
    Text,
    Json,
}

fn main()
{
    let cli = Cli::parse();

    let guard = match setup_logging(cli.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    let result = run_command(cli.command);
    // Flush file logs before a possible exit.
    drop(guard);
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn setup_logging(level: Option<LogLevel>) -> CliResult<LoggingGuard>
{
    let guard = match level {
        Some(level) => {
            let format = env::var(LOG_FORMAT_VAR)
                .ok()
                .and_then(|s| s.parse::<LogFormat>().ok())
                .unwrap_or(LogFormat::Pretty);
            init_logging_with_level(level, format)?
        }
        None => init_logging()?,
    };
    Ok(guard)
}

fn run_command(command: Commands) -> CliResult<()>
{
    match command {
        Commands::Diff {
            before,
            after,
            sort,
            format,
            limit,
        } => {
            info!("Diffing {} against {}", before.display(), after.display());
            let before = Arc::new(SizeInfo::load(&before)?);
            let after = Arc::new(SizeInfo::load(&after)?);
            let delta = diff(before, after, DiffOptions { sort })?;

            // Unchanged symbols are counted in the summary but never listed.
            let records: Vec<DeltaRecord> = delta
                .symbols
                .iter()
                .filter(|s| s.diff_status() != DiffStatus::Unchanged)
                .take(limit.unwrap_or(usize::MAX))
                .map(|s| s.to_record())
                .collect();

            let summary = delta.summary();
            match format {
                OutputFormat::Text => print_diff_text(&summary, &records),
                OutputFormat::Json => {
                    let report = json!({ "summary": summary, "symbols": records });
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
            Ok(())
        }
        Commands::Builders {
            manifest,
            buildbot_dir,
            internal_buildbot_dir,
            suite,
            try_builders,
        } => {
            let provider = ManifestProvider::load(&manifest)?;
            let mut options = BuilderOptions::public(buildbot_dir);
            if let Some(internal) = internal_buildbot_dir {
                options = options.with_internal(internal);
            }
            let builders = Builders::new(provider, BbCli::default(), options);

            let ci_builders = builders.ci_builders(suite.as_deref())?;
            print_builders(&ci_builders);
            if try_builders {
                print_builders(&builders.try_builders(&ci_builders)?);
            }
            Ok(())
        }
    }
}

fn print_diff_text(summary: &DiffSummary, records: &[DeltaRecord])
{
    for name in &summary.added_containers {
        println!("Added container: {}", name);
    }
    for name in &summary.removed_containers {
        println!("Removed container: {}", name);
    }

    let counts = &summary.counts;
    println!(
        "Symbols: {} changed, {} added, {} removed, {} unchanged",
        counts.changed, counts.added, counts.removed, counts.unchanged
    );
    println!("Size delta: {:+} bytes", summary.size_delta);
    for (section, delta) in &summary.section_deltas {
        println!("  {:<24} {:+}", section, delta);
    }

    if !records.is_empty() {
        println!();
    }
    for record in records {
        println!(
            "{} {:>+12.2} {:<12} {}/{}",
            record.status, record.pss, record.section, record.container, record.full_name
        );
    }
}

fn print_builders(builders: &HashSet<BuilderEntry>)
{
    let mut paths: Vec<String> = builders.iter().map(BuilderEntry::buildbucket_path).collect();
    paths.sort();
    for path in paths {
        println!("{}", path);
    }
}
