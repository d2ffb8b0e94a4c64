//! # Stylesnap CLI - Design-system changelogs from the command line
//!
//! Drives a [`Tracker`] over a directory-backed store. Observations are JSON
//! snapshot payloads (`{"timestamp": .., "elements": [..]}`) read from a file
//! or stdin.
//!
//! ## Usage
//! ```bash
//! # Record the first baseline
//! stylesnap commit observation.json
//!
//! # Show what changed since the baseline
//! stylesnap diff observation.json
//!
//! # Advance the baseline without reporting
//! stylesnap skip observation.json
//!
//! # Inspect or drop the stored baseline
//! stylesnap show
//! stylesnap clear
//!
//! # Fingerprint an arbitrary JSON value
//! echo '{"b": 1, "a": 2}' | stylesnap hash -
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use humantime::format_duration;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stylesnap::display::render_changelog;
use stylesnap::hasher::{canonicalize, hash_value};
use stylesnap::types::DEFAULT_MAX_CHUNK_BYTES;
use stylesnap::{
    ChangeReport, ElementKind, FileBackend, SnapError, Snapshot, Tracker, TrackerBuilder,
};
use tracing_subscriber::EnvFilter;

/// Stylesnap CLI - track changes to design-system elements
#[derive(Parser)]
#[command(name = "stylesnap")]
#[command(version)]
#[command(about = "Snapshot, diff and persist design-system elements")]
#[command(long_about = None)]
struct Cli {
    /// Store directory
    #[arg(short, long, global = true, default_value = ".stylesnap")]
    store: PathBuf,

    /// Backend namespace
    #[arg(long, global = true, default_value = "design_tracker")]
    namespace: String,

    /// Logical key of the stored snapshot
    #[arg(long, global = true, default_value = "snapshot")]
    key: String,

    /// Largest payload written to a single entry, in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CHUNK_BYTES)]
    chunk_size: usize,

    /// Ignore elements whose name matches this glob (repeatable)
    #[arg(short, long, global = true)]
    ignore: Vec<String>,

    /// Skip elements whose name starts with `_` or `.`
    #[arg(long, global = true)]
    skip_private: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare an observation against the stored baseline
    Diff {
        /// Snapshot JSON file, or `-` for stdin
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Only print counts
        #[arg(long)]
        stat: bool,
    },

    /// Make an observation the new baseline
    Commit {
        /// Snapshot JSON file, or `-` for stdin
        input: PathBuf,
    },

    /// Advance the baseline without reporting changes
    Skip {
        /// Snapshot JSON file, or `-` for stdin
        input: PathBuf,
    },

    /// Show the stored baseline
    Show {
        /// Print the stored snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the stored baseline
    Clear,

    /// Print the canonical form and fingerprint of a JSON value
    Hash {
        /// JSON file, or `-` for stdin
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    if let Commands::Hash { input } = &cli.command {
        return cmd_hash(input);
    }

    let backend = FileBackend::open(&cli.store)
        .with_context(|| format!("cannot open store at {}", cli.store.display()))?;
    let tracker = TrackerBuilder::new()
        .namespace(cli.namespace)
        .logical_key(cli.key)
        .max_chunk_bytes(cli.chunk_size)
        .ignore_patterns(cli.ignore)
        .skip_private(cli.skip_private)
        .build(backend)
        .context("invalid tracker configuration")?;

    match cli.command {
        Commands::Diff { input, json, stat } => cmd_diff(&tracker, &input, json, stat),
        Commands::Commit { input } => cmd_commit(&tracker, &input),
        Commands::Skip { input } => cmd_skip(&tracker, &input),
        Commands::Show { json } => cmd_show(&tracker, json),
        Commands::Clear => cmd_clear(&tracker),
        Commands::Hash { .. } => Ok(()),
    }
}

fn read_json(input: &Path) -> Result<Value> {
    let mut raw = String::new();
    if input == Path::new("-") {
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("cannot read stdin")?;
    } else {
        raw = std::fs::read_to_string(input)
            .with_context(|| format!("cannot read {}", input.display()))?;
    }
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", input.display()))
}

fn observe(tracker: &Tracker<FileBackend>, input: &Path) -> Result<Snapshot> {
    let payload = read_json(input)?;
    Ok(tracker.accept_payload(&payload)?)
}

fn cmd_diff(tracker: &Tracker<FileBackend>, input: &Path, json: bool, stat: bool) -> Result<()> {
    let current = observe(tracker, input)?;
    let report = match tracker.request_diff(&current) {
        Ok(report) => report,
        Err(SnapError::NoStoredSnapshot) => {
            println!(
                "{} No baseline stored yet; run {} first",
                "!".yellow().bold(),
                "stylesnap commit".cyan()
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if stat {
        print_stats(&report);
        return Ok(());
    }

    print_report(&report);
    println!();
    print_stats(&report);
    Ok(())
}

fn cmd_commit(tracker: &Tracker<FileBackend>, input: &Path) -> Result<()> {
    let current = observe(tracker, input)?;
    let committed = tracker.commit_snapshot(current)?;
    let chunks = tracker
        .store()
        .metadata()?
        .map_or(0, |m| m.chunk_count);

    println!(
        "{} Committed {} elements in {} chunk(s)",
        "✓".green().bold(),
        committed.len().to_string().yellow().bold(),
        chunks
    );
    Ok(())
}

fn cmd_skip(tracker: &Tracker<FileBackend>, input: &Path) -> Result<()> {
    let current = observe(tracker, input)?;
    let elements = current.len();
    tracker.discard_without_committing(current)?;
    println!("{} Baseline advanced to {} elements", "✓".green().bold(), elements);
    Ok(())
}

fn cmd_show(tracker: &Tracker<FileBackend>, json: bool) -> Result<()> {
    let Some(snapshot) = tracker.stored_snapshot()? else {
        println!("{}", "No baseline stored".yellow());
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("{}", "Stored baseline:".blue().bold());
    println!("  Elements: {}", snapshot.len().to_string().yellow());
    println!("  Taken: {}", age(snapshot.timestamp).cyan());
    if let Some(metadata) = tracker.store().metadata()? {
        println!(
            "  Storage: {} bytes in {} chunk(s)",
            metadata.total_length, metadata.chunk_count
        );
    }

    let mut by_kind: BTreeMap<ElementKind, usize> = BTreeMap::new();
    for element in &snapshot.elements {
        *by_kind.entry(element.kind).or_default() += 1;
    }
    for (kind, count) in by_kind {
        println!("    {:<20} {}", kind.label(), count);
    }
    Ok(())
}

fn cmd_clear(tracker: &Tracker<FileBackend>) -> Result<()> {
    tracker.reset()?;
    println!("{} Stored baseline removed", "✓".green().bold());
    Ok(())
}

fn cmd_hash(input: &Path) -> Result<()> {
    let value = read_json(input)?;
    println!("{}", canonicalize(&value).dimmed());
    println!("{}", hash_value(&value).yellow().bold());
    Ok(())
}

fn print_report(report: &ChangeReport) {
    if !report.has_changes() {
        println!("{}", "No changes".green());
        return;
    }

    // colorize the plain changelog line by line
    for line in render_changelog(report).lines() {
        let trimmed = line.trim_start();
        let colored_line = match trimmed.chars().next() {
            _ if !line.starts_with(' ') => line.bold(),
            Some('+') => line.green(),
            Some('-') => line.red(),
            Some('~') => line.yellow(),
            _ => line.normal(),
        };
        println!("{}", colored_line);
    }
}

fn print_stats(report: &ChangeReport) {
    let stats = report.stats();
    println!("{}", "Summary:".bold());
    println!(
        "  {} added, {} modified, {} removed",
        stats.added.to_string().green(),
        stats.modified.to_string().yellow(),
        stats.removed.to_string().red()
    );
    for (kind, count) in &stats.by_kind {
        println!("    {:<20} {}", kind.label(), count);
    }
}

fn age(timestamp_ms: i64) -> String {
    let elapsed_ms = chrono::Utc::now().timestamp_millis().saturating_sub(timestamp_ms);
    let elapsed = Duration::from_secs((elapsed_ms.max(0) / 1000) as u64);
    format!("{} ago", format_duration(elapsed))
}
