//! mediashelf - streaming media library scanner.
//!
//! Usage:
//!   mediashelf scan PATH              List every directory batch
//!   mediashelf resolve PATH           Scan and classify album folders
//!   mediashelf rules PATH...          Show which ignore rule claims a path
//!   mediashelf --help                 Show help

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use mediashelf_core::{LibraryKind, LibrarySection, MediaNode, MediaShelfConfig, SectionLocation};
use mediashelf_resolve::{ResolverRegistry, spawn_section_scan};
use mediashelf_scan::{CancellationToken, DirectoryWalker, IgnoreEngine, ScanReport};

#[derive(Parser)]
#[command(
    name = "mediashelf",
    version,
    about = "Streaming media library scanner",
    long_about = "mediashelf walks a media library one directory at a time, \
                  prunes ignored entries and classifies album folders."
)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk a directory tree and print one line per directory
    Scan {
        /// Root to scan
        path: PathBuf,

        /// Emit one JSON object per batch
        #[arg(long)]
        json: bool,

        /// Include dot-prefixed entries
        #[arg(long)]
        hidden: bool,

        /// Extra ignore glob (repeatable)
        #[arg(long = "ignore", value_name = "GLOB")]
        ignore: Vec<String>,
    },

    /// Scan a library location and print every resolved album
    Resolve {
        /// Library location root
        path: PathBuf,

        /// Library kind
        #[arg(long, default_value = "music")]
        kind: LibraryKind,

        /// Section id stamped on resolved entities
        #[arg(long, default_value = "1")]
        section_id: i64,

        /// Emit one JSON object per resolved album
        #[arg(long)]
        json: bool,
    },

    /// Show which ignore rule, if any, claims each path
    Rules {
        /// Paths to test
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = MediaShelfConfig::load_or_default(cli.config.as_deref())?;
    tracing::debug!(sections = config.sections.len(), "Configuration loaded");

    match cli.command {
        Command::Scan {
            path,
            json,
            hidden,
            ignore,
        } => run_scan(&config, &path, json, hidden, ignore),
        Command::Resolve {
            path,
            kind,
            section_id,
            json,
        } => run_resolve(&config, &path, kind, section_id, json),
        Command::Rules { paths } => run_rules(&config, &paths),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Stream batches to stdout.
fn run_scan(
    config: &MediaShelfConfig,
    path: &Path,
    json: bool,
    hidden: bool,
    ignore: Vec<String>,
) -> Result<()> {
    let mut scan = config.scan.with_root(path);
    scan.include_hidden |= hidden;
    scan.ignore_patterns.extend(ignore);

    let walker = DirectoryWalker::from_config(scan).context("Invalid scan configuration")?;
    let mut stream = walker.scan(CancellationToken::new());

    for batch in stream.by_ref() {
        if json {
            println!("{}", serde_json::to_string(&batch)?);
        } else {
            println!(
                "{:<60} {:>5} files {:>4} dirs {:>10}",
                truncate(&batch.directory_path.display().to_string(), 60),
                batch.file_count(),
                batch.subdirectories().count(),
                format_size(batch.total_size())
            );
        }
    }

    print_report(&stream.into_report());
    Ok(())
}

/// Scan one location on the blocking pool and print resolved albums.
fn run_resolve(
    config: &MediaShelfConfig,
    path: &Path,
    kind: LibraryKind,
    section_id: i64,
    json: bool,
) -> Result<()> {
    let root = path.canonicalize().context("Invalid path")?;

    let (section, location) = match config.sections.iter().find(|s| s.id == section_id) {
        Some(section) => {
            if section.kind != kind {
                let configured = section.kind;
                bail!("Section {} is configured as {configured}, not {kind}", section.id);
            }
            let Some(location) = section.location_for(&root).cloned() else {
                bail!("{} is not a location of section {}", root.display(), section.id);
            };
            (section.clone(), location)
        }
        None => {
            let location = SectionLocation {
                id: 1,
                path: root.clone(),
            };
            let section = LibrarySection {
                id: section_id,
                name: kind.to_string(),
                kind,
                locations: vec![location.clone()],
            };
            (section, location)
        }
    };
    tracing::debug!(section = section.id, location = location.id, "Resolving location");

    let walker = Arc::new(
        DirectoryWalker::from_config(config.scan.with_root(&root))
            .context("Invalid scan configuration")?,
    );
    let ignore = Arc::clone(walker.ignore_engine());
    let registry = Arc::new(ResolverRegistry::with_defaults(&config.resolver, ignore));

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let (mut rx, handle) = spawn_section_scan(walker, registry, section, location, cancel, 16);

        while let Some(dir) = rx.recv().await {
            let Some(entity) = dir.entity else {
                continue;
            };
            if json {
                println!("{}", serde_json::to_string(&entity)?);
            } else {
                print_entity(&entity, 0);
            }
        }

        handle.await.context("Scan task failed")
    })?;

    print_report(&report);
    Ok(())
}

/// Explain the ignore decision for each path.
fn run_rules(config: &MediaShelfConfig, paths: &[PathBuf]) -> Result<()> {
    let engine = IgnoreEngine::from_config(&config.scan).context("Invalid ignore rules")?;
    println!("Rules in order: {}", engine.rule_names().join(", "));

    for path in paths {
        let parent = path.parent().unwrap_or(Path::new(""));
        let rule = if path.is_dir() {
            engine.matching_directory_rule(path, Some(parent))
        } else {
            engine.matching_file_rule(path, parent)
        };
        match rule {
            Some(name) => println!("{}  ignored by '{}'", path.display(), name),
            None => println!("{}  kept", path.display()),
        }
    }

    Ok(())
}

/// Print an entity and its descendants as an indented outline.
fn print_entity(node: &MediaNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let detail = match (node.index(), node.absolute_index(), node.media_part()) {
        (Some(index), Some(absolute), _) => format!(" #{index} ({absolute})"),
        (Some(index), None, _) => format!(" #{index}"),
        (None, None, Some(part)) if node.children.is_empty() => {
            format!(" {} {}", part.file_format, format_size(part.size))
        }
        _ => String::new(),
    };
    println!("{}{} {}{}", indent, node.kind.label(), node.title, detail);

    for child in &node.children {
        print_entity(child, depth + 1);
    }
}

fn print_report(report: &ScanReport) {
    let progress = &report.progress;
    eprintln!();
    eprintln!(
        "{} directories, {} files ({}) in {:.2}s",
        progress.dirs_scanned,
        progress.files_scanned,
        format_size(progress.bytes_scanned),
        progress.elapsed.as_secs_f64()
    );
    if progress.dirs_pruned > 0 || progress.files_excluded > 0 {
        eprintln!(
            "{} directories pruned, {} files excluded",
            progress.dirs_pruned, progress.files_excluded
        );
    }
    if report.cancelled {
        eprintln!("Scan cancelled");
    }
    if !report.warnings.is_empty() {
        eprintln!("{} warning(s) during scan", report.warnings.len());
        for warning in &report.warnings {
            eprintln!("  {:?}: {} ({})", warning.kind, warning.path.display(), warning.message);
        }
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to max length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 1).collect();
        format!("{head}…")
    }
}
