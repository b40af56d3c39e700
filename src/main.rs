//! bitpreview - Bounded previews and file trees for repository bitstreams.
//!
//! Usage:
//!   bitpreview show FILE         Preview one file as a tree or text
//!   bitpreview sweep DIR         Generate previews for every file under DIR
//!   bitpreview --help            Show help

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail};
use jwalk::WalkDir;
use tracing_subscriber::EnvFilter;

use bitpreview_core::{Bitstream, ContentKind, PreviewConfig, ViewNode};
use bitpreview_extract::{ArchiveExtractor, ArchiveFormat, TruncationPolicy};
use bitpreview_service::{
    DirectorySource, MemoryStore, OpenAccess, PreviewService, PreviewSweeper, SweepReport,
};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "BITPREVIEW_LOG";

#[derive(Parser)]
#[command(
    name = "bitpreview",
    version,
    about = "Bounded previews and file trees for text, HTML, ZIP and TAR files",
    long_about = "bitpreview shows what a stored file contains without unpacking it.\n\n\
                  Archives are listed as a file tree, plain text is truncated, and \
                  HTML is shown in full."
)]
struct Cli {
    /// Preview configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Maximum number of archive files listed individually
    #[arg(long, global = true)]
    max_files: Option<usize>,

    /// Maximum plain-text preview length in characters
    #[arg(long, global = true)]
    max_chars: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Preview a single file
    Show {
        /// File to preview
        file: PathBuf,

        /// Declared MIME type (guessed from the extension when omitted)
        #[arg(short, long)]
        mime: Option<String>,

        /// Print the preview tree as JSON
        #[arg(long, conflicts_with = "flat")]
        json: bool,

        /// Print the flat `<path>|<size>` archive listing
        #[arg(long)]
        flat: bool,
    },

    /// Generate previews for every file under a directory
    Sweep {
        /// Directory to walk
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Print the sweep report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.max_files, cli.max_chars)?;

    match cli.command {
        Command::Show {
            file,
            mime,
            json,
            flat,
        } => run_show(config, &file, mime, json, flat),
        Command::Sweep { dir, json } => run_sweep(config, &dir, json),
    }
}

/// Install a stderr subscriber; `BITPREVIEW_LOG` overrides the verbosity flag.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Read the config file, if any, then apply command-line overrides.
fn load_config(
    path: Option<&Path>,
    max_files: Option<usize>,
    max_chars: Option<usize>,
) -> Result<PreviewConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read config {}", path.display()))?;
            toml::from_str::<PreviewConfig>(&raw)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => PreviewConfig::default(),
    };

    if let Some(max_files) = max_files {
        config.max_leaf_count = max_files;
    }
    if let Some(max_chars) = max_chars {
        config.max_content_length = max_chars;
    }
    Ok(config)
}

/// Preview one file and print it.
fn run_show(
    mut config: PreviewConfig,
    file: &Path,
    mime: Option<String>,
    json: bool,
    flat: bool,
) -> Result<()> {
    let file = file.canonicalize().context("Invalid path")?;
    if !file.is_file() {
        bail!("{} is not a regular file", file.display());
    }
    let (Some(dir), Some(name)) = (file.parent(), file.file_name()) else {
        bail!("{} has no file name", file.display());
    };
    let name = name.to_string_lossy();
    let mime = mime.unwrap_or_else(|| guess_mime(&name).to_string());
    let bitstream = Bitstream::new(&*name, Some(&*name), mime, 1);

    if flat {
        return print_flat(&config, &file, &bitstream);
    }

    config.generate_on_page_load = true;
    let service = PreviewService::new(config, MemoryStore::new(), OpenAccess)?;
    if !service.can_preview(&bitstream) {
        bail!("Previews are disabled by configuration");
    }

    let roots = service.get_or_generate(&bitstream, &DirectorySource::new(dir))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&roots)?);
        return Ok(());
    }

    if roots.is_empty() {
        eprintln!("No preview available for {} ({})", file.display(), bitstream.mime_type);
        return Ok(());
    }

    match bitstream.kind() {
        ContentKind::PlainText | ContentKind::Html => {
            for root in &roots {
                println!("{}", root.content);
            }
        }
        _ => {
            println!();
            println!("{}", "─".repeat(60));
            println!(" {} - {}", file.display(), format_size(total_size(&roots)));
            println!(
                " {} files listed, {} nodes",
                roots.iter().map(ViewNode::leaf_count).sum::<usize>(),
                roots.iter().map(ViewNode::node_count).sum::<usize>()
            );
            println!("{}", "─".repeat(60));
            println!();
            for root in &roots {
                print_node(root, 0);
            }
        }
    }

    Ok(())
}

/// Print the bounded member listing of an archive, one record per line.
fn print_flat(config: &PreviewConfig, file: &Path, bitstream: &Bitstream) -> Result<()> {
    config
        .validate()
        .map_err(|message| color_eyre::eyre::eyre!("Invalid configuration: {message}"))?;

    let Some(format) = ArchiveFormat::from_kind(bitstream.kind()) else {
        bail!(
            "{} is not an archive ({})",
            file.display(),
            bitstream.mime_type
        );
    };

    let reader = BufReader::new(File::open(file).context("Cannot open file")?);
    let records = ArchiveExtractor::new()
        .try_extract(reader, format)
        .context("Archive listing failed")?;

    for record in TruncationPolicy::from_config(config).limit_leaves(records) {
        println!("{record}");
    }
    Ok(())
}

/// Walk a directory and sweep every regular file.
fn run_sweep(config: PreviewConfig, dir: &Path, json: bool) -> Result<()> {
    let dir = dir.canonicalize().context("Invalid path")?;
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    eprintln!("Sweeping {}...", dir.display());

    let bitstreams = collect_bitstreams(&dir);
    let service = PreviewService::new(config, MemoryStore::new(), OpenAccess)?;
    let source = DirectorySource::new(&dir);

    let report = PreviewSweeper::new().run(&service, &source, bitstreams);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, service.store().node_count());
    }

    Ok(())
}

/// Every regular file below `dir`, as a bitstream whose id is its relative path.
fn collect_bitstreams(dir: &Path) -> Vec<Bitstream> {
    let mut bitstreams = Vec::new();

    for entry in WalkDir::new(dir).skip_hidden(false).sort(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let id = relative.to_string_lossy();
        let name = entry.file_name().to_string_lossy();
        let sequence = i32::try_from(bitstreams.len() + 1).unwrap_or(i32::MAX);

        bitstreams.push(Bitstream::new(
            &*id,
            Some(&*name),
            guess_mime(&name),
            sequence,
        ));
    }

    bitstreams
}

fn print_report(report: &SweepReport, stored_nodes: usize) {
    println!();
    println!("{}", "─".repeat(60));
    println!(" {} bitstreams in {:.2}s", report.processed, report.elapsed_ms as f64 / 1000.0);
    println!("{}", "─".repeat(60));
    println!(" {:<24} {:>8}", "previews stored", report.generated);
    println!(" {:<24} {:>8}", "nodes stored", stored_nodes);
    println!(" {:<24} {:>8}", "already present", report.existing);
    println!(" {:<24} {:>8}", "not stored (html)", report.transient);
    println!(" {:<24} {:>8}", "nothing to preview", report.empty);
    println!(" {:<24} {:>8}", "denied", report.denied);
    println!(" {:<24} {:>8}", "failed", report.failures.len());

    if !report.failures.is_empty() {
        println!();
        for failure in &report.failures {
            println!("  {}: {}", failure.bitstream, failure.error);
        }
    }
}

/// Print a node and its children.
fn print_node(node: &ViewNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let (marker, label) = if node.is_directory {
        ("▼ ", format!("{}/", node.name))
    } else {
        ("  ", node.name.to_string())
    };
    let size = if node.is_directory {
        String::new()
    } else {
        format_size(node.size)
    };

    println!("{indent}{marker}{:<40} {:>10}", truncate(&label, 40), size);

    for child in node.children.values() {
        print_node(child, depth + 1);
    }
}

/// Sum of listed file sizes.
fn total_size(roots: &[ViewNode]) -> u64 {
    fn walk(node: &ViewNode) -> u64 {
        node.size + node.children.values().map(walk).sum::<u64>()
    }
    roots.iter().map(walk).sum()
}

/// Guess a MIME type from a filename.
fn guess_mime(name: &str) -> &'static str {
    let lower = name.to_ascii_lowercase();
    let ends = |suffix: &str| lower.ends_with(suffix);

    if ends(".zip") {
        "application/zip"
    } else if ends(".tar.gz") || ends(".tgz") {
        "application/gzip"
    } else if ends(".tar.bz2") || ends(".tbz2") {
        "application/x-bzip2"
    } else if ends(".tar") {
        "application/x-tar"
    } else if ends(".html") || ends(".htm") {
        "text/html"
    } else if [".txt", ".md", ".csv", ".log", ".json", ".xml", ".toml", ".yaml", ".yml"]
        .iter()
        .any(|ext| ends(ext))
    {
        "text/plain"
    } else {
        "application/octet-stream"
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
        let kept: String = s.chars().take(max_len - 1).collect();
        format!("{kept}…")
    }
}
