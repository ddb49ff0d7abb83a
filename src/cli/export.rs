//! Export command implementation

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::CliError;
use crate::descriptor::RootDescriptor;
use crate::fetcher::share_http::{ShareListingClient, DEFAULT_BASE_URL};
use crate::metrics;
use crate::output::path::default_output_path;
use crate::output::{write_report, OutputFormat, TreeStats};
use crate::shutdown::SharedShutdown;
use crate::traversal::{ProgressSnapshot, TraversalConfig, TraversalOutcome, TreeBuilder};
use crate::TraversalMode;

/// Upper bound for --max-concurrent; the share host throttles aggressively
const MAX_CONCURRENCY: usize = 16;

/// How often the progress bar polls the traversal counters
const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Share Tree Exporter CLI
#[derive(Parser, Debug)]
#[command(name = "share-tree-exporter")]
#[command(about = "Export the directory tree of a shared file library", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Command result format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: SummaryFormat,

    /// Maximum simultaneous listing requests (max: 16)
    #[arg(long, global = true, default_value = "2", value_parser = parse_concurrency)]
    pub max_concurrent: usize,

    /// Minimum spacing between two request starts, in milliseconds
    #[arg(long, global = true, default_value_t = 3000)]
    pub min_interval_ms: u64,

    /// Attempts per page before it is abandoned (range: 1-10)
    #[arg(long, global = true, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_retries: u32,

    /// Records requested per page (range: 1-1000)
    #[arg(long, global = true, default_value = "100", value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub page_size: u32,

    /// Pause between successful pages of one directory, in milliseconds
    #[arg(long, global = true, default_value_t = 2000)]
    pub settle_delay_ms: u64,

    /// Share host base URL
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Session cookie sent with every listing request
    #[arg(long, global = true, env = "SHARE_TREE_COOKIE", hide_env_values = true)]
    pub cookie: Option<String>,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Traversal configuration from the global flags
    pub fn traversal_config(&self) -> TraversalConfig {
        TraversalConfig::default()
            .with_max_concurrent(self.max_concurrent)
            .with_min_interval(Duration::from_millis(self.min_interval_ms))
            .with_max_retries(self.max_retries)
            .with_page_size(self.page_size)
            .with_page_settle_delay(Duration::from_millis(self.settle_delay_ms))
    }

    fn listing_client(&self) -> Result<ShareListingClient, CliError> {
        let client = match self.cookie.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(cookie) => ShareListingClient::with_cookie(&self.base_url, cookie)?,
            None => {
                warn!("No session cookie supplied; the share host may reject listing requests");
                ShareListingClient::new(&self.base_url)?
            }
        };
        Ok(client)
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Traverse a shared directory and write a report
    Export(ExportArgs),

    /// Check a root descriptor file or the effective configuration
    Validate(super::ValidateCommand),
}

/// Export command arguments
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// JSON file describing the root directory
    #[arg(long, conflicts_with_all = ["fs_id", "msg_id", "uk", "gid"])]
    pub root_file: Option<PathBuf>,

    /// Identifier of the root directory
    #[arg(long)]
    pub fs_id: Option<String>,

    /// Share message identifier
    #[arg(long)]
    pub msg_id: Option<String>,

    /// Sharing user identifier
    #[arg(long)]
    pub uk: Option<String>,

    /// Group conversation identifier
    #[arg(long)]
    pub gid: Option<String>,

    /// Display name of the root directory
    #[arg(long)]
    pub name: Option<String>,

    /// Levels below the root to list (at least 1)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub depth: Option<u32>,

    /// Keep directories only (dirs) or every entry (all)
    #[arg(long, default_value = "dirs")]
    pub mode: TraversalMode,

    /// Report format: txt, csv or json
    #[arg(long, default_value = "txt")]
    pub format: OutputFormat,

    /// Report path (default: derived from the root name)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Keep discovery order instead of sorting directories first
    #[arg(long, default_value_t = false)]
    pub keep_order: bool,
}

impl ExportArgs {
    /// Root descriptor from --root-file or the individual id flags
    pub fn resolve_root(&self) -> Result<RootDescriptor, CliError> {
        if let Some(path) = &self.root_file {
            let mut root = RootDescriptor::load(path)?;
            if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
                root.display_name = name.trim().to_string();
            }
            return Ok(root);
        }

        let (Some(fs_id), Some(msg_id), Some(uk), Some(gid)) =
            (&self.fs_id, &self.msg_id, &self.uk, &self.gid)
        else {
            return Err(CliError::InvalidArgument(
                "either --root-file or all of --fs-id, --msg-id, --uk and --gid are required"
                    .to_string(),
            ));
        };

        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(fs_id.as_str());

        let root = RootDescriptor::new(fs_id, msg_id, uk, gid, name);
        root.validate()?;
        Ok(root)
    }

    /// `--depth` if given, otherwise the configured default
    pub fn effective_depth(&self, config: &TraversalConfig) -> u32 {
        self.depth.unwrap_or(config.default_depth)
    }

    /// Run the export
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let root = self.resolve_root()?;
        let config = cli.traversal_config();
        let depth = self.effective_depth(&config);

        if let Some(addr) = cli.metrics_addr {
            metrics::init_metrics(addr).await?;
        }

        let client = cli.listing_client()?;
        let builder = TreeBuilder::new(Arc::new(client), config).with_shutdown(shutdown);
        let traversal = builder.prepare(&root, depth, self.mode)?;
        let counters = traversal.progress();

        info!(
            "Exporting {} (depth {}, mode {}) as {}",
            root, depth, self.mode, self.format
        );

        let progress = match cli.output_format {
            SummaryFormat::Human => create_progress_bar(&root),
            SummaryFormat::Json => ProgressBar::hidden(),
        };

        let run = traversal.run();
        tokio::pin!(run);
        let mut ticker = tokio::time::interval(PROGRESS_POLL_INTERVAL);
        let mut outcome = loop {
            tokio::select! {
                outcome = &mut run => break outcome,
                _ = ticker.tick() => update_progress_bar(&progress, counters.snapshot()),
            }
        };
        progress.finish_and_clear();

        if !self.keep_order {
            outcome.root.sort_for_presentation();
        }

        let path = self
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&outcome.root.name, self.mode, self.format));
        write_report(&outcome, self.format, &path)?;

        match cli.output_format {
            SummaryFormat::Json => output_json(&outcome, &path, self.format),
            SummaryFormat::Human => output_human(&outcome, &path),
        }

        Ok(())
    }
}

/// Command result format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for SummaryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(SummaryFormat::Json),
            "human" => Ok(SummaryFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Output result as JSON
fn output_json(outcome: &TraversalOutcome, path: &Path, format: OutputFormat) {
    let stats = TreeStats::collect(&outcome.root);
    let output = serde_json::json!({
        "success": true,
        "partial": outcome.is_partial(),
        "cancelled": outcome.cancelled,
        "root": outcome.root.name,
        "mode": outcome.mode,
        "max_depth": outcome.max_depth,
        "format": format,
        "output_path": path.display().to_string(),
        "directories": stats.containers,
        "files": stats.leaves,
        "total_size_bytes": stats.total_leaf_bytes,
        "discovered": outcome.progress.discovered,
        "processed": outcome.progress.processed,
        "abandoned": outcome.abandoned,
        "elapsed_ms": outcome.elapsed.as_millis() as u64,
    });

    println!("{output}");
}

/// Output result in human-readable format
fn output_human(outcome: &TraversalOutcome, path: &Path) {
    let stats = TreeStats::collect(&outcome.root);

    if outcome.is_partial() {
        println!("\nExport finished with an incomplete listing");
    } else {
        println!("\nExport completed successfully!");
    }
    println!("Root: {}", outcome.root.name);
    println!("Output: {}", path.display());
    println!("Directories: {}", stats.containers);
    if outcome.mode == TraversalMode::All {
        println!("Files: {}", stats.leaves);
    }
    println!("Fetch time: {:.2} s", outcome.elapsed.as_secs_f64());

    if outcome.cancelled {
        eprintln!("Cancelled before completion; the report covers what was listed so far.");
    }
    if !outcome.abandoned.is_empty() {
        eprintln!("Directories that could not be fully listed:");
        for node in &outcome.abandoned {
            eprintln!("  - {} ({})", node.name, node.reason);
        }
    }
}

// ─── Progress bar ────────────────────────────────────────────────────────────

/// Create progress bar with style
fn create_progress_bar(root: &RootDescriptor) -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(format!("Listing {}", root.display_name));
    pb
}

/// The length grows as directories are discovered.
fn update_progress_bar(pb: &ProgressBar, snapshot: ProgressSnapshot) {
    pb.set_length(snapshot.discovered);
    pb.set_position(snapshot.processed);
}
