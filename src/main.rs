//! repo-harvester - harvest GitHub repositories and source files into CSV reports.
//!
//! ```bash
//! export GITHUB_ACCESS_TOKEN=...
//!
//! # Line counts of listed files, sources saved as code/<index>.go
//! repo-harvester harvest --input chaincode.csv --output lines.csv --artifacts code
//!
//! # Popularity counters of listed repositories
//! repo-harvester harvest --input repos.csv --output repo_info.csv
//!
//! # Which saved sources use private data
//! repo-harvester scan --dir code --keyword PrivateData --output PDC.csv
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repo_harvester::{
    links, read_items, sources, write_items, Derivation, GithubFetcher, HarvestConfig,
    HarvestEvent, HarvestLoop, HarvestObserver, ReportAssembler, TracingObserver,
};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "repo-harvester")]
#[command(about = "Harvest GitHub repository metadata and source files into CSV reports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug output.
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every listed item and write a report.
    Harvest(HarvestArgs),

    /// Flag saved sources that contain a keyword.
    Scan {
        /// Directory of saved sources.
        #[arg(long)]
        dir: PathBuf,
        /// Case-sensitive keyword.
        #[arg(long)]
        keyword: String,
        /// Output CSV.
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Rewrite the package declaration of every Go file to `package main`.
    Rewrite {
        #[arg(long)]
        dir: PathBuf,
    },

    /// Write the distinct lines of a link list.
    Dedup {
        #[arg(long, short)]
        input: PathBuf,
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Write the lines of a link list that are absent from another.
    Subtract {
        #[arg(long, short)]
        input: PathBuf,
        /// Lines to drop.
        #[arg(long, short)]
        exclude: PathBuf,
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Convert `owner/repo:path` search results into a harvest input table.
    Links {
        #[arg(long, short)]
        input: PathBuf,
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct HarvestArgs {
    /// Input CSV with `Repo` and optional `Path` columns.
    #[arg(long, short)]
    input: PathBuf,

    /// Report CSV (overwritten).
    #[arg(long, short)]
    output: PathBuf,

    /// Save fetched sources as `<dir>/<index>.<extension>`.
    #[arg(long)]
    artifacts: Option<PathBuf>,

    /// Extension of saved sources.
    #[arg(long, default_value = "go")]
    extension: String,

    /// Report keyword presence instead of line counts.
    #[arg(long)]
    keyword: Option<String>,

    /// Delay before each request, in milliseconds.
    #[arg(long, default_value_t = 200)]
    delay_ms: u64,

    /// Request timeout, in seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// REST API base URL.
    #[arg(long, default_value = repo_harvester::config::DEFAULT_API_BASE)]
    api_base: String,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool) {
    let default = if verbose {
        "repo_harvester=debug,info"
    } else {
        "repo_harvester=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

// ============================================================================
// Progress
// ============================================================================

const PROGRESS_TEMPLATE: &str = "{msg} {wide_bar} {pos}/{len} [{elapsed_precise}<{eta_precise}]";

/// Draws a progress bar for the harvest; other events go to the log.
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template(PROGRESS_TEMPLATE) {
            bar.set_style(style);
        }
        bar.set_message("harvest");
        Self::with_bar(bar)
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl HarvestObserver for ProgressObserver {
    fn on_event(&self, event: &HarvestEvent) {
        match event {
            HarvestEvent::Started { total } => self.bar.set_length(*total as u64),
            HarvestEvent::Progress { processed, .. } => {
                self.bar.set_position(*processed as u64);
                return;
            }
            HarvestEvent::Finished { .. } => self.bar.finish(),
            _ => {}
        }
        self.bar.suspend(|| TracingObserver.on_event(event));
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn harvest(args: &HarvestArgs) -> Result<()> {
    let items = read_items(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let derivation = match &args.keyword {
        Some(keyword) => Derivation::Keyword(keyword.clone()),
        None => Derivation::LineCount,
    };
    let mut config = HarvestConfig::from_env()
        .with_api_base(args.api_base.as_str())
        .with_delay(Duration::from_millis(args.delay_ms))
        .with_timeout(Duration::from_secs(args.timeout_secs))
        .with_extension(args.extension.as_str())
        .with_derivation(derivation);
    if let Some(dir) = &args.artifacts {
        config = config.with_artifacts(dir);
    }

    let fetcher = GithubFetcher::new(&config)?;
    let report = HarvestLoop::new(fetcher, config)
        .with_observer(Arc::new(ProgressObserver::new()))
        .run(&items)
        .await?;

    ReportAssembler::new()
        .with_keyword_column(args.keyword.is_some())
        .assemble(&report, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("Saved in {}", args.output.display());
    Ok(())
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Harvest(args) => harvest(args).await,
        Commands::Scan {
            dir,
            keyword,
            output,
        } => {
            let hits = sources::scan_directory(dir, keyword)?;
            sources::write_scan(&hits, output)?;
            println!("Saved in {}", output.display());
            Ok(())
        }
        Commands::Rewrite { dir } => {
            let summary = sources::rewrite_packages(dir)?;
            println!(
                "Rewrote {} of {} Go files ({} failed)",
                summary.rewritten, summary.scanned, summary.failed
            );
            Ok(())
        }
        Commands::Dedup { input, output } => {
            links::dedup_file(input, output)?;
            println!("Unique links have been written to {}", output.display());
            Ok(())
        }
        Commands::Subtract {
            input,
            exclude,
            output,
        } => {
            links::subtract_files(input, exclude, output)?;
            println!("Filtered links have been written to {}", output.display());
            Ok(())
        }
        Commands::Links { input, output } => {
            let items = links::read_link_file(input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            write_items(&items, output)?;
            println!("Saved {} items in {}", items.len(), output.display());
            Ok(())
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repo_harvester::HarvestItem;

    #[test]
    fn test_progress_observer_tracks_events() {
        let observer = ProgressObserver::with_bar(ProgressBar::hidden());

        observer.on_event(&HarvestEvent::Started { total: 3 });
        observer.on_event(&HarvestEvent::Progress {
            processed: 1,
            total: 3,
        });
        observer.on_event(&HarvestEvent::ItemFailed {
            index: 1,
            item: HarvestItem::file("org/gone", "a.go"),
            reason: repo_harvester::harvest::FailureReason::Transport {
                detail: "timeout".to_string(),
            },
        });
        observer.on_event(&HarvestEvent::Progress {
            processed: 2,
            total: 3,
        });

        assert_eq!(observer.bar.length(), Some(3));
        assert_eq!(observer.bar.position(), 2);
        assert!(!observer.bar.is_finished());

        observer.on_event(&HarvestEvent::Finished {
            total: 3,
            failed: 1,
        });
        assert!(observer.bar.is_finished());
    }
}
