//! url-harvester main entry point
//!
//! This is the command-line interface for the url-harvester keyword search
//! harvester.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing_subscriber::EnvFilter;
use url_harvester::config::{load_config, validate, Config};
use url_harvester::{Backend, CrawlScheduler, Engine, OutputFormat};

/// url-harvester: turn keywords into search result URLs
///
/// Reads one keyword per line, searches each on the configured backend,
/// follows every results page and writes `keyword<TAB>url` lines for each
/// unique, non-blacklisted result.
#[derive(Parser, Debug)]
#[command(name = "url-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A keyword-to-URL search harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Keyword file, one keyword per line ("-" for stdin)
    #[arg(short, long, value_name = "INPUT", default_value = "-")]
    input: PathBuf,

    /// Append results to this file instead of stdout
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Search backend (google, google-image, bing, baidu)
    #[arg(short, long, value_parser = parse_engine)]
    engine: Option<Engine>,

    /// Query URL template containing $keyword
    #[arg(short, long, value_name = "BASE_URL")]
    base_url: Option<String>,

    /// Number of concurrent workers
    #[arg(short, long, value_name = "ROUTINES")]
    routines: Option<usize>,

    /// Result format (domain, url, protocol_domain, raw)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the search setup without fetching anything
    #[arg(long)]
    dry_run: bool,
}

fn parse_engine(name: &str) -> Result<Engine, String> {
    Engine::from_name(name).ok_or_else(|| format!("unknown engine '{}'", name))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    apply_overrides(&mut config, &cli).context("Invalid command-line override")?;

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    handle_search(config, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so results on stdout stay clean.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("url_harvester=info,warn"),
            1 => EnvFilter::new("url_harvester=debug,info"),
            2 => EnvFilter::new("url_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Layers command-line flags over the file config and re-validates
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(engine) = cli.engine {
        config.search.engine = engine;
        // A new engine without an explicit template uses its own default
        if cli.base_url.is_none() {
            config.search.base_url = None;
        }
    }
    if let Some(base_url) = &cli.base_url {
        config.search.base_url = Some(base_url.clone());
    }
    if let Some(routines) = cli.routines {
        config.search.routine_count = routines;
    }
    if let Some(format) = cli.format {
        config.search.format = format;
    }

    validate(config)?;
    Ok(())
}

/// Handles --dry-run: prints the resolved search setup
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let backend = Backend::from_config(&config.search)?;

    println!("=== url-harvester Dry Run ===\n");

    println!("Search:");
    println!("  Engine: {}", config.search.engine);
    println!(
        "  Base URL: {}",
        config.search.resolved_base_url().unwrap_or("<none>")
    );
    println!("  User agent: {}", backend.user_agent());
    println!("  Sample dork: {}", backend.dork("inurl:index.php?id="));
    println!("  Workers: {}", config.search.routine_count);
    println!("  Format: {}", config.search.format);

    println!("\nQueues:");
    println!("  Work capacity: {}", config.queue.work_capacity);
    println!("  Result capacity: {}", config.queue.result_capacity);

    println!("\nJump-link prefixes ({}):", config.filter.redirect_prefixes.len());
    for prefix in &config.filter.redirect_prefixes {
        println!("  - {}", prefix);
    }

    println!("\nBlacklisted Domains ({}):", config.blacklist.len());
    for entry in &config.blacklist {
        println!("  - {}", entry.domain);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main search run
async fn handle_search(config: Config, cli: &Cli) -> anyhow::Result<()> {
    let scheduler = CrawlScheduler::from_config(&config)?;

    let keywords: Box<dyn AsyncBufRead + Unpin + Send> = if cli.input.as_os_str() == "-" {
        Box::new(BufReader::new(tokio::io::stdin()))
    } else {
        let file = tokio::fs::File::open(&cli.input)
            .await
            .with_context(|| format!("Failed to open keyword file {}", cli.input.display()))?;
        Box::new(BufReader::new(file))
    };

    let output: Box<dyn AsyncWrite + Unpin + Send> = match &cli.output {
        Some(path) => {
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .with_context(|| format!("Failed to open output file {}", path.display()))?;
            Box::new(file)
        }
        None => Box::new(tokio::io::stdout()),
    };

    tracing::info!(
        "Searching with {} ({} workers)",
        scheduler.backend().engine(),
        scheduler.settings().routine_count
    );

    match scheduler.run(keywords, output).await {
        Ok(summary) => {
            tracing::info!(
                "Search complete: {}/{} keywords finished, {} results written, {} dropped, {:.1}s",
                summary.finished,
                summary.submitted,
                summary.results_written,
                summary.results_dropped,
                summary.elapsed.as_secs_f64()
            );
            if summary.workers_alive_at_close > 0 {
                tracing::warn!(
                    "{} workers were still running when the result queue closed",
                    summary.workers_alive_at_close
                );
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Search failed: {}", e);
            Err(e.into())
        }
    }
}
