//! Tidemark main entry point
//!
//! This is the command-line interface for the Tidemark crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tidemark::config::{load_config_with_hash, Config, PolitenessDelay};
use tidemark::crawler::Coordinator;
use tidemark::output::{
    emit_all, read_snapshot, CrawlReport, CsvRecordWriter, ReportHeader, ReportWriter,
};
use tracing_subscriber::EnvFilter;

/// Tidemark: a bounded, polite, focused-domain web crawler
///
/// Tidemark crawls one site from its seeds, staying inside a domain allow-list
/// and respecting robots.txt and per-host politeness delays. It writes fetch,
/// visit and URL-scope records as CSV plus a text report.
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version = "1.0.0")]
#[command(about = "A bounded, polite, focused-domain web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "report_only")]
    dry_run: bool,

    /// Rebuild the report from previously written CSV records and exit
    #[arg(long, conflicts_with = "dry_run")]
    report_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.report_only {
        handle_report_only(&config, &config_hash)
    } else {
        handle_crawl(config, config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidemark=info,warn"),
            1 => EnvFilter::new("tidemark=debug,info"),
            2 => EnvFilter::new("tidemark=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn report_header(config: &Config, config_hash: &str) -> ReportHeader {
    ReportHeader {
        site_label: config.output.site_label.clone(),
        worker_count: config.crawler.worker_count,
        config_hash: Some(config_hash.to_string()),
    }
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Tidemark Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Workers: {}", config.crawler.worker_count);
    match config.crawler.politeness_delay_ms {
        PolitenessDelay::Fixed(ms) => println!("  Politeness delay: {}ms", ms),
        PolitenessDelay::Range { min, max } => {
            println!("  Politeness delay: {}ms - {}ms (drawn once per run)", min, max)
        }
    }
    println!(
        "  Include binary content: {}",
        config.crawler.include_binary_content
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    match config.crawler.crawl_timeout_secs {
        Some(secs) => println!("  Crawl timeout: {}s", secs),
        None => println!("  Crawl timeout: none"),
    }
    println!("  Honor Crawl-delay: {}", config.crawler.honor_crawl_delay);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nSeeds ({}):", config.scope.seeds.len());
    for seed in &config.scope.seeds {
        println!("  - {}", seed);
    }

    println!("\nAllowed Domains ({}):", config.scope.allowed_domains.len());
    for domain in &config.scope.allowed_domains {
        println!("  - {}", domain);
    }

    println!(
        "\nExcluded Extensions: {}",
        config.scope.excluded_extensions.join(" ")
    );

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Site label: {}", config.output.site_label);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        config.scope.seeds.len()
    );
}

/// Handles the --report-only mode: rebuilds the report from CSV records
fn handle_report_only(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let snapshot = read_snapshot(&config.output.directory, &config.output.site_label)
        .with_context(|| {
            format!(
                "reading records for '{}' from {}",
                config.output.site_label, config.output.directory
            )
        })?;

    let header = report_header(config, config_hash);
    let writer = ReportWriter::new(&config.output.directory, header.clone());
    emit_all(&[&writer], &snapshot).context("writing report")?;

    println!("{}", CrawlReport::from_snapshot(&snapshot).render(&header));
    println!("Report saved to {}", writer.path().display());
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    let header = report_header(&config, &config_hash);
    let directory = config.output.directory.clone();
    let site_label = config.output.site_label.clone();

    let coordinator = Coordinator::new(config).context("starting crawl")?;

    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight fetches");
            stop.stop();
        }
    });

    let snapshot = coordinator.run().await.map_err(|e| {
        tracing::error!("Crawl failed: {}", e);
        e
    })?;

    let records = CsvRecordWriter::new(&directory, &site_label);
    let report = ReportWriter::new(&directory, header.clone());
    emit_all(&[&records, &report], &snapshot).context("writing crawl output")?;

    println!("{}", CrawlReport::from_snapshot(&snapshot).render(&header));
    println!("Report saved to {}", report.path().display());
    Ok(())
}
