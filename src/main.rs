// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (tracing, filtered by RUST_LOG)
// 2. Parse command-line arguments using clap
// 3. Dispatch to the appropriate subcommand handler
// 4. Print a summary and exit with a proper code:
//      0 = run completed
//      1 = run was cancelled (Ctrl-C); the partial export was still written
//      2 = fatal error (bad config, no session, export not writable)
//
// Logs go to stderr; the summary goes to stdout so --json output stays
// machine-readable.
// =============================================================================

mod cli;
mod crawl;
mod dom;
mod sink;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use cli::{Cli, Commands, SiteArgs};
use crawl::{CrawlOrchestrator, RunReport, SiteProfile};
use dom::{HttpSessionFactory, SessionFactory};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reqwest=warn,hyper=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl {
            root_url,
            output,
            workers,
            dedupe_categories,
            publish,
            commit_message,
            json,
            site,
        } => {
            let options = CrawlOptions {
                output: &output,
                workers,
                dedupe_categories,
                publish,
                commit_message: &commit_message,
                json,
            };
            handle_crawl(&root_url, &site, options).await
        }
        Commands::Categories {
            root_url,
            json,
            site,
        } => handle_categories(&root_url, &site, json).await,
    }
}

struct CrawlOptions<'a> {
    output: &'a Path,
    workers: usize,
    dedupe_categories: bool,
    publish: bool,
    commit_message: &'a str,
    json: bool,
}

// Handles the 'crawl' subcommand
async fn handle_crawl(root_url: &str, site: &SiteArgs, options: CrawlOptions<'_>) -> Result<i32> {
    let root = parse_root(root_url)?;
    let profile = load_profile(site)?;
    let factory = HttpSessionFactory::new(Duration::from_secs(site.timeout_secs));

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let orchestrator =
        CrawlOrchestrator::new(profile, cancel).dedupe_categories(options.dedupe_categories);
    let (aggregate, report) = orchestrator
        .crawl(&factory, root.as_str(), options.workers)
        .await?;

    if aggregate.is_empty() {
        warn!("No products were scraped; writing an empty export");
    }

    // The export is written even for empty or cancelled runs
    sink::write_csv(options.output, aggregate.records())
        .with_context(|| format!("Failed to write {}", options.output.display()))?;

    if options.publish {
        if let Err(e) = sink::publish(options.output, options.commit_message).await {
            warn!(error = %e, "Error with Git command; the export on disk is still valid");
        }
    }

    print_report(&report, options.output, options.json)?;

    Ok(if report.cancelled { 1 } else { 0 })
}

// Handles the 'categories' subcommand
async fn handle_categories(root_url: &str, site: &SiteArgs, json: bool) -> Result<i32> {
    let root = parse_root(root_url)?;
    let profile = load_profile(site)?;
    let factory = HttpSessionFactory::new(Duration::from_secs(site.timeout_secs));

    let mut session = factory
        .open()
        .await
        .map_err(crawl::CrawlError::SessionUnavailable)?;
    let categories = crawl::discover_categories(session.as_mut(), root.as_str(), &profile).await;
    session.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else {
        for category in &categories {
            println!("{}", category);
        }
        println!("\n📂 {} categor{} found", categories.len(), if categories.len() == 1 { "y" } else { "ies" });
    }
    Ok(0)
}

fn parse_root(root_url: &str) -> Result<Url> {
    Url::parse(root_url).with_context(|| format!("Invalid root URL '{}'", root_url))
}

fn load_profile(site: &SiteArgs) -> Result<SiteProfile> {
    let profile = site.site_profile()?;
    profile.validate().context("Invalid site profile")?;
    if profile.max_pages_per_category == 0 {
        return Err(crawl::CrawlError::InvalidConfig(
            "max pages per category must be at least 1".to_string(),
        )
        .into());
    }
    Ok(profile)
}

// First Ctrl-C: stop gracefully. Workers finish their current page and
// the partial export is written.
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received; finishing in-flight pages");
            cancel.cancel();
        }
    });
}

fn print_report(report: &RunReport, output: &Path, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_table(report, output);
    }
    Ok(())
}

fn print_table(report: &RunReport, output: &Path) {
    println!("{:<32} {:>8}", "CATEGORIES", "COUNT");
    println!("{}", "=".repeat(41));
    println!("{:<32} {:>8}", "discovered", report.categories_discovered);
    println!("{:<32} {:>8}", "completed", report.categories_completed);
    println!("{:<32} {:>8}", "failed", report.categories_failed);
    println!("{:<32} {:>8}", "stopped at page limit", report.categories_capped);
    println!("{:<32} {:>8}", "not processed", report.categories_unprocessed);
    println!();

    println!("📊 Summary:");
    println!("   📄 Pages visited: {}", report.pages_visited);
    println!("   ✅ Products exported: {}", report.records);
    println!("   ⏭️  Skipped (no availability): {}", report.skipped_missing_availability);
    println!("   ❌ Skipped (extraction error): {}", report.skipped_extraction_error);
    if report.cancelled {
        println!("   ⚠️  Run was cancelled; export is partial");
    }
    println!("   💾 Saved to {}", output.display());
}
