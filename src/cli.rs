// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
// - crawl: the full run (discover, crawl, write CSV, optionally publish)
// - categories: discovery only, handy when writing a new site profile
//
// Site-specific settings come from a JSON profile (--profile). The most
// common knobs can also be set directly with flags, which win over the file.
//
// Rust concepts:
// - Derive macros: Parser / Subcommand / Args generate the parsing code
// - #[command(flatten)]: sharing one group of flags between subcommands
// - Option<T>: "flag not given" vs. "flag given with a value"
// =============================================================================

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::crawl::SiteProfile;

#[derive(Parser, Debug)]
#[command(
    name = "shelf-scout",
    version,
    about = "Crawl a storefront's categories and export its products to CSV",
    long_about = "shelf-scout discovers the product categories of a storefront, walks every \
                  page of each category and writes name, price, part number and availability \
                  of every product to a CSV file. Optionally the file is committed and pushed with git."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl every category and write the product export
    ///
    /// Example: shelf-scout crawl https://mustangclinic.eu/en/ --workers 2
    Crawl {
        /// Storefront page holding the category menu
        root_url: String,

        /// Where to write the CSV export
        #[arg(long, short, default_value = "products.csv")]
        output: PathBuf,

        /// Number of categories crawled in parallel (one session each)
        #[arg(long, default_value_t = 1)]
        workers: usize,

        /// Crawl each category URL once even if the menu lists it twice
        #[arg(long)]
        dedupe_categories: bool,

        /// Commit and push the export with git after writing it
        #[arg(long)]
        publish: bool,

        /// Commit message used with --publish
        #[arg(long, default_value = "Add updated product data CSV")]
        commit_message: String,

        /// Print the run summary as JSON instead of a table
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        site: SiteArgs,
    },

    /// Only list the category URLs found on the root page
    ///
    /// Example: shelf-scout categories https://mustangclinic.eu/en/
    Categories {
        /// Storefront page holding the category menu
        root_url: String,

        /// Print the URLs as a JSON array
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        site: SiteArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SiteArgs {
    /// JSON file with selectors and limits for the storefront
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Label for the COMPETITOR column
    #[arg(long)]
    pub competitor: Option<String>,

    /// Stop a category after this many pages
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Longest wait (ms) for products to render after loading a page
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl SiteArgs {
    // Builds the effective profile: defaults, then the file, then flags
    pub fn site_profile(&self) -> Result<SiteProfile> {
        let mut profile = match &self.profile {
            Some(path) => SiteProfile::load(path)?,
            None => SiteProfile::default(),
        };

        if let Some(competitor) = &self.competitor {
            profile.competitor = competitor.clone();
        }
        if let Some(max_pages) = self.max_pages {
            profile.max_pages_per_category = max_pages;
        }
        if let Some(settle_ms) = self.settle_ms {
            profile.settle_ms = settle_ms;
        }

        Ok(profile)
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Option<usize> for --max-pages but usize for --workers?
//    - --workers always has a value (default 1)
//    - --max-pages only matters if given; otherwise the profile decides
//    - Option lets us tell "not given" apart from any real number
//
// 2. What does #[command(flatten)] do?
//    - Copies the fields of SiteArgs into the subcommand as if written there
//    - Both 'crawl' and 'categories' get the same site flags for free
// -----------------------------------------------------------------------------
