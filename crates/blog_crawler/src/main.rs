mod cli;

use std::sync::Arc;

use anyhow::Context;
use blog_engine::{crawl, Blog, CrawlSettings, FetchSettings, ListingSettings, ReqwestFetcher};
use clap::Parser;
use engine_logging::{engine_info, LogDestination};
use log::LevelFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match cli.log_file.clone() {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    engine_logging::initialize(destination, level);

    let fetcher = ReqwestFetcher::new(FetchSettings::default()).context("building HTTP client")?;
    engine_info!(
        "Crawling blog {} from {}",
        cli.blog_id,
        fetcher.settings().base_url
    );

    let listing = ListingSettings {
        count_per_page: cli.count_per_page,
        ..ListingSettings::default()
    };
    let blog = Blog::with_settings(cli.blog_id.clone(), Arc::new(fetcher), listing);

    let mut settings = CrawlSettings::new(cli.posts_dir, cli.assets_dir);
    settings.workers = cli.workers;
    settings.retry_post_fetch = cli.retry_post_fetch;

    let report = crawl(&blog, &settings)
        .await
        .with_context(|| format!("crawling blog {}", cli.blog_id))?;
    engine_info!(
        "Done: {} saved, {} skipped, {} failed",
        report.saved,
        report.skipped_existing,
        report.failed
    );
    Ok(())
}
