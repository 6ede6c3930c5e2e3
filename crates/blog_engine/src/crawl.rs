//! Sequential, resumable crawl of every post in a blog.
//!
//! A post's Markdown file is only written once it has been rendered
//! completely, so its presence on disk is the only progress marker: a post
//! that failed is simply retried on the next run.

use std::path::PathBuf;
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};

use crate::classify::ClassifyError;
use crate::filename::to_filename;
use crate::image::ImageStrategy;
use crate::listing::Blog;
use crate::persist::{ensure_output_dir, markdown_path, AtomicFileWriter, PersistError};
use crate::post::PostError;
use crate::render::{RenderContext, DEFAULT_WORKERS};
use crate::types::TOO_MANY_OPEN_FILES;
use crate::{FailureKind, FetchError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    pub posts_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub workers: usize,
    /// Pause after every saved post.
    pub post_delay: Duration,
    /// Pause before retrying a post that ran out of file handles.
    pub busy_backoff: Duration,
    pub max_retries: u32,
    /// Retry transient post-view fetch failures instead of skipping the post.
    pub retry_post_fetch: bool,
}

impl CrawlSettings {
    pub fn new(posts_dir: impl Into<PathBuf>, assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            posts_dir: posts_dir.into(),
            assets_dir: assets_dir.into(),
            workers: DEFAULT_WORKERS,
            post_delay: Duration::from_millis(200),
            busy_backoff: Duration::from_secs(2),
            max_retries: 5,
            retry_post_fetch: false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlReport {
    pub saved: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("post listing failed: {0}")]
    Listing(#[from] FetchError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Saved { filename: String },
    AlreadyExists { filename: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    Skip,
    RetryAfter(Duration),
}

/// Decides what to do with a post that failed on its `attempt`-th try (0-based).
pub fn failure_action(err: &PostError, attempt: u32, settings: &CrawlSettings) -> FailureAction {
    let can_retry = attempt < settings.max_retries;
    if can_retry && is_resource_exhausted(err) {
        return FailureAction::RetryAfter(settings.busy_backoff);
    }
    if can_retry && settings.retry_post_fetch {
        if let PostError::Fetch(fetch) = err {
            if fetch.is_transient() {
                return FailureAction::RetryAfter(settings.busy_backoff);
            }
        }
    }
    FailureAction::Skip
}

/// Whether the failure came from running out of file handles.
pub fn is_resource_exhausted(err: &PostError) -> bool {
    let io_error = match err {
        PostError::Fetch(fetch) if fetch.kind == FailureKind::ResourceExhausted => return true,
        PostError::Io(io) => Some(io),
        PostError::Persist(persist) => persist.io_error(),
        _ => None,
    };
    if io_error.is_some_and(|io| io.raw_os_error() == Some(TOO_MANY_OPEN_FILES)) {
        return true;
    }
    err.to_string().contains("Too many open files")
}

/// Crawls every listed post in order, one at a time.
pub async fn crawl(blog: &Blog, settings: &CrawlSettings) -> Result<CrawlReport, CrawlError> {
    ensure_output_dir(&settings.posts_dir)?;
    ensure_output_dir(&settings.assets_dir)?;

    let mut report = CrawlReport::default();
    for item in blog.posts().await? {
        let mut attempt = 0;
        loop {
            match crawl_post(blog, item.log_no, settings).await {
                Ok(PostOutcome::Saved { filename }) => {
                    engine_info!("Saved: {}.md", filename);
                    report.saved += 1;
                    tokio::time::sleep(settings.post_delay).await;
                }
                Ok(PostOutcome::AlreadyExists { filename }) => {
                    engine_info!("Skipping: {}.md (already exists)", filename);
                    report.skipped_existing += 1;
                }
                Err(err) => match failure_action(&err, attempt, settings) {
                    FailureAction::RetryAfter(pause) => {
                        engine_warn!(
                            "Post {} failed ({}), retrying in {:?}",
                            item.log_no,
                            err,
                            pause
                        );
                        attempt += 1;
                        tokio::time::sleep(pause).await;
                        continue;
                    }
                    FailureAction::Skip => {
                        match &err {
                            PostError::Classify(ClassifyError::UnknownComponentType(_)) => {
                                engine_warn!(
                                    "Skipped post {} due to unsupported component: {}",
                                    item.log_no,
                                    err
                                );
                            }
                            _ => engine_warn!("Error processing post {}: {}", item.log_no, err),
                        }
                        report.failed += 1;
                    }
                },
            }
            break;
        }
    }

    engine_info!(
        "Crawl finished: {} saved, {} already present, {} failed",
        report.saved,
        report.skipped_existing,
        report.failed
    );
    Ok(report)
}

/// Fetches, renders and stores one post unless its file already exists.
pub async fn crawl_post(
    blog: &Blog,
    log_no: u64,
    settings: &CrawlSettings,
) -> Result<PostOutcome, PostError> {
    let post = blog.post(log_no);
    let filename = to_filename(post.metadata().await?);

    if markdown_path(&settings.posts_dir, &filename).exists() {
        return Ok(PostOutcome::AlreadyExists { filename });
    }

    let post_assets = settings.assets_dir.join(&filename);
    ensure_output_dir(&post_assets)?;

    let context = RenderContext::new(
        settings.workers,
        ImageStrategy::FetchLocal {
            assets_dir: post_assets,
            src_prefix: format!("assets/{filename}/"),
        },
    );
    let markdown = post.to_markdown(&context).await?;

    AtomicFileWriter::new(settings.posts_dir.clone()).write(&format!("{filename}.md"), &markdown)?;
    Ok(PostOutcome::Saved { filename })
}
