use std::path::PathBuf;

use clap::Parser;

/// Mirror a blog's posts as Markdown files with locally stored images.
#[derive(Debug, Parser)]
#[command(name = "blog_crawler", version, about)]
pub struct Cli {
    /// Blog whose posts are crawled.
    #[arg(long, env = "NAVER_BLOG_ID")]
    pub blog_id: String,

    /// Directory receiving one `{filename}.md` per post.
    #[arg(long, default_value = "posts")]
    pub posts_dir: PathBuf,

    /// Directory receiving one `{filename}/` image folder per post.
    #[arg(long, default_value = "assets")]
    pub assets_dir: PathBuf,

    /// Concurrent block renders (and image downloads) per post.
    #[arg(long, default_value_t = blog_engine::DEFAULT_WORKERS)]
    pub workers: usize,

    /// Posts requested per listing page.
    #[arg(long, default_value_t = 30)]
    pub count_per_page: u64,

    /// Retry posts whose page fetch failed transiently instead of skipping them.
    #[arg(long)]
    pub retry_post_fetch: bool,

    /// Also write the log to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log debug output.
    #[arg(short, long)]
    pub verbose: bool,
}
