//! Blog engine: turns editor-component blog posts into Markdown.
mod classify;
mod components;
mod crawl;
mod decode;
mod fetch;
mod filename;
mod frontmatter;
mod image;
mod listing;
mod metadata;
mod persist;
mod pool;
mod post;
mod render;
mod types;

pub use classify::{classify_component, classify_document, component_kind, ClassifyError, ComponentKind};
pub use crawl::{
    crawl, crawl_post, failure_action, is_resource_exhausted, CrawlError, CrawlReport,
    CrawlSettings, FailureAction, PostOutcome,
};
pub use decode::{decode_document, strip_invisible, DecodedDocument};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, DEFAULT_BASE_URL};
pub use filename::{filename_for, slugify, to_filename, MAX_SLUG_CHARS};
pub use frontmatter::{FrontMatter, FrontMatterImage};
pub use image::{
    local_filename, normalize_cdn_url, CdnResolver, IdentityResolver, ImageError, ImageResolver,
    ImageStrategy, LocalImageFetcher, IMAGE_FETCH_TIMEOUT,
};
pub use listing::{page_count, parse_listing, Blog, ListingSettings, PostListPage, POST_LIST_PATH};
pub use metadata::{first_image, parse_header, parse_publish_date, parse_tags, PostHeader, PostMetadata};
pub use persist::{ensure_output_dir, markdown_path, AtomicFileWriter, PersistError};
pub use pool::WorkerPool;
pub use post::{Post, PostError, POST_VIEW_PATH, TAG_LIST_PATH};
pub use render::{render, render_block, render_with, RenderContext, RenderError, DEFAULT_WORKERS};
pub use types::{Block, FailureKind, FetchError, ImageRef, PostId, PostItem};
