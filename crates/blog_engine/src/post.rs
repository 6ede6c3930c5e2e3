use std::sync::Arc;

use engine_logging::{engine_debug, engine_warn};
use tokio::sync::OnceCell;

use crate::classify::{classify_document, ClassifyError};
use crate::decode::strip_invisible;
use crate::fetch::Fetcher;
use crate::metadata::{first_image, parse_header, parse_tags, PostMetadata};
use crate::persist::PersistError;
use crate::render::{render, RenderContext, RenderError};
use crate::{Block, FetchError, ImageRef, PostId};

pub const POST_VIEW_PATH: &str = "PostView.naver";
pub const TAG_LIST_PATH: &str = "BlogTagListInfo.naver";

#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("post fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// One post of a blog.
///
/// The document, block sequence, preview image and metadata are each
/// computed on first access and cached for the lifetime of the value.
pub struct Post {
    id: PostId,
    fetcher: Arc<dyn Fetcher>,
    document: OnceCell<String>,
    blocks: OnceCell<Vec<Block>>,
    preview_image: OnceCell<Option<ImageRef>>,
    metadata: OnceCell<PostMetadata>,
}

impl Post {
    pub fn new(blog_id: impl Into<String>, log_no: u64, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            id: PostId {
                blog_id: blog_id.into(),
                log_no,
            },
            fetcher,
            document: OnceCell::new(),
            blocks: OnceCell::new(),
            preview_image: OnceCell::new(),
            metadata: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &PostId {
        &self.id
    }

    /// The post view with invisible code points already removed.
    pub async fn document(&self) -> Result<&str, PostError> {
        let document = self
            .document
            .get_or_try_init(|| async {
                let query = [
                    ("blogId", self.id.blog_id.clone()),
                    ("logNo", self.id.log_no.to_string()),
                ];
                let raw = self.fetcher.get_text(POST_VIEW_PATH, &query).await?;
                engine_debug!("Fetched post {} ({} bytes)", self.id, raw.len());
                Ok::<_, PostError>(strip_invisible(&raw))
            })
            .await?;
        Ok(document.as_str())
    }

    pub async fn blocks(&self) -> Result<&[Block], PostError> {
        let blocks = self
            .blocks
            .get_or_try_init(|| async {
                let document = self.document().await?;
                Ok::<_, PostError>(classify_document(document)?)
            })
            .await?;
        Ok(blocks.as_slice())
    }

    pub async fn preview_image(&self) -> Result<Option<&ImageRef>, PostError> {
        let preview = self
            .preview_image
            .get_or_try_init(|| async {
                let blocks = self.blocks().await?;
                Ok::<_, PostError>(first_image(blocks))
            })
            .await?;
        Ok(preview.as_ref())
    }

    pub async fn metadata(&self) -> Result<&PostMetadata, PostError> {
        self.metadata
            .get_or_try_init(|| async {
                let header = parse_header(self.document().await?);
                let preview_image = self.preview_image().await?.cloned();
                let tags = self.tags().await;
                Ok::<_, PostError>(PostMetadata {
                    id: self.id.clone(),
                    pub_date: header.pub_date_or_now(),
                    title: header.title,
                    tags,
                    preview_image,
                })
            })
            .await
    }

    /// Renders the post with its front matter.
    pub async fn to_markdown(&self, context: &RenderContext) -> Result<String, PostError> {
        let front_matter = self.metadata().await?.front_matter();
        let blocks = self.blocks().await?;
        Ok(render(blocks, Some(&front_matter), context).await?)
    }

    /// Tags are decoration: a failed lookup leaves the post untagged.
    async fn tags(&self) -> Vec<String> {
        let query = [
            ("blogId", self.id.blog_id.clone()),
            ("logNoList", self.id.log_no.to_string()),
            ("logType", "mylog".to_string()),
        ];
        match self.fetcher.get_text(TAG_LIST_PATH, &query).await {
            Ok(body) => parse_tags(&body, self.id.log_no),
            Err(err) => {
                engine_warn!("Tag lookup failed for post {}: {}", self.id, err);
                Vec::new()
            }
        }
    }
}
