//! Paginated post listing of one blog.

use std::sync::Arc;

use engine_logging::{engine_info, engine_warn};
use percent_encoding::percent_decode_str;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::fetch::Fetcher;
use crate::pool::WorkerPool;
use crate::post::Post;
use crate::{FailureKind, FetchError, PostItem};

pub const POST_LIST_PATH: &str = "PostTitleListAsync.naver";
const PAGING_HTML_MARKER: &str = ",\"pagingHtml\"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSettings {
    pub count_per_page: u64,
    pub category_no: u64,
    pub workers: usize,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            count_per_page: 30,
            category_no: 0,
            workers: 8,
        }
    }
}

/// One decoded listing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostListPage {
    pub posts: Vec<PostItem>,
    pub total_count: u64,
    /// Page size the server actually applied.
    pub count_per_page: u64,
}

#[derive(Deserialize)]
struct RawListing {
    #[serde(rename = "postList", default)]
    post_list: Vec<RawPostItem>,
    #[serde(rename = "totalCount", deserialize_with = "number_or_string")]
    total_count: u64,
    #[serde(rename = "countPerPage", deserialize_with = "number_or_string")]
    count_per_page: u64,
}

#[derive(Deserialize)]
struct RawPostItem {
    #[serde(rename = "logNo", deserialize_with = "number_or_string")]
    log_no: u64,
    #[serde(default)]
    title: String,
    #[serde(rename = "categoryNo", default, deserialize_with = "optional_number_or_string")]
    category_no: Option<u64>,
    #[serde(rename = "addDate", default)]
    add_date: Option<String>,
}

impl From<RawPostItem> for PostItem {
    fn from(raw: RawPostItem) -> Self {
        PostItem {
            log_no: raw.log_no,
            title: url_decode(&raw.title),
            category_no: raw.category_no,
            add_date: raw.add_date,
        }
    }
}

fn value_to_u64(value: Value) -> Result<u64, String> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| format!("not an unsigned integer: {n}")),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| format!("not an unsigned integer: {s:?}")),
        other => Err(format!("expected a number, found {other}")),
    }
}

// The listing endpoint quotes most of its numbers.
fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    value_to_u64(Value::deserialize(deserializer)?).map_err(de::Error::custom)
}

fn optional_number_or_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => value_to_u64(value).map(Some).map_err(de::Error::custom),
    }
}

fn url_decode(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// Decodes a listing body, discarding the trailing `pagingHtml` field first.
pub fn parse_listing(body: &str) -> Result<PostListPage, FetchError> {
    let json = match body.find(PAGING_HTML_MARKER) {
        Some(idx) => format!("{}}}", &body[..idx]),
        None => body.to_string(),
    };
    let raw: RawListing = serde_json::from_str(&json)
        .map_err(|err| FetchError::new(FailureKind::InvalidPayload, err.to_string()))?;
    Ok(PostListPage {
        posts: raw.post_list.into_iter().map(PostItem::from).collect(),
        total_count: raw.total_count,
        count_per_page: raw.count_per_page,
    })
}

/// Pages needed to cover `total` posts; a zero page size means a single page.
pub fn page_count(total: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 1;
    }
    total.div_ceil(per_page)
}

/// A blog and its (lazily fetched) post listing.
pub struct Blog {
    blog_id: String,
    fetcher: Arc<dyn Fetcher>,
    settings: ListingSettings,
    posts: OnceCell<Vec<PostItem>>,
}

impl Blog {
    pub fn new(blog_id: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_settings(blog_id, fetcher, ListingSettings::default())
    }

    pub fn with_settings(
        blog_id: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
        settings: ListingSettings,
    ) -> Self {
        Self {
            blog_id: blog_id.into(),
            fetcher,
            settings,
            posts: OnceCell::new(),
        }
    }

    pub fn blog_id(&self) -> &str {
        &self.blog_id
    }

    pub fn post(&self, log_no: u64) -> Post {
        Post::new(self.blog_id.clone(), log_no, self.fetcher.clone())
    }

    /// Every post of the blog, page 1 first and the remaining pages in order.
    ///
    /// Fetched once; later calls return the cached list.
    pub async fn posts(&self) -> Result<&[PostItem], FetchError> {
        let posts = self
            .posts
            .get_or_try_init(|| self.fetch_all_posts())
            .await?;
        Ok(posts.as_slice())
    }

    pub async fn fetch_page(
        &self,
        page: u64,
        count_per_page: u64,
    ) -> Result<PostListPage, FetchError> {
        let query = [
            ("blogId", self.blog_id.clone()),
            ("currentPage", page.to_string()),
            ("categoryNo", self.settings.category_no.to_string()),
            ("countPerPage", count_per_page.to_string()),
        ];
        let body = self.fetcher.get_text(POST_LIST_PATH, &query).await?;
        parse_listing(&body)
    }

    async fn fetch_page_or_empty(&self, page: u64, count_per_page: u64) -> Vec<PostItem> {
        match self.fetch_page(page, count_per_page).await {
            Ok(listing) => listing.posts,
            Err(err) => {
                engine_warn!("Failed to fetch page {}: {}", page, err);
                Vec::new()
            }
        }
    }

    async fn fetch_all_posts(&self) -> Result<Vec<PostItem>, FetchError> {
        let first = self.fetch_page(1, self.settings.count_per_page).await?;
        engine_info!(
            "Total posts: {}, count per page: {}",
            first.total_count,
            first.count_per_page
        );

        if first.total_count == 0 {
            return Ok(Vec::new());
        }

        let total_pages = page_count(first.total_count, first.count_per_page);
        if total_pages <= 1 {
            return Ok(first.posts);
        }
        engine_info!("Need to fetch {} pages", total_pages);

        let count_per_page = first.count_per_page;
        let remaining = WorkerPool::new(self.settings.workers)
            .map(2..=total_pages, |page| {
                self.fetch_page_or_empty(page, count_per_page)
            })
            .await;

        let mut posts = first.posts;
        posts.extend(remaining.into_iter().flatten());
        engine_info!("Fetched total {} posts", posts.len());
        Ok(posts)
    }
}
