use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime};
use percent_encoding::percent_decode_str;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::frontmatter::{FrontMatter, FrontMatterImage};
use crate::{Block, ImageRef, PostId};

const UNTITLED: &str = "untitled";
const KST_OFFSET_SECS: i32 = 9 * 3600;

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".se-title-text").expect("valid title selector"));
static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:title"]"#).expect("valid og:title selector")
});
static DOCUMENT_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));
static PUBLISH_DATE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".se_publishDate").expect("valid publish date selector"));

/// Per-post metadata, produced once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMetadata {
    pub id: PostId,
    pub title: String,
    /// Publication time; the current time when the page had none.
    pub pub_date: DateTime<FixedOffset>,
    pub tags: Vec<String>,
    pub preview_image: Option<ImageRef>,
}

impl PostMetadata {
    pub fn front_matter(&self) -> FrontMatter {
        FrontMatter {
            title: self.title.clone(),
            pub_date: self.pub_date.to_rfc3339(),
            tags: self.tags.clone(),
            image: self.preview_image.as_ref().map(|image| FrontMatterImage {
                url: image.src.clone(),
                alt: image.alt.clone(),
            }),
        }
    }
}

/// Title and publication date as printed in the post view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostHeader {
    pub title: String,
    pub published: Option<DateTime<FixedOffset>>,
}

impl PostHeader {
    pub fn pub_date_or_now(&self) -> DateTime<FixedOffset> {
        self.published.unwrap_or_else(|| Local::now().fixed_offset())
    }
}

pub fn parse_header(html: &str) -> PostHeader {
    let document = Html::parse_document(html);

    let collapse = |text: String| text.split_whitespace().collect::<Vec<_>>().join(" ");

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| collapse(el.text().collect()))
        .filter(|title| !title.is_empty())
        .or_else(|| {
            document
                .select(&OG_TITLE)
                .next()
                .and_then(|el| el.value().attr("content"))
                .map(|content| collapse(content.to_string()))
                .filter(|title| !title.is_empty())
        })
        .or_else(|| {
            document
                .select(&DOCUMENT_TITLE)
                .next()
                .map(|el| collapse(el.text().collect()))
                .filter(|title| !title.is_empty())
        })
        .unwrap_or_else(|| UNTITLED.to_string());

    let published = document
        .select(&PUBLISH_DATE)
        .next()
        .and_then(|el| parse_publish_date(&el.text().collect::<String>()));

    PostHeader { title, published }
}

/// Parses the view's `2025. 11. 9. 21:05` stamp as Korean local time.
///
/// Relative stamps ("3시간 전") and anything else unparseable yield `None`.
pub fn parse_publish_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let compact: String = raw.split_whitespace().collect();
    let naive = NaiveDateTime::parse_from_str(&compact, "%Y.%m.%d.%H:%M").ok()?;
    let kst = FixedOffset::east_opt(KST_OFFSET_SECS)?;
    naive.and_local_timezone(kst).single()
}

/// First image of the post, looking through image groups.
pub fn first_image(blocks: &[Block]) -> Option<ImageRef> {
    blocks.iter().find_map(|block| match block {
        Block::Image(image) => Some(image.clone()),
        Block::ImageGroup(images) => images.first().cloned(),
        _ => None,
    })
}

/// Reads the tag list for `log_no` out of a tag lookup response.
///
/// Tag names arrive URL-encoded and comma separated.
pub fn parse_tags(body: &str, log_no: u64) -> Vec<String> {
    let Ok(payload) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };
    let Some(entries) = payload.get("taggingList").and_then(Value::as_array) else {
        return Vec::new();
    };

    let matches_post = |entry: &&Value| match entry.get("logNo") {
        Some(Value::Number(n)) => n.as_u64() == Some(log_no),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok() == Some(log_no),
        _ => false,
    };

    let Some(raw) = entries
        .iter()
        .find(matches_post)
        .or_else(|| entries.first())
        .and_then(|entry| entry.get("tagName"))
        .and_then(Value::as_str)
    else {
        return Vec::new();
    };

    let decoded = percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned();
    decoded
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
