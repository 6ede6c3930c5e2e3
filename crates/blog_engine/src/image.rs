//! Image source resolution strategies used while rendering.

use std::path::PathBuf;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use percent_encoding::percent_decode_str;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};

use crate::fetch::BROWSER_USER_AGENT;

pub const IMAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const IMAGE_REFERER: &str = "https://blog.naver.com/";
const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8";

const PREVIEW_HOST_TOKEN: &str = "postfiles";
const ORIGINAL_HOST_TOKEN: &str = "blogfiles";
const VIDEO_PREVIEW_HOST: &str = "https://mblogvideo-phinf.pstatic.net/";
const FILE_STORAGE_HOST: &str = "https://blogfiles.pstatic.net/";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("assets directory does not exist: {0}")]
    AssetsDir(PathBuf),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot derive a local filename from {0}")]
    NoFilename(String),
}

/// Turns a raw embedded-image reference into the string written to Markdown.
#[async_trait::async_trait]
pub trait ImageResolver: Send + Sync {
    async fn resolve(&self, src: &str) -> String;
}

/// Image handling selected once per render call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageStrategy {
    /// Keep sources untouched.
    #[default]
    Default,
    /// Rewrite CDN preview URLs to their original-quality counterparts.
    CdnNormalize,
    /// Download each image into `assets_dir` and reference it as `{src_prefix}{filename}`.
    FetchLocal {
        assets_dir: PathBuf,
        src_prefix: String,
    },
}

impl ImageStrategy {
    pub fn resolver(&self) -> Result<Box<dyn ImageResolver>, ImageError> {
        Ok(match self {
            ImageStrategy::Default => Box::new(IdentityResolver),
            ImageStrategy::CdnNormalize => Box::new(CdnResolver),
            ImageStrategy::FetchLocal {
                assets_dir,
                src_prefix,
            } => Box::new(LocalImageFetcher::new(assets_dir.clone(), src_prefix.clone())?),
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityResolver;

#[async_trait::async_trait]
impl ImageResolver for IdentityResolver {
    async fn resolve(&self, src: &str) -> String {
        src.to_string()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CdnResolver;

#[async_trait::async_trait]
impl ImageResolver for CdnResolver {
    async fn resolve(&self, src: &str) -> String {
        normalize_cdn_url(src)
    }
}

/// Drop the query string and swap preview hosts for original-quality hosts.
pub fn normalize_cdn_url(src: &str) -> String {
    let without_query = src.split('?').next().unwrap_or(src);
    without_query
        .replace(PREVIEW_HOST_TOKEN, ORIGINAL_HOST_TOKEN)
        .replace(VIDEO_PREVIEW_HOST, FILE_STORAGE_HOST)
}

/// URL-decoded last path segment, used as the on-disk image name.
pub fn local_filename(url: &str) -> Result<String, ImageError> {
    let segment = url.rsplit('/').next().unwrap_or_default().replace('+', " ");
    let decoded = percent_decode_str(&segment).decode_utf8_lossy().into_owned();
    let unsafe_name = decoded.is_empty()
        || decoded == "."
        || decoded == ".."
        || decoded.contains(&['/', '\\'][..]);
    if unsafe_name {
        return Err(ImageError::NoFilename(url.to_string()));
    }
    Ok(decoded)
}

/// Downloads images next to the rendered post.
///
/// Any failure falls back to the original source so a broken image never
/// fails the post.
#[derive(Debug, Clone)]
pub struct LocalImageFetcher {
    client: reqwest::Client,
    assets_dir: PathBuf,
    src_prefix: String,
}

impl LocalImageFetcher {
    pub fn new(assets_dir: PathBuf, src_prefix: String) -> Result<Self, ImageError> {
        if !assets_dir.is_dir() {
            return Err(ImageError::AssetsDir(assets_dir));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(REFERER, HeaderValue::from_static(IMAGE_REFERER));
        headers.insert(ACCEPT, HeaderValue::from_static(IMAGE_ACCEPT));

        let client = reqwest::Client::builder()
            .timeout(IMAGE_FETCH_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            assets_dir,
            src_prefix,
        })
    }

    async fn download(&self, url: &str) -> Result<String, ImageError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        let filename = local_filename(url)?;
        tokio::fs::write(self.assets_dir.join(&filename), &bytes).await?;
        engine_debug!("Saved image {} ({} bytes)", filename, bytes.len());

        Ok(format!("{}{}", self.src_prefix, filename))
    }
}

#[async_trait::async_trait]
impl ImageResolver for LocalImageFetcher {
    async fn resolve(&self, src: &str) -> String {
        let url = normalize_cdn_url(src);
        match self.download(&url).await {
            Ok(local) => local,
            Err(err) => {
                engine_warn!("Failed to fetch image {}: {}. Using original URL.", url, err);
                src.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{local_filename, normalize_cdn_url};

    #[test]
    fn cdn_normalize_strips_query_and_swaps_hosts() {
        assert_eq!(
            normalize_cdn_url("https://postfiles.pstatic.net/a/b/photo.jpg?type=w966"),
            "https://blogfiles.pstatic.net/a/b/photo.jpg"
        );
        assert_eq!(
            normalize_cdn_url("https://mblogvideo-phinf.pstatic.net/x/clip.gif?type=mp4w800"),
            "https://blogfiles.pstatic.net/x/clip.gif"
        );
    }

    #[test]
    fn cdn_normalize_leaves_other_urls_alone() {
        assert_eq!(
            normalize_cdn_url("https://example.com/img.png"),
            "https://example.com/img.png"
        );
    }

    #[test]
    fn local_filename_is_decoded_last_segment() {
        assert_eq!(
            local_filename("https://blogfiles.pstatic.net/a/%EC%82%AC%EC%A7%84+1.png").unwrap(),
            "사진 1.png"
        );
    }

    #[test]
    fn local_filename_rejects_empty_and_traversal() {
        assert!(local_filename("https://example.com/dir/").is_err());
        assert!(local_filename("https://example.com/..").is_err());
        assert!(local_filename("https://example.com/a%2Fb.png").is_err());
    }
}
