use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use engine_logging::engine_debug;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use url::Url;

use crate::decode::decode_document;
use crate::types::TOO_MANY_OPEN_FILES;
use crate::{FailureKind, FetchError};

pub const DEFAULT_BASE_URL: &str = "https://blog.naver.com";
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Scheme and host of the blog platform, without a trailing slash.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 16 * 1024 * 1024,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl FetchSettings {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Read-only access to the blog platform's endpoints.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `{base}/{path}?{query}` and return the decoded body text.
    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&settings.user_agent)
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        headers.insert(USER_AGENT, agent);
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("ko-KR,ko;q=0.9,en;q=0.8"));

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, FetchError> {
        let base = self.settings.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse_with_params(&format!("{base}/{path}"), query)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        let url = self.endpoint(path, query)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(too_large(max_bytes, content_len));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        if bytes.len() as u64 > max_bytes {
            return Err(too_large(max_bytes, bytes.len() as u64));
        }

        let decoded = decode_document(&bytes, content_type.as_deref());
        if decoded.had_errors {
            engine_debug!(
                "Malformed {} bytes in {} replaced with U+FFFD",
                decoded.encoding_label,
                path
            );
        }
        Ok(decoded.text)
    }
}

fn too_large(max_bytes: u64, actual: u64) -> FetchError {
    FetchError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "response too large",
    )
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    classify_error_chain(&err, err.is_timeout())
}

/// Names the failure after the whole source chain; reqwest's own message
/// leaves out the underlying I/O cause.
fn classify_error_chain(err: &(dyn StdError + 'static), timed_out: bool) -> FetchError {
    let chain = || std::iter::successors(Some(err), |&err| err.source());

    let out_of_files = chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .and_then(io::Error::raw_os_error)
            == Some(TOO_MANY_OPEN_FILES)
    });
    let kind = if timed_out {
        FailureKind::Timeout
    } else if out_of_files {
        FailureKind::ResourceExhausted
    } else {
        FailureKind::Network
    };

    let message = chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ");
    FetchError::new(kind, message)
}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;
    use std::fmt;
    use std::io;

    use super::classify_error_chain;
    use crate::FailureKind;

    #[derive(Debug)]
    struct SendFailed(io::Error);

    impl fmt::Display for SendFailed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "error sending request")
        }
    }

    impl StdError for SendFailed {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn descriptor_exhaustion_is_found_in_the_source_chain() {
        let err = SendFailed(io::Error::from_raw_os_error(24));
        let failure = classify_error_chain(&err, false);
        assert_eq!(failure.kind, FailureKind::ResourceExhausted);
        assert!(failure.message.starts_with("error sending request: "));
        assert!(failure.message.contains("os error 24"));
    }

    #[test]
    fn other_io_causes_stay_network_errors_with_their_cause() {
        let err = SendFailed(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        let failure = classify_error_chain(&err, false);
        assert_eq!(failure.kind, FailureKind::Network);
        assert_eq!(failure.message, "error sending request: refused");
    }

    #[test]
    fn timeout_wins_over_the_cause() {
        let err = SendFailed(io::Error::from_raw_os_error(24));
        assert_eq!(classify_error_chain(&err, true).kind, FailureKind::Timeout);
    }
}
