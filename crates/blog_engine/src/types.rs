use std::fmt;

/// Identity of one post: unique within a blog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostId {
    pub blog_id: String,
    pub log_no: u64,
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.blog_id, self.log_no)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub src: String,
    pub alt: String,
}

impl ImageRef {
    pub fn new(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: alt.into(),
        }
    }
}

/// One unit of the intermediate document produced by the classifier and
/// consumed by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    SectionTitle {
        text: String,
    },
    Paragraph {
        text: String,
    },
    Image(ImageRef),
    ImageGroup(Vec<ImageRef>),
    Quotation {
        text: String,
        cite: Option<String>,
    },
    Code {
        code: String,
        language: Option<String>,
    },
    File {
        filename: String,
        url: String,
        extension: String,
    },
    HorizontalLine,
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Material {
        content: Option<String>,
    },
    Formula {
        formula: String,
        display: bool,
    },
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph { text: text.into() }
    }
}

/// One entry of the paginated post listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostItem {
    pub log_no: u64,
    pub title: String,
    pub category_no: Option<u64>,
    pub add_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Network-level failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            FailureKind::Timeout | FailureKind::Network | FailureKind::ResourceExhausted
        )
            || matches!(self.kind, FailureKind::HttpStatus(code) if code >= 500)
    }
}

/// `EMFILE` on Linux and macOS.
pub(crate) const TOO_MANY_OPEN_FILES: i32 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    /// The process ran out of file descriptors while talking to the server.
    ResourceExhausted,
    InvalidPayload,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::ResourceExhausted => write!(f, "too many open files"),
            FailureKind::InvalidPayload => write!(f, "invalid payload"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
