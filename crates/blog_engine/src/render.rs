//! Deterministic Markdown rendering of a block sequence.

use crate::frontmatter::FrontMatter;
use crate::image::{ImageError, ImageResolver, ImageStrategy};
use crate::pool::WorkerPool;
use crate::{Block, ImageRef};

pub const DEFAULT_WORKERS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("image resolver setup failed: {0}")]
    Image(#[from] ImageError),
    #[error("front matter serialization failed: {0}")]
    FrontMatter(#[from] serde_yaml::Error),
}

/// Settings threaded through one render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    pub workers: usize,
    pub images: ImageStrategy,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            images: ImageStrategy::Default,
        }
    }
}

impl RenderContext {
    pub fn new(workers: usize, images: ImageStrategy) -> Self {
        Self { workers, images }
    }
}

/// Renders blocks (and optional front matter) into the final Markdown text.
pub async fn render(
    blocks: &[Block],
    front_matter: Option<&FrontMatter>,
    context: &RenderContext,
) -> Result<String, RenderError> {
    let resolver = context.images.resolver()?;
    render_with(blocks, front_matter, context.workers, resolver.as_ref()).await
}

/// Same as [`render`], with an explicit resolver.
pub async fn render_with(
    blocks: &[Block],
    front_matter: Option<&FrontMatter>,
    workers: usize,
    resolver: &dyn ImageResolver,
) -> Result<String, RenderError> {
    let mut output = match front_matter {
        Some(front_matter) => {
            let mut front_matter = front_matter.clone();
            if let Some(image) = front_matter.image.as_mut() {
                image.url = resolver.resolve(&image.url).await;
            }
            front_matter.to_yaml_block()?
        }
        None => String::new(),
    };

    let rendered = WorkerPool::new(workers)
        .map(blocks, |block| render_block(block, resolver))
        .await;
    output.extend(rendered);

    let mut output = output.trim().to_string();
    output.push('\n');
    Ok(output)
}

/// Markdown for a single block; empty when the block carries nothing to show.
pub async fn render_block(block: &Block, resolver: &dyn ImageResolver) -> String {
    match block {
        Block::SectionTitle { text } => format!("## {}\n\n", text.trim()),
        Block::Paragraph { text } => {
            let text = text.trim();
            if text.is_empty() {
                String::new()
            } else {
                format!("{text}\n\n")
            }
        }
        Block::Quotation { text, cite } => render_quotation(text, cite.as_deref()),
        Block::Code { code, language } => {
            let code = code.trim();
            if code.is_empty() {
                return String::new();
            }
            let language = language.as_deref().unwrap_or_default();
            format!("```{language}\n{code}\n```\n\n")
        }
        Block::File { filename, url, .. } => {
            if filename.is_empty() && url.is_empty() {
                String::new()
            } else {
                format!("📎 [{filename}]({url})\n\n")
            }
        }
        Block::HorizontalLine => "---\n\n".to_string(),
        Block::Formula { formula, display } => match (formula.is_empty(), *display) {
            (true, _) => String::new(),
            (false, true) => format!("$$\n{formula}\n$$\n\n"),
            (false, false) => format!("${formula}$\n\n"),
        },
        Block::Table { headers, rows } => render_table(headers, rows),
        Block::Material { content } => match content.as_deref() {
            Some(content) if !content.is_empty() => format!("> [Material] {content}\n\n"),
            _ => String::new(),
        },
        Block::Image(image) => {
            if image.src.is_empty() {
                return String::new();
            }
            format!("{}\n\n", image_markdown(image, resolver).await)
        }
        Block::ImageGroup(images) => {
            if images.is_empty() {
                return String::new();
            }
            let mut parts = Vec::with_capacity(images.len());
            for image in images {
                parts.push(image_markdown(image, resolver).await);
            }
            format!("{}\n\n", parts.join(" "))
        }
    }
}

async fn image_markdown(image: &ImageRef, resolver: &dyn ImageResolver) -> String {
    format!("![{}]({})", image.alt, resolver.resolve(&image.src).await)
}

fn render_quotation(text: &str, cite: Option<&str>) -> String {
    let cite = cite.filter(|cite| !cite.is_empty());
    if text.is_empty() && cite.is_none() {
        return String::new();
    }

    let quoted = text
        .trim()
        .split('\n')
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n");

    match cite {
        Some(cite) => format!("{quoted}\n>\n> — {cite}\n\n"),
        None => format!("{quoted}\n\n"),
    }
}

/// Pipe table sized to the header row; short rows are padded, long rows cut.
fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }

    let width = headers.len();
    let header: Vec<&str> = headers.iter().map(String::as_str).collect();
    let separator = vec!["---"; width];

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(table_line(&header));
    lines.push(table_line(&separator));
    for row in rows {
        let cells: Vec<&str> = (0..width)
            .map(|i| row.get(i).map(String::as_str).unwrap_or_default())
            .collect();
        lines.push(table_line(&cells));
    }

    format!("{}\n\n", lines.join("\n"))
}

fn table_line(cells: &[&str]) -> String {
    format!("| {} |", cells.join(" | "))
}
