//! Per-kind extraction rules for editor components.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use serde_json::Value;

use crate::classify::ClassifyError;
use crate::{Block, ImageRef};

const EMBED_TITLE_FALLBACK: &str = "Embedded Content";
const UNKNOWN_FILENAME: &str = "unknown";

macro_rules! selector {
    ($name:ident, $css:literal) => {
        static $name: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse($css).expect(concat!("valid selector: ", $css)));
    };
}

selector!(TEXT_PARAGRAPH, ".se-text-paragraph");
selector!(CAPTION, ".se-caption");
selector!(IMG, "img");
selector!(VIDEO, "video");
selector!(IMAGE_MODULE, ".se-module-image");
selector!(QUOTE, ".se-quote");
selector!(CITE, ".se-cite");
selector!(CODE_VIEW, ".__se_code_view");
selector!(FILE_NAME, ".se-file-name");
selector!(FILE_EXTENSION, ".se-file-extension");
selector!(FILE_SAVE, "a.se-file-save-button");
selector!(TABLE, "table.se-table-content");
selector!(TABLE_ROW, "tr.se-tr");
selector!(TABLE_CELL, "td.se-cell");
selector!(MODULE_TEXT, ".se-module-text");
selector!(DATA_MODULE, "[data-module]");
selector!(IFRAME, "iframe[src]");
selector!(FORMULA_SOURCE, "[data-math], [data-latex]");
selector!(FORMULA_TEXT, ".se-math-element, .se-module-formula");

/// Text of an element with every text node trimmed and concatenated.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn first<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    element.select(selector).next()
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> String {
    first(element, selector).map(text_of).unwrap_or_default()
}

fn image_src(img: ElementRef<'_>) -> String {
    let value = img.value();
    value
        .attr("src")
        .or_else(|| value.attr("data-lazy-src"))
        .unwrap_or_default()
        .to_string()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub(crate) fn section_title(component: ElementRef<'_>) -> Block {
    Block::SectionTitle {
        text: text_of(component),
    }
}

/// One paragraph block per nested paragraph element.
pub(crate) fn text(component: ElementRef<'_>) -> Vec<Block> {
    component
        .select(&TEXT_PARAGRAPH)
        .map(|paragraph| Block::paragraph(text_of(paragraph)))
        .collect()
}

pub(crate) fn image(component: ElementRef<'_>) -> Result<Block, ClassifyError> {
    let src = match (first(component, &IMG), first(component, &VIDEO)) {
        (Some(img), None) => image_src(img),
        (None, Some(video)) => image_src(video),
        _ => return Err(ClassifyError::AmbiguousImageSource),
    };
    Ok(Block::Image(ImageRef {
        src,
        alt: first_text(component, &CAPTION),
    }))
}

/// Every image shares the group caption.
pub(crate) fn image_group(component: ElementRef<'_>) -> Block {
    let alt = first_text(component, &CAPTION);
    Block::ImageGroup(
        component
            .select(&IMG)
            .map(|img| ImageRef::new(image_src(img), alt.clone()))
            .collect(),
    )
}

/// Side-by-side images, each with its own caption.
pub(crate) fn image_strip(component: ElementRef<'_>) -> Block {
    Block::ImageGroup(
        component
            .select(&IMAGE_MODULE)
            .filter_map(|module| {
                let img = first(module, &IMG)?;
                Some(ImageRef::new(image_src(img), first_text(module, &CAPTION)))
            })
            .collect(),
    )
}

pub(crate) fn quotation(component: ElementRef<'_>) -> Block {
    let text = match first(component, &QUOTE) {
        Some(quote) => {
            let lines: Vec<String> = quote
                .select(&TEXT_PARAGRAPH)
                .map(text_of)
                .filter(|line| !line.is_empty())
                .collect();
            if lines.len() > 1 {
                lines.join("\n")
            } else {
                text_of(quote)
            }
        }
        None => String::new(),
    };
    Block::Quotation {
        text,
        cite: non_empty(first_text(component, &CITE)),
    }
}

pub(crate) fn code(component: ElementRef<'_>) -> Block {
    let Some(view) = first(component, &CODE_VIEW) else {
        return Block::Code {
            code: String::new(),
            language: None,
        };
    };

    let language = view
        .value()
        .classes()
        .find_map(|class| class.strip_prefix("language-"))
        .filter(|lang| !lang.is_empty())
        .map(str::to_string);

    Block::Code {
        code: view.text().collect(),
        language,
    }
}

pub(crate) fn file(component: ElementRef<'_>) -> Block {
    let name = first_text(component, &FILE_NAME);
    let extension = first_text(component, &FILE_EXTENSION);

    let filename = match (name.is_empty(), extension.is_empty()) {
        (false, false) => format!("{name}{extension}"),
        (false, true) => name,
        (true, false) => extension.clone(),
        (true, true) => UNKNOWN_FILENAME.to_string(),
    };

    let url = first(component, &FILE_SAVE)
        .and_then(|link| link.value().attr("href"))
        .unwrap_or_default()
        .to_string();

    Block::File {
        filename,
        url,
        extension: extension.trim_start_matches('.').to_string(),
    }
}

/// First row is the header row; rows without cells are dropped.
pub(crate) fn table(component: ElementRef<'_>) -> Block {
    let rows: Vec<Vec<String>> = first(component, &TABLE)
        .map(|table| table.select(&TABLE_ROW).map(row_cells).collect())
        .unwrap_or_default();

    let mut rows = rows.into_iter();
    let headers = rows.next().unwrap_or_default();
    Block::Table {
        headers,
        rows: rows.filter(|row| !row.is_empty()).collect(),
    }
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.select(&TABLE_CELL)
        .map(|cell| match first(cell, &MODULE_TEXT) {
            Some(text) => text_of(text),
            None => text_of(cell),
        })
        .collect()
}

pub(crate) fn material(component: ElementRef<'_>) -> Block {
    Block::Material {
        content: non_empty(text_of(component)),
    }
}

/// Generic embeds become a single Markdown link when a URL can be found.
pub(crate) fn oembed(component: ElementRef<'_>) -> Option<Block> {
    let data = embed_data(component);
    let field = |key: &str| {
        data.as_ref()
            .and_then(|data| data.get(key))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let url = field("url")
        .or_else(|| field("originalUrl"))
        .or_else(|| field("inputUrl"))
        .or_else(|| {
            first(component, &IFRAME)
                .and_then(|frame| frame.value().attr("src"))
                .map(str::to_string)
        })?;
    let title = field("title").unwrap_or_else(|| EMBED_TITLE_FALLBACK.to_string());

    Some(Block::Material {
        content: Some(format!("[{title}]({url})")),
    })
}

fn embed_data(component: ElementRef<'_>) -> Option<Value> {
    let raw = component
        .value()
        .attr("data-module")
        .or_else(|| first(component, &DATA_MODULE).and_then(|el| el.value().attr("data-module")))?;
    let module: Value = serde_json::from_str(raw).ok()?;
    module.get("data").cloned()
}

/// A floated image (if any) followed by the wrapped text.
pub(crate) fn wrapping_paragraph(component: ElementRef<'_>) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(2);
    if let Some(img) = first(component, &IMG) {
        blocks.push(Block::Image(ImageRef::new(
            image_src(img),
            first_text(component, &CAPTION),
        )));
    }

    let text = component
        .select(&TEXT_PARAGRAPH)
        .map(text_of)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    blocks.push(Block::paragraph(text));
    blocks
}

pub(crate) fn formula(component: ElementRef<'_>) -> Block {
    let from_attr = first(component, &FORMULA_SOURCE).and_then(|el| {
        let value = el.value();
        value.attr("data-math").or_else(|| value.attr("data-latex"))
    });

    let formula = match from_attr {
        Some(source) => source.trim().to_string(),
        None => first(component, &FORMULA_TEXT)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default(),
    };

    let inline = component
        .value()
        .classes()
        .any(|class| class == "se-formula-inline" || class == "se-inline");

    Block::Formula {
        formula,
        display: !inline,
    }
}
