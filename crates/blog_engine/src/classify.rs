//! Maps the editor's component fragments onto [`Block`] values.
//!
//! Every fragment in the post body is a `div.se-component` whose second class
//! token names its kind (`se-text`, `se-image`, ...). The vocabulary is closed:
//! a kind outside [`ComponentKind`] fails the whole post with
//! [`ClassifyError::UnknownComponentType`].

use std::str::FromStr;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::components;
use crate::Block;

static COMPONENTS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".se-main-container .se-component").expect("valid component selector")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("Unknown component type: {0}")]
    UnknownComponentType(String),
    #[error("component has no type class: {0:?}")]
    MissingComponentType(String),
    #[error("image component must hold exactly one of <img> or <video>")]
    AmbiguousImageSource,
}

/// The fixed vocabulary of editor components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    SectionTitle,
    Image,
    ImageGroup,
    ImageStrip,
    PlacesMap,
    Quotation,
    Code,
    File,
    HorizontalLine,
    Table,
    Text,
    Material,
    Sticker,
    OgLink,
    OEmbed,
    WrappingParagraph,
    Formula,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 17] = [
        ComponentKind::SectionTitle,
        ComponentKind::Image,
        ComponentKind::ImageGroup,
        ComponentKind::ImageStrip,
        ComponentKind::PlacesMap,
        ComponentKind::Quotation,
        ComponentKind::Code,
        ComponentKind::File,
        ComponentKind::HorizontalLine,
        ComponentKind::Table,
        ComponentKind::Text,
        ComponentKind::Material,
        ComponentKind::Sticker,
        ComponentKind::OgLink,
        ComponentKind::OEmbed,
        ComponentKind::WrappingParagraph,
        ComponentKind::Formula,
    ];

    /// The discriminant class name as it appears in the markup.
    pub fn class_name(self) -> &'static str {
        match self {
            ComponentKind::SectionTitle => "se-sectionTitle",
            ComponentKind::Image => "se-image",
            ComponentKind::ImageGroup => "se-imageGroup",
            ComponentKind::ImageStrip => "se-imageStrip",
            ComponentKind::PlacesMap => "se-placesMap",
            ComponentKind::Quotation => "se-quotation",
            ComponentKind::Code => "se-code",
            ComponentKind::File => "se-file",
            ComponentKind::HorizontalLine => "se-horizontalLine",
            ComponentKind::Table => "se-table",
            ComponentKind::Text => "se-text",
            ComponentKind::Material => "se-material",
            ComponentKind::Sticker => "se-sticker",
            ComponentKind::OgLink => "se-oglink",
            ComponentKind::OEmbed => "se-oembed",
            ComponentKind::WrappingParagraph => "se-wrappingParagraph",
            ComponentKind::Formula => "se-formula",
        }
    }

    /// Kinds that are recognised but intentionally produce no blocks.
    pub fn is_dropped(self) -> bool {
        matches!(
            self,
            ComponentKind::PlacesMap | ComponentKind::Sticker | ComponentKind::OgLink
        )
    }
}

impl FromStr for ComponentKind {
    type Err = ClassifyError;

    fn from_str(class_name: &str) -> Result<Self, Self::Err> {
        ComponentKind::ALL
            .into_iter()
            .find(|kind| kind.class_name() == class_name)
            .ok_or_else(|| ClassifyError::UnknownComponentType(class_name.to_string()))
    }
}

/// Reads the discriminant (second class token) of a component fragment.
pub fn component_kind(component: ElementRef<'_>) -> Result<ComponentKind, ClassifyError> {
    let class_attr = component.value().attr("class").unwrap_or_default();
    let discriminant = class_attr
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| ClassifyError::MissingComponentType(class_attr.to_string()))?;
    discriminant.parse()
}

/// Classifies one component fragment into zero, one or many blocks.
pub fn classify_component(component: ElementRef<'_>) -> Result<Vec<Block>, ClassifyError> {
    let kind = component_kind(component)?;
    let blocks = match kind {
        ComponentKind::PlacesMap | ComponentKind::Sticker | ComponentKind::OgLink => Vec::new(),
        ComponentKind::SectionTitle => vec![components::section_title(component)],
        ComponentKind::Image => vec![components::image(component)?],
        ComponentKind::ImageGroup => vec![components::image_group(component)],
        ComponentKind::ImageStrip => vec![components::image_strip(component)],
        ComponentKind::Quotation => vec![components::quotation(component)],
        ComponentKind::Code => vec![components::code(component)],
        ComponentKind::File => vec![components::file(component)],
        ComponentKind::HorizontalLine => vec![Block::HorizontalLine],
        ComponentKind::Table => vec![components::table(component)],
        ComponentKind::Text => components::text(component),
        ComponentKind::Material => vec![components::material(component)],
        ComponentKind::OEmbed => components::oembed(component).into_iter().collect(),
        ComponentKind::WrappingParagraph => components::wrapping_paragraph(component),
        ComponentKind::Formula => vec![components::formula(component)],
    };
    Ok(blocks)
}

/// Classifies every component of a post document, in document order.
pub fn classify_document(html: &str) -> Result<Vec<Block>, ClassifyError> {
    let document = Html::parse_document(html);
    let mut blocks = Vec::new();
    for component in document.select(&COMPONENTS) {
        blocks.extend(classify_component(component)?);
    }
    Ok(blocks)
}
