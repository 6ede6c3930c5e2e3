use chrono::NaiveDate;

use crate::metadata::PostMetadata;

pub const MAX_SLUG_CHARS: usize = 100;

/// `YYYY-MM-DD-{slug}`: the crawl's idempotency key and the per-post asset folder name.
pub fn to_filename(metadata: &PostMetadata) -> String {
    filename_for(&metadata.title, metadata.pub_date.date_naive())
}

pub fn filename_for(title: &str, date: NaiveDate) -> String {
    format!("{}-{}", date.format("%Y-%m-%d"), slugify(title))
}

/// Lower-cased, hyphen-separated form of a title.
///
/// Anything that is not a word character, whitespace, a hyphen or a Hangul
/// syllable becomes a separator. Slugs longer than [`MAX_SLUG_CHARS`] are cut
/// back to the last hyphen inside the limit.
pub fn slugify(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .map(|c| if is_slug_char(c) { c } else { ' ' })
        .collect();

    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("-");

    let mut slug = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }

    if slug.chars().count() > MAX_SLUG_CHARS {
        let truncated: String = slug.chars().take(MAX_SLUG_CHARS).collect();
        slug = match truncated.rsplit_once('-') {
            Some((head, _)) => head.to_string(),
            None => truncated,
        };
    }
    slug
}

fn is_slug_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c.is_whitespace() || ('가'..='힣').contains(&c)
}
