use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDocument {
    pub text: String,
    pub encoding_label: String,
    /// Malformed sequences were replaced with U+FFFD.
    pub had_errors: bool,
}

/// Decode a response body into UTF-8 using: BOM -> Content-Type charset -> chardetng fallback.
///
/// Decoding is lossy: a stray invalid byte becomes U+FFFD instead of failing
/// the whole document.
pub fn decode_document(bytes: &[u8], content_type: Option<&str>) -> DecodedDocument {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(enc) = content_type
        .and_then(charset_of)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, enc);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn charset_of(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim_matches(&[' ', '"', '\''][..]).to_string())
    })
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedDocument {
    let (text, _, had_errors) = enc.decode(bytes);
    DecodedDocument {
        text: text.into_owned(),
        encoding_label: enc.name().to_string(),
        had_errors,
    }
}

/// Remove invisible and control code points that break HTML parsing.
///
/// Tab, newline and carriage return survive; everything else in the C0/C1
/// blocks, the soft hyphen, bidi/format controls, zero-width and separator
/// characters, the BOM and U+FFF0..=U+FFFF is dropped.
pub fn strip_invisible(text: &str) -> String {
    text.chars().filter(|&c| !is_invisible(c)).collect()
}

fn is_invisible(c: char) -> bool {
    matches!(c,
        '\u{0000}'..='\u{0008}'
        | '\u{000B}'..='\u{000C}'
        | '\u{000E}'..='\u{001F}'
        | '\u{007F}'..='\u{009F}'
        | '\u{00AD}'
        | '\u{0600}'..='\u{0604}'
        | '\u{070F}'
        | '\u{17B4}'..='\u{17B5}'
        | '\u{200B}'..='\u{200F}'
        | '\u{2028}'..='\u{202F}'
        | '\u{2060}'..='\u{206F}'
        | '\u{FEFF}'
        | '\u{FFF0}'..='\u{FFFF}'
    )
}

#[cfg(test)]
mod tests {
    use super::{decode_document, strip_invisible};
    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_tab_newline_and_carriage_return() {
        assert_eq!(strip_invisible("a\tb\nc\rd"), "a\tb\nc\rd");
    }

    #[test]
    fn removes_controls_and_zero_width_characters() {
        let raw = "\u{0001}he\u{200B}l\u{00AD}lo\u{FEFF} \u{2028}wo\u{0085}rld\u{FFFD}\u{202E}";
        assert_eq!(strip_invisible(raw), "hello world");
    }

    #[test]
    fn leaves_hangul_untouched() {
        assert_eq!(strip_invisible("안녕\u{200D}하세요"), "안녕하세요");
    }

    #[test]
    fn decode_respects_charset_header() {
        let decoded = decode_document(b"caf\xe9", Some("text/html; charset=ISO-8859-1"));
        assert_eq!(decoded.text, "café");
        assert!(!decoded.had_errors);
    }

    #[test]
    fn decode_handles_utf8_bom() {
        let decoded = decode_document(b"\xEF\xBB\xBFhello", Some("text/html"));
        assert_eq!(decoded.text, "hello");
        assert_eq!(decoded.encoding_label, "UTF-8");
    }

    #[test]
    fn invalid_bytes_become_replacement_characters() {
        let decoded = decode_document(b"<p>ok\xff</p>", Some("text/html; charset=utf-8"));
        assert_eq!(decoded.text, "<p>ok\u{FFFD}</p>");
        assert_eq!(decoded.encoding_label, "UTF-8");
        assert!(decoded.had_errors);
    }
}
