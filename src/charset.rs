use encoding_rs::Encoding;
use std::borrow::Cow;
use tracing::debug;

pub const DEFAULT_CHARSET: &str = "utf-8";

const CHARSET_PARAM: &str = "charset=";

/// Extracts the `charset=` parameter from a header block such as
/// `Content-Type: text/plain; charset=UTF-8\n`.
///
/// Matching is case-insensitive and the value keeps its declared spelling.
/// Falls back to [`DEFAULT_CHARSET`] when the parameter is missing or empty.
pub fn charset_from_header(header: &str) -> String {
    // ASCII lowercasing keeps byte offsets valid for the original string.
    let lower = header.to_ascii_lowercase();
    let Some(start) = lower.find(CHARSET_PARAM) else {
        return DEFAULT_CHARSET.to_string();
    };
    let value = &header[start + CHARSET_PARAM.len()..];
    let end = value
        .find(|ch: char| ch.is_whitespace() || ch == ';')
        .unwrap_or(value.len());
    let charset = value[..end]
        .trim()
        .trim_matches(|ch| ch == '"' || ch == '\'')
        .trim();
    if charset.is_empty() {
        DEFAULT_CHARSET.to_string()
    } else {
        charset.to_string()
    }
}

pub fn resolve_header_charset(header: Option<&str>) -> String {
    header
        .map(charset_from_header)
        .unwrap_or_else(|| DEFAULT_CHARSET.to_string())
}

pub fn encoding_for(charset: &str) -> Option<&'static Encoding> {
    Encoding::for_label(charset.trim().as_bytes())
}

/// Decodes `bytes` with the named charset, replacing anything undecodable.
///
/// A strict decode is tried first; unknown labels and malformed input fall
/// back to lossy UTF-8 so a single bad string never fails a whole catalog.
/// Charsets that [`encode`] cannot produce (UTF-16 and friends) are read as
/// their output encoding, so both directions agree.
pub fn decode(bytes: &[u8], charset: &str) -> String {
    match encoding_for(charset).map(Encoding::output_encoding) {
        Some(encoding) => {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes)
            {
                return text.into_owned();
            }
            debug!(charset, "undecodable bytes, falling back to lossy UTF-8");
        }
        None => debug!(charset, "unknown charset, decoding as lossy UTF-8"),
    }
    String::from_utf8_lossy(bytes).into_owned()
}

/// Encodes `text` with the named charset, or as UTF-8 when the label is
/// unknown or the text has characters the charset cannot represent.
pub fn encode<'a>(text: &'a str, charset: &str) -> Cow<'a, [u8]> {
    let Some(encoding) = encoding_for(charset) else {
        debug!(charset, "unknown charset, encoding as UTF-8");
        return Cow::Borrowed(text.as_bytes());
    };
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        debug!(charset, "unmappable characters, encoding string as UTF-8");
        return Cow::Borrowed(text.as_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_charset_case_insensitively() {
        let header = "Project-Id-Version: demo\nContent-Type: text/plain; CHARSET=ISO-8859-1\n";
        assert_eq!(charset_from_header(header), "ISO-8859-1");
    }

    #[test]
    fn strips_quotes_and_stops_at_separator() {
        assert_eq!(
            charset_from_header("Content-Type: text/plain; charset=\"koi8-r\"; format=flowed"),
            "koi8-r"
        );
        assert_eq!(charset_from_header("charset='cp1251'\n"), "cp1251");
    }

    #[test]
    fn missing_or_empty_charset_defaults() {
        assert_eq!(charset_from_header("Language: pt_BR\n"), DEFAULT_CHARSET);
        assert_eq!(charset_from_header("charset=\"\"\n"), DEFAULT_CHARSET);
        assert_eq!(resolve_header_charset(None), DEFAULT_CHARSET);
    }

    #[test]
    fn decodes_with_declared_charset() {
        assert_eq!(decode(&[0x63, 0x61, 0x66, 0xe9], "ISO-8859-1"), "café");
    }

    #[test]
    fn undecodable_bytes_are_replaced() {
        assert_eq!(decode(&[0x61, 0xff, 0x62], "utf-8"), "a\u{fffd}b");
        assert_eq!(decode(b"plain", "CHARSET"), "plain");
    }

    #[test]
    fn encode_uses_charset_when_representable() {
        assert_eq!(encode("café", "ISO-8859-1").as_ref(), &[0x63, 0x61, 0x66, 0xe9]);
    }

    #[test]
    fn utf16_labels_decode_as_utf8() {
        assert_eq!(encode("Salvar", "UTF-16").as_ref(), b"Salvar");
        assert_eq!(decode(b"Salvar", "UTF-16"), "Salvar");
        assert_eq!(decode(b"Salvar", "utf-16be"), "Salvar");
    }

    #[test]
    fn encode_falls_back_to_utf8() {
        assert_eq!(encode("日本", "ISO-8859-1").as_ref(), "日本".as_bytes());
        assert_eq!(encode("café", "no-such-charset").as_ref(), "café".as_bytes());
    }
}
