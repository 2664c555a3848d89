use tracing::{debug, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::charset;

const MAX_PLURAL_INDEX: usize = 255;
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum PoField {
    #[default]
    None,
    Context,
    Id,
    IdPlural,
    Translation(usize),
}

/// Parses PO text into a catalog. Never fails: malformed string literals
/// become empty strings and unknown lines are skipped.
pub fn read_po(text: &str) -> Catalog {
    let mut reader = PoReader::default();
    for (index, raw) in text.lines().enumerate() {
        reader.feed(index + 1, raw.trim());
    }
    reader.finish()
}

/// Parses raw PO bytes, honoring the header charset when the file is not
/// valid UTF-8.
pub fn read_po_bytes(bytes: &[u8]) -> Catalog {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(bytes) {
        return read_po(text);
    }
    let sniffed = read_po(&String::from_utf8_lossy(bytes)).charset;
    debug!(charset = %sniffed, "po file is not UTF-8, decoding with header charset");
    read_po(&charset::decode(bytes, &sniffed))
}

#[derive(Default)]
struct PoReader {
    entries: Vec<CatalogEntry>,
    current: Option<CatalogEntry>,
    field: PoField,
}

impl PoReader {
    fn feed(&mut self, line_no: usize, line: &str) {
        if line.is_empty() {
            self.flush();
            return;
        }
        if line.starts_with('#') {
            return;
        }
        if line.starts_with('"') {
            self.append(line_no, line);
            return;
        }
        if let Some(directive) = parse_keyword(line) {
            let Some((field, rest)) = directive else {
                self.field = PoField::None;
                return;
            };
            let value = parse_literal(line_no, rest);
            let entry = self.current.get_or_insert_with(CatalogEntry::default);
            match field {
                PoField::Context => entry.context = Some(value),
                PoField::Id => entry.id = value,
                PoField::IdPlural => entry.id_plural = Some(value),
                PoField::Translation(index) => {
                    if entry.translations.len() <= index {
                        entry.translations.resize(index + 1, String::new());
                    }
                    entry.translations[index] = value;
                }
                PoField::None => return,
            }
            self.field = field;
        }
    }

    fn append(&mut self, line_no: usize, line: &str) {
        let Some(entry) = self.current.as_mut() else {
            return;
        };
        if self.field == PoField::None {
            return;
        }
        let fragment = parse_literal(line_no, line);
        match self.field {
            PoField::Context => entry
                .context
                .get_or_insert_with(String::new)
                .push_str(&fragment),
            PoField::Id => entry.id.push_str(&fragment),
            PoField::IdPlural => entry
                .id_plural
                .get_or_insert_with(String::new)
                .push_str(&fragment),
            PoField::Translation(index) => {
                if entry.translations.len() <= index {
                    entry.translations.resize(index + 1, String::new());
                }
                entry.translations[index].push_str(&fragment);
            }
            PoField::None => {}
        }
    }

    fn flush(&mut self) {
        self.field = PoField::None;
        let Some(mut entry) = self.current.take() else {
            return;
        };
        if !entry.is_plural() && entry.translations.is_empty() {
            entry.translations.push(String::new());
        }
        self.entries.push(entry);
    }

    fn finish(mut self) -> Catalog {
        self.flush();
        Catalog::new(self.entries)
    }
}

/// Splits a directive line into the field it starts and the literal after it.
///
/// Returns `None` for lines that are not directives and `Some(None)` for a
/// directive that is rejected, which also ends the active field.
fn parse_keyword(line: &str) -> Option<Option<(PoField, &str)>> {
    if let Some(rest) = line.strip_prefix("msgctxt") {
        return Some(Some((PoField::Context, rest)));
    }
    if let Some(rest) = line.strip_prefix("msgid_plural") {
        return Some(Some((PoField::IdPlural, rest)));
    }
    if let Some(rest) = line.strip_prefix("msgid") {
        return Some(Some((PoField::Id, rest)));
    }
    let rest = line.strip_prefix("msgstr")?;
    if let Some((index, literal)) = parse_plural_index(rest) {
        if index > MAX_PLURAL_INDEX {
            warn!(index, "msgstr plural index out of range, skipping line");
            return Some(None);
        }
        return Some(Some((PoField::Translation(index), literal)));
    }
    Some(Some((PoField::Translation(0), rest)))
}

fn parse_plural_index(rest: &str) -> Option<(usize, &str)> {
    let inner = rest.strip_prefix('[')?;
    let close = inner.find(']')?;
    let digits = &inner[..close];
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let index = digits.parse().unwrap_or(usize::MAX);
    Some((index, &inner[close + 1..]))
}

fn parse_literal(line_no: usize, raw: &str) -> String {
    match parse_po_quoted(raw) {
        Some(value) => value,
        None => {
            warn!(line = line_no, "malformed PO string literal, using empty string");
            String::new()
        }
    }
}

/// Parses one `"..."` literal. Returns `None` when the opening or closing
/// quote is missing or text follows the closing quote.
fn parse_po_quoted(raw: &str) -> Option<String> {
    let body = raw.trim().strip_prefix('"')?;
    let mut escape = false;
    for (idx, ch) in body.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' => escape = true,
            '"' => {
                if !body[idx + 1..].trim().is_empty() {
                    return None;
                }
                return Some(unescape(&body[..idx]));
            }
            _ => {}
        }
    }
    None
}

/// Reverses [`escape`]. Only `\\`, `\"`, `\t`, `\r` and `\n` are recognized;
/// any other backslash pair is kept as written.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Serializes entries as PO text, one block per entry in the given order.
pub fn write_po(entries: &[CatalogEntry]) -> String {
    let mut lines = Vec::new();
    for entry in entries {
        if let Some(context) = &entry.context {
            push_field(&mut lines, "msgctxt", context);
        }
        push_field(&mut lines, "msgid", &entry.id);
        if let Some(plural) = &entry.id_plural {
            push_field(&mut lines, "msgid_plural", plural);
        }
        if entry.is_plural() || entry.translations.len() > 1 {
            for (index, translation) in entry.translations.iter().enumerate() {
                push_field(&mut lines, &format!("msgstr[{index}]"), translation);
            }
        } else {
            push_field(&mut lines, "msgstr", entry.translation());
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

fn push_field(lines: &mut Vec<String>, keyword: &str, value: &str) {
    let mut quoted = quote_lines(value).into_iter();
    if let Some(first) = quoted.next() {
        lines.push(format!("{keyword} {first}"));
    }
    lines.extend(quoted);
}

/// Quotes a value, breaking it after every newline so multi-line strings
/// stay readable in editors.
fn quote_lines(value: &str) -> Vec<String> {
    if value.is_empty() {
        return vec!["\"\"".to_string()];
    }
    let mut parts = value.split('\n').peekable();
    let mut out = Vec::new();
    while let Some(part) = parts.next() {
        if parts.peek().is_some() {
            out.push(format!("\"{}\\n\"", escape(part)));
        } else {
            out.push(format!("\"{}\"", escape(part)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::DEFAULT_CHARSET;

    const SAMPLE: &str = r#"# Portuguese translation
msgid ""
msgstr ""
"Content-Type: text/plain; charset=UTF-8\n"
"Plural-Forms: nplurals=2; plural=(n > 1);\n"

#: src/menu.c:10
msgctxt "menu"
msgid "Open"
msgstr "Abrir"

msgid "cat"
msgid_plural "cats"
msgstr[0] "gato"
msgstr[1] "gatos"

msgid ""
"Line one\n"
"Line two"
msgstr "Linha \"um\"\n"
"Linha dois"
"#;

    #[test]
    fn reads_entries_in_order() {
        let catalog = read_po(SAMPLE);
        assert_eq!(catalog.charset, "UTF-8");
        assert_eq!(catalog.entries.len(), 4);

        assert!(catalog.entries[0].is_header());
        assert_eq!(
            catalog.entries[0].translation(),
            "Content-Type: text/plain; charset=UTF-8\nPlural-Forms: nplurals=2; plural=(n > 1);\n"
        );
        assert_eq!(
            catalog.entries[1],
            CatalogEntry::singular("Open", "Abrir").with_context("menu")
        );
        assert_eq!(
            catalog.entries[2],
            CatalogEntry::plural("cat", "cats", ["gato", "gatos"])
        );
        assert_eq!(
            catalog.entries[3],
            CatalogEntry::singular("Line one\nLine two", "Linha \"um\"\nLinha dois")
        );
    }

    #[test]
    fn missing_final_blank_line_still_flushes() {
        let catalog = read_po("msgid \"Save\"\nmsgstr \"Salvar\"");
        assert_eq!(catalog.entries, vec![CatalogEntry::singular("Save", "Salvar")]);
        assert_eq!(catalog.charset, DEFAULT_CHARSET);
    }

    #[test]
    fn malformed_literals_become_empty() {
        let catalog = read_po("msgid \"Save\nmsgstr \"Salvar\" trailing\n\nmsgid \"Quit\"\nmsgstr \"Sair\"\n");
        assert_eq!(catalog.entries[0], CatalogEntry::singular("", ""));
        assert_eq!(catalog.entries[1], CatalogEntry::singular("Quit", "Sair"));
    }

    #[test]
    fn sparse_plural_indexes_are_padded() {
        let catalog = read_po("msgid \"cat\"\nmsgid_plural \"cats\"\nmsgstr[2] \"gatos\"\n");
        assert_eq!(catalog.entries[0].translations, vec!["", "", "gatos"]);
    }

    #[test]
    fn oversized_plural_index_is_skipped() {
        let catalog = read_po("msgid \"cat\"\nmsgstr[99999999999] \"x\"\n");
        assert_eq!(catalog.entries[0].id, "cat");
        assert_eq!(catalog.entries[0].translations, vec![""]);
    }

    #[test]
    fn skipped_directive_ends_the_active_field() {
        let catalog = read_po("msgid \"cat\"\nmsgstr[999] \"x\"\n\"more\"\n");
        assert_eq!(catalog.entries, vec![CatalogEntry::singular("cat", "")]);
    }

    #[test]
    fn entry_without_msgstr_reads_as_untranslated() {
        let catalog = read_po("msgid \"Save\"\n\nmsgid \"Quit\"\nmsgstr \"Sair\"\n");
        assert_eq!(catalog.entries[0], CatalogEntry::singular("Save", ""));
        let reread = read_po(&write_po(&catalog.entries));
        assert_eq!(reread, catalog);
    }

    #[test]
    fn indexed_msgstr_without_plural_id_round_trips() {
        let catalog = read_po("msgid \"cat\"\nmsgstr[0] \"gato\"\nmsgstr[1] \"gatos\"\n");
        assert_eq!(catalog.entries[0].translations, vec!["gato", "gatos"]);
        let text = write_po(&catalog.entries);
        assert_eq!(text, "msgid \"cat\"\nmsgstr[0] \"gato\"\nmsgstr[1] \"gatos\"\n");
        assert_eq!(read_po(&text), catalog);
    }

    #[test]
    fn non_numeric_index_is_a_plain_msgstr() {
        let catalog = read_po("msgid \"cat\"\nmsgstr[x] \"gato\"\n");
        assert_eq!(catalog.entries[0].translations, vec![""]);
    }

    #[test]
    fn continuation_without_active_field_is_ignored() {
        let catalog = read_po("\"stray\"\nmsgid \"Save\"\nmsgstr \"Salvar\"\n");
        assert_eq!(catalog.entries, vec![CatalogEntry::singular("Save", "Salvar")]);
    }

    #[test]
    fn header_charset_comes_from_last_header() {
        let catalog = read_po(
            "msgid \"\"\nmsgstr \"Content-Type: text/plain; charset=KOI8-R\\n\"\n\n\
             msgid \"\"\nmsgstr \"Content-Type: text/plain; charset=ISO-8859-1\\n\"\n\n\
             msgid \"a\"\nmsgstr \"b\"\n",
        );
        assert_eq!(catalog.charset, "ISO-8859-1");
    }

    #[test]
    fn unknown_escapes_pass_through() {
        assert_eq!(unescape(r"a\x41\0b"), r"a\x41\0b");
        assert_eq!(unescape(r"tab\there"), "tab\there");
    }

    #[test]
    fn escape_round_trips_special_characters() {
        for value in ["back\\slash", "\"quoted\"", "tab\tcr\rlf\n", "\\n literal", ""] {
            assert_eq!(unescape(&escape(value)), value);
        }
    }

    #[test]
    fn writes_multiline_values_as_continuations() {
        let text = write_po(&[CatalogEntry::singular("Hello\nWorld\n", "Olá")]);
        assert_eq!(
            text,
            "msgid \"Hello\\n\"\n\"World\\n\"\n\"\"\nmsgstr \"Olá\"\n"
        );
    }

    #[test]
    fn writes_plural_and_context_fields() {
        let text = write_po(&[
            CatalogEntry::plural("cat", "cats", ["gato", ""]).with_context("animal"),
            CatalogEntry::singular("Save", "Salvar"),
        ]);
        assert_eq!(
            text,
            "msgctxt \"animal\"\nmsgid \"cat\"\nmsgid_plural \"cats\"\nmsgstr[0] \"gato\"\nmsgstr[1] \"\"\n\nmsgid \"Save\"\nmsgstr \"Salvar\"\n"
        );
    }

    #[test]
    fn write_then_read_preserves_catalog() {
        let catalog = read_po(SAMPLE);
        let reread = read_po(&write_po(&catalog.entries));
        assert_eq!(reread, catalog);
    }

    #[test]
    fn reads_latin1_bytes_using_header_charset() {
        let mut bytes = b"msgid \"\"\nmsgstr \"Content-Type: text/plain; charset=ISO-8859-1\\n\"\n\nmsgid \"Coffee\"\nmsgstr \"Caf".to_vec();
        bytes.extend_from_slice(&[0xe9, b'"', b'\n']);
        let catalog = read_po_bytes(&bytes);
        assert_eq!(catalog.charset, "ISO-8859-1");
        assert_eq!(catalog.entries[1].translation(), "Café");
    }

    #[test]
    fn strips_utf8_bom() {
        let catalog = read_po_bytes(b"\xef\xbb\xbfmsgid \"Save\"\nmsgstr \"Salvar\"\n");
        assert_eq!(catalog.entries, vec![CatalogEntry::singular("Save", "Salvar")]);
    }
}
