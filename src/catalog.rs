use serde::Serialize;

use crate::charset;

/// One translatable unit shared by the PO and MO codecs.
///
/// An empty `id` marks the header entry, whose first translation carries the
/// catalog metadata (`Content-Type`, `Plural-Forms`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub context: Option<String>,
    pub id: String,
    pub id_plural: Option<String>,
    pub translations: Vec<String>,
}

impl CatalogEntry {
    pub fn singular(id: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            context: None,
            id: id.into(),
            id_plural: None,
            translations: vec![translation.into()],
        }
    }

    pub fn plural<I, S>(
        id: impl Into<String>,
        id_plural: impl Into<String>,
        translations: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            context: None,
            id: id.into(),
            id_plural: Some(id_plural.into()),
            translations: translations.into_iter().map(Into::into).collect(),
        }
    }

    pub fn header(metadata: impl Into<String>) -> Self {
        Self::singular("", metadata)
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_header(&self) -> bool {
        self.id.is_empty()
    }

    pub fn is_plural(&self) -> bool {
        self.id_plural.is_some()
    }

    pub fn key(&self) -> EntryKey {
        EntryKey {
            context: self.context.clone(),
            id: self.id.clone(),
            id_plural: self.id_plural.clone(),
        }
    }

    /// First translation, or the empty string when there is none.
    pub fn translation(&self) -> &str {
        self.translations.first().map(String::as_str).unwrap_or("")
    }
}

/// Composite identity of an entry: `(context, id, id_plural)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    pub context: Option<String>,
    pub id: String,
    pub id_plural: Option<String>,
}

/// Result of decoding a catalog: the charset its header declares and the
/// entries in the order they were read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub charset: String,
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Wraps decoded entries, taking the charset from the last header entry.
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let charset = charset::resolve_header_charset(
            last_header(&entries).map(CatalogEntry::translation),
        );
        Self { charset, entries }
    }

    pub fn header(&self) -> Option<&CatalogEntry> {
        last_header(&self.entries)
    }

    pub fn get(&self, key: &EntryKey) -> Option<&CatalogEntry> {
        self.entries.iter().rev().find(|entry| entry.key() == *key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn last_header(entries: &[CatalogEntry]) -> Option<&CatalogEntry> {
    entries.iter().rev().find(|entry| entry.is_header())
}
