use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::charset;
use crate::error::FormatError;

pub const MO_MAGIC: u32 = 0x950412de;
pub const HEADER_LEN: usize = 28;

const CONTEXT_SEPARATOR: char = '\u{4}';
const PLURAL_SEPARATOR: char = '\0';
const DESCRIPTOR_LEN: usize = 8;
const SYNTHESIZED_HEADER: &str = "Content-Type: text/plain; charset=UTF-8\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn detect(magic: [u8; 4]) -> Option<Self> {
        if u32::from_le_bytes(magic) == MO_MAGIC {
            Some(Self::Little)
        } else if u32::from_be_bytes(magic) == MO_MAGIC {
            Some(Self::Big)
        } else {
            None
        }
    }

    fn read_u32(self, data: &[u8], offset: usize) -> Option<u32> {
        let end = offset.checked_add(4)?;
        let bytes: [u8; 4] = data.get(offset..end)?.try_into().ok()?;
        Some(match self {
            Self::Little => u32::from_le_bytes(bytes),
            Self::Big => u32::from_be_bytes(bytes),
        })
    }
}

/// The fixed 28-byte header at the start of every MO file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoHeader {
    pub byte_order: ByteOrder,
    pub revision: u32,
    pub count: u32,
    pub originals_offset: u32,
    pub translations_offset: u32,
    pub hash_size: u32,
    pub hash_offset: u32,
}

pub fn read_mo_header(data: &[u8]) -> Result<MoHeader, FormatError> {
    if data.len() < HEADER_LEN {
        return Err(FormatError::TooSmall { len: data.len() });
    }
    let magic = [data[0], data[1], data[2], data[3]];
    let byte_order =
        ByteOrder::detect(magic).ok_or(FormatError::BadMagic(u32::from_le_bytes(magic)))?;
    let field = |index: usize| {
        byte_order
            .read_u32(data, index * 4)
            .ok_or(FormatError::TooSmall { len: data.len() })
    };
    let header = MoHeader {
        byte_order,
        revision: field(1)?,
        count: field(2)?,
        originals_offset: field(3)?,
        translations_offset: field(4)?,
        hash_size: field(5)?,
        hash_offset: field(6)?,
    };
    if header.revision != 0 {
        return Err(FormatError::UnsupportedRevision(header.revision));
    }
    Ok(header)
}

/// Decodes a binary catalog. Entries come back in table order.
pub fn read_mo(data: &[u8]) -> Result<Catalog, FormatError> {
    let header = read_mo_header(data)?;
    debug!(
        byte_order = ?header.byte_order,
        count = header.count,
        "read .mo header"
    );

    let originals = read_table(data, &header, header.originals_offset, "original")?;
    let translations = read_table(data, &header, header.translations_offset, "translation")?;
    let pairs = originals
        .into_iter()
        .zip(translations)
        .map(|(original, translation)| {
            (
                slice_string(data, original),
                slice_string(data, translation),
            )
        })
        .collect::<Vec<_>>();

    let header_block = pairs
        .iter()
        .find(|(original, _)| original.is_empty())
        .map(|(_, translation)| String::from_utf8_lossy(translation));
    let charset = charset::resolve_header_charset(header_block.as_deref());

    let entries = pairs
        .iter()
        .map(|(original, translation)| {
            decode_entry(
                &charset::decode(original, &charset),
                &charset::decode(translation, &charset),
            )
        })
        .collect();

    Ok(Catalog::new(entries))
}

/// Encodes entries into a binary catalog with keys sorted byte-wise.
///
/// A header declaring UTF-8 is added when no entry has an empty id. Entries
/// that encode to the same key overwrite earlier ones.
pub fn write_mo(entries: &[CatalogEntry], charset: &str) -> Result<Vec<u8>, FormatError> {
    let synthesized = (!entries.iter().any(CatalogEntry::is_header))
        .then(|| CatalogEntry::header(SYNTHESIZED_HEADER));

    let mut table: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
    for entry in synthesized.iter().chain(entries) {
        let key = entry_key(entry);
        let value = entry_value(entry);
        let encoded_key = charset::encode(&key, charset).into_owned();
        let encoded_value = charset::encode(&value, charset).into_owned();
        if table.insert(encoded_key, encoded_value).is_some() {
            warn!(
                key = %key.escape_debug(),
                "duplicate catalog key, keeping the later entry"
            );
        }
    }

    let count = table.len();
    let originals_offset = HEADER_LEN;
    let translations_offset = originals_offset + count * DESCRIPTOR_LEN;
    let pool_offset = translations_offset + count * DESCRIPTOR_LEN;

    let mut pool = Vec::new();
    let mut original_descriptors = Vec::with_capacity(count);
    for key in table.keys() {
        original_descriptors.push(push_aligned(&mut pool, pool_offset, key)?);
    }
    let mut translation_descriptors = Vec::with_capacity(count);
    for value in table.values() {
        translation_descriptors.push(push_aligned(&mut pool, pool_offset, value)?);
    }

    let mut out = Vec::with_capacity(pool_offset + pool.len());
    for field in [
        MO_MAGIC,
        0,
        to_u32(count, "entry count")?,
        to_u32(originals_offset, "original table offset")?,
        to_u32(translations_offset, "translation table offset")?,
        0,
        0,
    ] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    for (len, offset) in original_descriptors.iter().chain(&translation_descriptors) {
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&offset.to_le_bytes());
    }
    out.extend_from_slice(&pool);

    debug!(count, bytes = out.len(), "wrote .mo catalog");
    Ok(out)
}

#[derive(Debug, Clone, Copy)]
struct Descriptor {
    len: usize,
    offset: usize,
}

fn read_table(
    data: &[u8],
    header: &MoHeader,
    table_offset: u32,
    table: &'static str,
) -> Result<Vec<Descriptor>, FormatError> {
    let count = header.count as usize;
    let mut descriptors = Vec::with_capacity(count.min(data.len() / DESCRIPTOR_LEN));
    for index in 0..count {
        let out_of_bounds = FormatError::TableOutOfBounds { table, index };
        let at = index
            .checked_mul(DESCRIPTOR_LEN)
            .and_then(|rel| rel.checked_add(table_offset as usize))
            .ok_or_else(|| out_of_bounds.clone())?;
        let len = header.byte_order.read_u32(data, at);
        let offset = at
            .checked_add(4)
            .and_then(|next| header.byte_order.read_u32(data, next));
        let (Some(len), Some(offset)) = (len, offset) else {
            return Err(out_of_bounds);
        };
        descriptors.push(Descriptor {
            len: len as usize,
            offset: offset as usize,
        });
    }
    Ok(descriptors)
}

fn slice_string(data: &[u8], descriptor: Descriptor) -> &[u8] {
    let end = descriptor
        .offset
        .saturating_add(descriptor.len)
        .min(data.len());
    let start = descriptor.offset.min(end);
    if end - start < descriptor.len {
        warn!(
            offset = descriptor.offset,
            len = descriptor.len,
            "string runs past the end of the .mo file, truncating"
        );
    }
    &data[start..end]
}

fn decode_entry(original: &str, translation: &str) -> CatalogEntry {
    let (context, id_field) = match original.split_once(CONTEXT_SEPARATOR) {
        Some((context, rest)) => (Some(context.to_string()), rest),
        None => (None, original),
    };
    let (id, id_plural) = match id_field.split_once(PLURAL_SEPARATOR) {
        Some((id, plural)) => (id.to_string(), Some(plural.to_string())),
        None => (id_field.to_string(), None),
    };
    CatalogEntry {
        context,
        id,
        id_plural,
        translations: translation
            .split(PLURAL_SEPARATOR)
            .map(str::to_string)
            .collect(),
    }
}

fn entry_key(entry: &CatalogEntry) -> String {
    let mut key = match &entry.context {
        Some(context) => format!("{context}{CONTEXT_SEPARATOR}{}", entry.id),
        None => entry.id.clone(),
    };
    if let Some(plural) = &entry.id_plural {
        key.push(PLURAL_SEPARATOR);
        key.push_str(plural);
    }
    key
}

fn entry_value(entry: &CatalogEntry) -> String {
    if entry.is_plural() {
        entry.translations.join("\0")
    } else {
        entry.translation().to_string()
    }
}

/// Appends a NUL-terminated string at the next 4-byte boundary and returns its
/// `(length, absolute offset)` descriptor.
fn push_aligned(
    pool: &mut Vec<u8>,
    base: usize,
    bytes: &[u8],
) -> Result<(u32, u32), FormatError> {
    let offset = align4(base + pool.len());
    pool.resize(offset - base, 0);
    pool.extend_from_slice(bytes);
    pool.push(0);
    Ok((
        to_u32(bytes.len(), "string length")?,
        to_u32(offset, "string offset")?,
    ))
}

fn align4(value: usize) -> usize {
    (value + 3) & !3
}

fn to_u32(value: usize, what: &'static str) -> Result<u32, FormatError> {
    u32::try_from(value).map_err(|_| FormatError::TooLarge(what))
}
