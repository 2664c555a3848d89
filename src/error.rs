use thiserror::Error;

/// Fatal problems with a binary catalog. Decoding stops at the first one and
/// no partial catalog is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid .mo: too small ({len} bytes, header needs 28)")]
    TooSmall { len: usize },
    #[error("invalid .mo: bad magic {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported .mo revision: {0}")]
    UnsupportedRevision(u32),
    #[error("invalid .mo: {table} table entry {index} lies outside the file")]
    TableOutOfBounds { table: &'static str, index: usize },
    #[error("catalog too large for .mo: {0} exceeds 32 bits")]
    TooLarge(&'static str),
}
