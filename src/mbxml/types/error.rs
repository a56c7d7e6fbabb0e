//! Custom error types for the mini-binary-xml crate.

use thiserror::Error;

use crate::mbxml::types::models::FORMAT_VERSION;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum MbxmlError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input does not start with a valid MBXM header.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The header declares a version this build refuses to decode.
    #[error(
        "Unsupported MBXM version: {0}. Only version {supported} is supported.",
        supported = FORMAT_VERSION
    )]
    UnsupportedVersion(u8),

    /// The string pool is empty, has unordered offsets, or points past the input.
    #[error("Malformed string pool: {0}")]
    MalformedStringPool(String),

    /// A string does not fit the 16-bit length prefix.
    #[error("String of {len} bytes exceeds the {max} byte limit")]
    StringTooLong { len: usize, max: usize },

    #[error("Element <{tag}> has {count} attributes, the limit is {max}")]
    TooManyAttributes { tag: String, count: usize, max: usize },

    #[error("Element <{tag}> has {count} children, the limit is {max}")]
    TooManyChildren { tag: String, count: usize, max: usize },

    /// A pool or record count does not fit the 32-bit count field.
    #[error("Too many {item_type}: {count}")]
    TooManyEntries { item_type: &'static str, count: usize },

    /// The node table ended before all declared records were read.
    #[error("Truncated node table: {0}")]
    Truncated(String),

    /// A string or record index does not address a valid entry.
    #[error("{kind} index {index} out of range (length {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: i64,
        len: usize,
    },

    #[error("No root node found")]
    NoRootNode,

    /// More than one record declares no parent.
    #[error("Multiple root nodes found at records {first} and {second}")]
    MultipleRoots { first: usize, second: usize },

    /// The child links do not form a single tree (shared child or cycle).
    #[error("Broken tree structure: {0}")]
    BrokenTree(String),

    /// Textual XML could not be read or written.
    #[error("XML error: {0}")]
    Xml(String),
}

impl From<quick_xml::Error> for MbxmlError {
    fn from(e: quick_xml::Error) -> Self {
        MbxmlError::Xml(e.to_string())
    }
}

/// A convenience `Result` type alias using the crate's `MbxmlError` type.
pub type Result<T> = std::result::Result<T, MbxmlError>;
