//! # mini-binary-xml
//!
//! A compact binary encoding (MBXM) for simplified XML element trees:
//! tagged elements, string attributes, optional direct text and ordered
//! children. All strings live in a deduplicated pool; the tree is stored as a
//! flat table of fixed-shape records that reference the pool by index.
//!
//! Text interleaved between child elements is not kept in place: each
//! element carries one direct-text block, written before its children.
pub mod mbxml;

// Re-export the main types for convenience
pub use mbxml::{
    compress_file, decode, decode_to_xml, decompress_file, encode,
    format::strings::StringPool,
    from_bytes, to_bytes,
    tree::EncodedTree,
    types::models::{
        DecodeOptions, Element, FormatHeader, NodeRecord, RootPolicy, VersionPolicy, XmlOptions,
    },
    MbxmlError, Result,
};
