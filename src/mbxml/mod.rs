//! MBXM encoder and decoder.
//!
//! [`encode`] flattens an [`Element`] tree into a string pool and a node table
//! and writes header, pool and table. [`decode`] reads them back and assembles
//! the tree. Every call owns its own pool and table; nothing is shared between
//! calls.

pub mod format;
pub mod tree;
pub mod types;
pub mod xml;
mod utils;

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use log::{debug, info};

use format::{header, nodes, strings::StringPool};
use types::models::{DecodeOptions, Element, XmlOptions};
pub use types::error::{MbxmlError, Result};

/// Encodes `root` into a new byte buffer.
///
/// # Errors
/// `StringTooLong`, `TooManyAttributes` or `TooManyChildren` when a value
/// exceeds its 16-bit field.
pub fn to_bytes(root: &Element) -> Result<Vec<u8>> {
    let encoded = tree::flatten(root);

    let mut buf = Vec::new();
    header::write(&mut buf)?;
    encoded.pool.write(&mut buf)?;
    nodes::write(&mut buf, &encoded.records, &encoded.pool)?;

    info!(
        "Encoded <{}>: {} records, {} strings, {} bytes",
        root.tag,
        encoded.records.len(),
        encoded.pool.len(),
        buf.len()
    );
    Ok(buf)
}

/// Encodes `root` and writes it to `writer`.
///
/// The payload is fully built before anything is written, so a failed encode
/// leaves `writer` untouched.
pub fn encode<W: Write>(root: &Element, writer: &mut W) -> Result<()> {
    let bytes = to_bytes(root)?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Decodes one tree from `reader`.
///
/// # Errors
/// - `InvalidFormat` / `UnsupportedVersion` from the header
/// - `MalformedStringPool` from the string pool
/// - `Truncated` from the node table
/// - `IndexOutOfRange`, `BrokenTree`, `NoRootNode`, `MultipleRoots` from tree assembly
pub fn decode<R: Read + Seek>(reader: &mut R, options: &DecodeOptions) -> Result<Element> {
    let header = header::parse(reader, options.version_policy)?;
    let pool = StringPool::parse(reader)?;
    let records = nodes::parse(reader, pool.len())?;
    debug!(
        "Decoding version {} payload: {} strings, {} records",
        header.version,
        pool.len(),
        records.len()
    );

    let root = tree::assemble(&pool, &records, options.root_policy)?;
    info!("Decoded <{}>: {} elements", root.tag, root.subtree_len());
    Ok(root)
}

/// Decodes a byte buffer with default options.
pub fn from_bytes(bytes: &[u8]) -> Result<Element> {
    decode(&mut Cursor::new(bytes), &DecodeOptions::default())
}

/// Decodes a byte buffer straight to XML text.
pub fn decode_to_xml(
    bytes: &[u8],
    options: &DecodeOptions,
    xml_options: &XmlOptions,
) -> Result<String> {
    let root = decode(&mut Cursor::new(bytes), options)?;
    xml::to_string(&root, xml_options)
}

/// Loads the XML file at `from` and writes its encoding to `to`, replacing any
/// existing file.
pub fn compress_file(
    from: impl AsRef<Path>,
    to: impl AsRef<Path>,
    xml_options: &XmlOptions,
) -> Result<()> {
    let root = xml::load(from, xml_options)?;
    let bytes = to_bytes(&root)?;

    let to = to.as_ref();
    let mut out = BufWriter::new(File::create(to)?);
    out.write_all(&bytes)?;
    out.flush()?;
    info!("Wrote {} bytes to {}", bytes.len(), to.display());
    Ok(())
}

/// Decodes the MBXM file at `from` and saves it as XML to `to`, replacing any
/// existing file.
pub fn decompress_file(
    from: impl AsRef<Path>,
    to: impl AsRef<Path>,
    options: &DecodeOptions,
    xml_options: &XmlOptions,
) -> Result<()> {
    let from = from.as_ref();
    info!("Reading MBXM file: {}", from.display());
    let bytes = fs::read(from)?;
    let root = decode(&mut Cursor::new(bytes.as_slice()), options)?;
    xml::save(&root, to, xml_options)
}
