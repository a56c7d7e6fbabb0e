//! Node table codec.
//!
//! # Layout
//! ```text
//! [4 bytes] Record count M (i32 LE)
//! M records:
//!   [4 bytes] tag index
//!   [4 bytes] text index (-1 = none)
//!   [4 bytes] parent record index (-1 = root)
//!   [2 bytes] attribute count
//!   [2 bytes] child count
//!   [attribute count * 8 bytes] name/value index pairs
//!   [child count * 4 bytes    ] child record indices
//! ```
//!
//! Records are positional: the i-th record in the table is record `i`.
//! Index range checks against the pool and the table happen during tree
//! assembly, once both are fully read.

use std::io::{ErrorKind, Read, Write};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, trace};

use crate::mbxml::format::strings::StringPool;
use crate::mbxml::types::error::{MbxmlError, Result};
use crate::mbxml::types::models::{NodeRecord, MAX_U16_FIELD};
use crate::mbxml::utils;

/// Serializes the record table.
///
/// `pool` is only used to name the offending element in capacity errors.
pub fn write<W: Write>(writer: &mut W, records: &[NodeRecord], pool: &StringPool) -> Result<()> {
    let count = utils::count_to_i32(records.len(), "node records")?;
    writer.write_i32::<LittleEndian>(count)?;

    for record in records {
        let tag_name = || pool.get(record.tag).unwrap_or("?").to_string();
        if record.attributes.len() > MAX_U16_FIELD {
            return Err(MbxmlError::TooManyAttributes {
                tag: tag_name(),
                count: record.attributes.len(),
                max: MAX_U16_FIELD,
            });
        }
        if record.children.len() > MAX_U16_FIELD {
            return Err(MbxmlError::TooManyChildren {
                tag: tag_name(),
                count: record.children.len(),
                max: MAX_U16_FIELD,
            });
        }

        writer.write_i32::<LittleEndian>(utils::index_to_i32(record.tag, "strings")?)?;
        writer.write_i32::<LittleEndian>(utils::optional_index_to_i32(record.text, "strings")?)?;
        let parent = utils::optional_index_to_i32(record.parent, "node records")?;
        writer.write_i32::<LittleEndian>(parent)?;
        writer.write_u16::<LittleEndian>(record.attributes.len() as u16)?;
        writer.write_u16::<LittleEndian>(record.children.len() as u16)?;
        for &(name, value) in &record.attributes {
            writer.write_i32::<LittleEndian>(utils::index_to_i32(name, "strings")?)?;
            writer.write_i32::<LittleEndian>(utils::index_to_i32(value, "strings")?)?;
        }
        for &child in &record.children {
            writer.write_i32::<LittleEndian>(utils::index_to_i32(child, "node records")?)?;
        }
    }

    debug!("Wrote node table: {} records", count);
    Ok(())
}

/// Reads the record table in file order.
///
/// `pool_len` is only used to report the valid range for negative indices.
pub fn parse<R: Read>(reader: &mut R, pool_len: usize) -> Result<Vec<NodeRecord>> {
    let count = reader
        .read_i32::<LittleEndian>()
        .map_err(|e| truncated(e, "record count".to_string()))?;
    if count < 0 {
        return Err(MbxmlError::InvalidFormat(format!("negative record count {}", count)));
    }
    let count = count as usize;
    trace!("Node table: {} records", count);

    let mut records = Vec::with_capacity(count.min(4096));
    for i in 0..count {
        let ctx = |field: &str| format!("record {} of {}, {}", i, count, field);

        let tag = reader.read_i32::<LittleEndian>().map_err(|e| truncated(e, ctx("tag")))?;
        let text = reader.read_i32::<LittleEndian>().map_err(|e| truncated(e, ctx("text")))?;
        let parent = reader.read_i32::<LittleEndian>().map_err(|e| truncated(e, ctx("parent")))?;
        let attr_count = reader
            .read_u16::<LittleEndian>()
            .map_err(|e| truncated(e, ctx("attribute count")))?;
        let child_count = reader
            .read_u16::<LittleEndian>()
            .map_err(|e| truncated(e, ctx("child count")))?;

        let mut attributes = Vec::with_capacity(attr_count as usize);
        for _ in 0..attr_count {
            let name = reader
                .read_i32::<LittleEndian>()
                .map_err(|e| truncated(e, ctx("attributes")))?;
            let value = reader
                .read_i32::<LittleEndian>()
                .map_err(|e| truncated(e, ctx("attributes")))?;
            attributes.push((
                utils::wire_index(name, "attribute name", pool_len)?,
                utils::wire_index(value, "attribute value", pool_len)?,
            ));
        }

        let mut children = Vec::with_capacity(child_count as usize);
        for _ in 0..child_count {
            let child = reader
                .read_i32::<LittleEndian>()
                .map_err(|e| truncated(e, ctx("children")))?;
            children.push(utils::wire_index(child, "child", count)?);
        }

        records.push(NodeRecord {
            tag: utils::wire_index(tag, "tag", pool_len)?,
            text: utils::optional_wire_index(text, "text", pool_len)?,
            parent: utils::optional_wire_index(parent, "parent", count)?,
            attributes,
            children,
        });
    }

    debug!("Read node table: {} records", records.len());
    Ok(records)
}

fn truncated(e: std::io::Error, context: String) -> MbxmlError {
    match e.kind() {
        ErrorKind::UnexpectedEof => MbxmlError::Truncated(context),
        _ => MbxmlError::Io(e),
    }
}
