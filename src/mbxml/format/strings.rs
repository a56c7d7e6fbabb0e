//! Deduplicated string pool and its on-disk layout.
//!
//! # Layout
//! ```text
//! [4 bytes     ] String count N (i32 LE)
//! [N * 4 bytes ] Offsets into the blob (i32 LE), strictly increasing
//! [variable    ] Blob: N x { [2 bytes] length (u16 LE), [length bytes] UTF-8 }
//! ```
//!
//! The format has no end-of-blob marker. The reader finds the end of the pool
//! from the last offset and the length stored there, which only works because
//! offsets follow pool order.

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, trace};

use crate::mbxml::types::error::{MbxmlError, Result};
use crate::mbxml::types::models::MAX_U16_FIELD;
use crate::mbxml::utils;

/// Ordered table of unique strings referenced by index.
///
/// Indices are assigned in first-intern order and never change for the
/// lifetime of the pool.
#[derive(Debug, Default, Clone)]
pub struct StringPool {
    strings: Vec<String>,
    index: HashMap<String, u32>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `s`, appending it first if it is new.
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = self.strings.len() as u32;
        self.strings.push(s.to_owned());
        self.index.insert(s.to_owned(), id);
        id
    }

    /// Appends a string read from the wire. A hand-crafted pool may repeat a
    /// string; lookups then resolve to its first occurrence.
    fn push_decoded(&mut self, s: String) {
        let id = self.strings.len() as u32;
        self.index.entry(s.clone()).or_insert(id);
        self.strings.push(s);
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.strings.get(id as usize).map(String::as_str)
    }

    /// Looks up `id`, failing with `IndexOutOfRange` tagged with `kind`.
    pub fn resolve(&self, id: u32, kind: &'static str) -> Result<&str> {
        self.get(id).ok_or(MbxmlError::IndexOutOfRange {
            kind,
            index: id as i64,
            len: self.strings.len(),
        })
    }

    /// Index of a previously interned string, without interning it.
    pub fn position(&self, s: &str) -> Option<u32> {
        self.index.get(s).copied()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// Builds the offset array and the string blob.
    ///
    /// Offsets are relative to the first blob byte and strictly increasing.
    /// Fails with `StringTooLong` for a string over 65,535 UTF-8 bytes.
    pub fn to_blob(&self) -> Result<(Vec<u32>, Vec<u8>)> {
        let mut offsets = Vec::with_capacity(self.strings.len());
        let mut blob = Vec::new();
        for s in &self.strings {
            let bytes = s.as_bytes();
            if bytes.len() > MAX_U16_FIELD {
                return Err(MbxmlError::StringTooLong {
                    len: bytes.len(),
                    max: MAX_U16_FIELD,
                });
            }
            let offset = u32::try_from(blob.len())
                .ok()
                .filter(|&o| o <= i32::MAX as u32)
                .ok_or(MbxmlError::TooManyEntries {
                    item_type: "string blob bytes",
                    count: blob.len(),
                })?;
            offsets.push(offset);
            blob.write_u16::<LittleEndian>(bytes.len() as u16)?;
            blob.extend_from_slice(bytes);
        }
        Ok((offsets, blob))
    }

    /// Serializes the pool: count, offsets, blob.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let count = utils::count_to_i32(self.strings.len(), "strings")?;
        let (offsets, blob) = self.to_blob()?;

        writer.write_i32::<LittleEndian>(count)?;
        for offset in &offsets {
            writer.write_i32::<LittleEndian>(*offset as i32)?;
        }
        writer.write_all(&blob)?;

        debug!("Wrote string pool: {} strings, {} blob bytes", count, blob.len());
        Ok(())
    }

    /// Reads a pool written by [`StringPool::write`].
    ///
    /// Leaves `reader` positioned on the first byte after the blob, as computed
    /// from the last offset entry. Fails with `MalformedStringPool` for an
    /// empty pool, negative or unordered offsets, reads past the end of the
    /// input and invalid UTF-8.
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let count = reader
            .read_i32::<LittleEndian>()
            .map_err(|e| pool_read_error(e, "string count"))?;
        if count <= 0 {
            return Err(MbxmlError::MalformedStringPool(format!(
                "string count must be positive, found {}",
                count
            )));
        }
        let count = count as usize;

        // Capacity is bounded so a corrupt count cannot force a huge allocation.
        let mut offsets: Vec<u64> = Vec::with_capacity(count.min(4096));
        for i in 0..count {
            let offset = reader
                .read_i32::<LittleEndian>()
                .map_err(|e| pool_read_error(e, "offset array"))?;
            if offset < 0 {
                return Err(MbxmlError::MalformedStringPool(format!(
                    "negative offset {} at entry {}",
                    offset, i
                )));
            }
            let offset = offset as u64;
            if let Some(&prev) = offsets.last() {
                if offset <= prev {
                    return Err(MbxmlError::MalformedStringPool(format!(
                        "offsets not strictly increasing: entry {} has {} after {}",
                        i, offset, prev
                    )));
                }
            }
            offsets.push(offset);
        }

        let blob_base = reader.stream_position()?;
        trace!("String pool: {} entries, blob starts at byte {}", count, blob_base);

        let mut pool = StringPool {
            strings: Vec::with_capacity(offsets.len()),
            index: HashMap::with_capacity(offsets.len()),
        };
        for (i, &offset) in offsets.iter().enumerate() {
            reader.seek(SeekFrom::Start(blob_base + offset))?;
            let len = reader
                .read_u16::<LittleEndian>()
                .map_err(|e| pool_read_error(e, "string length"))?;
            let mut bytes = vec![0u8; len as usize];
            reader
                .read_exact(&mut bytes)
                .map_err(|e| pool_read_error(e, "string data"))?;
            let s = String::from_utf8(bytes).map_err(|e| {
                MbxmlError::MalformedStringPool(format!("entry {} is not valid UTF-8: {}", i, e))
            })?;
            pool.push_decoded(s);
        }

        // Non-empty: count was checked above.
        let last = offsets[offsets.len() - 1];
        reader.seek(SeekFrom::Start(blob_base + last))?;
        let last_len = reader
            .read_u16::<LittleEndian>()
            .map_err(|e| pool_read_error(e, "last string length"))?;
        let blob_end = blob_base + last + 2 + last_len as u64;
        reader.seek(SeekFrom::Start(blob_end))?;

        debug!("Read string pool: {} strings, {} blob bytes", pool.len(), blob_end - blob_base);
        Ok(pool)
    }
}

fn pool_read_error(e: std::io::Error, context: &str) -> MbxmlError {
    match e.kind() {
        ErrorKind::UnexpectedEof => {
            MbxmlError::MalformedStringPool(format!("input ends inside the {}", context))
        }
        _ => MbxmlError::Io(e),
    }
}
