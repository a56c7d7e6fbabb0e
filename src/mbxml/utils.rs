//! Index and count conversions between wire integers and in-memory values.

use crate::mbxml::types::error::{MbxmlError, Result};
use crate::mbxml::types::models::NONE_INDEX;

/// Converts a collection length into an i32 count field.
pub fn count_to_i32(count: usize, item_type: &'static str) -> Result<i32> {
    i32::try_from(count).map_err(|_| MbxmlError::TooManyEntries { item_type, count })
}

/// Converts an in-memory index into an i32 wire index.
pub fn index_to_i32(index: u32, item_type: &'static str) -> Result<i32> {
    i32::try_from(index).map_err(|_| MbxmlError::TooManyEntries {
        item_type,
        count: index as usize,
    })
}

/// Same as [`index_to_i32`] with `None` written as the -1 sentinel.
pub fn optional_index_to_i32(index: Option<u32>, item_type: &'static str) -> Result<i32> {
    index.map_or(Ok(NONE_INDEX), |i| index_to_i32(i, item_type))
}

/// Reads a mandatory wire index. Any negative value is out of range.
pub fn wire_index(raw: i32, kind: &'static str, len: usize) -> Result<u32> {
    u32::try_from(raw).map_err(|_| MbxmlError::IndexOutOfRange {
        kind,
        index: raw as i64,
        len,
    })
}

/// Reads an optional wire index: -1 is `None`, other negatives are out of range.
pub fn optional_wire_index(raw: i32, kind: &'static str, len: usize) -> Result<Option<u32>> {
    if raw == NONE_INDEX {
        Ok(None)
    } else {
        wire_index(raw, kind, len).map(Some)
    }
}
