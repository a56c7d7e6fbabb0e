//! MBXM fixed header.
//!
//! ```text
//! [4 bytes] Magic "MBXM"
//! [1 byte ] Version
//! [3 bytes] Reserved (written as zero, ignored on read)
//! ```

use std::io::{ErrorKind, Read, Write};
use byteorder::{ReadBytesExt, WriteBytesExt};
use log::{trace, warn};

use crate::mbxml::types::error::{MbxmlError, Result};
use crate::mbxml::types::models::{FormatHeader, VersionPolicy, FORMAT_VERSION, MAGIC};

/// Writes the header for [`FORMAT_VERSION`].
pub fn write<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_u8(FORMAT_VERSION)?;
    writer.write_all(&[0u8; 3])?;
    Ok(())
}

/// Reads and validates the header.
///
/// Input shorter than the header, or with the wrong magic, is `InvalidFormat`.
/// The version byte is checked according to `policy`.
pub fn parse<R: Read>(reader: &mut R, policy: VersionPolicy) -> Result<FormatHeader> {
    let mut magic = [0u8; 4];
    read_or_invalid(reader, &mut magic)?;
    if &magic != MAGIC {
        return Err(MbxmlError::InvalidFormat(format!(
            "bad magic bytes {:02x?}, expected \"MBXM\"",
            magic
        )));
    }

    let version = match reader.read_u8() {
        Ok(v) => v,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            return Err(MbxmlError::InvalidFormat(
                "header truncated before version byte".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };
    let mut reserved = [0u8; 3];
    read_or_invalid(reader, &mut reserved)?;
    trace!("Header: version={}, reserved={:02x?}", version, reserved);

    if version != FORMAT_VERSION {
        match policy {
            VersionPolicy::Strict => return Err(MbxmlError::UnsupportedVersion(version)),
            VersionPolicy::Lenient => warn!(
                "Unknown MBXM version {} (expected {}), decoding anyway",
                version, FORMAT_VERSION
            ),
        }
    }

    Ok(FormatHeader { version })
}

fn read_or_invalid<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => {
            MbxmlError::InvalidFormat("input shorter than the 8-byte header".to_string())
        }
        _ => MbxmlError::Io(e),
    })
}
