//! Byte order detection
//!
//! Guesses a file's byte order from its first record: a length that is
//! within the guard, fits in the file, and is repeated by the tail marker
//! is plausible. Big-endian wins when both orders pass.

use std::io::{Read, Seek, SeekFrom};

use crate::error::Result;

use super::{Endian, RECORD_OVERHEAD};

/// Detect the byte order of a record-framed stream.
///
/// The stream position is restored to 0. Empty streams and streams where
/// neither order is plausible report `Endian::Big`, the ECLIPSE default;
/// reading will then fail with a framing error at the first record.
pub fn detect_endian<R: Read + Seek>(inner: &mut R, max_record_size: u32) -> Result<Endian> {
    let len = inner.seek(SeekFrom::End(0))?;
    inner.seek(SeekFrom::Start(0))?;

    if len < RECORD_OVERHEAD {
        return Ok(Endian::Big);
    }

    let mut head = [0u8; 4];
    inner.read_exact(&mut head)?;

    let mut detected = None;
    for endian in [Endian::Big, Endian::Little] {
        let length = endian.decode_u32(head);
        if length > max_record_size || length as u64 + RECORD_OVERHEAD > len {
            continue;
        }

        inner.seek(SeekFrom::Start(4 + length as u64))?;
        let mut tail = [0u8; 4];
        inner.read_exact(&mut tail)?;
        if endian.decode_u32(tail) == length {
            detected = Some(endian);
            break;
        }
    }

    inner.seek(SeekFrom::Start(0))?;
    match detected {
        Some(endian) => {
            tracing::debug!("Detected {} record framing", endian);
            Ok(endian)
        }
        None => {
            tracing::warn!("No plausible first record in either byte order, assuming big-endian");
            Ok(Endian::Big)
        }
    }
}
