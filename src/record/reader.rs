//! Record Reader
//!
//! Reads framed records from any seekable byte stream.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use bytes::{Bytes, BytesMut};

use crate::error::{EclError, Result};
use crate::keyword::{BlockLayout, ElementType};

use super::{Endian, MARKER_SIZE, RECORD_OVERHEAD};

/// A record whose head marker has been read but whose tail has not
#[derive(Debug, Clone, Copy)]
struct OpenRecord {
    /// Offset of the head marker
    start: u64,
    /// Declared payload length
    length: u32,
    /// Payload bytes not yet consumed
    remaining: u32,
}

/// Reads length-framed records
///
/// The reader tracks its own cursor and the stream length so that every
/// declared length can be checked against the bytes actually present
/// before anything is allocated.
pub struct RecordReader<R> {
    inner: R,
    endian: Endian,
    max_record_size: u32,
    /// Current cursor (absolute byte offset)
    position: u64,
    /// Stream length observed at open / last refresh
    len: u64,
    /// Record currently being read piecewise
    open: Option<OpenRecord>,
}

impl<R: Read + Seek> RecordReader<R> {
    /// Wrap a stream, positioned at its start
    pub fn new(mut inner: R, endian: Endian, max_record_size: u32) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            endian,
            max_record_size,
            position: 0,
            len,
            open: None,
        })
    }

    /// Byte order in use
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Current absolute offset
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Stream length as of the last refresh
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True when the stream holds no bytes at all
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when the cursor sits at (or past) the end of the stream
    pub fn at_eof(&self) -> bool {
        self.position >= self.len
    }

    /// Re-read the stream length (the file may have grown)
    pub fn refresh_len(&mut self) -> Result<u64> {
        self.len = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(self.position))?;
        Ok(self.len)
    }

    /// Move the cursor to an absolute offset, abandoning any open record
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.position = offset;
        self.open = None;
        Ok(())
    }

    /// Get a reference to the underlying stream
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap the underlying stream
    pub fn into_inner(self) -> R {
        self.inner
    }

    // =========================================================================
    // Whole Records
    // =========================================================================

    /// Read one record and return its payload
    pub fn read_record(&mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.read_record_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Read one record, appending its payload to `buf`.
    /// Returns the payload length.
    pub fn read_record_into(&mut self, buf: &mut BytesMut) -> Result<usize> {
        let length = self.begin_record()? as usize;
        let start = buf.len();
        buf.resize(start + length, 0);
        self.read_exact_tracked(&mut buf[start..], length as u64)?;
        if let Some(open) = self.open.as_mut() {
            open.remaining = 0;
        }
        self.finish_record()?;
        Ok(length)
    }

    /// Advance past one record without reading its payload.
    /// Returns the payload length.
    pub fn skip_record(&mut self) -> Result<u32> {
        let length = self.begin_record()?;
        self.finish_record()?;
        Ok(length)
    }

    // =========================================================================
    // Piecewise Records
    // =========================================================================

    /// Read and validate a head marker, leaving the record open for
    /// `read_partial` / `skip_partial`. Returns the payload length.
    pub fn begin_record(&mut self) -> Result<u32> {
        if self.open.is_some() {
            self.finish_record()?;
        }

        let start = self.position;
        let available = self.len.saturating_sub(start);
        if available < MARKER_SIZE {
            return Err(EclError::Truncated {
                offset: start,
                expected: MARKER_SIZE,
                available,
            });
        }

        let mut marker = [0u8; 4];
        self.read_exact_tracked(&mut marker, MARKER_SIZE)?;
        let length = self.endian.decode_u32(marker);

        if length > self.max_record_size {
            return Err(EclError::ImplausibleLength {
                offset: start,
                length: length as u64,
                limit: self.max_record_size as u64,
            });
        }

        let needed = length as u64 + RECORD_OVERHEAD;
        if available < needed {
            return Err(EclError::Truncated {
                offset: start,
                expected: needed,
                available,
            });
        }

        self.open = Some(OpenRecord {
            start,
            length,
            remaining: length,
        });
        Ok(length)
    }

    /// Payload bytes left in the open record (0 when none is open)
    pub fn remaining_in_record(&self) -> u32 {
        self.open.map(|r| r.remaining).unwrap_or(0)
    }

    /// Read up to `buf.len()` payload bytes from the open record
    pub fn read_partial(&mut self, buf: &mut [u8]) -> Result<usize> {
        let open = self.require_open()?;
        let n = buf.len().min(open.remaining as usize);
        self.read_exact_tracked(&mut buf[..n], n as u64)?;
        if let Some(open) = self.open.as_mut() {
            open.remaining -= n as u32;
        }
        Ok(n)
    }

    /// Skip `n` payload bytes of the open record
    pub fn skip_partial(&mut self, n: u32) -> Result<()> {
        let open = self.require_open()?;
        if n > open.remaining {
            return Err(EclError::Truncated {
                offset: self.position,
                expected: n as u64,
                available: open.remaining as u64,
            });
        }
        let target = self.position + n as u64;
        self.inner.seek(SeekFrom::Start(target))?;
        self.position = target;
        if let Some(open) = self.open.as_mut() {
            open.remaining -= n;
        }
        Ok(())
    }

    /// Skip whatever remains of the open record and validate its tail
    pub fn finish_record(&mut self) -> Result<()> {
        let open = self.require_open()?;
        self.open = None;

        let tail_offset = open.start + MARKER_SIZE + open.length as u64;
        if self.position != tail_offset {
            self.inner.seek(SeekFrom::Start(tail_offset))?;
            self.position = tail_offset;
        }

        let mut marker = [0u8; 4];
        self.read_exact_tracked(&mut marker, MARKER_SIZE)?;
        let tail = self.endian.decode_u32(marker);
        if tail != open.length {
            return Err(EclError::Framing {
                offset: open.start,
                head: open.length,
                tail,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Arrays
    // =========================================================================

    /// Read the data records of one logical array and join them.
    ///
    /// The number of physical records and the size of each is computed
    /// from `count` and the element type's cap in `layout`; every record
    /// must match exactly.
    pub fn read_array(
        &mut self,
        element_type: ElementType,
        count: usize,
        layout: &BlockLayout,
    ) -> Result<Bytes> {
        let width = element_type.width();
        if count == 0 || width == 0 {
            return Ok(Bytes::new());
        }

        // a damaged count must not drive the allocation
        let payload = count as u64 * width as u64;
        let available = self.len.saturating_sub(self.position);
        if payload > available {
            return Err(EclError::Truncated {
                offset: self.position,
                expected: layout.data_size_on_disk(element_type, count),
                available,
            });
        }

        let mut buf = BytesMut::with_capacity(payload as usize);
        for elements in layout.blocks(element_type, count) {
            let offset = self.position;
            let length = self.read_record_into(&mut buf)?;
            let expected = elements * width;
            if length != expected {
                return Err(EclError::InvalidHeader {
                    offset,
                    reason: format!(
                        "{} data record holds {} bytes, expected {}",
                        element_type, length, expected
                    ),
                });
            }
        }
        Ok(buf.freeze())
    }

    /// Skip the data records of one logical array
    pub fn skip_array(
        &mut self,
        element_type: ElementType,
        count: usize,
        layout: &BlockLayout,
    ) -> Result<()> {
        let width = element_type.width();
        if count == 0 || width == 0 {
            return Ok(());
        }

        for elements in layout.blocks(element_type, count) {
            let offset = self.position;
            let length = self.skip_record()? as usize;
            if length != elements * width {
                return Err(EclError::InvalidHeader {
                    offset,
                    reason: format!(
                        "{} data record holds {} bytes, expected {}",
                        element_type,
                        length,
                        elements * width
                    ),
                });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Raw Access
    // =========================================================================

    /// Read raw bytes at an absolute offset, ignoring framing.
    /// Returns the number of bytes read (short at end of stream).
    /// The cursor is left after the bytes read.
    pub fn read_raw_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.seek(offset)?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn require_open(&self) -> Result<OpenRecord> {
        self.open.ok_or_else(|| EclError::InvalidHeader {
            offset: self.position,
            reason: "no record is open".to_string(),
        })
    }

    /// `read_exact` that keeps `position` in sync and maps a short read
    /// onto a truncation error
    fn read_exact_tracked(&mut self, buf: &mut [u8], expected: u64) -> Result<()> {
        let offset = self.position;
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.position += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(EclError::Truncated {
                offset,
                expected,
                available: self.len.saturating_sub(offset),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
