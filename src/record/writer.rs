//! Record Writer
//!
//! Appends framed records to a byte sink.

use std::io::Write;

use crate::error::{EclError, Result};
use crate::keyword::{BlockLayout, ElementType};

use super::{Endian, RECORD_OVERHEAD};

/// Writes length-framed records
pub struct RecordWriter<W: Write> {
    inner: W,
    endian: Endian,
    max_record_size: u32,
    /// Absolute offset of the next byte written
    position: u64,
}

impl<W: Write> RecordWriter<W> {
    /// Wrap a sink positioned at offset 0
    pub fn new(inner: W, endian: Endian, max_record_size: u32) -> Self {
        Self::with_offset(inner, endian, max_record_size, 0)
    }

    /// Wrap a sink that is already `offset` bytes into its file (append)
    pub fn with_offset(inner: W, endian: Endian, max_record_size: u32, offset: u64) -> Self {
        Self {
            inner,
            endian,
            max_record_size,
            position: offset,
        }
    }

    /// Byte order in use
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Offset of the next record
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Write one record: length, payload, length
    pub fn write_record(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() as u64 > self.max_record_size as u64 {
            return Err(EclError::ImplausibleLength {
                offset: self.position,
                length: payload.len() as u64,
                limit: self.max_record_size as u64,
            });
        }

        let marker = self.endian.encode_u32(payload.len() as u32);
        self.inner.write_all(&marker)?;
        self.inner.write_all(payload)?;
        self.inner.write_all(&marker)?;

        self.position += payload.len() as u64 + RECORD_OVERHEAD;
        Ok(())
    }

    /// Write the data records of one logical array.
    ///
    /// `payload` holds `count` elements already encoded in this writer's
    /// byte order; it is cut into records of at most the element type's
    /// cap.
    pub fn write_array(
        &mut self,
        element_type: ElementType,
        count: usize,
        payload: &[u8],
        layout: &BlockLayout,
    ) -> Result<()> {
        let width = element_type.width();
        if payload.len() != count * width {
            return Err(EclError::InvalidHeader {
                offset: self.position,
                reason: format!(
                    "{} array of {} elements needs {} bytes, got {}",
                    element_type,
                    count,
                    count * width,
                    payload.len()
                ),
            });
        }
        if count == 0 || width == 0 {
            return Ok(());
        }

        let mut start = 0;
        for elements in layout.blocks(element_type, count) {
            let end = start + elements * width;
            self.write_record(&payload[start..end])?;
            start = end;
        }
        Ok(())
    }

    /// Flush the underlying sink
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Get a mutable reference to the underlying sink
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Unwrap the underlying sink (not flushed)
    pub fn into_inner(self) -> W {
        self.inner
    }
}
