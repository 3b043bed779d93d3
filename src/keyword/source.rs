//! Keyword sources and sinks
//!
//! The seam between the logical keyword model and a concrete codec. The
//! index builder and file views only talk to `KeywordSource`; binary and
//! formatted files each provide one.

use std::io::{Read, Seek, Write};

use crate::config::Config;
use crate::error::{EclError, Result};
use crate::record::{detect_endian, Endian, RecordReader, RecordWriter};

use super::header::HEADER_SIZE;
use super::{ArrayData, BlockLayout, FileFormat, Keyword, KeywordHeader};

/// Sequential + random access to the keywords of one stream
pub trait KeywordSource: Send {
    /// Codec of the underlying stream
    fn format(&self) -> FileFormat;

    /// Current absolute offset
    fn position(&self) -> u64;

    /// Stream length as of the last refresh
    fn stream_len(&self) -> u64;

    /// Re-read the stream length
    fn refresh_len(&mut self) -> Result<u64>;

    /// Move to an absolute offset (a header or data start)
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Read the next header; `None` at a clean end of stream. On success
    /// the cursor is at the start of the keyword's data.
    fn next_header(&mut self) -> Result<Option<KeywordHeader>>;

    /// Advance past the data of `header`
    fn skip_data(&mut self, header: &KeywordHeader) -> Result<()>;

    /// Read the data of `header` from the cursor
    fn read_data(&mut self, header: &KeywordHeader) -> Result<ArrayData>;

    /// Read selected elements of the keyword whose data starts at
    /// `data_offset`
    fn read_elements(
        &mut self,
        header: &KeywordHeader,
        data_offset: u64,
        indices: &[usize],
    ) -> Result<ArrayData> {
        self.seek(data_offset)?;
        let data = self.read_data(header)?;
        select_checked(&header.name, &data, indices)
    }

    /// Scan forward from `from` for the next plausible header and position
    /// the cursor on it. `None` when the rest of the stream holds none.
    fn resync(&mut self, _from: u64) -> Result<Option<u64>> {
        Ok(None)
    }
}

/// Appends keywords to a stream
pub trait KeywordSink: Send {
    fn write_keyword(&mut self, keyword: &Keyword) -> Result<()>;

    /// Offset of the next keyword
    fn position(&self) -> u64;

    fn flush(&mut self) -> Result<()>;
}

pub(crate) fn select_checked(name: &str, data: &ArrayData, indices: &[usize]) -> Result<ArrayData> {
    data.select(indices).ok_or_else(|| {
        let index = indices
            .iter()
            .copied()
            .find(|&i| i >= data.len())
            .unwrap_or_default();
        EclError::ElementOutOfRange {
            name: name.to_string(),
            index,
            count: data.len(),
        }
    })
}

// =============================================================================
// Binary
// =============================================================================

/// Window used when scanning for a header during salvage
const RESYNC_WINDOW: usize = 64 * 1024;

/// Head marker + header payload + tail marker
const FRAMED_HEADER_SIZE: usize = HEADER_SIZE + 8;

/// Keyword source over a record-framed binary stream
pub struct BinaryKeywordReader<R> {
    records: RecordReader<R>,
    layout: BlockLayout,
}

impl<R: Read + Seek> BinaryKeywordReader<R> {
    pub fn new(records: RecordReader<R>, layout: BlockLayout) -> Self {
        Self { records, layout }
    }

    /// Open a stream with the byte order, guard and layout from `config`
    pub fn open(mut inner: R, config: &Config) -> Result<Self> {
        let endian = match config.endian.fixed() {
            Some(endian) => endian,
            None => detect_endian(&mut inner, config.max_record_size)?,
        };
        let records = RecordReader::new(inner, endian, config.max_record_size)?;
        Ok(Self::new(records, config.layout))
    }

    pub fn endian(&self) -> Endian {
        self.records.endian()
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// The record layer underneath
    pub fn records(&mut self) -> &mut RecordReader<R> {
        &mut self.records
    }

    /// Read one whole keyword from the cursor
    pub fn read_keyword(&mut self) -> Result<Option<Keyword>> {
        if self.records.at_eof() {
            return Ok(None);
        }
        Keyword::decode(&mut self.records, &self.layout).map(Some)
    }

    fn is_framed_header(&self, window: &[u8]) -> bool {
        let endian = self.records.endian();
        let head = endian.decode_u32([window[0], window[1], window[2], window[3]]);
        let tail_at = FRAMED_HEADER_SIZE - 4;
        let tail = endian.decode_u32([
            window[tail_at],
            window[tail_at + 1],
            window[tail_at + 2],
            window[tail_at + 3],
        ]);
        head as usize == HEADER_SIZE
            && tail as usize == HEADER_SIZE
            && KeywordHeader::is_plausible(&window[4..4 + HEADER_SIZE])
    }
}

impl<R: Read + Seek + Send> KeywordSource for BinaryKeywordReader<R> {
    fn format(&self) -> FileFormat {
        FileFormat::Binary
    }

    fn position(&self) -> u64 {
        self.records.position()
    }

    fn stream_len(&self) -> u64 {
        self.records.len()
    }

    fn refresh_len(&mut self) -> Result<u64> {
        self.records.refresh_len()
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        self.records.seek(offset)
    }

    fn next_header(&mut self) -> Result<Option<KeywordHeader>> {
        if self.records.at_eof() {
            return Ok(None);
        }
        let offset = self.records.position();
        let payload = self.records.read_record()?;
        KeywordHeader::decode(&payload, self.records.endian(), offset).map(Some)
    }

    fn skip_data(&mut self, header: &KeywordHeader) -> Result<()> {
        self.records
            .skip_array(header.element_type, header.count, &self.layout)
    }

    fn read_data(&mut self, header: &KeywordHeader) -> Result<ArrayData> {
        let payload = self
            .records
            .read_array(header.element_type, header.count, &self.layout)?;
        ArrayData::decode(
            header.element_type,
            header.count,
            &payload,
            self.records.endian(),
        )
    }

    /// Seeks straight to each element's record instead of reading the
    /// whole array
    fn read_elements(
        &mut self,
        header: &KeywordHeader,
        data_offset: u64,
        indices: &[usize],
    ) -> Result<ArrayData> {
        let element_type = header.element_type;
        let width = element_type.width();
        let cap = self.layout.cap(element_type);

        let mut payload = Vec::with_capacity(indices.len() * width);
        let mut element = vec![0u8; width];
        for &index in indices {
            if index >= header.count {
                return Err(EclError::ElementOutOfRange {
                    name: header.name.clone(),
                    index,
                    count: header.count,
                });
            }

            let (block, block_start, within) = self.layout.locate(element_type, index);
            let record_offset = data_offset + block_start;
            self.records.seek(record_offset)?;

            let length = self.records.begin_record()? as usize;
            let expected = (header.count - block * cap).min(cap) * width;
            if length != expected {
                return Err(EclError::InvalidHeader {
                    offset: record_offset,
                    reason: format!(
                        "{} data record holds {} bytes, expected {}",
                        header.name, length, expected
                    ),
                });
            }

            self.records.skip_partial(within)?;
            self.records.read_partial(&mut element)?;
            self.records.finish_record()?;
            payload.extend_from_slice(&element);
        }

        ArrayData::decode(element_type, indices.len(), &payload, self.records.endian())
    }

    fn resync(&mut self, from: u64) -> Result<Option<u64>> {
        let len = self.records.len();
        let mut window = vec![0u8; RESYNC_WINDOW];
        let mut start = from;

        while start + FRAMED_HEADER_SIZE as u64 <= len {
            let n = self.records.read_raw_at(start, &mut window)?;
            if n < FRAMED_HEADER_SIZE {
                break;
            }
            for i in 0..=(n - FRAMED_HEADER_SIZE) {
                if self.is_framed_header(&window[i..i + FRAMED_HEADER_SIZE]) {
                    let found = start + i as u64;
                    self.records.seek(found)?;
                    return Ok(Some(found));
                }
            }
            start += (n - FRAMED_HEADER_SIZE + 1) as u64;
        }

        self.records.seek(len)?;
        Ok(None)
    }
}

/// Keyword sink over a record-framed binary stream
pub struct BinaryKeywordWriter<W: Write> {
    records: RecordWriter<W>,
    layout: BlockLayout,
}

impl<W: Write> BinaryKeywordWriter<W> {
    pub fn new(records: RecordWriter<W>, layout: BlockLayout) -> Self {
        Self { records, layout }
    }

    /// Writer for a fresh stream, or an append at `offset`
    pub fn with_config(inner: W, config: &Config, endian: Endian, offset: u64) -> Self {
        let records = RecordWriter::with_offset(inner, endian, config.max_record_size, offset);
        Self::new(records, config.layout)
    }

    /// The record layer underneath
    pub fn records(&mut self) -> &mut RecordWriter<W> {
        &mut self.records
    }

    pub fn into_inner(self) -> W {
        self.records.into_inner()
    }
}

impl<W: Write + Send> KeywordSink for BinaryKeywordWriter<W> {
    fn write_keyword(&mut self, keyword: &Keyword) -> Result<()> {
        keyword.encode(&mut self.records, &self.layout)
    }

    fn position(&self) -> u64 {
        self.records.position()
    }

    fn flush(&mut self) -> Result<()> {
        self.records.flush()
    }
}
