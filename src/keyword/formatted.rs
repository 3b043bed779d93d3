//! Formatted codec
//!
//! The human-readable variant of the keyword format. Same logical model,
//! no record framing:
//!
//! ```text
//!  'PRESSURE'           3 'REAL'
//!    0.10000000E+01   0.20000000E+01   0.30000000E+01
//! ```
//!
//! Data is written in blocks of the layout cap; each block is split into
//! lines of a fixed number of values per element type, and a block always
//! ends with a newline.

use std::io::{BufRead, Seek, SeekFrom, Write};

use crate::error::{EclError, Result};

use super::data::{latin1_decode, latin1_encode, CHAR_WIDTH};
use super::source::{KeywordSink, KeywordSource};
use super::{ArrayData, BlockLayout, ElementType, FileFormat, Keyword, KeywordHeader};

// =============================================================================
// Number Formatting
// =============================================================================

/// Split `x` into a mantissa in `[0.1, 1)` and a power of ten
fn scientific(x: f64) -> (f64, i32) {
    if x == 0.0 {
        return (0.0, 0);
    }
    let mut power = x.abs().log10().ceil();
    let mut mantissa = x / 10f64.powf(power);
    if mantissa.abs() >= 1.0 {
        mantissa *= 0.1;
        power += 1.0;
    }
    (mantissa, power as i32)
}

fn format_real(x: f32) -> String {
    let x = x as f64;
    if !x.is_finite() {
        return format!("  {:>14}", x);
    }
    let (mantissa, power) = scientific(x);
    format!("  {:11.8}E{:+03}", mantissa, power)
}

fn format_double(x: f64) -> String {
    if !x.is_finite() {
        return format!("  {:>20}", x);
    }
    let (mantissa, power) = scientific(x);
    format!("  {:17.14}D{:+03}", mantissa, power)
}

fn format_header(header: &KeywordHeader) -> String {
    format!(
        " '{:<8}' {:>11} '{:<4}'\n",
        header.name,
        header.count,
        header.element_type.tag()
    )
}

// =============================================================================
// Writer
// =============================================================================

/// Keyword sink producing formatted text
pub struct FormattedKeywordWriter<W: Write> {
    inner: W,
    layout: BlockLayout,
    position: u64,
}

impl<W: Write> FormattedKeywordWriter<W> {
    pub fn new(inner: W, layout: BlockLayout) -> Self {
        Self::with_offset(inner, layout, 0)
    }

    /// Writer appending to a stream already `offset` bytes long
    pub fn with_offset(inner: W, layout: BlockLayout, offset: u64) -> Self {
        Self {
            inner,
            layout,
            position: offset,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Text goes out as Latin-1 so CHAR values keep one byte per character
    fn emit(&mut self, text: &str) -> Result<()> {
        let bytes = latin1_encode(text);
        self.inner.write_all(&bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    fn format_value(data: &ArrayData, index: usize) -> String {
        match data {
            ArrayData::Int32(v) => format!(" {:>11}", v[index]),
            ArrayData::Float32(v) => format_real(v[index]),
            ArrayData::Float64(v) => format_double(v[index]),
            ArrayData::Char(v) => format!(" '{:<8}'", v[index]),
            ArrayData::Bool(v) => format!("  {}", if v[index] { 'T' } else { 'F' }),
            ArrayData::Message => String::new(),
        }
    }
}

impl<W: Write + Send> KeywordSink for FormattedKeywordWriter<W> {
    fn write_keyword(&mut self, keyword: &Keyword) -> Result<()> {
        let header = keyword.header();
        super::header::validate_name(&header.name)?;
        self.emit(&format_header(&header))?;

        let element_type = header.element_type;
        let columns = element_type.formatted_columns();
        let cap = self.layout.cap(element_type);
        let data = keyword.data();

        let mut block_start = 0;
        for block_len in self.layout.blocks(element_type, header.count) {
            let mut line_start = 0;
            while line_start < block_len {
                let line_len = columns.min(block_len - line_start);
                let mut line = String::new();
                for col in 0..line_len {
                    line.push_str(&Self::format_value(data, block_start + line_start + col));
                }
                line.push('\n');
                self.emit(&line)?;
                line_start += line_len;
            }
            block_start += cap;
        }
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Keyword source over formatted text
///
/// Skipping data means parsing it: the text has no length prefix.
pub struct FormattedKeywordReader<R> {
    inner: R,
    position: u64,
    len: u64,
}

impl<R: BufRead + Seek + Send> FormattedKeywordReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            position: 0,
            len,
        })
    }

    /// Read one whole keyword from the cursor
    pub fn read_keyword(&mut self) -> Result<Option<Keyword>> {
        let header = match self.next_header()? {
            Some(header) => header,
            None => return Ok(None),
        };
        let data = self.read_data(&header)?;
        Keyword::new(header.name, data).map(Some)
    }

    // -------------------------------------------------------------------------
    // Tokenizer
    // -------------------------------------------------------------------------

    fn peek(&mut self) -> Result<Option<u8>> {
        let buf = self.inner.fill_buf()?;
        Ok(buf.first().copied())
    }

    fn bump(&mut self) {
        self.inner.consume(1);
        self.position += 1;
    }

    fn skip_whitespace(&mut self) -> Result<()> {
        while let Some(b) = self.peek()? {
            if !b.is_ascii_whitespace() {
                break;
            }
            self.bump();
        }
        Ok(())
    }

    /// Consume blanks up to and including the end of the current line
    fn skip_line_end(&mut self) -> Result<()> {
        while let Some(b) = self.peek()? {
            if b == b'\n' {
                self.bump();
                break;
            }
            if !b.is_ascii_whitespace() {
                return Err(self.error(format!("unexpected {:?} after header", b as char)));
            }
            self.bump();
        }
        Ok(())
    }

    fn read_quoted(&mut self) -> Result<String> {
        self.skip_whitespace()?;
        match self.peek()? {
            Some(b'\'') => self.bump(),
            Some(b) => return Err(self.error(format!("expected quote, found {:?}", b as char))),
            None => return Err(self.error("unexpected end of file".to_string())),
        }

        let mut raw = Vec::new();
        loop {
            match self.peek()? {
                Some(b'\'') => {
                    self.bump();
                    break;
                }
                Some(b'\n') | None => {
                    return Err(self.error("unterminated quoted string".to_string()));
                }
                Some(b) => {
                    raw.push(b);
                    self.bump();
                }
            }
        }
        Ok(latin1_decode(&raw))
    }

    fn read_token(&mut self) -> Result<String> {
        self.skip_whitespace()?;
        let mut raw = Vec::new();
        while let Some(b) = self.peek()? {
            if b.is_ascii_whitespace() {
                break;
            }
            raw.push(b);
            self.bump();
        }
        if raw.is_empty() {
            return Err(self.error("unexpected end of file".to_string()));
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    fn parse_token<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        let offset = self.position;
        let token = self.read_token()?;
        let normalized = token.replace(|c| c == 'D' || c == 'd', "E");
        normalized.parse().map_err(|_| EclError::Format {
            offset,
            message: format!("invalid {} value {:?}", what, token),
        })
    }

    fn error(&self, message: String) -> EclError {
        EclError::Format {
            offset: self.position,
            message,
        }
    }
}

impl<R: BufRead + Seek + Send> KeywordSource for FormattedKeywordReader<R> {
    fn format(&self) -> FileFormat {
        FileFormat::Formatted
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn stream_len(&self) -> u64 {
        self.len
    }

    fn refresh_len(&mut self) -> Result<u64> {
        self.len = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(self.position))?;
        Ok(self.len)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.position = offset;
        Ok(())
    }

    fn next_header(&mut self) -> Result<Option<KeywordHeader>> {
        self.skip_whitespace()?;
        if self.peek()?.is_none() {
            return Ok(None);
        }

        let offset = self.position;
        let name = self.read_quoted()?.trim_end().to_string();
        let count: i64 = self.parse_token("count")?;
        let tag = self.read_quoted()?;
        self.skip_line_end()?;

        let element_type =
            ElementType::from_tag(tag.as_bytes()).ok_or(EclError::InvalidTypeTag { tag, offset })?;
        if count < 0 || count > i32::MAX as i64 {
            return Err(EclError::InvalidHeader {
                offset,
                reason: format!("{}: element count {} outside 0..={}", name, count, i32::MAX),
            });
        }
        let count = if element_type == ElementType::Message {
            0
        } else {
            count as usize
        };

        Ok(Some(KeywordHeader::new(name, element_type, count)))
    }

    fn skip_data(&mut self, header: &KeywordHeader) -> Result<()> {
        self.read_data(header).map(|_| ())
    }

    fn read_data(&mut self, header: &KeywordHeader) -> Result<ArrayData> {
        let count = header.count;
        // every value takes at least one byte of text
        let available = self.len.saturating_sub(self.position);
        if count as u64 > available {
            return Err(EclError::Truncated {
                offset: self.position,
                expected: count as u64,
                available,
            });
        }
        Ok(match header.element_type {
            ElementType::Int32 => ArrayData::Int32(
                (0..count)
                    .map(|_| self.parse_token("INTE"))
                    .collect::<Result<_>>()?,
            ),
            ElementType::Float32 => ArrayData::Float32(
                (0..count)
                    .map(|_| self.parse_token("REAL"))
                    .collect::<Result<_>>()?,
            ),
            ElementType::Float64 => ArrayData::Float64(
                (0..count)
                    .map(|_| self.parse_token("DOUB"))
                    .collect::<Result<_>>()?,
            ),
            ElementType::Bool => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    let offset = self.position;
                    let token = self.read_token()?;
                    values.push(match token.as_str() {
                        "T" => true,
                        "F" => false,
                        _ => {
                            return Err(EclError::Format {
                                offset,
                                message: format!("invalid LOGI value {:?}", token),
                            })
                        }
                    });
                }
                ArrayData::Bool(values)
            }
            ElementType::Char => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    let raw = self.read_quoted()?;
                    let value: String = raw.chars().take(CHAR_WIDTH).collect();
                    values.push(value.trim_end().to_string());
                }
                ArrayData::Char(values)
            }
            ElementType::Message => ArrayData::Message,
        })
    }
}
