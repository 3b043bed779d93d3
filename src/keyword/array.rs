//! Keyword
//!
//! A named, typed array and its binary encode/decode.

use std::io::{Read, Seek, Write};

use crate::error::{EclError, Result};
use crate::record::{RecordReader, RecordWriter};

use super::data::{is_char_value, CHAR_WIDTH};
use super::header::validate_name;
use super::{ArrayData, BlockLayout, ElementType, KeywordHeader, Tolerance};

/// A named array with a single element type
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    name: String,
    data: ArrayData,
}

impl Keyword {
    /// Create a keyword. Names must be 1-8 printable ASCII characters and
    /// CHAR values at most 8 Latin-1 characters (one byte each on disk).
    pub fn new(name: impl Into<String>, data: ArrayData) -> Result<Self> {
        let name = name.into().trim_end().to_string();
        validate_name(&name)?;

        if let ArrayData::Char(values) = &data {
            if let Some(bad) = values.iter().find(|v| !is_char_value(v)) {
                return Err(EclError::InvalidHeader {
                    offset: 0,
                    reason: format!(
                        "{}: CHAR value {:?} is not {} Latin-1 characters or fewer",
                        name, bad, CHAR_WIDTH
                    ),
                });
            }
        }

        Ok(Self { name, data })
    }

    /// A message keyword (no data)
    pub fn message(name: impl Into<String>) -> Result<Self> {
        Self::new(name, ArrayData::Message)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    /// Declared element count
    pub fn count(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn into_data(self) -> ArrayData {
        self.data
    }

    /// Header describing this keyword
    pub fn header(&self) -> KeywordHeader {
        KeywordHeader::new(self.name.clone(), self.element_type(), self.count())
    }

    // =========================================================================
    // Binary Codec
    // =========================================================================

    /// Read the header record and the data records of one keyword
    pub fn decode<R: Read + Seek>(reader: &mut RecordReader<R>, layout: &BlockLayout) -> Result<Self> {
        let offset = reader.position();
        let payload = reader.read_record()?;
        let header = KeywordHeader::decode(&payload, reader.endian(), offset)?;
        Self::decode_data(header, reader, layout)
    }

    /// Read the data records of a keyword whose header is already known
    pub fn decode_data<R: Read + Seek>(
        header: KeywordHeader,
        reader: &mut RecordReader<R>,
        layout: &BlockLayout,
    ) -> Result<Self> {
        let payload = reader.read_array(header.element_type, header.count, layout)?;
        let data = ArrayData::decode(header.element_type, header.count, &payload, reader.endian())?;
        Ok(Self {
            name: header.name,
            data,
        })
    }

    /// Write the header record then the data records
    pub fn encode<W: Write>(&self, writer: &mut RecordWriter<W>, layout: &BlockLayout) -> Result<()> {
        let header = self.header().encode(writer.endian())?;
        writer.write_record(&header)?;

        let payload = self.data.encode(writer.endian());
        writer.write_array(self.element_type(), self.count(), &payload, layout)
    }

    // =========================================================================
    // Typed Accessors
    // =========================================================================

    pub fn as_i32(&self) -> Result<&[i32]> {
        match &self.data {
            ArrayData::Int32(v) => Ok(v),
            _ => Err(self.mismatch("INTE")),
        }
    }

    pub fn as_f32(&self) -> Result<&[f32]> {
        match &self.data {
            ArrayData::Float32(v) => Ok(v),
            _ => Err(self.mismatch("REAL")),
        }
    }

    pub fn as_f64(&self) -> Result<&[f64]> {
        match &self.data {
            ArrayData::Float64(v) => Ok(v),
            _ => Err(self.mismatch("DOUB")),
        }
    }

    pub fn as_strings(&self) -> Result<&[String]> {
        match &self.data {
            ArrayData::Char(v) => Ok(v),
            _ => Err(self.mismatch("CHAR")),
        }
    }

    pub fn as_bools(&self) -> Result<&[bool]> {
        match &self.data {
            ArrayData::Bool(v) => Ok(v),
            _ => Err(self.mismatch("LOGI")),
        }
    }

    /// Widening read of any numeric keyword as doubles
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        match &self.data {
            ArrayData::Int32(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ArrayData::Float32(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ArrayData::Float64(v) => Ok(v.clone()),
            _ => Err(self.mismatch("numeric")),
        }
    }

    /// Widening read of an integer keyword as i64
    pub fn to_i64_vec(&self) -> Result<Vec<i64>> {
        match &self.data {
            ArrayData::Int32(v) => Ok(v.iter().map(|&x| x as i64).collect()),
            _ => Err(self.mismatch("INTE")),
        }
    }

    /// Explicitly lossy narrowing of any numeric keyword to f32
    pub fn to_f32_vec_lossy(&self) -> Result<Vec<f32>> {
        match &self.data {
            ArrayData::Int32(v) => Ok(v.iter().map(|&x| x as f32).collect()),
            ArrayData::Float32(v) => Ok(v.clone()),
            ArrayData::Float64(v) => Ok(v.iter().map(|&x| x as f32).collect()),
            _ => Err(self.mismatch("numeric")),
        }
    }

    /// One numeric element, widened to f64
    pub fn get_f64(&self, index: usize) -> Result<f64> {
        let value = match &self.data {
            ArrayData::Int32(v) => v.get(index).map(|&x| x as f64),
            ArrayData::Float32(v) => v.get(index).map(|&x| x as f64),
            ArrayData::Float64(v) => v.get(index).copied(),
            _ => return Err(self.mismatch("numeric")),
        };
        value.ok_or_else(|| EclError::ElementOutOfRange {
            name: self.name.clone(),
            index,
            count: self.count(),
        })
    }

    /// Multiply every numeric element in place
    pub fn scale(&mut self, factor: f64) -> Result<()> {
        match &mut self.data {
            ArrayData::Int32(v) => v.iter_mut().for_each(|x| *x = (*x as f64 * factor) as i32),
            ArrayData::Float32(v) => v.iter_mut().for_each(|x| *x = (*x as f64 * factor) as f32),
            ArrayData::Float64(v) => v.iter_mut().for_each(|x| *x *= factor),
            _ => return Err(self.mismatch("numeric")),
        }
        Ok(())
    }

    /// Add to every numeric element in place
    pub fn shift(&mut self, delta: f64) -> Result<()> {
        match &mut self.data {
            ArrayData::Int32(v) => v.iter_mut().for_each(|x| *x = (*x as f64 + delta) as i32),
            ArrayData::Float32(v) => v.iter_mut().for_each(|x| *x = (*x as f64 + delta) as f32),
            ArrayData::Float64(v) => v.iter_mut().for_each(|x| *x += delta),
            _ => return Err(self.mismatch("numeric")),
        }
        Ok(())
    }

    // =========================================================================
    // Comparison
    // =========================================================================

    /// Same name, type and count
    pub fn header_eq(&self, other: &Keyword) -> bool {
        self.name == other.name
            && self.element_type() == other.element_type()
            && self.count() == other.count()
    }

    /// Element-wise comparison; floating types use `tolerance`, all other
    /// types compare exactly
    pub fn approx_eq(&self, other: &Keyword, tolerance: Tolerance) -> bool {
        if !self.header_eq(other) {
            return false;
        }
        match (&self.data, &other.data) {
            (ArrayData::Float32(a), ArrayData::Float32(b)) => a
                .iter()
                .zip(b)
                .all(|(&x, &y)| tolerance.accepts(x as f64, y as f64)),
            (ArrayData::Float64(a), ArrayData::Float64(b)) => {
                a.iter().zip(b).all(|(&x, &y)| tolerance.accepts(x, y))
            }
            (a, b) => a == b,
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn mismatch(&self, requested: &str) -> EclError {
        if self.element_type() == ElementType::Message {
            EclError::EmptyType {
                name: self.name.clone(),
                element_type: ElementType::Message,
            }
        } else {
            EclError::TypeMismatch {
                name: self.name.clone(),
                stored: self.element_type(),
                requested: requested.to_string(),
            }
        }
    }
}
