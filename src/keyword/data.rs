//! Array data
//!
//! Decoded keyword payloads, one variant per element type.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{EclError, Result};
use crate::record::Endian;

use super::ElementType;

/// Width of a CHAR element
pub const CHAR_WIDTH: usize = 8;

/// On-disk value of a true LOGI element
pub const LOGI_TRUE: i32 = -1;

/// Decoded, homogeneous array payload
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    /// Trailing padding removed; each value at most 8 bytes
    Char(Vec<String>),
    Bool(Vec<bool>),
    /// Message keywords carry no data
    Message,
}

impl ArrayData {
    /// Element type of this payload
    pub fn element_type(&self) -> ElementType {
        match self {
            ArrayData::Int32(_) => ElementType::Int32,
            ArrayData::Float32(_) => ElementType::Float32,
            ArrayData::Float64(_) => ElementType::Float64,
            ArrayData::Char(_) => ElementType::Char,
            ArrayData::Bool(_) => ElementType::Bool,
            ArrayData::Message => ElementType::Message,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Int32(v) => v.len(),
            ArrayData::Float32(v) => v.len(),
            ArrayData::Float64(v) => v.len(),
            ArrayData::Char(v) => v.len(),
            ArrayData::Bool(v) => v.len(),
            ArrayData::Message => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An empty payload of the given type
    pub fn empty(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Int32 => ArrayData::Int32(Vec::new()),
            ElementType::Float32 => ArrayData::Float32(Vec::new()),
            ElementType::Float64 => ArrayData::Float64(Vec::new()),
            ElementType::Char => ArrayData::Char(Vec::new()),
            ElementType::Bool => ArrayData::Bool(Vec::new()),
            ElementType::Message => ArrayData::Message,
        }
    }

    /// Keep only the elements at `indices`, in the order given
    pub fn select(&self, indices: &[usize]) -> Option<Self> {
        fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Option<Vec<T>> {
            indices.iter().map(|&i| values.get(i).cloned()).collect()
        }

        Some(match self {
            ArrayData::Int32(v) => ArrayData::Int32(pick(v, indices)?),
            ArrayData::Float32(v) => ArrayData::Float32(pick(v, indices)?),
            ArrayData::Float64(v) => ArrayData::Float64(pick(v, indices)?),
            ArrayData::Char(v) => ArrayData::Char(pick(v, indices)?),
            ArrayData::Bool(v) => ArrayData::Bool(pick(v, indices)?),
            ArrayData::Message => {
                if !indices.is_empty() {
                    return None;
                }
                ArrayData::Message
            }
        })
    }

    // =========================================================================
    // Binary Payload Codec
    // =========================================================================

    /// Decode `count` elements from a joined data payload
    pub fn decode(
        element_type: ElementType,
        count: usize,
        mut payload: &[u8],
        endian: Endian,
    ) -> Result<Self> {
        let expected = count * element_type.width();
        if payload.len() != expected {
            return Err(EclError::LengthMismatch {
                expected,
                actual: payload.len(),
            });
        }

        let buf = &mut payload;
        Ok(match element_type {
            ElementType::Int32 => {
                ArrayData::Int32((0..count).map(|_| endian.get_i32(buf)).collect())
            }
            ElementType::Float32 => {
                ArrayData::Float32((0..count).map(|_| endian.get_f32(buf)).collect())
            }
            ElementType::Float64 => {
                ArrayData::Float64((0..count).map(|_| endian.get_f64(buf)).collect())
            }
            ElementType::Bool => {
                ArrayData::Bool((0..count).map(|_| endian.get_i32(buf) != 0).collect())
            }
            ElementType::Char => {
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    let raw = &buf.chunk()[..CHAR_WIDTH];
                    values.push(latin1_decode(raw).trim_end().to_string());
                    buf.advance(CHAR_WIDTH);
                }
                ArrayData::Char(values)
            }
            ElementType::Message => ArrayData::Message,
        })
    }

    /// Encode the elements into a contiguous payload
    pub fn encode(&self, endian: Endian) -> BytesMut {
        let element_type = self.element_type();
        let mut buf = BytesMut::with_capacity(self.len() * element_type.width());
        match self {
            ArrayData::Int32(v) => v.iter().for_each(|&x| endian.put_i32(&mut buf, x)),
            ArrayData::Float32(v) => v.iter().for_each(|&x| endian.put_f32(&mut buf, x)),
            ArrayData::Float64(v) => v.iter().for_each(|&x| endian.put_f64(&mut buf, x)),
            ArrayData::Bool(v) => v
                .iter()
                .for_each(|&x| endian.put_i32(&mut buf, if x { LOGI_TRUE } else { 0 })),
            ArrayData::Char(v) => {
                for s in v {
                    buf.put_slice(&pad8(s));
                }
            }
            ArrayData::Message => {}
        }
        buf
    }
}

/// Space-pad (or cut) a string to exactly 8 bytes
pub(crate) fn pad8(s: &str) -> [u8; CHAR_WIDTH] {
    let mut out = [b' '; CHAR_WIDTH];
    for (slot, byte) in out.iter_mut().zip(latin1_encode(s)) {
        *slot = byte;
    }
    out
}

/// CHAR bytes are Latin-1: every byte maps to the code point of the same
/// value, so any 8 bytes on disk survive a decode/encode cycle.
pub(crate) fn latin1_decode(raw: &[u8]) -> String {
    raw.iter().map(|&b| b as char).collect()
}

/// Inverse of `latin1_decode`. Code points above U+00FF become `?`.
pub(crate) fn latin1_encode(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Fits one CHAR element: at most 8 characters, all within Latin-1
pub(crate) fn is_char_value(s: &str) -> bool {
    s.chars().count() <= CHAR_WIDTH && s.chars().all(|c| u32::from(c) <= 0xFF)
}
