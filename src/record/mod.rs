//! Record Module
//!
//! The physical framing layer of Fortran unformatted sequential files.
//!
//! ## Responsibilities
//! - Read/write length-framed records with head/tail integrity checks
//! - Apply the file's byte order to lengths and payload numbers
//! - Guard against implausible declared lengths
//! - Skip records without reading their payload
//! - Split large arrays into bounded physical records and join them back
//!
//! ## Record Format
//! ```text
//! ┌───────────┬──────────────────────────────┬───────────┐
//! │ Len (4)   │  Payload (Len bytes)         │ Len (4)   │
//! └───────────┴──────────────────────────────┴───────────┘
//! ```
//!
//! A logical array of `count` elements is stored as
//! `ceil(count / cap)` consecutive records, where `cap` is the
//! elements-per-record limit of its element type. Only the last record
//! may be short. There is no continuation flag; the split is implied by
//! `count` and the element type from the preceding header record.

mod detect;
mod reader;
mod writer;

pub use detect::detect_endian;
pub use reader::RecordReader;
pub use writer::RecordWriter;

use bytes::{Buf, BufMut};

/// Bytes of framing around every record: head length + tail length
pub const RECORD_OVERHEAD: u64 = 8;

/// Size of one length marker
pub const MARKER_SIZE: u64 = 4;

/// Byte order of a file's framing and numeric payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    /// Decode a length marker
    pub fn decode_u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endian::Big => u32::from_be_bytes(bytes),
            Endian::Little => u32::from_le_bytes(bytes),
        }
    }

    /// Encode a length marker
    pub fn encode_u32(self, value: u32) -> [u8; 4] {
        match self {
            Endian::Big => value.to_be_bytes(),
            Endian::Little => value.to_le_bytes(),
        }
    }

    pub fn get_i32(self, buf: &mut impl Buf) -> i32 {
        match self {
            Endian::Big => buf.get_i32(),
            Endian::Little => buf.get_i32_le(),
        }
    }

    pub fn get_f32(self, buf: &mut impl Buf) -> f32 {
        match self {
            Endian::Big => buf.get_f32(),
            Endian::Little => buf.get_f32_le(),
        }
    }

    pub fn get_f64(self, buf: &mut impl Buf) -> f64 {
        match self {
            Endian::Big => buf.get_f64(),
            Endian::Little => buf.get_f64_le(),
        }
    }

    pub fn put_i32(self, buf: &mut impl BufMut, value: i32) {
        match self {
            Endian::Big => buf.put_i32(value),
            Endian::Little => buf.put_i32_le(value),
        }
    }

    pub fn put_f32(self, buf: &mut impl BufMut, value: f32) {
        match self {
            Endian::Big => buf.put_f32(value),
            Endian::Little => buf.put_f32_le(value),
        }
    }

    pub fn put_f64(self, buf: &mut impl BufMut, value: f64) {
        match self {
            Endian::Big => buf.put_f64(value),
            Endian::Little => buf.put_f64_le(value),
        }
    }
}

impl std::fmt::Display for Endian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endian::Big => write!(f, "big-endian"),
            Endian::Little => write!(f, "little-endian"),
        }
    }
}
