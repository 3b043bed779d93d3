//! Keyword header
//!
//! The fixed 16-byte record that precedes every keyword's data:
//!
//! ```text
//! ┌──────────────────┬───────────┬────────────┐
//! │ Name (8, padded) │ Type (4)  │ Count (4)  │
//! └──────────────────┴───────────┴────────────┘
//! ```

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::error::{EclError, Result};
use crate::record::Endian;

use super::data::pad8;
use super::{ElementType, TYPE_TAG_LENGTH};

/// Maximum keyword name length
pub const NAME_LENGTH: usize = 8;

/// Payload size of a binary header record
pub const HEADER_SIZE: usize = NAME_LENGTH + TYPE_TAG_LENGTH + 4;

/// Name, type and element count of one keyword
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeywordHeader {
    /// Name with trailing padding removed
    pub name: String,
    pub element_type: ElementType,
    pub count: usize,
}

impl KeywordHeader {
    pub fn new(name: impl Into<String>, element_type: ElementType, count: usize) -> Self {
        Self {
            name: name.into(),
            element_type,
            count,
        }
    }

    /// Encode into a 16-byte header payload
    pub fn encode(&self, endian: Endian) -> Result<[u8; HEADER_SIZE]> {
        validate_name(&self.name)?;
        let count = i32::try_from(self.count).map_err(|_| EclError::InvalidHeader {
            offset: 0,
            reason: format!("{}: count {} exceeds i32", self.name, self.count),
        })?;

        let mut out = [0u8; HEADER_SIZE];
        let mut buf = &mut out[..];
        buf.put_slice(&pad8(&self.name));
        buf.put_slice(self.element_type.tag().as_bytes());
        endian.put_i32(&mut buf, count);
        Ok(out)
    }

    /// Decode a header payload read at `offset`
    pub fn decode(payload: &[u8], endian: Endian, offset: u64) -> Result<Self> {
        if payload.len() != HEADER_SIZE {
            return Err(EclError::InvalidHeader {
                offset,
                reason: format!(
                    "header record holds {} bytes, expected {}",
                    payload.len(),
                    HEADER_SIZE
                ),
            });
        }

        let name = String::from_utf8_lossy(&payload[..NAME_LENGTH])
            .trim_end()
            .to_string();

        let tag = &payload[NAME_LENGTH..NAME_LENGTH + TYPE_TAG_LENGTH];
        let element_type = ElementType::from_tag(tag).ok_or_else(|| EclError::InvalidTypeTag {
            tag: String::from_utf8_lossy(tag).to_string(),
            offset,
        })?;

        let mut count_bytes = &payload[NAME_LENGTH + TYPE_TAG_LENGTH..];
        let count = endian.get_i32(&mut count_bytes);
        if count < 0 {
            return Err(EclError::InvalidHeader {
                offset,
                reason: format!("{}: negative element count {}", name, count),
            });
        }

        // Message keywords never carry data, whatever the count says
        let count = if element_type == ElementType::Message {
            0
        } else {
            count as usize
        };

        Ok(Self {
            name,
            element_type,
            count,
        })
    }

    /// True if `payload` looks like a header record: right size and a
    /// known type tag. Used when resynchronizing on damaged files.
    pub fn is_plausible(payload: &[u8]) -> bool {
        payload.len() == HEADER_SIZE
            && ElementType::from_tag(&payload[NAME_LENGTH..NAME_LENGTH + TYPE_TAG_LENGTH]).is_some()
            && payload[..NAME_LENGTH].iter().all(|b| b.is_ascii_graphic() || *b == b' ')
    }
}

/// Names are 1-8 printable ASCII characters
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.len() > NAME_LENGTH
        || !name.bytes().all(|b| b.is_ascii_graphic() || b == b' ')
    {
        return Err(EclError::InvalidHeader {
            offset: 0,
            reason: format!("invalid keyword name {:?}", name),
        });
    }
    Ok(())
}
