//! Persisted index files
//!
//! Saves a finished index next to its data file so a later open can skip
//! the scan.
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ Header (14 bytes)                              │
//! │   Magic: "ECLX" (4) | Version: u16 | Len: u64  │
//! ├────────────────────────────────────────────────┤
//! │ Payload (Len bytes, bincode)                   │
//! │   source name, source length, format,          │
//! │   end offset, entries                          │
//! ├────────────────────────────────────────────────┤
//! │ Footer: PayloadCRC u32 (4)                     │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! A persisted index is rejected when it is older than the data file,
//! names a different source, disagrees on the source length, or fails
//! its checksum.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EclError, Result};
use crate::keyword::FileFormat;

use super::{IndexEntry, KeywordIndex};

const MAGIC: &[u8; 4] = b"ECLX";
const VERSION: u16 = 1;
const HEADER_SIZE: usize = 14;
const FOOTER_SIZE: usize = 4;

/// Extension appended to a data file's name for its index
pub const INDEX_EXTENSION: &str = "eclidx";

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    source_name: String,
    source_len: u64,
    format: FileFormat,
    end_offset: u64,
    entries: Vec<IndexEntry>,
}

fn source_name(source_path: &Path) -> String {
    source_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl KeywordIndex {
    /// Default index location for a data file: `<file>.eclidx`
    pub fn sidecar_path(source_path: &Path) -> PathBuf {
        let mut name = source_path.as_os_str().to_owned();
        name.push(".");
        name.push(INDEX_EXTENSION);
        PathBuf::from(name)
    }

    /// Write this index for the data file at `source_path`
    pub fn save(&self, index_path: &Path, source_path: &Path) -> Result<()> {
        let source_len = fs::metadata(source_path)?.len();
        let persisted = PersistedIndex {
            source_name: source_name(source_path),
            source_len,
            format: self.format,
            end_offset: self.end_offset,
            entries: self.entries.clone(),
        };
        let payload = bincode::serialize(&persisted)
            .map_err(|e| EclError::IndexFile(format!("failed to encode index: {}", e)))?;

        let mut writer = BufWriter::new(File::create(index_path)?);
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&(payload.len() as u64).to_le_bytes())?;
        writer.write_all(&payload)?;
        writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
        writer.flush()?;

        tracing::debug!(
            "Saved index of {} keywords to {}",
            self.entries.len(),
            index_path.display()
        );
        Ok(())
    }

    /// Read an index file and check that it still describes `source_path`
    pub fn load_validated(index_path: &Path, source_path: &Path) -> Result<Self> {
        let source_meta = fs::metadata(source_path)?;
        let index_meta = fs::metadata(index_path)?;
        if let (Ok(index_time), Ok(source_time)) = (index_meta.modified(), source_meta.modified()) {
            if index_time < source_time {
                return Err(EclError::IndexFile(format!(
                    "{} is older than {}",
                    index_path.display(),
                    source_path.display()
                )));
            }
        }

        let mut raw = Vec::new();
        File::open(index_path)?.read_to_end(&mut raw)?;
        if raw.len() < HEADER_SIZE + FOOTER_SIZE || &raw[0..4] != MAGIC {
            return Err(EclError::IndexFile(format!(
                "{} is not an index file",
                index_path.display()
            )));
        }

        let version = u16::from_le_bytes([raw[4], raw[5]]);
        if version != VERSION {
            return Err(EclError::IndexFile(format!(
                "unsupported index version {}",
                version
            )));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&raw[6..HEADER_SIZE]);
        let payload_len = u64::from_le_bytes(len_bytes) as usize;
        if raw.len() != HEADER_SIZE + payload_len + FOOTER_SIZE {
            return Err(EclError::IndexFile(format!(
                "index payload length {} does not match file size {}",
                payload_len,
                raw.len()
            )));
        }

        let payload = &raw[HEADER_SIZE..HEADER_SIZE + payload_len];
        let footer = &raw[HEADER_SIZE + payload_len..];
        let stored_crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        if crc32fast::hash(payload) != stored_crc {
            return Err(EclError::IndexFile("index checksum mismatch".to_string()));
        }

        let persisted: PersistedIndex = bincode::deserialize(payload)
            .map_err(|e| EclError::IndexFile(format!("failed to decode index: {}", e)))?;

        let expected_name = source_name(source_path);
        if persisted.source_name != expected_name {
            return Err(EclError::IndexFile(format!(
                "index describes {}, not {}",
                persisted.source_name, expected_name
            )));
        }
        if persisted.source_len != source_meta.len() {
            return Err(EclError::IndexFile(format!(
                "index recorded {} bytes, {} has {}",
                persisted.source_len,
                expected_name,
                source_meta.len()
            )));
        }

        Ok(Self::from_parts(
            persisted.format,
            persisted.entries,
            persisted.end_offset,
        ))
    }
}
