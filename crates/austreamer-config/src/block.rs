//! Binary configuration block.
//!
//! The block is how a full parameter set travels to and from flash or a
//! host tool. All fields are little-endian:
//!
//! ```text
//! u32 head magic  0x5B3A2D29
//! u16 version     BCD, major must be 1
//! u16 num         record count
//! u16 size        payload bytes per record (16)
//! u16 reserved
//! num × { u16 id, u16 len, [u8; size] data }
//! u32 tail magic  0x282D3A5D
//! ```

use std::path::Path;

use crate::error::ConfigError;
use crate::params::{RawBlock, SUB_BLOCK_SIZE};

/// Leading magic.
pub const HEAD_MAGIC: u32 = 0x5B3A_2D29;
/// Trailing magic.
pub const TAIL_MAGIC: u32 = 0x282D_3A5D;
/// Version written by this crate (BCD 1.00).
pub const BLOCK_VERSION: u16 = 0x0100;

const HEADER_LEN: usize = 12;
const RECORD_LEN: usize = 4 + SUB_BLOCK_SIZE;

/// One sub-block record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    /// Sub-block id.
    pub id: u16,
    /// Meaningful bytes at the start of `data`.
    pub len: u16,
    /// Zero-padded payload.
    pub data: RawBlock,
}

impl Record {
    /// Record holding `payload`, zero-padded.
    pub fn new(id: u16, payload: &[u8]) -> Result<Self, ConfigError> {
        if payload.len() > SUB_BLOCK_SIZE {
            return Err(ConfigError::RecordSize(payload.len()));
        }
        let mut data = [0u8; SUB_BLOCK_SIZE];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id,
            len: payload.len() as u16,
            data,
        })
    }

    /// The meaningful bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.len).min(SUB_BLOCK_SIZE)]
    }
}

/// A decoded configuration block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigBlock {
    /// BCD version.
    pub version: u16,
    /// Records in file order.
    pub records: Vec<Record>,
}

impl Default for ConfigBlock {
    fn default() -> Self {
        Self {
            version: BLOCK_VERSION,
            records: Vec::new(),
        }
    }
}

fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

impl ConfigBlock {
    /// Block with the current version and the given records.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            version: BLOCK_VERSION,
            records,
        }
    }

    /// Parses a block. Trailing bytes after the tail magic are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, ConfigError> {
        ConfigError::need(HEADER_LEN, bytes.len())?;
        let head = u32_at(bytes, 0);
        if head != HEAD_MAGIC {
            return Err(ConfigError::BadHeadMagic(head));
        }
        let version = u16_at(bytes, 4);
        if version >> 8 != 0x01 {
            return Err(ConfigError::UnsupportedVersion(version));
        }
        let num = usize::from(u16_at(bytes, 6));
        let size = usize::from(u16_at(bytes, 8));
        if size != SUB_BLOCK_SIZE {
            return Err(ConfigError::RecordSize(size));
        }
        let tail_at = HEADER_LEN + num * RECORD_LEN;
        ConfigError::need(tail_at + 4, bytes.len())?;

        let records = bytes[HEADER_LEN..tail_at]
            .chunks_exact(RECORD_LEN)
            .map(|raw| {
                let len = u16_at(raw, 2);
                if usize::from(len) > SUB_BLOCK_SIZE {
                    return Err(ConfigError::RecordSize(usize::from(len)));
                }
                let mut data = [0u8; SUB_BLOCK_SIZE];
                data.copy_from_slice(&raw[4..]);
                Ok(Record {
                    id: u16_at(raw, 0),
                    len,
                    data,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let tail = u32_at(bytes, tail_at);
        if tail != TAIL_MAGIC {
            return Err(ConfigError::BadTailMagic(tail));
        }
        tracing::debug!("config_block: decoded {} records, version {version:#06x}", records.len());
        Ok(Self { version, records })
    }

    /// Serializes the block.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.records.len() * RECORD_LEN + 4);
        out.extend_from_slice(&HEAD_MAGIC.to_le_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&(self.records.len() as u16).to_le_bytes());
        out.extend_from_slice(&(SUB_BLOCK_SIZE as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        for r in &self.records {
            out.extend_from_slice(&r.id.to_le_bytes());
            out.extend_from_slice(&r.len.to_le_bytes());
            out.extend_from_slice(&r.data);
        }
        out.extend_from_slice(&TAIL_MAGIC.to_le_bytes());
        out
    }

    /// Reads and decodes a block file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::decode(&bytes)
    }

    /// Encodes and writes a block file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.encode()).map_err(|e| ConfigError::write_file(path, e))
    }

    /// First record with `id`.
    pub fn get(&self, id: u16) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }
}
