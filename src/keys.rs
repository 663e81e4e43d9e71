use binrw::BinRead;
use hex::decode;
use std::fmt;
use std::io::Cursor;

use crate::error::{TagError, TagResult};

/// Which of the two sector keys to present when authenticating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyType {
    #[default]
    A,
    B,
}

impl KeyType {
    /// Command byte offset the reader expects (0 for Key A, 1 for Key B).
    pub fn code(self) -> u8 {
        match self {
            KeyType::A => 0,
            KeyType::B => 1,
        }
    }
}

#[derive(BinRead, Clone, Copy, PartialEq, Eq)]
#[br(little)]
pub struct SectorKey {
    bytes: [u8; 6], // 6 bytes
}

const KEY_LEN: usize = 6;

/// Factory default transport key shipped on blank cards.
pub const DEFAULT_KEY: SectorKey = SectorKey {
    bytes: [0xFF; KEY_LEN],
};

impl SectorKey {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    pub fn from_bin(data: &[u8]) -> TagResult<SectorKey> {
        let count = data.len();

        if count != KEY_LEN {
            return Err(TagError::InvalidKey(format!(
                "key should be {KEY_LEN} bytes, was {count} bytes"
            )));
        }

        let mut cursor = Cursor::new(data);
        SectorKey::read(&mut cursor).map_err(|e| TagError::InvalidKey(e.to_string()))
    }

    pub fn from_hex(key_hex: &str) -> TagResult<SectorKey> {
        let cleaned: String = key_hex
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ':')
            .collect();
        let data = decode(&cleaned).map_err(|e| TagError::InvalidKey(e.to_string()))?;

        Self::from_bin(&data)
    }
}

impl Default for SectorKey {
    fn default() -> Self {
        DEFAULT_KEY
    }
}

// Keys are secrets on anything but a blank card, keep them out of logs.
impl fmt::Debug for SectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == DEFAULT_KEY {
            f.write_str("SectorKey(default)")
        } else {
            f.write_str("SectorKey(..)")
        }
    }
}
