use std::fmt;

/// Size of one addressable block, in bytes.
pub const BLOCK_SIZE: usize = 16;

/// First block of sector 1. Sector 0 holds manufacturer data and is left alone.
pub const FIRST_PAYLOAD_BLOCK: u8 = 4;

/// Number of blocks (4, 5 and 6) used to hold the identifier.
pub const PAYLOAD_BLOCKS: u8 = 3;

/// Raw capacity of the payload region.
pub const PAYLOAD_CAPACITY: usize = BLOCK_SIZE * PAYLOAD_BLOCKS as usize;

/// Longest identifier that still leaves room for the terminator.
pub const MAX_IDENTIFIER_LEN: usize = PAYLOAD_CAPACITY - 1;

/// Marks the logical end of the identifier inside the payload region.
pub const TERMINATOR: u8 = b'\n';

/// MIFARE Classic cards carry a 4 byte UID; 7 byte UIDs belong to other variants.
pub const CLASSIC_UID_LEN: usize = 4;

/// Longest UID an ISO14443A target can report.
pub const MAX_UID_LEN: usize = 7;

pub type Block = [u8; BLOCK_SIZE];

/// Block indices holding the identifier, in write order.
pub fn payload_blocks() -> impl Iterator<Item = u8> {
    FIRST_PAYLOAD_BLOCK..FIRST_PAYLOAD_BLOCK + PAYLOAD_BLOCKS
}

/// Card families the reader can be asked to look for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardType {
    /// 106 kbps type A (MIFARE Classic, Ultralight, NTAG)
    Iso14443A,
}

/// Unique identifier reported by the reader for the target in the field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Uid(Vec<u8>);

impl Uid {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True for the 4 byte variant this crate can authenticate.
    pub fn is_classic(&self) -> bool {
        self.0.len() == CLASSIC_UID_LEN
    }
}

impl From<&[u8]> for Uid {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}
