//! Error types for tag sessions and block storage

use thiserror::Error;

/// Everything that can go wrong between the reader and the payload blocks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    // Reader errors
    #[error("Didn't find PN53x board")]
    ReaderNotFound,

    #[error("Firmware version could not be decoded: {0}")]
    Firmware(String),

    // Presence errors
    #[error("No tag found before timeout")]
    NoTag,

    #[error("Tag already processed, waiting for removal")]
    AlreadyPresent,

    #[error("Unsupported tag: UID is {len} bytes, expected 4")]
    UnsupportedUid { len: usize },

    #[error("Authentication rejected for block {block}")]
    AuthenticationRejected { block: u8 },

    // Block errors
    #[error("Unable to read block {block}")]
    BlockRead { block: u8 },

    #[error("Unable to write block {block}")]
    BlockWrite { block: u8 },

    // Payload errors
    #[error("Identifier is {len} bytes, at most {max} fit on the tag")]
    PayloadTooLong { len: usize, max: usize },

    #[error("Identifier contains reserved character {0:?}")]
    InvalidIdentifier(char),

    #[error("Invalid sector key: {0}")]
    InvalidKey(String),
}

pub type TagResult<T> = Result<T, TagError>;

impl TagError {
    /// Only a missing reader stops processing; everything else is retried on the next poll.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TagError::ReaderNotFound)
    }
}
