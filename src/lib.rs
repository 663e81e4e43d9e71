//! Store short identifiers (Spotify URIs and the like) on MIFARE Classic cards
//! and read them back from a single PN532 style reader.
//!
//! The identifier lives in blocks 4, 5 and 6 of sector 1, terminated by `\n`
//! and zero padded. A [`SessionTracker`] keeps a card that stays on the reader
//! from being processed again on every poll, and [`Poller`] drives the whole
//! read/write cycle.

pub mod classic;
pub mod codec;
pub mod config;
pub mod error;
pub mod firmware;
pub mod keys;
pub mod poller;
pub mod reader;
pub mod session;
pub mod sim;

pub use classic::{Block, CardType, Uid, BLOCK_SIZE, MAX_IDENTIFIER_LEN};
pub use codec::{
    decode, encode, read_identifier, read_new_tag, write_identifier, WriteSummary,
};
pub use config::ReaderConfig;
pub use error::{TagError, TagResult};
pub use firmware::FirmwareVersion;
pub use keys::{KeyType, SectorKey, DEFAULT_KEY};
pub use poller::{
    LineRequests, NoRequests, PollOutcome, PollState, Player, Poller, WriteRequests,
};
pub use reader::TagReader;
pub use session::{AuthMode, SessionState, SessionTracker};
